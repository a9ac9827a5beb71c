//! # dormglide-remote
//!
//! Adapter for the shared DormGlide backend: a Supabase project exposing the
//! `products`, `conversations` and `messages` tables over PostgREST, an auth
//! service and a realtime change feed.
//!
//! The sync layer only sees the [`RemoteStore`] and [`RealtimeConnector`]
//! traits; [`SupabaseClient`] and [`SupabaseRealtimeConnector`] are the
//! production implementations.

pub mod auth;
pub mod backend;
pub mod client;
pub mod error;
pub mod realtime;
pub mod rows;

pub use auth::{AuthUser, Session, SignUpOutcome};
pub use backend::{NewMessage, RemoteStore};
pub use client::{RemoteConfig, SupabaseClient};
pub use error::RemoteError;
pub use realtime::{ChangeEvent, ChannelHandle, EventSink, RealtimeConnector, SupabaseRealtimeConnector};
pub use rows::DecodeError;
