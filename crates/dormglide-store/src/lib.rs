//! # dormglide-store
//!
//! Local fallback storage for DormGlide, backed by SQLite.
//!
//! The store is a durable key-value map: each fixed key (`products`,
//! `chat_messages`, `users`, ...) holds one JSON document. [`Database`] offers
//! synchronous typed helpers over those documents and [`LocalStore`] wraps
//! them in an async interface so the sync layer can treat it like the remote
//! backend. Every successful write is durable before the call returns.

pub mod activity;
pub mod chat;
pub mod database;
pub mod ids;
pub mod local;
pub mod migrations;
pub mod preferences;
pub mod products;
pub mod seed;
pub mod users;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use local::LocalStore;
