//! # dormglide-sync
//!
//! The layer every DormGlide screen talks to. [`SyncService`] routes reads and
//! writes of listings, chat and accounts to the shared Supabase backend or to
//! the on-device store, an [`AvailabilityTracker`] keeps an unreachable
//! backend from being hammered, and the [`SubscriptionManager`] fans the
//! realtime feed out to per-conversation and per-user listeners.

pub mod availability;
pub mod config;
pub mod error;
pub mod logging;
pub mod realtime;
pub mod service;

pub use availability::{Availability, AvailabilityTracker, BackendFamily};
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use logging::init_logging;
pub use realtime::{ConversationUpdate, Subscription, SubscriptionManager};
pub use service::{FamilyStatus, Stored, SyncService, SyncStatus, LOCAL_ONLY_NOTICE};
