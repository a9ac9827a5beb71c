//! Types shared by every DormGlide crate: domain records, enums, storage
//! keys and the handful of pure helpers (phone numbers, participant
//! ordering) that both backends must agree on.

pub mod constants;
pub mod error;
pub mod models;
pub mod phone;
pub mod types;

pub use error::ValidationError;
pub use models::*;
pub use types::*;
