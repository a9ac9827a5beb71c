use dormglide_remote::RemoteError;
use dormglide_shared::ValidationError;
use dormglide_store::StoreError;
use thiserror::Error;

/// Errors surfaced to callers of the sync layer.
///
/// Only [`SyncError::Connectivity`] is transient. Everything else is terminal
/// and carries a message meant for the user.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote backend could not be reached and no fallback was allowed.
    #[error("The server could not be reached: {0}")]
    Connectivity(String),

    /// The operation needs a logged-in user.
    #[error("You must be logged in to do this")]
    AuthRequired,

    /// Ownership or role check failed.
    #[error("You are not allowed to do this: {0}")]
    AuthorizationDenied(String),

    /// The remote project is missing tables or columns, or is not set up.
    #[error("The backend is not set up: {0}")]
    SchemaMissing(String),

    /// Local persistence failed.
    #[error("Could not save on this device: {0}")]
    StorageFailure(String),

    /// Input rejected before reaching any backend.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// A business-level refusal (bad credentials, duplicate, not found).
    #[error("{0}")]
    Rejected(String),

    /// Unclassified remote failure.
    #[error("The server rejected the request: {0}")]
    Remote(String),
}

impl SyncError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::Rejected("Record not found".into()),
            StoreError::Conflict(msg) => Self::Rejected(msg),
            other => Self::StorageFailure(other.to_string()),
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Connectivity(msg) => Self::Connectivity(msg),
            RemoteError::AuthRequired(_) => Self::AuthRequired,
            RemoteError::AuthorizationDenied(msg) => Self::AuthorizationDenied(msg),
            RemoteError::SchemaMissing(msg) => Self::SchemaMissing(msg),
            RemoteError::Decode(e) => Self::SchemaMissing(e.to_string()),
            RemoteError::Rejected(msg) => Self::Rejected(msg),
            RemoteError::NotFound => Self::Rejected("Record not found".into()),
            err @ RemoteError::Api { .. } => Self::Remote(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connectivity_is_transient() {
        assert!(SyncError::Connectivity("timeout".into()).is_transient());
        assert!(!SyncError::AuthRequired.is_transient());
        assert!(!SyncError::SchemaMissing("x".into()).is_transient());
        assert!(!SyncError::StorageFailure("x".into()).is_transient());
    }

    #[test]
    fn test_remote_errors_map_onto_taxonomy() {
        assert!(matches!(
            SyncError::from(RemoteError::AuthRequired("jwt expired".into())),
            SyncError::AuthRequired
        ));
        assert!(matches!(
            SyncError::from(RemoteError::AuthorizationDenied("rls".into())),
            SyncError::AuthorizationDenied(_)
        ));
        assert!(matches!(
            SyncError::from(RemoteError::Api {
                status: Some(409),
                code: None,
                message: "conflict".into()
            }),
            SyncError::Remote(_)
        ));
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let login = SyncError::AuthRequired.to_string();
        let setup = SyncError::SchemaMissing("relation missing".into()).to_string();
        assert!(login.contains("logged in"));
        assert!(setup.contains("not set up"));
        assert_ne!(login, setup);
    }

    #[test]
    fn test_store_conflict_is_rejected() {
        let err = SyncError::from(StoreError::Conflict("Already in favorites".into()));
        assert!(matches!(err, SyncError::Rejected(ref m) if m == "Already in favorites"));
    }
}
