//! The seam between the sync layer and a remote backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dormglide_shared::{Conversation, Message, NewProduct, Product, ProductPatch};
use serde_json::Value;

use crate::auth::{AuthUser, SignUpOutcome};
use crate::error::RemoteError;

pub type Result<T> = std::result::Result<T, RemoteError>;

/// A message about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub product_id: Option<String>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Shared relational store plus its auth service.
///
/// Writes require a session and fail with [`RemoteError::AuthRequired`]
/// without one. Reads go out with whatever credentials are available.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Whether an authenticated session is held.
    fn has_session(&self) -> bool;

    // -- products --

    async fn fetch_products(&self) -> Result<Vec<Product>>;

    async fn insert_product(&self, draft: &NewProduct) -> Result<Product>;

    async fn update_product(&self, id: &str, patch: &ProductPatch) -> Result<Product>;

    /// Fails with [`RemoteError::NotFound`] when no row was deleted.
    async fn delete_product(&self, id: &str) -> Result<()>;

    // -- chat --

    /// Find or insert the conversation for the unordered pair `a`/`b` and
    /// `product_id`.
    async fn get_or_create_conversation(
        &self,
        product_id: Option<&str>,
        a: &str,
        b: &str,
    ) -> Result<Conversation>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>>;

    /// Conversations involving `user_id`, most recent activity first.
    async fn conversations_for_user(&self, user_id: &str) -> Result<Vec<Conversation>>;

    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<Message>>;

    async fn insert_message(&self, message: &NewMessage) -> Result<Message>;

    /// Update a conversation's `last_message` / `last_message_at`.
    async fn touch_conversation(
        &self,
        conversation_id: &str,
        last_message: &str,
        at: DateTime<Utc>,
    ) -> Result<()>;

    // -- auth --

    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> Result<SignUpOutcome>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser>;

    /// End the session. The local session is dropped even if the call fails.
    async fn sign_out(&self) -> Result<()>;

    /// The session user as currently known to the auth service, or `None`
    /// without a session.
    async fn session_user(&self) -> Result<Option<AuthUser>>;

    /// Merge `metadata` into the session user's metadata bag.
    async fn update_user_metadata(&self, metadata: Value) -> Result<AuthUser>;
}
