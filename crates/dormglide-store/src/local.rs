//! Async handle over the local database.
//!
//! [`LocalStore`] is cheap to clone and safe to share across tasks. The inner
//! mutex is held only for the duration of one synchronous [`Database`] call,
//! never across an await point.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dormglide_shared::{
    Activity, Conversation, Message, NewProduct, Preferences, Product, ProductPatch, UserProfile,
    UserStatus,
};

use crate::activity::MessageActivity;
use crate::database::Database;
use crate::error::{Result, StoreError};

#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
}

impl LocalStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Open the store in `dir`, or the platform data directory when `None`.
    pub fn open(dir: Option<&Path>) -> Result<Self> {
        let db = match dir {
            Some(dir) => Database::open_in_dir(dir)?,
            None => Database::new()?,
        };
        Ok(Self::new(db))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Run one synchronous operation against the database.
    pub async fn with<R>(&self, f: impl FnOnce(&Database) -> Result<R>) -> Result<R> {
        let guard = self.db.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&guard)
    }

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    pub async fn fetch_products(&self) -> Result<Vec<Product>> {
        self.with(|db| db.list_products()).await
    }

    pub async fn create_product(&self, draft: NewProduct) -> Result<Product> {
        self.with(|db| db.create_product(draft)).await
    }

    pub async fn update_product(&self, id: &str, patch: &ProductPatch) -> Result<Product> {
        self.with(|db| db.update_product(id, patch)).await
    }

    pub async fn remove_product(&self, id: &str) -> Result<bool> {
        self.with(|db| db.delete_product(id)).await
    }

    pub async fn seed_demo_products_if_empty(&self) -> Result<usize> {
        self.with(|db| db.seed_demo_products_if_empty()).await
    }

    // ------------------------------------------------------------------
    // Chat
    // ------------------------------------------------------------------

    pub async fn get_or_create_conversation(
        &self,
        product_id: Option<&str>,
        a: &str,
        b: &str,
    ) -> Result<Conversation> {
        self.with(|db| db.get_or_create_conversation(product_id, a, b))
            .await
    }

    pub async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        self.with(|db| db.get_conversation(id)).await
    }

    pub async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        self.with(|db| db.messages_for_conversation(conversation_id))
            .await
    }

    pub async fn fetch_conversations_for_user(&self, user_id: &str) -> Result<Vec<Conversation>> {
        self.with(|db| db.conversations_for_user(user_id)).await
    }

    pub async fn append_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        receiver_id: &str,
        product_id: Option<&str>,
        body: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Message> {
        self.with(|db| {
            db.append_message(
                conversation_id,
                sender_id,
                receiver_id,
                product_id,
                body,
                created_at,
            )
        })
        .await
    }

    // ------------------------------------------------------------------
    // Users and session
    // ------------------------------------------------------------------

    pub async fn list_users(&self) -> Result<Vec<UserProfile>> {
        self.with(|db| db.list_users()).await
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<UserProfile>> {
        self.with(|db| db.get_user(id)).await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserProfile>> {
        self.with(|db| db.find_user_by_email(email)).await
    }

    pub async fn upsert_user(&self, profile: &UserProfile) -> Result<()> {
        self.with(|db| db.upsert_user(profile)).await
    }

    pub async fn register_user(&self, profile: &UserProfile, password: &str) -> Result<()> {
        self.with(|db| db.register_local_user(profile, password))
            .await
    }

    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserProfile>> {
        self.with(|db| db.verify_local_credentials(email, password))
            .await
    }

    pub async fn set_user_status(&self, id: &str, status: UserStatus) -> Result<UserProfile> {
        self.with(|db| db.set_user_status(id, status)).await
    }

    pub async fn current_user(&self) -> Result<Option<UserProfile>> {
        self.with(|db| db.current_user()).await
    }

    pub async fn cache_session_user(&self, profile: &UserProfile) -> Result<()> {
        self.with(|db| db.cache_session_user(profile)).await
    }

    pub async fn clear_session_user(&self) -> Result<()> {
        self.with(|db| db.clear_session_user()).await
    }

    pub async fn clear_all(&self) -> Result<()> {
        self.with(|db| db.clear_all()).await
    }

    // ------------------------------------------------------------------
    // Preferences
    // ------------------------------------------------------------------

    pub async fn get_preferences(&self) -> Result<Preferences> {
        self.with(|db| db.get_preferences()).await
    }

    pub async fn save_preferences(&self, prefs: &Preferences) -> Result<()> {
        self.with(|db| db.save_preferences(prefs)).await
    }

    pub async fn add_search_term(&self, term: &str) -> Result<()> {
        self.with(|db| db.add_search_term(term)).await
    }

    pub async fn search_history(&self) -> Result<Vec<String>> {
        self.with(|db| db.search_history()).await
    }

    // ------------------------------------------------------------------
    // Activity
    // ------------------------------------------------------------------

    pub async fn activity_for(&self, user_id: &str) -> Result<Activity> {
        self.with(|db| db.activity_for(user_id)).await
    }

    pub async fn track_view(&self, user_id: &str, product_id: &str, title: &str) -> Result<()> {
        self.with(|db| db.track_view(user_id, product_id, title))
            .await
    }

    pub async fn track_purchase(
        &self,
        user_id: &str,
        product_id: &str,
        title: &str,
        price: f64,
        seller_id: &str,
    ) -> Result<()> {
        self.with(|db| db.track_purchase(user_id, product_id, title, price, seller_id))
            .await
    }

    pub async fn track_sale(
        &self,
        seller_id: &str,
        product_id: &str,
        title: &str,
        price: f64,
        buyer_id: &str,
    ) -> Result<()> {
        self.with(|db| db.track_sale(seller_id, product_id, title, price, buyer_id))
            .await
    }

    pub async fn add_favorite(&self, user_id: &str, product_id: &str, title: &str) -> Result<()> {
        self.with(|db| db.add_favorite(user_id, product_id, title))
            .await
    }

    pub async fn remove_favorite(&self, user_id: &str, product_id: &str) -> Result<bool> {
        self.with(|db| db.remove_favorite(user_id, product_id))
            .await
    }

    pub async fn is_favorited(&self, user_id: &str, product_id: &str) -> Result<bool> {
        self.with(|db| db.is_favorited(user_id, product_id)).await
    }

    pub async fn track_search(&self, user_id: &str, term: &str, results: u32) -> Result<()> {
        self.with(|db| db.track_search(user_id, term, results))
            .await
    }

    pub async fn record_message(&self, msg: &MessageActivity<'_>) -> Result<()> {
        self.with(|db| db.record_message(msg)).await
    }
}
