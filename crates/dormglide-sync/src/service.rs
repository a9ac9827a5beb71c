//! The sync façade.
//!
//! [`SyncService`] decides, per call, whether the remote backend or the local
//! store serves a request:
//!
//! - Writes go remote when the family is enabled and a session exists. A
//!   connectivity failure opens the circuit and, in hybrid mode, the write is
//!   retried once on this device. Authorization and schema failures always
//!   reach the caller.
//! - Reads go remote when the family is enabled and degrade to the local store
//!   on any failure.
//! - Preferences, search history and activity never leave this device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dormglide_remote::auth::{default_bio, normalize_user, signup_metadata, update_metadata};
use dormglide_remote::{
    NewMessage, RealtimeConnector, RemoteError, RemoteStore, SupabaseClient,
    SupabaseRealtimeConnector,
};
use dormglide_shared::phone::sanitize_phone;
use dormglide_shared::{
    sort_messages, Activity, AdminUserView, AuthMode, Backend, Conversation, ConversationSummary,
    Message, NewProduct, NewUser, OutgoingMessage, Preferences, Product, ProductPatch,
    ProfileUpdate, Role, UserProfile, UserStatus, ValidationError,
};
use dormglide_store::activity::MessageActivity;
use dormglide_store::ids::generate_local_id;
use dormglide_store::LocalStore;
use serde::Serialize;

use crate::availability::{AvailabilityTracker, BackendFamily};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::realtime::SubscriptionManager;

/// Shown after a write that could not be shared with other users.
pub const LOCAL_ONLY_NOTICE: &str =
    "Saved on this device only. Other users will not see it until you are back online.";

/// A write result together with the backend that persisted it.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    pub value: T,
    pub backend: Backend,
    remote_configured: bool,
}

impl<T> Stored<T> {
    /// The "saved on this device only" message, when it applies.
    pub fn notice(&self) -> Option<&'static str> {
        (self.backend == Backend::Local && self.remote_configured).then_some(LOCAL_ONLY_NOTICE)
    }

    pub fn is_shared(&self) -> bool {
        self.backend == Backend::Remote
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Backend currently serving one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FamilyStatus {
    pub family: BackendFamily,
    pub backend: Backend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub remote_configured: bool,
    pub auth_mode: AuthMode,
    pub families: Vec<FamilyStatus>,
}

enum Target {
    Remote(Arc<dyn RemoteStore>),
    Local,
}

pub struct SyncService {
    config: SyncConfig,
    local: LocalStore,
    remote: Option<Arc<dyn RemoteStore>>,
    tracker: AvailabilityTracker,
    realtime: SubscriptionManager,
    demo_seeded: AtomicBool,
}

impl SyncService {
    pub fn new(config: SyncConfig, local: LocalStore, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        let tracker = AvailabilityTracker::new(config.cooldown);
        Self {
            config,
            local,
            remote,
            tracker,
            realtime: SubscriptionManager::local_only(),
            demo_seeded: AtomicBool::new(false),
        }
    }

    /// Open the local store and, when configured, the Supabase client and its
    /// realtime channel.
    pub fn open(config: SyncConfig) -> Result<Self> {
        let local = LocalStore::open(config.data_dir.as_deref())?;

        if !config.remote_configured() {
            tracing::info!("remote backend not configured, running on the local store only");
            return Ok(Self::new(config, local, None));
        }

        let client = Arc::new(SupabaseClient::new(&config.remote)?);
        let connector: Arc<dyn RealtimeConnector> =
            Arc::new(SupabaseRealtimeConnector::new(client.clone()));
        let remote: Arc<dyn RemoteStore> = client;
        tracing::info!(url = %config.remote.url, mode = ?config.auth_mode, "remote backend configured");

        Ok(Self::new(config, local, Some(remote)).with_realtime(SubscriptionManager::new(Some(connector))))
    }

    pub fn with_realtime(mut self, realtime: SubscriptionManager) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.realtime
    }

    pub fn tracker(&self) -> &AvailabilityTracker {
        &self.tracker
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn status(&self) -> SyncStatus {
        let families = BackendFamily::ALL
            .iter()
            .map(|&family| FamilyStatus {
                family,
                backend: if self.remote.is_some() && self.tracker.is_enabled(family) {
                    Backend::Remote
                } else {
                    Backend::Local
                },
            })
            .collect();
        SyncStatus {
            remote_configured: self.remote.is_some(),
            auth_mode: self.config.auth_mode,
            families,
        }
    }

    // ------------------------------------------------------------------
    // Routing
    // ------------------------------------------------------------------

    fn stored<T>(&self, value: T, backend: Backend) -> Stored<T> {
        Stored {
            value,
            backend,
            remote_configured: self.remote.is_some(),
        }
    }

    fn strict(&self) -> bool {
        self.config.auth_mode.is_strict()
    }

    fn unconfigured(&self) -> Result<Target> {
        if self.strict() {
            Err(SyncError::SchemaMissing(
                "no remote backend is configured".into(),
            ))
        } else {
            Ok(Target::Local)
        }
    }

    /// Strict mode never writes locally, so an open circuit is an error.
    fn disabled(&self, family: BackendFamily) -> Result<Target> {
        if self.strict() {
            return Err(SyncError::Connectivity(format!(
                "remote {family} backend unreachable, retry after {}s",
                self.tracker.cooldown().as_secs()
            )));
        }
        tracing::debug!(%family, "remote disabled, writing locally");
        Ok(Target::Local)
    }

    /// Where a write to `family` should go. Writes need a session.
    fn write_target(&self, family: BackendFamily) -> Result<Target> {
        let Some(remote) = &self.remote else {
            return self.unconfigured();
        };
        if !remote.has_session() {
            if self.strict() {
                return Err(SyncError::AuthRequired);
            }
            tracing::debug!(%family, "no session, writing locally");
            return Ok(Target::Local);
        }
        if !self.tracker.is_enabled(family) {
            return self.disabled(family);
        }
        Ok(Target::Remote(remote.clone()))
    }

    /// Where a sign-up or login should go. These create the session.
    fn auth_target(&self) -> Result<Target> {
        let Some(remote) = &self.remote else {
            return self.unconfigured();
        };
        if !self.tracker.is_enabled(BackendFamily::Auth) {
            return self.disabled(BackendFamily::Auth);
        }
        Ok(Target::Remote(remote.clone()))
    }

    fn read_source(&self, family: BackendFamily) -> Option<Arc<dyn RemoteStore>> {
        self.remote
            .as_ref()
            .filter(|_| self.tracker.is_enabled(family))
            .cloned()
    }

    /// Decide what to do after a failed remote write. `Ok(())` means the
    /// caller should retry on the local store.
    fn write_failed(&self, family: BackendFamily, op: &'static str, err: RemoteError) -> Result<()> {
        if !err.is_transient() {
            tracing::debug!(%family, op, error = %err, "remote write rejected");
            return Err(err.into());
        }
        self.tracker.record_failure(family);
        if self.strict() {
            return Err(err.into());
        }
        tracing::warn!(%family, op, error = %err, "remote unreachable, saving on this device only");
        Ok(())
    }

    fn read_failed(&self, family: BackendFamily, op: &'static str, err: RemoteError) {
        if err.is_transient() {
            self.tracker.record_failure(family);
        }
        tracing::warn!(%family, op, error = %err, "remote read failed, using local store");
    }

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    pub async fn fetch_products(&self) -> Result<Vec<Product>> {
        if let Some(remote) = self.read_source(BackendFamily::Products) {
            match remote.fetch_products().await {
                Ok(products) => return Ok(products),
                Err(err) => self.read_failed(BackendFamily::Products, "fetch_products", err),
            }
        }
        if !self.demo_seeded.swap(true, Ordering::SeqCst) {
            self.local.seed_demo_products_if_empty().await?;
        }
        Ok(self.local.fetch_products().await?)
    }

    pub async fn create_product(&self, draft: NewProduct) -> Result<Stored<Product>> {
        draft.validate()?;
        if let Target::Remote(remote) = self.write_target(BackendFamily::Products)? {
            match remote.insert_product(&draft).await {
                Ok(product) => {
                    tracing::info!(product_id = %product.id, "listing created");
                    return Ok(self.stored(product, Backend::Remote));
                }
                Err(err) => self.write_failed(BackendFamily::Products, "create_product", err)?,
            }
        }
        let product = self.local.create_product(draft).await?;
        Ok(self.stored(product, Backend::Local))
    }

    pub async fn update_product(&self, id: &str, patch: &ProductPatch) -> Result<Stored<Product>> {
        patch.validate()?;
        if let Target::Remote(remote) = self.write_target(BackendFamily::Products)? {
            match remote.update_product(id, patch).await {
                Ok(product) => return Ok(self.stored(product, Backend::Remote)),
                Err(err) => self.write_failed(BackendFamily::Products, "update_product", err)?,
            }
        }
        self.ensure_locally_editable(id).await?;
        let product = self.local.update_product(id, patch).await?;
        Ok(self.stored(product, Backend::Local))
    }

    /// Returns whether a listing was removed.
    pub async fn delete_product(&self, id: &str) -> Result<Stored<bool>> {
        if let Target::Remote(remote) = self.write_target(BackendFamily::Products)? {
            match remote.delete_product(id).await {
                Ok(()) => return Ok(self.stored(true, Backend::Remote)),
                Err(err) => self.write_failed(BackendFamily::Products, "delete_product", err)?,
            }
        }
        self.ensure_locally_editable(id).await?;
        let removed = self.local.remove_product(id).await?;
        Ok(self.stored(removed, Backend::Local))
    }

    /// The remote enforces ownership with row security; locally it is
    /// checked against the cached session user.
    async fn ensure_locally_editable(&self, id: &str) -> Result<()> {
        let Some(user) = self.local.current_user().await? else {
            return Ok(());
        };
        let products = self.local.fetch_products().await?;
        match products.iter().find(|p| p.id == id) {
            Some(product) if !product.is_editable_by(&user) => Err(SyncError::AuthorizationDenied(
                "only the seller or an admin can change this listing".into(),
            )),
            _ => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Chat
    // ------------------------------------------------------------------

    pub async fn get_or_create_conversation(
        &self,
        product_id: Option<&str>,
        a: &str,
        b: &str,
    ) -> Result<Stored<Conversation>> {
        if a.is_empty() || b.is_empty() {
            return Err(ValidationError::MissingField("participant").into());
        }
        if let Target::Remote(remote) = self.write_target(BackendFamily::Chat)? {
            match remote.get_or_create_conversation(product_id, a, b).await {
                Ok(conversation) => return Ok(self.stored(conversation, Backend::Remote)),
                Err(err) => self.write_failed(BackendFamily::Chat, "get_or_create_conversation", err)?,
            }
        }
        let conversation = self.local.get_or_create_conversation(product_id, a, b).await?;
        Ok(self.stored(conversation, Backend::Local))
    }

    /// Messages of a conversation, oldest first.
    pub async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let mut messages = match self.read_source(BackendFamily::Chat) {
            Some(remote) => match remote.fetch_messages(conversation_id).await {
                Ok(messages) => messages,
                Err(err) => {
                    self.read_failed(BackendFamily::Chat, "fetch_messages", err);
                    self.local.fetch_messages(conversation_id).await?
                }
            },
            None => self.local.fetch_messages(conversation_id).await?,
        };
        sort_messages(&mut messages);
        Ok(messages)
    }

    /// Conversations of `user_id`, most recent activity first.
    pub async fn fetch_conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>> {
        let mut conversations = match self.read_source(BackendFamily::Chat) {
            Some(remote) => match remote.conversations_for_user(user_id).await {
                Ok(conversations) => conversations,
                Err(err) => {
                    self.read_failed(BackendFamily::Chat, "fetch_conversations", err);
                    self.local.fetch_conversations_for_user(user_id).await?
                }
            },
            None => self.local.fetch_conversations_for_user(user_id).await?,
        };
        conversations.sort_by_key(|c| std::cmp::Reverse(c.activity_at()));
        Ok(conversations
            .into_iter()
            .map(|c| ConversationSummary::for_user(c, user_id))
            .collect())
    }

    /// Store a message, bump its conversation and log it in both parties'
    /// activity.
    pub async fn send_message(&self, outgoing: OutgoingMessage) -> Result<Stored<Message>> {
        outgoing.validate()?;
        let now = Utc::now();

        let mut sent = None;
        if let Target::Remote(remote) = self.write_target(BackendFamily::Chat)? {
            match self.send_remote(remote.as_ref(), &outgoing, now).await {
                Ok(message) => sent = Some(self.stored(message, Backend::Remote)),
                Err(err) => self.write_failed(BackendFamily::Chat, "send_message", err)?,
            }
        }
        let sent = match sent {
            Some(sent) => sent,
            None => {
                let message = self.send_local(&outgoing, now).await?;
                self.stored(message, Backend::Local)
            }
        };

        self.record_message_activity(&outgoing, &sent.value).await;
        Ok(sent)
    }

    async fn send_remote(
        &self,
        remote: &dyn RemoteStore,
        outgoing: &OutgoingMessage,
        now: DateTime<Utc>,
    ) -> std::result::Result<Message, RemoteError> {
        let known = match &outgoing.conversation_id {
            Some(id) => remote.get_conversation(id).await?,
            None => None,
        };
        let conversation_id = match known {
            Some(conversation) => conversation.id,
            None => {
                remote
                    .get_or_create_conversation(
                        outgoing.product_id.as_deref(),
                        &outgoing.sender_id,
                        &outgoing.receiver_id,
                    )
                    .await?
                    .id
            }
        };

        let message = remote
            .insert_message(&NewMessage {
                conversation_id: conversation_id.clone(),
                sender_id: outgoing.sender_id.clone(),
                receiver_id: outgoing.receiver_id.clone(),
                product_id: outgoing.product_id.clone(),
                body: outgoing.body.clone(),
                created_at: now,
            })
            .await?;

        if let Err(err) = remote
            .touch_conversation(&conversation_id, &message.body, message.created_at)
            .await
        {
            tracing::warn!(
                conversation_id = %conversation_id,
                error = %err,
                "message stored but conversation metadata not updated"
            );
        }
        Ok(message)
    }

    async fn send_local(&self, outgoing: &OutgoingMessage, now: DateTime<Utc>) -> Result<Message> {
        let known = match &outgoing.conversation_id {
            Some(id) => self.local.get_conversation(id).await?,
            None => None,
        };
        let conversation = match known {
            Some(conversation) => conversation,
            None => {
                self.local
                    .get_or_create_conversation(
                        outgoing.product_id.as_deref(),
                        &outgoing.sender_id,
                        &outgoing.receiver_id,
                    )
                    .await?
            }
        };
        let message = self
            .local
            .append_message(
                &conversation.id,
                &outgoing.sender_id,
                &outgoing.receiver_id,
                outgoing.product_id.as_deref(),
                &outgoing.body,
                now,
            )
            .await?;
        Ok(message)
    }

    async fn record_message_activity(&self, outgoing: &OutgoingMessage, message: &Message) {
        let entry = MessageActivity {
            sender_id: &message.sender_id,
            receiver_id: &message.receiver_id,
            product_id: message.product_id.as_deref(),
            product_title: &outgoing.product_title,
            body: &message.body,
            conversation_id: Some(&message.conversation_id),
            timestamp: message.created_at,
        };
        if let Err(err) = self.local.record_message(&entry).await {
            tracing::warn!(message_id = %message.id, error = %err, "failed to record message activity");
        }
    }

    // ------------------------------------------------------------------
    // Auth and profile
    // ------------------------------------------------------------------

    /// Create an account. A local account does not log in; a remote one
    /// does when the project issues a session straight away.
    pub async fn register(&self, form: NewUser) -> Result<Stored<UserProfile>> {
        validate_registration(&form)?;
        let now = Utc::now();

        if let Target::Remote(remote) = self.auth_target()? {
            let metadata = signup_metadata(&form, now);
            match remote.sign_up(form.email.trim(), &form.password, metadata).await {
                Ok(outcome) => {
                    let fallback = profile_from_form(&form, outcome.user.id.clone(), now);
                    let profile = normalize_user(&outcome.user, &fallback);
                    if outcome.session_started {
                        self.local.cache_session_user(&profile).await?;
                    } else {
                        self.local.upsert_user(&profile).await?;
                        tracing::info!(user_id = %profile.id, "account created, email confirmation pending");
                    }
                    return Ok(self.stored(profile, Backend::Remote));
                }
                Err(err) => self.write_failed(BackendFamily::Auth, "register", err)?,
            }
        }

        let profile = profile_from_form(&form, generate_local_id(), now);
        self.local.register_user(&profile, &form.password).await?;
        Ok(self.stored(profile, Backend::Local))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Stored<UserProfile>> {
        if email.trim().is_empty() {
            return Err(ValidationError::MissingField("email").into());
        }
        if password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }

        if let Target::Remote(remote) = self.auth_target()? {
            match remote.sign_in(email.trim(), password).await {
                Ok(user) => {
                    let cached = self.local.find_user_by_email(email).await?.unwrap_or_default();
                    let profile = normalize_user(&user, &cached);
                    if !profile.is_active() {
                        if let Err(err) = remote.sign_out().await {
                            tracing::debug!(error = %err, "sign-out of suspended account failed");
                        }
                        return Err(SyncError::Rejected("This account has been suspended".into()));
                    }
                    self.local.cache_session_user(&profile).await?;
                    tracing::info!(user_id = %profile.id, "logged in");
                    return Ok(self.stored(profile, Backend::Remote));
                }
                Err(err) => self.write_failed(BackendFamily::Auth, "login", err)?,
            }
        }

        match self.local.verify_credentials(email, password).await? {
            Some(profile) => {
                self.local.cache_session_user(&profile).await?;
                tracing::info!(user_id = %profile.id, "logged in on this device");
                Ok(self.stored(profile, Backend::Local))
            }
            None => Err(SyncError::Rejected("Invalid email or password".into())),
        }
    }

    /// End the session. The cached user is always cleared.
    pub async fn logout(&self) -> Result<()> {
        if let Some(remote) = &self.remote {
            if remote.has_session() {
                if let Err(err) = remote.sign_out().await {
                    tracing::warn!(error = %err, "remote sign-out failed");
                }
            }
        }
        self.local.clear_session_user().await?;
        Ok(())
    }

    /// The logged-in user, refreshed from the auth service when possible.
    pub async fn current_user(&self) -> Result<Option<UserProfile>> {
        let cached = self.local.current_user().await?;
        let Some(remote) = self.read_source(BackendFamily::Auth) else {
            return Ok(cached);
        };
        if !remote.has_session() {
            return Ok(cached);
        }

        match remote.session_user().await {
            Ok(Some(user)) => {
                let profile = normalize_user(&user, &cached.unwrap_or_default());
                self.local.cache_session_user(&profile).await?;
                Ok(Some(profile))
            }
            Ok(None) => {
                tracing::info!("remote session expired");
                self.local.clear_session_user().await?;
                Ok(None)
            }
            Err(err) => {
                self.read_failed(BackendFamily::Auth, "current_user", err);
                Ok(cached)
            }
        }
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Stored<UserProfile>> {
        let current = self.local.current_user().await?.ok_or(SyncError::AuthRequired)?;
        let update = ProfileUpdate {
            phone: update.phone.as_deref().map(sanitize_phone),
            ..update
        };

        if let Target::Remote(remote) = self.write_target(BackendFamily::Auth)? {
            match remote.update_user_metadata(update_metadata(&update)).await {
                Ok(user) => {
                    let profile = normalize_user(&user, &current);
                    self.local.cache_session_user(&profile).await?;
                    return Ok(self.stored(profile, Backend::Remote));
                }
                Err(err) => self.write_failed(BackendFamily::Auth, "update_profile", err)?,
            }
        }

        let mut profile = current;
        update.apply_to(&mut profile);
        self.local.cache_session_user(&profile).await?;
        Ok(self.stored(profile, Backend::Local))
    }

    // ------------------------------------------------------------------
    // Admin
    // ------------------------------------------------------------------

    async fn require_admin(&self) -> Result<UserProfile> {
        let user = self.local.current_user().await?.ok_or(SyncError::AuthRequired)?;
        if !user.is_admin() {
            return Err(SyncError::AuthorizationDenied("admin access required".into()));
        }
        Ok(user)
    }

    /// Every known user with an activity summary.
    pub async fn list_users_for_admin(&self) -> Result<Vec<AdminUserView>> {
        self.require_admin().await?;
        let users = self.local.list_users().await?;
        let mut views = Vec::with_capacity(users.len());
        for user in users {
            let activity_summary = self.local.activity_for(&user.id).await?.summary();
            views.push(AdminUserView {
                user,
                activity_summary,
            });
        }
        Ok(views)
    }

    pub async fn suspend_user(&self, user_id: &str) -> Result<UserProfile> {
        let admin = self.require_admin().await?;
        let user = self.local.set_user_status(user_id, UserStatus::Suspended).await?;
        tracing::info!(admin_id = %admin.id, user_id, "user suspended");
        Ok(user)
    }

    pub async fn activate_user(&self, user_id: &str) -> Result<UserProfile> {
        let admin = self.require_admin().await?;
        let user = self.local.set_user_status(user_id, UserStatus::Active).await?;
        tracing::info!(admin_id = %admin.id, user_id, "user activated");
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Activity (this device only)
    // ------------------------------------------------------------------

    pub async fn activity_for(&self, user_id: &str) -> Result<Activity> {
        Ok(self.local.activity_for(user_id).await?)
    }

    pub async fn track_view(&self, user_id: &str, product: &Product) -> Result<()> {
        Ok(self.local.track_view(user_id, &product.id, &product.title).await?)
    }

    /// Record a purchase for the buyer and the matching sale for the seller.
    pub async fn track_purchase(&self, buyer_id: &str, product: &Product) -> Result<()> {
        self.local
            .track_purchase(buyer_id, &product.id, &product.title, product.price, &product.seller_id)
            .await?;
        self.local
            .track_sale(&product.seller_id, &product.id, &product.title, product.price, buyer_id)
            .await?;
        Ok(())
    }

    pub async fn add_favorite(&self, user_id: &str, product: &Product) -> Result<()> {
        Ok(self.local.add_favorite(user_id, &product.id, &product.title).await?)
    }

    pub async fn remove_favorite(&self, user_id: &str, product_id: &str) -> Result<bool> {
        Ok(self.local.remove_favorite(user_id, product_id).await?)
    }

    pub async fn is_favorited(&self, user_id: &str, product_id: &str) -> Result<bool> {
        Ok(self.local.is_favorited(user_id, product_id).await?)
    }

    /// Log a search in the user's activity and the device's search history.
    pub async fn track_search(&self, user_id: Option<&str>, term: &str, results: u32) -> Result<()> {
        if let Some(user_id) = user_id {
            self.local.track_search(user_id, term, results).await?;
        }
        self.local.add_search_term(term).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Preferences (this device only)
    // ------------------------------------------------------------------

    pub async fn preferences(&self) -> Result<Preferences> {
        Ok(self.local.get_preferences().await?)
    }

    pub async fn save_preferences(&self, prefs: &Preferences) -> Result<()> {
        Ok(self.local.save_preferences(prefs).await?)
    }

    pub async fn search_history(&self) -> Result<Vec<String>> {
        Ok(self.local.search_history().await?)
    }

    pub async fn add_search_term(&self, term: &str) -> Result<()> {
        Ok(self.local.add_search_term(term).await?)
    }

    /// Forget everything this device holds except accounts and chat.
    pub async fn clear_local_data(&self) -> Result<()> {
        self.local.clear_all().await?;
        self.demo_seeded.store(false, Ordering::SeqCst);
        Ok(())
    }
}

fn validate_registration(form: &NewUser) -> std::result::Result<(), ValidationError> {
    if form.email.trim().is_empty() {
        return Err(ValidationError::MissingField("email"));
    }
    if form.password.is_empty() {
        return Err(ValidationError::MissingField("password"));
    }
    if form.name.trim().is_empty() {
        return Err(ValidationError::MissingField("name"));
    }
    Ok(())
}

fn profile_from_form(form: &NewUser, id: String, now: DateTime<Utc>) -> UserProfile {
    let role = Role::parse_or_default(&form.role);
    let bio = form
        .bio
        .clone()
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| default_bio(role, &form.university));
    UserProfile {
        id,
        email: form.email.trim().to_string(),
        name: form.name.trim().to_string(),
        phone: sanitize_phone(&form.phone),
        university: form.university.clone(),
        campus_location: form.campus_location.clone(),
        role,
        status: UserStatus::Active,
        bio,
        joined_at: now,
        created_at: now,
        ..Default::default()
    }
}
