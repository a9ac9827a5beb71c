//! HTTP client for a Supabase project (PostgREST tables + GoTrue auth).

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dormglide_shared::constants::{
    DEFAULT_REQUEST_TIMEOUT_SECS, TABLE_CONVERSATIONS, TABLE_MESSAGES, TABLE_PRODUCTS,
};
use dormglide_shared::{sorted_pair, Conversation, Message, NewProduct, Product, ProductPatch};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{AuthUser, Session, SignUpOutcome};
use crate::backend::{NewMessage, RemoteStore, Result};
use crate::error::{classify, ErrorBody, RemoteError, Route};
use crate::rows;

/// Key shipped in the sample configuration; never a real project key.
pub const PLACEHOLDER_ANON_KEY: &str = "YOUR_PUBLIC_ANON_KEY";

const ACCEPT_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Connection settings for the remote project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub url: String,
    pub anon_key: String,
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// A project counts as configured only with an `https://` URL and a
    /// non-placeholder anon key.
    pub fn is_configured(&self) -> bool {
        let key = self.anon_key.trim();
        self.url.starts_with("https://")
            && !self.url.contains("YOUR-PROJECT-REF")
            && !key.is_empty()
            && key != PLACEHOLDER_ANON_KEY
    }
}

pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
}

impl SupabaseClient {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::Api {
                status: None,
                code: None,
                message: format!("could not build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            session: RwLock::new(None),
        })
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    pub fn session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_session(&self, session: Option<Session>) {
        *self
            .session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = session;
    }

    pub fn access_token(&self) -> Option<String> {
        self.session().map(|s| s.access_token)
    }

    fn replace_session_user(&self, user: &AuthUser) {
        let mut guard = self
            .session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(ref mut session) = *guard {
            session.user = user.clone();
        }
    }

    fn require_session(&self) -> Result<()> {
        if self.has_session() {
            Ok(())
        } else {
            Err(RemoteError::AuthRequired("no active session".into()))
        }
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// Websocket endpoint of the realtime service.
    pub fn realtime_url(&self) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!(
            "{ws_base}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            self.anon_key
        )
    }

    // ------------------------------------------------------------------
    // Request plumbing
    // ------------------------------------------------------------------

    fn table(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        self.authed(self.http.request(method, url))
    }

    fn auth(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/auth/v1/{}", self.base_url, path);
        self.authed(self.http.request(method, url))
    }

    fn authed(&self, rb: RequestBuilder) -> RequestBuilder {
        let token = self.access_token().unwrap_or_else(|| self.anon_key.clone());
        rb.header("apikey", &self.anon_key).bearer_auth(token)
    }

    async fn execute(&self, rb: RequestBuilder, route: Route) -> Result<Value> {
        let response = rb.send().await.map_err(RemoteError::from_transport)?;
        let status = response.status();
        let text = response.text().await.map_err(RemoteError::from_transport)?;

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text).map_err(|e| RemoteError::Api {
                status: Some(status.as_u16()),
                code: None,
                message: format!("invalid JSON in response: {e}"),
            });
        }

        let err = classify(status.as_u16(), route, &ErrorBody::parse(&text));
        tracing::debug!(status = status.as_u16(), error = %err, "remote request failed");
        Err(err)
    }

    /// Single-object request where zero rows is a normal outcome.
    async fn execute_optional(&self, rb: RequestBuilder) -> Result<Option<Value>> {
        match self
            .execute(rb.header("Accept", ACCEPT_OBJECT), Route::Table)
            .await
        {
            Ok(Value::Null) => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_no_rows() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Insert/update returning the affected row.
    async fn execute_returning(&self, rb: RequestBuilder) -> Result<Option<Value>> {
        self.execute_optional(rb.header("Prefer", "return=representation"))
            .await
    }

    async fn find_conversation(
        &self,
        pair: &(String, String),
        product_id: Option<&str>,
    ) -> Result<Option<Conversation>> {
        let product_filter = match product_id {
            Some(id) => format!("eq.{id}"),
            None => "is.null".to_string(),
        };
        let rb = self.table(Method::GET, TABLE_CONVERSATIONS).query(&[
            ("select", "*".to_string()),
            ("participant_a", format!("eq.{}", pair.0)),
            ("participant_b", format!("eq.{}", pair.1)),
            ("product_id", product_filter),
        ]);
        match self.execute_optional(rb).await? {
            Some(value) => Ok(Some(rows::decode_conversation(value)?)),
            None => Ok(None),
        }
    }
}

fn parse_auth<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| RemoteError::Api {
        status: None,
        code: None,
        message: format!("unexpected auth response: {e}"),
    })
}

#[async_trait]
impl RemoteStore for SupabaseClient {
    fn has_session(&self) -> bool {
        self.session
            .read()
            .map(|s| s.is_some())
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    async fn fetch_products(&self) -> Result<Vec<Product>> {
        let rb = self
            .table(Method::GET, TABLE_PRODUCTS)
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        let value = self.execute(rb, Route::Table).await?;
        Ok(rows::decode_products(value)?)
    }

    async fn insert_product(&self, draft: &NewProduct) -> Result<Product> {
        self.require_session()?;
        let payload = rows::encode_new_product(draft, Uuid::new_v4().to_string(), Utc::now());
        let rb = self.table(Method::POST, TABLE_PRODUCTS).json(&payload);
        let row = self.execute_returning(rb).await?.ok_or(RemoteError::NotFound)?;
        let product = rows::decode_product(row)?;
        tracing::info!(product_id = %product.id, "created remote listing");
        Ok(product)
    }

    async fn update_product(&self, id: &str, patch: &ProductPatch) -> Result<Product> {
        self.require_session()?;
        let rb = self
            .table(Method::PATCH, TABLE_PRODUCTS)
            .query(&[("id", format!("eq.{id}"))])
            .json(&rows::encode_product_patch(patch));
        // Zero rows means the id is unknown or row security hides it.
        let row = self.execute_returning(rb).await?.ok_or(RemoteError::NotFound)?;
        Ok(rows::decode_product(row)?)
    }

    async fn delete_product(&self, id: &str) -> Result<()> {
        self.require_session()?;
        let rb = self
            .table(Method::DELETE, TABLE_PRODUCTS)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation");
        // Row security filters a foreign listing out, leaving zero rows.
        let deleted = self.execute(rb, Route::Table).await?;
        match deleted.as_array() {
            Some(rows) if !rows.is_empty() => Ok(()),
            _ => Err(RemoteError::NotFound),
        }
    }

    // ------------------------------------------------------------------
    // Chat
    // ------------------------------------------------------------------

    async fn get_or_create_conversation(
        &self,
        product_id: Option<&str>,
        a: &str,
        b: &str,
    ) -> Result<Conversation> {
        let pair = sorted_pair(a, b);
        if let Some(existing) = self.find_conversation(&pair, product_id).await? {
            return Ok(existing);
        }

        self.require_session()?;
        let rb = self
            .table(Method::POST, TABLE_CONVERSATIONS)
            .json(&rows::encode_new_conversation(&pair, product_id));
        let row = match self.execute_returning(rb).await {
            Ok(row) => row.ok_or(RemoteError::NotFound)?,
            Err(err) if err.is_unique_violation() => {
                // Another client inserted the same conversation first.
                tracing::debug!(participants = ?pair, "conversation insert raced, reading back");
                return self
                    .find_conversation(&pair, product_id)
                    .await?
                    .ok_or(err);
            }
            Err(err) => return Err(err),
        };
        let conversation = rows::decode_conversation(row)?;
        tracing::debug!(conversation_id = %conversation.id, "created remote conversation");
        Ok(conversation)
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        let rb = self
            .table(Method::GET, TABLE_CONVERSATIONS)
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))]);
        match self.execute_optional(rb).await? {
            Some(value) => Ok(Some(rows::decode_conversation(value)?)),
            None => Ok(None),
        }
    }

    async fn conversations_for_user(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let rb = self.table(Method::GET, TABLE_CONVERSATIONS).query(&[
            ("select", "*".to_string()),
            (
                "or",
                format!("(participant_a.eq.{user_id},participant_b.eq.{user_id})"),
            ),
            ("order", "last_message_at.desc.nullslast".to_string()),
        ]);
        let value = self.execute(rb, Route::Table).await?;
        Ok(rows::decode_conversations(value)?)
    }

    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let rb = self.table(Method::GET, TABLE_MESSAGES).query(&[
            ("select", "*".to_string()),
            ("conversation_id", format!("eq.{conversation_id}")),
            ("order", "created_at.asc".to_string()),
        ]);
        let value = self.execute(rb, Route::Table).await?;
        Ok(rows::decode_messages(value)?)
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<Message> {
        self.require_session()?;
        let rb = self
            .table(Method::POST, TABLE_MESSAGES)
            .json(&rows::encode_new_message(message));
        let row = self.execute_returning(rb).await?.ok_or(RemoteError::NotFound)?;
        Ok(rows::decode_message(row)?)
    }

    async fn touch_conversation(
        &self,
        conversation_id: &str,
        last_message: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.require_session()?;
        let rb = self
            .table(Method::PATCH, TABLE_CONVERSATIONS)
            .query(&[("id", format!("eq.{conversation_id}"))])
            .header("Prefer", "return=minimal")
            .json(&rows::encode_conversation_touch(last_message, at));
        self.execute(rb, Route::Table).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> Result<SignUpOutcome> {
        let rb = self.auth(Method::POST, "signup").json(&json!({
            "email": email,
            "password": password,
            "data": metadata,
        }));
        let value = self.execute(rb, Route::Auth).await?;

        // With auto-confirm the response is a session; otherwise it is the
        // bare user (or `{ user, session: null }`).
        if value.get("access_token").is_some() {
            let session: Session = parse_auth(value)?;
            let user = session.user.clone();
            self.set_session(Some(session));
            tracing::info!(user_id = %user.id, "signed up with session");
            return Ok(SignUpOutcome {
                user,
                session_started: true,
            });
        }

        let user_value = match value.get("user") {
            Some(user) if user.is_object() => user.clone(),
            _ => value,
        };
        let user: AuthUser = parse_auth(user_value)?;
        tracing::info!(user_id = %user.id, "signed up, confirmation pending");
        Ok(SignUpOutcome {
            user,
            session_started: false,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let rb = self
            .auth(Method::POST, "token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let session: Session = parse_auth(self.execute(rb, Route::Auth).await?)?;
        let user = session.user.clone();
        self.set_session(Some(session));
        tracing::info!(user_id = %user.id, "signed in");
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        if !self.has_session() {
            return Ok(());
        }
        let rb = self.auth(Method::POST, "logout");
        let result = self.execute(rb, Route::Auth).await;
        self.set_session(None);
        result.map(|_| ())
    }

    async fn session_user(&self) -> Result<Option<AuthUser>> {
        if !self.has_session() {
            return Ok(None);
        }
        let rb = self.auth(Method::GET, "user");
        match self.execute(rb, Route::Auth).await {
            Ok(value) => {
                let user: AuthUser = parse_auth(value)?;
                self.replace_session_user(&user);
                Ok(Some(user))
            }
            Err(RemoteError::AuthRequired(reason)) => {
                tracing::info!(%reason, "remote session expired");
                self.set_session(None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn update_user_metadata(&self, metadata: Value) -> Result<AuthUser> {
        self.require_session()?;
        let rb = self
            .auth(Method::PUT, "user")
            .json(&json!({ "data": metadata }));
        let user: AuthUser = parse_auth(self.execute(rb, Route::Auth).await?)?;
        self.replace_session_user(&user);
        Ok(user)
    }
}
