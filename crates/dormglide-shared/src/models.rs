//! Domain records exchanged between the UI, the sync façade and both
//! backends.
//!
//! Everything serializes in camelCase, which is also the shape persisted in
//! the local store. The remote row shape (snake_case) lives in
//! `dormglide-remote` and is translated at that boundary only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_LOCATION, MAX_PRODUCT_IMAGES};
use crate::error::ValidationError;
use crate::types::{Condition, Role, UserStatus};

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

/// A marketplace listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub contact_info: String,
    /// Ordered image URIs, the first one is the cover.
    #[serde(default)]
    pub images: Vec<String>,
    pub seller_id: String,
    #[serde(default)]
    pub seller_name: String,
    #[serde(default)]
    pub seller_email: String,
    #[serde(default)]
    pub seller_campus: String,
    #[serde(default)]
    pub is_demo: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub views: u64,
}

impl Product {
    /// Shallow-merge a patch onto this product. `id`, `sellerId` and
    /// `createdAt` are never touched.
    pub fn apply_patch(&mut self, patch: &ProductPatch) {
        if let Some(ref v) = patch.title {
            self.title = v.clone();
        }
        if let Some(ref v) = patch.description {
            self.description = v.clone();
        }
        if let Some(v) = patch.price {
            self.price = v;
        }
        if let Some(ref v) = patch.category {
            self.category = v.clone();
        }
        if let Some(v) = patch.condition {
            self.condition = Some(v);
        }
        if let Some(ref v) = patch.location {
            self.location = v.clone();
        }
        if let Some(ref v) = patch.contact_info {
            self.contact_info = v.clone();
        }
        if let Some(ref v) = patch.images {
            self.images = v.clone();
        }
        if let Some(v) = patch.views {
            self.views = v;
        }
    }

    /// Whether `user` may edit or delete this listing. The remote backend
    /// enforces this with row-level security; locally it is advisory.
    pub fn is_editable_by(&self, user: &UserProfile) -> bool {
        user.id == self.seller_id || user.role == Role::Admin
    }
}

/// Payload for a new listing; the backend assigns `id`, `createdAt` and
/// starts `views` at zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub contact_info: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub seller_id: String,
    #[serde(default)]
    pub seller_name: String,
    #[serde(default)]
    pub seller_email: String,
    #[serde(default)]
    pub seller_campus: String,
    #[serde(default)]
    pub is_demo: bool,
}

impl NewProduct {
    pub fn new(title: impl Into<String>, price: f64, seller_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            price,
            seller_id: seller_id.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title"));
        }
        if self.seller_id.trim().is_empty() {
            return Err(ValidationError::MissingField("sellerId"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ValidationError::InvalidPrice);
        }
        if self.images.len() > MAX_PRODUCT_IMAGES {
            return Err(ValidationError::TooManyImages {
                got: self.images.len(),
                max: MAX_PRODUCT_IMAGES,
            });
        }
        Ok(())
    }

    /// Materialize the listing with a backend-assigned id and timestamp.
    pub fn into_product(self, id: String, created_at: DateTime<Utc>) -> Product {
        let location = if self.location.trim().is_empty() {
            DEFAULT_LOCATION.to_string()
        } else {
            self.location
        };
        Product {
            id,
            title: self.title,
            description: self.description,
            price: self.price,
            category: self.category,
            condition: self.condition,
            location,
            contact_info: self.contact_info.trim().to_string(),
            images: self.images,
            seller_id: self.seller_id,
            seller_name: self.seller_name,
            seller_email: self.seller_email,
            seller_campus: self.seller_campus,
            is_demo: self.is_demo,
            created_at,
            views: 0,
        }
    }
}

/// Partial update of a listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
}

impl ProductPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(ValidationError::InvalidPrice);
            }
        }
        if let Some(ref images) = self.images {
            if images.len() > MAX_PRODUCT_IMAGES {
                return Err(ValidationError::TooManyImages {
                    got: images.len(),
                    max: MAX_PRODUCT_IMAGES,
                });
            }
        }
        if matches!(self.title, Some(ref t) if t.trim().is_empty()) {
            return Err(ValidationError::MissingField("title"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A user profile as cached for the session and shown in the admin panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    /// Canonical `+<digits>` form, see [`crate::phone::sanitize_phone`].
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub university: String,
    #[serde(default)]
    pub campus_location: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub total_sales: u32,
    #[serde(default)]
    pub total_purchases: u32,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// Registration form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub university: String,
    #[serde(default)]
    pub campus_location: String,
    /// Free-form; anything other than user/seller/admin becomes `user`.
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Profile fields a user may edit about themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub university: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campus_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl ProfileUpdate {
    pub fn apply_to(&self, user: &mut UserProfile) {
        if let Some(ref v) = self.name {
            user.name = v.clone();
        }
        if let Some(ref v) = self.phone {
            user.phone = v.clone();
        }
        if let Some(ref v) = self.university {
            user.university = v.clone();
        }
        if let Some(ref v) = self.campus_location {
            user.campus_location = v.clone();
        }
        if let Some(ref v) = self.bio {
            user.bio = v.clone();
        }
        if let Some(v) = self.role {
            user.role = v;
        }
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Order two participant ids deterministically so that (A, B) and (B, A)
/// address the same conversation.
pub fn sorted_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub product_id: Option<String>,
    /// Lexicographically smaller participant id.
    pub participant_a: String,
    pub participant_b: String,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn participants(&self) -> Vec<String> {
        vec![self.participant_a.clone(), self.participant_b.clone()]
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.participant_a == user_id || self.participant_b == user_id
    }

    pub fn other_participant(&self, user_id: &str) -> &str {
        if self.participant_a == user_id {
            &self.participant_b
        } else {
            &self.participant_a
        }
    }

    /// Timestamp used to order conversation lists (most recent first).
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.last_message_at.unwrap_or(self.created_at)
    }

    pub fn matches(&self, pair: &(String, String), product_id: Option<&str>) -> bool {
        self.participant_a == pair.0
            && self.participant_b == pair.1
            && self.product_id.as_deref() == product_id
    }
}

/// A conversation as listed for one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub other_user_id: String,
}

impl ConversationSummary {
    pub fn for_user(conversation: Conversation, user_id: &str) -> Self {
        let other_user_id = conversation.other_participant(user_id).to_string();
        Self {
            conversation,
            other_user_id,
        }
    }
}

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub body: String,
    #[serde(default)]
    pub product_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Sort messages into read order (createdAt ascending, id as tie-breaker).
pub fn sort_messages(messages: &mut [Message]) {
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// Everything needed to post a message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutgoingMessage {
    /// Existing conversation; resolved from the participants when `None`.
    pub conversation_id: Option<String>,
    pub product_id: Option<String>,
    pub sender_id: String,
    pub receiver_id: String,
    pub body: String,
    /// Only used for the activity log.
    pub product_title: String,
}

impl OutgoingMessage {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sender_id.is_empty() {
            return Err(ValidationError::MissingField("senderId"));
        }
        if self.receiver_id.is_empty() {
            return Err(ValidationError::MissingField("receiverId"));
        }
        if self.body.trim().is_empty() {
            return Err(ValidationError::MissingField("body"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub theme: String,
    pub notifications: bool,
    #[serde(default)]
    pub search_history: Vec<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: "light".into(),
            notifications: true,
            search_history: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewEntry {
    pub product_id: String,
    pub product_title: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseEntry {
    pub product_id: String,
    pub product_title: String,
    pub price: f64,
    pub seller_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaleEntry {
    pub product_id: String,
    pub product_title: String,
    pub price: f64,
    pub buyer_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    pub product_id: String,
    pub product_title: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageEntry {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub product_title: String,
    pub message: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub direction: MessageDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntry {
    pub term: String,
    pub results_count: u32,
    pub timestamp: DateTime<Utc>,
}

/// Per-user append-only activity log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(default)]
    pub views: Vec<ViewEntry>,
    #[serde(default)]
    pub purchases: Vec<PurchaseEntry>,
    #[serde(default)]
    pub sales: Vec<SaleEntry>,
    #[serde(default)]
    pub favorites: Vec<FavoriteEntry>,
    #[serde(default)]
    pub messages: Vec<MessageEntry>,
    #[serde(default)]
    pub searches: Vec<SearchEntry>,
}

impl Activity {
    pub fn summary(&self) -> ActivitySummary {
        ActivitySummary {
            total_views: self.views.len(),
            total_purchases: self.purchases.len(),
            total_sales: self.sales.len(),
            total_favorites: self.favorites.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub total_views: usize,
    pub total_purchases: usize,
    pub total_sales: usize,
    pub total_favorites: usize,
}

/// A user row in the admin panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserView {
    #[serde(flatten)]
    pub user: UserProfile,
    pub activity_summary: ActivitySummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_sorted_pair_is_order_independent() {
        assert_eq!(sorted_pair("u2", "u1"), sorted_pair("u1", "u2"));
        assert_eq!(sorted_pair("u2", "u1").0, "u1");
    }

    #[test]
    fn test_new_product_validation() {
        assert!(NewProduct::new("Desk", 40.0, "u1").validate().is_ok());
        assert_eq!(
            NewProduct::new("", 40.0, "u1").validate(),
            Err(ValidationError::MissingField("title"))
        );
        assert_eq!(
            NewProduct::new("Desk", -1.0, "u1").validate(),
            Err(ValidationError::InvalidPrice)
        );
        assert_eq!(
            NewProduct::new("Desk", f64::NAN, "u1").validate(),
            Err(ValidationError::InvalidPrice)
        );

        let mut many = NewProduct::new("Desk", 40.0, "u1");
        many.images = (0..6).map(|i| format!("https://img/{i}")).collect();
        assert_eq!(
            many.validate(),
            Err(ValidationError::TooManyImages { got: 6, max: 5 })
        );
    }

    #[test]
    fn test_into_product_fills_defaults() {
        let product = NewProduct::new("Desk", 40.0, "u1").into_product("p1".into(), ts(10));
        assert_eq!(product.views, 0);
        assert_eq!(product.location, DEFAULT_LOCATION);
        assert_eq!(product.created_at, ts(10));
        assert!(!product.is_demo);
    }

    #[test]
    fn test_apply_patch_keeps_identity() {
        let mut product = NewProduct::new("Desk", 40.0, "u1").into_product("p1".into(), ts(10));
        product.apply_patch(&ProductPatch {
            price: Some(35.0),
            title: Some("Standing desk".into()),
            ..Default::default()
        });
        assert_eq!(product.id, "p1");
        assert_eq!(product.seller_id, "u1");
        assert_eq!(product.price, 35.0);
        assert_eq!(product.title, "Standing desk");
    }

    #[test]
    fn test_is_editable_by_owner_or_admin() {
        let product = NewProduct::new("Desk", 40.0, "u1").into_product("p1".into(), ts(10));
        let owner = UserProfile {
            id: "u1".into(),
            ..Default::default()
        };
        let stranger = UserProfile {
            id: "u2".into(),
            ..Default::default()
        };
        let admin = UserProfile {
            id: "u3".into(),
            role: Role::Admin,
            ..Default::default()
        };
        assert!(product.is_editable_by(&owner));
        assert!(!product.is_editable_by(&stranger));
        assert!(product.is_editable_by(&admin));
    }

    #[test]
    fn test_sort_messages_ascending() {
        let msg = |id: &str, secs: i64| Message {
            id: id.into(),
            conversation_id: "c1".into(),
            sender_id: "u1".into(),
            receiver_id: "u2".into(),
            body: id.into(),
            product_id: None,
            created_at: ts(secs),
        };
        let mut messages = vec![msg("c", 30), msg("a", 10), msg("b", 20)];
        sort_messages(&mut messages);
        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn test_conversation_summary_other_user() {
        let conversation = Conversation {
            id: "c1".into(),
            product_id: None,
            participant_a: "u1".into(),
            participant_b: "u2".into(),
            last_message: None,
            last_message_at: None,
            created_at: ts(0),
        };
        let summary = ConversationSummary::for_user(conversation, "u2");
        assert_eq!(summary.other_user_id, "u1");
    }

    #[test]
    fn test_product_json_is_camel_case() {
        let product = NewProduct::new("Desk", 40.0, "u1").into_product("p1".into(), ts(10));
        let value = serde_json::to_value(&product).unwrap();
        assert!(value.get("sellerId").is_some());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("seller_id").is_none());
    }
}
