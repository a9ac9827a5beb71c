//! Auth service payloads and profile normalisation.
//!
//! The auth service knows a user as an id, an email and a free-form metadata
//! bag. [`normalize_user`] turns that into a [`UserProfile`], filling gaps
//! from a locally cached profile.

use chrono::{DateTime, Utc};
use dormglide_shared::phone::sanitize_phone;
use dormglide_shared::{NewUser, ProfileUpdate, Role, UserProfile, UserStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A user as returned by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
}

/// An authenticated session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

/// Result of a sign-up. `session_started` is false when the project requires
/// email confirmation before the first login.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session_started: bool,
}

impl AuthUser {
    fn meta_str(&self, key: &str) -> Option<&str> {
        self.user_metadata.get(key).and_then(Value::as_str)
    }

    fn meta_f64(&self, key: &str) -> Option<f64> {
        self.user_metadata.get(key).and_then(Value::as_f64)
    }

    fn meta_u32(&self, key: &str) -> Option<u32> {
        self.user_metadata
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    }
}

/// Build a profile from an auth user, preferring metadata, then `fallback`.
pub fn normalize_user(user: &AuthUser, fallback: &UserProfile) -> UserProfile {
    let text = |key: &str, fallback: &str| -> String {
        user.meta_str(key).unwrap_or(fallback).to_string()
    };

    let email = user
        .email
        .clone()
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| fallback.email.clone());

    let name = match user.meta_str("name").filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None if !fallback.name.is_empty() => fallback.name.clone(),
        None if !email.is_empty() => email.clone(),
        None => "DormGlide user".to_string(),
    };

    let role = user
        .meta_str("role")
        .map(Role::parse_or_default)
        .unwrap_or(fallback.role);

    let status = match user.meta_str("status") {
        Some("suspended") => UserStatus::Suspended,
        _ => UserStatus::Active,
    };

    let now = Utc::now();
    let created_at = user.created_at.unwrap_or(now);
    let joined_at = user
        .meta_str("joinedAt")
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(created_at);

    UserProfile {
        id: user.id.clone(),
        email,
        name,
        phone: sanitize_phone(user.meta_str("phone").unwrap_or(&fallback.phone)),
        university: text("university", &fallback.university),
        campus_location: text("campusLocation", &fallback.campus_location),
        role,
        status,
        bio: text("bio", &fallback.bio),
        rating: user.meta_f64("rating").unwrap_or(fallback.rating),
        total_sales: user.meta_u32("totalSales").unwrap_or(fallback.total_sales),
        total_purchases: user
            .meta_u32("totalPurchases")
            .unwrap_or(fallback.total_purchases),
        verified: user.email_confirmed_at.is_some()
            || user
                .user_metadata
                .get("verified")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        joined_at,
        created_at,
        last_login: Some(user.last_sign_in_at.unwrap_or(now)),
    }
}

/// Default bio for a new account, e.g. "Student at State University".
pub fn default_bio(role: Role, university: &str) -> String {
    let who = if role == Role::Seller { "Seller" } else { "Student" };
    let school = if university.trim().is_empty() {
        "DormGlide University"
    } else {
        university
    };
    format!("{who} at {school}")
}

/// Metadata bag sent with a sign-up.
pub fn signup_metadata(form: &NewUser, joined_at: DateTime<Utc>) -> Value {
    let role = Role::parse_or_default(&form.role);
    let bio = form
        .bio
        .clone()
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| default_bio(role, &form.university));
    serde_json::json!({
        "name": form.name,
        "phone": sanitize_phone(&form.phone),
        "university": form.university,
        "campusLocation": form.campus_location,
        "role": role.as_str(),
        "bio": bio,
        "status": "active",
        "joinedAt": joined_at.to_rfc3339(),
    })
}

/// Metadata patch for a profile update; only the fields that are set.
pub fn update_metadata(update: &ProfileUpdate) -> Value {
    let mut map = Map::new();
    let mut put = |key: &str, value: Option<String>| {
        if let Some(v) = value {
            map.insert(key.to_string(), Value::String(v));
        }
    };
    put("name", update.name.clone());
    put("phone", update.phone.as_deref().map(sanitize_phone));
    put("university", update.university.clone());
    put("campusLocation", update.campus_location.clone());
    put("bio", update.bio.clone());
    put("role", update.role.map(|r| r.as_str().to_string()));
    Value::Object(map)
}
