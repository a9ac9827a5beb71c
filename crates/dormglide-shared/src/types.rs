use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Physical condition of a listed item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Condition {
    #[serde(rename = "New")]
    New,
    #[serde(rename = "Like New", alias = "like_new", alias = "LikeNew")]
    LikeNew,
    #[serde(rename = "Good")]
    Good,
    #[serde(rename = "Fair")]
    Fair,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::LikeNew => "Like New",
            Self::Good => "Good",
            Self::Fair => "Fair",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Seller,
    Admin,
}

impl Role {
    /// Parse a role name, falling back to [`Role::User`] for anything unknown.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "seller" => Self::Seller,
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Seller => "seller",
            Self::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Suspended,
}

/// Governs whether writes may silently land in the local store.
///
/// `Hybrid` permits local fallback when the remote is unauthenticated or
/// unreachable; `SupabaseOnly` turns both cases into errors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    #[serde(rename = "hybrid")]
    Hybrid,
    #[serde(rename = "supabase-only")]
    SupabaseOnly,
}

impl AuthMode {
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::SupabaseOnly)
    }
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hybrid" => Ok(Self::Hybrid),
            "supabase-only" | "supabase_only" | "strict" => Ok(Self::SupabaseOnly),
            other => Err(format!("unknown auth mode: {other}")),
        }
    }
}

/// Which backend actually served (or persisted) a request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Remote,
    Local,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote => f.write_str("remote"),
            Self::Local => f.write_str("local"),
        }
    }
}
