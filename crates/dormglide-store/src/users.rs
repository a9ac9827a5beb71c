//! User profiles, local credentials and the cached session user.
//!
//! The `users` document doubles as the local account table (used when the
//! remote auth service is unreachable) and as the admin panel's user cache.
//! Passwords are never stored in clear: each account keeps a random salt and
//! the BLAKE3 digest of `salt || password`.

use chrono::Utc;
use dormglide_shared::constants::{KEY_CURRENT_USER, KEY_PREFERENCES, KEY_PRODUCTS, KEY_USERS};
use dormglide_shared::{UserProfile, UserStatus};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::{Result, StoreError};

/// Salted password digest of a locally registered account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    pub salt: String,
    pub digest: String,
}

impl Credential {
    pub fn new(password: &str) -> Self {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt = hex::encode(salt);
        let digest = digest(&salt, password);
        Self { salt, digest }
    }

    pub fn verify(&self, password: &str) -> bool {
        digest(&self.salt, password) == self.digest
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// One entry of the `users` document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredUser {
    #[serde(flatten)]
    pub profile: UserProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,
}

impl Database {
    fn stored_users(&self) -> Result<Vec<StoredUser>> {
        self.read_json_or_default(KEY_USERS)
    }

    pub fn list_users(&self) -> Result<Vec<UserProfile>> {
        Ok(self.stored_users()?.into_iter().map(|u| u.profile).collect())
    }

    pub fn get_user(&self, id: &str) -> Result<Option<UserProfile>> {
        Ok(self
            .stored_users()?
            .into_iter()
            .find(|u| u.profile.id == id)
            .map(|u| u.profile))
    }

    /// Case-insensitive lookup by email.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserProfile>> {
        let email = email.trim();
        Ok(self
            .stored_users()?
            .into_iter()
            .find(|u| u.profile.email.eq_ignore_ascii_case(email))
            .map(|u| u.profile))
    }

    /// Insert `profile` or replace the cached profile with the same id,
    /// keeping any local credential.
    pub fn upsert_user(&self, profile: &UserProfile) -> Result<()> {
        let mut users = self.stored_users()?;
        match users.iter_mut().find(|u| u.profile.id == profile.id) {
            Some(existing) => existing.profile = profile.clone(),
            None => users.push(StoredUser {
                profile: profile.clone(),
                credential: None,
            }),
        }
        self.write_json(KEY_USERS, &users)
    }

    /// Create a device-only account. Fails with [`StoreError::Conflict`] when
    /// the email is already taken.
    pub fn register_local_user(&self, profile: &UserProfile, password: &str) -> Result<()> {
        let mut users = self.stored_users()?;
        if users
            .iter()
            .any(|u| u.profile.email.eq_ignore_ascii_case(profile.email.trim()))
        {
            return Err(StoreError::Conflict(
                "An account with this email already exists".into(),
            ));
        }
        users.push(StoredUser {
            profile: profile.clone(),
            credential: Some(Credential::new(password)),
        });
        self.write_json(KEY_USERS, &users)?;
        tracing::info!(user_id = %profile.id, "registered local account");
        Ok(())
    }

    /// Check a local login. Returns the profile with `lastLogin` refreshed, or
    /// `None` when the email is unknown or the password does not match.
    /// Suspended accounts are rejected with [`StoreError::Conflict`].
    pub fn verify_local_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserProfile>> {
        let mut users = self.stored_users()?;
        let Some(user) = users
            .iter_mut()
            .find(|u| u.profile.email.eq_ignore_ascii_case(email.trim()))
        else {
            return Ok(None);
        };

        let matches = user
            .credential
            .as_ref()
            .is_some_and(|cred| cred.verify(password));
        if !matches {
            return Ok(None);
        }
        if !user.profile.is_active() {
            return Err(StoreError::Conflict(
                "This account has been suspended".into(),
            ));
        }

        user.profile.last_login = Some(Utc::now());
        let profile = user.profile.clone();
        self.write_json(KEY_USERS, &users)?;
        Ok(Some(profile))
    }

    /// Change an account's status. Returns the updated profile, or
    /// [`StoreError::NotFound`].
    pub fn set_user_status(&self, id: &str, status: UserStatus) -> Result<UserProfile> {
        let mut users = self.stored_users()?;
        let user = users
            .iter_mut()
            .find(|u| u.profile.id == id)
            .ok_or(StoreError::NotFound)?;
        user.profile.status = status;
        let profile = user.profile.clone();
        self.write_json(KEY_USERS, &users)?;

        // Keep the session copy in step when the affected user is logged in.
        if matches!(self.current_user()?, Some(ref current) if current.id == id) {
            self.cache_session_user(&profile)?;
        }
        Ok(profile)
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    pub fn current_user(&self) -> Result<Option<UserProfile>> {
        self.read_json(KEY_CURRENT_USER)
    }

    /// Cache the session user and mirror it into the user table.
    pub fn cache_session_user(&self, profile: &UserProfile) -> Result<()> {
        self.write_json(KEY_CURRENT_USER, profile)?;
        self.upsert_user(profile)
    }

    pub fn clear_session_user(&self) -> Result<()> {
        self.remove_key(KEY_CURRENT_USER)?;
        Ok(())
    }

    /// Drop listings, the session user and preferences.
    pub fn clear_all(&self) -> Result<()> {
        for key in [KEY_PRODUCTS, KEY_CURRENT_USER, KEY_PREFERENCES] {
            self.remove_key(key)?;
        }
        tracing::info!("cleared local store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dormglide_shared::Role;

    fn profile(id: &str, email: &str) -> UserProfile {
        UserProfile {
            id: id.into(),
            email: email.into(),
            name: "Test".into(),
            ..Default::default()
        }
    }

    #[test]
    fn credential_verifies_only_the_right_password() {
        let cred = Credential::new("hunter2");
        assert!(cred.verify("hunter2"));
        assert!(!cred.verify("hunter3"));
        assert_ne!(Credential::new("hunter2").salt, cred.salt);
    }

    #[test]
    fn register_then_login() {
        let db = Database::open_in_memory().unwrap();
        db.register_local_user(&profile("u1", "a@uni.edu"), "secret")
            .unwrap();

        let user = db
            .verify_local_credentials("A@uni.edu", "secret")
            .unwrap()
            .unwrap();
        assert_eq!(user.id, "u1");
        assert!(user.last_login.is_some());

        assert!(db
            .verify_local_credentials("a@uni.edu", "wrong")
            .unwrap()
            .is_none());
        assert!(db
            .verify_local_credentials("nobody@uni.edu", "secret")
            .unwrap()
            .is_none());
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.register_local_user(&profile("u1", "a@uni.edu"), "x").unwrap();
        let err = db
            .register_local_user(&profile("u2", "a@uni.edu"), "y")
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn suspended_user_cannot_log_in() {
        let db = Database::open_in_memory().unwrap();
        db.register_local_user(&profile("u1", "a@uni.edu"), "secret")
            .unwrap();
        db.set_user_status("u1", UserStatus::Suspended).unwrap();
        let err = db
            .verify_local_credentials("a@uni.edu", "secret")
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn upsert_keeps_credential() {
        let db = Database::open_in_memory().unwrap();
        db.register_local_user(&profile("u1", "a@uni.edu"), "secret")
            .unwrap();
        let mut updated = profile("u1", "a@uni.edu");
        updated.role = Role::Seller;
        db.upsert_user(&updated).unwrap();

        assert_eq!(db.get_user("u1").unwrap().unwrap().role, Role::Seller);
        assert!(db
            .verify_local_credentials("a@uni.edu", "secret")
            .unwrap()
            .is_some());
    }

    #[test]
    fn session_cache_round_trip() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.current_user().unwrap().is_none());

        db.cache_session_user(&profile("u1", "a@uni.edu")).unwrap();
        assert_eq!(db.current_user().unwrap().unwrap().id, "u1");
        assert!(db.find_user_by_email("a@uni.edu").unwrap().is_some());

        db.clear_session_user().unwrap();
        assert!(db.current_user().unwrap().is_none());
    }

    #[test]
    fn status_change_updates_session_copy() {
        let db = Database::open_in_memory().unwrap();
        db.cache_session_user(&profile("u1", "a@uni.edu")).unwrap();
        db.set_user_status("u1", UserStatus::Suspended).unwrap();
        assert!(!db.current_user().unwrap().unwrap().is_active());
        assert!(matches!(
            db.set_user_status("ghost", UserStatus::Active),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn clear_all_drops_session_and_products() {
        let db = Database::open_in_memory().unwrap();
        db.cache_session_user(&profile("u1", "a@uni.edu")).unwrap();
        db.seed_demo_products_if_empty().unwrap();
        db.clear_all().unwrap();
        assert!(db.current_user().unwrap().is_none());
        assert!(db.list_products().unwrap().is_empty());
        // The account table survives.
        assert_eq!(db.list_users().unwrap().len(), 1);
    }
}
