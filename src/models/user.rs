//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default avatar for accounts that never set one
pub const DEFAULT_PROFILE_PIC: &str = "https://picsum.photos/seed/default-avatar/200";

/// Maximum length of the profile bio
pub const MAX_BIO_LENGTH: usize = 300;

/// User entity representing a registered account.
///
/// The password hash and the password-reset token fields never leave the
/// process; API responses are built from `api::responses::UserResponse`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (opaque string, stable for the account's lifetime)
    pub id: String,
    /// Display name
    pub name: String,
    /// Email address (unique, stored lowercased)
    pub email: String,
    /// Password hash (argon2id PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Profile picture URL
    pub profile_pic: String,
    /// Short bio, at most [`MAX_BIO_LENGTH`] characters
    pub bio: String,
    /// Whether the account has admin privileges
    pub is_admin: bool,
    /// Whether the account is blocked from logging in or writing
    pub is_blocked: bool,
    /// Join timestamp
    pub created_at: DateTime<Utc>,
    /// SHA-256 digest of the active password-reset token, if any
    #[serde(skip_serializing)]
    pub reset_token_hash: Option<String>,
    /// Expiry of the active password-reset token
    #[serde(skip_serializing)]
    pub reset_token_expires_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new User.
    ///
    /// The password must already be hashed; use
    /// `services::password::hash_password()`.
    pub fn new(name: String, email: String, password_hash: String, is_admin: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password_hash,
            profile_pic: DEFAULT_PROFILE_PIC.to_string(),
            bio: String::new(),
            is_admin,
            is_blocked: false,
            created_at: Utc::now(),
            reset_token_hash: None,
            reset_token_expires_at: None,
        }
    }

    /// Whether the stored reset token is present and unexpired
    pub fn has_valid_reset_token(&self) -> bool {
        match (&self.reset_token_hash, self.reset_token_expires_at) {
            (Some(_), Some(expires_at)) => expires_at > Utc::now(),
            _ => false,
        }
    }
}

/// Input for a self-service profile update
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileInput {
    /// New display name (optional)
    pub name: Option<String>,
    /// New bio (optional)
    pub bio: Option<String>,
    /// New profile picture URL (optional)
    pub profile_pic: Option<String>,
}

impl UpdateProfileInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.name.is_some() || self.bio.is_some() || self.profile_pic.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_user_new() {
        let user = User::new(
            "Alice".to_string(),
            "alice@example.com".to_string(),
            "hashed_password".to_string(),
            false,
        );

        assert!(!user.id.is_empty());
        assert_eq!(user.name, "Alice");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.profile_pic, DEFAULT_PROFILE_PIC);
        assert!(!user.is_admin);
        assert!(!user.is_blocked);
        assert!(user.reset_token_hash.is_none());
    }

    #[test]
    fn test_user_ids_are_unique() {
        let a = User::new("A".into(), "a@example.com".into(), "h".into(), false);
        let b = User::new("B".into(), "b@example.com".into(), "h".into(), false);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_has_valid_reset_token() {
        let mut user = User::new("A".into(), "a@example.com".into(), "h".into(), false);
        assert!(!user.has_valid_reset_token());

        user.reset_token_hash = Some("digest".to_string());
        user.reset_token_expires_at = Some(Utc::now() + Duration::minutes(15));
        assert!(user.has_valid_reset_token());

        user.reset_token_expires_at = Some(Utc::now() - Duration::minutes(1));
        assert!(!user.has_valid_reset_token());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("A".into(), "a@example.com".into(), "secret-hash".into(), false);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
    }
}
