//! User service
//!
//! Business logic for accounts and authentication:
//! - signup (the first registered user becomes the administrator)
//! - login/logout with database-backed session tokens
//! - profile and password management
//! - the password-reset token flow (hashed token, 15-minute expiry)
//! - admin moderation: block toggle and the user-deletion cascade

use crate::db::repositories::{PostRepository, SessionRepository, UserRepository};
use crate::models::{Session, UpdateProfileInput, User};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

/// Session lifetime in days
const SESSION_EXPIRATION_DAYS: i64 = 30;

/// Password-reset token lifetime in minutes
const RESET_TOKEN_EXPIRATION_MINUTES: i64 = 15;

/// Minimum accepted password length
const MIN_PASSWORD_LENGTH: usize = 6;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Input for user registration
#[derive(Debug, Clone)]
pub struct SignupInput {
    /// Display name
    pub name: String,
    /// Email address (will be lowercased)
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
}

/// User service
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    post_repo: Arc<dyn PostRepository>,
    session_repo: Arc<dyn SessionRepository>,
}

impl UserService {
    /// Create a new user service
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        post_repo: Arc<dyn PostRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            user_repo,
            post_repo,
            session_repo,
        }
    }

    /// Register a new user and open a session.
    ///
    /// Emails are unique case-insensitively; the address is lowercased
    /// before storage and lookup. The first account ever registered becomes
    /// the administrator.
    ///
    /// # Errors
    /// - `Validation` for an empty name, malformed email, or short password
    /// - `Conflict` when the email is already registered
    pub async fn signup(&self, input: SignupInput) -> ServiceResult<(User, Session)> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation("Name cannot be empty".to_string()));
        }
        let email = input.email.trim().to_lowercase();
        if !EMAIL_REGEX.is_match(&email) {
            return Err(ServiceError::Validation("Invalid email address".to_string()));
        }
        validate_password(&input.password)?;

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(ServiceError::Conflict("User already exists".to_string()));
        }

        let is_first = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?
            == 0;

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(input.name.trim().to_string(), email, password_hash, is_first);

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = %created.id, admin = created.is_admin, "user registered");

        let session = self.open_session(&created.id).await?;
        Ok((created, session))
    }

    /// Authenticate a user and open a session.
    ///
    /// # Errors
    /// - `Unauthorized` for an unknown email or wrong password
    /// - `Forbidden` when the account is blocked
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<(User, Session)> {
        let email = email.trim().to_lowercase();

        let user = self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to look up user")?
            .ok_or_else(|| {
                ServiceError::Unauthorized("Invalid email or password".to_string())
            })?;

        let valid =
            verify_password(password, &user.password_hash).context("Failed to verify password")?;
        if !valid {
            return Err(ServiceError::Unauthorized(
                "Invalid email or password".to_string(),
            ));
        }

        if user.is_blocked {
            return Err(ServiceError::Forbidden(
                "Your account has been blocked.".to_string(),
            ));
        }

        let session = self.open_session(&user.id).await?;
        Ok((user, session))
    }

    /// Close a session; closing an unknown token is a no-op
    pub async fn logout(&self, token: &str) -> ServiceResult<()> {
        Ok(self
            .session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?)
    }

    /// Resolve a session token to its user.
    ///
    /// Expired sessions are removed on sight and answered with `None`.
    pub async fn validate_session(&self, token: &str) -> ServiceResult<Option<User>> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            self.session_repo
                .delete(&session.id)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        Ok(self
            .user_repo
            .get_by_id(&session.user_id)
            .await
            .context("Failed to get session user")?)
    }

    /// Get a user by id
    pub async fn get_user(&self, id: &str) -> ServiceResult<User> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    /// List all users, newest join first (admin)
    pub async fn list_users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.user_repo.list().await.context("Failed to list users")?)
    }

    /// Self-service profile update
    pub async fn update_profile(
        &self,
        user_id: &str,
        input: UpdateProfileInput,
    ) -> ServiceResult<User> {
        let mut user = self.get_user(user_id).await?;

        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(ServiceError::Validation("Name cannot be empty".to_string()));
            }
            user.name = name.trim().to_string();
        }
        if let Some(bio) = input.bio {
            if bio.chars().count() > crate::models::MAX_BIO_LENGTH {
                return Err(ServiceError::Validation(format!(
                    "Bio cannot exceed {} characters",
                    crate::models::MAX_BIO_LENGTH
                )));
            }
            user.bio = bio;
        }
        if let Some(profile_pic) = input.profile_pic {
            user.profile_pic = profile_pic;
        }

        Ok(self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update profile")?)
    }

    /// Change the password after confirming the current one.
    ///
    /// # Errors
    /// - `Unauthorized` when the current password doesn't match
    /// - `Validation` when the new password is too short
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> ServiceResult<()> {
        let mut user = self.get_user(user_id).await?;

        let valid = verify_password(current_password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            return Err(ServiceError::Unauthorized(
                "Invalid current password.".to_string(),
            ));
        }

        validate_password(new_password)?;

        user.password_hash = hash_password(new_password).context("Failed to hash password")?;
        self.user_repo
            .update(&user)
            .await
            .context("Failed to update password")?;

        Ok(())
    }

    /// Begin a password reset for the given email.
    ///
    /// Returns `None` for an unknown address, so the caller can answer with
    /// the same generic message either way. Otherwise stores the SHA-256
    /// digest of a fresh token (replacing any previous one) with a
    /// 15-minute expiry and returns the raw token for the email link.
    pub async fn begin_password_reset(&self, email: &str) -> ServiceResult<Option<(User, String)>> {
        let email = email.trim().to_lowercase();

        let mut user = match self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to look up user")?
        {
            Some(user) => user,
            None => return Ok(None),
        };

        let raw_token = Uuid::new_v4().simple().to_string();
        user.reset_token_hash = Some(hash_token(&raw_token));
        user.reset_token_expires_at =
            Some(Utc::now() + Duration::minutes(RESET_TOKEN_EXPIRATION_MINUTES));

        let user = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to store reset token")?;

        Ok(Some((user, raw_token)))
    }

    /// Discard a stored reset token (after a failed email send)
    pub async fn clear_reset_token(&self, user_id: &str) -> ServiceResult<()> {
        let mut user = self.get_user(user_id).await?;
        user.reset_token_hash = None;
        user.reset_token_expires_at = None;

        self.user_repo
            .update(&user)
            .await
            .context("Failed to clear reset token")?;

        Ok(())
    }

    /// Complete a password reset with the raw token from the email link.
    ///
    /// # Errors
    /// - `Validation` when the token is unknown or expired, or the new
    ///   password is too short
    pub async fn reset_password(&self, raw_token: &str, new_password: &str) -> ServiceResult<()> {
        validate_password(new_password)?;

        let mut user = self
            .user_repo
            .get_by_reset_token(&hash_token(raw_token))
            .await
            .context("Failed to look up reset token")?
            .ok_or_else(|| {
                ServiceError::Validation("Invalid or expired token. Please try again.".to_string())
            })?;

        user.password_hash = hash_password(new_password).context("Failed to hash password")?;
        user.reset_token_hash = None;
        user.reset_token_expires_at = None;

        self.user_repo
            .update(&user)
            .await
            .context("Failed to reset password")?;

        // Old sessions don't survive a password reset
        self.session_repo
            .delete_by_user(&user.id)
            .await
            .context("Failed to close sessions")?;

        tracing::info!(user_id = %user.id, "password reset completed");

        Ok(())
    }

    /// Toggle the blocked flag on an account (admin); returns the new state
    pub async fn toggle_block(&self, user_id: &str) -> ServiceResult<bool> {
        let mut user = self.get_user(user_id).await?;
        user.is_blocked = !user.is_blocked;

        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to toggle block")?;

        tracing::info!(user_id = %user_id, blocked = updated.is_blocked, "block toggled");

        Ok(updated.is_blocked)
    }

    /// Delete a user and everything that points at them (admin).
    ///
    /// Ordered idempotent steps, safe to re-issue after a partial failure:
    /// 1. delete the user's posts (their embedded ratings go with them)
    /// 2. delete every rating the user gave on other posts
    /// 3. delete the user's own saved-post rows
    /// 4. close the user's sessions
    /// 5. delete the user row
    ///
    /// Saved references OTHER users hold to the deleted posts are left in
    /// place; readers treat them as "post no longer exists".
    ///
    /// # Errors
    /// - `NotFound` when the user doesn't exist
    /// - `Forbidden` when the target is an admin account
    pub async fn delete_user(&self, user_id: &str) -> ServiceResult<()> {
        let user = self.get_user(user_id).await?;

        if user.is_admin {
            return Err(ServiceError::Forbidden(
                "Cannot delete an admin user.".to_string(),
            ));
        }

        let deleted_posts = self
            .post_repo
            .delete_by_author(user_id)
            .await
            .context("Failed to delete authored posts")?;

        let deleted_ratings = self
            .post_repo
            .delete_ratings_by_rater(user_id)
            .await
            .context("Failed to delete given ratings")?;

        self.user_repo
            .delete_saved_by_user(user_id)
            .await
            .context("Failed to delete saved posts")?;

        self.session_repo
            .delete_by_user(user_id)
            .await
            .context("Failed to close sessions")?;

        self.user_repo
            .delete(user_id)
            .await
            .context("Failed to delete user")?;

        tracing::info!(
            user_id = %user_id,
            deleted_posts,
            deleted_ratings,
            "user deleted with cascade"
        );

        Ok(())
    }

    async fn open_session(&self, user_id: &str) -> ServiceResult<Session> {
        let now = Utc::now();
        let session = Session {
            // Two concatenated UUIDs fill the 64-char token column
            id: format!(
                "{}{}",
                Uuid::new_v4().simple(),
                Uuid::new_v4().simple()
            ),
            user_id: user_id.to_string(),
            expires_at: now + Duration::days(SESSION_EXPIRATION_DAYS),
            created_at: now,
        };

        Ok(self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?)
    }
}

fn validate_password(password: &str) -> ServiceResult<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// SHA-256 digest of a reset token, hex encoded
fn hash_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    format!("{:x}", hasher.finalize())
}
