//! Rate limiter for login attempts
//!
//! Protection against credential stuffing:
//! - at most 5 failed attempts per account in 15 minutes
//! - at most 10 login requests per IP address per minute

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Login rate limiter
pub struct LoginRateLimiter {
    /// Failed login attempts keyed by account email
    account_attempts: Arc<RwLock<HashMap<String, Vec<DateTime<Utc>>>>>,
    /// Login requests keyed by IP address
    ip_attempts: Arc<RwLock<HashMap<IpAddr, Vec<DateTime<Utc>>>>>,
}

impl LoginRateLimiter {
    /// Create a new rate limiter
    pub fn new() -> Self {
        Self {
            account_attempts: Arc::new(RwLock::new(HashMap::new())),
            ip_attempts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Check if an account is rate limited (5 failed attempts per 15 minutes)
    pub async fn is_account_limited(&self, email: &str) -> bool {
        let mut attempts = self.account_attempts.write().await;
        let cutoff = Utc::now() - Duration::minutes(15);

        let account_attempts = attempts.entry(email.to_lowercase()).or_default();
        account_attempts.retain(|time| *time > cutoff);

        account_attempts.len() >= 5
    }

    /// Record a failed login attempt for an account
    pub async fn record_failed_attempt(&self, email: &str) {
        let mut attempts = self.account_attempts.write().await;
        attempts
            .entry(email.to_lowercase())
            .or_default()
            .push(Utc::now());
    }

    /// Clear failed attempts for an account (on successful login)
    pub async fn clear_account_attempts(&self, email: &str) {
        let mut attempts = self.account_attempts.write().await;
        attempts.remove(&email.to_lowercase());
    }

    /// Check if an IP is rate limited (10 requests per minute)
    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        let mut attempts = self.ip_attempts.write().await;
        let cutoff = Utc::now() - Duration::minutes(1);

        let ip_attempts = attempts.entry(ip).or_default();
        ip_attempts.retain(|time| *time > cutoff);

        ip_attempts.len() >= 10
    }

    /// Record a login request from an IP
    pub async fn record_ip_request(&self, ip: IpAddr) {
        let mut attempts = self.ip_attempts.write().await;
        attempts.entry(ip).or_default().push(Utc::now());
    }

    /// Drop entries older than the rate windows; called periodically
    pub async fn cleanup(&self) {
        let account_cutoff = Utc::now() - Duration::minutes(15);
        let ip_cutoff = Utc::now() - Duration::minutes(1);

        {
            let mut attempts = self.account_attempts.write().await;
            attempts.retain(|_, times| {
                times.retain(|time| *time > account_cutoff);
                !times.is_empty()
            });
        }

        {
            let mut attempts = self.ip_attempts.write().await;
            attempts.retain(|_, times| {
                times.retain(|time| *time > ip_cutoff);
                !times.is_empty()
            });
        }
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
