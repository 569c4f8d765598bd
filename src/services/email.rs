//! Email service
//!
//! Sends the password-reset mail over SMTP. When SMTP is not configured the
//! mail collaborator is reported as unavailable rather than silently
//! dropping the message.

use crate::config::EmailConfig;
use crate::services::error::{ServiceError, ServiceResult};
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// Email service for outbound mail
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    /// Create a new email service from configuration
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Whether outbound mail can be attempted at all
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Send the password-reset link to a user.
    ///
    /// Any SMTP problem surfaces as a `Dependency` error; the caller is
    /// expected to clear the stored reset token so the user can retry.
    pub async fn send_password_reset(&self, to_email: &str, reset_url: &str) -> ServiceResult<()> {
        let (host, from_address) = match (&self.config.smtp_host, &self.config.from_address) {
            (Some(host), Some(from)) if !host.is_empty() && !from.is_empty() => (host, from),
            _ => {
                return Err(ServiceError::Dependency(
                    "Email service is not configured. Please check the server configuration."
                        .to_string(),
                ))
            }
        };

        let from = format!("{} <{}>", self.config.from_name, from_address);
        let body = format!(
            "You are receiving this email because a password reset was requested \
             for your Unmute World account.\n\n\
             Open the link below to choose a new password. It is valid for 15 minutes.\n\n\
             {}\n\n\
             If you did not request this, ignore this email and your password will \
             remain unchanged.\n\n\
             The Unmute World Team",
            reset_url
        );

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| ServiceError::Dependency(format!("Invalid from address: {}", e)))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| ServiceError::Dependency(format!("Invalid to address: {}", e)))?)
            .subject("Unmute World - Password Reset Link")
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| ServiceError::Dependency(format!("Failed to build email: {}", e)))?;

        let mut transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| ServiceError::Dependency(format!("Failed to create SMTP transport: {}", e)))?
            .port(self.config.smtp_port);

        if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            transport = transport.credentials(Credentials::new(
                username.clone(),
                // App passwords are often pasted with spaces
                password.replace(' ', ""),
            ));
        }

        let mailer = transport.build();

        mailer.send(email).await.map_err(|e| {
            tracing::error!("Failed to send password reset email: {}", e);
            ServiceError::Dependency(
                "Connection to the email server failed. Please try again later.".to_string(),
            )
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_service_reports_dependency_error() {
        let service = EmailService::new(EmailConfig::default());
        assert!(!service.is_configured());

        let err = service
            .send_password_reset("user@example.com", "https://example.com/reset")
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Dependency(_)));
    }
}
