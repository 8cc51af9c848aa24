//! Activation mail dispatch via the Resend HTTP API.
//!
//! Dispatch is fire-and-forget from the session core's perspective, with one
//! exception: a failed activation mail aborts the registration it belongs to.

use async_trait::async_trait;
use serde_json::json;

use crate::config::Config;

const RESEND_API_URL: &str = "https://api.resend.com";

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail service not configured")]
    NotConfigured,
    #[error("mail request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("mail dispatch rejected with status {0}")]
    Rejected(u16),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError>;
}

pub struct ResendMailer {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            RESEND_API_URL,
            config.resend_api_key.clone(),
            config.mail_from.clone(),
        )
    }

    pub fn is_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        if !self.is_enabled() {
            return Err(MailError::NotConfigured);
        }

        let response = self
            .http
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [to],
                "subject": subject,
                "html": html,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!(to = %to, status = %response.status(), "mail dispatch rejected");
            return Err(MailError::Rejected(response.status().as_u16()));
        }

        Ok(())
    }
}

/// Body of the activation mail.
pub fn activation_email(name: &str, activation_code: &str) -> String {
    format!(
        "<h1>Welcome to LearnHub, {name}!</h1>\
         <p>Your activation code is: <strong>{activation_code}</strong></p>\
         <p>The code expires in 5 minutes. If you did not create an account, \
         you can ignore this email.</p>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_posts_to_the_emails_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/emails")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_body(r#"{"id":"mail-1"}"#)
            .create_async()
            .await;

        let mailer = ResendMailer::new(server.url(), "test-key", "LearnHub <no-reply@learnhub.dev>");
        mailer
            .send("ada@example.com", "Activate your account", "<p>1234</p>")
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejection_surfaces_the_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/emails")
            .with_status(422)
            .create_async()
            .await;

        let mailer = ResendMailer::new(server.url(), "test-key", "LearnHub <no-reply@learnhub.dev>");
        let err = mailer
            .send("ada@example.com", "Activate your account", "<p>1234</p>")
            .await
            .unwrap_err();

        assert!(matches!(err, MailError::Rejected(422)));
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_a_request() {
        let mailer = ResendMailer::new("http://127.0.0.1:1", "", "LearnHub <no-reply@learnhub.dev>");
        let err = mailer
            .send("ada@example.com", "Activate your account", "<p>1234</p>")
            .await
            .unwrap_err();

        assert!(matches!(err, MailError::NotConfigured));
    }

    #[test]
    fn activation_email_carries_the_code() {
        let body = activation_email("Ada", "4821");
        assert!(body.contains("Ada"));
        assert!(body.contains("4821"));
    }
}
