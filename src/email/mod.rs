/// Message dispatch for verification and recovery flows.
///
/// The dispatcher is injected into the flow controller so tests can
/// substitute a fake. Registration and recovery send best-effort: a mail
/// provider outage must never roll back an account that was already
/// created.

pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::configuration::EmailSettings;
use crate::error::{AppError, EmailError};

#[async_trait]
pub trait MessageDispatcher: Send + Sync {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<(), AppError>;
}

/// HTTP-API email client. When no provider base URL is configured the
/// client degrades to a log-only stub, so local runs work without a mail
/// provider.
#[derive(Clone)]
pub struct EmailClient {
    http_client: reqwest::Client,
    base_url: Option<String>,
    sender: String,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    #[serde(rename = "Subject")]
    subject: &'a str,
    #[serde(rename = "Html")]
    html: &'a str,
    #[serde(rename = "Text")]
    text: &'a str,
}

impl EmailClient {
    pub fn new(settings: &EmailSettings) -> Self {
        if settings.base_url.is_none() {
            tracing::warn!("Email service not configured; emails will be logged only");
        }
        Self {
            http_client: reqwest::Client::new(),
            base_url: settings.base_url.clone(),
            sender: settings.sender.clone(),
        }
    }
}

#[async_trait]
impl MessageDispatcher for EmailClient {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<(), AppError> {
        let base_url = match &self.base_url {
            Some(url) => url,
            None => {
                tracing::info!(to = %to, subject = %subject, "[EMAIL STUB] message logged, not sent");
                return Ok(());
            }
        };

        let url = format!("{}/email", base_url);
        let request = SendEmailRequest {
            from: &self.sender,
            to,
            subject,
            html: html_body,
            text: text_body,
        };

        self.http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send email: {}", e);
                AppError::Email(EmailError::ServiceUnavailable(e.to_string()))
            })?
            .error_for_status()
            .map_err(|e| {
                tracing::error!("Email service returned error: {}", e);
                AppError::Email(EmailError::SendFailed(e.to_string()))
            })?;

        Ok(())
    }
}

/// Fire-and-forget dispatch. Failures are logged, never propagated: the
/// caller's transaction has already committed by the time this runs.
pub fn send_best_effort(
    dispatcher: Arc<dyn MessageDispatcher>,
    to: String,
    subject: String,
    html_body: String,
    text_body: String,
) {
    tokio::spawn(async move {
        if let Err(e) = dispatcher
            .send(&to, &subject, &html_body, &text_body)
            .await
        {
            tracing::warn!(to = %to, error = %e, "Best-effort email dispatch failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::EmailSettings;

    #[tokio::test]
    async fn unconfigured_client_logs_instead_of_sending() {
        let client = EmailClient::new(&EmailSettings {
            base_url: None,
            sender: "noreply@mentwel.com".to_string(),
        });

        let result = client
            .send("user@example.com", "Subject", "<p>hi</p>", "hi")
            .await;
        assert!(result.is_ok());
    }
}
