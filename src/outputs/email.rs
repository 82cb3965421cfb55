//! Digest delivery through the Resend HTTP API.
//!
//! Preconditions (credential, at least one recipient) are checked before any
//! request is built, so a misconfigured run fails fast without touching the
//! network.

use crate::outputs::html::test_message;
use crate::utils::{HTTP_TIMEOUT, USER_AGENT, truncate_for_log};
use chrono::{DateTime, Datelike, TimeZone};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};

pub const DEFAULT_ENDPOINT: &str = "https://api.resend.com/emails";
pub const DEFAULT_FROM: &str = "briefit@yourdomain.com";
pub const TEST_SUBJECT: &str = "🧪 Briefit Test Email";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("RESEND_API_KEY not set")]
    MissingCredential,
    #[error("no recipients configured")]
    NoRecipients,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Split a comma separated recipient list, dropping blanks.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

/// Default subject for the digest sent at `now`: year and ISO week number.
pub fn weekly_subject<Tz: TimeZone>(now: &DateTime<Tz>) -> String {
    let week = now.iso_week();
    format!("📡 Weekly IT Briefing - {}년 {}주차", week.year(), week.week())
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
}

#[derive(Clone)]
pub struct Mailer {
    pub endpoint: String,
    api_key: Option<String>,
    pub from: String,
    pub recipients: Vec<String>,
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("from", &self.from)
            .field("recipients", &self.recipients)
            .finish()
    }
}

impl Mailer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        from: impl Into<String>,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            from: from.into(),
            recipients,
        }
    }

    /// Send `html` to every configured recipient. Returns the delivery id
    /// (empty if the API did not report one).
    #[instrument(level = "info", skip(self, html), fields(recipients = self.recipients.len()))]
    pub async fn send(&self, html: &str, subject: &str) -> Result<String, DeliveryError> {
        let api_key = self.api_key.as_deref().ok_or(DeliveryError::MissingCredential)?;
        if self.recipients.is_empty() {
            return Err(DeliveryError::NoRecipients);
        }

        let id = self.post(api_key, &self.recipients, subject, html).await?;
        info!(count = self.recipients.len(), %id, "Email sent");
        Ok(id)
    }

    /// Send the configuration test message to `to`, or to the first
    /// configured recipient.
    #[instrument(level = "info", skip(self))]
    pub async fn send_test(&self, to: Option<&str>) -> Result<String, DeliveryError> {
        let api_key = self.api_key.as_deref().ok_or(DeliveryError::MissingCredential)?;
        let recipient = to
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .or_else(|| self.recipients.first().map(String::as_str))
            .ok_or(DeliveryError::NoRecipients)?;

        let to = [recipient.to_string()];
        let id = self.post(api_key, &to, TEST_SUBJECT, &test_message()).await?;
        info!(%recipient, %id, "Test email sent");
        Ok(id)
    }

    async fn post(
        &self,
        api_key: &str,
        to: &[String],
        subject: &str,
        html: &str,
    ) -> Result<String, DeliveryError> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        let response = client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&SendRequest {
                from: &self.from,
                to,
                subject,
                html,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %truncate_for_log(&body, 300), "Email API rejected request");
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let sent: SendResponse = response.json().await?;
        Ok(sent.id.unwrap_or_default())
    }
}
