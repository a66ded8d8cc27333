//! Remote submission endpoint client.
//!
//! [`SubmissionBackend`] is the seam the queue processor and coordinator
//! drive; [`ApiClient`] is the real multipart/HTTP implementation and test
//! doubles stand in everywhere else. Errors carry a coarse classification
//! so callers can tell an expired credential from a flaky network, but every
//! class follows the same enqueue-and-retry path.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gasto_core::{Card, Destination, QueuedSubmission, RemoteAck, SubmissionStatus, User};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Per-call budget; a timed-out attempt counts as any other failure.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ApiError {
    /// 401/403: credentials expired or missing. Retries keep failing until
    /// the surrounding app refreshes the token, but the data is never lost.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// 400/422 or an explicit refusal in the response body.
    #[error("rejected: {0}")]
    Rejected(String),
    /// Timeout, connection failure, 5xx. Worth retrying as-is.
    #[error("transient: {0}")]
    Transient(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transient(err.to_string())
    }
}

fn classify_status(status: StatusCode, body: &str) -> ApiError {
    let snippet: String = body.trim().chars().take(200).collect();
    let message = if snippet.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {snippet}")
    };
    match status.as_u16() {
        401 | 403 => ApiError::Unauthorized(message),
        400 | 422 => ApiError::Rejected(message),
        _ => ApiError::Transient(message),
    }
}

/// One delivery attempt for a queued submission.
#[async_trait]
pub trait SubmissionBackend: Send + Sync {
    async fn submit(&self, submission: &QueuedSubmission) -> Result<RemoteAck, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Registry pull with viewer-role tolerance: a missing endpoint or an
    /// unauthorized caller degrades to an empty list instead of failing.
    async fn fetch_registry<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        #[derive(Deserialize)]
        #[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
        struct Envelope<T> {
            success: bool,
            #[serde(default)]
            data: Vec<T>,
        }

        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = resp.status();
        if matches!(status.as_u16(), 401 | 403 | 404) {
            tracing::warn!("{} returned HTTP {}, using an empty registry", path, status);
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("GET {url}: HTTP {status} {txt}");
        }

        let envelope: Envelope<T> = resp
            .json()
            .await
            .with_context(|| format!("parse {path} response"))?;
        if !envelope.success {
            tracing::warn!("{} reported failure, using an empty registry", path);
            return Ok(Vec::new());
        }
        Ok(envelope.data)
    }

    pub async fn fetch_cards(&self) -> Result<Vec<Card>> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Entry {
            id: String,
            name: String,
            owner: Option<String>,
            #[serde(default)]
            is_default: bool,
        }

        let entries: Vec<Entry> = self.fetch_registry("/api/cards").await?;
        Ok(entries
            .into_iter()
            .map(|entry| Card {
                id: entry.id,
                name: entry.name,
                owner: entry.owner,
                is_default: entry.is_default,
            })
            .collect())
    }

    pub async fn fetch_users(&self) -> Result<Vec<User>> {
        #[derive(Deserialize)]
        struct Entry {
            id: String,
            name: String,
            email: Option<String>,
        }

        let entries: Vec<Entry> = self.fetch_registry("/api/users").await?;
        Ok(entries
            .into_iter()
            .map(|entry| User {
                id: entry.id,
                name: entry.name,
                email: entry.email,
            })
            .collect())
    }

    pub async fn fetch_destinations(&self) -> Result<Vec<Destination>> {
        #[derive(Deserialize)]
        struct Entry {
            id: String,
            name: String,
            active: Option<bool>,
        }

        let entries: Vec<Entry> = self.fetch_registry("/api/destinations").await?;
        Ok(entries
            .into_iter()
            .map(|entry| Destination {
                id: entry.id,
                name: entry.name,
                active: entry.active.unwrap_or(true),
            })
            .collect())
    }
}

#[async_trait]
impl SubmissionBackend for ApiClient {
    async fn submit(&self, submission: &QueuedSubmission) -> Result<RemoteAck, ApiError> {
        let mut form = Form::new();

        if let Some(audio) = &submission.audio {
            let bytes = tokio::fs::read(&audio.path).await.map_err(|err| {
                ApiError::Rejected(format!("read audio {}: {err}", audio.path.display()))
            })?;
            let part = Part::bytes(bytes)
                .file_name(audio.file_name.clone())
                .mime_str(&audio.mime_type)
                .map_err(|err| ApiError::Rejected(format!("audio mime type: {err}")))?;
            form = form.part("audio", part);
        }
        if let Some(text) = &submission.text {
            form = form.text("text", text.clone());
        }
        // An empty card id is omitted: the backend infers the card from
        // content. The submitter is never sent; it comes from the token.
        if !submission.card_id.is_empty() {
            form = form.text("cardId", submission.card_id.clone());
        }
        for (i, dest) in submission.destinations.iter().enumerate() {
            form = form.text(format!("selectedDestinations[{i}]"), dest.clone());
        }
        if let Some(latitude) = submission.latitude {
            form = form.text("latitude", latitude.to_string());
        }
        if let Some(longitude) = submission.longitude {
            form = form.text("longitude", longitude.to_string());
        }
        form = form.text("date", submission.timestamp.to_rfc3339());
        let is_draft = submission.status == SubmissionStatus::Draft;
        form = form.text("isDraft", if is_draft { "true" } else { "false" });

        let url = format!("{}/api/external/drafts", self.base_url);
        let resp = self
            .authorized(self.http.post(&url))
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        #[derive(Deserialize)]
        struct Envelope {
            success: bool,
            message: Option<String>,
            draft: Option<DraftBody>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct DraftBody {
            id: String,
            description: Option<String>,
            amount: Option<f64>,
            card_id: Option<String>,
            user_id: Option<String>,
            created_at: Option<DateTime<Utc>>,
        }

        let envelope: Envelope = serde_json::from_str(&body)
            .map_err(|err| ApiError::Transient(format!("malformed response: {err}")))?;
        if !envelope.success {
            return Err(ApiError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "submission refused".to_string()),
            ));
        }
        let draft = envelope
            .draft
            .ok_or_else(|| ApiError::Transient("response carried no draft".to_string()))?;

        Ok(RemoteAck {
            id: draft.id,
            description: draft
                .description
                .unwrap_or_else(|| submission.description.clone()),
            amount: draft.amount.or(submission.amount),
            card_id: draft.card_id,
            user_id: draft.user_id,
            timestamp: draft.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, "viewer role"),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "missing text"),
            ApiError::Rejected(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY, ""),
            ApiError::Rejected(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, ""),
            ApiError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::REQUEST_TIMEOUT, ""),
            ApiError::Transient(_)
        ));
    }

    #[test]
    fn test_error_messages_keep_body_snippet() {
        let err = classify_status(StatusCode::BAD_REQUEST, "  card not found  ");
        assert_eq!(err.to_string(), "rejected: HTTP 400 Bad Request: card not found");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("https://gasto.example/").unwrap();
        assert_eq!(client.base_url, "https://gasto.example");
    }
}
