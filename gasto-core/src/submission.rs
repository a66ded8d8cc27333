//! Submission records: the durable queue entry, the optimistic session
//! record, and the request/acknowledgement shapes exchanged with the backend.
//!
//! Status model is a single tri-state plus derived retry eligibility:
//! - `Draft`: local-only by explicit user opt-out; never auto-sent.
//! - `Queued`: awaiting automatic delivery; failures keep it queued with an
//!   incremented retry count, and an exhausted count dead-letters it until a
//!   manual reset.
//! - `Submitted`: acknowledged by the backend (queue entries are removed at
//!   this point, so it mostly appears on session records).

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Draft,
    Queued,
    Submitted,
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubmissionStatus::Draft => "draft",
            SubmissionStatus::Queued => "queued",
            SubmissionStatus::Submitted => "submitted",
        };
        f.write_str(s)
    }
}

/// Reference to a locally recorded audio note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioAttachment {
    pub path: PathBuf,
    pub file_name: String,
    /// MIME type sent with the upload, e.g. "audio/m4a".
    pub mime_type: String,
}

impl AudioAttachment {
    pub fn new(path: impl Into<PathBuf>, file_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// What a caller hands the coordinator: audio and/or text plus overrides.
///
/// `card_id = None` falls back to the configured default card; an empty
/// resolved id tells the backend to infer the card from content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub audio: Option<AudioAttachment>,
    pub text: Option<String>,
    pub card_id: Option<String>,
    pub user_id: Option<String>,
    pub destinations: Vec<String>,
    /// Expense date; None means "now" at submission time.
    pub date: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Explicit draft flag; None defers to the coordinator's draft-only mode.
    pub is_draft: Option<bool>,
}

impl SubmitRequest {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn from_audio(audio: AudioAttachment) -> Self {
        Self {
            audio: Some(audio),
            ..Self::default()
        }
    }

    pub fn with_card(mut self, card_id: impl Into<String>) -> Self {
        self.card_id = Some(card_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_destinations(mut self, ids: Vec<String>) -> Self {
        self.destinations = ids;
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn as_draft(mut self) -> Self {
        self.is_draft = Some(true);
        self
    }

    pub fn has_content(&self) -> bool {
        self.audio.is_some() || self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// A durable queue entry awaiting delivery.
///
/// `card_id`/`user_id` keep the original empty-string convention: empty means
/// "not resolved locally" (the backend infers the card; the user comes from
/// the auth token).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedSubmission {
    pub id: String,
    pub description: String,
    pub amount: Option<f64>,
    pub card_id: String,
    pub user_id: String,
    pub status: SubmissionStatus,
    pub timestamp: DateTime<Utc>,

    pub audio: Option<AudioAttachment>,
    pub text: Option<String>,
    #[serde(default)]
    pub destinations: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    /// Attempts made so far; monotonically non-decreasing while queued.
    pub retry_count: u32,
    pub last_retry_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl QueuedSubmission {
    pub fn new(id: impl Into<String>, description: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            amount: None,
            card_id: String::new(),
            user_id: String::new(),
            status: SubmissionStatus::Queued,
            timestamp,
            audio: None,
            text: None,
            destinations: Vec::new(),
            latitude: None,
            longitude: None,
            retry_count: 0,
            last_retry_at: None,
            last_error: None,
        }
    }

    /// Build a queue entry carrying a request's payload.
    pub fn from_request(id: impl Into<String>, description: impl Into<String>, request: &SubmitRequest, now: DateTime<Utc>) -> Self {
        let mut sub = Self::new(id, description, request.date.unwrap_or(now));
        sub.card_id = request.card_id.clone().unwrap_or_default();
        sub.user_id = request.user_id.clone().unwrap_or_default();
        sub.audio = request.audio.clone();
        sub.text = request.text.clone();
        sub.destinations = request.destinations.clone();
        sub.latitude = request.latitude;
        sub.longitude = request.longitude;
        sub
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.last_error = Some(message.into());
        self
    }

    /// Record one failed delivery attempt.
    pub fn record_failure(&mut self, now: DateTime<Utc>, message: impl Into<String>) {
        self.retry_count += 1;
        self.last_retry_at = Some(now);
        self.last_error = Some(message.into());
    }

    /// Reset retry bookkeeping (the manual dead-letter recovery).
    pub fn reset_retries(&mut self) {
        self.retry_count = 0;
        self.last_error = None;
    }
}

/// The optimistic UI-facing record, reconciled by id in two phases:
/// inserted with a temporary id, then replaced (server ack) or tagged
/// (failure) by matching that id, never by list position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseDraft {
    pub id: String,
    pub description: String,
    pub amount: Option<f64>,
    pub card_id: String,
    pub user_id: String,
    pub status: SubmissionStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub destinations: Vec<String>,
    pub last_error: Option<String>,
}

impl ExpenseDraft {
    pub fn is_temporary(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }
}

pub const TEMP_ID_PREFIX: &str = "temp-";

/// Client-generated id for an optimistic record, e.g. `temp-1714766640000`.
pub fn temp_id(now: DateTime<Utc>) -> String {
    format!("{}{}", TEMP_ID_PREFIX, now.timestamp_millis())
}

/// Canonical record returned by the backend on acknowledgement. Amount and
/// description may be server-inferred when the submission was audio or
/// free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAck {
    pub id: String,
    pub description: String,
    pub amount: Option<f64>,
    pub card_id: Option<String>,
    pub user_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_temp_id_prefix() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let id = temp_id(now);
        assert!(id.starts_with("temp-"));
        assert_eq!(id, format!("temp-{}", now.timestamp_millis()));
    }

    #[test]
    fn test_record_failure_is_monotonic() {
        let now = Utc::now();
        let mut sub = QueuedSubmission::new("q1", "mercado", now);
        assert_eq!(sub.retry_count, 0);

        sub.record_failure(now, "timeout");
        sub.record_failure(now, "HTTP 503");
        assert_eq!(sub.retry_count, 2);
        assert_eq!(sub.last_error.as_deref(), Some("HTTP 503"));
        assert_eq!(sub.last_retry_at, Some(now));

        sub.reset_retries();
        assert_eq!(sub.retry_count, 0);
        assert!(sub.last_error.is_none());
    }

    #[test]
    fn test_from_request_copies_payload() {
        let now = Utc::now();
        let req = SubmitRequest::from_text("22,50 picolés")
            .with_card("c6-1")
            .with_destinations(vec!["d1".to_string()])
            .with_location(-23.55, -46.63);

        let sub = QueuedSubmission::from_request("q1", "picolés", &req, now);
        assert_eq!(sub.card_id, "c6-1");
        assert_eq!(sub.user_id, "");
        assert_eq!(sub.text.as_deref(), Some("22,50 picolés"));
        assert_eq!(sub.destinations, vec!["d1".to_string()]);
        assert_eq!(sub.latitude, Some(-23.55));
        assert_eq!(sub.status, SubmissionStatus::Queued);
        assert_eq!(sub.timestamp, now);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let s = serde_json::to_string(&SubmissionStatus::Queued).unwrap();
        assert_eq!(s, "\"queued\"");
    }

    #[test]
    fn test_request_content_check() {
        assert!(SubmitRequest::from_text("café").has_content());
        assert!(!SubmitRequest::from_text("   ").has_content());
        assert!(!SubmitRequest::default().has_content());

        let audio = AudioAttachment::new("/tmp/a.m4a", "a.m4a", "audio/m4a");
        assert!(SubmitRequest::from_audio(audio).has_content());
    }
}
