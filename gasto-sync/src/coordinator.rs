//! Submission orchestration: decide between immediate delivery, draft-only
//! persistence, and queueing, and keep the optimistic session list honest.
//!
//! The session list is the UI-facing view. Reconciliation is two-phase and
//! always by id, never by position: a record goes in under a temporary id
//! first, then is either replaced with the server's canonical record or
//! tagged with the failure. A failed submission stays visible, retryable,
//! and deletable; it is never silently dropped.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use gasto_core::{temp_id, ExpenseDraft, QueuedSubmission, RemoteAck, SubmissionStatus, SubmitRequest};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::api::SubmissionBackend;
use crate::connectivity::ConnectivityProbe;
use crate::processor::{DrainOutcome, QueueProcessor};

/// Sample-data identifiers that must never reach the backend.
pub const MOCK_ID_PREFIX: &str = "mock-";

/// Description used for an audio-only submission until the backend infers
/// a real one.
const AUDIO_DESCRIPTION: &str = "Áudio";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("submission carries neither audio nor text")]
    MissingContent,
    /// Audio-only with no resolvable card cannot be auto-categorized and
    /// must not be queued blind.
    #[error("audio-only submission with no resolvable card")]
    AudioWithoutCard,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Immediate acknowledgement; the session record carries the canonical id.
    Submitted(RemoteAck),
    /// Persisted locally as a draft by explicit opt-out; backend untouched.
    Drafted(String),
    /// Immediate attempt failed; queued for automatic retry.
    Queued(String),
}

pub struct SubmissionCoordinator<B, C> {
    processor: Arc<QueueProcessor<B, C>>,
    backend: Arc<B>,
    default_card: Option<String>,
    draft_only: bool,
    session: Mutex<Vec<ExpenseDraft>>,
}

impl<B, C> SubmissionCoordinator<B, C>
where
    B: SubmissionBackend + 'static,
    C: ConnectivityProbe + 'static,
{
    pub fn new(processor: Arc<QueueProcessor<B, C>>, backend: Arc<B>) -> Self {
        Self {
            processor,
            backend,
            default_card: None,
            draft_only: false,
            session: Mutex::new(Vec::new()),
        }
    }

    pub fn with_default_card(mut self, card_id: impl Into<String>) -> Self {
        let card_id = card_id.into();
        if !card_id.is_empty() {
            self.default_card = Some(card_id);
        }
        self
    }

    /// When set, submissions stay local as drafts unless the request says
    /// otherwise.
    pub fn draft_only(mut self, enabled: bool) -> Self {
        self.draft_only = enabled;
        self
    }

    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitOutcome, SubmitError> {
        if !request.has_content() {
            return Err(SubmitError::MissingContent);
        }

        // Effective card: explicit beats the configured default; empty
        // delegates inference to the backend.
        let mut card_id = request
            .card_id
            .clone()
            .or_else(|| self.default_card.clone())
            .unwrap_or_default();
        if card_id.starts_with(MOCK_ID_PREFIX) {
            tracing::warn!("placeholder card id {} dropped, backend will infer the card", card_id);
            card_id = String::new();
        }

        let has_text = request.text.as_deref().is_some_and(|t| !t.trim().is_empty());
        if card_id.is_empty() && !has_text {
            return Err(SubmitError::AudioWithoutCard);
        }

        let now = Utc::now();
        let id = temp_id(now);
        let description = request
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(AUDIO_DESCRIPTION)
            .to_string();

        let mut candidate = QueuedSubmission::from_request(id.clone(), description.clone(), &request, now);
        candidate.card_id = card_id;

        // Optimistic record first: the caller sees the submission before the
        // backend does.
        self.session.lock().await.push(ExpenseDraft {
            id: id.clone(),
            description,
            amount: None,
            card_id: candidate.card_id.clone(),
            user_id: candidate.user_id.clone(),
            status: SubmissionStatus::Queued,
            timestamp: now,
            destinations: candidate.destinations.clone(),
            last_error: None,
        });

        if request.is_draft.unwrap_or(self.draft_only) {
            candidate.status = SubmissionStatus::Draft;
            self.tag_session(&id, |record| record.status = SubmissionStatus::Draft)
                .await;
            self.processor.store().add(candidate).await?;
            return Ok(SubmitOutcome::Drafted(id));
        }

        match self.backend.submit(&candidate).await {
            Ok(ack) => {
                self.replace_session(&id, &ack).await;
                Ok(SubmitOutcome::Submitted(ack))
            }
            Err(api_err) => {
                tracing::warn!("immediate submission failed ({}), queueing {}", api_err, id);
                let message = api_err.to_string();
                self.tag_session(&id, |record| record.last_error = Some(message.clone()))
                    .await;
                self.processor.enqueue(candidate.with_error(message.as_str())).await?;
                Ok(SubmitOutcome::Queued(id))
            }
        }
    }

    /// Manual retry pass-through; resets the item's retry budget.
    pub async fn retry(&self, id: &str) -> Result<DrainOutcome> {
        self.processor.retry(id).await
    }

    /// Drop a submission from the queue and the session.
    pub async fn discard(&self, id: &str) -> Result<()> {
        self.processor.store().remove(id).await?;
        self.session.lock().await.retain(|record| record.id != id);
        Ok(())
    }

    /// Snapshot of the UI-facing records from this process's lifetime.
    pub async fn session(&self) -> Vec<ExpenseDraft> {
        self.session.lock().await.clone()
    }

    async fn tag_session(&self, id: &str, apply: impl FnOnce(&mut ExpenseDraft)) {
        let mut session = self.session.lock().await;
        if let Some(record) = session.iter_mut().find(|record| record.id == id) {
            apply(record);
        }
    }

    /// Phase two of the optimistic commit: swap the temporary record for the
    /// canonical one.
    async fn replace_session(&self, temp: &str, ack: &RemoteAck) {
        let mut session = self.session.lock().await;
        let Some(record) = session.iter_mut().find(|record| record.id == temp) else {
            return;
        };
        record.id = ack.id.clone();
        record.description = ack.description.clone();
        record.amount = ack.amount;
        if let Some(card) = &ack.card_id {
            record.card_id = card.clone();
        }
        if let Some(user) = &ack.user_id {
            record.user_id = user.clone();
        }
        if let Some(stamp) = ack.timestamp {
            record.timestamp = stamp;
        }
        record.status = SubmissionStatus::Submitted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::store::QueueStore;
    use async_trait::async_trait;
    use gasto_core::AudioAttachment;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct FixedProbe(AtomicBool);

    #[async_trait]
    impl ConnectivityProbe for FixedProbe {
        async fn is_connected(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Records the last submission it saw; verdicts are scripted per call.
    struct RecordingBackend {
        fail_first: usize,
        calls: AtomicUsize,
        last: std::sync::Mutex<Option<QueuedSubmission>>,
    }

    impl RecordingBackend {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                fail_first: 0,
                calls: AtomicUsize::new(0),
                last: std::sync::Mutex::new(None),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail_first: usize::MAX,
                calls: AtomicUsize::new(0),
                last: std::sync::Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_card_id(&self) -> Option<String> {
            self.last.lock().unwrap().as_ref().map(|s| s.card_id.clone())
        }
    }

    #[async_trait]
    impl SubmissionBackend for RecordingBackend {
        async fn submit(&self, submission: &QueuedSubmission) -> Result<RemoteAck, ApiError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(submission.clone());
            if n < self.fail_first {
                return Err(ApiError::Transient("connection refused".to_string()));
            }
            Ok(RemoteAck {
                id: format!("srv-{}", submission.id),
                description: submission.description.clone(),
                amount: Some(22.5),
                card_id: None,
                user_id: None,
                timestamp: None,
            })
        }
    }

    fn rig(
        dir: &tempfile::TempDir,
        backend: Arc<RecordingBackend>,
        online: bool,
    ) -> SubmissionCoordinator<RecordingBackend, FixedProbe> {
        let store = QueueStore::new(dir.path().join("queue.json"));
        let probe = Arc::new(FixedProbe(AtomicBool::new(online)));
        let processor = Arc::new(QueueProcessor::new(store, Arc::clone(&backend), probe));
        SubmissionCoordinator::new(processor, backend)
    }

    #[tokio::test]
    async fn test_requests_without_content_are_rejected() {
        let dir = tempdir().unwrap();
        let backend = RecordingBackend::ok();
        let coordinator = rig(&dir, Arc::clone(&backend), true);

        let err = coordinator.submit(SubmitRequest::default()).await.unwrap_err();
        assert!(matches!(err, SubmitError::MissingContent));

        let err = coordinator
            .submit(SubmitRequest::from_text("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::MissingContent));

        assert_eq!(backend.calls(), 0);
        assert!(coordinator.session().await.is_empty());
    }

    #[tokio::test]
    async fn test_audio_only_without_card_fails_fast() {
        let dir = tempdir().unwrap();
        let backend = RecordingBackend::ok();
        let coordinator = rig(&dir, Arc::clone(&backend), true);

        let audio = AudioAttachment::new("/tmp/nota.m4a", "nota.m4a", "audio/m4a");
        let err = coordinator
            .submit(SubmitRequest::from_audio(audio.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::AudioWithoutCard));

        // A placeholder card id resolves to empty, so the same guard fires.
        let err = coordinator
            .submit(SubmitRequest::from_audio(audio).with_card("mock-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::AudioWithoutCard));

        assert_eq!(backend.calls(), 0);
        assert!(coordinator.session().await.is_empty());
    }

    #[tokio::test]
    async fn test_successful_submit_swaps_in_canonical_record() {
        let dir = tempdir().unwrap();
        let backend = RecordingBackend::ok();
        let coordinator = rig(&dir, Arc::clone(&backend), true);

        let outcome = coordinator
            .submit(SubmitRequest::from_text("22,50 picolés").with_card("c6-1"))
            .await
            .unwrap();

        let SubmitOutcome::Submitted(ack) = outcome else {
            panic!("expected Submitted, got {outcome:?}");
        };
        assert!(ack.id.starts_with("srv-temp-"));

        let session = coordinator.session().await;
        assert_eq!(session.len(), 1);
        assert_eq!(session[0].id, ack.id);
        assert_eq!(session[0].status, SubmissionStatus::Submitted);
        assert_eq!(session[0].amount, Some(22.5));
        assert!(!session[0].is_temporary());
    }

    #[tokio::test]
    async fn test_failed_submit_queues_and_tags_session() {
        let dir = tempdir().unwrap();
        let backend = RecordingBackend::failing();
        // Offline probe keeps the detached drain from re-attempting during
        // the assertions.
        let coordinator = rig(&dir, Arc::clone(&backend), false);

        let outcome = coordinator
            .submit(SubmitRequest::from_text("mercado 89,90"))
            .await
            .unwrap();

        let SubmitOutcome::Queued(id) = outcome else {
            panic!("expected Queued, got {outcome:?}");
        };
        assert!(id.starts_with("temp-"));
        assert_eq!(backend.calls(), 1);

        let queued = coordinator.processor.store().list().await;
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].id, id);
        assert_eq!(queued[0].status, SubmissionStatus::Queued);
        assert_eq!(queued[0].retry_count, 0);
        assert_eq!(queued[0].last_error.as_deref(), Some("transient: connection refused"));

        let session = coordinator.session().await;
        assert_eq!(session[0].id, id);
        assert!(session[0].is_temporary());
        assert!(session[0].last_error.is_some());
    }

    #[tokio::test]
    async fn test_draft_only_never_contacts_backend() {
        let dir = tempdir().unwrap();
        let backend = RecordingBackend::ok();
        let coordinator = rig(&dir, Arc::clone(&backend), true).draft_only(true);

        let outcome = coordinator
            .submit(SubmitRequest::from_text("cinema 40,00"))
            .await
            .unwrap();
        let SubmitOutcome::Drafted(id) = outcome else {
            panic!("expected Drafted, got {outcome:?}");
        };
        assert_eq!(backend.calls(), 0);

        let queued = coordinator.processor.store().list().await;
        assert_eq!(queued[0].id, id);
        assert_eq!(queued[0].status, SubmissionStatus::Draft);

        // Drafts also survive a drain untouched.
        coordinator.processor.drain().await;
        assert_eq!(backend.calls(), 0);
        assert_eq!(coordinator.processor.store().len().await, 1);
    }

    #[tokio::test]
    async fn test_card_resolution_order() {
        let dir = tempdir().unwrap();
        let backend = RecordingBackend::ok();
        let coordinator =
            rig(&dir, Arc::clone(&backend), true).with_default_card("c-default");

        coordinator
            .submit(SubmitRequest::from_text("almoço 30,00").with_card("c-explicit"))
            .await
            .unwrap();
        assert_eq!(backend.last_card_id().as_deref(), Some("c-explicit"));

        coordinator
            .submit(SubmitRequest::from_text("jantar 50,00"))
            .await
            .unwrap();
        assert_eq!(backend.last_card_id().as_deref(), Some("c-default"));

        // A placeholder id falls through to empty, not to the default.
        coordinator
            .submit(SubmitRequest::from_text("café 8,00").with_card("mock-9"))
            .await
            .unwrap();
        assert_eq!(backend.last_card_id().as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_discard_removes_queue_and_session_entries() {
        let dir = tempdir().unwrap();
        let backend = RecordingBackend::failing();
        let coordinator = rig(&dir, Arc::clone(&backend), false);

        let outcome = coordinator
            .submit(SubmitRequest::from_text("mercado 89,90"))
            .await
            .unwrap();
        let SubmitOutcome::Queued(id) = outcome else {
            panic!("expected Queued, got {outcome:?}");
        };

        coordinator.discard(&id).await.unwrap();
        assert!(coordinator.processor.store().list().await.is_empty());
        assert!(coordinator.session().await.is_empty());

        // Discarding again is a no-op.
        coordinator.discard(&id).await.unwrap();
    }
}
