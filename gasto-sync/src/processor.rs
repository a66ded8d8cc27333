//! Queue drain: bounded retries, exponential backoff, single-flight
//! protection.
//!
//! Items are processed strictly in list order, one at a time. Sequential
//! draining keeps a reconnect burst from flooding the backend and keeps the
//! per-item backoff deterministic; do not parallelize this loop without
//! re-deriving the retry contract.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use gasto_core::{plan_attempt, AttemptPlan, QueuedSubmission, RetryPolicy, SubmissionStatus, EXHAUSTED_MESSAGE};
use tokio::sync::Mutex;

use crate::api::SubmissionBackend;
use crate::connectivity::ConnectivityProbe;
use crate::store::QueueStore;

/// Counts for one completed drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    pub dead_lettered: usize,
}

/// Why a drain call did or did not walk the queue. A skipped pass is not a
/// failure: it marks nothing and increments nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Another drain holds the guard; this call did nothing.
    AlreadyDraining,
    /// The probe reported no connectivity; the queue was left untouched.
    Offline,
    Completed(DrainReport),
}

impl DrainOutcome {
    pub fn report(&self) -> Option<&DrainReport> {
        match self {
            DrainOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

pub struct QueueProcessor<B, C> {
    store: QueueStore,
    backend: Arc<B>,
    probe: Arc<C>,
    policy: RetryPolicy,
    in_flight: Mutex<()>,
}

impl<B, C> QueueProcessor<B, C>
where
    B: SubmissionBackend + 'static,
    C: ConnectivityProbe + 'static,
{
    pub fn new(store: QueueStore, backend: Arc<B>, probe: Arc<C>) -> Self {
        Self {
            store,
            backend,
            probe,
            policy: RetryPolicy::default(),
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    pub async fn is_connected(&self) -> bool {
        self.probe.is_connected().await
    }

    /// Persist a submission and kick a drain without waiting for it.
    pub async fn enqueue(self: &Arc<Self>, item: QueuedSubmission) -> Result<()> {
        self.store.add(item).await?;
        let processor = Arc::clone(self);
        tokio::spawn(async move {
            processor.drain().await;
        });
        Ok(())
    }

    /// Manual dead-letter recovery: zero the retry counter, clear the stored
    /// error, and drain immediately.
    pub async fn retry(&self, id: &str) -> Result<DrainOutcome> {
        self.store.update(id, |item| item.reset_retries()).await?;
        Ok(self.drain().await)
    }

    /// Walk the queue once, sequentially. Callers may fire-and-forget; tests
    /// await the outcome.
    pub async fn drain(&self) -> DrainOutcome {
        // Check-and-set must be atomic relative to the awaits below; the
        // guard is held for the whole pass and released on every exit path.
        let Ok(_guard) = self.in_flight.try_lock() else {
            return DrainOutcome::AlreadyDraining;
        };

        if !self.probe.is_connected().await {
            tracing::debug!("offline, leaving the queue untouched");
            return DrainOutcome::Offline;
        }

        let items = self.store.list().await;
        let mut report = DrainReport::default();

        for item in items {
            if item.status == SubmissionStatus::Draft {
                continue;
            }

            match plan_attempt(item.retry_count, &self.policy) {
                AttemptPlan::DeadLetter => {
                    report.dead_lettered += 1;
                    // Mark once; later passes see the message already set.
                    if item.last_error.as_deref() != Some(EXHAUSTED_MESSAGE) {
                        tracing::warn!("submission {} exhausted its retries", item.id);
                        let marked = self
                            .store
                            .update(&item.id, |it| {
                                it.last_error = Some(EXHAUSTED_MESSAGE.to_string());
                            })
                            .await;
                        if let Err(err) = marked {
                            tracing::error!("failed to mark {} exhausted: {:#}", item.id, err);
                        }
                    }
                    continue;
                }
                AttemptPlan::AfterBackoff(delay) => {
                    tokio::time::sleep(delay).await;
                }
                AttemptPlan::Immediate => {}
            }

            report.attempted += 1;
            match self.backend.submit(&item).await {
                Ok(ack) => {
                    report.delivered += 1;
                    tracing::info!("submission {} delivered as {}", item.id, ack.id);
                    if let Err(err) = self.store.remove(&item.id).await {
                        tracing::error!("failed to remove delivered {}: {:#}", item.id, err);
                    }
                }
                Err(api_err) => {
                    report.failed += 1;
                    tracing::warn!("submission {} failed: {}", item.id, api_err);
                    let now = Utc::now();
                    let message = api_err.to_string();
                    let recorded = self
                        .store
                        .update(&item.id, |it| it.record_failure(now, message.as_str()))
                        .await;
                    if let Err(err) = recorded {
                        tracing::error!("failed to record failure for {}: {:#}", item.id, err);
                    }
                }
            }
        }

        DrainOutcome::Completed(report)
    }
}
