//! Durable queue persistence: a flat JSON list of [`QueuedSubmission`]
//! records in a single file, re-read on every operation.
//!
//! The file is the only source of truth. No caller holds a cache;
//! read-after-write consistency comes from going back to disk each time.
//! Reads degrade to an empty queue when the file is missing or unreadable,
//! writes propagate errors with path context.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gasto_core::{QueuedSubmission, SubmissionStatus};
use tokio::fs;

#[derive(Debug, Clone)]
pub struct QueueStore {
    path: PathBuf,
}

impl QueueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All queued entries, datetimes re-hydrated from their stored ISO form.
    pub async fn list(&self) -> Vec<QueuedSubmission> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!("queue file {} unreadable ({}), treating as empty", self.path.display(), err);
                Vec::new()
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.list().await.len()
    }

    /// Append an entry. Retry bookkeeping is normalized: every new entry
    /// starts with zero attempts, and anything that is not an explicit draft
    /// goes in as `Queued`. A prior error message is kept for diagnostics.
    pub async fn add(&self, mut item: QueuedSubmission) -> Result<()> {
        item.retry_count = 0;
        item.last_retry_at = None;
        if item.status != SubmissionStatus::Draft {
            item.status = SubmissionStatus::Queued;
        }

        let mut items = self.list().await;
        items.push(item);
        self.persist(&items).await
    }

    /// Remove by id. Removing an absent id is a no-op, so external deletion
    /// racing a drain stays safe.
    pub async fn remove(&self, id: &str) -> Result<()> {
        let mut items = self.list().await;
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() == before {
            return Ok(());
        }
        self.persist(&items).await
    }

    /// Apply a mutation to the entry with the given id and persist. Silent
    /// no-op when the id is gone.
    pub async fn update(&self, id: &str, apply: impl FnOnce(&mut QueuedSubmission)) -> Result<()> {
        let mut items = self.list().await;
        let Some(item) = items.iter_mut().find(|item| item.id == id) else {
            return Ok(());
        };
        apply(item);
        self.persist(&items).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.persist(&[]).await
    }

    async fn persist(&self, items: &[QueuedSubmission]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("create {}", dir.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(items)?;
        fs::write(&self.path, json)
            .await
            .with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }
}
