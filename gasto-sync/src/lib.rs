//! Offline-first submission pipeline: a durable queue, the drain processor
//! with bounded retries and backoff, and the coordinator that decides between
//! immediate delivery, draft-only persistence, and queueing.
//!
//! The queue file is the single owner of pending submissions. Everything
//! network-facing goes through the [`SubmissionBackend`] and
//! [`ConnectivityProbe`] seams, so the whole pipeline runs under test with
//! scripted doubles.

pub mod api;
pub mod connectivity;
pub mod coordinator;
pub mod processor;
pub mod store;

pub use api::{ApiClient, ApiError, SubmissionBackend, REQUEST_TIMEOUT};
pub use connectivity::{
    ConnectivityProbe, DrainScheduler, HttpProbe, DRAIN_INTERVAL, PROBE_INTERVAL,
};
pub use coordinator::{SubmissionCoordinator, SubmitError, SubmitOutcome, MOCK_ID_PREFIX};
pub use processor::{DrainOutcome, DrainReport, QueueProcessor};
pub use store::QueueStore;
