//! Connectivity observation and drain scheduling.
//!
//! Two triggers coexist: a periodic tick (pull) and an offline→online edge
//! observed by polling the probe (push). OS-level connectivity events get
//! missed or debounced, so neither trigger alone is enough. Races between
//! them are absorbed by the processor's single-flight guard.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::time::MissedTickBehavior;

use crate::api::SubmissionBackend;
use crate::processor::QueueProcessor;

/// Pull-side drain cadence.
pub const DRAIN_INTERVAL: Duration = Duration::from_secs(30);
/// How often the probe is polled for the push-side edge.
pub const PROBE_INTERVAL: Duration = Duration::from_secs(5);

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Boolean network-state source. Implementations must be cheap to poll.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_connected(&self) -> bool;
}

/// Reachability probe against an HTTP endpoint. Any response, including an
/// error status, proves the network path; only transport failures count as
/// offline.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    http: reqwest::Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .context("build probe client")?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn is_connected(&self) -> bool {
        match self.http.get(&self.url).send().await {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!("connectivity probe failed: {}", err);
                false
            }
        }
    }
}

/// Drives a processor from both triggers. Run inside a spawned task; the
/// loop never returns.
#[derive(Debug, Clone)]
pub struct DrainScheduler {
    drain_every: Duration,
    probe_every: Duration,
}

impl Default for DrainScheduler {
    fn default() -> Self {
        Self {
            drain_every: DRAIN_INTERVAL,
            probe_every: PROBE_INTERVAL,
        }
    }
}

impl DrainScheduler {
    pub fn new(drain_every: Duration, probe_every: Duration) -> Self {
        Self {
            drain_every,
            probe_every,
        }
    }

    pub async fn run<B, C>(&self, processor: Arc<QueueProcessor<B, C>>)
    where
        B: SubmissionBackend + 'static,
        C: ConnectivityProbe + 'static,
    {
        let mut drain_tick = tokio::time::interval(self.drain_every);
        let mut probe_tick = tokio::time::interval(self.probe_every);
        drain_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        probe_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut was_connected = processor.is_connected().await;
        loop {
            tokio::select! {
                // The first tick fires immediately, so startup drains
                // whatever survived the last run without waiting a period.
                _ = drain_tick.tick() => {
                    processor.drain().await;
                }
                _ = probe_tick.tick() => {
                    let connected = processor.is_connected().await;
                    if connected && !was_connected {
                        tracing::info!("connectivity restored, draining queue");
                        processor.drain().await;
                    }
                    was_connected = connected;
                }
            }
        }
    }
}
