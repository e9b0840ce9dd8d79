//! Telemetry pipeline
//!
//! Fans every registered `SampleSource` into one bounded channel consumed
//! by the sync session.

use std::collections::HashMap;
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender, TrySendError};
use contracts::{RealtimeSample, SampleSource};
use tracing::{debug, info, instrument, trace, warn};

use crate::metrics::TelemetryMetrics;

/// Telemetry pipeline
pub struct TelemetryPipeline {
    sources: HashMap<String, Box<dyn SampleSource>>,
    metrics: Arc<TelemetryMetrics>,
    tx: Sender<RealtimeSample>,
    rx: Option<Receiver<RealtimeSample>>,
}

impl TelemetryPipeline {
    pub fn new(channel_capacity: usize) -> Self {
        let (tx, rx) = bounded(channel_capacity.max(1));

        Self {
            sources: HashMap::new(),
            metrics: Arc::new(TelemetryMetrics::new()),
            tx,
            rx: Some(rx),
        }
    }

    /// Register a source under its own id; replaces any source with the same id
    #[instrument(
        name = "telemetry_register_source",
        skip(self, source),
        fields(source_id = %source.source_id())
    )]
    pub fn register_source(&mut self, source: Box<dyn SampleSource>) {
        let source_id = source.source_id().to_string();
        if let Some(previous) = self.sources.insert(source_id.clone(), source) {
            previous.stop();
            warn!(source_id = %source_id, "replaced telemetry source");
        } else {
            debug!(source_id = %source_id, "registered telemetry source");
        }
    }

    #[instrument(name = "telemetry_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(count = self.sources.len(), "starting telemetry sources");
        for (source_id, source) in &self.sources {
            if source.is_listening() {
                continue;
            }
            debug!(source_id = %source_id, "starting source");

            let tx = self.tx.clone();
            let metrics = self.metrics.clone();
            let id = source_id.clone();
            source.listen(Arc::new(move |sample| {
                send_sample(&tx, sample, &metrics, &id);
            }));
        }
    }

    #[instrument(name = "telemetry_stop_all", skip(self))]
    pub fn stop_all(&self) {
        for (source_id, source) in &self.sources {
            if source.is_listening() {
                debug!(source_id = %source_id, "stopping source");
                source.stop();
            }
        }
    }

    /// Sample stream; only the first call returns `Some`
    pub fn take_receiver(&mut self) -> Option<Receiver<RealtimeSample>> {
        self.rx.take()
    }

    pub fn metrics(&self) -> Arc<TelemetryMetrics> {
        self.metrics.clone()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// True while any source is still producing
    pub fn is_active(&self) -> bool {
        self.sources.values().any(|s| s.is_listening())
    }

    /// Smallest polling interval among registered sources
    pub fn poll_interval_ms(&self) -> Option<u64> {
        self.sources.values().map(|s| s.poll_interval_ms()).min()
    }
}

impl Drop for TelemetryPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// Non-blocking send; a full channel drops the newest sample
#[inline]
fn send_sample(
    tx: &Sender<RealtimeSample>,
    sample: RealtimeSample,
    metrics: &TelemetryMetrics,
    source_id: &str,
) {
    metrics.record_received();
    match tx.try_send(sample) {
        Ok(()) => {
            trace!(source_id = %source_id, "sample queued");
        }
        Err(TrySendError::Full(_)) => {
            metrics.record_dropped();
            trace!(source_id = %source_id, "sample dropped (channel full)");
        }
        Err(TrySendError::Closed(_)) => {
            trace!(source_id = %source_id, "channel closed");
        }
    }
    metrics.update_queue_len(tx.len());
}
