//! SampleSource trait - telemetry producer abstraction
//!
//! Decouples the sync engine from the device driver that acquires samples.
//! Real trainers, simulated rides and recorded replays share this API.

use std::sync::Arc;

use crate::RealtimeSample;

/// Sample callback type
///
/// Uses `Arc` so the callback can be shared with the producer's worker.
pub type SampleCallback = Arc<dyn Fn(RealtimeSample) + Send + Sync>;

/// Telemetry sample producer
///
/// Pushes one `RealtimeSample` per polling tick through the registered
/// callback. The consumer never pulls.
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn SampleSource> = get_source();
/// source.listen(Arc::new(|sample| {
///     println!("t={}ms speed={}", sample.elapsed_ms, sample.speed_kmh);
/// }));
/// // ...
/// source.stop();
/// ```
pub trait SampleSource: Send + Sync {
    /// Source identifier (for logging)
    fn source_id(&self) -> &str;

    /// Polling interval in milliseconds
    fn poll_interval_ms(&self) -> u64;

    /// Register callback and start producing.
    ///
    /// Repeated calls while listening are idempotent.
    fn listen(&self, callback: SampleCallback);

    /// Stop producing samples
    fn stop(&self);

    /// Check if currently producing
    fn is_listening(&self) -> bool;
}
