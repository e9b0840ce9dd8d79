//! Replay source - plays back recorded samples
//!
//! Reads a JSONL file of `RealtimeSample` (one object per line) and emits
//! the samples on their recorded clock, scaled by a speed multiplier.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use contracts::{RealtimeSample, SampleCallback, SampleSource};
use tracing::{debug, info};

use crate::error::{Result, TelemetryError};

/// Replay configuration
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Playback speed multiplier (1.0 = recorded speed)
    pub speed_multiplier: f64,

    /// Restart from the first sample at the end
    pub loop_playback: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            loop_playback: false,
        }
    }
}

/// Replay source
#[derive(Debug)]
pub struct ReplaySource {
    source_id: String,
    samples: Arc<Vec<RealtimeSample>>,
    config: ReplayConfig,
    listening: Arc<AtomicBool>,
}

impl ReplaySource {
    /// Load samples from a JSONL file, ordered by elapsed time
    pub fn load(path: &Path, config: ReplayConfig) -> Result<Self> {
        let display = path.display().to_string();
        let file = File::open(path).map_err(|source| TelemetryError::ReplayIo {
            path: display.clone(),
            source,
        })?;

        let mut samples = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| TelemetryError::ReplayIo {
                path: display.clone(),
                source,
            })?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let sample: RealtimeSample =
                serde_json::from_str(line).map_err(|e| TelemetryError::ReplayParse {
                    path: display.clone(),
                    line: idx + 1,
                    message: e.to_string(),
                })?;
            samples.push(sample);
        }

        let replay_path = &display;
        info!(path = %replay_path, samples = samples.len(), "loaded replay file");
        Self::from_samples(display, samples, config)
    }

    /// Build from in-memory samples
    pub fn from_samples(
        source_id: impl Into<String>,
        mut samples: Vec<RealtimeSample>,
        config: ReplayConfig,
    ) -> Result<Self> {
        if !(config.speed_multiplier.is_finite() && config.speed_multiplier > 0.0) {
            return Err(TelemetryError::InvalidSource {
                message: format!(
                    "speed_multiplier must be > 0, got {}",
                    config.speed_multiplier
                ),
            });
        }

        samples.sort_by_key(|s| s.elapsed_ms);

        if config.loop_playback && span_ms(&samples) == 0 {
            return Err(TelemetryError::InvalidSource {
                message: "looped replay needs samples spanning a non-zero time".to_string(),
            });
        }

        Ok(Self {
            source_id: source_id.into(),
            samples: Arc::new(samples),
            config,
            listening: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Recorded session length (ms)
    pub fn duration_ms(&self) -> u64 {
        self.samples.last().map_or(0, |s| s.elapsed_ms)
    }

    /// Offset between two looped passes: the recorded span plus one
    /// typical sample gap, so the clock keeps rising across the seam
    fn loop_period_ms(&self) -> u64 {
        span_ms(&self.samples) + self.poll_interval_ms().max(1)
    }

    fn gap(previous: Option<u64>, current: u64, speed: f64) -> Duration {
        let gap_ms = previous.map_or(0, |p| current.saturating_sub(p));
        Duration::from_secs_f64(gap_ms as f64 / 1000.0 / speed)
    }
}

/// Time between the first and last sample (ms)
fn span_ms(samples: &[RealtimeSample]) -> u64 {
    match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => last.elapsed_ms - first.elapsed_ms,
        _ => 0,
    }
}

impl SampleSource for ReplaySource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Median gap between recorded samples
    fn poll_interval_ms(&self) -> u64 {
        let mut gaps: Vec<u64> = self
            .samples
            .windows(2)
            .map(|w| w[1].elapsed_ms - w[0].elapsed_ms)
            .collect();
        if gaps.is_empty() {
            return 1000;
        }
        gaps.sort_unstable();
        gaps[gaps.len() / 2]
    }

    fn listen(&self, callback: SampleCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_id = self.source_id.clone();
        let samples = self.samples.clone();
        let config = self.config.clone();
        let listening = self.listening.clone();
        let loop_period_ms = self.loop_period_ms();

        thread::spawn(move || {
            debug!(source_id = %source_id, "replay started");
            // Looped passes continue the session clock
            let mut offset_ms = 0u64;
            let mut previous = None;

            'replay: loop {
                for sample in samples.iter() {
                    if !listening.load(Ordering::Relaxed) {
                        break 'replay;
                    }
                    let elapsed_ms = sample.elapsed_ms + offset_ms;
                    thread::sleep(Self::gap(previous, elapsed_ms, config.speed_multiplier));
                    previous = Some(elapsed_ms);

                    let mut sample = sample.clone();
                    sample.elapsed_ms = elapsed_ms;
                    callback(sample);
                }

                if !config.loop_playback || samples.is_empty() {
                    break;
                }
                offset_ms += loop_period_ms;
            }

            listening.store(false, Ordering::SeqCst);
            debug!(source_id = %source_id, "replay finished");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
