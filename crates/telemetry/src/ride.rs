//! Simulated ride
//!
//! Implements `SampleSource`, generates a synthetic ride on a background
//! thread. Used for headless runs and tests without a trainer attached.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use contracts::{RealtimeSample, SampleCallback, SampleName, SampleSource, TelemetryConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

/// Rider + bike mass (kg)
const SYSTEM_MASS_KG: f64 = 85.0;
const ROLLING_RESISTANCE: f64 = 0.004;
/// 0.5 * air density * CdA
const DRAG_FACTOR: f64 = 0.5 * 1.2 * 0.32;
const GRAVITY: f64 = 9.81;

/// Simulated ride configuration
#[derive(Debug, Clone)]
pub struct RideConfig {
    /// Tick interval (ms); also the session-clock step
    pub interval_ms: u64,
    /// Mean speed (km/h)
    pub speed_kmh: f64,
    /// Uniform noise amplitude (km/h)
    pub noise_kmh: f64,
    /// Noise seed
    pub seed: u64,
    /// Stop after this many samples
    pub max_samples: Option<u64>,
}

impl Default for RideConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            speed_kmh: 30.0,
            noise_kmh: 0.0,
            seed: 0,
            max_samples: None,
        }
    }
}

impl From<&TelemetryConfig> for RideConfig {
    fn from(config: &TelemetryConfig) -> Self {
        Self {
            interval_ms: config.poll_interval_ms,
            speed_kmh: config.ride_speed_kmh,
            noise_kmh: config.ride_noise_kmh,
            seed: config.ride_seed,
            max_samples: None,
        }
    }
}

/// Deterministic sample generator behind `SimulatedRide`
#[derive(Debug)]
pub struct RideGenerator {
    config: RideConfig,
    name: SampleName,
    rng: StdRng,
    tick: u64,
}

impl RideGenerator {
    pub fn new(config: RideConfig, name: SampleName) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            name,
            rng,
            tick: 0,
        }
    }

    /// Next sample on the session clock (`tick * interval_ms`)
    pub fn next_sample(&mut self) -> RealtimeSample {
        let noise = if self.config.noise_kmh > 0.0 {
            self.rng
                .random_range(-self.config.noise_kmh..=self.config.noise_kmh)
        } else {
            0.0
        };
        let speed_kmh = (self.config.speed_kmh + noise).max(0.0);
        let power_w = power_for_speed(speed_kmh);

        let sample = RealtimeSample {
            name: self.name.clone(),
            power_w,
            heart_rate_bpm: 70.0 + 0.35 * power_w,
            speed_kmh,
            cadence_rpm: (speed_kmh * 2.9).min(120.0),
            load: power_w,
            elapsed_ms: self.tick * self.config.interval_ms,
        };
        self.tick += 1;
        sample
    }

    pub fn emitted(&self) -> u64 {
        self.tick
    }

    fn finished(&self) -> bool {
        self.config.max_samples.is_some_and(|max| self.tick >= max)
    }
}

/// Flat-road power needed to hold a speed
pub fn power_for_speed(speed_kmh: f64) -> f64 {
    let v = speed_kmh / 3.6;
    ROLLING_RESISTANCE * SYSTEM_MASS_KG * GRAVITY * v + DRAG_FACTOR * v * v * v
}

/// Simulated ride source
///
/// Samples carry a synthetic session clock, so replays with the same seed
/// are identical regardless of thread scheduling.
pub struct SimulatedRide {
    source_id: String,
    config: RideConfig,
    listening: Arc<AtomicBool>,
}

impl SimulatedRide {
    pub fn new(source_id: impl Into<String>, config: RideConfig) -> Self {
        Self {
            source_id: source_id.into(),
            config,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Simulated ride with default configuration
    pub fn with_defaults(source_id: impl Into<String>) -> Self {
        Self::new(source_id, RideConfig::default())
    }
}

impl SampleSource for SimulatedRide {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn poll_interval_ms(&self) -> u64 {
        self.config.interval_ms
    }

    fn listen(&self, callback: SampleCallback) {
        // Idempotent: if already listening, don't start again
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_id = self.source_id.clone();
        let name = SampleName::new(&source_id).unwrap_or_default();
        let config = self.config.clone();
        let listening = self.listening.clone();
        let interval = Duration::from_millis(config.interval_ms.max(1));

        thread::spawn(move || {
            let mut generator = RideGenerator::new(config, name);
            debug!(source_id = %source_id, "simulated ride started");

            while listening.load(Ordering::Relaxed) && !generator.finished() {
                let sample = generator.next_sample();
                trace!(
                    source_id = %source_id,
                    elapsed_ms = sample.elapsed_ms,
                    speed_kmh = sample.speed_kmh,
                    "simulated sample"
                );
                callback(sample);
                thread::sleep(interval);
            }

            listening.store(false, Ordering::SeqCst);
            debug!(source_id = %source_id, samples = generator.emitted(), "simulated ride stopped");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
