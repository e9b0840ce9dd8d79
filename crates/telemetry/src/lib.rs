//! # Telemetry
//!
//! Trainer telemetry acquisition.
//!
//! Responsibilities:
//! - `SampleSource` implementations (simulated ride, JSONL replay)
//! - Fan-in of all sources into one bounded channel
//! - Drop accounting when the consumer falls behind
//!
//! ## Usage Example
//!
//! ```ignore
//! use telemetry::{source_from_config, TelemetryPipeline};
//!
//! let mut pipeline = TelemetryPipeline::new(config.channel_capacity);
//! pipeline.register_source(source_from_config(&config)?);
//! let rx = pipeline.take_receiver().unwrap();
//! pipeline.start_all();
//! while let Ok(sample) = rx.recv().await {
//!     // feed the sync session
//! }
//! ```

mod error;
mod metrics;
mod pipeline;
mod replay;
mod ride;

use contracts::{SampleSource, TelemetryConfig, TelemetrySourceKind};

pub use error::{Result, TelemetryError};
pub use metrics::{MetricsSnapshot, TelemetryMetrics};
pub use pipeline::TelemetryPipeline;
pub use replay::{ReplayConfig, ReplaySource};
pub use ride::{power_for_speed, RideConfig, RideGenerator, SimulatedRide};

/// Source id used for the configured simulated ride
pub const SIMULATED_SOURCE_ID: &str = "simulated";

/// Build the source selected by the telemetry configuration
pub fn source_from_config(config: &TelemetryConfig) -> Result<Box<dyn SampleSource>> {
    match config.source {
        TelemetrySourceKind::Simulated => Ok(Box::new(SimulatedRide::new(
            SIMULATED_SOURCE_ID,
            RideConfig::from(config),
        ))),
        TelemetrySourceKind::Replay => {
            let path = config
                .replay_path
                .as_deref()
                .ok_or_else(|| TelemetryError::InvalidSource {
                    message: "replay source requires telemetry.replay_path".to_string(),
                })?;
            let source = ReplaySource::load(
                path,
                ReplayConfig {
                    speed_multiplier: config.replay_speed,
                    loop_playback: false,
                },
            )?;
            Ok(Box::new(source))
        }
    }
}
