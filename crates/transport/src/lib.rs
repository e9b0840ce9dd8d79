//! # Transport
//!
//! Video playback backends behind `contracts::TransportAdapter`.
//!
//! Responsibilities:
//! - Pick the backend from configuration at runtime
//! - Simulated player for headless runs and tests
//! - mpv over JSON IPC (unix)

mod clock;
mod error;
mod factory;
#[cfg(unix)]
mod mpv;
mod simulated;

pub use clock::{Clock, ManualClock, SystemClock};
pub use contracts::{TransportAdapter, TransportError};
pub use error::{Result, TransportSetupError};
pub use factory::TransportFactory;
#[cfg(unix)]
pub use mpv::MpvTransport;
pub use simulated::{SimulatedConfig, SimulatedControls, SimulatedTransport};
