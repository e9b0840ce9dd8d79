//! Runtime backend selection

use contracts::{TransportAdapter, TransportBackend, TransportConfig};
use tracing::info;

use crate::error::{Result, TransportSetupError};
use crate::simulated::{SimulatedConfig, SimulatedTransport};

/// Builds the configured `TransportAdapter`
pub struct TransportFactory;

impl TransportFactory {
    pub fn create(config: &TransportConfig) -> Result<Box<dyn TransportAdapter>> {
        info!(backend = ?config.backend, "creating transport");
        match config.backend {
            TransportBackend::Simulated => Ok(Box::new(SimulatedTransport::new(
                SimulatedConfig::from(config),
            ))),
            TransportBackend::Mpv => Self::create_mpv(config),
        }
    }

    #[cfg(unix)]
    fn create_mpv(config: &TransportConfig) -> Result<Box<dyn TransportAdapter>> {
        let socket = config
            .mpv_socket
            .as_ref()
            .ok_or(TransportSetupError::MissingSetting {
                backend: TransportBackend::Mpv,
                setting: "transport.mpv_socket",
            })?;
        Ok(Box::new(crate::mpv::MpvTransport::new(
            socket,
            std::time::Duration::from_millis(config.ipc_timeout_ms),
        )))
    }

    #[cfg(not(unix))]
    fn create_mpv(_config: &TransportConfig) -> Result<Box<dyn TransportAdapter>> {
        Err(TransportSetupError::Unsupported(TransportBackend::Mpv))
    }
}
