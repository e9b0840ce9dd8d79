//! # Sync Engine
//!
//! Keeps trainer video playback aligned with live telemetry.
//!
//! Responsibilities:
//! - course position to video position lookup (`SyncTable`)
//! - declared vs. actual totals scaling (`adjust`)
//! - playback state machine and per-sample correction (`SyncEngine`)
//! - single-writer session actor (`SessionHandle`)
//!
//! ## Usage
//!
//! ```ignore
//! use sync_engine::{SessionHandle, SyncEngine, SyncEngineConfig};
//!
//! let engine = SyncEngine::new(SyncEngineConfig::default(), transport, provider);
//! let session = SessionHandle::spawn(engine, 64);
//!
//! session.select_media("ride.mp4").await?;
//! session.start().await?;
//! let report = session.telemetry(sample).await?;
//! ```

pub mod adjust;
mod engine;
mod error;
mod history;
mod position;
mod rate;
mod session;
mod table;

pub use engine::SyncEngine;
pub use error::SyncError;
pub use history::DriftHistory;
pub use position::{resolve_sync_mode, SessionOdometer};
pub use rate::{Correction, RateController};
pub use session::{SessionCommand, SessionHandle};
pub use table::SyncTable;

// Re-export contracts types
pub use contracts::{
    ActualTotals, AdjustmentFactors, PlaybackState, RateConfig, SyncDecision, SyncEngineConfig,
    SyncMode, SyncReport, SyncStatus,
};
