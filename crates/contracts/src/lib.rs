//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Units
//! - Video positions: milliseconds (f64)
//! - Session elapsed time: milliseconds (u64)
//! - Distance: kilometres, speed: km/h

mod blueprint;
mod error;
mod playback;
mod sample;
mod sample_source;
mod sync_engine_config;
mod sync_file;
mod transport;

pub use blueprint::*;
pub use error::*;
pub use playback::*;
pub use sample::*;
pub use sample_source::{SampleCallback, SampleSource};
pub use sync_engine_config::*;
pub use sync_file::*;
pub use transport::TransportAdapter;
