//! # meetrtc Diagnostics
//!
//! Structured logging setup and outbound bitrate monitoring for local video
//! publications.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod bitrate_monitor;
pub mod debug_logger;

// Re-export main types
pub use bitrate_monitor::{
    BitrateMonitor, BitrateSample, PublicationMonitor, DEFAULT_SAMPLE_INTERVAL,
};
pub use debug_logger::{init_logging, LogConfig};
