//! # meetrtc Signaling
//!
//! Resolves a room name and participant name into the server URL and access
//! token needed to connect, via the configurable connection details endpoint.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod protocol;

// Re-export main types
pub use client::{ConnectionDetailsSource, FixedConnectionDetails, JoinClient};
pub use error::SignalingError;
pub use protocol::{ConnectionDetails, JoinRequest, DEFAULT_CONN_DETAILS_ENDPOINT};
