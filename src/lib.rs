//! # ASK Link Library
//!
//! Self-synchronizing single-wire pulse link for amplitude-keyed radios.
//!
//! This library turns byte payloads into oversampled, 4b6b-coded pulse
//! streams and reassembles them one pulse at a time on the receiving side,
//! with no clock shared between sender and receiver.

pub mod config;
pub mod error;
pub mod ask;
pub mod link;
pub mod telemetry;
