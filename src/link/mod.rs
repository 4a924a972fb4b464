//! # Link Module
//!
//! External collaborators of the pulse link.
//!
//! This module handles:
//! - Pulse source/sink and datagram sink abstractions
//! - An in-process loopback line for demos and tests
//! - The periodic scheduler that drives the per-pulse callbacks

pub mod port_trait;
pub mod scheduler;

pub use port_trait::{DatagramSink, LoopbackLine, PulseSink, PulseSource};
pub use scheduler::Repeater;
