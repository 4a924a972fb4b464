//! # ASK Link Protocol Module
//!
//! Implementation of the single-wire, amplitude-keyed pulse link.
//!
//! This module handles:
//! - 4b6b balanced symbol coding and the raw frame marker
//! - XOR frame check sequence
//! - Majority voting over oversampled pulses
//! - Marker autocorrelation for clockless frame synchronization
//! - Per-tick frame emission and per-pulse frame reassembly
//! - Checksum validation off the pulse path

pub mod protocol;
pub mod symbols;
pub mod checksum;
pub mod voter;
pub mod preamble;
pub mod encoder;
pub mod writer;
pub mod reader;
pub mod validation;
