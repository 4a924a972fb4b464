//! # Error Types
//!
//! Custom error types for the ASK link using `thiserror`.

use thiserror::Error;

use crate::ask::protocol::ReadStage;

/// Main error type for the ASK link
#[derive(Debug, Error)]
pub enum AskLinkError {
    /// A frame is already in flight on the writer
    #[error("Writer busy: a frame is already in flight")]
    WriterBusy,

    /// Payload exceeds the configured maximum
    #[error("Payload size {size} exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },

    /// The tick side of the writer has been dropped
    #[error("Writer closed: no pulse emitter is attached")]
    WriterClosed,

    /// A blocking submit did not see its frame drain in time
    #[error("Submit timed out after {waited_ms}ms; frame still in flight")]
    SubmitTimeout { waited_ms: u64 },

    /// Pulse or payload buffer could not be allocated
    #[error("Allocation failure: {0}")]
    Allocation(#[from] std::collections::TryReserveError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Telemetry serialization errors
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] serde_json::Error),
}

/// Reason a received frame was discarded
///
/// Exactly one of these (or a successful delivery) is reported to the
/// datagram sink for every frame the reader locks onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// A 6-bit code with no nibble mapping was read
    #[error("Invalid symbol 0x{code:02X} while reading {stage}")]
    InvalidSymbol { code: u8, stage: ReadStage },

    /// Recomputed FCS does not match the received one
    #[error("Checksum mismatch: computed 0x{computed:02X}, received 0x{received:02X}")]
    ChecksumMismatch { computed: u8, received: u8 },

    /// Decoded length is negative or above the reader's maximum
    #[error("Invalid payload length {0}")]
    InvalidLength(i32),

    /// Payload buffer could not be allocated
    #[error("Payload buffer allocation of {0} bytes failed")]
    Allocation(usize),
}

/// Result type alias for the ASK link
pub type Result<T> = std::result::Result<T, AskLinkError>;
