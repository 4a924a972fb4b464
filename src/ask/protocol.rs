//! # ASK Protocol Constants and Types
//!
//! Core wire definitions for the pulse link.
//!
//! ## Wire Format
//!
//! | Field | Size | Coding |
//! |-------|------|--------|
//! | Marker | 4 bytes | raw nibble, oversampled ×8 |
//! | Length | 4 bytes (signed) | 6-bit balanced symbol, oversampled ×8 |
//! | Payload | `length` bytes | 6-bit balanced symbol, oversampled ×8 |
//! | Checksum | 1 byte | 6-bit balanced symbol, oversampled ×8 |

use std::fmt;
use std::mem::size_of;

use super::checksum;
use crate::error::{AskLinkError, Result};

/// Frame marker (preamble) prefixing every frame
pub const FRAME_MARKER: u32 = 0xD31F_26E7;

/// Marker field width in bytes
pub const MARKER_BYTES: usize = size_of::<u32>();

/// Length field width in bytes
pub const LENGTH_BYTES: usize = size_of::<i32>();

/// Checksum field width in bytes
pub const CHECKSUM_BYTES: usize = size_of::<u8>();

/// Pulses transmitted per logical bit (oversampling factor)
pub const DIVS_PER_BIT: usize = 8;

/// Bits per raw (marker) nibble
pub const NIBBLE_BITS: usize = 4;

/// Bits per balanced symbol
pub const SYMBOL_BITS: usize = 6;

/// Nibbles, and therefore symbols, per byte
pub const SYMBOLS_PER_BYTE: usize = 2;

/// Pulses making up one balanced symbol
pub const PULSES_PER_SYMBOL: usize = SYMBOL_BITS * DIVS_PER_BIT;

/// Default upper bound on payload size accepted by writer and reader
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 4096;

/// Stage of the frame reader between pulses
///
/// Validation, delivery and discarding all complete within the pulse that
/// finishes the checksum (or reads an invalid symbol), so the reader is only
/// ever observed in one of these pulse-consuming stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadStage {
    /// Autocorrelating against the frame marker
    #[default]
    Scanning,
    /// Reading the 4-byte length field
    LengthSync,
    /// Reading `length` payload bytes
    PayloadSync,
    /// Reading the 1-byte checksum
    ChecksumSync,
}

impl fmt::Display for ReadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadStage::Scanning => "marker",
            ReadStage::LengthSync => "length",
            ReadStage::PayloadSync => "payload",
            ReadStage::ChecksumSync => "checksum",
        };
        f.write_str(name)
    }
}

/// A complete link frame
///
/// Deliberately not `Clone`: the payload buffer moves from reader to
/// validation to sink and is never duplicated.
#[derive(Debug, PartialEq, Eq)]
pub struct Frame {
    /// Frame marker, always [`FRAME_MARKER`] for well-formed frames
    pub preamble: u32,

    /// Payload byte count
    pub length: i32,

    /// Payload data
    pub payload: Vec<u8>,

    /// XOR of every byte of marker, length and payload
    pub checksum: u8,
}

impl Frame {
    /// Wrap a payload in a frame
    ///
    /// # Arguments
    ///
    /// * `payload` - Payload bytes
    ///
    /// # Returns
    ///
    /// * `Result<Frame>` - Frame with marker, length and checksum filled in
    ///
    /// # Errors
    ///
    /// Returns error if the payload length does not fit the signed 32-bit
    /// length field
    pub fn new(payload: Vec<u8>) -> Result<Self> {
        let length = i32::try_from(payload.len()).map_err(|_| AskLinkError::PayloadTooLarge {
            size: payload.len(),
            max: i32::MAX as usize,
        })?;

        let checksum = checksum::compute(FRAME_MARKER, length, &payload);

        Ok(Self {
            preamble: FRAME_MARKER,
            length,
            payload,
            checksum,
        })
    }

    /// Consume the frame, releasing its payload to the caller
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_widths() {
        assert_eq!(MARKER_BYTES, 4);
        assert_eq!(LENGTH_BYTES, 4);
        assert_eq!(CHECKSUM_BYTES, 1);
        assert_eq!(PULSES_PER_SYMBOL, 48);
    }

    #[test]
    fn test_frame_new() {
        let frame = Frame::new(b"AB".to_vec()).unwrap();
        assert_eq!(frame.preamble, FRAME_MARKER);
        assert_eq!(frame.length, 2);
        assert_eq!(frame.checksum, 0x0C);
        assert_eq!(frame.into_payload(), vec![0x41, 0x42]);
    }

    #[test]
    fn test_frame_empty_payload() {
        let frame = Frame::new(Vec::new()).unwrap();
        assert_eq!(frame.length, 0);
        // 0xE7 ^ 0x26 ^ 0x1F ^ 0xD3
        assert_eq!(frame.checksum, 0x0D);
    }

    #[test]
    fn test_read_stage_display() {
        assert_eq!(ReadStage::default(), ReadStage::Scanning);
        assert_eq!(ReadStage::PayloadSync.to_string(), "payload");
        assert_eq!(ReadStage::ChecksumSync.to_string(), "checksum");
    }
}
