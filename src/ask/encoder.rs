//! # Frame Encoder
//!
//! Turns a frame into the complete oversampled pulse sequence.
//!
//! Each field is encoded independently:
//! 1. Bytes of the little-endian field go out in descending index order
//! 2. High nibble before low nibble
//! 3. Marker nibbles are sent raw (4 bits), every other field uses the
//!    6-bit balanced code
//! 4. Each code bit, MSB first, is repeated [`DIVS_PER_BIT`] times
//!
//! The marker stays raw because the receiver correlates it without a clock;
//! symbol coding would change its bit pattern without helping the lock.

use std::iter;

use super::checksum;
use super::protocol::*;
use super::symbols::encode_nibble;
use crate::error::{AskLinkError, Result};

/// How the nibbles of a field are put on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCoding {
    /// Raw 4-bit nibble (marker only)
    Raw,
    /// 6-bit balanced symbol
    Balanced,
}

impl FieldCoding {
    /// Code bits per nibble
    pub const fn width(self) -> usize {
        match self {
            FieldCoding::Raw => NIBBLE_BITS,
            FieldCoding::Balanced => SYMBOL_BITS,
        }
    }
}

/// Number of pulses in a frame carrying `payload_len` bytes
///
/// # Examples
///
/// ```
/// use ask_link::ask::encoder::pulse_count;
///
/// assert_eq!(pulse_count(0), 736);
/// assert_eq!(pulse_count(2), 928);
/// ```
pub const fn pulse_count(payload_len: usize) -> usize {
    let marker = MARKER_BYTES * SYMBOLS_PER_BYTE * NIBBLE_BITS;
    let coded = (LENGTH_BYTES + payload_len + CHECKSUM_BYTES) * SYMBOLS_PER_BYTE * SYMBOL_BITS;
    (marker + coded) * DIVS_PER_BIT
}

/// Append the pulses for one field
///
/// # Arguments
///
/// * `bytes` - Field bytes in memory (little-endian) order
/// * `coding` - Raw or balanced nibble coding
/// * `out` - Pulse buffer to extend
pub fn encode_field(bytes: &[u8], coding: FieldCoding, out: &mut Vec<bool>) {
    for &byte in bytes.iter().rev() {
        for nibble in [byte >> 4, byte & 0x0F] {
            let code = match coding {
                FieldCoding::Raw => nibble,
                FieldCoding::Balanced => encode_nibble(nibble),
            };

            for bit in (0..coding.width()).rev() {
                let level = (code >> bit) & 1 == 1;
                out.extend(iter::repeat(level).take(DIVS_PER_BIT));
            }
        }
    }
}

/// Encode a complete frame into pulses
///
/// # Errors
///
/// Returns error if the pulse buffer cannot be allocated
pub fn encode_frame(frame: &Frame) -> Result<Vec<bool>> {
    encode_parts(frame.preamble, frame.length, &frame.payload, frame.checksum)
}

/// Frame a payload and encode it into pulses
///
/// Equivalent to encoding `Frame::new(payload)` without copying the payload.
///
/// # Errors
///
/// Returns error if the payload does not fit the length field or the pulse
/// buffer cannot be allocated
///
/// # Examples
///
/// ```
/// use ask_link::ask::encoder::{encode_payload, pulse_count};
///
/// let pulses = encode_payload(b"AB")?;
/// assert_eq!(pulses.len(), pulse_count(2));
/// # Ok::<(), ask_link::error::AskLinkError>(())
/// ```
pub fn encode_payload(payload: &[u8]) -> Result<Vec<bool>> {
    let length = i32::try_from(payload.len()).map_err(|_| AskLinkError::PayloadTooLarge {
        size: payload.len(),
        max: i32::MAX as usize,
    })?;
    let fcs = checksum::compute(FRAME_MARKER, length, payload);

    encode_parts(FRAME_MARKER, length, payload, fcs)
}

fn encode_parts(preamble: u32, length: i32, payload: &[u8], fcs: u8) -> Result<Vec<bool>> {
    let mut pulses = Vec::new();
    pulses.try_reserve_exact(pulse_count(payload.len()))?;

    encode_field(&preamble.to_le_bytes(), FieldCoding::Raw, &mut pulses);
    encode_field(&length.to_le_bytes(), FieldCoding::Balanced, &mut pulses);
    encode_field(payload, FieldCoding::Balanced, &mut pulses);
    encode_field(&[fcs], FieldCoding::Balanced, &mut pulses);

    Ok(pulses)
}
