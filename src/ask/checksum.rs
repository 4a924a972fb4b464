//! # Frame Check Sequence
//!
//! Single-byte XOR checksum over marker, length and payload.
//!
//! The FCS only detects corruption; there is no correction.

use super::protocol::Frame;

/// Calculate the frame check sequence
///
/// # Arguments
///
/// * `preamble` - Frame marker value
/// * `length` - Payload length field
/// * `payload` - Payload bytes
///
/// # Returns
///
/// * `u8` - XOR of every byte of the three fields, in that order
///
/// # Examples
///
/// ```
/// use ask_link::ask::checksum::compute;
/// use ask_link::ask::protocol::FRAME_MARKER;
///
/// assert_eq!(compute(FRAME_MARKER, 2, b"AB"), 0x0C);
/// ```
pub fn compute(preamble: u32, length: i32, payload: &[u8]) -> u8 {
    preamble
        .to_le_bytes()
        .iter()
        .chain(length.to_le_bytes().iter())
        .chain(payload.iter())
        .fold(0u8, |fcs, &byte| fcs ^ byte)
}

/// Recompute the checksum of a frame and compare with its FCS field
pub fn verify(frame: &Frame) -> bool {
    compute(frame.preamble, frame.length, &frame.payload) == frame.checksum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ask::protocol::FRAME_MARKER;

    #[test]
    fn test_checksum_marker_only() {
        assert_eq!(compute(0, 0, &[]), 0x00);
        assert_eq!(compute(FRAME_MARKER, 0, &[]), 0xE7 ^ 0x26 ^ 0x1F ^ 0xD3);
    }

    #[test]
    fn test_checksum_ab_scenario() {
        let expected = 0xE7 ^ 0x26 ^ 0x1F ^ 0xD3 ^ 0x02 ^ 0x41 ^ 0x42;
        assert_eq!(compute(FRAME_MARKER, 2, &[0x41, 0x42]), expected);
        assert_eq!(expected, 0x0C);
    }

    #[test]
    fn test_checksum_covers_length_bytes() {
        let short = compute(FRAME_MARKER, 0x0100, &[]);
        let long = compute(FRAME_MARKER, 0x0200, &[]);
        assert_ne!(short, long, "length bytes must contribute to the FCS");
    }

    #[test]
    fn test_verify() {
        let mut frame = Frame::new(b"hello".to_vec()).unwrap();
        assert!(verify(&frame));

        frame.payload[0] ^= 0x01;
        assert!(!verify(&frame));
    }
}
