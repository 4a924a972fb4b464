//! # Marker Autocorrelation
//!
//! Before a frame is found the receiver has no clock shared with the sender,
//! so every pulse is kept in a rolling history covering exactly one marker's
//! worth of oversampled bits. After each pulse the history is regrouped into
//! 8-pulse groups, each group is voted into one bit, and the resulting
//! candidate is compared with [`FRAME_MARKER`].
//!
//! ## History Layout
//!
//! ```text
//! word 3                word 2                word 1                word 0
//! [oldest ........................................................ newest]
//!  group 31 .. group 24  group 23 .. group 16  group 15 .. group 8   group 7 .. group 0
//! ```
//!
//! Group `i` occupies bits `8 * (i % 8)..8 * (i % 8) + 8` of word `i / 8` and
//! votes candidate bit `i`, so the most recently received bit lands in the
//! candidate's least significant bit.
//!
//! With a clean stream the candidate first matches up to two pulses before
//! the marker's last bit is complete; the symbol vote threshold tolerates
//! that phase error.

use super::protocol::{DIVS_PER_BIT, FRAME_MARKER, MARKER_BYTES};
use super::voter::{vote, PREAMBLE_VOTE_THRESHOLD};

/// Candidate bits (8-pulse groups) held per history word
const GROUPS_PER_WORD: usize = u64::BITS as usize / DIVS_PER_BIT;

/// Rolling marker correlator
///
/// Fixed-size, never allocates; one call to [`push`](Self::push) per pulse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreambleCorrelator {
    /// Chained shift register of the last `8 * 8 * MARKER_BYTES` pulses
    history: [u64; MARKER_BYTES],

    /// Candidate computed on the most recent pulse
    candidate: u32,
}

impl PreambleCorrelator {
    /// Create an empty correlator
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift in one pulse and test for the frame marker
    ///
    /// # Returns
    ///
    /// * `bool` - `true` if the candidate equals [`FRAME_MARKER`] exactly
    pub fn push(&mut self, pulse: bool) -> bool {
        let mut carry = u64::from(pulse);

        for word in self.history.iter_mut() {
            let overflow = *word >> 63;
            *word = (*word << 1) | carry;
            carry = overflow;
        }

        self.candidate = self.regroup();
        self.candidate == FRAME_MARKER
    }

    /// Candidate value computed on the last pulse
    pub fn candidate(&self) -> u32 {
        self.candidate
    }

    /// Vote every 8-pulse group of the history into one candidate bit
    fn regroup(&self) -> u32 {
        let mut candidate = 0u32;

        for (word_index, &word) in self.history.iter().enumerate() {
            for group in 0..GROUPS_PER_WORD {
                let samples = (word >> (group * DIVS_PER_BIT)) as u8;
                if vote(samples, PREAMBLE_VOTE_THRESHOLD) {
                    candidate |= 1 << (word_index * GROUPS_PER_WORD + group);
                }
            }
        }

        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ask::encoder::{encode_field, FieldCoding};

    /// Raw oversampled pulses for a marker-sized value, as the writer sends it
    fn marker_pulses(value: u32) -> Vec<bool> {
        let mut pulses = Vec::new();
        encode_field(&value.to_le_bytes(), FieldCoding::Raw, &mut pulses);
        pulses
    }

    /// Feed pulses, returning the index of the pulse that locked, if any
    fn feed(correlator: &mut PreambleCorrelator, pulses: &[bool]) -> Option<usize> {
        pulses.iter().position(|&pulse| correlator.push(pulse))
    }

    #[test]
    fn test_history_width() {
        assert_eq!(GROUPS_PER_WORD * MARKER_BYTES, 32);
    }

    #[test]
    fn test_fresh_correlator_is_empty() {
        let correlator = PreambleCorrelator::new();
        assert_eq!(correlator.candidate(), 0);
    }

    #[test]
    fn test_locks_on_clean_marker() {
        let mut correlator = PreambleCorrelator::new();
        let pulses = marker_pulses(FRAME_MARKER);
        assert_eq!(pulses.len(), 256);

        let locked_at = feed(&mut correlator, &pulses).expect("marker should lock");

        // Strict 6/8 vote: the last bit needs at least six of its pulses
        assert!(locked_at >= 253, "locked too early at pulse {}", locked_at);
        assert_eq!(correlator.candidate(), FRAME_MARKER);
    }

    #[test]
    fn test_locks_after_idle_noise() {
        let mut correlator = PreambleCorrelator::new();
        let mut pulses = vec![true; 100];
        pulses.extend(vec![false; 100]);
        pulses.extend(marker_pulses(FRAME_MARKER));

        let locked_at = feed(&mut correlator, &pulses).expect("marker should lock");
        assert!(locked_at >= 200 + 253);
    }

    #[test]
    fn test_single_bit_difference_never_locks() {
        for bit in 0..32 {
            let near_miss = FRAME_MARKER ^ (1 << bit);
            let mut correlator = PreambleCorrelator::new();

            assert_eq!(
                feed(&mut correlator, &marker_pulses(near_miss)),
                None,
                "candidate differing in bit {} locked",
                bit
            );
            assert_eq!(correlator.candidate(), near_miss);
        }
    }

    #[test]
    fn test_candidate_tracks_latest_bits() {
        let mut correlator = PreambleCorrelator::new();
        for _ in 0..DIVS_PER_BIT {
            correlator.push(true);
        }
        assert_eq!(correlator.candidate(), 0b1);

        for _ in 0..DIVS_PER_BIT {
            correlator.push(false);
        }
        assert_eq!(correlator.candidate(), 0b10);
    }

    #[test]
    fn test_history_rolls_over() {
        let mut correlator = PreambleCorrelator::new();
        for _ in 0..256 {
            correlator.push(true);
        }
        assert_eq!(correlator.candidate(), u32::MAX);

        // A full window of zeros flushes every group
        for _ in 0..256 {
            correlator.push(false);
        }
        assert_eq!(correlator.candidate(), 0);
    }
}
