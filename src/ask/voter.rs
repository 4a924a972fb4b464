//! # Pulse Voter
//!
//! Recovers one logical bit from a group of oversampled pulses.
//!
//! Two thresholds are in use. Marker correlation is strict because a false
//! lock swallows a whole frame's worth of pulses; symbol bits are looser
//! because corruption there is caught by the symbol code and the FCS. The
//! looser threshold also absorbs the up-to-two-pulse phase error left over
//! from an early marker lock.

/// Set samples (out of 8) required to read a marker bit as 1
pub const PREAMBLE_VOTE_THRESHOLD: u32 = 6;

/// Set samples (out of 8) required to read a symbol bit as 1
pub const SYMBOL_VOTE_THRESHOLD: u32 = 5;

/// Majority-vote a group of eight pulse samples
///
/// # Arguments
///
/// * `samples` - One pulse per bit
/// * `threshold` - Minimum number of set samples for a 1
///
/// # Returns
///
/// * `bool` - The voted bit
#[inline]
pub fn vote(samples: u8, threshold: u32) -> bool {
    samples.count_ones() >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_are_distinct() {
        assert_eq!(PREAMBLE_VOTE_THRESHOLD, 6);
        assert_eq!(SYMBOL_VOTE_THRESHOLD, 5);
    }

    #[test]
    fn test_vote_extremes() {
        assert!(!vote(0x00, SYMBOL_VOTE_THRESHOLD));
        assert!(vote(0xFF, SYMBOL_VOTE_THRESHOLD));
        assert!(!vote(0x00, PREAMBLE_VOTE_THRESHOLD));
        assert!(vote(0xFF, PREAMBLE_VOTE_THRESHOLD));
    }

    #[test]
    fn test_vote_at_threshold() {
        // five set samples
        assert!(vote(0b0001_1111, SYMBOL_VOTE_THRESHOLD));
        assert!(!vote(0b0001_1111, PREAMBLE_VOTE_THRESHOLD));

        // six set samples
        assert!(vote(0b1011_0111, PREAMBLE_VOTE_THRESHOLD));

        // four set samples
        assert!(!vote(0b1010_1010, SYMBOL_VOTE_THRESHOLD));
    }

    #[test]
    fn test_vote_ignores_sample_order() {
        assert_eq!(
            vote(0b1111_1000, SYMBOL_VOTE_THRESHOLD),
            vote(0b0001_1111, SYMBOL_VOTE_THRESHOLD)
        );
    }
}
