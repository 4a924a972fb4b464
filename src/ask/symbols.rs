//! # 4b6b Symbol Codec
//!
//! Maps each nibble to a 6-bit code with exactly three set bits. Every code
//! is DC-balanced and any single-bit error produces a code of weight 2 or 4,
//! which has no nibble mapping and is therefore detected.

use super::protocol::SYMBOL_BITS;

/// Forward table: nibble → 6-bit balanced code
pub const SYMBOLS_4B6B: [u8; 16] = [
    0x0D, 0x0E, 0x13, 0x15, 0x16, 0x19, 0x1A, 0x1C,
    0x23, 0x25, 0x26, 0x29, 0x2A, 0x2C, 0x32, 0x34,
];

/// Number of distinct 6-bit values
const CODE_SPACE: usize = 1 << SYMBOL_BITS;

/// Reverse table: 6-bit value → nibble, `None` for the 48 unmapped codes
const SYMBOLS_6B4B: [Option<u8>; CODE_SPACE] = generate_decode_table();

/// Build the reverse table from the forward table at compile time
const fn generate_decode_table() -> [Option<u8>; CODE_SPACE] {
    let mut table = [None; CODE_SPACE];
    let mut nibble = 0;

    while nibble < SYMBOLS_4B6B.len() {
        table[SYMBOLS_4B6B[nibble] as usize] = Some(nibble as u8);
        nibble += 1;
    }

    table
}

/// Encode a nibble as its 6-bit balanced code
///
/// Only the low four bits of `nibble` are used.
///
/// # Examples
///
/// ```
/// use ask_link::ask::symbols::encode_nibble;
///
/// assert_eq!(encode_nibble(0x0), 0x0D);
/// assert_eq!(encode_nibble(0xF), 0x34);
/// ```
pub fn encode_nibble(nibble: u8) -> u8 {
    SYMBOLS_4B6B[(nibble & 0x0F) as usize]
}

/// Decode a 6-bit code back to its nibble
///
/// # Returns
///
/// * `Option<u8>` - The nibble, or `None` if `code` is not a valid symbol
///   (including any value outside the 6-bit range)
pub fn decode_symbol(code: u8) -> Option<u8> {
    SYMBOLS_6B4B.get(code as usize).copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_every_nibble() {
        for nibble in 0..16u8 {
            assert_eq!(decode_symbol(encode_nibble(nibble)), Some(nibble));
        }
    }

    #[test]
    fn test_exactly_sixteen_valid_codes() {
        let valid = (0..64u8).filter(|&code| decode_symbol(code).is_some()).count();
        assert_eq!(valid, 16);
    }

    #[test]
    fn test_codes_are_balanced() {
        for &code in SYMBOLS_4B6B.iter() {
            assert_eq!(code.count_ones(), 3, "code 0x{:02X} is not balanced", code);
            assert!(code < 64);
        }
    }

    #[test]
    fn test_single_bit_errors_are_invalid() {
        for &code in SYMBOLS_4B6B.iter() {
            for bit in 0..SYMBOL_BITS {
                let corrupted = code ^ (1 << bit);
                assert_eq!(
                    decode_symbol(corrupted),
                    None,
                    "flip of bit {} in 0x{:02X} decoded",
                    bit,
                    code
                );
            }
        }
    }

    #[test]
    fn test_out_of_range_codes() {
        assert_eq!(decode_symbol(0x00), None);
        assert_eq!(decode_symbol(0x3F), None);
        assert_eq!(decode_symbol(64), None);
        assert_eq!(decode_symbol(u8::MAX), None);
    }

    #[test]
    fn test_encode_ignores_high_bits() {
        assert_eq!(encode_nibble(0x1F), encode_nibble(0x0F));
    }
}
