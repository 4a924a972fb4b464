//! # Frame Reader
//!
//! Incremental per-pulse state machine reassembling frames.
//!
//! ## Stages
//!
//! ```text
//! Scanning ──lock──▶ LengthSync ──▶ PayloadSync ──▶ ChecksumSync ──▶ (handoff) ──▶ Scanning
//!                        │               │                │
//!                        └───────────────┴────invalid─────┴──────▶ (abort) ──▶ Scanning
//! ```
//!
//! Each call to [`FrameReader::on_pulse`] consumes exactly one pulse and does
//! a bounded amount of work; the only allocation is the payload buffer, made
//! once per frame when the length field completes.
//!
//! In the synchronized stages every 48 pulses form one symbol: six 8-pulse
//! groups, each voted (5/8) into one code bit, MSB first. Decoded nibbles are
//! placed by the number of symbols still outstanding, which mirrors the
//! writer's last-byte-first, high-nibble-first order.

use tracing::{debug, trace, warn};

use super::preamble::PreambleCorrelator;
use super::protocol::*;
use super::symbols::{decode_symbol, encode_nibble};
use super::validation::{FrameHandoff, ReaderEvent};
use super::voter::{vote, SYMBOL_VOTE_THRESHOLD};
use crate::error::FrameError;
use crate::link::port_trait::PulseSource;

/// Result of feeding one pulse into the symbol accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolRead {
    /// Fewer than 48 pulses collected
    Incomplete,
    /// A full symbol was read but has no nibble mapping
    Invalid(u8),
    /// A full symbol decoded to this nibble
    Decoded(u8),
}

/// Partial symbol and field progress
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolAccumulator {
    /// One byte of samples per code bit
    groups: [u8; SYMBOL_BITS],
    /// Pulses collected for the current symbol
    pulses_read: usize,
    /// Symbols still outstanding in the current field
    symbols_remaining: usize,
}

impl SymbolAccumulator {
    /// Prepare to read a field of `symbols` symbols
    fn expect(&mut self, symbols: usize) {
        *self = Self {
            symbols_remaining: symbols,
            ..Self::default()
        };
    }

    /// Add one pulse to the current symbol
    pub fn push(&mut self, pulse: bool) -> SymbolRead {
        let index = self.pulses_read;
        self.groups[index / DIVS_PER_BIT] |= u8::from(pulse) << (index % DIVS_PER_BIT);
        self.pulses_read += 1;

        if self.pulses_read < PULSES_PER_SYMBOL {
            return SymbolRead::Incomplete;
        }

        let code = self.groups.iter().fold(0u8, |code, &samples| {
            (code << 1) | u8::from(vote(samples, SYMBOL_VOTE_THRESHOLD))
        });

        self.groups = [0; SYMBOL_BITS];
        self.pulses_read = 0;

        match decode_symbol(code) {
            Some(nibble) => SymbolRead::Decoded(nibble),
            None => SymbolRead::Invalid(code),
        }
    }

    /// Consume one outstanding symbol, returning its nibble slot in the field
    fn take_slot(&mut self) -> Option<usize> {
        self.symbols_remaining = self.symbols_remaining.checked_sub(1)?;
        Some(self.symbols_remaining)
    }
}

/// Everything the reader knows about the frame in progress
///
/// A freshly constructed value is exactly the state of an idle reader.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReaderState {
    stage: ReadStage,
    correlator: PreambleCorrelator,
    symbols: SymbolAccumulator,
    length: [u8; LENGTH_BYTES],
    payload: Vec<u8>,
    checksum: [u8; CHECKSUM_BYTES],
}

/// Per-pulse frame reader
///
/// Generic over the [`FrameHandoff`] that receives finished frames, so the
/// same state machine can validate inline or hand frames to a task.
#[derive(Debug)]
pub struct FrameReader<H> {
    state: ReaderState,
    handoff: H,
    max_payload_len: usize,
}

impl<H: FrameHandoff> FrameReader<H> {
    /// Create a reader accepting payloads up to [`DEFAULT_MAX_PAYLOAD_LEN`]
    pub fn new(handoff: H) -> Self {
        Self::with_max_payload_len(handoff, DEFAULT_MAX_PAYLOAD_LEN)
    }

    /// Create a reader with a custom payload limit
    ///
    /// Frames declaring a longer payload are discarded as soon as their
    /// length field is read.
    pub fn with_max_payload_len(handoff: H, max_payload_len: usize) -> Self {
        Self {
            state: ReaderState::default(),
            handoff,
            max_payload_len,
        }
    }

    /// Current stage
    pub fn stage(&self) -> ReadStage {
        self.state.stage
    }

    /// Snapshot of the per-frame state
    pub fn state(&self) -> &ReaderState {
        &self.state
    }

    /// Sample one pulse from `source` and process it
    pub fn poll<S: PulseSource + ?Sized>(&mut self, source: &mut S) {
        let pulse = source.read_pulse();
        self.on_pulse(pulse);
    }

    /// Process one received pulse
    pub fn on_pulse(&mut self, pulse: bool) {
        match self.state.stage {
            ReadStage::Scanning => {
                if self.state.correlator.push(pulse) {
                    debug!("Frame marker 0x{:08X} locked", self.state.correlator.candidate());
                    self.begin(ReadStage::LengthSync, LENGTH_BYTES);
                }
            }
            ReadStage::LengthSync | ReadStage::PayloadSync | ReadStage::ChecksumSync => {
                self.read_symbol(pulse);
            }
        }
    }

    /// Enter a synchronized stage expecting `bytes` bytes
    fn begin(&mut self, stage: ReadStage, bytes: usize) {
        self.state.stage = stage;
        self.state.symbols.expect(bytes * SYMBOLS_PER_BYTE);
    }

    fn read_symbol(&mut self, pulse: bool) {
        let nibble = match self.state.symbols.push(pulse) {
            SymbolRead::Incomplete => return,
            SymbolRead::Invalid(code) => {
                let stage = self.state.stage;
                self.abort(FrameError::InvalidSymbol { code, stage });
                return;
            }
            SymbolRead::Decoded(nibble) => nibble,
        };

        let Some(slot) = self.state.symbols.take_slot() else {
            let stage = self.state.stage;
            debug_assert!(false, "symbol decoded past the end of the {} field", stage);
            self.abort(FrameError::InvalidSymbol { code: encode_nibble(nibble), stage });
            return;
        };
        trace!("Symbol {} -> nibble 0x{:X} ({})", slot, nibble, self.state.stage);

        let field: &mut [u8] = match self.state.stage {
            ReadStage::LengthSync => &mut self.state.length[..],
            ReadStage::PayloadSync => &mut self.state.payload[..],
            ReadStage::ChecksumSync => &mut self.state.checksum[..],
            ReadStage::Scanning => return,
        };
        field[slot / SYMBOLS_PER_BYTE] |= nibble << (4 * (slot % SYMBOLS_PER_BYTE));

        if self.state.symbols.symbols_remaining == 0 {
            self.complete_field();
        }
    }

    fn complete_field(&mut self) {
        match self.state.stage {
            ReadStage::LengthSync => {
                let length = i32::from_le_bytes(self.state.length);
                debug!("Payload length {}", length);

                let len = match usize::try_from(length) {
                    Ok(len) if len <= self.max_payload_len => len,
                    _ => {
                        self.abort(FrameError::InvalidLength(length));
                        return;
                    }
                };

                if self.state.payload.try_reserve_exact(len).is_err() {
                    self.abort(FrameError::Allocation(len));
                    return;
                }
                self.state.payload.resize(len, 0);

                if len == 0 {
                    self.begin(ReadStage::ChecksumSync, CHECKSUM_BYTES);
                } else {
                    self.begin(ReadStage::PayloadSync, len);
                }
            }
            ReadStage::PayloadSync => {
                self.begin(ReadStage::ChecksumSync, CHECKSUM_BYTES);
            }
            ReadStage::ChecksumSync => {
                self.finish();
            }
            ReadStage::Scanning => {}
        }
    }

    /// Move the assembled frame out and re-arm for the next marker
    fn finish(&mut self) {
        let state = std::mem::take(&mut self.state);
        let frame = Frame {
            preamble: state.correlator.candidate(),
            length: i32::from_le_bytes(state.length),
            payload: state.payload,
            checksum: state.checksum[0],
        };

        debug!("Frame complete (FCS 0x{:02X}), handing off for validation", frame.checksum);
        self.handoff.hand_off(ReaderEvent::Assembled(frame));
    }

    /// Drop the partial frame and re-arm for the next marker
    fn abort(&mut self, reason: FrameError) {
        warn!("Discarding frame: {}", reason);
        // Releases any payload buffer allocated for this frame
        self.state = ReaderState::default();
        self.handoff.hand_off(ReaderEvent::Aborted(reason));
    }
}
