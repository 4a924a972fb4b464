//! Trait abstractions for the link's external collaborators to enable testing

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;

use crate::error::FrameError;

/// Source of received pulses, sampled once per tick
pub trait PulseSource {
    /// Read the current line level
    fn read_pulse(&mut self) -> bool;
}

/// Sink for transmitted pulses, driven once per tick
pub trait PulseSink {
    /// Drive the line to `pulse`
    fn write_pulse(&mut self, pulse: bool);
}

/// Receiver of reassembled datagrams
///
/// Exactly one of these methods is called for every frame the reader locks
/// onto, including frames aborted mid-stream.
#[cfg_attr(test, mockall::automock)]
pub trait DatagramSink {
    /// A frame passed validation; ownership of the payload passes to the sink
    fn on_success(&mut self, payload: Bytes);

    /// A frame was discarded
    fn on_failure(&mut self, reason: FrameError);
}

/// In-process single-wire line
///
/// Cloning yields another handle to the same line, so one clone can be the
/// writer's sink and another the reader's source.
#[derive(Debug, Clone, Default)]
pub struct LoopbackLine {
    level: Arc<AtomicBool>,
}

impl LoopbackLine {
    /// Create a line idling low
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the line level, e.g. to release it after a frame
    pub fn set(&self, level: bool) {
        self.level.store(level, Ordering::Release);
    }

    /// Current line level
    pub fn level(&self) -> bool {
        self.level.load(Ordering::Acquire)
    }
}

impl PulseSource for LoopbackLine {
    fn read_pulse(&mut self) -> bool {
        self.level()
    }
}

impl PulseSink for LoopbackLine {
    fn write_pulse(&mut self, pulse: bool) {
        self.set(pulse);
    }
}
