//! # Frame Writer
//!
//! Single-slot frame transmitter.
//!
//! The writer is split in two halves sharing one atomic slot flag:
//! - [`WriterHandle`] runs in the foreground. It claims the slot, encodes the
//!   whole frame once, and passes the pulse buffer to the tick side.
//! - [`FrameWriter`] runs on the periodic scheduler. Each tick emits one
//!   pulse; after the last pulse it drops the buffer and frees the slot.
//!
//! Exactly one frame is in flight at a time. A submit while the slot is taken
//! fails with [`AskLinkError::WriterBusy`]; nothing is queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info};

use super::encoder::encode_payload;
use super::protocol::DEFAULT_MAX_PAYLOAD_LEN;
use crate::config::Config;
use crate::error::{AskLinkError, Result};
use crate::link::port_trait::PulseSink;

/// Blocking submits give up after this many estimated air times
const SUBMIT_TIMEOUT_FACTOR: u32 = 4;

/// Fixed slack added to the blocking submit deadline
const SUBMIT_TIMEOUT_MARGIN: Duration = Duration::from_millis(100);

/// Writer timing and limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterSettings {
    /// Pulse period in microseconds
    pub us_per_div: u64,
    /// Blocking submits poll every `estimate / poll_divisor`
    pub poll_divisor: u32,
    /// Largest payload accepted by `submit`
    pub max_payload_len: usize,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            us_per_div: 1000,
            poll_divisor: 10,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
        }
    }
}

impl From<&Config> for WriterSettings {
    fn from(config: &Config) -> Self {
        Self {
            us_per_div: config.link.us_per_div,
            poll_divisor: config.writer.poll_divisor,
            max_payload_len: config.link.max_payload_len,
        }
    }
}

/// Create a connected writer handle and tick-side writer
///
/// # Arguments
///
/// * `sink` - Line driven by [`FrameWriter::on_tick`]
/// * `settings` - Timing and payload limits
///
/// # Examples
///
/// ```
/// use ask_link::ask::writer::{channel, WriterSettings};
/// use ask_link::link::LoopbackLine;
///
/// let (handle, mut writer) = channel(LoopbackLine::new(), WriterSettings::default());
/// assert_eq!(handle.try_submit(b"hi")?, 2);
/// assert!(handle.try_submit(b"again").is_err());
///
/// while !handle.is_slot_free() {
///     writer.on_tick();
/// }
/// # Ok::<(), ask_link::error::AskLinkError>(())
/// ```
pub fn channel<P: PulseSink>(sink: P, settings: WriterSettings) -> (WriterHandle, FrameWriter<P>) {
    let slot_free = Arc::new(AtomicBool::new(true));
    let (streams, incoming) = mpsc::unbounded_channel();

    let handle = WriterHandle {
        slot_free: slot_free.clone(),
        streams,
        settings,
    };

    let writer = FrameWriter {
        sink,
        slot_free,
        incoming,
        active: None,
    };

    (handle, writer)
}

/// Foreground side of the writer
#[derive(Debug, Clone)]
pub struct WriterHandle {
    slot_free: Arc<AtomicBool>,
    streams: mpsc::UnboundedSender<Vec<bool>>,
    settings: WriterSettings,
}

impl WriterHandle {
    /// Submit a payload without waiting for it to be sent
    ///
    /// There is no completion notification; poll
    /// [`is_slot_free`](Self::is_slot_free) if one is needed.
    ///
    /// # Returns
    ///
    /// * `Result<usize>` - Number of payload bytes accepted
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The payload exceeds the configured maximum
    /// - A frame is already in flight (`WriterBusy`)
    /// - The pulse buffer cannot be allocated
    /// - The tick-side writer has been dropped
    pub fn try_submit(&self, payload: &[u8]) -> Result<usize> {
        self.claim_and_send(payload).map(|_| payload.len())
    }

    /// Submit a payload and wait until its last pulse has been emitted
    ///
    /// Waiting is a poll/sleep loop on the slot flag, paced from the frame's
    /// estimated air time (`pulses × us_per_div`) and bounded at
    /// four estimates plus 100ms.
    ///
    /// # Errors
    ///
    /// Same as [`try_submit`](Self::try_submit); a busy slot fails
    /// immediately rather than waiting for it to free up. Also returns:
    /// - `WriterClosed` if the tick side is dropped mid-frame (the slot is
    ///   released)
    /// - `SubmitTimeout` if the deadline passes (the frame stays in flight)
    pub async fn submit(&self, payload: &[u8]) -> Result<usize> {
        let num_pulses = self.claim_and_send(payload)?;

        let estimate = Duration::from_micros(num_pulses as u64 * self.settings.us_per_div);
        let poll = (estimate / self.settings.poll_divisor.max(1))
            .max(Duration::from_micros(self.settings.us_per_div));
        let timeout = estimate * SUBMIT_TIMEOUT_FACTOR + SUBMIT_TIMEOUT_MARGIN;
        let start = Instant::now();

        debug!("Waiting ~{:?} for {} pulses to drain", estimate, num_pulses);
        while !self.is_slot_free() {
            if self.streams.is_closed() {
                self.slot_free.store(true, Ordering::Release);
                return Err(AskLinkError::WriterClosed);
            }

            if start.elapsed() > timeout {
                return Err(AskLinkError::SubmitTimeout {
                    waited_ms: start.elapsed().as_millis() as u64,
                });
            }

            sleep(poll).await;
        }

        Ok(payload.len())
    }

    /// Whether a new frame can be submitted
    pub fn is_slot_free(&self) -> bool {
        self.slot_free.load(Ordering::Acquire)
    }

    /// Claim the slot, encode, and pass the stream to the tick side
    fn claim_and_send(&self, payload: &[u8]) -> Result<usize> {
        if payload.len() > self.settings.max_payload_len {
            return Err(AskLinkError::PayloadTooLarge {
                size: payload.len(),
                max: self.settings.max_payload_len,
            });
        }

        if self.streams.is_closed() {
            // Nothing will ever drain a frame claimed before the close
            self.slot_free.store(true, Ordering::Release);
            return Err(AskLinkError::WriterClosed);
        }

        if self
            .slot_free
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(AskLinkError::WriterBusy);
        }

        let pulses = match encode_payload(payload) {
            Ok(pulses) => pulses,
            Err(e) => {
                self.slot_free.store(true, Ordering::Release);
                return Err(e);
            }
        };
        let num_pulses = pulses.len();

        if self.streams.send(pulses).is_err() {
            self.slot_free.store(true, Ordering::Release);
            return Err(AskLinkError::WriterClosed);
        }

        debug!("Queued {}-byte frame as {} pulses", payload.len(), num_pulses);
        Ok(num_pulses)
    }
}

/// Pulse buffer being drained
#[derive(Debug)]
struct PulseStream {
    pulses: Vec<bool>,
    cursor: usize,
}

/// Tick side of the writer
///
/// [`on_tick`](Self::on_tick) never blocks: it only touches the atomic slot
/// flag and a non-blocking channel receive.
#[derive(Debug)]
pub struct FrameWriter<P> {
    sink: P,
    slot_free: Arc<AtomicBool>,
    incoming: mpsc::UnboundedReceiver<Vec<bool>>,
    active: Option<PulseStream>,
}

impl<P: PulseSink> FrameWriter<P> {
    /// Emit the next pulse, if a frame is in flight
    pub fn on_tick(&mut self) {
        if self.active.is_none() {
            match self.incoming.try_recv() {
                Ok(pulses) => self.active = Some(PulseStream { pulses, cursor: 0 }),
                Err(_) => return,
            }
        }

        let Some(stream) = self.active.as_mut() else {
            return;
        };

        if let Some(&pulse) = stream.pulses.get(stream.cursor) {
            self.sink.write_pulse(pulse);
            stream.cursor += 1;
        }

        if stream.cursor >= stream.pulses.len() {
            let sent = stream.pulses.len();
            // Drop the buffer before the slot is released
            self.active = None;
            self.slot_free.store(true, Ordering::Release);
            info!("Frame sent ({} pulses)", sent);
        }
    }

    /// Whether a frame is currently being emitted
    pub fn is_sending(&self) -> bool {
        self.active.is_some()
    }

    /// Borrow the pulse sink
    pub fn sink(&self) -> &P {
        &self.sink
    }
}
