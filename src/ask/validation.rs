//! # Frame Validation
//!
//! Checksum verification and delivery, kept off the pulse path.
//!
//! When the reader finishes a frame it moves the [`Frame`] (and its payload
//! buffer) into a [`ReaderEvent`] and passes it to a [`FrameHandoff`]. From
//! that point the reader holds no reference to the buffer; the handoff side
//! is the only party that delivers or drops it.
//!
//! Two handoffs are provided:
//! - [`InlineValidation`] verifies and delivers immediately, on the caller's
//!   thread
//! - [`DetachedValidation`] moves each event over a channel to a tokio task,
//!   so a slow sink never delays the next pulse tick

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::checksum;
use super::protocol::Frame;
use crate::error::FrameError;
use crate::link::port_trait::DatagramSink;

/// Terminal event of one reader cycle
#[derive(Debug)]
pub enum ReaderEvent {
    /// All fields were read; the checksum has not been checked yet
    Assembled(Frame),
    /// The frame was abandoned mid-stream
    Aborted(FrameError),
}

/// Final disposition of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Payload handed to the sink
    Delivered,
    /// Failure reported to the sink
    Discarded(FrameError),
}

/// Receives finished or aborted frames from the reader
///
/// Called from the pulse path, so implementations must not block.
pub trait FrameHandoff {
    /// Take ownership of a reader event
    fn hand_off(&mut self, event: ReaderEvent);
}

/// Verify a reader event and report it to the sink
///
/// Calls exactly one of [`DatagramSink::on_success`] or
/// [`DatagramSink::on_failure`].
///
/// # Arguments
///
/// * `event` - Event produced by the reader
/// * `sink` - Datagram receiver
///
/// # Returns
///
/// * `Verdict` - Whether the payload was delivered
pub fn validate_and_deliver<S>(event: ReaderEvent, sink: &mut S) -> Verdict
where
    S: DatagramSink + ?Sized,
{
    let frame = match event {
        ReaderEvent::Assembled(frame) => frame,
        ReaderEvent::Aborted(reason) => {
            sink.on_failure(reason);
            return Verdict::Discarded(reason);
        }
    };

    if checksum::verify(&frame) {
        debug!("FCS 0x{:02X} ok, delivering {} bytes", frame.checksum, frame.length);
        sink.on_success(Bytes::from(frame.into_payload()));
        Verdict::Delivered
    } else {
        let reason = FrameError::ChecksumMismatch {
            computed: checksum::compute(frame.preamble, frame.length, &frame.payload),
            received: frame.checksum,
        };
        warn!("Discarding frame: {}", reason);
        // Payload is dropped here, before the sink hears about the failure
        drop(frame);
        sink.on_failure(reason);
        Verdict::Discarded(reason)
    }
}

/// Validate on the reader's own thread
#[derive(Debug)]
pub struct InlineValidation<S> {
    sink: S,
}

impl<S: DatagramSink> InlineValidation<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Recover the wrapped sink
    pub fn into_inner(self) -> S {
        self.sink
    }
}

impl<S: DatagramSink> FrameHandoff for InlineValidation<S> {
    fn hand_off(&mut self, event: ReaderEvent) {
        validate_and_deliver(event, &mut self.sink);
    }
}

/// Validate on a separately scheduled tokio task
///
/// Sending never blocks. Dropping the handoff (usually by dropping the
/// reader) closes the channel; the task then drains any queued events and
/// returns the sink.
#[derive(Debug, Clone)]
pub struct DetachedValidation {
    events: mpsc::UnboundedSender<ReaderEvent>,
}

impl DetachedValidation {
    /// Spawn the validation task
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Returns
    ///
    /// * `(DetachedValidation, JoinHandle<S>)` - Handoff for the reader, and
    ///   the task, which yields the sink once the handoff is dropped
    pub fn spawn<S>(mut sink: S) -> (Self, JoinHandle<S>)
    where
        S: DatagramSink + Send + 'static,
    {
        let (events, mut rx) = mpsc::unbounded_channel::<ReaderEvent>();

        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                validate_and_deliver(event, &mut sink);
            }
            debug!("Validation task finished");
            sink
        });

        (Self { events }, task)
    }
}

impl FrameHandoff for DetachedValidation {
    fn hand_off(&mut self, event: ReaderEvent) {
        if let Err(mpsc::error::SendError(event)) = self.events.send(event) {
            // Task is gone; the event (and any payload) is dropped here
            warn!("Validation task closed, dropping {:?}", event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ask::protocol::ReadStage;
    use crate::link::port_trait::mocks::RecordingDatagramSink;
    use crate::link::port_trait::MockDatagramSink;
    use mockall::predicate::eq;

    #[test]
    fn test_valid_frame_is_delivered() {
        let mut sink = MockDatagramSink::new();
        sink.expect_on_success()
            .with(eq(Bytes::from_static(b"AB")))
            .times(1)
            .return_const(());
        sink.expect_on_failure().times(0);

        let frame = Frame::new(b"AB".to_vec()).unwrap();
        let verdict = validate_and_deliver(ReaderEvent::Assembled(frame), &mut sink);
        assert_eq!(verdict, Verdict::Delivered);
    }

    #[test]
    fn test_checksum_mismatch_is_discarded() {
        let mut sink = MockDatagramSink::new();
        sink.expect_on_success().times(0);
        sink.expect_on_failure()
            .with(eq(FrameError::ChecksumMismatch { computed: 0x0C, received: 0x00 }))
            .times(1)
            .return_const(());

        let mut frame = Frame::new(b"AB".to_vec()).unwrap();
        frame.checksum = 0x00;

        let verdict = validate_and_deliver(ReaderEvent::Assembled(frame), &mut sink);
        assert!(matches!(verdict, Verdict::Discarded(FrameError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_aborted_frame_reports_failure() {
        let reason = FrameError::InvalidSymbol { code: 0, stage: ReadStage::LengthSync };
        let mut sink = RecordingDatagramSink::new();

        let verdict = validate_and_deliver(ReaderEvent::Aborted(reason), &mut sink);
        assert_eq!(verdict, Verdict::Discarded(reason));
        assert_eq!(sink.get_outcomes(), vec![Err(reason)]);
    }

    #[test]
    fn test_inline_validation() {
        let mut handoff = InlineValidation::new(RecordingDatagramSink::new());
        handoff.hand_off(ReaderEvent::Assembled(Frame::new(b"hi".to_vec()).unwrap()));

        let outcomes = handoff.into_inner().get_outcomes();
        assert_eq!(outcomes, vec![Ok(Bytes::from_static(b"hi"))]);
    }

    #[tokio::test]
    async fn test_detached_validation_preserves_order() {
        let (mut handoff, task) = DetachedValidation::spawn(RecordingDatagramSink::new());

        handoff.hand_off(ReaderEvent::Assembled(Frame::new(b"one".to_vec()).unwrap()));
        handoff.hand_off(ReaderEvent::Aborted(FrameError::InvalidLength(-1)));
        handoff.hand_off(ReaderEvent::Assembled(Frame::new(b"two".to_vec()).unwrap()));
        drop(handoff);

        let sink = tokio_test::assert_ok!(task.await);
        assert_eq!(sink.get_outcomes(), vec![
            Ok(Bytes::from_static(b"one")),
            Err(FrameError::InvalidLength(-1)),
            Ok(Bytes::from_static(b"two")),
        ]);
    }

    #[tokio::test]
    async fn test_detached_validation_after_task_exit() {
        let (mut handoff, task) = DetachedValidation::spawn(RecordingDatagramSink::new());
        task.abort();
        let _ = task.await;

        // Must not panic or block
        handoff.hand_off(ReaderEvent::Assembled(Frame::new(b"late".to_vec()).unwrap()));
    }
}
