//! # Periodic Scheduler
//!
//! Stands in for a hardware timer interrupt: invokes a callback once per
//! fixed interval on a tokio task. The callback must be bounded-time and
//! must not block, exactly as an interrupt handler would.

use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::debug;

/// A registered periodic callback
///
/// The callback stops when the repeater is stopped or dropped.
#[derive(Debug)]
pub struct Repeater {
    handle: JoinHandle<()>,
    interval_us: u64,
}

impl Repeater {
    /// Register `callback` to run every `interval_us` microseconds
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ask_link::link::scheduler::Repeater;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let mut ticks = 0u64;
    ///     let repeater = Repeater::register(1000, move || ticks += 1);
    ///     tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    ///     repeater.stop();
    /// }
    /// ```
    pub fn register<F>(interval_us: u64, mut callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let period = Duration::from_micros(interval_us.max(1));

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            // Late ticks are replayed so no pulse period is lost
            ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

            loop {
                ticker.tick().await;
                callback();
            }
        });

        debug!("Registered periodic callback every {}us", interval_us);
        Self { handle, interval_us }
    }

    /// Period of this repeater in microseconds
    pub fn interval_us(&self) -> u64 {
        self.interval_us
    }

    /// Whether the callback task has ended
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop invoking the callback
    pub fn stop(self) {
        // Drop aborts the task
    }
}

impl Drop for Repeater {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ask::reader::FrameReader;
    use crate::ask::validation::InlineValidation;
    use crate::ask::writer::{channel, WriterSettings};
    use crate::link::port_trait::mocks::RecordingDatagramSink;
    use crate::link::port_trait::LoopbackLine;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_repeater_invokes_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();

        let repeater = Repeater::register(1000, move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(repeater.interval_us(), 1000);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!repeater.is_finished());
        repeater.stop();

        assert!(count.load(Ordering::Relaxed) > 0, "callback never ran");
    }

    #[tokio::test]
    async fn test_repeater_stops_on_drop() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();

        let repeater = Repeater::register(1000, move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        drop(repeater);

        // Let the abort land, then make sure the count is frozen
        tokio::time::sleep(Duration::from_millis(5)).await;
        let stopped_at = count.load(Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::Relaxed), stopped_at);
    }

    #[tokio::test]
    async fn test_loopback_link_delivers_every_frame() {
        let line = LoopbackLine::new();
        let sink = RecordingDatagramSink::new();
        let settings = WriterSettings {
            us_per_div: 100,
            poll_divisor: 10,
            max_payload_len: 64,
        };

        let (handle, mut frame_writer) = channel(line.clone(), settings);
        let mut reader = FrameReader::new(InlineValidation::new(sink.clone()));
        let mut rx = line.clone();

        let repeater = Repeater::register(settings.us_per_div, move || {
            frame_writer.on_tick();
            reader.poll(&mut rx);
        });

        for _ in 0..3 {
            assert_ok!(handle.submit(b"hello").await);
            line.set(false);
        }
        repeater.stop();

        assert_eq!(
            sink.get_outcomes(),
            vec![
                Ok(Bytes::from_static(b"hello")),
                Ok(Bytes::from_static(b"hello")),
                Ok(Bytes::from_static(b"hello")),
            ]
        );
    }
}
