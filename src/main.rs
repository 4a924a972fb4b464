//! # ASK Link
//!
//! Loopback demo for the single-wire ASK pulse link.
//!
//! A writer and a reader share one in-process line. One periodic callback at
//! the configured pulse rate emits a pulse and then samples it, so the two
//! ends stay in lock step, and every datagram the reader reassembles is
//! logged.

use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, Duration};
use tracing::{error, info, warn};

use ask_link::ask::encoder::pulse_count;
use ask_link::ask::reader::FrameReader;
use ask_link::ask::validation::{DetachedValidation, FrameHandoff, InlineValidation};
use ask_link::ask::writer::{self, FrameWriter, WriterSettings};
use ask_link::config::Config;
use ask_link::error::FrameError;
use ask_link::link::{DatagramSink, LoopbackLine, Repeater};
use ask_link::telemetry::{CountingSink, LinkStats};

/// How long to wait for queued validations after the reader stops
const VALIDATION_DRAIN_TIMEOUT_MS: u64 = 1000;

/// Logs every reassembled datagram
#[derive(Debug, Default)]
struct LoggingSink {
    received: u64,
}

impl DatagramSink for LoggingSink {
    fn on_success(&mut self, payload: Bytes) {
        self.received += 1;
        info!(
            "Received datagram #{} ({} bytes): {}",
            self.received,
            payload.len(),
            String::from_utf8_lossy(&payload)
        );
    }

    fn on_failure(&mut self, reason: FrameError) {
        warn!("Discarded frame: {}", reason);
    }
}

/// Emit one pulse onto `line` and sample it back, once per pulse period
fn spawn_link<H>(
    mut frame_writer: FrameWriter<LoopbackLine>,
    mut reader: FrameReader<H>,
    mut line: LoopbackLine,
    us_per_div: u64,
) -> Repeater
where
    H: FrameHandoff + Send + 'static,
{
    Repeater::register(us_per_div, move || {
        frame_writer.on_tick();
        reader.poll(&mut line);
    })
}

/// Main entry point for the ASK link demo
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up non-blocking logging to stderr
///    - Load configuration (first argument, or built-in defaults)
///    - Register one tick callback driving writer then reader on a loopback line
///
/// 2. **Main Loop**
///    - Submit `demo.frames` copies of `demo.message`, waiting for each and
///      releasing the line afterwards
///    - Report link statistics every `telemetry.report_interval_ms`
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Stop the tick callback
///    - Drain pending validations
///    - Log final statistics as JSON
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let (log_writer, _log_guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(log_writer)
        .init();

    info!("ASK Link v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => Config::default(),
    };

    let line = LoopbackLine::new();
    let stats = Arc::new(LinkStats::new());
    let sink = CountingSink::new(LoggingSink::default(), stats.clone());
    let us_per_div = config.link.us_per_div;
    let max_payload_len = config.link.max_payload_len;

    let (handle, frame_writer) = writer::channel(line.clone(), WriterSettings::from(&config));

    let (link_tick, validation_task): (Repeater, Option<JoinHandle<_>>) =
        if config.reader.detached_validation {
            let (handoff, task) = DetachedValidation::spawn(sink);
            let reader = FrameReader::with_max_payload_len(handoff, max_payload_len);
            let tick = spawn_link(frame_writer, reader, line.clone(), us_per_div);
            (tick, Some(task))
        } else {
            let handoff = InlineValidation::new(sink);
            let reader = FrameReader::with_max_payload_len(handoff, max_payload_len);
            let tick = spawn_link(frame_writer, reader, line.clone(), us_per_div);
            (tick, None)
        };

    let message = config.demo.message.as_bytes();
    info!(
        "Sending {} frames of {} bytes ({} pulses each at {}us)",
        config.demo.frames,
        message.len(),
        pulse_count(message.len()),
        us_per_div
    );
    info!("Press Ctrl+C to exit");

    let demo = async {
        for frame in 1..=config.demo.frames {
            handle.submit(message).await?;
            line.set(false);
            stats.record_submitted();
            info!("Sent frame {}/{}", frame, config.demo.frames);
            sleep(Duration::from_millis(config.demo.inter_frame_gap_ms)).await;
        }
        Ok::<(), ask_link::error::AskLinkError>(())
    };
    tokio::pin!(demo);

    let mut report = interval(Duration::from_millis(config.telemetry.report_interval_ms));

    loop {
        tokio::select! {
            result = &mut demo => {
                if let Err(e) = result {
                    error!("Demo stopped: {}", e);
                }
                break;
            }

            _ = report.tick(), if config.telemetry.enabled => {
                match stats.snapshot().to_json_line() {
                    Ok(line) => info!("Link stats: {}", line),
                    Err(e) => warn!("Failed to render link stats: {}", e),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    link_tick.stop();

    if let Some(task) = validation_task {
        match timeout(Duration::from_millis(VALIDATION_DRAIN_TIMEOUT_MS), task).await {
            Ok(Ok(sink)) => info!(
                "Validation task drained after {} datagrams",
                sink.into_inner().received
            ),
            Ok(Err(e)) => warn!("Validation task failed: {}", e),
            Err(_) => warn!("Timed out waiting for pending validations"),
        }
    }

    let summary = stats.snapshot();
    info!("Final link stats: {}", summary.to_json_line()?);
    info!(
        "Delivered {}/{} frames, {} discarded",
        summary.delivered,
        summary.submitted,
        summary.discarded()
    );

    Ok(())
}
