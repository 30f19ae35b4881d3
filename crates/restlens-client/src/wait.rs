//! Waiting for an evaluation to finish.
//!
//! Two transports share one contract: return [`WaitOutcome::Completed`] once
//! the server reports a terminal state, or [`WaitOutcome::TimedOut`] once the
//! deadline passes. The stream transport reads `data: <json>` lines from a
//! long-lived response; the poll transport re-fetches the specification
//! status on a fixed interval.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{Error, Result};
use crate::types::{EvaluationEvent, SpecificationStatus};

/// Default time budget for a wait.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Progress cadence while streaming.
pub const STREAM_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Interval between status requests when polling.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How the wait observes the evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Stream,
    Poll,
}

#[derive(Debug, Clone)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub transport: Transport,
    pub tick_interval: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WAIT_TIMEOUT,
            transport: Transport::Stream,
            tick_interval: STREAM_TICK_INTERVAL,
            poll_interval: POLL_INTERVAL,
        }
    }
}

/// Result of a completion wait.
///
/// `Completed` does not say whether the evaluation succeeded; callers fetch
/// violations either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Completed,
    TimedOut,
}

/// Receives progress ticks on a fixed cadence while a wait is pending.
pub trait ProgressSink: Send + Sync {
    fn tick(&self);
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn tick(&self) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Line splitting
// ─────────────────────────────────────────────────────────────────────────────

/// Incremental splitter that turns arbitrary byte chunks into complete lines.
///
/// A trailing partial line is kept until the chunk that finishes it arrives,
/// so a JSON payload split across reads is decoded whole.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buffer: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completed, without terminators.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Bytes of the incomplete trailing line.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }
}

/// Decode one stream line. Anything that is not a `data:` line carrying a
/// JSON object yields `None`.
pub fn parse_event_line(line: &str) -> Option<EvaluationEvent> {
    let payload = line.strip_prefix("data:")?.trim_start();
    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::trace!(error = %e, "Skipping malformed stream line");
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stream transport
// ─────────────────────────────────────────────────────────────────────────────

/// A source of raw stream bytes.
#[async_trait]
pub trait EventSource: Send {
    /// Next chunk, or `None` at end of stream.
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;

    /// Abort the underlying connection.
    async fn close(&mut self);
}

/// [`EventSource`] over a streaming HTTP response.
pub struct HttpEventSource {
    response: Option<reqwest::Response>,
}

impl HttpEventSource {
    pub fn new(response: reqwest::Response) -> Self {
        Self {
            response: Some(response),
        }
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match self.response.as_mut() {
            Some(response) => Ok(response
                .chunk()
                .await
                .map_err(|e| Error::Stream(e.to_string()))?
                .map(|bytes| bytes.to_vec())),
            None => Ok(None),
        }
    }

    async fn close(&mut self) {
        if self.response.take().is_some() {
            tracing::debug!("Closed evaluation stream");
        }
    }
}

/// How a stream wait ended.
#[derive(Debug)]
pub enum StreamStep {
    Completed,
    TimedOut,
    /// The stream failed before a terminal event; the caller may poll.
    Broken(Error),
}

/// Read `source` until a terminal event, end of stream, an error or the
/// deadline, ticking `progress` every `tick_every` meanwhile.
///
/// The source is closed exactly once before returning.
pub async fn wait_on_source<S>(
    source: &mut S,
    deadline: Instant,
    tick_every: Duration,
    progress: &dyn ProgressSink,
) -> StreamStep
where
    S: EventSource + ?Sized,
{
    let mut splitter = LineSplitter::new();
    let mut ticker = tokio::time::interval_at(Instant::now() + tick_every, tick_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let expired = tokio::time::sleep_until(deadline);
    tokio::pin!(expired);

    let step = loop {
        tokio::select! {
            _ = &mut expired => break StreamStep::TimedOut,
            _ = ticker.tick() => progress.tick(),
            chunk = source.next_chunk() => match chunk {
                Ok(Some(bytes)) => {
                    let terminal = splitter
                        .push(&bytes)
                        .iter()
                        .filter_map(|line| parse_event_line(line))
                        .any(|event| event.is_terminal());
                    if terminal {
                        break StreamStep::Completed;
                    }
                }
                Ok(None) => {
                    tracing::debug!("Evaluation stream ended");
                    break StreamStep::Completed;
                }
                Err(e) => break StreamStep::Broken(e),
            },
        }
    };

    source.close().await;
    step
}

// ─────────────────────────────────────────────────────────────────────────────
// Poll transport
// ─────────────────────────────────────────────────────────────────────────────

/// Something that can report a specification's current status.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self) -> Result<SpecificationStatus>;
}

/// Poll `source` every `interval` until it stops reporting `evaluating` or the
/// deadline passes.
pub async fn poll_until_done<P>(
    source: &P,
    deadline: Instant,
    interval: Duration,
    progress: &dyn ProgressSink,
) -> Result<WaitOutcome>
where
    P: StatusSource + ?Sized,
{
    loop {
        if Instant::now() >= deadline {
            return Ok(WaitOutcome::TimedOut);
        }

        let status = match tokio::time::timeout_at(deadline, source.fetch_status()).await {
            Ok(status) => status?,
            Err(_) => return Ok(WaitOutcome::TimedOut),
        };
        progress.tick();

        if !status.is_pending() {
            tracing::debug!(status = ?status.evaluation_status, "Evaluation finished");
            return Ok(WaitOutcome::Completed);
        }

        tokio::time::sleep_until(std::cmp::min(Instant::now() + interval, deadline)).await;
    }
}
