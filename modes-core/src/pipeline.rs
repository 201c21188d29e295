//! Multi-threaded decode pipeline.
//!
//! Raw lines go into one bounded queue, a fixed pool of worker threads
//! decodes them, and results come out of two bounded queues: frames and
//! failures. Producers block while the input queue is full.
//!
//! Shutdown closes the input; workers finish whatever is still queued and
//! exit, and the output queues disconnect once the last worker is gone.
//! Output receivers may be dropped at any time, results are then discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::crc::ChecksumPolicy;
use crate::decode::decode_with_policy;
use crate::frame::Frame;
use crate::types::DecodeError;

/// One line as read from a source.
#[derive(Debug, Clone)]
pub struct RawLine {
    pub line: String,
    pub received_at: DateTime<Utc>,
}

impl RawLine {
    pub fn new(line: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        RawLine {
            line: line.into(),
            received_at,
        }
    }
}

/// A line that did not decode, with the reason.
#[derive(Debug, Clone)]
pub struct DecodeFailure {
    pub line: String,
    pub error: DecodeError,
}

/// Running totals, shared by all workers.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub lines: AtomicU64,
    pub frames: AtomicU64,
    pub errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineCounts {
    pub lines: u64,
    pub frames: u64,
    pub errors: u64,
}

impl PipelineStats {
    pub fn counts(&self) -> PipelineCounts {
        PipelineCounts {
            lines: self.lines.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Receiving ends of the pipeline.
pub struct PipelineOutput {
    pub frames: Receiver<Frame>,
    pub errors: Receiver<DecodeFailure>,
}

pub struct DecodePipeline {
    input: Option<Sender<RawLine>>,
    workers: Vec<JoinHandle<()>>,
    stats: Arc<PipelineStats>,
}

impl DecodePipeline {
    /// Start `workers` decoder threads. Every queue holds at most `capacity`
    /// items. Both values are raised to at least 1.
    pub fn spawn(
        workers: usize,
        capacity: usize,
        policy: ChecksumPolicy,
    ) -> std::io::Result<(Self, PipelineOutput)> {
        let capacity = capacity.max(1);
        let (input_tx, input_rx) = bounded::<RawLine>(capacity);
        let (frame_tx, frame_rx) = bounded::<Frame>(capacity);
        let (error_tx, error_rx) = bounded::<DecodeFailure>(capacity);
        let stats = Arc::new(PipelineStats::default());

        let handles = (0..workers.max(1))
            .map(|n| {
                let input = input_rx.clone();
                let frames = frame_tx.clone();
                let errors = error_tx.clone();
                let stats = Arc::clone(&stats);
                thread::Builder::new()
                    .name(format!("decode-{n}"))
                    .spawn(move || run_worker(input, frames, errors, stats, policy))
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        debug!(workers = handles.len(), capacity, ?policy, "decode pipeline started");

        let pipeline = DecodePipeline {
            input: Some(input_tx),
            workers: handles,
            stats,
        };
        let output = PipelineOutput {
            frames: frame_rx,
            errors: error_rx,
        };
        Ok((pipeline, output))
    }

    /// Queue a line, blocking while the queue is full. Returns `false` once
    /// the pipeline has been shut down.
    pub fn submit(&self, line: RawLine) -> bool {
        match &self.input {
            Some(tx) => tx.send(line).is_ok(),
            None => false,
        }
    }

    /// Extra producer handle. The input stays open until every clone is
    /// dropped as well.
    pub fn sender(&self) -> Option<Sender<RawLine>> {
        self.input.clone()
    }

    pub fn stats(&self) -> PipelineCounts {
        self.stats.counts()
    }

    /// Close the input, let the workers drain the queue, and wait for them.
    ///
    /// Outputs must be consumed (or dropped) meanwhile, otherwise workers
    /// stay blocked on a full output queue.
    pub fn shutdown(mut self) -> PipelineCounts {
        self.input = None;
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("decode worker panicked");
            }
        }
        self.stats.counts()
    }
}

fn run_worker(
    input: Receiver<RawLine>,
    frames: Sender<Frame>,
    errors: Sender<DecodeFailure>,
    stats: Arc<PipelineStats>,
    policy: ChecksumPolicy,
) {
    for raw in input.iter() {
        stats.lines.fetch_add(1, Ordering::Relaxed);
        match decode_with_policy(&raw.line, raw.received_at, policy) {
            Ok(frame) => {
                stats.frames.fetch_add(1, Ordering::Relaxed);
                trace!(df = frame.downlink_format, raw = %frame.raw, "decoded");
                // receiver gone: result discarded
                let _ = frames.send(frame);
            }
            Err(error) => {
                stats.errors.fetch_add(1, Ordering::Relaxed);
                debug!(line = %raw.line, %error, "line rejected");
                let _ = errors.send(DecodeFailure {
                    line: raw.line,
                    error,
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
