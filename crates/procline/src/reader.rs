//! Timeout-bounded line reading from the child's stdout
//!
//! The read loop waits for readability up to a deadline, pulls bytes in
//! fixed-size chunks and splits them on `'\n'`. A partial line pending when
//! the deadline elapses or the pipe closes is flushed as a final entry.

use std::io;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::ChildStdout;
use tokio::time::{timeout_at, Instant};
use tracing::trace;

use crate::error::{Result, SupervisorError};
use crate::mirror::MirrorHub;

/// Chunk size for a single read from the stdout pipe. Larger bursts are
/// simply split across more loop iterations.
const READ_CHUNK: usize = 1024;

/// Bound substituted when a read is requested with a zero timeout.
///
/// A zero timeout means "a long bounded wait", never "wait forever": a hung
/// child must not hang its supervisor.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// How a read loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A line starting with the requested prefix arrived
    Matched,
    /// The timeout elapsed with no data and no match (not an error)
    TimedOut,
    /// The child closed its stdout (not an error)
    Closed,
}

impl ReadOutcome {
    /// Whether this outcome counts as success for the caller.
    ///
    /// With no prefix to wait for, a clean timeout or close is success —
    /// there was nothing specific to wait for. With a prefix, only a match is.
    pub fn is_success(self, had_prefix: bool) -> bool {
        match self {
            Self::Matched => true,
            Self::TimedOut | Self::Closed => !had_prefix,
        }
    }
}

/// Lines collected by one read call, plus how the loop ended
#[derive(Debug)]
pub struct ReadResult {
    /// Completed lines in arrival order, delimiters stripped; the last entry
    /// may be an unterminated tail flushed at timeout or EOF
    pub lines: Vec<String>,
    /// Loop termination cause
    pub outcome: ReadOutcome,
}

/// Splits a byte stream into `'\n'`-delimited lines.
///
/// State lives for one read invocation only: a pending tail is either
/// completed by a later chunk of the same call or flushed at timeout/EOF.
#[derive(Debug, Default)]
pub(crate) struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    /// Feed one chunk and return the lines it completed. Empty segments are
    /// dropped; an unterminated tail stays pending.
    pub(crate) fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut completed = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                if !self.pending.is_empty() {
                    completed.push(String::from_utf8_lossy(&self.pending).into_owned());
                    self.pending.clear();
                }
            } else {
                self.pending.push(byte);
            }
        }
        completed
    }

    /// Flush the unterminated tail, if any
    pub(crate) fn take_pending(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(tail)
    }
}

/// Core read loop shared by the plain and prefix-matching read calls.
///
/// `timeout` must already be the effective bound (zero substitution is the
/// caller's job). A prefix match stops the loop immediately; bytes still in
/// the pipe stay there for the next call.
pub(crate) async fn drain_lines(
    stdout: &mut ChildStdout,
    timeout: Duration,
    prefix: Option<&str>,
    mirror: &MirrorHub,
) -> Result<ReadResult> {
    let deadline = Instant::now() + timeout;
    let mut splitter = LineSplitter::default();
    let mut lines = Vec::new();
    let mut buf = [0u8; READ_CHUNK];

    let outcome = 'outer: loop {
        let n = match timeout_at(deadline, stdout.read(&mut buf)).await {
            Err(_) => {
                if let Some(tail) = splitter.take_pending() {
                    mirror.publish(&tail);
                    lines.push(tail);
                }
                break ReadOutcome::TimedOut;
            }
            Ok(Ok(0)) => {
                if let Some(tail) = splitter.take_pending() {
                    mirror.publish(&tail);
                    lines.push(tail);
                }
                break ReadOutcome::Closed;
            }
            Ok(Ok(n)) => n,
            Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
            Ok(Err(e)) => return Err(SupervisorError::ReadFailed(e)),
        };

        for line in splitter.push_chunk(&buf[..n]) {
            mirror.publish(&line);
            let matched = prefix.is_some_and(|p| line.starts_with(p));
            lines.push(line);
            if matched {
                break 'outer ReadOutcome::Matched;
            }
        }
    };

    trace!(?outcome, lines = lines.len(), "read loop finished");
    Ok(ReadResult { lines, outcome })
}
