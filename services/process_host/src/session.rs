//! Request/response loop over line-delimited JSON

use ao_actors::{Outcome, Process};
use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use tracing::debug;

/// Counts for one session, logged when input is exhausted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub lines_read: u64,
    /// Blank lines, ignored without a response
    pub skipped: u64,
    pub responses: u64,
    /// Responses carrying a runtime-produced `Error`
    pub errors: u64,
}

/// Feed every non-empty line of `reader` to `process`, writing one response
/// line per message to `writer`
///
/// Lines are handed over as raw bytes, so a line that is not valid UTF-8 gets
/// an `Error` response like any other malformed message. Stops at the first
/// infrastructure failure (I/O, or a process that is not ready). Application
/// errors and handler faults are ordinary responses.
pub fn run_session<R, W>(process: &mut Process, mut reader: R, mut writer: W) -> Result<SessionSummary>
where
    R: BufRead,
    W: Write,
{
    let mut summary = SessionSummary::default();
    let mut line = Vec::new();
    let mut line_number = 0u64;

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .with_context(|| format!("Failed to read input line {}", line_number + 1))?;
        if read == 0 {
            break;
        }
        line_number += 1;
        summary.lines_read += 1;

        let raw = line.trim_ascii();
        if raw.is_empty() {
            summary.skipped += 1;
            continue;
        }

        let dispatched = process
            .dispatch_bytes(raw)
            .with_context(|| format!("Dispatch failed on input line {}", line_number))?;

        writeln!(writer, "{}", dispatched.wire).context("Failed to write response")?;
        summary.responses += 1;
        if dispatched.outcome != Outcome::Success {
            summary.errors += 1;
        }
        debug!(line = line_number, outcome = ?dispatched.outcome, "Response written");
    }

    writer.flush().context("Failed to flush responses")?;
    Ok(summary)
}
