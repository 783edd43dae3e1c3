//! Runs a configured pipeline over a line-oriented input stream.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::{Pipeline, ShutdownReport};
use crate::registry::Registry;
use crate::stage::Item;
use std::borrow::Cow;
use std::io::BufRead;
use tracing::{debug, error, info, warn};

/// Build, wire, stream `input` through, then drain and tear down.
///
/// Construction failures are returned before any input is read. Once the
/// pipeline is running it is always drained and torn down, even if reading
/// or feeding fails part way; the read error is returned afterwards.
pub fn run<R: BufRead>(
    config: &PipelineConfig,
    registry: &Registry,
    input: R,
) -> Result<ShutdownReport> {
    config.validate(registry)?;
    let mut pipeline = config.builder()?.build_with(registry)?;
    pipeline.wire();

    let fed = feed_lines(&pipeline, input);
    let report = shutdown(pipeline);

    let lines = fed?;
    info!(lines, "input finished");
    Ok(report)
}

/// Feed records until a terminator, end of input, or a failure.
///
/// Bytes that are not valid UTF-8 are replaced rather than ending the input.
fn feed_lines<R: BufRead>(pipeline: &Pipeline, mut input: R) -> Result<usize> {
    let mut fed = 0;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = decode_line(&buf);
        if Item::is_terminator(&line) {
            debug!("terminator record read");
            break;
        }
        if let Err(e) = pipeline.feed(line) {
            error!(error = %e, "failed to place record into the first stage");
            break;
        }
        fed += 1;
    }
    Ok(fed)
}

/// Strip the line ending and decode, replacing invalid sequences
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let line = String::from_utf8_lossy(raw);
    if matches!(line, Cow::Owned(_)) {
        warn!("input line is not valid UTF-8, replacing invalid bytes");
    }
    line.into_owned()
}

fn shutdown(pipeline: Pipeline) -> ShutdownReport {
    match pipeline.close() {
        Ok(()) => {
            if let Err(e) = pipeline.drain_and_wait() {
                error!(error = %e, "waiting for stages to drain failed");
            }
        }
        // Without the end marker the stages cannot drain; teardown closes them
        Err(e) => error!(error = %e, "failed to send end marker"),
    }

    let report = pipeline.teardown();
    for stage in &report.stages {
        debug!(stage = %stage.name, metrics = %stage.metrics, "stage metrics");
    }
    for err in &report.errors {
        warn!(error = %err, "shutdown error");
    }
    report
}
