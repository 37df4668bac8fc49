//! Wires the coordinator/reader, segmenter, and emitter together and
//! drives one end-to-end run of the tool.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use crate::coordinator::DualPileupCoordinator;
use crate::emitter::{EmitterConfig, SegmentEmitter};
use crate::errs::{CnError, CnResult};
use crate::pileup::parse_mpileup_row;
use crate::segmenter::{CopyNumberSegmenter, SegmenterConfig};

/// Summary counters logged at the end of a run, mirroring the original's
/// closing stderr report.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub tumor_positions: u64,
    pub shared_positions: u64,
    pub compared_positions: u64,
    pub raw_segments: u64,
    pub good_segments: u64,
}

/// A regular file is always "ready": this mirrors the original's
/// `SmartFileReader.ready()` override, which unconditionally returns
/// `true` because the JDK's own `ready()` doesn't behave correctly for
/// plain `FileReader`s. The only thing worth checking is that the file
/// can still be opened; an empty or not-yet-flushed file is legitimate
/// input, not a readiness failure.
fn path_is_ready(path: &Path) -> bool {
    File::open(path).is_ok()
}

/// Stdin readiness genuinely means "is there data to read yet without
/// blocking," matching `InputStreamReader.ready()` in the original's
/// piped-input branch (`getInfile`). Probed on a background thread with a
/// short timeout so a silent pipe doesn't hang the poll itself.
fn stdin_is_ready() -> bool {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut lock = stdin.lock();
        let ready = lock.fill_buf().map(|b| !b.is_empty()).unwrap_or(false);
        let _ = tx.send(ready);
    });
    rx.recv_timeout(Duration::from_millis(200)).unwrap_or(false)
}

/// Polls `is_ready` for readiness, sleeping `interval` between attempts, up
/// to `max_attempts` times, matching the original's bounded-sleep
/// readiness protocol (100 attempts for single-stream mode, 4 for the
/// two-file coordinator).
pub fn wait_for_readiness(
    is_ready: impl Fn() -> bool,
    max_attempts: u32,
    interval: Duration,
) -> CnResult<()> {
    for attempt in 0..=max_attempts {
        if is_ready() {
            return Ok(());
        }
        if attempt == max_attempts {
            break;
        }
        tracing::debug!(attempt, "input stream not yet ready, sleeping");
        std::thread::sleep(interval);
    }
    Err(CnError::InputNotReady)
}

pub struct DriverConfig {
    pub segmenter: SegmenterConfig,
    pub emitter: EmitterConfig,
    pub verbose: bool,
    pub natural_sort: bool,
}

/// Runs the dual-pileup (two separate files) mode end to end.
pub fn run_dual_pileup<W: std::io::Write>(
    normal_path: &Path,
    tumor_path: &Path,
    out: W,
    config: &DriverConfig,
) -> CnResult<RunSummary> {
    wait_for_readiness(
        || path_is_ready(normal_path) && path_is_ready(tumor_path),
        4,
        Duration::from_secs(5),
    )?;

    let mut segmenter = CopyNumberSegmenter::new(config.segmenter);
    let mut emitter = SegmentEmitter::new(out, config.emitter)?;
    let mut summary = RunSummary::default();

    let coordinator = DualPileupCoordinator::new(config.natural_sort);
    let coord_stats = coordinator.run(normal_path, tumor_path, |matched| {
        if matched.normal_raw_depth >= config.segmenter.min_coverage
            && !matched.normal_quals.is_empty()
        {
            summary.compared_positions += 1;
        }
        if let Some(closed) = segmenter.process(matched) {
            summary.raw_segments += 1;
            if emitter.emit(&closed)? {
                summary.good_segments += 1;
            }
        }
        Ok(())
    })?;

    summary.tumor_positions = coord_stats.tumor_positions;
    summary.shared_positions = coord_stats.shared_positions;

    if let Some(closed) = segmenter.finish() {
        summary.raw_segments += 1;
        if emitter.emit(&closed)? {
            summary.good_segments += 1;
        }
    }
    emitter.flush()?;

    tracing::info!(
        tumor_positions = summary.tumor_positions,
        shared_positions = summary.shared_positions,
        compared_positions = summary.compared_positions,
        raw_segments = summary.raw_segments,
        good_segments = summary.good_segments,
        "copy-number segmentation complete"
    );

    Ok(summary)
}

/// Runs the merged-mpileup (single stream) mode end to end.
pub fn run_mpileup<R: Read, W: std::io::Write>(
    mpileup_path: Option<&Path>,
    reader: R,
    out: W,
    config: &DriverConfig,
) -> CnResult<RunSummary> {
    match mpileup_path {
        Some(path) => {
            wait_for_readiness(|| path_is_ready(path), 100, Duration::from_secs(5))?;
        }
        None => {
            wait_for_readiness(stdin_is_ready, 100, Duration::from_secs(5))?;
        }
    }

    let mut segmenter = CopyNumberSegmenter::new(config.segmenter);
    let mut emitter = SegmentEmitter::new(out, config.emitter)?;
    let mut summary = RunSummary::default();

    let mut reader = BufReader::new(reader);
    let mut line_no = 0usize;
    let mut parse_errors = 0usize;
    let mut buf = String::new();

    loop {
        buf.clear();
        let n = reader.read_line(&mut buf)?;
        if n == 0 {
            break;
        }
        line_no += 1;
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        summary.tumor_positions += 1;

        match parse_mpileup_row(&buf, line_no, config.verbose) {
            Ok(Some(matched)) => {
                summary.shared_positions += 1;
                if matched.normal_raw_depth >= config.segmenter.min_coverage
                    && !matched.normal_quals.is_empty()
                {
                    summary.compared_positions += 1;
                }
                if let Some(closed) = segmenter.process(&matched) {
                    summary.raw_segments += 1;
                    if emitter.emit(&closed)? {
                        summary.good_segments += 1;
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                parse_errors += 1;
                tracing::warn!(line_no, error = %e, "skipping malformed mpileup row");
                if parse_errors >= 5 {
                    return Err(CnError::TooManyLineParseErrors {
                        count: parse_errors,
                    });
                }
            }
        }
    }

    if let Some(closed) = segmenter.finish() {
        summary.raw_segments += 1;
        if emitter.emit(&closed)? {
            summary.good_segments += 1;
        }
    }
    emitter.flush()?;

    tracing::info!(
        tumor_positions = summary.tumor_positions,
        shared_positions = summary.shared_positions,
        compared_positions = summary.compared_positions,
        raw_segments = summary.raw_segments,
        good_segments = summary.good_segments,
        "copy-number segmentation complete"
    );

    Ok(summary)
}
