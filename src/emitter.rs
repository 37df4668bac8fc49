//! Formats and writes closed copy-number segments.

use std::io::{self, BufWriter, Write};

use crate::segmenter::RunningSegment;

#[derive(Debug, Clone, Copy)]
pub struct EmitterConfig {
    pub min_coverage: u64,
    pub data_ratio: f64,
}

/// Writes the `.copynumber` output file: one header row, then one row
/// per emitted segment. Column formatting (one decimal for depths and GC
/// content, three decimals for the log2 ratio) mirrors the original's
/// `DecimalFormat("#0.0")` / `DecimalFormat("#0.000")` columns.
pub struct SegmentEmitter<W: Write> {
    writer: BufWriter<W>,
    config: EmitterConfig,
}

const HEADER: &str =
    "chrom\tchr_start\tchr_stop\tnum_positions\tnormal_depth\ttumor_depth\tlog2_ratio\tgc_content\n";

impl<W: Write> SegmentEmitter<W> {
    pub fn new(writer: W, config: EmitterConfig) -> io::Result<Self> {
        let mut writer = BufWriter::new(writer);
        writer.write_all(HEADER.as_bytes())?;
        Ok(Self { writer, config })
    }

    /// Writes `segment` if it clears the minimum-coverage gate. Returns
    /// whether a row was written, so the driver can keep an accurate
    /// count of "good" vs. "raw" segments.
    pub fn emit(&mut self, segment: &RunningSegment) -> io::Result<bool> {
        let positions = segment.positions as f64;
        let avg_normal = segment.sum_normal as f64 / positions;
        let avg_tumor = segment.sum_tumor as f64 / positions;
        let adjusted_tumor = self.config.data_ratio * avg_tumor;
        let gc_content = segment.gc_positions as f64 / positions * 100.0;

        if !(avg_normal >= self.config.min_coverage as f64
            || avg_tumor >= self.config.min_coverage as f64)
        {
            return Ok(false);
        }

        let log2_ratio = if avg_normal >= 0.01 && avg_tumor >= 0.01 {
            (adjusted_tumor / avg_normal).log2()
        } else if avg_tumor >= 0.01 {
            2.0
        } else {
            -2.0
        };

        writeln!(
            self.writer,
            "{}\t{}\t{}\t{}\t{:.1}\t{:.1}\t{:.3}\t{:.1}",
            segment.chrom,
            segment.start,
            segment.stop,
            segment.positions,
            avg_normal,
            avg_tumor,
            log2_ratio,
            gc_content,
        )?;
        Ok(true)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
