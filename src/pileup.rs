//! Row-level parsing of samtools-style pileup and mpileup text.

use crate::errs::{CnError, CnResult};

/// One parsed row of a single-sample pileup stream (the shape produced by
/// `samtools pileup` or `samtools mpileup` against one BAM), whether in its
/// classic 6-7 column form or its extended consensus-calling 10-11 column
/// form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPileupRow {
    pub chrom: String,
    pub pos: u64,
    pub ref_base: char,
    pub depth: u64,
    pub quals: String,
}

/// Parses one line of a single-sample pileup stream.
///
/// Returns `Ok(None)` when the row should be treated as a gap: fewer than
/// two columns, or a column count that matches neither the classic nor the
/// extended layout. Returns `Err` only when a column that should hold an
/// integer fails to parse as one.
pub fn parse_single_sample_row(
    line: &str,
    line_no: usize,
) -> CnResult<Option<ParsedPileupRow>> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 2 {
        return Ok(None);
    }

    let (depth_idx, quals_idx) = match fields.len() {
        6..=7 => (3, 5),
        10..=11 => (7, 9),
        _ => return Ok(None),
    };

    let chrom = fields[0].to_string();
    let pos = fields[1].parse::<u64>().map_err(|_| CnError::LineParseError {
        line: line_no,
        reason: format!("invalid position {:?}", fields[1]),
    })?;
    let ref_base = fields
        .get(2)
        .and_then(|s| s.chars().next())
        .unwrap_or('N')
        .to_ascii_uppercase();
    let depth =
        fields[depth_idx].parse::<u64>().map_err(|_| CnError::LineParseError {
            line: line_no,
            reason: format!("invalid depth {:?}", fields[depth_idx]),
        })?;
    let quals = fields[quals_idx].to_string();

    Ok(Some(ParsedPileupRow { chrom, pos, ref_base, depth, quals }))
}

/// One parsed row out of a merged (two-sample) mpileup stream: a normal
/// and a tumor sample side by side in the same row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPosition {
    pub chrom: String,
    pub pos: u64,
    pub ref_base: char,
    pub normal_raw_depth: u64,
    pub normal_quals: String,
    pub tumor_raw_depth: u64,
    pub tumor_quals: String,
}

/// Parses one line of a merged normal+tumor mpileup stream:
/// `chrom pos ref depthN basesN qualsN depthT basesT qualsT`.
///
/// Rows with fewer than 8 columns are skipped as incomplete, matching the
/// original's outer length gate. The tumor quality column is only read
/// when present (column 9); a row with exactly 8 columns is kept with an
/// empty tumor quality string, reproducing the original's separately
/// guarded access to the tumor fields.
pub fn parse_mpileup_row(
    line: &str,
    line_no: usize,
    verbose: bool,
) -> CnResult<Option<MatchedPosition>> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 8 {
        if verbose {
            tracing::warn!(line_no, columns = fields.len(), "incomplete mpileup row, skipping");
        }
        return Ok(None);
    }

    let chrom = fields[0].to_string();
    let pos = fields[1].parse::<u64>().map_err(|_| CnError::LineParseError {
        line: line_no,
        reason: format!("invalid position {:?}", fields[1]),
    })?;
    let ref_base = fields
        .get(2)
        .and_then(|s| s.chars().next())
        .unwrap_or('N')
        .to_ascii_uppercase();
    let normal_raw_depth =
        fields[3].parse::<u64>().map_err(|_| CnError::LineParseError {
            line: line_no,
            reason: format!("invalid normal depth {:?}", fields[3]),
        })?;
    let normal_quals = fields[5].to_string();
    let tumor_raw_depth =
        fields[6].parse::<u64>().map_err(|_| CnError::LineParseError {
            line: line_no,
            reason: format!("invalid tumor depth {:?}", fields[6]),
        })?;
    let tumor_quals =
        if fields.len() >= 9 { fields[8].to_string() } else { String::new() };

    Ok(Some(MatchedPosition {
        chrom,
        pos,
        ref_base,
        normal_raw_depth,
        normal_quals,
        tumor_raw_depth,
        tumor_quals,
    }))
}
