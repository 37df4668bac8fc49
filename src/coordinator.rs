//! Lock-step reader over two independent pileup streams (normal and
//! tumor), yielding one [`MatchedPosition`] per tumor-file row that has a
//! position match in the normal file.
//!
//! Grounded in the dual-pileup coordinator loop of the original VarScan
//! `copynumber` implementation (`examples/original_source/main.py`, the
//! block driven by `while ((lineTumor = tumor.readLine()) != null)`). Rows
//! that never find a matching normal position are simply skipped: they
//! never reach the segmenter, exactly as in the original.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::errs::{CnError, CnResult};
use crate::pileup::MatchedPosition;

const MAX_LINE_PARSE_ERRORS: usize = 5;

/// A re-openable line source backing one side of the dual-pileup
/// coordinator. Normal files may need to be reopened from the start when
/// the tumor stream has already passed a chromosome that the normal
/// stream never produced rows for.
struct PileupFileSource {
    path: PathBuf,
    reader: BufReader<File>,
}

impl PileupFileSource {
    fn open(path: impl Into<PathBuf>) -> CnResult<Self> {
        let path = path.into();
        let reader = BufReader::new(File::open(&path)?);
        Ok(Self { path, reader })
    }

    fn reset(&mut self) -> CnResult<()> {
        self.reader = BufReader::new(File::open(&self.path)?);
        Ok(())
    }

    fn next_line(&mut self) -> CnResult<Option<String>> {
        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        Ok(Some(buf))
    }
}

/// Tallies produced while draining both streams, surfaced in the
/// driver's closing summary.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoordinatorStats {
    pub tumor_positions: u64,
    pub shared_positions: u64,
}

/// Extracts `(chrom, pos)` from a raw pileup line's first two columns,
/// without validating the rest of the row. Returns `None` for rows with
/// fewer than 2 columns, matching the original's `contents.length > 1`
/// check used while seeking between chromosomes.
fn chrom_and_pos(line: &str, line_no: usize) -> CnResult<Option<(String, u64)>> {
    let mut fields = line.splitn(3, '\t');
    let chrom = match fields.next() {
        Some(c) => c,
        None => return Ok(None),
    };
    let pos = match fields.next() {
        Some(p) => p,
        None => return Ok(None),
    };
    let pos = pos.parse::<u64>().map_err(|_| CnError::LineParseError {
        line: line_no,
        reason: format!("invalid position {:?}", pos),
    })?;
    Ok(Some((chrom.to_string(), pos)))
}

/// Extracts the raw depth/quality columns from an already-read pileup
/// line, for the classic (6-7 column) and extended (10-11 column) row
/// shapes. Returns `(0, "")` for any other shape, matching the original's
/// silently-skipped field extraction.
fn depth_and_quals(line: &str) -> (u64, String) {
    let fields: Vec<&str> = line.split('\t').collect();
    match fields.len() {
        6..=7 => (
            fields[3].parse().unwrap_or(0),
            fields[5].to_string(),
        ),
        10..=11 => (
            fields[7].parse().unwrap_or(0),
            fields[9].to_string(),
        ),
        _ => (0, String::new()),
    }
}

fn ref_base_of(line: &str) -> char {
    line.split('\t')
        .nth(2)
        .and_then(|s| s.chars().next())
        .unwrap_or('N')
        .to_ascii_uppercase()
}

/// Reads both pileup streams in lock step and calls `on_match` for every
/// tumor position that has a matching normal position.
pub struct DualPileupCoordinator {
    natural_sort: bool,
}

impl DualPileupCoordinator {
    pub fn new(natural_sort: bool) -> Self {
        Self { natural_sort }
    }

    /// Lexicographic by default; numeric-aware when `--natural-sort` is
    /// set. Returns whether `a` sorts at or before `b`.
    fn in_sort_order(&self, a: &str, b: &str) -> bool {
        if self.natural_sort {
            natural_cmp(a, b) != Ordering::Greater
        } else {
            a <= b
        }
    }

    pub fn run(
        &self,
        normal_path: &Path,
        tumor_path: &Path,
        mut on_match: impl FnMut(&MatchedPosition) -> CnResult<()>,
    ) -> CnResult<CoordinatorStats> {
        let mut normal = PileupFileSource::open(normal_path)?;
        let mut tumor = PileupFileSource::open(tumor_path)?;

        let mut chrom_normal: Option<String> = None;
        let mut pos_normal: u64 = 0;
        let mut line_normal: Option<String> = None;

        let mut chrom_tumor: Option<String> = None;
        let mut pos_tumor: u64 = 0;
        let mut line_tumor: Option<String>;

        let mut prev_chrom_tumor: Option<String> = None;

        let mut stats = CoordinatorStats::default();
        let mut parse_errors = 0usize;
        let mut line_no_normal = 0usize;
        let mut line_no_tumor = 0usize;

        if let Some(line) = normal.next_line()? {
            line_no_normal += 1;
            if let Some((c, p)) = chrom_and_pos(&line, line_no_normal)? {
                chrom_normal = Some(c);
                pos_normal = p;
            }
            line_normal = Some(line);
        }

        loop {
            let next = match tumor.next_line() {
                Ok(v) => v,
                Err(e) => {
                    parse_errors += 1;
                    if parse_errors >= MAX_LINE_PARSE_ERRORS {
                        return Err(CnError::TooManyLineParseErrors {
                            count: parse_errors,
                        });
                    }
                    tracing::warn!(error = %e, "skipping unreadable tumor line");
                    continue;
                }
            };
            let line = match next {
                Some(l) => l,
                None => break,
            };
            line_no_tumor += 1;
            stats.tumor_positions += 1;

            match chrom_and_pos(&line, line_no_tumor) {
                Ok(Some((c, p))) => {
                    chrom_tumor = Some(c);
                    pos_tumor = p;
                }
                Ok(None) => {}
                Err(e) => {
                    parse_errors += 1;
                    tracing::warn!(error = %e, "malformed tumor line, skipping");
                    if parse_errors >= MAX_LINE_PARSE_ERRORS {
                        return Err(CnError::TooManyLineParseErrors {
                            count: parse_errors,
                        });
                    }
                    continue;
                }
            }
            line_tumor = Some(line);

            let mut flag_eof = false;
            let mut normal_was_reset = false;

            // Advance the normal stream while it is behind the tumor
            // stream's chromosome.
            while chrom_normal != chrom_tumor
                && chrom_tumor != prev_chrom_tumor
                && !flag_eof
                && (chrom_normal == prev_chrom_tumor
                    || self.in_sort_order(
                        chrom_normal.as_deref().unwrap_or(""),
                        chrom_tumor.as_deref().unwrap_or(""),
                    ))
            {
                match normal.next_line()? {
                    Some(line) => {
                        line_no_normal += 1;
                        if let Some((c, p)) = chrom_and_pos(&line, line_no_normal)? {
                            chrom_normal = Some(c);
                            pos_normal = p;
                        }
                        line_normal = Some(line);
                    }
                    None => flag_eof = true,
                }
            }

            if chrom_normal.is_some() && chrom_normal == chrom_tumor {
                normal_was_reset = false;

                // Seek the normal stream forward to the tumor's position.
                while chrom_normal == chrom_tumor && pos_normal < pos_tumor {
                    match normal.next_line()? {
                        Some(line) => {
                            line_no_normal += 1;
                            if let Some((c, p)) =
                                chrom_and_pos(&line, line_no_normal)?
                            {
                                chrom_normal = Some(c);
                                pos_normal = p;
                            }
                            line_normal = Some(line);
                        }
                        None => break,
                    }
                }

                // Seek the tumor stream forward to the normal's position.
                while chrom_normal == chrom_tumor && pos_tumor < pos_normal {
                    match tumor.next_line()? {
                        Some(line) => {
                            line_no_tumor += 1;
                            stats.tumor_positions += 1;
                            if let Some((c, p)) =
                                chrom_and_pos(&line, line_no_tumor)?
                            {
                                chrom_tumor = Some(c);
                                pos_tumor = p;
                            }
                            line_tumor = Some(line);
                        }
                        None => break,
                    }
                }

                if chrom_normal == chrom_tumor && pos_normal == pos_tumor {
                    stats.shared_positions += 1;

                    let normal_line = line_normal.as_deref().unwrap_or("");
                    let tumor_line = line_tumor.as_deref().unwrap_or("");
                    let (normal_raw_depth, normal_quals) =
                        depth_and_quals(normal_line);
                    let (tumor_raw_depth, tumor_quals) =
                        depth_and_quals(tumor_line);
                    let ref_base = ref_base_of(tumor_line);

                    let matched = MatchedPosition {
                        chrom: chrom_tumor.clone().unwrap_or_default(),
                        pos: pos_tumor,
                        ref_base,
                        normal_raw_depth,
                        normal_quals,
                        tumor_raw_depth,
                        tumor_quals,
                    };
                    on_match(&matched)?;

                    prev_chrom_tumor = chrom_tumor.clone();
                }
            } else if self.in_sort_order(
                chrom_normal.as_deref().unwrap_or(""),
                chrom_tumor.as_deref().unwrap_or(""),
            ) {
                // Normal is still behind; let the tumor stream catch up.
            } else if flag_eof {
                flag_eof = false;

                while prev_chrom_tumor == chrom_tumor && !flag_eof {
                    match tumor.next_line()? {
                        Some(line) => {
                            line_no_tumor += 1;
                            stats.tumor_positions += 1;
                            if let Some((c, p)) =
                                chrom_and_pos(&line, line_no_tumor)?
                            {
                                chrom_tumor = Some(c);
                                pos_tumor = p;
                            }
                            line_tumor = Some(line);
                        }
                        None => flag_eof = true,
                    }
                }

                if !flag_eof && !normal_was_reset {
                    if self.in_sort_order(
                        chrom_normal.as_deref().unwrap_or(""),
                        chrom_tumor.as_deref().unwrap_or(""),
                    ) {
                        // chrom_normal is still behind chrom_tumor; no reset.
                    } else {
                        tracing::debug!(
                            ?chrom_normal,
                            ?chrom_tumor,
                            "reopening normal pileup to resync chromosome"
                        );
                        normal_was_reset = true;
                        normal.reset()?;
                        line_no_normal = 0;
                        chrom_normal = None;
                        line_normal = None;
                        // Leave `pos_normal` stale and do not prime a read
                        // here: the original only reopens the reader and
                        // lets the next outer iteration's own advance-loop
                        // perform the first read against the reopened file.
                    }
                }
            }
        }

        Ok(stats)
    }
}

lazy_static::lazy_static! {
    static ref NATURAL_SORT_CHUNK: regex::Regex =
        regex::Regex::new(r"\d+|\D+").unwrap();
}

/// Numeric-aware chromosome comparison for `--natural-sort`: splits each
/// name into runs of digits and non-digits, comparing digit runs
/// numerically so "chr2" sorts before "chr10".
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chunks = NATURAL_SORT_CHUNK.find_iter(a);
    let mut b_chunks = NATURAL_SORT_CHUNK.find_iter(b);
    loop {
        match (a_chunks.next(), b_chunks.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => {
                let (ca, cb) = (ca.as_str(), cb.as_str());
                let ordering = match (
                    ca.parse::<u64>().ok(),
                    cb.parse::<u64>().ok(),
                ) {
                    (Some(na), Some(nb)) => na.cmp(&nb),
                    _ => ca.cmp(cb),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}
