//! Phred-encoded quality-string depth counting.

/// Counts the bases in `quals` whose Phred quality (`byte - 33`) meets or
/// exceeds `min_base_qual`. Mirrors `qualityDepth` from the original
/// VarScan implementation, which treats each character of the pileup
/// quality column as a single-byte Phred-33 score.
pub fn quality_depth(quals: &str, min_base_qual: u32) -> u64 {
    quals
        .bytes()
        .filter(|&b| (b as i64 - 33) >= min_base_qual as i64)
        .count() as u64
}
