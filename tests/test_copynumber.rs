mod common;

use std::io::{Read, Write};

use serde::Deserialize;
use tempfile::{tempdir, NamedTempFile};

use common::run_cnkit;

#[derive(Deserialize, Debug)]
struct CopyNumberRow {
    chrom: String,
    chr_start: u64,
    chr_stop: u64,
    num_positions: u64,
    normal_depth: f64,
    tumor_depth: f64,
    log2_ratio: f64,
    gc_content: f64,
}

fn read_rows(path: &std::path::Path) -> Vec<CopyNumberRow> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)
        .unwrap();
    reader.deserialize().map(|r| r.unwrap()).collect()
}

fn write_lines(lines: &[String]) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(f, "{line}").unwrap();
    }
    f
}

fn good_quals(n: usize) -> String {
    "I".repeat(n)
}

/// Scenario 1: steady equal depth across a contiguous run reports one
/// segment with a log2 ratio near zero.
#[test]
fn steady_equal_depth_reports_one_balanced_segment() {
    let mut normal = Vec::new();
    let mut tumor = Vec::new();
    for pos in 1..=20u64 {
        normal.push(format!(
            "chr1\t{pos}\tA\t20\tbases\t{}",
            good_quals(20)
        ));
        tumor.push(format!(
            "chr1\t{pos}\tA\t20\tbases\t{}",
            good_quals(20)
        ));
    }
    let normal_fp = write_lines(&normal);
    let tumor_fp = write_lines(&tumor);
    let dir = tempdir().unwrap();
    let out_base = dir.path().join("out");

    run_cnkit(&[
        normal_fp.path().to_str().unwrap(),
        tumor_fp.path().to_str().unwrap(),
        "--output",
        out_base.to_str().unwrap(),
        "--min-segment-size",
        "5",
    ])
    .unwrap();

    let rows = read_rows(&dir.path().join("out.copynumber"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].num_positions, 20);
    assert!(rows[0].log2_ratio.abs() < 0.05);
}

/// Scenario 2: a coverage drop below `--min-coverage` in the normal
/// sample closes the open segment at that point (a gap).
#[test]
fn coverage_drop_closes_the_segment_as_a_gap() {
    let mut normal = Vec::new();
    let mut tumor = Vec::new();
    for pos in 1..=10u64 {
        normal.push(format!("chr1\t{pos}\tA\t20\tbases\t{}", good_quals(20)));
        tumor.push(format!("chr1\t{pos}\tA\t20\tbases\t{}", good_quals(20)));
    }
    // Drop below min-coverage for a few positions.
    for pos in 11..=13u64 {
        normal.push(format!("chr1\t{pos}\tA\t2\tbases\t{}", good_quals(2)));
        tumor.push(format!("chr1\t{pos}\tA\t2\tbases\t{}", good_quals(2)));
    }
    for pos in 14..=23u64 {
        normal.push(format!("chr1\t{pos}\tA\t20\tbases\t{}", good_quals(20)));
        tumor.push(format!("chr1\t{pos}\tA\t20\tbases\t{}", good_quals(20)));
    }
    let normal_fp = write_lines(&normal);
    let tumor_fp = write_lines(&tumor);
    let dir = tempdir().unwrap();
    let out_base = dir.path().join("out");

    run_cnkit(&[
        normal_fp.path().to_str().unwrap(),
        tumor_fp.path().to_str().unwrap(),
        "--output",
        out_base.to_str().unwrap(),
        "--min-segment-size",
        "5",
    ])
    .unwrap();

    let rows = read_rows(&dir.path().join("out.copynumber"));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].chr_stop, 10);
    assert_eq!(rows[1].chr_start, 14);
}

/// Scenario 3: a chromosome boundary always closes the running segment,
/// even when depths stay identical across it.
#[test]
fn chromosome_boundary_forces_a_segment_close() {
    let mut normal = Vec::new();
    let mut tumor = Vec::new();
    for pos in 1..=10u64 {
        normal.push(format!("chr1\t{pos}\tA\t20\tbases\t{}", good_quals(20)));
        tumor.push(format!("chr1\t{pos}\tA\t20\tbases\t{}", good_quals(20)));
    }
    for pos in 1..=10u64 {
        normal.push(format!("chr2\t{pos}\tA\t20\tbases\t{}", good_quals(20)));
        tumor.push(format!("chr2\t{pos}\tA\t20\tbases\t{}", good_quals(20)));
    }
    let normal_fp = write_lines(&normal);
    let tumor_fp = write_lines(&tumor);
    let dir = tempdir().unwrap();
    let out_base = dir.path().join("out");

    run_cnkit(&[
        normal_fp.path().to_str().unwrap(),
        tumor_fp.path().to_str().unwrap(),
        "--output",
        out_base.to_str().unwrap(),
        "--min-segment-size",
        "5",
    ])
    .unwrap();

    let rows = read_rows(&dir.path().join("out.copynumber"));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].chrom, "chr1");
    assert_eq!(rows[1].chrom, "chr2");
}

/// Scenario 4: a tumor-only region (no normal coverage) is reported with
/// the sentinel log2 ratio of +2.0.
#[test]
fn tumor_only_region_is_pinned_to_positive_two() {
    let mut normal = Vec::new();
    let mut tumor = Vec::new();
    for pos in 1..=10u64 {
        // Normal has reads, but all below the base-quality threshold, so
        // its quality-filtered depth is 0 while its raw depth still
        // clears `--min-coverage 0` and its quality string is non-empty.
        normal.push(format!("chr1\t{pos}\tA\t5\tbases\t{}", "!".repeat(5)));
        tumor.push(format!("chr1\t{pos}\tA\t20\tbases\t{}", good_quals(20)));
    }
    let normal_fp = write_lines(&normal);
    let tumor_fp = write_lines(&tumor);
    let dir = tempdir().unwrap();
    let out_base = dir.path().join("out");

    run_cnkit(&[
        normal_fp.path().to_str().unwrap(),
        tumor_fp.path().to_str().unwrap(),
        "--output",
        out_base.to_str().unwrap(),
        "--min-coverage",
        "0",
        "--min-segment-size",
        "5",
    ])
    .unwrap();

    let rows = read_rows(&dir.path().join("out.copynumber"));
    assert_eq!(rows.len(), 1);
    assert!((rows[0].log2_ratio - 2.0).abs() < 1e-6);
}

/// Scenario 5: merged mpileup input (`--mpileup`) produces the same
/// segmentation as the equivalent two-file input.
#[test]
fn mpileup_mode_matches_two_file_mode() {
    let mut two_file_normal = Vec::new();
    let mut two_file_tumor = Vec::new();
    let mut merged = Vec::new();
    for pos in 1..=15u64 {
        let quals = good_quals(20);
        two_file_normal
            .push(format!("chr1\t{pos}\tA\t20\tbases\t{quals}"));
        two_file_tumor.push(format!("chr1\t{pos}\tA\t20\tbases\t{quals}"));
        merged.push(format!(
            "chr1\t{pos}\tA\t20\tbases\t{quals}\t20\tbases\t{quals}"
        ));
    }

    let normal_fp = write_lines(&two_file_normal);
    let tumor_fp = write_lines(&two_file_tumor);
    let merged_fp = write_lines(&merged);

    let dir_a = tempdir().unwrap();
    let out_a = dir_a.path().join("out");
    run_cnkit(&[
        normal_fp.path().to_str().unwrap(),
        tumor_fp.path().to_str().unwrap(),
        "--output",
        out_a.to_str().unwrap(),
        "--min-segment-size",
        "5",
    ])
    .unwrap();

    let dir_b = tempdir().unwrap();
    let out_b = dir_b.path().join("out");
    run_cnkit(&[
        "--mpileup",
        merged_fp.path().to_str().unwrap(),
        "--output",
        out_b.to_str().unwrap(),
        "--min-segment-size",
        "5",
    ])
    .unwrap();

    common::check_against_expected_text_file(
        out_a.with_extension("copynumber").to_str().unwrap(),
        out_b.with_extension("copynumber").to_str().unwrap(),
    );
}

/// Scenario 6: a segment reaching `--max-segment-size` is closed and a
/// new one started, even though depths never change.
#[test]
fn max_segment_size_forces_a_split() {
    let mut normal = Vec::new();
    let mut tumor = Vec::new();
    for pos in 1..=30u64 {
        normal.push(format!("chr1\t{pos}\tA\t20\tbases\t{}", good_quals(20)));
        tumor.push(format!("chr1\t{pos}\tA\t20\tbases\t{}", good_quals(20)));
    }
    let normal_fp = write_lines(&normal);
    let tumor_fp = write_lines(&tumor);
    let dir = tempdir().unwrap();
    let out_base = dir.path().join("out");

    run_cnkit(&[
        normal_fp.path().to_str().unwrap(),
        tumor_fp.path().to_str().unwrap(),
        "--output",
        out_base.to_str().unwrap(),
        "--min-segment-size",
        "5",
        "--max-segment-size",
        "10",
    ])
    .unwrap();

    let rows = read_rows(&dir.path().join("out.copynumber"));
    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert!(row.num_positions <= 10);
    }
}

/// Scenario 5: normal depth below `--min-coverage` (default 10) across
/// every position never opens a segment at all, so the run succeeds
/// (exit 0) with a header-only `.copynumber` file.
#[test]
fn below_min_coverage_emits_no_segments() {
    let mut normal = Vec::new();
    let mut tumor = Vec::new();
    for pos in 1..=40u64 {
        normal.push(format!("chr1\t{pos}\tA\t5\tbases\t{}", good_quals(5)));
        tumor.push(format!("chr1\t{pos}\tA\t5\tbases\t{}", good_quals(5)));
    }
    let normal_fp = write_lines(&normal);
    let tumor_fp = write_lines(&tumor);
    let dir = tempdir().unwrap();
    let out_base = dir.path().join("out");

    run_cnkit(&[
        normal_fp.path().to_str().unwrap(),
        tumor_fp.path().to_str().unwrap(),
        "--output",
        out_base.to_str().unwrap(),
    ])
    .unwrap();

    let rows = read_rows(&dir.path().join("out.copynumber"));
    assert_eq!(rows.len(), 0);

    let mut raw = String::new();
    std::fs::File::open(dir.path().join("out.copynumber"))
        .unwrap()
        .read_to_string(&mut raw)
        .unwrap();
    assert_eq!(
        raw,
        "chrom\tchr_start\tchr_stop\tnum_positions\tnormal_depth\ttumor_depth\tlog2_ratio\tgc_content\n"
    );
}
