//! Command-line surface: a single `copynumber` subcommand under a
//! minimal top-level dispatcher, in the shape of the teacher's
//! `modkit <subcommand> ...` command tree.

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Subcommand};

use crate::driver::{run_dual_pileup, run_mpileup, DriverConfig};
use crate::emitter::EmitterConfig;
use crate::errs::CnError;
use crate::logging::init_logging;
use crate::segmenter::SegmenterConfig;

#[derive(Subcommand)]
pub enum Commands {
    /// Detect copy-number changes between a normal and a tumor sample
    /// from pileup data, either as two separate single-sample pileups or
    /// one two-sample mpileup. Output is a tab-delimited `.copynumber`
    /// file of contiguous segments with their average depths, log2 ratio,
    /// and GC content.
    Copynumber(CopynumberArgs),
}

impl Commands {
    pub fn run(&self) -> anyhow::Result<()> {
        match self {
            Self::Copynumber(args) => args.run(),
        }
    }
}

#[derive(Args)]
#[command(arg_required_else_help = true)]
pub struct CopynumberArgs {
    /// Pileup file for the normal (reference) sample. Omit this and
    /// `tumor_pileup` and pass `--mpileup` instead to read a single
    /// merged two-sample mpileup stream.
    #[clap(help_heading = "Input Options")]
    #[arg(requires = "tumor_pileup", conflicts_with = "mpileup")]
    normal_pileup: Option<PathBuf>,
    /// Pileup file for the tumor sample.
    #[clap(help_heading = "Input Options")]
    #[arg(requires = "normal_pileup", conflicts_with = "mpileup")]
    tumor_pileup: Option<PathBuf>,
    /// A single two-sample mpileup file (normal and tumor interleaved
    /// per row), as an alternative to separate `normal_pileup` and
    /// `tumor_pileup` files. Use `-` to read from stdin.
    #[clap(help_heading = "Input Options")]
    #[arg(long)]
    mpileup: Option<String>,

    /// Basename for the output `.copynumber` file.
    #[clap(help_heading = "Output Options")]
    #[arg(short = 'o', long = "output", default_value = "output")]
    output_base: String,
    /// Force overwrite of the output file, if it already exists.
    #[clap(help_heading = "Output Options")]
    #[arg(short = 'f', long, default_value_t = false)]
    force: bool,

    /// Minimum read depth at a position, in either sample, for a segment
    /// to be reported.
    #[clap(help_heading = "Segmentation Options")]
    #[arg(long, default_value_t = 10)]
    min_coverage: u64,
    /// Minimum base quality (Phred) for a base to be counted towards
    /// depth.
    #[clap(help_heading = "Segmentation Options")]
    #[arg(long, default_value_t = 15)]
    min_base_qual: u32,
    /// Minimum number of positions for a segment to be reported.
    #[clap(help_heading = "Segmentation Options")]
    #[arg(long, default_value_t = 10)]
    min_segment_size: u64,
    /// Maximum number of positions in a single segment, after which it
    /// is closed and a new one is started regardless of depth stability.
    #[clap(help_heading = "Segmentation Options")]
    #[arg(long, default_value_t = 100)]
    max_segment_size: u64,
    /// Fisher's exact test p-value threshold above which a depth change
    /// is not considered significant, and the segment continues.
    #[clap(help_heading = "Segmentation Options")]
    #[arg(long = "p-value", default_value_t = 0.01)]
    p_value: f64,
    /// Ratio to normalize the tumor depth by before computing the log2
    /// ratio, e.g. to account for differing total sequencing depth
    /// between samples.
    #[clap(help_heading = "Segmentation Options")]
    #[arg(long, default_value_t = 1.0)]
    data_ratio: f64,
    /// Use natural (numeric-aware) chromosome ordering when resyncing
    /// the normal and tumor pileup streams, so "chr2" sorts before
    /// "chr10". Only affects two-file input; has no effect on `--mpileup`
    /// input, which never needs to reorder chromosomes. Default is
    /// lexicographic, matching historical output.
    #[clap(help_heading = "Segmentation Options")]
    #[arg(long, default_value_t = false)]
    natural_sort: bool,

    /// Log per-row warnings for skipped or malformed input lines.
    #[clap(help_heading = "Logging Options")]
    #[arg(long, default_value_t = false)]
    verbose: bool,
    /// File to write logs to; recommended when piping large inputs so
    /// stderr stays free for progress output.
    #[clap(help_heading = "Logging Options")]
    #[arg(long, alias = "log")]
    log_filepath: Option<PathBuf>,
}

impl CopynumberArgs {
    pub fn run(&self) -> anyhow::Result<()> {
        let _guard = init_logging(self.log_filepath.as_ref());

        let output_path = format!("{}.copynumber", self.output_base);
        if PathBuf::from(&output_path).exists() && !self.force {
            bail!(
                "output file {output_path} already exists, use --force to overwrite"
            );
        }
        let out_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&output_path)
            .with_context(|| format!("failed to create {output_path}"))?;

        let config = DriverConfig {
            segmenter: SegmenterConfig {
                min_coverage: self.min_coverage,
                min_base_qual: self.min_base_qual,
                min_segment_size: self.min_segment_size,
                max_segment_size: self.max_segment_size,
                p_value_threshold: self.p_value,
            },
            emitter: EmitterConfig {
                min_coverage: self.min_coverage,
                data_ratio: self.data_ratio,
            },
            verbose: self.verbose,
            natural_sort: self.natural_sort,
        };

        match (&self.normal_pileup, &self.tumor_pileup, &self.mpileup) {
            (Some(normal), Some(tumor), None) => {
                run_dual_pileup(normal, tumor, out_file, &config)?;
            }
            (None, None, Some(mpileup)) => {
                if mpileup == "-" {
                    run_mpileup(None, io::stdin(), out_file, &config)?;
                } else {
                    let path = PathBuf::from(mpileup);
                    let file = std::fs::File::open(&path).with_context(|| {
                        format!("failed to open {mpileup}")
                    })?;
                    run_mpileup(Some(&path), file, out_file, &config)?;
                }
            }
            _ => {
                return Err(CnError::ParameterError(
                    "provide either normal_pileup and tumor_pileup, or \
                     --mpileup, not both"
                        .to_string(),
                )
                .into());
            }
        };

        Ok(())
    }
}
