use std::process::ExitCode;

use clap::Parser;
use cn_kit::cli::Commands;
use cn_kit::errs::CnError;

#[derive(Parser)]
#[command(
    name = "cnkit",
    version,
    about = "Tumor/normal copy-number segmentation from pileup data"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Maps a run failure to the exit code documented for the `copynumber`
/// subcommand: 1 for usage/parameter/parse errors, 10 for a stream that
/// never became ready, 11 for an I/O failure, 1 for anything else
/// (configuration errors raised via `anyhow::bail!`).
fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<CnError>() {
        Some(CnError::InputNotReady) => 10,
        Some(CnError::Io(_)) => 11,
        Some(
            CnError::UsageError(_)
            | CnError::ParameterError(_)
            | CnError::LineParseError { .. }
            | CnError::TooManyLineParseErrors { .. },
        ) => 1,
        None => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}
