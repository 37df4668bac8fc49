//! Logging initialization, following the project convention of writing
//! human-readable logs to stderr by default and switching to a log file
//! when one is requested on the command line.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "cn_kit=info";

/// Initializes the global tracing subscriber. The returned guard must be
/// kept alive for the duration of the program when file logging is in use;
/// dropping it flushes the non-blocking writer.
pub fn init_logging(log_filepath: Option<&PathBuf>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match log_filepath {
        Some(path) => {
            let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
            if let Some(parent) = parent {
                let _ = std::fs::create_dir_all(parent);
            }
            let file_appender = tracing_appender::rolling::never(
                parent.unwrap_or_else(|| std::path::Path::new(".")),
                path.file_name().unwrap_or_else(|| path.as_os_str()),
            );
            let (non_blocking, guard) =
                tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}
