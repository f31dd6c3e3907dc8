use anyhow::{Result, anyhow};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "townhall.log";

/// Where log records go
pub enum LogTarget<'a> {
    /// Standard error, for one-shot commands
    Stderr,
    /// A file inside `dir`, for the TUI which owns the terminal
    File(&'a Path),
}

fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("townhall=debug")
        } else {
            EnvFilter::new("townhall=info")
        }
    })
}

/// Install the global subscriber. `RUST_LOG` wins over `verbose`.
///
/// The returned guard flushes the file writer on drop and must be kept alive
/// for the life of the program.
pub fn init(target: LogTarget<'_>, verbose: bool) -> Result<Option<WorkerGuard>> {
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter(verbose))
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow!("Failed to install logger: {}", e))?;
            Ok(None)
        }
        LogTarget::File(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter(verbose))
                .with_ansi(false)
                .with_writer(writer)
                .try_init()
                .map_err(|e| anyhow!("Failed to install logger: {}", e))?;
            Ok(Some(guard))
        }
    }
}
