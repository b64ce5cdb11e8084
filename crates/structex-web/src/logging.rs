use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::settings::ServerSettings;

pub const LOG_FILE_PREFIX: &str = "structured_extractor.log";
pub const MAX_LOG_FILES: usize = 5;

/// Install the global subscriber: stdout always, plus a daily-rotated file
/// when `log_dir` is set. `RUST_LOG` takes precedence over the configured level.
///
/// The returned guard flushes the file writer on drop and must live until exit.
pub fn init(settings: &ServerSettings) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))?;

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer());

    match settings.log_dir.as_deref() {
        Some(dir) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(dir)?);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            registry.try_init()?;
            Ok(None)
        }
    }
}

fn file_appender(dir: &Path) -> anyhow::Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .max_log_files(MAX_LOG_FILES)
        .build(dir)?;
    Ok(appender)
}
