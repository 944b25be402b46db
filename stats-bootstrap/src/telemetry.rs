use std::path::PathBuf;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "mohaa-stats.log";

#[derive(Debug, Clone, Default)]
pub struct TelemetryOptions {
    pub log_dir: Option<PathBuf>,
    pub json: bool,
}

/// Keep the returned guard alive for the life of the process, dropping it
/// flushes the file writer.
pub fn init_tracing(options: &TelemetryOptions) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn"));

    let (file_writer, guard) = match &options.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let stdout_json = options.json.then(|| fmt::layer().json());
    let stdout_text = (!options.json).then(|| fmt::layer());
    let file = file_writer.map(|writer| fmt::layer().json().with_ansi(false).with_writer(writer));

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_json)
        .with(stdout_text)
        .with(file)
        .try_init()?;
    Ok(guard)
}
