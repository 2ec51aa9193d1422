use crate::config::LoggingConfig;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Log file name prefix; the appender adds a `.YYYY-MM-DD` suffix
pub const LOG_FILE: &str = "chatdesk.log";

/// Initialize logging to a daily file in `dir`.
///
/// The terminal UI owns stdout, so console output is opt-in and only at
/// warn level and above. `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig, dir: &Path, console: bool) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(filter);

    let console_layer = console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(EnvFilter::new("warn"))
            .boxed()
    });

    if let Err(e) = Registry::default()
        .with(file_layer)
        .with(console_layer)
        .try_init()
    {
        eprintln!("Failed to initialize logging: {}", e);
    }

    guard
}
