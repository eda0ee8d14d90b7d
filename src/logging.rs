// Tracing setup. The TUI owns stdout, so it logs to a rolling file instead.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

pub fn init_console(level: &str) {
    let console_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(console_layer)
        .try_init();
}

pub fn init_file<P: AsRef<Path>>(log_dir: P, level: &str) {
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "diff-digest.log");

    let file_layer = fmt::layer().with_writer(file_appender).with_ansi(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(file_layer)
        .try_init();
}
