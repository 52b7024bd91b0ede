use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "pipeline.log";

/// Console output on stderr plus a daily-rotated JSON log under `logs/`.
///
/// `RUST_LOG` overrides the default filter of `review_pipeline=info,warn`.
pub fn init_logging() {
    let _ = fs::create_dir_all(LOG_DIR);

    let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(file_writer);

    // stderr keeps stdout free for the summaries printed by the CLI
    let console_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("review_pipeline=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    // The writer thread flushes until process exit
    std::mem::forget(guard);
}
