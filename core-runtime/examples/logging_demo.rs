//! Logging system demonstration
//!
//! Run with:
//! ```bash
//! cargo run -p core-runtime --example logging_demo
//! cargo run -p core-runtime --example logging_demo -- json
//! cargo run -p core-runtime --example logging_demo -- compact "core_playback=trace"
//! ```

use bridge_traits::{ConsoleLogger, LogLevel};
use core_runtime::logging::{init_logging, redact_url, LogFormat, LoggingConfig};
use std::env;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[tokio::main]
async fn main() -> Result<(), core_runtime::Error> {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_spans(true)
        .with_logger_sink(Arc::new(ConsoleLogger {
            min_level: LogLevel::Warn,
        }));

    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    init_logging(config)?;

    info!(target: "core_runtime", format = ?format, "Logging initialized");

    select_episode("ep-42", "https://cdn.example.fm/ep42.mp3?token=secret").await;

    warn!(target: "core_playback", episode_id = "ep-42", "Session failed; player emptied");
    Ok(())
}

#[instrument(target = "core_playback", skip(url))]
async fn select_episode(episode_id: &str, url: &str) {
    info!(target: "core_playback", url = %redact_url(url), "Loading episode");
    tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    debug!(target: "core_playback", "Session ready");
}
