//! Logging setup
//!
//! Console output (pretty or JSON) plus an optional daily rolling file
//! named `pos-client.YYYY-MM-DD`. `RUST_LOG` overrides the configured level.

use std::fs;
use std::path::Path;

use tracing::Subscriber;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, prelude::*};

use crate::config::ClientConfig;

const LOG_FILE_PREFIX: &str = "pos-client";

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Install the global subscriber from the client configuration
pub fn init_logger(config: &ClientConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let console = if config.log_json {
        fmt::layer().json().with_current_span(true).boxed()
    } else {
        fmt::layer().with_target(true).with_line_number(true).boxed()
    };

    let file = match config.log_dir.as_deref() {
        Some(dir) => Some(file_layer(Path::new(dir), config.log_json)?),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    tracing::debug!(level = %config.log_level, json = config.log_json, "Logger initialized");
    Ok(())
}

fn file_layer<S>(dir: &Path, json: bool) -> anyhow::Result<BoxedLayer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
    // file output never carries colour codes
    let layer = fmt::layer()
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(appender));
    Ok(if json { layer.json().boxed() } else { layer.boxed() })
}
