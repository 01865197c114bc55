//! Logging setup for repoindex.
//!
//! A rotating file layer and a stderr layer, each optional. The stderr layer
//! honours `RUST_LOG`; the file layer uses the configured level.

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
};

const DEFAULT_DIRECTIVE: &str = "repoindex=info";

/// Keeps the non-blocking writers alive. Pending log lines are flushed
/// when this is dropped, so hold it until `main` returns.
#[must_use = "Dropping this guard will stop logging - keep it alive for the program's lifetime"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
    _stderr_guard: Option<WorkerGuard>,
}

/// Install the global subscriber described by `config`.
///
/// Relative log directories are resolved against `project_root`.
pub fn init_logging(config: &LoggingConfig, project_root: &Path) -> Result<LoggingGuard> {
    let (file, file_guard) = if config.enabled {
        let (layer, guard) = file_layer(config, project_root)?;
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let (stderr, stderr_guard) = if config.stderr {
        let (layer, guard) = stderr_layer();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(file)
        .with(stderr)
        .try_init()
        .context("Failed to initialize logging subscriber")?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
        _stderr_guard: stderr_guard,
    })
}

fn file_layer<S>(
    config: &LoggingConfig,
    project_root: &Path,
) -> Result<(Box<dyn Layer<S> + Send + Sync>, WorkerGuard)>
where
    S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync + 'static,
{
    let log_dir = resolve_log_dir(&config.directory, project_root);
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let appender = RollingFileAppender::new(
        parse_rotation(&config.rotation),
        &log_dir,
        &config.file_prefix,
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(parse_level(&config.level))
        .boxed();
    Ok((layer, guard))
}

fn stderr_layer<S>() -> (Box<dyn Layer<S> + Send + Sync>, WorkerGuard)
where
    S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync + 'static,
{
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(false)
        .with_filter(filter)
        .boxed();
    (layer, guard)
}

fn resolve_log_dir(directory: &Path, project_root: &Path) -> PathBuf {
    if directory.is_absolute() {
        directory.to_path_buf()
    } else {
        project_root.join(directory)
    }
}

fn parse_level(level: &str) -> EnvFilter {
    let level = match level.to_lowercase().as_str() {
        lvl @ ("trace" | "debug" | "info" | "warn" | "error") => lvl.to_string(),
        _ => {
            eprintln!("Warning: Unknown log level '{}', defaulting to 'debug'", level);
            "debug".to_string()
        }
    };
    EnvFilter::new(format!("repoindex={}", level))
}

fn parse_rotation(rotation: &str) -> Rotation {
    match rotation.to_lowercase().as_str() {
        "hourly" => Rotation::HOURLY,
        "daily" => Rotation::DAILY,
        "minutely" => Rotation::MINUTELY,
        "never" => Rotation::NEVER,
        _ => {
            eprintln!(
                "Warning: Unknown rotation strategy '{}', defaulting to 'daily'",
                rotation
            );
            Rotation::DAILY
        }
    }
}

/// Stderr-only logging for failures that happen before the config loads.
pub fn init_early_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
        )
        .with(fmt::layer().with_target(false))
        .try_init();
}
