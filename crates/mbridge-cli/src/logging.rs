//! Tracing subscriber setup.
//!
//! Console output is always on. When a log file is configured, events are
//! also written there as JSON through a non-blocking writer.

use std::path::Path;

use tracing::error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::error::CliError;
use crate::parser::LogFormat;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Level used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Build the filter: `--verbose` forces debug, otherwise `RUST_LOG` or info.
fn build_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

fn console_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Text => fmt::layer().with_writer(std::io::stdout).compact().boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stdout).boxed(),
    }
}

/// Open `path` for appending and wrap it in a non-blocking writer.
fn file_layer(path: &Path) -> Result<(BoxedLayer, WorkerGuard), CliError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CliError::Config(format!("invalid log file path: {}", path.display())))?;
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|e| CliError::Io(format!("{}: {e}", path.display())))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(writer)
        .boxed();
    Ok((layer, guard))
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held
/// until the process exits.
pub fn init_tracing(
    verbose: bool,
    format: LogFormat,
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>, CliError> {
    let mut layers = vec![console_layer(format)];
    let mut guard = None;

    if let Some(path) = log_file {
        let (layer, file_guard) = file_layer(path)?;
        layers.push(layer);
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(build_filter(verbose))
        .try_init()
        .map_err(|e| CliError::Config(format!("logging already initialized: {e}")))?;

    Ok(guard)
}

/// Route panics through tracing so they reach every configured sink.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_default();
        let payload = info
            .payload()
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| info.payload().downcast_ref::<&str>().copied())
            .unwrap_or("unknown panic");
        error!(%location, payload, "Panic");
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_layer_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.log");

        let (_layer, _guard) = file_layer(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_file_layer_rejects_directory_path() {
        assert!(file_layer(Path::new("/")).is_err());
    }

    #[test]
    fn test_verbose_filter_is_debug() {
        assert_eq!(build_filter(true).to_string(), "debug");
    }
}
