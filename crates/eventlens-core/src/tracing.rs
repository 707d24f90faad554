//! Log setup shared by the host and the CLI.
//!
//! Everything is written to stderr. The browser reads native-messaging frames
//! from stdout, so a single stray log line there would break the stream.
//!
//! ```ignore
//! use eventlens_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::native_host())?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Failure to install the global subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("a global tracing subscriber is already installed: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("invalid log filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line, for reading in a terminal.
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    /// One JSON object per event.
    Json,
}

/// Log settings.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for `eventlens*` targets when neither `filter` nor `RUST_LOG` is set.
    pub level: Level,
    pub format: TracingOutputFormat,
    /// Adds file and line to each event.
    pub with_location: bool,
    pub ansi: bool,
    /// Explicit filter directive; takes precedence over `RUST_LOG`.
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingOutputFormat::Pretty,
            with_location: false,
            ansi: true,
            filter: None,
        }
    }
}

impl TracingConfig {
    /// `--debug` on the command line.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            level: Level::DEBUG,
            format: TracingOutputFormat::Compact,
            with_location: true,
            ..Self::default()
        }
    }

    /// Running under the browser, which copies stderr into its own log
    /// without interpreting colour codes.
    #[must_use]
    pub fn native_host() -> Self {
        Self {
            format: TracingOutputFormat::Compact,
            ansi: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, TracingError> {
        match self.filter {
            Some(ref directive) => Ok(EnvFilter::try_new(directive)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("eventlens={}", self.level)))),
        }
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(self.with_location)
            .with_line_number(self.with_location);

        match self.format {
            TracingOutputFormat::Pretty => layer.pretty().with_ansi(self.ansi).boxed(),
            TracingOutputFormat::Compact => layer.compact().with_ansi(self.ansi).boxed(),
            TracingOutputFormat::Json => layer.json().boxed(),
        }
    }
}

/// Installs the global subscriber. Call once, early in `main`.
///
/// # Errors
///
/// Fails if a subscriber is already installed or the filter does not parse.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.env_filter()?;
    let subscriber = tracing_subscriber::registry()
        .with(config.fmt_layer())
        .with(filter);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_host_disables_colour() {
        let config = TracingConfig::native_host();
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.format, TracingOutputFormat::Compact);
        assert!(!config.ansi);
        assert!(config.filter.is_none());
    }

    #[test]
    fn cli_debug_adds_location() {
        let config = TracingConfig::cli_debug();
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.with_location);
        assert!(config.ansi);
    }

    #[test]
    fn builders_override_preset() {
        let config = TracingConfig::native_host()
            .with_level(Level::WARN)
            .with_format(TracingOutputFormat::Json)
            .with_env_filter("eventlens_google=trace");

        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.format, TracingOutputFormat::Json);
        assert_eq!(config.filter.as_deref(), Some("eventlens_google=trace"));
    }

    #[test]
    fn bad_filter_directive_is_rejected() {
        let config = TracingConfig::default().with_env_filter("eventlens=notalevel");
        assert!(matches!(
            init_tracing(config),
            Err(TracingError::EnvFilter(_))
        ));
    }
}
