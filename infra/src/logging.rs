//! Tracing subscriber installation
//!
//! The token crates only emit `tracing` events. A host process that wants them
//! written somewhere calls [`init_tracing`] once at startup, or installs its
//! own subscriber instead.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use tg_shared::{LogFormat, LoggingConfig};

use crate::InfrastructureError;

/// Level filter: `RUST_LOG` if set and valid, else the configured level, else `info`
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber described by `config`
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), InfrastructureError> {
    let registry = tracing_subscriber::registry().with(build_filter(config));
    let with_source = config.source_location;

    let result = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(with_source)
                    .with_line_number(with_source),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_file(with_source)
                    .with_line_number(with_source),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_file(with_source)
                    .with_line_number(with_source),
            )
            .try_init(),
    };

    result.map_err(|e| InfrastructureError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_falls_back() {
        let config = LoggingConfig {
            level: "not a [valid directive".into(),
            ..Default::default()
        };
        // Must not panic whatever RUST_LOG holds.
        let _ = build_filter(&config);
    }

    #[test]
    fn test_second_install_is_rejected() {
        let config = LoggingConfig {
            format: LogFormat::Json,
            ..Default::default()
        };
        let _ = init_tracing(&config);

        let second = init_tracing(&config);
        assert!(matches!(second, Err(InfrastructureError::Logging(_))));
    }
}
