use crate::config::TelemetryConfig;
use tracing::{debug, warn};
use tracing_subscriber::filter::{LevelFilter, ParseError};
use tracing_subscriber::EnvFilter;

/// Targets that follow a bare configured level.
const SCOPED_TARGETS: [&str; 2] = ["finrisk", "finrisk_console"];

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("APP_LOG_LEVEL '{value}' is not a valid level or filter directive")]
    InvalidLevel {
        value: String,
        #[source]
        source: ParseError,
    },
    #[error("unable to install tracing subscriber: {0}")]
    Subscriber(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Which setting produced the active filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOrigin {
    RustLog,
    Configured,
}

/// Expand a bare level such as `debug` into directives for the finrisk
/// crates. Other targets never log above `warn`. Anything that is not a bare
/// level is treated as a full directive string and kept as is.
pub fn scoped_directives(log_level: &str) -> String {
    let log_level = log_level.trim();
    let Ok(level) = log_level.parse::<LevelFilter>() else {
        return log_level.to_string();
    };

    let mut directives: Vec<String> = SCOPED_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect();
    directives.push(level.min(LevelFilter::WARN).to_string());
    directives.join(",")
}

/// A parsable, non-empty `RUST_LOG` wins; otherwise the configured level.
pub fn select_filter(
    config: &TelemetryConfig,
    rust_log: Option<&str>,
) -> Result<(EnvFilter, FilterOrigin), TelemetryError> {
    let from_env = rust_log
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok());
    if let Some(filter) = from_env {
        return Ok((filter, FilterOrigin::RustLog));
    }

    EnvFilter::try_new(scoped_directives(&config.log_level))
        .map(|filter| (filter, FilterOrigin::Configured))
        .map_err(|source| TelemetryError::InvalidLevel {
            value: config.log_level.clone(),
            source,
        })
}

/// Install the global fmt subscriber on stderr, leaving stdout to command output.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, origin) = select_filter(config, rust_log.as_deref())?;
    let active = filter.to_string();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)?;

    if origin == FilterOrigin::Configured {
        if let Some(ignored) = rust_log.filter(|value| !value.trim().is_empty()) {
            warn!(rust_log = %ignored, "ignoring unparsable RUST_LOG");
        }
    }
    debug!(filter = %active, ?origin, "telemetry initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(log_level: &str) -> TelemetryConfig {
        TelemetryConfig {
            log_level: log_level.to_string(),
        }
    }

    #[test]
    fn bare_level_is_scoped_to_finrisk_targets() {
        assert_eq!(
            scoped_directives("debug"),
            "finrisk=debug,finrisk_console=debug,warn"
        );
        assert_eq!(
            scoped_directives(" ERROR "),
            "finrisk=error,finrisk_console=error,error"
        );
        assert_eq!(
            scoped_directives("off"),
            "finrisk=off,finrisk_console=off,off"
        );
    }

    #[test]
    fn directive_strings_pass_through() {
        assert_eq!(
            scoped_directives("finrisk::assessment=trace,info"),
            "finrisk::assessment=trace,info"
        );
    }

    #[test]
    fn rust_log_takes_precedence_when_parsable() {
        let (_, origin) =
            select_filter(&configured("info"), Some("finrisk=trace")).expect("filter builds");
        assert_eq!(origin, FilterOrigin::RustLog);

        let (filter, origin) =
            select_filter(&configured("info"), Some("finrisk=loud")).expect("falls back");
        assert_eq!(origin, FilterOrigin::Configured);
        assert!(filter.to_string().contains("finrisk=info"));

        let (_, origin) = select_filter(&configured("info"), Some("  ")).expect("falls back");
        assert_eq!(origin, FilterOrigin::Configured);
    }

    #[test]
    fn invalid_configured_level_is_reported() {
        let err = select_filter(&configured("finrisk=loud"), None).expect_err("invalid level");
        assert!(matches!(
            &err,
            TelemetryError::InvalidLevel { value, .. } if value == "finrisk=loud"
        ));
        assert!(err.to_string().contains("APP_LOG_LEVEL"));
    }
}
