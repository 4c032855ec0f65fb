use std::env;
use std::path::PathBuf;

use crate::assessment::{NormalizationBounds, RawInputs};

/// Deployment stage, read from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    /// Log level used when `APP_LOG_LEVEL` is unset.
    pub fn default_log_level(self) -> &'static str {
        match self {
            Self::Production => "warn",
            Self::Development | Self::Test => "info",
        }
    }
}

impl From<&str> for AppEnvironment {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Everything the console needs to build a scoring backend and an orchestrator.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub model: ModelConfig,
    pub assessment: AssessmentConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Read `.env` (when present) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = env_value("APP_ENV")
            .map(|value| AppEnvironment::from(value.as_str()))
            .unwrap_or(AppEnvironment::Development);

        let defaults = RawInputs::default();
        let initial_inputs = RawInputs {
            income: parse_var("FINRISK_DEFAULT_INCOME", defaults.income)?,
            age: parse_var("FINRISK_DEFAULT_AGE", defaults.age)?,
            engagement: parse_var("FINRISK_DEFAULT_ENGAGEMENT", defaults.engagement)?,
        };
        if !(0.0..=1.0).contains(&initial_inputs.engagement) {
            return Err(ConfigError::EngagementOutOfRange(initial_inputs.engagement));
        }

        let log_level = env_value("APP_LOG_LEVEL")
            .unwrap_or_else(|| environment.default_log_level().to_string());

        Ok(Self {
            environment,
            model: ModelConfig {
                artifact_path: env_value("FINRISK_MODEL_PATH").map(PathBuf::from),
            },
            assessment: AssessmentConfig {
                bounds: NormalizationBounds::STANDARD,
                initial_inputs,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Trimmed value of `var`; unset and blank are the same.
fn env_value(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env_value(var) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
        None => Ok(default),
    }
}

/// Location of the scoring model artifact. `None` selects the embedded default.
#[derive(Debug, Clone, Default)]
pub struct ModelConfig {
    pub artifact_path: Option<PathBuf>,
}

/// Normalization bounds and the inputs the orchestrator starts from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssessmentConfig {
    pub bounds: NormalizationBounds,
    pub initial_inputs: RawInputs,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            bounds: NormalizationBounds::STANDARD,
            initial_inputs: RawInputs::default(),
        }
    }
}

/// Level or directive string handed to [`crate::telemetry::init`].
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a number, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
    #[error("FINRISK_DEFAULT_ENGAGEMENT must be within [0, 1], got {0}")]
    EngagementOutOfRange(f64),
}
