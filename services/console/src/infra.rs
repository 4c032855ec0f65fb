use clap::Args;
use finrisk::config::AppConfig;
use finrisk::scoring::{FixedScoringModel, LogisticModel, ScoringModel};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug, Default)]
pub(crate) struct ModelArgs {
    /// Model artifact to load (overrides FINRISK_MODEL_PATH)
    #[arg(long, global = true)]
    pub(crate) model: Option<PathBuf>,
    /// Score every applicant with this probability instead of a model artifact
    #[arg(long, global = true, value_parser = parse_probability)]
    pub(crate) fixed_probability: Option<f32>,
}

impl ModelArgs {
    pub(crate) fn apply(&self, config: &mut AppConfig) {
        if let Some(path) = &self.model {
            config.model.artifact_path = Some(path.clone());
        }
    }
}

pub(crate) fn logistic_model(config: &AppConfig) -> LogisticModel {
    match &config.model.artifact_path {
        Some(path) => LogisticModel::from_path(path),
        None => LogisticModel::embedded(),
    }
}

pub(crate) fn build_model(config: &AppConfig, args: &ModelArgs) -> Arc<dyn ScoringModel> {
    if let Some(probability) = args.fixed_probability {
        info!(probability, "using fixed scoring backend");
        return Arc::new(FixedScoringModel::new(probability));
    }

    match &config.model.artifact_path {
        Some(path) => info!(path = %path.display(), "using logistic model artifact"),
        None => info!("using embedded logistic model artifact"),
    }
    Arc::new(logistic_model(config))
}

pub(crate) fn parse_probability(raw: &str) -> Result<f32, String> {
    let value: f32 = raw
        .trim()
        .parse()
        .map_err(|err| format!("failed to parse '{raw}' as a probability ({err})"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("probability {value} must be within [0, 1]"))
    }
}

pub(crate) fn parse_engagement(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|err| format!("failed to parse '{raw}' as an engagement score ({err})"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("engagement {value} must be within [0, 1]"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_parser_enforces_unit_range() {
        assert_eq!(parse_probability(" 0.85 "), Ok(0.85));
        assert!(parse_probability("1.2").is_err());
        assert!(parse_probability("high").is_err());
    }

    #[test]
    fn engagement_parser_enforces_unit_range() {
        assert_eq!(parse_engagement("0"), Ok(0.0));
        assert!(parse_engagement("-0.1").is_err());
    }
}
