use crate::infra::{build_model, logistic_model, parse_engagement, ModelArgs};
use clap::Args;
use finrisk::assessment::{AssessmentOrchestrator, RawInputs};
use finrisk::batch::{assess_applicants, read_applicants, write_outcomes};
use finrisk::config::AppConfig;
use finrisk::error::AppError;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// Annual income in currency units
    #[arg(long)]
    income: f64,
    /// Age in years
    #[arg(long)]
    age: u32,
    /// App engagement score within [0, 1]
    #[arg(long, value_parser = parse_engagement)]
    engagement: f64,
    /// Print the full settled state as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// CSV with columns applicant_id,income,age,engagement
    #[arg(long)]
    input: PathBuf,
    /// Destination CSV for outcomes (defaults to stdout)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) async fn run_assess(
    config: &AppConfig,
    model_args: &ModelArgs,
    args: AssessArgs,
) -> Result<(), AppError> {
    let inputs = RawInputs {
        income: args.income,
        age: args.age,
        engagement: args.engagement,
    };
    let mut assessment = config.assessment;
    assessment.initial_inputs = inputs;

    let orchestrator = AssessmentOrchestrator::start(build_model(config, model_args), assessment)?;
    let state = orchestrator.settled().await;
    orchestrator.dispose();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        println!("{}", state.summary());
        if let Some(features) = &state.normalized_features {
            let [income, age, engagement] = features.values();
            println!(
                "normalized features: income {income:.4}, age {age:.4}, engagement {engagement:.4}"
            );
        }
    }
    Ok(())
}

pub(crate) async fn run_batch(
    config: &AppConfig,
    model_args: &ModelArgs,
    args: BatchArgs,
) -> Result<(), AppError> {
    let rows = read_applicants(BufReader::new(File::open(&args.input)?))?;
    info!(
        rows = rows.len(),
        input = %args.input.display(),
        "starting batch assessment"
    );

    let orchestrator =
        AssessmentOrchestrator::start(build_model(config, model_args), config.assessment)?;
    orchestrator.settled().await;
    let outcomes = assess_applicants(&orchestrator, &rows).await?;
    orchestrator.dispose();

    match &args.output {
        Some(path) => write_outcomes(BufWriter::new(File::create(path)?), &outcomes)?,
        None => write_outcomes(io::stdout().lock(), &outcomes)?,
    }
    Ok(())
}

pub(crate) fn run_model_check(config: &AppConfig, model_args: &ModelArgs) -> Result<(), AppError> {
    if let Some(probability) = model_args.fixed_probability {
        println!("fixed scoring backend, probability {probability:.3}");
        return Ok(());
    }

    let artifact = logistic_model(config).artifact()?;
    println!("{}", serde_json::to_string_pretty(&artifact)?);
    Ok(())
}
