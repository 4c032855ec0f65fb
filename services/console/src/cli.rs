use crate::commands::{run_assess, run_batch, run_model_check, AssessArgs, BatchArgs};
use crate::infra::ModelArgs;
use crate::session::run_session;
use clap::{Parser, Subcommand};
use finrisk::config::AppConfig;
use finrisk::error::AppError;
use finrisk::telemetry;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "finrisk",
    about = "Assess consumer credit risk from income, age, and app engagement",
    version
)]
struct Cli {
    #[command(flatten)]
    model: ModelArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assess a single applicant and print the settled state
    Assess(AssessArgs),
    /// Assess every applicant in a CSV file
    Batch(BatchArgs),
    /// Adjust inputs interactively from stdin and watch the state stream
    Session,
    /// Validate the configured model artifact and print its metadata
    CheckModel,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    cli.model.apply(&mut config);

    telemetry::init(&config.telemetry)?;
    debug!(?config.environment, "configuration loaded");

    match cli.command {
        Command::Assess(args) => run_assess(&config, &cli.model, args).await,
        Command::Batch(args) => run_batch(&config, &cli.model, args).await,
        Command::Session => run_session(&config, &cli.model).await,
        Command::CheckModel => run_model_check(&config, &cli.model),
    }
}
