mod cli;
mod commands;
mod infra;
mod session;

use finrisk::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
