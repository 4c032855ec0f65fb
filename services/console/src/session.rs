use crate::infra::{build_model, parse_engagement, ModelArgs};
use finrisk::assessment::{AssessmentOrchestrator, AssessmentState, ErrorInfo};
use finrisk::config::AppConfig;
use finrisk::error::AppError;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const OBSERVER_DRAIN: Duration = Duration::from_millis(500);

#[derive(Debug, PartialEq)]
enum SessionCommand {
    Income(f64),
    Age(u32),
    Engagement(f64),
    Reload,
    Quit,
}

fn parse_command(line: &str) -> Result<SessionCommand, String> {
    let mut parts = line.split_whitespace();
    let keyword = parts.next().unwrap_or_default().to_ascii_lowercase();
    let value = parts.next();

    match (keyword.as_str(), value) {
        ("income", Some(raw)) => raw
            .parse()
            .map(SessionCommand::Income)
            .map_err(|err| format!("invalid income '{raw}' ({err})")),
        ("age", Some(raw)) => raw
            .parse()
            .map(SessionCommand::Age)
            .map_err(|err| format!("invalid age '{raw}' ({err})")),
        ("engagement", Some(raw)) => parse_engagement(raw).map(SessionCommand::Engagement),
        ("reload", None) => Ok(SessionCommand::Reload),
        ("quit" | "exit", None) => Ok(SessionCommand::Quit),
        _ => Err(format!(
            "unrecognized command '{}'; expected income|age|engagement <value>, reload, or quit",
            line.trim()
        )),
    }
}

/// Emit a summary for every snapshot that is not loading until the
/// orchestrator's state channel closes.
async fn observe(mut updates: watch::Receiver<AssessmentState>, mut emit: impl FnMut(String)) {
    loop {
        let state = AssessmentState::clone(&updates.borrow_and_update());
        if !state.is_loading {
            emit(state.summary());
        }
        if updates.changed().await.is_err() {
            break;
        }
    }
}

/// Let the observer print what is already published, then stop it.
async fn drain<T>(mut observer: JoinHandle<T>) -> Option<T> {
    match tokio::time::timeout(OBSERVER_DRAIN, &mut observer).await {
        Ok(joined) => joined.ok(),
        Err(_) => {
            debug!("observer still attached after dispose, aborting");
            observer.abort();
            None
        }
    }
}

/// Feed stdin commands into the orchestrator while an observer task prints
/// every settled snapshot.
pub(crate) async fn run_session(
    config: &AppConfig,
    model_args: &ModelArgs,
) -> Result<(), AppError> {
    let orchestrator =
        AssessmentOrchestrator::start(build_model(config, model_args), config.assessment)?;

    let observer = tokio::spawn(observe(orchestrator.subscribe(), |line| {
        println!("{line}")
    }));

    println!("commands: income <value> | age <value> | engagement <value> | reload | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let outcome = match parse_command(&line) {
            Ok(SessionCommand::Income(income)) => orchestrator.set_income(income),
            Ok(SessionCommand::Age(age)) => orchestrator.set_age(age),
            Ok(SessionCommand::Engagement(engagement)) => orchestrator.set_engagement(engagement),
            Ok(SessionCommand::Reload) => orchestrator.reload_model(),
            Ok(SessionCommand::Quit) => break,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };
        if let Err(err) = outcome {
            let info = ErrorInfo::from(&err);
            warn!(kind = info.kind.label(), "session command rejected");
            eprintln!("{}", info.message);
        }
    }

    orchestrator.dispose();
    drop(orchestrator);
    drain(observer).await;
    Ok(())
}
