//! CSV batch assessment driven through the orchestrator.
//!
//! Input columns: `applicant_id,income,age,engagement`.
//! Output columns: `applicant_id,probability,decision,error`.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assessment::{AssessmentOrchestrator, Decision, OrchestratorError, RawInputs};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApplicantRow {
    pub applicant_id: String,
    pub income: f64,
    pub age: u32,
    pub engagement: f64,
}

impl ApplicantRow {
    pub fn inputs(&self) -> RawInputs {
        RawInputs {
            income: self.income,
            age: self.age,
            engagement: self.engagement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub applicant_id: String,
    pub probability: Option<f32>,
    pub decision: Option<Decision>,
    pub error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("invalid applicant CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write batch outcomes: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

pub fn read_applicants<R: Read>(reader: R) -> Result<Vec<ApplicantRow>, BatchError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let rows = csv_reader
        .deserialize()
        .collect::<Result<Vec<ApplicantRow>, _>>()?;
    Ok(rows)
}

/// Assess each row in order, waiting for each cycle to settle before the next.
///
/// A failed cycle yields an outcome carrying only the error, never the stale
/// result of the previous applicant.
pub async fn assess_applicants(
    orchestrator: &AssessmentOrchestrator,
    rows: &[ApplicantRow],
) -> Result<Vec<BatchOutcome>, BatchError> {
    let mut outcomes = Vec::with_capacity(rows.len());

    for row in rows {
        orchestrator.set_inputs(row.inputs())?;
        let state = orchestrator.settled().await;

        let outcome = match (&state.error, &state.result) {
            (Some(error), _) => BatchOutcome {
                applicant_id: row.applicant_id.clone(),
                probability: None,
                decision: None,
                error: Some(format!("{}: {}", error.kind.label(), error.message)),
            },
            (None, Some(result)) => BatchOutcome {
                applicant_id: row.applicant_id.clone(),
                probability: Some(result.probability),
                decision: Some(result.decision),
                error: None,
            },
            (None, None) => BatchOutcome {
                applicant_id: row.applicant_id.clone(),
                probability: None,
                decision: None,
                error: Some("assessment did not complete".to_string()),
            },
        };
        debug!(
            applicant = %outcome.applicant_id,
            decision = ?outcome.decision,
            "batch row assessed"
        );
        outcomes.push(outcome);
    }

    info!(rows = outcomes.len(), "batch assessment complete");
    Ok(outcomes)
}

pub fn write_outcomes<W: Write>(writer: W, outcomes: &[BatchOutcome]) -> Result<(), BatchError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for outcome in outcomes {
        csv_writer.serialize(outcome)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_trimmed_rows() {
        let data =
            "applicant_id, income, age, engagement\na-1, 120000, 35, 0.8\na-2,30000,22,0.2\n";
        let rows = read_applicants(data.as_bytes()).expect("rows parse");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].applicant_id, "a-1");
        assert_eq!(
            rows[1].inputs(),
            RawInputs {
                income: 30_000.0,
                age: 22,
                engagement: 0.2,
            }
        );
    }

    #[test]
    fn rejects_non_numeric_age() {
        let data = "applicant_id,income,age,engagement\na-1,120000,old,0.8\n";
        let err = read_applicants(data.as_bytes()).expect_err("bad age");
        assert!(matches!(err, BatchError::Csv(_)));
    }

    #[test]
    fn writes_decision_labels_and_blank_optionals() {
        let outcomes = vec![
            BatchOutcome {
                applicant_id: "a-1".to_string(),
                probability: Some(0.85),
                decision: Some(Decision::Approved),
                error: None,
            },
            BatchOutcome {
                applicant_id: "a-2".to_string(),
                probability: None,
                decision: None,
                error: Some("inference: model is not loaded".to_string()),
            },
        ];
        let mut buffer = Vec::new();
        write_outcomes(&mut buffer, &outcomes).expect("writes");
        let text = String::from_utf8(buffer).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "applicant_id,probability,decision,error");
        assert_eq!(lines[1], "a-1,0.85,approved,");
        assert_eq!(lines[2], "a-2,,,inference: model is not loaded");
    }
}
