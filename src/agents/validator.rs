use async_trait::async_trait;
use tracing::info;

use crate::types::{CandidateRecord, ValidationOutcome};
use crate::validation;

use super::{Agent, AgentError};

/// Deterministic schema check; no model call involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatorAgent;

impl ValidatorAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Agent for ValidatorAgent {
    type Input = CandidateRecord;
    type Output = ValidationOutcome;

    async fn execute(&self, record: &Self::Input) -> Result<Self::Output, AgentError> {
        let outcome = validation::validate(record);
        match &outcome {
            ValidationOutcome::Accepted(_) => info!("ValidatorAgent: record accepted"),
            ValidationOutcome::Rejected(r) => info!(
                missing_site_meta = r.missing_site_meta_data_keys.len(),
                missing_technical = r.missing_technical_data_keys.len(),
                incomplete = r.incomplete_chiller_data_keys.len(),
                "ValidatorAgent: record rejected"
            ),
        }
        Ok(outcome)
    }
}
