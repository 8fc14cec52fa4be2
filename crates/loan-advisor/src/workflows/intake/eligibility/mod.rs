mod config;
mod policy;
pub(crate) mod rules;

pub use config::{EligibilityConfig, NumericInputPolicy};
pub use policy::{APPROVAL_RATIONALE, DENIAL_RATIONALE};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{ApplicantRecord, FieldId};
use policy::{is_eligible, rationale_for};

/// Stateless gate mapping a completed applicant record to a verdict.
#[derive(Debug, Clone, Default)]
pub struct EligibilityEvaluator {
    config: EligibilityConfig,
}

impl EligibilityEvaluator {
    pub fn new(config: EligibilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EligibilityConfig {
        &self.config
    }

    /// Evaluate with numeric coercion regardless of the configured policy.
    pub fn evaluate(&self, record: &ApplicantRecord) -> EligibilityVerdict {
        self.verdict_from(&rules::coerce_signals(record))
    }

    /// Evaluate honouring the configured [`NumericInputPolicy`].
    pub fn try_evaluate(
        &self,
        record: &ApplicantRecord,
    ) -> Result<EligibilityVerdict, EligibilityError> {
        let signals = rules::read_signals(record, self.config.numeric_inputs)?;
        Ok(self.verdict_from(&signals))
    }

    fn verdict_from(&self, signals: &rules::EligibilitySignals) -> EligibilityVerdict {
        let eligible = is_eligible(signals, &self.config);
        info!(
            eligible,
            credit_score = signals.credit_score,
            income = signals.income,
            emis = signals.emis,
            "eligibility evaluated"
        );

        EligibilityVerdict {
            eligible,
            rationale: rationale_for(eligible).to_string(),
            coerced_fields: signals.coerced.clone(),
        }
    }
}

/// Evaluate a record against the default thresholds.
pub fn evaluate(record: &ApplicantRecord) -> EligibilityVerdict {
    EligibilityEvaluator::default().evaluate(record)
}

/// Outcome of the eligibility gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    pub eligible: bool,
    pub rationale: String,
    /// Numeric fields that could not be parsed and were read as zero.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coerced_fields: Vec<FieldId>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EligibilityError {
    #[error("{field} must be a whole number, found '{value}'")]
    InvalidNumericInput { field: FieldId, value: String },
}
