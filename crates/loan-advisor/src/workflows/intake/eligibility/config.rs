use serde::{Deserialize, Serialize};

/// How non-numeric input in a numeric field is treated during evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericInputPolicy {
    /// Unparseable values count as zero and are listed on the verdict.
    #[default]
    Coerce,
    /// Unparseable values are rejected with an error.
    Reject,
}

/// Thresholds for the eligibility gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityConfig {
    pub minimum_credit_score: i64,
    pub emi_income_multiplier: i64,
    #[serde(default)]
    pub numeric_inputs: NumericInputPolicy,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            minimum_credit_score: 650,
            emi_income_multiplier: 3,
            numeric_inputs: NumericInputPolicy::Coerce,
        }
    }
}
