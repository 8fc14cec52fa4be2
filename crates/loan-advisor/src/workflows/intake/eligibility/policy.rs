use super::config::EligibilityConfig;
use super::rules::EligibilitySignals;

pub const APPROVAL_RATIONALE: &str = "🎉 Congratulations! You are eligible for the loan. Based on your profile, here are your options...";
pub const DENIAL_RATIONALE: &str = "❌ Unfortunately, you don't meet the current eligibility criteria. Here's how you can improve...";

/// Eligible iff the credit score clears the minimum and income exceeds the EMI burden times the multiplier.
pub(crate) fn is_eligible(signals: &EligibilitySignals, config: &EligibilityConfig) -> bool {
    let emi_threshold = signals.emis.saturating_mul(config.emi_income_multiplier);
    signals.credit_score > config.minimum_credit_score && signals.income > emi_threshold
}

pub(crate) fn rationale_for(eligible: bool) -> &'static str {
    if eligible {
        APPROVAL_RATIONALE
    } else {
        DENIAL_RATIONALE
    }
}
