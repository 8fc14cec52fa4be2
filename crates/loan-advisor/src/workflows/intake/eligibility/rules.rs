use tracing::warn;

use super::super::domain::{ApplicantRecord, FieldId};
use super::config::NumericInputPolicy;
use super::EligibilityError;

pub(crate) struct EligibilitySignals {
    pub credit_score: i64,
    pub income: i64,
    pub emis: i64,
    pub coerced: Vec<FieldId>,
}

pub(crate) fn read_signals(
    record: &ApplicantRecord,
    policy: NumericInputPolicy,
) -> Result<EligibilitySignals, EligibilityError> {
    match policy {
        NumericInputPolicy::Coerce => Ok(coerce_signals(record)),
        NumericInputPolicy::Reject => Ok(EligibilitySignals {
            credit_score: strict_integer(record, FieldId::CreditScore)?,
            income: strict_integer(record, FieldId::Income)?,
            emis: strict_integer(record, FieldId::Emis)?,
            coerced: Vec::new(),
        }),
    }
}

pub(crate) fn coerce_signals(record: &ApplicantRecord) -> EligibilitySignals {
    let mut coerced = Vec::new();
    let mut read = |field: FieldId| {
        let raw = record.get(field);
        parse_leading_integer(raw).unwrap_or_else(|| {
            warn!(%field, value = raw, "non-numeric input treated as zero");
            coerced.push(field);
            0
        })
    };

    let credit_score = read(FieldId::CreditScore);
    let income = read(FieldId::Income);
    let emis = read(FieldId::Emis);

    EligibilitySignals {
        credit_score,
        income,
        emis,
        coerced,
    }
}

fn strict_integer(record: &ApplicantRecord, field: FieldId) -> Result<i64, EligibilityError> {
    let raw = record.get(field);
    parse_strict_integer(raw).ok_or_else(|| EligibilityError::InvalidNumericInput {
        field,
        value: raw.to_string(),
    })
}

/// Parses the integer prefix of `raw`: leading whitespace and an optional sign are allowed and
/// anything after the digits is ignored, so `"12.5"` reads as 12. Saturates instead of overflowing.
pub(crate) fn parse_leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    if digits_end == 0 {
        return None;
    }

    let magnitude = unsigned[..digits_end].bytes().fold(0i64, |acc, digit| {
        acc.saturating_mul(10)
            .saturating_add(i64::from(digit - b'0'))
    });

    Some(if negative { -magnitude } else { magnitude })
}

/// Whole-string integer parse, used when coercion is disabled.
pub(crate) fn parse_strict_integer(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}
