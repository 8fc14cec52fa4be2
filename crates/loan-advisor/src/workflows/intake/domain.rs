use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::documents::DocumentHandle;

/// Identifier for every attribute collected during intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldId {
    Name,
    Age,
    Income,
    LoanType,
    LoanAmount,
    Emis,
    CreditScore,
    PanNumber,
}

impl FieldId {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::Name,
            Self::Age,
            Self::Income,
            Self::LoanType,
            Self::LoanAmount,
            Self::Emis,
            Self::CreditScore,
            Self::PanNumber,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Age => "age",
            Self::Income => "income",
            Self::LoanType => "loanType",
            Self::LoanAmount => "loanAmount",
            Self::Emis => "emis",
            Self::CreditScore => "creditScore",
            Self::PanNumber => "panNumber",
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FieldId {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ordered()
            .into_iter()
            .find(|id| id.key() == raw.trim())
            .ok_or_else(|| ValidationError::UnknownField(raw.to_string()))
    }
}

/// Input widget the presentation layer should render for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Choice { options: &'static [&'static str] },
}

/// One step of the fixed collection sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub id: FieldId,
    pub label: &'static str,
    pub kind: FieldKind,
    pub prompt: &'static str,
}

impl FieldSpec {
    pub fn options(&self) -> &'static [&'static str] {
        match self.kind {
            FieldKind::Choice { options } => options,
            FieldKind::Text | FieldKind::Number => &[],
        }
    }

    pub fn placeholder(&self) -> String {
        match self.kind {
            FieldKind::Choice { .. } => format!("Select {}", self.label),
            FieldKind::Text | FieldKind::Number => {
                format!("Enter your {}", self.label.to_lowercase())
            }
        }
    }
}

/// Values captured from the applicant, keyed by field. An empty string means unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantRecord {
    values: BTreeMap<FieldId, String>,
}

impl ApplicantRecord {
    pub fn empty() -> Self {
        Self {
            values: FieldId::ordered()
                .into_iter()
                .map(|id| (id, String::new()))
                .collect(),
        }
    }

    pub fn get(&self, field: FieldId) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn is_set(&self, field: FieldId) -> bool {
        !self.get(field).is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &str)> {
        self.values.iter().map(|(id, value)| (*id, value.as_str()))
    }

    pub(crate) fn set(&mut self, field: FieldId, value: String) {
        self.values.insert(field, value);
    }
}

impl<S: Into<String>> FromIterator<(FieldId, S)> for ApplicantRecord {
    fn from_iter<I: IntoIterator<Item = (FieldId, S)>>(iter: I) -> Self {
        let mut record = Self::empty();
        for (field, value) in iter {
            record.set(field, value.into());
        }
        record
    }
}

/// Who authored a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptRole {
    Advisor,
    Applicant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: TranscriptRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// The two documents required before eligibility can be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentSlot {
    SalarySlip,
    AadhaarCard,
}

impl DocumentSlot {
    pub const fn ordered() -> [Self; 2] {
        [Self::SalarySlip, Self::AadhaarCard]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::SalarySlip => "salarySlip",
            Self::AadhaarCard => "aadhaarCard",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::SalarySlip => "Salary Slip",
            Self::AadhaarCard => "Aadhaar Card",
        }
    }
}

impl fmt::Display for DocumentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DocumentSlot {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ordered()
            .into_iter()
            .find(|slot| slot.key() == raw.trim())
            .ok_or_else(|| ValidationError::UnknownDocumentSlot(raw.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSet {
    salary_slip: Option<DocumentHandle>,
    aadhaar_card: Option<DocumentHandle>,
}

impl DocumentSet {
    pub fn get(&self, slot: DocumentSlot) -> Option<&DocumentHandle> {
        match slot {
            DocumentSlot::SalarySlip => self.salary_slip.as_ref(),
            DocumentSlot::AadhaarCard => self.aadhaar_card.as_ref(),
        }
    }

    pub fn is_present(&self, slot: DocumentSlot) -> bool {
        self.get(slot).is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    pub fn missing(&self) -> Vec<DocumentSlot> {
        DocumentSlot::ordered()
            .into_iter()
            .filter(|slot| !self.is_present(*slot))
            .collect()
    }

    pub fn present(&self) -> Vec<(DocumentSlot, DocumentHandle)> {
        DocumentSlot::ordered()
            .into_iter()
            .filter_map(|slot| self.get(slot).map(|handle| (slot, handle.clone())))
            .collect()
    }

    pub(crate) fn set(&mut self, slot: DocumentSlot, handle: DocumentHandle) {
        match slot {
            DocumentSlot::SalarySlip => self.salary_slip = Some(handle),
            DocumentSlot::AadhaarCard => self.aadhaar_card = Some(handle),
        }
    }
}

/// Coarse lifecycle of a single intake conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WizardPhase {
    Collecting { position: usize },
    AwaitingDocuments,
    Evaluating,
    Complete,
}

impl WizardPhase {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Collecting { .. } => "collecting",
            Self::AwaitingDocuments => "awaiting_documents",
            Self::Evaluating => "evaluating",
            Self::Complete => "complete",
        }
    }
}

/// Rejections raised while collecting field values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("required field missing: {field}")]
    RequiredFieldMissing { field: FieldId },
    #[error("{field} must be a whole number, found '{value}'")]
    InvalidNumber { field: FieldId, value: String },
    #[error("field {field} can no longer be edited")]
    FieldLocked { field: FieldId },
    #[error("all fields have already been collected")]
    CollectionFinished,
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("unknown document slot '{0}'")]
    UnknownDocumentSlot(String),
}

/// Rejections raised when an operation runs in the wrong phase.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("documents missing: {}", join_slots(.missing))]
    DocumentsMissing { missing: Vec<DocumentSlot> },
    #[error("document upload is not open (current phase: {phase})")]
    UploadPhaseInactive { phase: &'static str },
    #[error("an eligibility evaluation is already in progress")]
    EvaluationInProgress,
    #[error("eligibility has already been evaluated")]
    AlreadyComplete,
    #[error("no eligibility evaluation is in progress")]
    NotEvaluating,
    #[error("documents must be verified before eligibility is analysed")]
    DocumentsUnverified,
}

fn join_slots(slots: &[DocumentSlot]) -> String {
    slots
        .iter()
        .map(|slot| slot.key())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_ids_parse_from_their_keys() {
        for id in FieldId::ordered() {
            assert_eq!(id.key().parse::<FieldId>(), Ok(id));
        }
        assert_eq!(
            "salary".parse::<FieldId>(),
            Err(ValidationError::UnknownField("salary".to_string()))
        );
    }

    #[test]
    fn empty_record_has_every_field_unset() {
        let record = ApplicantRecord::empty();
        assert_eq!(record.iter().count(), 8);
        assert!(FieldId::ordered().iter().all(|id| !record.is_set(*id)));
    }

    #[test]
    fn record_serializes_with_camel_case_keys() {
        let record: ApplicantRecord = [(FieldId::CreditScore, "700")].into_iter().collect();
        let json = serde_json::to_value(&record).expect("record serializes");
        assert_eq!(json["creditScore"], "700");
        assert_eq!(json["loanType"], "");
    }

    #[test]
    fn missing_documents_are_listed_in_slot_order() {
        let documents = DocumentSet::default();
        assert_eq!(
            documents.missing(),
            vec![DocumentSlot::SalarySlip, DocumentSlot::AadhaarCard]
        );
        let err = PreconditionError::DocumentsMissing {
            missing: documents.missing(),
        };
        assert_eq!(err.to_string(), "documents missing: salarySlip, aadhaarCard");
    }

    #[test]
    fn choice_fields_expose_placeholder_and_options() {
        let spec = FieldSpec {
            id: FieldId::LoanType,
            label: "Loan Type",
            kind: FieldKind::Choice {
                options: &["Home Loan"],
            },
            prompt: "What type of loan are you applying for?",
        };
        assert_eq!(spec.placeholder(), "Select Loan Type");
        assert_eq!(spec.options(), &["Home Loan"]);
    }
}
