use serde::Serialize;

use super::domain::{ApplicantRecord, FieldId, FieldKind, FieldSpec};

pub const LOAN_TYPES: &[&str] = &["Personal Loan", "Home Loan", "Car Loan", "Business Loan"];

pub const UPLOAD_ANNOUNCEMENT: &str = "Great! Now I need you to upload your documents for verification. Please upload your Salary Slip and Aadhaar Card.";
pub const PROCESSING_NOTICE: &str = "Processing your application... Running OCR on documents, validating information, and checking loan eligibility...";
pub const DOCUMENTS_PROCESSED_NOTICE: &str =
    "✅ Documents processed successfully! Analyzing your loan eligibility...";
pub const EVALUATION_CANCELLED_NOTICE: &str =
    "Eligibility check cancelled. Your details and documents are saved, so you can run it again.";
pub const EVALUATION_FAILED_NOTICE: &str =
    "We couldn't finish checking your application. Please review your documents and try again.";

/// Fixed, ordered sequence of fields collected before the document phase.
#[derive(Debug, Clone)]
pub struct IntakeBlueprint {
    fields: Vec<FieldSpec>,
}

impl IntakeBlueprint {
    pub fn standard() -> Self {
        Self {
            fields: standard_fields(),
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn step_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_at(&self, position: usize) -> Option<&FieldSpec> {
        self.fields.get(position)
    }

    pub fn position_of(&self, field: FieldId) -> Option<usize> {
        self.fields.iter().position(|spec| spec.id == field)
    }

    pub fn field(&self, field: FieldId) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.id == field)
    }

    /// Labelled values for every field that has been filled in, in collection order.
    pub fn summary(&self, record: &ApplicantRecord) -> Vec<SummaryLine> {
        self.fields
            .iter()
            .filter(|spec| record.is_set(spec.id))
            .map(|spec| SummaryLine {
                field: spec.id,
                label: spec.label,
                value: record.get(spec.id).to_string(),
            })
            .collect()
    }
}

impl Default for IntakeBlueprint {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryLine {
    pub field: FieldId,
    pub label: &'static str,
    pub value: String,
}

fn standard_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec {
            id: FieldId::Name,
            label: "Full Name",
            kind: FieldKind::Text,
            prompt: "What's your full name?",
        },
        FieldSpec {
            id: FieldId::Age,
            label: "Age",
            kind: FieldKind::Number,
            prompt: "How old are you?",
        },
        FieldSpec {
            id: FieldId::Income,
            label: "Monthly Income (₹)",
            kind: FieldKind::Number,
            prompt: "What's your monthly income in rupees?",
        },
        FieldSpec {
            id: FieldId::LoanType,
            label: "Loan Type",
            kind: FieldKind::Choice {
                options: LOAN_TYPES,
            },
            prompt: "What type of loan are you applying for?",
        },
        FieldSpec {
            id: FieldId::LoanAmount,
            label: "Loan Amount (₹)",
            kind: FieldKind::Number,
            prompt: "How much loan amount do you need?",
        },
        FieldSpec {
            id: FieldId::Emis,
            label: "Existing EMIs (₹)",
            kind: FieldKind::Number,
            prompt: "What's your total existing EMI amount per month?",
        },
        FieldSpec {
            id: FieldId::CreditScore,
            label: "Credit Score",
            kind: FieldKind::Number,
            prompt: "What's your current credit score (300-850)?",
        },
        FieldSpec {
            id: FieldId::PanNumber,
            label: "PAN Number",
            kind: FieldKind::Text,
            prompt: "What's your PAN number?",
        },
    ]
}
