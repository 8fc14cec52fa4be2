use serde::Serialize;

use super::blueprint::SummaryLine;
use super::domain::{
    ApplicantRecord, DocumentSet, DocumentSlot, FieldSpec, TranscriptEntry, WizardPhase,
};
use super::eligibility::EligibilityVerdict;

/// Immutable view of an engine, published after every successful operation.
#[derive(Debug, Clone, Serialize)]
pub struct WizardSnapshot {
    pub phase: WizardPhase,
    pub position: usize,
    pub step_count: usize,
    pub current_field: Option<FieldSpec>,
    pub record: ApplicantRecord,
    pub summary: Vec<SummaryLine>,
    pub transcript: Vec<TranscriptEntry>,
    pub documents: DocumentStatus,
    pub processing: bool,
    pub can_evaluate: bool,
    pub verdict: Option<EligibilityVerdict>,
}

/// Presence flags for the required documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStatus {
    pub salary_slip: bool,
    pub aadhaar_card: bool,
}

impl From<&DocumentSet> for DocumentStatus {
    fn from(documents: &DocumentSet) -> Self {
        Self {
            salary_slip: documents.is_present(DocumentSlot::SalarySlip),
            aadhaar_card: documents.is_present(DocumentSlot::AadhaarCard),
        }
    }
}
