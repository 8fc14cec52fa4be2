use chrono::Utc;
use serde::Serialize;

use super::domain::{TranscriptEntry, TranscriptRole};

/// Append-only conversation log. Entries are never edited, reordered or removed.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub(crate) fn advisor(&mut self, content: impl Into<String>) {
        self.push(TranscriptRole::Advisor, content.into());
    }

    pub(crate) fn applicant(&mut self, content: impl Into<String>) {
        self.push(TranscriptRole::Applicant, content.into());
    }

    fn push(&mut self, role: TranscriptRole, content: String) {
        // Wall clock can step backwards; keep timestamps non-decreasing.
        let now = Utc::now();
        let created_at = match self.entries.last() {
            Some(previous) if previous.created_at > now => previous.created_at,
            _ => now,
        };
        self.entries.push(TranscriptEntry {
            role,
            content,
            created_at,
        });
    }
}
