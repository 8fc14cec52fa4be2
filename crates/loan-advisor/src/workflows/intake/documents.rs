use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::DocumentSlot;

/// File formats accepted at the upload boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Jpeg,
    Png,
}

impl DocumentFormat {
    pub fn mime(self) -> mime::Mime {
        match self {
            Self::Pdf => mime::APPLICATION_PDF,
            Self::Jpeg => mime::IMAGE_JPEG,
            Self::Png => mime::IMAGE_PNG,
        }
    }

    fn from_mime(candidate: &mime::Mime) -> Option<Self> {
        [Self::Pdf, Self::Jpeg, Self::Png]
            .into_iter()
            .find(|format| format.mime().essence_str() == candidate.essence_str())
    }
}

/// Opaque reference to an uploaded document. The core only tracks presence, never content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHandle {
    pub file_name: String,
    pub format: DocumentFormat,
}

impl DocumentHandle {
    /// Build a handle from a user supplied file name, rejecting anything but pdf/jpg/jpeg/png.
    pub fn from_file_name(file_name: impl Into<String>) -> Result<Self, DocumentError> {
        let file_name = file_name.into();
        let trimmed = file_name.trim();
        if trimmed.is_empty() {
            return Err(DocumentError::EmptyFileName);
        }

        let format = mime_guess::from_path(trimmed)
            .iter()
            .find_map(|candidate| DocumentFormat::from_mime(&candidate))
            .ok_or_else(|| DocumentError::UnsupportedFormat {
                file_name: trimmed.to_string(),
            })?;

        Ok(Self {
            file_name: trimmed.to_string(),
            format,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("document file name is empty")]
    EmptyFileName,
    #[error("unsupported document format for '{file_name}' (expected pdf, jpg, jpeg or png)")]
    UnsupportedFormat { file_name: String },
    #[error("processing {slot} failed: {reason}")]
    ProcessingFailed { slot: DocumentSlot, reason: String },
}

/// External verification step (OCR, validation) invoked once per uploaded document.
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    async fn process(
        &self,
        slot: DocumentSlot,
        handle: &DocumentHandle,
    ) -> Result<(), DocumentError>;
}

/// Stand-in processor that accepts every document after a fixed latency.
#[derive(Debug, Clone, Default)]
pub struct SimulatedDocumentProcessor {
    latency: Duration,
}

impl SimulatedDocumentProcessor {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

#[async_trait]
impl DocumentProcessor for SimulatedDocumentProcessor {
    async fn process(
        &self,
        slot: DocumentSlot,
        handle: &DocumentHandle,
    ) -> Result<(), DocumentError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        debug!(%slot, file = %handle.file_name, "document accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_supported_extensions() {
        let cases = [
            ("slip.pdf", DocumentFormat::Pdf),
            ("aadhaar.jpg", DocumentFormat::Jpeg),
            ("aadhaar.jpeg", DocumentFormat::Jpeg),
            ("scan.png", DocumentFormat::Png),
        ];
        for (name, expected) in cases {
            let handle = DocumentHandle::from_file_name(name).expect("supported format");
            assert_eq!(handle.format, expected, "{name}");
            assert_eq!(handle.file_name, name);
        }
    }

    #[test]
    fn rejects_unsupported_or_missing_names() {
        assert!(matches!(
            DocumentHandle::from_file_name("payslip.docx"),
            Err(DocumentError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            DocumentHandle::from_file_name("payslip"),
            Err(DocumentError::UnsupportedFormat { .. })
        ));
        assert_eq!(
            DocumentHandle::from_file_name("   "),
            Err(DocumentError::EmptyFileName)
        );
    }

    #[test]
    fn formats_map_to_mime_types() {
        assert_eq!(DocumentFormat::Pdf.mime(), mime::APPLICATION_PDF);
        assert_eq!(DocumentFormat::Png.mime().essence_str(), "image/png");
    }

    #[tokio::test]
    async fn simulated_processor_accepts_documents() {
        let processor = SimulatedDocumentProcessor::default();
        let handle = DocumentHandle::from_file_name("slip.pdf").expect("valid handle");
        processor
            .process(DocumentSlot::SalarySlip, &handle)
            .await
            .expect("simulated processing succeeds");
    }
}
