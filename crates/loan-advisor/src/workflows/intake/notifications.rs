use serde::{Deserialize, Serialize};

use super::domain::{DocumentSlot, FieldSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSeverity {
    Info,
    Critical,
}

/// Toast-style message handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub severity: NotificationSeverity,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub(crate) fn required_field() -> Self {
        Self {
            severity: NotificationSeverity::Critical,
            title: "Required Field".to_string(),
            description: "Please fill in this field before proceeding.".to_string(),
        }
    }

    pub(crate) fn invalid_number(field: &FieldSpec) -> Self {
        Self {
            severity: NotificationSeverity::Critical,
            title: "Invalid Number".to_string(),
            description: format!("{} must be a whole number.", field.label),
        }
    }

    pub(crate) fn document_uploaded(slot: DocumentSlot) -> Self {
        Self {
            severity: NotificationSeverity::Info,
            title: "File Uploaded".to_string(),
            description: format!("{} uploaded successfully!", slot.label()),
        }
    }

    pub(crate) fn missing_documents() -> Self {
        Self {
            severity: NotificationSeverity::Critical,
            title: "Missing Documents".to_string(),
            description: "Please upload both Salary Slip and Aadhaar Card.".to_string(),
        }
    }
}

/// Outbound hook for notifications. No engine state depends on delivery.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _notification: Notification) -> Result<(), NotifyError> {
        Ok(())
    }
}
