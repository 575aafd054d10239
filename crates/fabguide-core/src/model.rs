use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Active,
    Maintenance,
    Offline,
}

/// Fixed process stages an SOP step belongs to, in procedure order.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStage {
    Preparation,
    Diagnosis,
    RepairExecution,
    Verification,
    Closeout,
}

impl ProcessStage {
    pub const ALL: [ProcessStage; 5] = [
        ProcessStage::Preparation,
        ProcessStage::Diagnosis,
        ProcessStage::RepairExecution,
        ProcessStage::Verification,
        ProcessStage::Closeout,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ProcessStage::Preparation => "preparation",
            ProcessStage::Diagnosis => "diagnosis",
            ProcessStage::RepairExecution => "repair-execution",
            ProcessStage::Verification => "verification",
            ProcessStage::Closeout => "closeout",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Ongoing,
    Completed,
}

/// How a procedure session reached closure.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubmissionSource {
    /// Closed early by the technician.
    #[serde(rename = "CLOSE")]
    Close,
    /// Passed the final step.
    #[serde(rename = "PASS")]
    Pass,
}

impl SubmissionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionSource::Close => "CLOSE",
            SubmissionSource::Pass => "PASS",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InquiryStatus {
    Pending,
    Resolved,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Pdf,
}

impl MediaKind {
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Pdf => "pdf",
        }
    }
}
