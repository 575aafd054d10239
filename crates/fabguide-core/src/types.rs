use serde::{Deserialize, Serialize};

use crate::{ids::*, model::*};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    #[serde(rename = "type")]
    pub device_type: String,
    pub model: String,
    pub sub_model: String,
    pub serial_number: String,
    pub status: DeviceStatus,
    #[serde(default)]
    pub bound_sop_ids: Vec<GuideId>,
}

impl Device {
    pub fn binds(&self, guide_id: &GuideId) -> bool {
        self.bound_sop_ids.contains(guide_id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepBranch {
    pub label: String,
    pub next_step_id: StepId,
}

/// Opaque media locator attached to a step. Never interpreted, only passed on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuideStep {
    pub id: StepId,
    pub stage: ProcessStage,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub judgment_method: Option<String>,
    #[serde(default)]
    pub help_content: Option<String>,
    #[serde(default)]
    pub safety_warning: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub video_urls: Vec<String>,
    #[serde(default)]
    pub pdf_urls: Vec<String>,
    /// Legacy single attachment, kept for older SOP content.
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_type: Option<MediaKind>,
    #[serde(default)]
    pub is_confirmation_required: bool,
    #[serde(default)]
    pub history_repair_count: Option<u32>,
    #[serde(default)]
    pub branches: Vec<StepBranch>,
}

impl GuideStep {
    /// All media attached to the step, legacy attachment last.
    pub fn media(&self) -> Vec<MediaRef> {
        let mut out: Vec<MediaRef> = Vec::new();
        let groups = [
            (MediaKind::Image, &self.image_urls),
            (MediaKind::Video, &self.video_urls),
            (MediaKind::Pdf, &self.pdf_urls),
        ];
        for (kind, urls) in groups {
            out.extend(urls.iter().map(|url| MediaRef { kind, url: url.clone() }));
        }
        if let (Some(url), Some(kind)) = (&self.media_url, self.media_type) {
            if !out.iter().any(|m| &m.url == url) {
                out.push(MediaRef { kind, url: url.clone() });
            }
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceGuide {
    pub id: GuideId,
    pub device_id: DeviceId,
    pub fault_code: String,
    pub fault_category: String,
    #[serde(default)]
    pub operation_type: String,
    #[serde(default)]
    pub scope: String,
    pub fault_phenomenon: String,
    pub version: String,
    pub published: bool,
    #[serde(default)]
    pub total_occurrence_count: Option<u32>,
    #[serde(default)]
    pub steps: Vec<GuideStep>,
}

impl MaintenanceGuide {
    pub fn step(&self, step_id: &StepId) -> Option<&GuideStep> {
        self.steps.iter().find(|s| &s.id == step_id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordContext {
    pub device_id: DeviceId,
    pub fault_code: String,
    #[serde(default)]
    pub last_step_id: Option<StepId>,
    pub is_new_issue: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepairRecord {
    pub id: RecordId,
    pub guide_id: GuideId,
    pub engineer_id: EngineerId,
    pub started_at_unix: i64,
    #[serde(default)]
    pub ended_at_unix: Option<i64>,
    pub fault_reason: String,
    pub treatment: String,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub completed_steps: Vec<StepId>,
    pub status: RecordStatus,
    #[serde(default)]
    pub submission_source: Option<SubmissionSource>,
    #[serde(default)]
    pub context: Option<RecordContext>,
}

impl RepairRecord {
    pub fn is_ongoing(&self) -> bool {
        self.status == RecordStatus::Ongoing
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InquiryContext {
    pub fault_code: String,
    pub step_title: String,
    pub is_step_related: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepInquiry {
    pub id: InquiryId,
    pub engineer_id: EngineerId,
    pub guide_id: GuideId,
    pub step_id: StepId,
    pub device_id: DeviceId,
    pub question: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    pub status: InquiryStatus,
    pub created_at_unix: i64,
    pub is_new_issue: bool,
    #[serde(default)]
    pub context: Option<InquiryContext>,
}

/// The engineer driving a session and the assets they may work on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Technician {
    pub id: EngineerId,
    pub name: String,
    #[serde(default)]
    pub assigned_device_ids: Vec<DeviceId>,
}

impl Technician {
    pub fn is_assigned(&self, device_id: &DeviceId) -> bool {
        self.assigned_device_ids.contains(device_id)
    }
}
