//! Builds the records a procedure session hands to the record sink.
//!
//! Everything here is pure: callers supply the engine context and the
//! technician's input, and get back a validated value or a `ValidationFailed`.
//! Identical input is never treated as a duplicate at this layer.

use serde::{Deserialize, Serialize};

use crate::{
    Device, EngineError, EngineerId, GuideStep, InquiryContext, InquiryId, InquiryStatus, MaintenanceGuide,
    PrioritizedSequence, RecordContext, RecordId, RecordStatus, RepairRecord, StepId, StepInquiry, SubmissionSource,
};

/// Upper bound on photos attached to a closure record.
pub const MAX_CLOSURE_PHOTOS: usize = 4;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClosureDraft {
    pub treatment: String,
    #[serde(default)]
    pub fault_reason: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    /// Checked by the technician when the fault is not covered by the SOP.
    #[serde(default)]
    pub is_new_issue: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InquiryDraft {
    pub question: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    /// False when the concern is unrelated to any step.
    #[serde(default = "default_true")]
    pub is_step_related: bool,
}

fn default_true() -> bool {
    true
}

impl Default for InquiryDraft {
    fn default() -> Self {
        Self { question: String::new(), photo_url: None, is_step_related: true }
    }
}

/// Engine state the closure record is derived from.
#[derive(Clone, Copy, Debug)]
pub struct ClosureContext<'a> {
    pub engineer_id: &'a EngineerId,
    pub device: &'a Device,
    pub guide: &'a MaintenanceGuide,
    pub sequence: &'a PrioritizedSequence,
    pub cursor: usize,
    pub open_record: Option<&'a RepairRecord>,
    pub started_at_unix: i64,
    pub now_unix: i64,
}

#[derive(Clone, Copy, Debug)]
pub struct InquiryRecordingContext<'a> {
    pub engineer_id: &'a EngineerId,
    pub device: &'a Device,
    pub guide: &'a MaintenanceGuide,
    pub current_step: &'a GuideStep,
    pub now_unix: i64,
}

pub fn build_repair_record(
    ctx: &ClosureContext<'_>,
    source: SubmissionSource,
    draft: &ClosureDraft,
) -> Result<RepairRecord, EngineError> {
    let treatment = draft.treatment.trim();
    if treatment.is_empty() {
        return Err(EngineError::validation("treatment", "describe the action taken"));
    }
    if draft.photos.len() > MAX_CLOSURE_PHOTOS {
        return Err(EngineError::validation(
            "photos",
            format!("at most {MAX_CLOSURE_PHOTOS} photos, got {}", draft.photos.len()),
        ));
    }
    check_linkage(ctx.device, ctx.guide, ctx.sequence)?;
    let current = ctx
        .sequence
        .get(ctx.cursor)
        .ok_or_else(|| EngineError::validation("cursor", format!("step {} out of range", ctx.cursor)))?;

    if let Some(open) = ctx.open_record {
        if !open.is_ongoing() || &open.engineer_id != ctx.engineer_id || open.guide_id != ctx.guide.id {
            return Err(EngineError::validation("open_record", format!("record {} cannot be closed here", open.id)));
        }
    }

    let visited = ctx.sequence.visited_through(ctx.cursor);
    let completed_steps = match ctx.open_record {
        Some(open) => merge_completed(&open.completed_steps, visited),
        None => visited,
    };

    let fault_reason = draft
        .fault_reason
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(&ctx.guide.fault_phenomenon)
        .to_string();

    Ok(RepairRecord {
        id: ctx.open_record.map(|r| r.id.clone()).unwrap_or_else(RecordId::new),
        guide_id: ctx.guide.id.clone(),
        engineer_id: ctx.engineer_id.clone(),
        started_at_unix: ctx.open_record.map(|r| r.started_at_unix).unwrap_or(ctx.started_at_unix),
        ended_at_unix: Some(ctx.now_unix),
        fault_reason,
        treatment: treatment.to_string(),
        photos: draft.photos.clone(),
        completed_steps,
        status: RecordStatus::Completed,
        submission_source: Some(source),
        context: Some(RecordContext {
            device_id: ctx.device.id.clone(),
            fault_code: ctx.guide.fault_code.clone(),
            last_step_id: Some(current.id.clone()),
            is_new_issue: draft.is_new_issue,
        }),
    })
}

pub fn build_inquiry(ctx: &InquiryRecordingContext<'_>, draft: &InquiryDraft) -> Result<StepInquiry, EngineError> {
    let question = draft.question.trim();
    if question.is_empty() {
        return Err(EngineError::validation("question", "describe the problem"));
    }
    if ctx.guide.device_id != ctx.device.id {
        return Err(EngineError::validation("guide", format!("{} does not belong to {}", ctx.guide.id, ctx.device.id)));
    }
    if ctx.guide.step(&ctx.current_step.id).is_none() {
        return Err(EngineError::validation("step", format!("{} is not part of {}", ctx.current_step.id, ctx.guide.id)));
    }

    let step_id = if draft.is_step_related { ctx.current_step.id.clone() } else { StepId::unknown() };

    Ok(StepInquiry {
        id: InquiryId::new(),
        engineer_id: ctx.engineer_id.clone(),
        guide_id: ctx.guide.id.clone(),
        step_id,
        device_id: ctx.device.id.clone(),
        question: question.to_string(),
        photo_url: draft.photo_url.clone().filter(|p| !p.trim().is_empty()),
        status: InquiryStatus::Pending,
        created_at_unix: ctx.now_unix,
        is_new_issue: !draft.is_step_related,
        context: Some(InquiryContext {
            fault_code: ctx.guide.fault_code.clone(),
            step_title: ctx.current_step.title.clone(),
            is_step_related: draft.is_step_related,
        }),
    })
}

fn check_linkage(device: &Device, guide: &MaintenanceGuide, sequence: &PrioritizedSequence) -> Result<(), EngineError> {
    if guide.device_id != device.id {
        return Err(EngineError::validation("guide", format!("{} does not belong to {}", guide.id, device.id)));
    }
    if sequence.guide_id != guide.id {
        return Err(EngineError::validation("sequence", format!("computed for {}, not {}", sequence.guide_id, guide.id)));
    }
    Ok(())
}

/// Existing ids first, then newly visited ones, so the count never shrinks.
fn merge_completed(existing: &[StepId], visited: Vec<StepId>) -> Vec<StepId> {
    let mut merged = existing.to_vec();
    for id in visited {
        if !merged.contains(&id) {
            merged.push(id);
        }
    }
    merged
}
