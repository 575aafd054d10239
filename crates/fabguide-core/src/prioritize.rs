use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{GuideId, GuideStep, MaintenanceGuide, StepId};

/// Order steps by descending historical repair count.
///
/// Steps without a count go after every counted step. The sort is stable, so
/// equal counts and uncounted steps keep their authored relative order.
pub fn prioritize_steps(steps: &[GuideStep]) -> Vec<GuideStep> {
    let mut ordered = steps.to_vec();
    ordered.sort_by(|a, b| compare_counts(a.history_repair_count, b.history_repair_count));
    ordered
}

fn compare_counts(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Hex SHA-256 over the guide version and step content.
pub fn guide_fingerprint(guide: &MaintenanceGuide) -> String {
    let mut hasher = Sha256::new();
    put_str(&mut hasher, guide.id.as_str());
    put_str(&mut hasher, &guide.version);
    put_len(&mut hasher, guide.steps.len());
    for step in &guide.steps {
        put_step(&mut hasher, step);
    }
    hex::encode(hasher.finalize())
}

// Every field is length- or tag-prefixed so adjacent fields cannot run together.
fn put_len(h: &mut Sha256, len: usize) {
    h.update((len as u64).to_le_bytes());
}

fn put_str(h: &mut Sha256, s: &str) {
    put_len(h, s.len());
    h.update(s.as_bytes());
}

fn put_opt(h: &mut Sha256, s: Option<&str>) {
    match s {
        Some(s) => {
            h.update([1u8]);
            put_str(h, s);
        }
        None => h.update([0u8]),
    }
}

fn put_list(h: &mut Sha256, items: &[String]) {
    put_len(h, items.len());
    for item in items {
        put_str(h, item);
    }
}

fn put_step(h: &mut Sha256, step: &GuideStep) {
    put_str(h, step.id.as_str());
    put_str(h, step.stage.label());
    put_str(h, &step.title);
    put_str(h, &step.description);
    put_opt(h, step.instruction.as_deref());
    put_opt(h, step.judgment_method.as_deref());
    put_opt(h, step.help_content.as_deref());
    put_opt(h, step.safety_warning.as_deref());
    put_list(h, &step.image_urls);
    put_list(h, &step.video_urls);
    put_list(h, &step.pdf_urls);
    put_opt(h, step.media_url.as_deref());
    put_opt(h, step.media_type.map(|k| k.label()));
    h.update([step.is_confirmation_required as u8]);
    match step.history_repair_count {
        Some(count) => {
            h.update([1u8]);
            h.update(count.to_le_bytes());
        }
        None => h.update([0u8]),
    }
    put_len(h, step.branches.len());
    for branch in &step.branches {
        put_str(h, &branch.label);
        put_str(h, branch.next_step_id.as_str());
    }
}

/// Technician-facing step order for one version of a guide.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrioritizedSequence {
    pub guide_id: GuideId,
    pub fingerprint: String,
    pub steps: Vec<GuideStep>,
}

impl PrioritizedSequence {
    pub fn for_guide(guide: &MaintenanceGuide) -> Self {
        Self {
            guide_id: guide.id.clone(),
            fingerprint: guide_fingerprint(guide),
            steps: prioritize_steps(&guide.steps),
        }
    }

    /// False once the guide's steps or version changed since this order was computed.
    pub fn is_current_for(&self, guide: &MaintenanceGuide) -> bool {
        self.guide_id == guide.id && self.fingerprint == guide_fingerprint(guide)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.steps.len().checked_sub(1)
    }

    pub fn get(&self, index: usize) -> Option<&GuideStep> {
        self.steps.get(index)
    }

    pub fn position_of(&self, step_id: &StepId) -> Option<usize> {
        self.steps.iter().position(|s| &s.id == step_id)
    }

    /// Ids of the steps up to and including `cursor`.
    pub fn visited_through(&self, cursor: usize) -> Vec<StepId> {
        self.steps.iter().take(cursor + 1).map(|s| s.id.clone()).collect()
    }
}
