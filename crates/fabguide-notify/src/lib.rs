use std::sync::{Arc, Mutex};

use fabguide_catalog::{CatalogResult, RecordSink};
use fabguide_core::{InquiryId, RepairRecord, StepInquiry};

/// Markdown notice for a stored repair record.
pub fn format_closure_notice(record: &RepairRecord) -> String {
    let mut s = String::new();
    s.push_str(&format!("# REPAIR: {}\n\n", record.id.as_str()));
    if let Some(ctx) = &record.context {
        s.push_str(&format!("**Device:** {}\n", ctx.device_id));
        s.push_str(&format!("**Fault code:** {}\n", ctx.fault_code));
    }
    s.push_str(&format!("**Guide:** {}\n", record.guide_id));
    s.push_str(&format!("**Engineer:** {}\n\n", record.engineer_id));
    s.push_str(&format!("**Fault reason:** {}\n\n", record.fault_reason));
    s.push_str(&format!("**Treatment:** {}\n\n", record.treatment));
    s.push_str("## Completed steps\n");
    for (i, step) in record.completed_steps.iter().enumerate() {
        s.push_str(&format!("- [{}] {}\n", i + 1, step));
    }
    s.push('\n');
    let source = record.submission_source.map(|src| src.as_str()).unwrap_or("-");
    s.push_str(&format!("**Closed via:** {source}\n"));
    if record.context.as_ref().is_some_and(|c| c.is_new_issue) {
        s.push_str("**New issue:** yes\n");
    }
    s
}

/// Markdown notice for a newly raised inquiry.
pub fn format_inquiry_notice(inquiry: &StepInquiry) -> String {
    let mut s = String::new();
    s.push_str(&format!("# INQUIRY: {}\n\n", inquiry.id.as_str()));
    s.push_str(&format!("**Device:** {}\n", inquiry.device_id));
    s.push_str(&format!("**Guide:** {}\n", inquiry.guide_id));
    match &inquiry.context {
        Some(ctx) if ctx.is_step_related => {
            s.push_str(&format!("**Step:** {} ({})\n\n", inquiry.step_id, ctx.step_title))
        }
        _ => s.push_str(&format!("**Step:** {}\n\n", inquiry.step_id)),
    }
    s.push_str(&format!("**Question:** {}\n", inquiry.question));
    if let Some(photo) = &inquiry.photo_url {
        s.push_str(&format!("\n**Photo:** {photo}\n"));
    }
    s
}

/// Hand-off point for notices about emitted records.
pub trait Notifier: Send + Sync {
    fn notify(&self, subject: &str, body_md: &str) -> anyhow::Result<()>;
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, subject: &str, body_md: &str) -> anyhow::Result<()> {
        (**self).notify(subject, body_md)
    }
}

/// Default notifier: logs the notice.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, subject: &str, body_md: &str) -> anyhow::Result<()> {
        tracing::info!(subject, body = body_md, "notice");
        Ok(())
    }
}

/// Keeps notices in memory. Used by scripted sessions to report what was sent.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    notices: Mutex<Vec<(String, String)>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<(String, String)> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, subject: &str, body_md: &str) -> anyhow::Result<()> {
        self.notices
            .lock()
            .map_err(|_| anyhow::anyhow!("notice buffer poisoned"))?
            .push((subject.to_string(), body_md.to_string()));
        Ok(())
    }
}

/// Record sink that notifies after the inner sink accepted a write.
///
/// Nothing is sent for rejected writes. A failing notifier is logged and does
/// not undo the stored record.
pub struct NotifyingSink<S, N> {
    inner: S,
    notifier: N,
}

impl<S: RecordSink, N: Notifier> NotifyingSink<S, N> {
    pub fn new(inner: S, notifier: N) -> Self {
        Self { inner, notifier }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn send(&self, subject: &str, body: String) {
        if let Err(e) = self.notifier.notify(subject, &body) {
            tracing::warn!(subject, error = %e, "notification failed");
        }
    }
}

impl<S: RecordSink, N: Notifier> RecordSink for NotifyingSink<S, N> {
    fn save_repair_record(&self, record: &RepairRecord) -> CatalogResult<RepairRecord> {
        let stored = self.inner.save_repair_record(record)?;
        self.send(&format!("repair {}", stored.id), format_closure_notice(&stored));
        Ok(stored)
    }

    fn save_inquiry(&self, inquiry: &StepInquiry) -> CatalogResult<()> {
        self.inner.save_inquiry(inquiry)?;
        self.send(&format!("inquiry {}", inquiry.id), format_inquiry_notice(inquiry));
        Ok(())
    }

    fn resolve_inquiry(&self, id: &InquiryId) -> CatalogResult<StepInquiry> {
        self.inner.resolve_inquiry(id)
    }
}
