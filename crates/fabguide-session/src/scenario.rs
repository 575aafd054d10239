use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::Instrument;

use fabguide_catalog::InMemoryCatalog;
use fabguide_core::{
    ClosureDraft, DeviceId, EngineerId, GuideId, InquiryDraft, Intent, RepairRecord, StepInquiry, SubmissionSource,
};
use fabguide_notify::CollectingNotifier;

use crate::{load_fixture, Backend, CatalogResolver, Session, SessionResult};

/// Fixed clock for scripted sessions: 2026-02-11T10:30:00Z.
pub const SCENARIO_NOW_UNIX: i64 = 1_770_805_800;

#[derive(Debug, Deserialize)]
pub struct ScenarioScript {
    pub scenario_id: String,
    pub technician: String,
    /// Catalog fixture, relative to the scenario directory.
    #[serde(default = "default_catalog")]
    pub catalog: String,
    #[serde(default)]
    pub scan_timeout_secs: Option<u64>,
    /// Steps are written as single-key maps (`- select_guide: g1`), bare names for unit steps.
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub steps: Vec<ScenarioStep>,
}

fn default_catalog() -> String {
    "../../catalog.yaml".to_string()
}

/// One technician action in a script.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStep {
    Scan(String),
    ChooseDevice(String),
    SelectGuide(String),
    RefreshGuide,
    ResumeOpenRecord,
    Back,
    JumpToStep(usize),
    StartFromBeginning,
    ShowHistory,
    DismissHistory,
    Advance,
    CloseEarly,
    Closure(ClosureDraft),
    SubmitClosure,
    /// Begin, fill in and submit an inquiry.
    Inquiry(InquiryDraft),
}

#[derive(Debug, Deserialize)]
pub struct ScenarioExpected {
    pub scenario_id: String,
    pub final_state: String,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub record: Option<ExpectedRecord>,
    #[serde(default)]
    pub inquiries: Vec<ExpectedInquiry>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectedRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub completed_steps: usize,
    pub source: SubmissionSource,
    #[serde(default)]
    pub is_new_issue: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExpectedInquiry {
    pub step_id: String,
}

#[derive(Debug)]
pub struct ScenarioResult {
    pub scenario_id: String,
    pub final_state: &'static str,
    /// Label of every rejected step, in order.
    pub errors: Vec<String>,
    pub record: Option<RepairRecord>,
    pub inquiries: Vec<StepInquiry>,
    pub notices: usize,
}

pub fn load_script(dir: &Path) -> Result<ScenarioScript> {
    let p = dir.join("script.yaml");
    let s = std::fs::read_to_string(&p).with_context(|| format!("read script.yaml: {}", p.display()))?;
    let script: ScenarioScript = serde_yaml::from_str(&s).with_context(|| "parse script.yaml")?;
    Ok(script)
}

pub fn load_expected(dir: &Path) -> Result<ScenarioExpected> {
    let p = dir.join("expected.yaml");
    let s = std::fs::read_to_string(&p).with_context(|| format!("read expected.yaml: {}", p.display()))?;
    let exp: ScenarioExpected = serde_yaml::from_str(&s).with_context(|| "parse expected.yaml")?;
    Ok(exp)
}

/// Replay a scripted session against a fresh in-memory catalog.
///
/// Rejected steps are recorded and the script continues; the engine keeps its
/// state on rejection, so later steps see the same state a technician would.
pub async fn play(dir: &Path) -> Result<ScenarioResult> {
    let script = load_script(dir)?;
    let catalog_path: PathBuf = dir.join(&script.catalog);
    let seeded = Backend::from_shared(Arc::new(InMemoryCatalog::new()));
    seeded.seed(&load_fixture(&catalog_path)?)?;

    let notifier = Arc::new(CollectingNotifier::new());
    let backend = seeded.with_notifier(notifier.clone());
    let resolver = Arc::new(CatalogResolver::new(backend.catalog.clone()));
    let timeout = std::time::Duration::from_secs(script.scan_timeout_secs.unwrap_or(5));
    let mut session = Session::open(&backend, resolver, &EngineerId::from_str(script.technician.as_str()), timeout)
        .with_context(|| format!("open session for {}", script.technician))?
        .with_clock(|| SCENARIO_NOW_UNIX);

    let mut errors = Vec::new();
    let mut inquiries = Vec::new();
    for (i, step) in script.steps.iter().enumerate() {
        let span = tracing::debug_span!("scenario step", index = i, ?step);
        match run_step(&mut session, step).instrument(span).await {
            Ok(()) => {
                if let ScenarioStep::Inquiry(_) = step {
                    inquiries.extend(session.last_inquiry().cloned());
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "step rejected");
                errors.push(e.label().to_string());
            }
        }
    }

    Ok(ScenarioResult {
        scenario_id: script.scenario_id,
        final_state: session.state().name(),
        errors,
        record: session.last_record().cloned(),
        inquiries,
        notices: notifier.notices().len(),
    })
}

async fn run_step(session: &mut Session, step: &ScenarioStep) -> SessionResult<()> {
    match step {
        ScenarioStep::Scan(code) => session.scan(code).await.map(|_| ()),
        ScenarioStep::ChooseDevice(id) => session.choose_device(&DeviceId::from_str(id.as_str())).map(|_| ()),
        ScenarioStep::SelectGuide(id) => session.select_guide(&GuideId::from_str(id.as_str())).map(|_| ()),
        ScenarioStep::RefreshGuide => session.refresh_guide().map(|_| ()),
        ScenarioStep::ResumeOpenRecord => session.resume_open_record().map(|_| ()),
        ScenarioStep::Back => session.dispatch(Intent::Back).map(|_| ()),
        ScenarioStep::JumpToStep(index) => session.dispatch(Intent::JumpToStep { index: *index }).map(|_| ()),
        ScenarioStep::StartFromBeginning => session.start_from_beginning().map(|_| ()),
        ScenarioStep::ShowHistory => session.show_history().map(|_| ()),
        ScenarioStep::DismissHistory => session.dispatch(Intent::DismissHistory).map(|_| ()),
        ScenarioStep::Advance => session.dispatch(Intent::Advance).map(|_| ()),
        ScenarioStep::CloseEarly => session.dispatch(Intent::CloseEarly { confirmed: true }).map(|_| ()),
        ScenarioStep::Closure(draft) => session.dispatch(Intent::EditClosure { draft: draft.clone() }).map(|_| ()),
        ScenarioStep::SubmitClosure => session.dispatch(Intent::SubmitClosure).map(|_| ()),
        ScenarioStep::Inquiry(draft) => {
            session.dispatch(Intent::BeginInquiry)?;
            session.dispatch(Intent::EditInquiry { draft: draft.clone() })?;
            match session.dispatch(Intent::SubmitInquiry) {
                Ok(_) => Ok(()),
                Err(e) => {
                    session.dispatch(Intent::CancelInquiry)?;
                    Err(e)
                }
            }
        }
    }
}

/// Compare a replay against its expectations, listing every mismatch.
pub fn verify(result: &ScenarioResult, expected: &ScenarioExpected) -> Result<()> {
    let mut problems = Vec::new();
    if result.final_state != expected.final_state {
        problems.push(format!("final state {:?}, expected {:?}", result.final_state, expected.final_state));
    }
    if result.errors != expected.errors {
        problems.push(format!("errors {:?}, expected {:?}", result.errors, expected.errors));
    }
    match (&result.record, &expected.record) {
        (None, None) => {}
        (Some(r), Some(exp)) => {
            if let Some(id) = &exp.id {
                if r.id.as_str() != id {
                    problems.push(format!("record id {}, expected {id}", r.id));
                }
            }
            if r.completed_steps.len() != exp.completed_steps {
                problems.push(format!("{} completed steps, expected {}", r.completed_steps.len(), exp.completed_steps));
            }
            if r.submission_source != Some(exp.source) {
                problems.push(format!("source {:?}, expected {:?}", r.submission_source, exp.source));
            }
            let new_issue = r.context.as_ref().is_some_and(|c| c.is_new_issue);
            if new_issue != exp.is_new_issue {
                problems.push(format!("new issue {new_issue}, expected {}", exp.is_new_issue));
            }
        }
        (got, want) => problems.push(format!("record present: {}, expected: {}", got.is_some(), want.is_some())),
    }
    let steps: Vec<&str> = result.inquiries.iter().map(|i| i.step_id.as_str()).collect();
    let want: Vec<&str> = expected.inquiries.iter().map(|i| i.step_id.as_str()).collect();
    if steps != want {
        problems.push(format!("inquiry steps {steps:?}, expected {want:?}"));
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("scenario {} diverged:\n- {}", expected.scenario_id, problems.join("\n- ")))
    }
}
