use crate::{
    ClosureDraft, Command, Device, GuideStep, InquiryDraft, MaintenanceGuide, PrioritizedSequence, RepairRecord,
    SubmissionSource,
};

/// Guide chosen for a device, with its execution order.
#[derive(Clone, Debug, PartialEq)]
pub struct Procedure {
    pub device: Device,
    pub guide: MaintenanceGuide,
    pub sequence: PrioritizedSequence,
    /// The technician's `ongoing` record for this guide, closed instead of creating a new one.
    pub open_record: Option<RepairRecord>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Execution {
    pub procedure: Procedure,
    pub cursor: usize,
    pub started_at_unix: i64,
    /// Past repairs shown before work starts. Navigation waits until it is dismissed.
    pub history_overlay: Option<Vec<RepairRecord>>,
    /// Present while an inquiry is being composed.
    pub inquiry: Option<InquiryDraft>,
}

impl Execution {
    pub fn current_step(&self) -> Option<&GuideStep> {
        self.procedure.sequence.get(self.cursor)
    }

    pub fn is_last_step(&self) -> bool {
        self.procedure.sequence.last_index() == Some(self.cursor)
    }

    pub fn total_steps(&self) -> usize {
        self.procedure.sequence.len()
    }

    pub fn state_name(&self) -> &'static str {
        if self.inquiry.is_some() {
            "composing an inquiry"
        } else if self.history_overlay.is_some() {
            "reviewing history"
        } else {
            "executing"
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Closing {
    pub execution: Execution,
    pub source: SubmissionSource,
    pub draft: ClosureDraft,
}

/// Workflow position of one technician session.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum ProcedureState {
    #[default]
    Idle,
    Identifying { scan_code: String },
    FaultSelection { device: Device },
    StepOverview(Procedure),
    Executing(Execution),
    Closing(Closing),
}

/// Screen the presentation layer should show for a state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Scan,
    Scanning,
    FaultSelect,
    StepList,
    Guide,
    HistoryOverlay,
    SubmitInquiry,
    FinalSubmit,
}

impl ProcedureState {
    pub fn name(&self) -> &'static str {
        match self {
            ProcedureState::Idle => "idle",
            ProcedureState::Identifying { .. } => "identifying",
            ProcedureState::FaultSelection { .. } => "selecting a fault",
            ProcedureState::StepOverview(_) => "viewing the step overview",
            ProcedureState::Executing(e) => e.state_name(),
            ProcedureState::Closing(_) => "closing",
        }
    }

    pub fn screen(&self) -> Screen {
        match self {
            ProcedureState::Idle => Screen::Scan,
            ProcedureState::Identifying { .. } => Screen::Scanning,
            ProcedureState::FaultSelection { .. } => Screen::FaultSelect,
            ProcedureState::StepOverview(_) => Screen::StepList,
            ProcedureState::Executing(e) if e.inquiry.is_some() => Screen::SubmitInquiry,
            ProcedureState::Executing(e) if e.history_overlay.is_some() => Screen::HistoryOverlay,
            ProcedureState::Executing(_) => Screen::Guide,
            ProcedureState::Closing(_) => Screen::FinalSubmit,
        }
    }

    pub fn device(&self) -> Option<&Device> {
        match self {
            ProcedureState::FaultSelection { device } => Some(device),
            _ => self.procedure().map(|p| &p.device),
        }
    }

    pub fn guide(&self) -> Option<&MaintenanceGuide> {
        self.procedure().map(|p| &p.guide)
    }

    pub fn procedure(&self) -> Option<&Procedure> {
        match self {
            ProcedureState::StepOverview(p) => Some(p),
            ProcedureState::Executing(e) => Some(&e.procedure),
            ProcedureState::Closing(c) => Some(&c.execution.procedure),
            _ => None,
        }
    }

    pub fn execution(&self) -> Option<&Execution> {
        match self {
            ProcedureState::Executing(e) => Some(e),
            ProcedureState::Closing(c) => Some(&c.execution),
            _ => None,
        }
    }

    pub fn cursor(&self) -> Option<usize> {
        self.execution().map(|e| e.cursor)
    }

    pub fn current_step(&self) -> Option<&GuideStep> {
        self.execution().and_then(Execution::current_step)
    }
}

/// Next state plus the effects needed to get there.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: ProcedureState,
    pub commands: Vec<Command>,
}

impl Transition {
    pub fn to(state: ProcedureState) -> Self {
        Self { state, commands: vec![] }
    }

    pub fn with(state: ProcedureState, command: Command) -> Self {
        Self { state, commands: vec![command] }
    }
}
