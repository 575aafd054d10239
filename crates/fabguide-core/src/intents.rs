use crate::{ClosureDraft, Device, InquiryDraft, MaintenanceGuide, RepairRecord};

/// Technician actions, as dispatched by the presentation layer.
///
/// Data the engine cannot fetch itself (devices, guides, history) travels with
/// the intent so the reducer stays free of I/O.
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    StartScan { scan_code: String },
    CancelScan,
    /// Skip a stalled scan and continue with a device picked by hand.
    ContinueWithDevice { device: Device },
    /// Manual choice from the technician's authorized devices, without scanning.
    ChooseDevice { device: Device },
    SelectGuide { guide: MaintenanceGuide, open_record: Option<RepairRecord> },
    RefreshGuide { guide: MaintenanceGuide },
    Back,
    JumpToStep { index: usize },
    StartFromBeginning { history: Vec<RepairRecord> },
    ResumeOpenRecord { record: RepairRecord, device: Device, guide: MaintenanceGuide },
    ShowHistory { history: Vec<RepairRecord> },
    DismissHistory,
    Advance,
    CloseEarly { confirmed: bool },
    BeginInquiry,
    EditInquiry { draft: InquiryDraft },
    SubmitInquiry,
    CancelInquiry,
    EditClosure { draft: ClosureDraft },
    SubmitClosure,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::StartScan { .. } => "start scan",
            Intent::CancelScan => "cancel scan",
            Intent::ContinueWithDevice { .. } => "continue with device",
            Intent::ChooseDevice { .. } => "choose device",
            Intent::SelectGuide { .. } => "select guide",
            Intent::RefreshGuide { .. } => "refresh guide",
            Intent::Back => "go back",
            Intent::JumpToStep { .. } => "jump to step",
            Intent::StartFromBeginning { .. } => "start from beginning",
            Intent::ResumeOpenRecord { .. } => "resume open record",
            Intent::ShowHistory { .. } => "show history",
            Intent::DismissHistory => "dismiss history",
            Intent::Advance => "advance",
            Intent::CloseEarly { .. } => "close early",
            Intent::BeginInquiry => "begin inquiry",
            Intent::EditInquiry { .. } => "edit inquiry",
            Intent::SubmitInquiry => "submit inquiry",
            Intent::CancelInquiry => "cancel inquiry",
            Intent::EditClosure { .. } => "edit closure",
            Intent::SubmitClosure => "submit closure",
        }
    }
}
