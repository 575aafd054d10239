use crate::{RepairRecord, StepInquiry};

/// Effects the shell must carry out after a transition.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Start asset identification for a scanned code. Result comes back as an `Outcome`.
    ResolveAsset { scan_code: String },
    /// Hand a closure record to the record sink. The transition only counts once it is accepted.
    EmitRepairRecord(RepairRecord),
    EmitInquiry(StepInquiry),
}
