use crate::Device;

/// Results of asynchronous collaborator work fed back into the state machine.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    AssetResolved { device: Device },
    AssetUnresolved { reason: String },
    IdentificationTimedOut { secs: u64 },
}
