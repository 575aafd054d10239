use thiserror::Error;

use crate::ids::{DeviceId, GuideId};

/// Broad class of an engine error, used by hosts to decide how to surface it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing technician input. Correct and resubmit.
    Validation,
    /// The caller asked for a transition the current state does not allow.
    State,
    /// The asset or guide cannot be worked on. Pick another.
    Availability,
    /// An external collaborator failed. Retry or fall back to manual selection.
    Collaborator,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("validation failed for {field}: {reason}")]
    ValidationFailed { field: &'static str, reason: String },

    #[error("invalid transition: cannot {action} while {state}")]
    InvalidStateTransition { state: &'static str, action: &'static str },

    #[error("guide {guide_id} is not available for execution")]
    GuideNotAvailable { guide_id: GuideId },

    #[error("technician is not authorized for device {device_id}")]
    AssetNotAuthorized { device_id: DeviceId },

    #[error("asset could not be resolved: {reason}")]
    AssetUnresolved { reason: String },

    #[error("asset identification timed out after {secs}s")]
    IdentificationTimedOut { secs: u64 },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::ValidationFailed { .. } => ErrorKind::Validation,
            EngineError::InvalidStateTransition { .. } => ErrorKind::State,
            EngineError::GuideNotAvailable { .. } | EngineError::AssetNotAuthorized { .. } => ErrorKind::Availability,
            EngineError::AssetUnresolved { .. } | EngineError::IdentificationTimedOut { .. } => ErrorKind::Collaborator,
        }
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        EngineError::ValidationFailed { field, reason: reason.into() }
    }
}
