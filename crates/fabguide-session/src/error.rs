use fabguide_catalog::CatalogError;
use fabguide_core::{EngineError, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl SessionError {
    /// Engine error class, or `None` for catalog failures.
    pub fn engine_kind(&self) -> Option<ErrorKind> {
        match self {
            SessionError::Engine(e) => Some(e.kind()),
            SessionError::Catalog(_) => None,
        }
    }

    /// Short label used in logs and scenario expectations.
    pub fn label(&self) -> &'static str {
        match self {
            SessionError::Engine(e) => match e.kind() {
                ErrorKind::Validation => "validation",
                ErrorKind::State => "state",
                ErrorKind::Availability => "availability",
                ErrorKind::Collaborator => "collaborator",
            },
            SessionError::Catalog(CatalogError::NotFound { .. }) => "not_found",
            SessionError::Catalog(_) => "catalog",
        }
    }
}
