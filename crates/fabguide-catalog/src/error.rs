use fabguide_core::RecordId;
use thiserror::Error;

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("repair record {record_id} is completed and can no longer change")]
    RecordImmutable { record_id: RecordId },

    #[error("conflicting write: {0}")]
    Conflict(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CatalogError::NotFound { entity, id: id.to_string() }
    }
}
