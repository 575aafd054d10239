//! Upsert rules for repair records shared by every backend.

use fabguide_core::RepairRecord;

use crate::{CatalogError, CatalogResult};

/// Decide what to store for `incoming`.
///
/// `by_id` is the stored record with the same id, `open` the stored `ongoing`
/// record of the same engineer and guide. An open record absorbs the write and
/// keeps its id; completed records never change.
pub fn reconcile_record(
    incoming: &RepairRecord,
    by_id: Option<&RepairRecord>,
    open: Option<&RepairRecord>,
) -> CatalogResult<RepairRecord> {
    if let Some(existing) = by_id {
        if !existing.is_ongoing() {
            return Err(CatalogError::RecordImmutable { record_id: existing.id.clone() });
        }
        if existing.engineer_id != incoming.engineer_id || existing.guide_id != incoming.guide_id {
            return Err(CatalogError::Conflict(format!(
                "record {} belongs to {} on guide {}",
                existing.id, existing.engineer_id, existing.guide_id
            )));
        }
    }

    match open {
        Some(open) if open.id != incoming.id => {
            Ok(RepairRecord { id: open.id.clone(), started_at_unix: open.started_at_unix, ..incoming.clone() })
        }
        _ => Ok(incoming.clone()),
    }
}

/// Check a verbatim load of `incoming`, as used for prior history.
///
/// Unlike [`reconcile_record`] nothing is merged: a completed record with the
/// same id may only be loaded again unchanged, and a second `ongoing` record
/// for the same engineer and guide is a conflict.
pub fn check_record_insert(
    incoming: &RepairRecord,
    by_id: Option<&RepairRecord>,
    open: Option<&RepairRecord>,
) -> CatalogResult<()> {
    if let Some(existing) = by_id {
        if !existing.is_ongoing() && existing != incoming {
            return Err(CatalogError::RecordImmutable { record_id: existing.id.clone() });
        }
    }
    match open {
        Some(open) if incoming.is_ongoing() && open.id != incoming.id => Err(CatalogError::Conflict(format!(
            "{} already has open record {} on guide {}",
            open.engineer_id, open.id, open.guide_id
        ))),
        _ => Ok(()),
    }
}
