use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use fabguide_core::{
    inquiries_newest_first, records_newest_first, search_guides, Device, DeviceId, EngineerId, GuideId, InquiryId,
    InquiryStatus, MaintenanceGuide, RepairRecord, StepInquiry, Technician,
};

use crate::{
    check_record_insert, reconcile_record, Catalog, CatalogError, CatalogResult, CatalogStore, RecordSink,
};

/// In-memory catalog for tests and scripted sessions. Not durable.
///
/// A single mutex serializes writers, which is what keeps at most one
/// `ongoing` record per engineer and guide.
#[derive(Default)]
pub struct InMemoryCatalog {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    devices: Vec<Device>,
    guides: Vec<MaintenanceGuide>,
    technicians: HashMap<String, Technician>,
    records: Vec<RepairRecord>,
    inquiries: Vec<StepInquiry>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> CatalogResult<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| CatalogError::Backend(anyhow!("in-memory catalog lock poisoned")))
    }
}

fn replace_or_push<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T, &T) -> bool) {
    match items.iter_mut().find(|existing| same(existing, &item)) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

impl CatalogStore for InMemoryCatalog {
    fn insert_device(&self, device: Device) -> CatalogResult<()> {
        let mut inner = self.lock()?;
        replace_or_push(&mut inner.devices, device, |a, b| a.id == b.id);
        Ok(())
    }

    fn insert_guide(&self, guide: MaintenanceGuide) -> CatalogResult<()> {
        let mut inner = self.lock()?;
        replace_or_push(&mut inner.guides, guide, |a, b| a.id == b.id);
        Ok(())
    }

    fn insert_technician(&self, technician: Technician) -> CatalogResult<()> {
        let mut inner = self.lock()?;
        inner.technicians.insert(technician.id.0.clone(), technician);
        Ok(())
    }

    fn insert_record(&self, record: RepairRecord) -> CatalogResult<()> {
        let mut inner = self.lock()?;
        let by_id = inner.records.iter().find(|r| r.id == record.id);
        let open = inner
            .records
            .iter()
            .find(|r| r.is_ongoing() && r.engineer_id == record.engineer_id && r.guide_id == record.guide_id);
        check_record_insert(&record, by_id, open)?;
        replace_or_push(&mut inner.records, record, |a, b| a.id == b.id);
        Ok(())
    }
}

impl Catalog for InMemoryCatalog {
    fn find_device(&self, id: &DeviceId) -> CatalogResult<Option<Device>> {
        Ok(self.lock()?.devices.iter().find(|d| &d.id == id).cloned())
    }

    fn find_device_by_serial(&self, serial_number: &str) -> CatalogResult<Option<Device>> {
        Ok(self.lock()?.devices.iter().find(|d| d.serial_number.eq_ignore_ascii_case(serial_number)).cloned())
    }

    fn list_devices(&self) -> CatalogResult<Vec<Device>> {
        Ok(self.lock()?.devices.clone())
    }

    fn find_guide(&self, id: &GuideId) -> CatalogResult<Option<MaintenanceGuide>> {
        Ok(self.lock()?.guides.iter().find(|g| &g.id == id).cloned())
    }

    fn list_guides(&self, device_id: &DeviceId, query: Option<&str>) -> CatalogResult<Vec<MaintenanceGuide>> {
        let inner = self.lock()?;
        Ok(search_guides(inner.guides.iter().filter(|g| &g.device_id == device_id), query))
    }

    fn find_technician(&self, id: &EngineerId) -> CatalogResult<Option<Technician>> {
        Ok(self.lock()?.technicians.get(&id.0).cloned())
    }

    fn list_history(&self, guide_id: &GuideId) -> CatalogResult<Vec<RepairRecord>> {
        let inner = self.lock()?;
        let records = inner.records.iter().filter(|r| &r.guide_id == guide_id).cloned().collect();
        Ok(records_newest_first(records))
    }

    fn list_open_record(&self, engineer_id: &EngineerId) -> CatalogResult<Option<RepairRecord>> {
        let inner = self.lock()?;
        let open = inner.records.iter().filter(|r| r.is_ongoing() && &r.engineer_id == engineer_id).cloned().collect();
        Ok(records_newest_first(open).into_iter().next())
    }

    fn find_open_record(&self, engineer_id: &EngineerId, guide_id: &GuideId) -> CatalogResult<Option<RepairRecord>> {
        let inner = self.lock()?;
        Ok(inner
            .records
            .iter()
            .find(|r| r.is_ongoing() && &r.engineer_id == engineer_id && &r.guide_id == guide_id)
            .cloned())
    }

    fn list_inquiries(&self, guide_id: &GuideId) -> CatalogResult<Vec<StepInquiry>> {
        let inner = self.lock()?;
        let inquiries = inner.inquiries.iter().filter(|i| &i.guide_id == guide_id).cloned().collect();
        Ok(inquiries_newest_first(inquiries))
    }
}

impl RecordSink for InMemoryCatalog {
    fn save_repair_record(&self, record: &RepairRecord) -> CatalogResult<RepairRecord> {
        let mut inner = self.lock()?;
        let by_id = inner.records.iter().find(|r| r.id == record.id);
        let open = inner
            .records
            .iter()
            .find(|r| r.is_ongoing() && r.engineer_id == record.engineer_id && r.guide_id == record.guide_id);
        let stored = reconcile_record(record, by_id, open)?;
        replace_or_push(&mut inner.records, stored.clone(), |a, b| a.id == b.id);
        tracing::debug!(record_id = %stored.id, status = ?stored.status, "stored repair record");
        Ok(stored)
    }

    fn save_inquiry(&self, inquiry: &StepInquiry) -> CatalogResult<()> {
        let mut inner = self.lock()?;
        if inner.inquiries.iter().any(|i| i.id == inquiry.id) {
            return Err(CatalogError::Conflict(format!("inquiry {} already exists", inquiry.id)));
        }
        inner.inquiries.push(inquiry.clone());
        tracing::debug!(inquiry_id = %inquiry.id, step_id = %inquiry.step_id, "stored inquiry");
        Ok(())
    }

    fn resolve_inquiry(&self, id: &InquiryId) -> CatalogResult<StepInquiry> {
        let mut inner = self.lock()?;
        let inquiry = inner
            .inquiries
            .iter_mut()
            .find(|i| &i.id == id)
            .ok_or_else(|| CatalogError::not_found("inquiry", id))?;
        inquiry.status = InquiryStatus::Resolved;
        Ok(inquiry.clone())
    }
}
