use std::sync::Arc;

use fabguide_core::{
    authorized_devices, Device, DeviceId, EngineerId, GuideId, InquiryId, MaintenanceGuide, RepairRecord,
    StepInquiry, Technician,
};

use crate::CatalogResult;

/// Read side of the maintenance catalog, consumed by the session.
pub trait Catalog: Send + Sync {
    fn find_device(&self, id: &DeviceId) -> CatalogResult<Option<Device>>;
    fn find_device_by_serial(&self, serial_number: &str) -> CatalogResult<Option<Device>>;
    fn list_devices(&self) -> CatalogResult<Vec<Device>>;

    fn list_authorized_devices(&self, technician: &Technician) -> CatalogResult<Vec<Device>> {
        Ok(authorized_devices(&self.list_devices()?, technician))
    }

    fn find_guide(&self, id: &GuideId) -> CatalogResult<Option<MaintenanceGuide>>;

    /// Guides bound to a device, filtered by fault code, category or scope and
    /// ranked by occurrence count. Unpublished guides are included.
    fn list_guides(&self, device_id: &DeviceId, query: Option<&str>) -> CatalogResult<Vec<MaintenanceGuide>>;

    fn find_technician(&self, id: &EngineerId) -> CatalogResult<Option<Technician>>;

    /// Repair records of a guide, most recent first.
    fn list_history(&self, guide_id: &GuideId) -> CatalogResult<Vec<RepairRecord>>;

    /// The technician's most recently started `ongoing` record, if any.
    fn list_open_record(&self, engineer_id: &EngineerId) -> CatalogResult<Option<RepairRecord>>;

    fn find_open_record(&self, engineer_id: &EngineerId, guide_id: &GuideId) -> CatalogResult<Option<RepairRecord>>;

    /// Inquiries raised against a guide, most recent first.
    fn list_inquiries(&self, guide_id: &GuideId) -> CatalogResult<Vec<StepInquiry>>;
}

/// Write side for records produced by a procedure session.
pub trait RecordSink: Send + Sync {
    /// Store a repair record. An existing `ongoing` record for the same engineer and
    /// guide is updated in place and keeps its id. Returns the stored record.
    fn save_repair_record(&self, record: &RepairRecord) -> CatalogResult<RepairRecord>;

    fn save_inquiry(&self, inquiry: &StepInquiry) -> CatalogResult<()>;

    /// Mark an inquiry resolved. Resolving twice is a no-op.
    fn resolve_inquiry(&self, id: &InquiryId) -> CatalogResult<StepInquiry>;
}

/// Catalog content loading, used by fixtures and the CLI `seed` command.
pub trait CatalogStore: Send + Sync {
    fn insert_device(&self, device: Device) -> CatalogResult<()>;
    fn insert_guide(&self, guide: MaintenanceGuide) -> CatalogResult<()>;
    fn insert_technician(&self, technician: Technician) -> CatalogResult<()>;

    /// Load a record as-is, bypassing the upsert rules. For prior history.
    fn insert_record(&self, record: RepairRecord) -> CatalogResult<()>;
}

impl<T: RecordSink + ?Sized> RecordSink for Arc<T> {
    fn save_repair_record(&self, record: &RepairRecord) -> CatalogResult<RepairRecord> {
        (**self).save_repair_record(record)
    }

    fn save_inquiry(&self, inquiry: &StepInquiry) -> CatalogResult<()> {
        (**self).save_inquiry(inquiry)
    }

    fn resolve_inquiry(&self, id: &InquiryId) -> CatalogResult<StepInquiry> {
        (**self).resolve_inquiry(id)
    }
}
