use std::sync::Arc;

use async_trait::async_trait;
use fabguide_catalog::Catalog;
use fabguide_core::{Device, DeviceId};

/// Turns a scanned code into a device. `Ok(None)` means nothing matched.
#[async_trait]
pub trait AssetResolver: Send + Sync {
    async fn resolve(&self, scan_code: &str) -> anyhow::Result<Option<Device>>;
}

/// Resolves scan codes against the catalog, by device id first, then by serial number.
pub struct CatalogResolver {
    catalog: Arc<dyn Catalog>,
}

impl CatalogResolver {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl AssetResolver for CatalogResolver {
    async fn resolve(&self, scan_code: &str) -> anyhow::Result<Option<Device>> {
        if let Some(device) = self.catalog.find_device(&DeviceId::from_str(scan_code))? {
            return Ok(Some(device));
        }
        Ok(self.catalog.find_device_by_serial(scan_code)?)
    }
}
