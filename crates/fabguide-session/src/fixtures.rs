use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use fabguide_catalog::{CatalogStore, RecordSink};
use fabguide_core::{Device, MaintenanceGuide, RepairRecord, StepInquiry, Technician};

/// Catalog content as written in a YAML fixture.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogFixture {
    #[serde(default)]
    pub technicians: Vec<Technician>,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub guides: Vec<MaintenanceGuide>,
    #[serde(default)]
    pub records: Vec<RepairRecord>,
    #[serde(default)]
    pub inquiries: Vec<StepInquiry>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub technicians: usize,
    pub devices: usize,
    pub guides: usize,
    pub records: usize,
    pub inquiries: usize,
}

pub fn load_fixture(path: &Path) -> Result<CatalogFixture> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read catalog fixture {}", path.display()))?;
    let fixture: CatalogFixture =
        serde_yaml::from_str(&s).with_context(|| format!("parse catalog fixture {}", path.display()))?;
    Ok(fixture)
}

impl CatalogFixture {
    /// Write every entry into the catalog. Records keep their ids and status.
    pub fn seed(&self, store: &dyn CatalogStore, sink: &dyn RecordSink) -> Result<SeedSummary> {
        for t in &self.technicians {
            store.insert_technician(t.clone()).with_context(|| format!("seed technician {}", t.id))?;
        }
        for d in &self.devices {
            store.insert_device(d.clone()).with_context(|| format!("seed device {}", d.id))?;
        }
        for g in &self.guides {
            store.insert_guide(g.clone()).with_context(|| format!("seed guide {}", g.id))?;
        }
        for r in &self.records {
            store.insert_record(r.clone()).with_context(|| format!("seed record {}", r.id))?;
        }
        for i in &self.inquiries {
            sink.save_inquiry(i).with_context(|| format!("seed inquiry {}", i.id))?;
        }
        let summary = SeedSummary {
            technicians: self.technicians.len(),
            devices: self.devices.len(),
            guides: self.guides.len(),
            records: self.records.len(),
            inquiries: self.inquiries.len(),
        };
        tracing::info!(?summary, "seeded catalog");
        Ok(summary)
    }
}
