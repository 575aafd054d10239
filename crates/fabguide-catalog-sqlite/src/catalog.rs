use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use fabguide_catalog::{
    check_record_insert, reconcile_record, Catalog, CatalogError, CatalogResult, CatalogStore, RecordSink,
};
use fabguide_core::{
    search_guides, Device, DeviceId, DeviceStatus, EngineerId, GuideId, InquiryId, InquiryStatus, MaintenanceGuide,
    RecordId, RecordStatus, RepairRecord, StepId, StepInquiry, SubmissionSource, Technician,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Params, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;

const DEVICE_COLUMNS: &str = "id, device_type, model, sub_model, serial_number, status, bound_sop_ids_json";
const GUIDE_COLUMNS: &str = "id, device_id, fault_code, fault_category, operation_type, scope, fault_phenomenon, \
                             version, published, total_occurrence_count, steps_json";
const RECORD_COLUMNS: &str = "id, guide_id, engineer_id, started_at, ended_at, fault_reason, treatment, photos_json, \
                              completed_steps_json, status, submission_source, context_json";
const INQUIRY_COLUMNS: &str = "id, engineer_id, guide_id, step_id, device_id, question, photo_url, status, created_at, \
                               is_new_issue, context_json";

/// Durable catalog. The one-open-record rule is a partial unique index on
/// `repair_records(engineer_id, guide_id)`.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let conn = Connection::open(db_path).with_context(|| format!("open sqlite db {}", db_path.display()))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let init_sql = include_str!("../migrations/0001_init.sql");
        conn.execute_batch(init_sql).context("apply catalog schema")?;
        tracing::debug!(path = %db_path.display(), "opened sqlite catalog");
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> CatalogResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CatalogError::Backend(anyhow!("sqlite catalog lock poisoned")))
    }
}

fn device_status_to_str(s: DeviceStatus) -> &'static str {
    match s {
        DeviceStatus::Active => "active",
        DeviceStatus::Maintenance => "maintenance",
        DeviceStatus::Offline => "offline",
    }
}

fn str_to_device_status(s: &str) -> Option<DeviceStatus> {
    match s {
        "active" => Some(DeviceStatus::Active),
        "maintenance" => Some(DeviceStatus::Maintenance),
        "offline" => Some(DeviceStatus::Offline),
        _ => None,
    }
}

fn record_status_to_str(s: RecordStatus) -> &'static str {
    match s {
        RecordStatus::Ongoing => "ongoing",
        RecordStatus::Completed => "completed",
    }
}

fn str_to_record_status(s: &str) -> Option<RecordStatus> {
    match s {
        "ongoing" => Some(RecordStatus::Ongoing),
        "completed" => Some(RecordStatus::Completed),
        _ => None,
    }
}

fn str_to_source(s: &str) -> Option<SubmissionSource> {
    match s {
        "CLOSE" => Some(SubmissionSource::Close),
        "PASS" => Some(SubmissionSource::Pass),
        _ => None,
    }
}

fn inquiry_status_to_str(s: InquiryStatus) -> &'static str {
    match s {
        InquiryStatus::Pending => "pending",
        InquiryStatus::Resolved => "resolved",
    }
}

fn str_to_inquiry_status(s: &str) -> Option<InquiryStatus> {
    match s {
        "pending" => Some(InquiryStatus::Pending),
        "resolved" => Some(InquiryStatus::Resolved),
        _ => None,
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> rusqlite::Result<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn from_json<T: DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn unknown_value(idx: usize, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, format!("unknown value {raw:?}").into())
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::ConstraintViolation)
}

fn device_from_row(r: &Row<'_>) -> rusqlite::Result<Device> {
    let status: String = r.get(5)?;
    Ok(Device {
        id: DeviceId::from_str(r.get::<_, String>(0)?),
        device_type: r.get(1)?,
        model: r.get(2)?,
        sub_model: r.get(3)?,
        serial_number: r.get(4)?,
        status: str_to_device_status(&status).ok_or_else(|| unknown_value(5, &status))?,
        bound_sop_ids: from_json(6, &r.get::<_, String>(6)?)?,
    })
}

fn guide_from_row(r: &Row<'_>) -> rusqlite::Result<MaintenanceGuide> {
    Ok(MaintenanceGuide {
        id: GuideId::from_str(r.get::<_, String>(0)?),
        device_id: DeviceId::from_str(r.get::<_, String>(1)?),
        fault_code: r.get(2)?,
        fault_category: r.get(3)?,
        operation_type: r.get(4)?,
        scope: r.get(5)?,
        fault_phenomenon: r.get(6)?,
        version: r.get(7)?,
        published: r.get(8)?,
        total_occurrence_count: r.get(9)?,
        steps: from_json(10, &r.get::<_, String>(10)?)?,
    })
}

fn record_from_row(r: &Row<'_>) -> rusqlite::Result<RepairRecord> {
    let status: String = r.get(9)?;
    let source: Option<String> = r.get(10)?;
    let context: Option<String> = r.get(11)?;
    Ok(RepairRecord {
        id: RecordId::from_str(r.get::<_, String>(0)?),
        guide_id: GuideId::from_str(r.get::<_, String>(1)?),
        engineer_id: EngineerId::from_str(r.get::<_, String>(2)?),
        started_at_unix: r.get(3)?,
        ended_at_unix: r.get(4)?,
        fault_reason: r.get(5)?,
        treatment: r.get(6)?,
        photos: from_json(7, &r.get::<_, String>(7)?)?,
        completed_steps: from_json(8, &r.get::<_, String>(8)?)?,
        status: str_to_record_status(&status).ok_or_else(|| unknown_value(9, &status))?,
        submission_source: source
            .map(|s| str_to_source(&s).ok_or_else(|| unknown_value(10, &s)))
            .transpose()?,
        context: context.map(|c| from_json(11, &c)).transpose()?,
    })
}

fn inquiry_from_row(r: &Row<'_>) -> rusqlite::Result<StepInquiry> {
    let status: String = r.get(7)?;
    let context: Option<String> = r.get(10)?;
    Ok(StepInquiry {
        id: InquiryId::from_str(r.get::<_, String>(0)?),
        engineer_id: EngineerId::from_str(r.get::<_, String>(1)?),
        guide_id: GuideId::from_str(r.get::<_, String>(2)?),
        step_id: StepId::from_str(r.get::<_, String>(3)?),
        device_id: DeviceId::from_str(r.get::<_, String>(4)?),
        question: r.get(5)?,
        photo_url: r.get(6)?,
        status: str_to_inquiry_status(&status).ok_or_else(|| unknown_value(7, &status))?,
        created_at_unix: r.get(8)?,
        is_new_issue: r.get(9)?,
        context: context.map(|c| from_json(10, &c)).transpose()?,
    })
}

fn query_all<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map)?.collect();
    rows
}

fn query_one<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Option<T>> {
    conn.query_row(sql, params, map).optional()
}

fn write_record(conn: &Connection, r: &RepairRecord) -> rusqlite::Result<usize> {
    conn.execute(
        &format!(
            "INSERT INTO repair_records({RECORD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(id) DO UPDATE SET
               guide_id = excluded.guide_id, engineer_id = excluded.engineer_id,
               started_at = excluded.started_at, ended_at = excluded.ended_at,
               fault_reason = excluded.fault_reason, treatment = excluded.treatment,
               photos_json = excluded.photos_json, completed_steps_json = excluded.completed_steps_json,
               status = excluded.status, submission_source = excluded.submission_source,
               context_json = excluded.context_json"
        ),
        params![
            r.id.as_str(),
            r.guide_id.as_str(),
            r.engineer_id.as_str(),
            r.started_at_unix,
            r.ended_at_unix,
            r.fault_reason,
            r.treatment,
            to_json(&r.photos)?,
            to_json(&r.completed_steps)?,
            record_status_to_str(r.status),
            r.submission_source.map(|s| s.as_str()),
            r.context.as_ref().map(to_json).transpose()?,
        ],
    )
}

/// The stored record with the same id, and the open record of the same engineer and guide.
fn load_record_slots(
    conn: &Connection,
    record: &RepairRecord,
) -> CatalogResult<(Option<RepairRecord>, Option<RepairRecord>)> {
    let by_id_sql = format!("SELECT {RECORD_COLUMNS} FROM repair_records WHERE id = ?1");
    let by_id = query_one(conn, &by_id_sql, [record.id.as_str()], record_from_row).context("load record")?;
    let open_sql = format!(
        "SELECT {RECORD_COLUMNS} FROM repair_records
         WHERE engineer_id = ?1 AND guide_id = ?2 AND status = 'ongoing'"
    );
    let open = query_one(conn, &open_sql, [record.engineer_id.as_str(), record.guide_id.as_str()], record_from_row)
        .context("load open record")?;
    Ok((by_id, open))
}

impl CatalogStore for SqliteCatalog {
    fn insert_device(&self, d: Device) -> CatalogResult<()> {
        let bound = to_json(&d.bound_sop_ids).context("encode bound guides")?;
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO devices({DEVICE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                   device_type = excluded.device_type, model = excluded.model, sub_model = excluded.sub_model,
                   serial_number = excluded.serial_number, status = excluded.status,
                   bound_sop_ids_json = excluded.bound_sop_ids_json"
            ),
            params![
                d.id.as_str(),
                d.device_type,
                d.model,
                d.sub_model,
                d.serial_number,
                device_status_to_str(d.status),
                bound,
            ],
        )
        .with_context(|| format!("insert device {}", d.id))?;
        Ok(())
    }

    fn insert_guide(&self, g: MaintenanceGuide) -> CatalogResult<()> {
        let steps = to_json(&g.steps).context("encode guide steps")?;
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO guides({GUIDE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(id) DO UPDATE SET
                   device_id = excluded.device_id, fault_code = excluded.fault_code,
                   fault_category = excluded.fault_category, operation_type = excluded.operation_type,
                   scope = excluded.scope, fault_phenomenon = excluded.fault_phenomenon,
                   version = excluded.version, published = excluded.published,
                   total_occurrence_count = excluded.total_occurrence_count, steps_json = excluded.steps_json"
            ),
            params![
                g.id.as_str(),
                g.device_id.as_str(),
                g.fault_code,
                g.fault_category,
                g.operation_type,
                g.scope,
                g.fault_phenomenon,
                g.version,
                g.published,
                g.total_occurrence_count,
                steps,
            ],
        )
        .with_context(|| format!("insert guide {}", g.id))?;
        Ok(())
    }

    fn insert_technician(&self, t: Technician) -> CatalogResult<()> {
        let assigned = to_json(&t.assigned_device_ids).context("encode assigned devices")?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO technicians(id, name, assigned_device_ids_json) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name,
               assigned_device_ids_json = excluded.assigned_device_ids_json",
            params![t.id.as_str(), t.name, assigned],
        )
        .with_context(|| format!("insert technician {}", t.id))?;
        Ok(())
    }

    fn insert_record(&self, record: RepairRecord) -> CatalogResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().context("begin record transaction")?;
        let (by_id, open) = load_record_slots(&tx, &record)?;
        check_record_insert(&record, by_id.as_ref(), open.as_ref())?;
        write_record(&tx, &record).with_context(|| format!("insert repair record {}", record.id))?;
        tx.commit().context("commit repair record")?;
        Ok(())
    }
}

impl Catalog for SqliteCatalog {
    fn find_device(&self, id: &DeviceId) -> CatalogResult<Option<Device>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE id = ?1");
        Ok(query_one(&conn, &sql, [id.as_str()], device_from_row).context("find device")?)
    }

    fn find_device_by_serial(&self, serial_number: &str) -> CatalogResult<Option<Device>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE serial_number = ?1 COLLATE NOCASE LIMIT 1");
        Ok(query_one(&conn, &sql, [serial_number], device_from_row).context("find device by serial")?)
    }

    fn list_devices(&self) -> CatalogResult<Vec<Device>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {DEVICE_COLUMNS} FROM devices ORDER BY rowid");
        Ok(query_all(&conn, &sql, params![], device_from_row).context("list devices")?)
    }

    fn find_guide(&self, id: &GuideId) -> CatalogResult<Option<MaintenanceGuide>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {GUIDE_COLUMNS} FROM guides WHERE id = ?1");
        Ok(query_one(&conn, &sql, [id.as_str()], guide_from_row).context("find guide")?)
    }

    fn list_guides(&self, device_id: &DeviceId, query: Option<&str>) -> CatalogResult<Vec<MaintenanceGuide>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {GUIDE_COLUMNS} FROM guides WHERE device_id = ?1 ORDER BY rowid");
        let guides = query_all(&conn, &sql, [device_id.as_str()], guide_from_row).context("list guides")?;
        Ok(search_guides(&guides, query))
    }

    fn find_technician(&self, id: &EngineerId) -> CatalogResult<Option<Technician>> {
        let conn = self.lock()?;
        let found = query_one(
            &conn,
            "SELECT id, name, assigned_device_ids_json FROM technicians WHERE id = ?1",
            [id.as_str()],
            |r| {
                Ok(Technician {
                    id: EngineerId::from_str(r.get::<_, String>(0)?),
                    name: r.get(1)?,
                    assigned_device_ids: from_json(2, &r.get::<_, String>(2)?)?,
                })
            },
        )
        .context("find technician")?;
        Ok(found)
    }

    fn list_history(&self, guide_id: &GuideId) -> CatalogResult<Vec<RepairRecord>> {
        let conn = self.lock()?;
        let sql =
            format!("SELECT {RECORD_COLUMNS} FROM repair_records WHERE guide_id = ?1 ORDER BY started_at DESC, rowid");
        Ok(query_all(&conn, &sql, [guide_id.as_str()], record_from_row).context("list history")?)
    }

    fn list_open_record(&self, engineer_id: &EngineerId) -> CatalogResult<Option<RepairRecord>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM repair_records WHERE engineer_id = ?1 AND status = 'ongoing'
             ORDER BY started_at DESC, rowid LIMIT 1"
        );
        Ok(query_one(&conn, &sql, [engineer_id.as_str()], record_from_row).context("list open record")?)
    }

    fn find_open_record(&self, engineer_id: &EngineerId, guide_id: &GuideId) -> CatalogResult<Option<RepairRecord>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM repair_records
             WHERE engineer_id = ?1 AND guide_id = ?2 AND status = 'ongoing'"
        );
        Ok(query_one(&conn, &sql, [engineer_id.as_str(), guide_id.as_str()], record_from_row)
            .context("find open record")?)
    }

    fn list_inquiries(&self, guide_id: &GuideId) -> CatalogResult<Vec<StepInquiry>> {
        let conn = self.lock()?;
        let sql =
            format!("SELECT {INQUIRY_COLUMNS} FROM step_inquiries WHERE guide_id = ?1 ORDER BY created_at DESC, rowid");
        Ok(query_all(&conn, &sql, [guide_id.as_str()], inquiry_from_row).context("list inquiries")?)
    }
}

impl RecordSink for SqliteCatalog {
    fn save_repair_record(&self, record: &RepairRecord) -> CatalogResult<RepairRecord> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().context("begin record transaction")?;

        let (by_id, open) = load_record_slots(&tx, record)?;
        let stored = reconcile_record(record, by_id.as_ref(), open.as_ref())?;
        match write_record(&tx, &stored) {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                return Err(CatalogError::Conflict(format!(
                    "{} already has an open record on {}",
                    stored.engineer_id, stored.guide_id
                )));
            }
            Err(e) => return Err(anyhow::Error::new(e).context("write repair record").into()),
        }
        tx.commit().context("commit repair record")?;

        tracing::debug!(record_id = %stored.id, status = record_status_to_str(stored.status), "stored repair record");
        Ok(stored)
    }

    fn save_inquiry(&self, i: &StepInquiry) -> CatalogResult<()> {
        let context = i.context.as_ref().map(to_json).transpose().context("encode inquiry context")?;
        let conn = self.lock()?;
        let result = conn.execute(
            &format!("INSERT INTO step_inquiries({INQUIRY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
            params![
                i.id.as_str(),
                i.engineer_id.as_str(),
                i.guide_id.as_str(),
                i.step_id.as_str(),
                i.device_id.as_str(),
                i.question,
                i.photo_url,
                inquiry_status_to_str(i.status),
                i.created_at_unix,
                i.is_new_issue,
                context,
            ],
        );
        match result {
            Ok(_) => {
                tracing::debug!(inquiry_id = %i.id, step_id = %i.step_id, "stored inquiry");
                Ok(())
            }
            Err(e) if is_constraint_violation(&e) => {
                Err(CatalogError::Conflict(format!("inquiry {} already exists", i.id)))
            }
            Err(e) => Err(anyhow::Error::new(e).context("insert inquiry").into()),
        }
    }

    fn resolve_inquiry(&self, id: &InquiryId) -> CatalogResult<StepInquiry> {
        let conn = self.lock()?;
        let changed = conn
            .execute("UPDATE step_inquiries SET status = 'resolved' WHERE id = ?1", [id.as_str()])
            .context("resolve inquiry")?;
        if changed == 0 {
            return Err(CatalogError::not_found("inquiry", id));
        }
        let sql = format!("SELECT {INQUIRY_COLUMNS} FROM step_inquiries WHERE id = ?1");
        query_one(&conn, &sql, [id.as_str()], inquiry_from_row)
            .context("load resolved inquiry")?
            .ok_or_else(|| CatalogError::not_found("inquiry", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabguide_core::{GuideStep, InquiryContext, ProcessStage, RecordContext};
    use tempfile::tempdir;

    fn open() -> (tempfile::TempDir, SqliteCatalog) {
        let dir = tempdir().unwrap();
        let catalog = SqliteCatalog::open(&dir.path().join("nested/catalog.db")).unwrap();
        (dir, catalog)
    }

    fn guide(id: &str, count: Option<u32>, scope: &str) -> MaintenanceGuide {
        MaintenanceGuide {
            id: GuideId::from_str(id),
            device_id: DeviceId::from_str("d1"),
            fault_code: format!("AL-{id}"),
            fault_category: "Motion".into(),
            operation_type: "Calibrate".into(),
            scope: scope.into(),
            fault_phenomenon: "Overlay drift".into(),
            version: "3.0.0".into(),
            published: id != "g3",
            total_occurrence_count: count,
            steps: vec![GuideStep {
                id: StepId::from_str("s1"),
                stage: ProcessStage::Verification,
                title: "Run overlay check".into(),
                description: "Expose test wafer".into(),
                instruction: Some("Use recipe OVL-7".into()),
                judgment_method: None,
                help_content: None,
                safety_warning: Some("Laser interlock".into()),
                image_urls: vec!["img://ovl".into()],
                video_urls: vec![],
                pdf_urls: vec![],
                media_url: None,
                media_type: None,
                is_confirmation_required: true,
                history_repair_count: Some(8),
                branches: vec![],
            }],
        }
    }

    fn record(id: &str, status: RecordStatus, started: i64) -> RepairRecord {
        RepairRecord {
            id: RecordId::from_str(id),
            guide_id: GuideId::from_str("g1"),
            engineer_id: EngineerId::from_str("u1"),
            started_at_unix: started,
            ended_at_unix: None,
            fault_reason: "drift".into(),
            treatment: "recalibrated".into(),
            photos: vec!["photo://1".into()],
            completed_steps: vec![StepId::from_str("s1")],
            status,
            submission_source: Some(SubmissionSource::Close),
            context: Some(RecordContext {
                device_id: DeviceId::from_str("d1"),
                fault_code: "AL-g1".into(),
                last_step_id: Some(StepId::from_str("s1")),
                is_new_issue: false,
            }),
        }
    }

    #[test]
    fn open_creates_parent_dirs_and_migrates() {
        let (_dir, catalog) = open();
        assert!(catalog.list_devices().unwrap().is_empty());
    }

    #[test]
    fn guides_round_trip_and_rank() {
        let (_dir, catalog) = open();
        catalog.insert_guide(guide("g1", Some(5), "Stage")).unwrap();
        catalog.insert_guide(guide("g2", Some(50), "Optics")).unwrap();
        catalog.insert_guide(guide("g3", None, "Stage")).unwrap();

        let g1 = catalog.find_guide(&GuideId::from_str("g1")).unwrap().unwrap();
        assert_eq!(g1, guide("g1", Some(5), "Stage"));

        let ids: Vec<_> =
            catalog.list_guides(&DeviceId::from_str("d1"), None).unwrap().into_iter().map(|g| g.id.0).collect();
        assert_eq!(ids, vec!["g2", "g1", "g3"]);
        let stage = catalog.list_guides(&DeviceId::from_str("d1"), Some("STAGE")).unwrap();
        assert_eq!(stage.len(), 2);
        assert!(!stage[1].published);
    }

    #[test]
    fn devices_and_technicians_round_trip() {
        let (_dir, catalog) = open();
        let device = Device {
            id: DeviceId::from_str("d1"),
            device_type: "CVD".into(),
            model: "Producer".into(),
            sub_model: "GT".into(),
            serial_number: "AMAT-77".into(),
            status: DeviceStatus::Offline,
            bound_sop_ids: vec![GuideId::from_str("g1")],
        };
        catalog.insert_device(device.clone()).unwrap();
        assert_eq!(catalog.find_device_by_serial("amat-77").unwrap(), Some(device.clone()));

        let tech = Technician {
            id: EngineerId::from_str("u1"),
            name: "Park".into(),
            assigned_device_ids: vec![device.id.clone()],
        };
        catalog.insert_technician(tech.clone()).unwrap();
        let found = catalog.find_technician(&tech.id).unwrap().unwrap();
        assert_eq!(found, tech);
        assert_eq!(catalog.list_authorized_devices(&found).unwrap(), vec![device]);
    }

    #[test]
    fn ongoing_record_is_updated_in_place() {
        let (_dir, catalog) = open();
        catalog.save_repair_record(&record("r1", RecordStatus::Ongoing, 100)).unwrap();
        let second = catalog.save_repair_record(&record("r2", RecordStatus::Ongoing, 150)).unwrap();
        assert_eq!(second.id.as_str(), "r1");

        let closed = catalog.save_repair_record(&record("r3", RecordStatus::Completed, 200)).unwrap();
        assert_eq!(closed.id.as_str(), "r1");
        let history = catalog.list_history(&GuideId::from_str("g1")).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0], closed);
        assert!(catalog.list_open_record(&EngineerId::from_str("u1")).unwrap().is_none());

        let err = catalog.save_repair_record(&closed).unwrap_err();
        assert!(matches!(err, CatalogError::RecordImmutable { .. }));
    }

    #[test]
    fn loading_history_rejects_a_second_open_record() {
        let (_dir, catalog) = open();
        catalog.insert_record(record("r1", RecordStatus::Ongoing, 100)).unwrap();
        let err = catalog.insert_record(record("r2", RecordStatus::Ongoing, 100)).unwrap_err();
        assert!(matches!(err, CatalogError::Conflict(_)));
        let open = catalog.list_open_record(&EngineerId::from_str("u1")).unwrap().unwrap();
        assert_eq!(open.id.as_str(), "r1");
    }

    #[test]
    fn loading_history_never_rewrites_a_completed_record() {
        let (_dir, catalog) = open();
        catalog.insert_record(record("r1", RecordStatus::Completed, 100)).unwrap();
        let mut rewritten = record("r1", RecordStatus::Completed, 100);
        rewritten.treatment = "rewritten".into();
        let err = catalog.insert_record(rewritten).unwrap_err();
        assert!(matches!(err, CatalogError::RecordImmutable { .. }));
        let history = catalog.list_history(&GuideId::from_str("g1")).unwrap();
        assert_eq!(history[0].treatment, "recalibrated");
    }

    #[test]
    fn unique_index_backs_up_the_open_record_rule() {
        let (_dir, catalog) = open();
        catalog.insert_record(record("r1", RecordStatus::Ongoing, 100)).unwrap();
        let conn = catalog.conn.lock().unwrap();
        let second = write_record(&conn, &record("r2", RecordStatus::Ongoing, 100)).unwrap_err();
        assert!(is_constraint_violation(&second));
    }

    #[test]
    fn inquiries_round_trip_and_resolve() {
        let (_dir, catalog) = open();
        let inquiry = StepInquiry {
            id: InquiryId::from_str("q1"),
            engineer_id: EngineerId::from_str("u1"),
            guide_id: GuideId::from_str("g1"),
            step_id: StepId::unknown(),
            device_id: DeviceId::from_str("d1"),
            question: "Unexpected vibration".into(),
            photo_url: Some("photo://v".into()),
            status: InquiryStatus::Pending,
            created_at_unix: 42,
            is_new_issue: true,
            context: Some(InquiryContext {
                fault_code: "AL-g1".into(),
                step_title: "Run overlay check".into(),
                is_step_related: false,
            }),
        };
        catalog.save_inquiry(&inquiry).unwrap();
        assert!(matches!(catalog.save_inquiry(&inquiry), Err(CatalogError::Conflict(_))));
        assert_eq!(catalog.list_inquiries(&inquiry.guide_id).unwrap(), vec![inquiry.clone()]);

        let resolved = catalog.resolve_inquiry(&inquiry.id).unwrap();
        assert_eq!(resolved.status, InquiryStatus::Resolved);
        assert_eq!(catalog.resolve_inquiry(&inquiry.id).unwrap().status, InquiryStatus::Resolved);
        assert!(matches!(catalog.resolve_inquiry(&InquiryId::from_str("nope")), Err(CatalogError::NotFound { .. })));
    }
}
