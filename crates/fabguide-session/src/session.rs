use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fabguide_catalog::{Catalog, CatalogError, RecordSink};
use fabguide_core::{
    absorb, group_by_scope, reduce, Command, Device, DeviceId, EngineContext, EngineError, EngineerId, GuideId,
    Intent, MaintenanceGuide, Outcome, ProcedureState, RepairRecord, StepInquiry, Technician, Transition,
};

use crate::{now_unix, AssetResolver, Backend, SessionError};

pub type SessionResult<T> = Result<T, SessionError>;

/// Drives one technician's procedure state against the catalog.
///
/// Every change goes through the core reducer. A transition is adopted only
/// after its commands succeeded, so a rejected record leaves the session in
/// the state it was in.
pub struct Session {
    catalog: Arc<dyn Catalog>,
    sink: Arc<dyn RecordSink>,
    resolver: Arc<dyn AssetResolver>,
    technician: Technician,
    scan_timeout: Duration,
    clock: fn() -> i64,
    state: ProcedureState,
    last_record: Option<RepairRecord>,
    last_inquiry: Option<StepInquiry>,
}

enum Identification {
    Cancelled,
    Finished(Outcome),
}

impl Session {
    pub fn open(
        backend: &Backend,
        resolver: Arc<dyn AssetResolver>,
        engineer_id: &EngineerId,
        scan_timeout: Duration,
    ) -> SessionResult<Self> {
        let technician = backend
            .catalog
            .find_technician(engineer_id)?
            .ok_or_else(|| CatalogError::not_found("technician", engineer_id))?;
        tracing::info!(engineer_id = %technician.id, "session opened");
        Ok(Self {
            catalog: backend.catalog.clone(),
            sink: backend.sink.clone(),
            resolver,
            technician,
            scan_timeout,
            clock: now_unix,
            state: ProcedureState::Idle,
            last_record: None,
            last_inquiry: None,
        })
    }

    /// Replace the wall clock, for reproducible timestamps.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &ProcedureState {
        &self.state
    }

    pub fn technician(&self) -> &Technician {
        &self.technician
    }

    /// Record stored by the most recent closure, as the sink returned it.
    pub fn last_record(&self) -> Option<&RepairRecord> {
        self.last_record.as_ref()
    }

    pub fn last_inquiry(&self) -> Option<&StepInquiry> {
        self.last_inquiry.as_ref()
    }

    fn context(&self) -> EngineContext {
        EngineContext { technician: self.technician.clone(), now_unix: (self.clock)() }
    }

    /// Apply an intent and carry out its commands.
    ///
    /// `StartScan` leaves the session in `Identifying`; call [`Session::identify`] next.
    pub fn dispatch(&mut self, intent: Intent) -> SessionResult<&ProcedureState> {
        let action = intent.name();
        let transition = reduce(&self.state, &self.context(), intent).map_err(|e| {
            tracing::debug!(state = self.state.name(), action, error = %e, "intent rejected");
            e
        })?;
        self.commit(transition)?;
        Ok(&self.state)
    }

    fn commit(&mut self, transition: Transition) -> SessionResult<()> {
        let Transition { state, commands } = transition;
        let mut stored_record = None;
        let mut stored_inquiry = None;
        for command in commands {
            match command {
                Command::ResolveAsset { scan_code } => {
                    tracing::debug!(%scan_code, "asset identification pending");
                }
                Command::EmitRepairRecord(record) => {
                    let stored = self.sink.save_repair_record(&record)?;
                    tracing::info!(
                        record_id = %stored.id,
                        guide_id = %stored.guide_id,
                        completed = stored.completed_steps.len(),
                        source = stored.submission_source.map(|s| s.as_str()),
                        "repair record emitted"
                    );
                    stored_record = Some(stored);
                }
                Command::EmitInquiry(inquiry) => {
                    self.sink.save_inquiry(&inquiry)?;
                    tracing::info!(inquiry_id = %inquiry.id, step_id = %inquiry.step_id, "inquiry emitted");
                    stored_inquiry = Some(inquiry);
                }
            }
        }
        tracing::debug!(from = self.state.name(), to = state.name(), "transition");
        self.state = state;
        if stored_record.is_some() {
            self.last_record = stored_record;
        }
        if stored_inquiry.is_some() {
            self.last_inquiry = stored_inquiry;
        }
        Ok(())
    }

    /// Await asset identification for the pending scan.
    ///
    /// Bounded by the scan timeout and abandoned as soon as `cancel` completes.
    /// Failure and timeout return the session to `Idle` and are reported as
    /// collaborator errors; nothing is retried.
    pub async fn identify<F>(&mut self, cancel: F) -> SessionResult<&ProcedureState>
    where
        F: Future<Output = ()>,
    {
        let scan_code = match &self.state {
            ProcedureState::Identifying { scan_code } => scan_code.clone(),
            other => {
                return Err(EngineError::InvalidStateTransition { state: other.name(), action: "identify asset" }.into())
            }
        };

        let resolver = Arc::clone(&self.resolver);
        let secs = self.scan_timeout.as_secs();
        let lookup = tokio::time::timeout(self.scan_timeout, resolver.resolve(&scan_code));
        let identification = tokio::select! {
            _ = cancel => Identification::Cancelled,
            res = lookup => Identification::Finished(match res {
                Ok(Ok(Some(device))) => Outcome::AssetResolved { device },
                Ok(Ok(None)) => Outcome::AssetUnresolved { reason: format!("no device matches {scan_code:?}") },
                Ok(Err(e)) => Outcome::AssetUnresolved { reason: format!("{e:#}") },
                Err(_) => Outcome::IdentificationTimedOut { secs },
            }),
        };

        let outcome = match identification {
            Identification::Cancelled => {
                tracing::info!(%scan_code, "identification cancelled");
                return self.dispatch(Intent::CancelScan);
            }
            Identification::Finished(outcome) => outcome,
        };

        let failure = match &outcome {
            Outcome::AssetResolved { device } => {
                tracing::info!(%scan_code, device_id = %device.id, "asset resolved");
                None
            }
            Outcome::AssetUnresolved { reason } => Some(EngineError::AssetUnresolved { reason: reason.clone() }),
            Outcome::IdentificationTimedOut { secs } => Some(EngineError::IdentificationTimedOut { secs: *secs }),
        };
        let transition = absorb(&self.state, outcome)?;
        self.commit(transition)?;
        match failure {
            Some(e) => {
                tracing::warn!(%scan_code, error = %e, "identification failed");
                Err(e.into())
            }
            None => Ok(&self.state),
        }
    }

    /// Start a scan and wait for it without a cancel signal.
    pub async fn scan(&mut self, scan_code: &str) -> SessionResult<&ProcedureState> {
        self.dispatch(Intent::StartScan { scan_code: scan_code.to_string() })?;
        self.identify(std::future::pending()).await
    }

    /// Devices the technician may pick by hand.
    pub fn authorized_devices(&self) -> SessionResult<Vec<Device>> {
        Ok(self.catalog.list_authorized_devices(&self.technician)?)
    }

    fn device(&self, device_id: &DeviceId) -> SessionResult<Device> {
        Ok(self.catalog.find_device(device_id)?.ok_or_else(|| CatalogError::not_found("device", device_id))?)
    }

    fn guide(&self, guide_id: &GuideId) -> SessionResult<MaintenanceGuide> {
        Ok(self.catalog.find_guide(guide_id)?.ok_or_else(|| CatalogError::not_found("guide", guide_id))?)
    }

    fn active_guide_id(&self, action: &'static str) -> SessionResult<GuideId> {
        self.state
            .guide()
            .map(|g| g.id.clone())
            .ok_or_else(|| EngineError::InvalidStateTransition { state: self.state.name(), action }.into())
    }

    pub fn choose_device(&mut self, device_id: &DeviceId) -> SessionResult<&ProcedureState> {
        let device = self.device(device_id)?;
        self.dispatch(Intent::ChooseDevice { device })
    }

    /// Give up on a stalled scan and continue with a device picked by hand.
    pub fn continue_with_device(&mut self, device_id: &DeviceId) -> SessionResult<&ProcedureState> {
        let device = self.device(device_id)?;
        self.dispatch(Intent::ContinueWithDevice { device })
    }

    /// Guides of the active device matching `query`, grouped by scope.
    pub fn fault_options(&self, query: Option<&str>) -> SessionResult<Vec<(String, Vec<MaintenanceGuide>)>> {
        let device = self.state.device().ok_or(EngineError::InvalidStateTransition {
            state: self.state.name(),
            action: "list fault options",
        })?;
        let guides = self.catalog.list_guides(&device.id, query)?;
        Ok(group_by_scope(&guides))
    }

    pub fn select_guide(&mut self, guide_id: &GuideId) -> SessionResult<&ProcedureState> {
        let guide = self.guide(guide_id)?;
        let open_record = self.catalog.find_open_record(&self.technician.id, guide_id)?;
        self.dispatch(Intent::SelectGuide { guide, open_record })
    }

    /// Reload the active guide and recompute the step order if it changed.
    pub fn refresh_guide(&mut self) -> SessionResult<&ProcedureState> {
        let guide_id = self.active_guide_id("refresh guide")?;
        let guide = self.guide(&guide_id)?;
        self.dispatch(Intent::RefreshGuide { guide })
    }

    pub fn start_from_beginning(&mut self) -> SessionResult<&ProcedureState> {
        let guide_id = self.active_guide_id("start from beginning")?;
        let history = self.catalog.list_history(&guide_id)?;
        self.dispatch(Intent::StartFromBeginning { history })
    }

    pub fn show_history(&mut self) -> SessionResult<&ProcedureState> {
        let guide_id = self.active_guide_id("show history")?;
        let history = self.catalog.list_history(&guide_id)?;
        self.dispatch(Intent::ShowHistory { history })
    }

    /// Continue the technician's most recent `ongoing` record.
    pub fn resume_open_record(&mut self) -> SessionResult<&ProcedureState> {
        let record = self
            .catalog
            .list_open_record(&self.technician.id)?
            .ok_or_else(|| CatalogError::not_found("open record of", &self.technician.id))?;
        let guide = self.guide(&record.guide_id)?;
        let device = self.device(&guide.device_id)?;
        self.dispatch(Intent::ResumeOpenRecord { record, device, guide })
    }
}
