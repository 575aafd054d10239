use crate::{
    build_inquiry, build_repair_record, ClosureContext, Closing, Command, Device, EngineContext, EngineError,
    Execution, InquiryRecordingContext, Intent, MaintenanceGuide, Outcome, PrioritizedSequence, Procedure,
    ProcedureState, RepairRecord, SubmissionSource, Transition,
};

/// Apply a technician intent to the current state.
///
/// The input state is never modified. On error the caller keeps its current
/// state; on success it adopts `Transition::state` once every command in the
/// transition has been carried out.
pub fn reduce(state: &ProcedureState, ctx: &EngineContext, intent: Intent) -> Result<Transition, EngineError> {
    use ProcedureState as S;

    match (state, intent) {
        (S::Idle, Intent::StartScan { scan_code }) => {
            let code = scan_code.trim();
            if code.is_empty() {
                return Err(EngineError::validation("scan_code", "nothing was scanned"));
            }
            Ok(Transition::with(
                S::Identifying { scan_code: code.to_string() },
                Command::ResolveAsset { scan_code: code.to_string() },
            ))
        }
        (S::Idle, Intent::ChooseDevice { device }) => {
            ensure_authorized(ctx, &device)?;
            Ok(Transition::to(S::FaultSelection { device }))
        }
        (S::Idle, Intent::ResumeOpenRecord { record, device, guide }) => resume(ctx, record, device, guide),

        (S::Identifying { .. }, Intent::CancelScan) => Ok(Transition::to(S::Idle)),
        (S::Identifying { .. }, Intent::ContinueWithDevice { device }) => {
            ensure_authorized(ctx, &device)?;
            Ok(Transition::to(S::FaultSelection { device }))
        }

        (S::FaultSelection { device }, Intent::SelectGuide { guide, open_record }) => {
            let procedure = open_procedure(ctx, device.clone(), guide, open_record)?;
            Ok(Transition::to(S::StepOverview(procedure)))
        }
        (S::FaultSelection { .. }, Intent::Back) => Ok(Transition::to(S::Idle)),

        (S::StepOverview(p), Intent::RefreshGuide { guide }) => refresh(p, guide),
        (S::StepOverview(p), Intent::Back) => Ok(Transition::to(S::FaultSelection { device: p.device.clone() })),
        (S::StepOverview(p), Intent::JumpToStep { index }) => begin_execution(ctx, p, index, None),
        (S::StepOverview(p), Intent::StartFromBeginning { history }) => begin_execution(ctx, p, 0, Some(history)),

        (S::Executing(e), intent) => executing(ctx, e, intent),

        (S::Closing(c), Intent::EditClosure { draft }) => {
            Ok(Transition::to(S::Closing(Closing { draft, ..c.clone() })))
        }
        (S::Closing(c), Intent::Back) => Ok(Transition::to(S::Executing(c.execution.clone()))),
        (S::Closing(c), Intent::SubmitClosure) => submit_closure(ctx, c),

        (state, intent) => Err(invalid(state.name(), &intent)),
    }
}

/// Feed the result of asset identification back into the machine.
pub fn absorb(state: &ProcedureState, outcome: Outcome) -> Result<Transition, EngineError> {
    match (state, outcome) {
        (ProcedureState::Identifying { .. }, Outcome::AssetResolved { device }) => {
            Ok(Transition::to(ProcedureState::FaultSelection { device }))
        }
        // No automatic retry: the technician scans again or picks the device by hand.
        (ProcedureState::Identifying { .. }, Outcome::AssetUnresolved { .. })
        | (ProcedureState::Identifying { .. }, Outcome::IdentificationTimedOut { .. }) => {
            Ok(Transition::to(ProcedureState::Idle))
        }
        (state, _) => Err(EngineError::InvalidStateTransition { state: state.name(), action: "absorb asset resolution" }),
    }
}

fn executing(ctx: &EngineContext, e: &Execution, intent: Intent) -> Result<Transition, EngineError> {
    use ProcedureState as S;

    if let Some(draft) = &e.inquiry {
        return match intent {
            Intent::EditInquiry { draft } => {
                Ok(Transition::to(S::Executing(Execution { inquiry: Some(draft), ..e.clone() })))
            }
            Intent::CancelInquiry => Ok(Transition::to(S::Executing(Execution { inquiry: None, ..e.clone() }))),
            Intent::SubmitInquiry => {
                let step = e
                    .current_step()
                    .ok_or_else(|| EngineError::validation("cursor", format!("step {} out of range", e.cursor)))?;
                let inquiry = build_inquiry(
                    &InquiryRecordingContext {
                        engineer_id: &ctx.technician.id,
                        device: &e.procedure.device,
                        guide: &e.procedure.guide,
                        current_step: step,
                        now_unix: ctx.now_unix,
                    },
                    draft,
                )?;
                Ok(Transition::with(
                    S::Executing(Execution { inquiry: None, ..e.clone() }),
                    Command::EmitInquiry(inquiry),
                ))
            }
            other => Err(invalid(e.state_name(), &other)),
        };
    }

    match intent {
        Intent::ShowHistory { history } => {
            Ok(Transition::to(S::Executing(Execution { history_overlay: Some(history), ..e.clone() })))
        }
        Intent::DismissHistory => Ok(Transition::to(S::Executing(Execution { history_overlay: None, ..e.clone() }))),
        other if e.history_overlay.is_some() => Err(invalid(e.state_name(), &other)),

        Intent::Advance => {
            if e.is_last_step() {
                Ok(Transition::to(S::Closing(Closing {
                    execution: e.clone(),
                    source: SubmissionSource::Pass,
                    draft: Default::default(),
                })))
            } else {
                Ok(Transition::to(S::Executing(Execution { cursor: e.cursor + 1, ..e.clone() })))
            }
        }
        Intent::CloseEarly { confirmed } => {
            if !confirmed {
                return Err(EngineError::validation("confirmation", "closing early must be confirmed"));
            }
            Ok(Transition::to(S::Closing(Closing {
                execution: e.clone(),
                source: SubmissionSource::Close,
                draft: Default::default(),
            })))
        }
        Intent::BeginInquiry => {
            Ok(Transition::to(S::Executing(Execution { inquiry: Some(Default::default()), ..e.clone() })))
        }
        other => Err(invalid(e.state_name(), &other)),
    }
}

fn submit_closure(ctx: &EngineContext, c: &Closing) -> Result<Transition, EngineError> {
    let e = &c.execution;
    let record = build_repair_record(
        &ClosureContext {
            engineer_id: &ctx.technician.id,
            device: &e.procedure.device,
            guide: &e.procedure.guide,
            sequence: &e.procedure.sequence,
            cursor: e.cursor,
            open_record: e.procedure.open_record.as_ref(),
            started_at_unix: e.started_at_unix,
            now_unix: ctx.now_unix,
        },
        c.source,
        &c.draft,
    )?;
    Ok(Transition::with(ProcedureState::Idle, Command::EmitRepairRecord(record)))
}

fn open_procedure(
    ctx: &EngineContext,
    device: Device,
    guide: MaintenanceGuide,
    open_record: Option<RepairRecord>,
) -> Result<Procedure, EngineError> {
    ensure_authorized(ctx, &device)?;
    if guide.device_id != device.id || !guide.published {
        return Err(EngineError::GuideNotAvailable { guide_id: guide.id });
    }
    let open_record =
        open_record.filter(|r| r.is_ongoing() && r.engineer_id == ctx.technician.id && r.guide_id == guide.id);
    Ok(Procedure { sequence: PrioritizedSequence::for_guide(&guide), device, guide, open_record })
}

fn begin_execution(
    ctx: &EngineContext,
    p: &Procedure,
    cursor: usize,
    history: Option<Vec<RepairRecord>>,
) -> Result<Transition, EngineError> {
    if p.sequence.is_empty() {
        return Err(EngineError::validation("guide", format!("{} has no steps", p.guide.id)));
    }
    if cursor >= p.sequence.len() {
        return Err(EngineError::validation("step", format!("index {cursor} out of {} steps", p.sequence.len())));
    }
    Ok(Transition::to(ProcedureState::Executing(Execution {
        procedure: p.clone(),
        cursor,
        started_at_unix: ctx.now_unix,
        history_overlay: history,
        inquiry: None,
    })))
}

fn resume(
    ctx: &EngineContext,
    record: RepairRecord,
    device: Device,
    guide: MaintenanceGuide,
) -> Result<Transition, EngineError> {
    if !record.is_ongoing() || record.engineer_id != ctx.technician.id {
        return Err(EngineError::validation("record", format!("{} is not an open record of this technician", record.id)));
    }
    if record.guide_id != guide.id {
        return Err(EngineError::validation("guide", format!("{} does not belong to record {}", guide.id, record.id)));
    }
    let started_at_unix = record.started_at_unix;
    let done = record.completed_steps.len();
    let procedure = open_procedure(ctx, device, guide, Some(record))?;
    let last = procedure
        .sequence
        .last_index()
        .ok_or_else(|| EngineError::validation("guide", format!("{} has no steps", procedure.guide.id)))?;

    Ok(Transition::to(ProcedureState::Executing(Execution {
        procedure,
        cursor: done.min(last),
        started_at_unix,
        history_overlay: None,
        inquiry: None,
    })))
}

fn refresh(p: &Procedure, guide: MaintenanceGuide) -> Result<Transition, EngineError> {
    if guide.id != p.guide.id {
        return Err(EngineError::validation("guide", format!("expected {}, got {}", p.guide.id, guide.id)));
    }
    if !guide.published || guide.device_id != p.device.id {
        return Ok(Transition::to(ProcedureState::FaultSelection { device: p.device.clone() }));
    }
    if p.sequence.is_current_for(&guide) {
        return Ok(Transition::to(ProcedureState::StepOverview(p.clone())));
    }
    Ok(Transition::to(ProcedureState::StepOverview(Procedure {
        sequence: PrioritizedSequence::for_guide(&guide),
        guide,
        ..p.clone()
    })))
}

fn ensure_authorized(ctx: &EngineContext, device: &Device) -> Result<(), EngineError> {
    if ctx.technician.is_assigned(&device.id) {
        Ok(())
    } else {
        Err(EngineError::AssetNotAuthorized { device_id: device.id.clone() })
    }
}

fn invalid(state: &'static str, intent: &Intent) -> EngineError {
    EngineError::InvalidStateTransition { state, action: intent.name() }
}
