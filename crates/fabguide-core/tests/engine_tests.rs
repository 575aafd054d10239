use fabguide_core::*;

fn step(id: &str, count: Option<u32>) -> GuideStep {
    GuideStep {
        id: StepId::from_str(id),
        stage: ProcessStage::Diagnosis,
        title: format!("Step {id}"),
        description: format!("Do {id}"),
        instruction: None,
        judgment_method: None,
        help_content: None,
        safety_warning: None,
        image_urls: vec![],
        video_urls: vec![],
        pdf_urls: vec![],
        media_url: None,
        media_type: None,
        is_confirmation_required: true,
        history_repair_count: count,
        branches: vec![],
    }
}

fn device(id: &str) -> Device {
    Device {
        id: DeviceId::from_str(id),
        device_type: "Lithography".into(),
        model: "NXT:2050i".into(),
        sub_model: "Immersion DUV".into(),
        serial_number: format!("SN-{id}"),
        status: DeviceStatus::Maintenance,
        bound_sop_ids: vec![GuideId::from_str("g1"), GuideId::from_str("g3")],
    }
}

fn guide_g1() -> MaintenanceGuide {
    MaintenanceGuide {
        id: GuideId::from_str("g1"),
        device_id: DeviceId::from_str("d1"),
        fault_code: "AL-1002".into(),
        fault_category: "Sensor contamination".into(),
        operation_type: "Clean and calibrate".into(),
        scope: "Optical alignment".into(),
        fault_phenomenon: "Alignment contrast low".into(),
        version: "2.4.1".into(),
        published: true,
        total_occurrence_count: Some(128),
        steps: vec![
            step("s1", Some(15)),
            step("s2", Some(45)),
            step("s3", None),
            step("s4", None),
            step("s5", None),
        ],
    }
}

fn unpublished_g3() -> MaintenanceGuide {
    MaintenanceGuide {
        id: GuideId::from_str("g3"),
        fault_code: "AL-2041".into(),
        published: false,
        ..guide_g1()
    }
}

fn ctx() -> EngineContext {
    EngineContext {
        technician: Technician {
            id: EngineerId::from_str("u1"),
            name: "Chen".into(),
            assigned_device_ids: vec![DeviceId::from_str("d1"), DeviceId::from_str("d2")],
        },
        now_unix: 1_000,
    }
}

fn apply(state: &ProcedureState, intent: Intent) -> ProcedureState {
    reduce(state, &ctx(), intent).unwrap().state
}

fn overview() -> ProcedureState {
    let s = apply(&ProcedureState::Idle, Intent::ChooseDevice { device: device("d1") });
    apply(&s, Intent::SelectGuide { guide: guide_g1(), open_record: None })
}

fn executing_at(cursor: usize) -> ProcedureState {
    apply(&overview(), Intent::JumpToStep { index: cursor })
}

fn emitted_record(t: &Transition) -> &RepairRecord {
    match t.commands.as_slice() {
        [Command::EmitRepairRecord(r)] => r,
        other => panic!("expected one record, got {other:?}"),
    }
}

#[test]
fn scan_emits_resolve_and_resolution_sets_device() {
    let t = reduce(&ProcedureState::Idle, &ctx(), Intent::StartScan { scan_code: " ASML-2050-001 ".into() }).unwrap();
    assert_eq!(t.commands, vec![Command::ResolveAsset { scan_code: "ASML-2050-001".into() }]);
    assert_eq!(t.state.screen(), Screen::Scanning);

    let resolved = absorb(&t.state, Outcome::AssetResolved { device: device("d1") }).unwrap();
    assert_eq!(resolved.state.device().map(|d| d.id.as_str()), Some("d1"));
    assert_eq!(resolved.state.screen(), Screen::FaultSelect);
}

#[test]
fn identifying_only_accepts_cancel_or_continue() {
    let t = reduce(&ProcedureState::Idle, &ctx(), Intent::StartScan { scan_code: "x".into() }).unwrap();
    let err = reduce(&t.state, &ctx(), Intent::Advance).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    assert_eq!(apply(&t.state, Intent::CancelScan), ProcedureState::Idle);
    let cont = apply(&t.state, Intent::ContinueWithDevice { device: device("d2") });
    assert!(matches!(cont, ProcedureState::FaultSelection { .. }));
}

#[test]
fn failed_resolution_returns_to_idle_without_retry() {
    let t = reduce(&ProcedureState::Idle, &ctx(), Intent::StartScan { scan_code: "x".into() }).unwrap();
    let failed = absorb(&t.state, Outcome::IdentificationTimedOut { secs: 5 }).unwrap();
    assert_eq!(failed.state, ProcedureState::Idle);
    assert!(failed.commands.is_empty());
}

#[test]
fn unpublished_guide_is_not_available_and_state_is_unchanged() {
    let selecting = apply(&ProcedureState::Idle, Intent::ChooseDevice { device: device("d1") });
    let err = reduce(&selecting, &ctx(), Intent::SelectGuide { guide: unpublished_g3(), open_record: None }).unwrap_err();
    assert_eq!(err, EngineError::GuideNotAvailable { guide_id: GuideId::from_str("g3") });
    assert_eq!(err.kind(), ErrorKind::Availability);
    assert!(selecting.guide().is_none());
}

#[test]
fn unauthorized_device_is_rejected() {
    let foreign = device("d4");
    let err = reduce(&ProcedureState::Idle, &ctx(), Intent::ChooseDevice { device: foreign.clone() }).unwrap_err();
    assert_eq!(err, EngineError::AssetNotAuthorized { device_id: foreign.id.clone() });

    // a scanned device is accepted, but its guides are not
    let t = reduce(&ProcedureState::Idle, &ctx(), Intent::StartScan { scan_code: "VII".into() }).unwrap();
    let scanned = absorb(&t.state, Outcome::AssetResolved { device: foreign.clone() }).unwrap().state;
    let mut g = guide_g1();
    g.device_id = foreign.id.clone();
    let err = reduce(&scanned, &ctx(), Intent::SelectGuide { guide: g, open_record: None }).unwrap_err();
    assert!(matches!(err, EngineError::AssetNotAuthorized { .. }));
}

#[test]
fn overview_uses_prioritized_order() {
    let state = overview();
    let order: Vec<_> = state.procedure().unwrap().sequence.steps.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(order, vec!["s2", "s1", "s3", "s4", "s5"]);
    assert_eq!(state.cursor(), None);
}

#[test]
fn start_from_beginning_shows_history_before_proceeding() {
    let history = vec![];
    let state = apply(&overview(), Intent::StartFromBeginning { history });
    assert_eq!(state.cursor(), Some(0));
    assert_eq!(state.screen(), Screen::HistoryOverlay);

    let err = reduce(&state, &ctx(), Intent::Advance).unwrap_err();
    assert!(matches!(err, EngineError::InvalidStateTransition { state: "reviewing history", .. }));

    let state = apply(&state, Intent::DismissHistory);
    let state = apply(&state, Intent::Advance);
    assert_eq!(state.cursor(), Some(1));
}

#[test]
fn jump_to_step_skips_history_and_validates_index() {
    let state = executing_at(3);
    assert_eq!(state.cursor(), Some(3));
    assert_eq!(state.screen(), Screen::Guide);

    let err = reduce(&overview(), &ctx(), Intent::JumpToStep { index: 5 }).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn advance_moves_by_exactly_one() {
    let mut state = executing_at(0);
    for expected in 1..=4 {
        state = apply(&state, Intent::Advance);
        assert_eq!(state.cursor(), Some(expected));
    }
}

#[test]
fn advancing_past_final_step_closes_with_pass() {
    let state = apply(&executing_at(4), Intent::Advance);
    match &state {
        ProcedureState::Closing(c) => {
            assert_eq!(c.source, SubmissionSource::Pass);
            assert_eq!(c.execution.cursor, 4);
        }
        other => panic!("expected closing, got {other:?}"),
    }
}

#[test]
fn close_early_requires_confirmation_and_uses_close() {
    let state = executing_at(2);
    let err = reduce(&state, &ctx(), Intent::CloseEarly { confirmed: false }).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let closing = apply(&state, Intent::CloseEarly { confirmed: true });
    assert!(matches!(&closing, ProcedureState::Closing(c) if c.source == SubmissionSource::Close));
}

#[test]
fn closure_records_k_plus_one_steps_and_resets() {
    for k in 0..5 {
        let closing = apply(&executing_at(k), Intent::CloseEarly { confirmed: true });
        let closing = apply(
            &closing,
            Intent::EditClosure { draft: ClosureDraft { treatment: "cleaned sensor".into(), ..Default::default() } },
        );
        let t = reduce(&closing, &ctx(), Intent::SubmitClosure).unwrap();
        assert_eq!(t.state, ProcedureState::Idle);
        let record = emitted_record(&t);
        assert_eq!(record.completed_steps.len(), k + 1);
        assert_eq!(record.status, RecordStatus::Completed);
        assert_eq!(record.ended_at_unix, Some(1_000));
    }
}

#[test]
fn empty_treatment_keeps_closing_state() {
    let closing = apply(&executing_at(1), Intent::CloseEarly { confirmed: true });
    let err = reduce(&closing, &ctx(), Intent::SubmitClosure).unwrap_err();
    assert!(matches!(err, EngineError::ValidationFailed { field: "treatment", .. }));
    assert!(matches!(closing, ProcedureState::Closing(_)));
}

#[test]
fn back_from_closing_preserves_cursor() {
    let closing = apply(&executing_at(2), Intent::CloseEarly { confirmed: true });
    let back = apply(&closing, Intent::Back);
    assert_eq!(back.cursor(), Some(2));
    assert_eq!(back.screen(), Screen::Guide);
}

#[test]
fn inquiry_unrelated_to_step_uses_unknown() {
    let state = apply(&executing_at(3), Intent::BeginInquiry);
    assert_eq!(state.screen(), Screen::SubmitInquiry);
    assert!(reduce(&state, &ctx(), Intent::Advance).is_err());

    let state = apply(
        &state,
        Intent::EditInquiry {
            draft: InquiryDraft { question: "Chuck shows arcing".into(), photo_url: None, is_step_related: false },
        },
    );
    let t = reduce(&state, &ctx(), Intent::SubmitInquiry).unwrap();
    assert_eq!(t.state.cursor(), Some(3));
    assert_eq!(t.state.screen(), Screen::Guide);
    match t.commands.as_slice() {
        [Command::EmitInquiry(i)] => {
            assert!(i.step_id.is_unknown());
            assert_eq!(i.guide_id.as_str(), "g1");
            assert_eq!(i.device_id.as_str(), "d1");
            assert!(!i.context.as_ref().unwrap().is_step_related);
        }
        other => panic!("expected inquiry, got {other:?}"),
    }
}

#[test]
fn inquiry_cancel_discards_draft() {
    let before = executing_at(2);
    let composing = apply(&before, Intent::BeginInquiry);
    let composing = apply(&composing, Intent::EditInquiry { draft: InquiryDraft { question: "?".into(), ..Default::default() } });
    let t = reduce(&composing, &ctx(), Intent::CancelInquiry).unwrap();
    assert!(t.commands.is_empty());
    assert_eq!(t.state, before);
}

#[test]
fn empty_inquiry_is_rejected_without_leaving_composition() {
    let composing = apply(&executing_at(0), Intent::BeginInquiry);
    let err = reduce(&composing, &ctx(), Intent::SubmitInquiry).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn executing_only_operations_are_rejected_elsewhere() {
    for intent in [Intent::Advance, Intent::BeginInquiry, Intent::CloseEarly { confirmed: true }] {
        let err = reduce(&overview(), &ctx(), intent).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }
    let err = reduce(&ProcedureState::Idle, &ctx(), Intent::SubmitClosure).unwrap_err();
    assert!(matches!(err, EngineError::InvalidStateTransition { state: "idle", action: "submit closure" }));
}

#[test]
fn open_record_is_closed_in_place() {
    let open = RepairRecord {
        id: RecordId::from_str("r4"),
        guide_id: GuideId::from_str("g1"),
        engineer_id: EngineerId::from_str("u1"),
        started_at_unix: 500,
        ended_at_unix: None,
        fault_reason: "tbd".into(),
        treatment: "cleaning in progress".into(),
        photos: vec![],
        completed_steps: vec![StepId::from_str("s2")],
        status: RecordStatus::Ongoing,
        submission_source: None,
        context: None,
    };
    let state = apply(
        &ProcedureState::Idle,
        Intent::ResumeOpenRecord { record: open.clone(), device: device("d1"), guide: guide_g1() },
    );
    assert_eq!(state.cursor(), Some(1));

    let closing = apply(&state, Intent::CloseEarly { confirmed: true });
    let closing = apply(&closing, Intent::EditClosure { draft: ClosureDraft { treatment: "done".into(), ..Default::default() } });
    let t = reduce(&closing, &ctx(), Intent::SubmitClosure).unwrap();
    let record = emitted_record(&t);
    assert_eq!(record.id, open.id);
    assert_eq!(record.started_at_unix, 500);
    assert_eq!(record.completed_steps, vec![StepId::from_str("s2"), StepId::from_str("s1")]);
}

#[test]
fn refresh_recomputes_only_when_guide_changed() {
    let state = overview();
    let same = apply(&state, Intent::RefreshGuide { guide: guide_g1() });
    assert_eq!(same, state);

    let mut edited = guide_g1();
    edited.version = "2.5.0".into();
    edited.steps[4].history_repair_count = Some(90);
    let refreshed = apply(&state, Intent::RefreshGuide { guide: edited.clone() });
    let seq = &refreshed.procedure().unwrap().sequence;
    assert!(seq.is_current_for(&edited));
    assert_eq!(seq.steps[0].id.as_str(), "s5");

    edited.published = false;
    let withdrawn = apply(&state, Intent::RefreshGuide { guide: edited });
    assert!(matches!(withdrawn, ProcedureState::FaultSelection { .. }));
}

#[test]
fn end_to_end_close_early_after_four_advances() {
    let mut state = ProcedureState::Idle;
    let t = reduce(&state, &ctx(), Intent::StartScan { scan_code: "ASML-2050-001".into() }).unwrap();
    state = absorb(&t.state, Outcome::AssetResolved { device: device("d1") }).unwrap().state;
    state = apply(&state, Intent::SelectGuide { guide: guide_g1(), open_record: None });
    state = apply(&state, Intent::StartFromBeginning { history: vec![] });
    state = apply(&state, Intent::DismissHistory);
    for _ in 0..4 {
        state = apply(&state, Intent::Advance);
    }
    assert_eq!(state.cursor(), Some(4));

    state = apply(&state, Intent::CloseEarly { confirmed: true });
    state = apply(
        &state,
        Intent::EditClosure {
            draft: ClosureDraft { treatment: "Replaced sensor lens".into(), is_new_issue: true, ..Default::default() },
        },
    );
    let t = reduce(&state, &ctx(), Intent::SubmitClosure).unwrap();
    assert_eq!(t.state, ProcedureState::Idle);

    let record = emitted_record(&t);
    assert_eq!(record.completed_steps.len(), 5);
    assert_eq!(record.submission_source, Some(SubmissionSource::Close));
    assert_eq!(record.status, RecordStatus::Completed);
    let context = record.context.as_ref().unwrap();
    assert_eq!(context.device_id.as_str(), "d1");
    assert_eq!(context.fault_code, "AL-1002");
    assert_eq!(context.last_step_id.as_ref().map(|s| s.as_str()), Some("s5"));
    assert!(context.is_new_issue);
}
