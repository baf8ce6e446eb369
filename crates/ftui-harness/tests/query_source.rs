#![forbid(unsafe_code)]

//! Integration tests: query data source over a fake results controller.

use ftui_datasource::{
    ChangeType, ClassifyError, ControllerEvent, DataSourceConfig, DataSourceError, ListSurface,
    LoadState, ObjectChangeField, ObservationBridge, Position, ProtocolError, QueryDataSource,
    RawChangeType,
};
use ftui_harness::{FakeResultsController, RecordingSink};

type Source = QueryDataSource<FakeResultsController<char>, RecordingSink>;

fn p(section: usize, index: usize) -> Position {
    Position::new(section, index)
}

fn open(items: &str) -> (FakeResultsController<char>, Source) {
    let controller = FakeResultsController::single(items.chars().collect());
    let source = QueryDataSource::new(controller.clone(), RecordingSink::new());
    (controller, source)
}

/// Transcript since the last call, initial load notification included.
fn drain(source: &Source) -> Vec<String> {
    source.with_sink(|sink| {
        let lines = sink.transcript();
        sink.take();
        lines
    })
}

fn assert_framed(source: &Source) {
    source.with_sink(|sink| {
        if let Err(e) = sink.check_framing() {
            panic!("bad framing: {e}\n{:#?}", sink.transcript());
        }
    });
}

// ============================================================================
// Initial load
// ============================================================================

#[test]
fn loads_and_reports_content() {
    let (_controller, source) = open("abc");
    assert_eq!(drain(&source), ["loaded"]);
    assert_eq!(source.load_state(), LoadState::Loaded);
    assert_eq!(source.section_count(), 1);
    assert_eq!(source.item_count(0), 3);
    assert_eq!(source.item_at(p(0, 1)), Ok('b'));
    assert!(source.is_observing());
}

#[test]
fn empty_result_is_no_content() {
    let (_controller, source) = open("");
    assert_eq!(source.load_state(), LoadState::NoContent);
    assert!(source.is_empty());
    assert_eq!(
        source.item_at(p(0, 0)),
        Err(DataSourceError::OutOfRange { position: p(0, 0) })
    );
}

#[test]
fn failed_fetch_leaves_list_empty() {
    let controller = FakeResultsController::single(vec!['a']).failing("store offline");
    let source = QueryDataSource::new(controller, RecordingSink::new());
    assert_eq!(drain(&source), ["load failed: store offline"]);
    let LoadState::Failed(e) = source.load_state() else {
        panic!("expected failed load state");
    };
    assert_eq!(e.message(), "store offline");
    assert_eq!(source.item_count(0), 0);
    assert_eq!(
        source.item_at(p(0, 0)),
        Err(DataSourceError::OutOfRange { position: p(0, 0) })
    );
    assert!(source.is_observing());
}

// ============================================================================
// Read-through surface
// ============================================================================

#[test]
fn positions_of_absent_item_is_empty() {
    let (_controller, source) = open("ab");
    assert_eq!(source.positions_of(&'b'), vec![p(0, 1)]);
    assert!(source.positions_of(&'z').is_empty());
    assert_eq!(source.first_position_of(&'z'), None);
}

#[test]
fn removal_is_rejected_even_for_valid_positions() {
    let (_controller, mut source) = open("ab");
    for position in [p(0, 0), p(0, 1), p(3, 9)] {
        assert_eq!(
            source.remove_at(position),
            Err(DataSourceError::Unsupported {
                operation: "remove_at"
            })
        );
    }
    assert_eq!(source.item_count(0), 2);
}

#[test]
fn title_comes_from_config() {
    let controller = FakeResultsController::single(vec!['a']);
    let source = QueryDataSource::with_config(
        controller,
        RecordingSink::new(),
        DataSourceConfig::new().title("Recent"),
    );
    assert_eq!(source.title(), Some("Recent"));
    assert_eq!(source.config().section_scope, None);
}

// ============================================================================
// Batches
// ============================================================================

#[test]
fn insert_batch_is_framed() {
    let (controller, source) = open("ac");
    drain(&source);

    controller.set_items(vec!['a', 'b', 'c']);
    controller
        .emit_batch([ControllerEvent::inserted(p(0, 1))])
        .unwrap();

    assert_eq!(drain(&source), ["begin 1", "insert 0.1", "end"]);
    assert_eq!(source.item_at(p(0, 1)), Ok('b'));
}

#[test]
fn nothing_reaches_the_sink_before_did_change() {
    let (controller, source) = open("ab");
    drain(&source);

    controller.emit(&ControllerEvent::WillChange).unwrap();
    controller
        .emit(&ControllerEvent::deleted(p(0, 0)))
        .unwrap();
    controller
        .emit(&ControllerEvent::updated(p(0, 1)))
        .unwrap();
    assert!(source.is_collecting());
    assert!(drain(&source).is_empty());

    controller.emit(&ControllerEvent::DidChange).unwrap();
    assert!(!source.is_collecting());
    assert_eq!(drain(&source), ["begin 2", "remove 0.0", "refresh 0.1", "end"]);
}

#[test]
fn updates_only_batch_is_refresh_only() {
    let (controller, source) = open("abc");
    drain(&source);
    controller
        .emit_batch([
            ControllerEvent::updated(p(0, 0)),
            ControllerEvent::updated(p(0, 2)),
        ])
        .unwrap();
    assert_eq!(
        drain(&source),
        ["begin 2 refresh-only", "refresh 0.0", "refresh 0.2", "end"]
    );
}

#[test]
fn update_refreshes_the_old_position() {
    let (controller, source) = open("abc");
    drain(&source);
    controller
        .emit_batch([ControllerEvent::object(
            ChangeType::Update,
            Some(p(0, 2)),
            Some(p(0, 0)),
        )])
        .unwrap();
    assert_eq!(drain(&source), ["begin 1 refresh-only", "refresh 0.2", "end"]);
}

#[test]
fn empty_batch_makes_no_sink_calls() {
    let (controller, source) = open("a");
    drain(&source);
    controller.emit_batch([]).unwrap();
    assert!(drain(&source).is_empty());
}

#[test]
fn back_to_back_batches_stay_separate() {
    let (controller, source) = open("abc");
    drain(&source);
    controller
        .emit_batch([ControllerEvent::deleted(p(0, 0))])
        .unwrap();
    controller
        .emit_batch([ControllerEvent::moved(p(0, 0), p(0, 1))])
        .unwrap();
    assert_framed(&source);
    assert_eq!(
        drain(&source),
        [
            "begin 1",
            "remove 0.0",
            "end",
            "begin 1",
            "move 0.0 -> 0.1",
            "end"
        ]
    );
}

#[test]
fn remove_then_insert_is_not_merged_into_a_move() {
    let (controller, source) = open("abc");
    drain(&source);
    controller
        .emit_batch([
            ControllerEvent::deleted(p(0, 0)),
            ControllerEvent::inserted(p(0, 2)),
        ])
        .unwrap();
    assert_eq!(
        drain(&source),
        ["begin 2", "remove 0.0", "insert 0.2", "end"]
    );
}

#[test]
fn section_changes_are_forwarded_in_order() {
    let controller = FakeResultsController::new(vec![vec!['a'], vec!['b']]);
    let source = QueryDataSource::new(controller.clone(), RecordingSink::new());
    drain(&source);
    controller
        .emit_batch([
            ControllerEvent::section(ChangeType::Delete, 0),
            ControllerEvent::section(ChangeType::Insert, 1),
            ControllerEvent::inserted(p(1, 0)),
        ])
        .unwrap();
    assert_eq!(
        drain(&source),
        [
            "begin 3",
            "remove section 0",
            "insert section 1",
            "insert 1.0",
            "end"
        ]
    );
}

// ============================================================================
// Fatal errors
// ============================================================================

#[test]
fn unknown_change_kind_aborts_the_batch() {
    let (controller, source) = open("ab");
    drain(&source);

    controller.emit(&ControllerEvent::WillChange).unwrap();
    controller
        .emit(&ControllerEvent::inserted(p(0, 0)))
        .unwrap();
    let err = controller
        .emit(&ControllerEvent::ObjectChanged {
            kind: RawChangeType(9),
            old: Some(p(0, 0)),
            new: None,
        })
        .unwrap_err();
    assert_eq!(
        err,
        DataSourceError::Classify(ClassifyError::UnknownChangeType(9))
    );
    assert!(err.is_fatal());
    assert!(!source.is_collecting());

    // The backend may still finish its batch; nothing of it is delivered.
    controller.emit(&ControllerEvent::DidChange).unwrap();
    assert!(drain(&source).is_empty());

    controller
        .emit_batch([ControllerEvent::updated(p(0, 1))])
        .unwrap();
    assert_eq!(drain(&source), ["begin 1 refresh-only", "refresh 0.1", "end"]);
}

#[test]
fn section_move_is_fatal() {
    let (controller, source) = open("a");
    drain(&source);
    let err = controller
        .emit_batch([
            ControllerEvent::inserted(p(0, 0)),
            ControllerEvent::section(ChangeType::Move, 0),
        ])
        .unwrap_err();
    assert_eq!(
        err,
        DataSourceError::Classify(ClassifyError::UnexpectedSectionChange(ChangeType::Move))
    );
    controller.emit(&ControllerEvent::DidChange).unwrap();
    assert!(drain(&source).is_empty());
}

#[test]
fn move_without_destination_is_fatal() {
    let (controller, _source) = open("ab");
    let err = controller
        .emit_batch([ControllerEvent::object(
            ChangeType::Move,
            Some(p(0, 0)),
            None,
        )])
        .unwrap_err();
    assert_eq!(
        err,
        DataSourceError::Classify(ClassifyError::MissingPosition {
            kind: ChangeType::Move,
            field: ObjectChangeField::New,
        })
    );
}

#[test]
fn change_outside_a_batch_is_a_protocol_error() {
    let (controller, source) = open("a");
    drain(&source);
    let err = controller
        .emit(&ControllerEvent::inserted(p(0, 0)))
        .unwrap_err();
    assert_eq!(err, DataSourceError::Protocol(ProtocolError::NotOpen));
    assert!(drain(&source).is_empty());
}

#[test]
fn reopening_a_batch_keeps_the_open_one() {
    let (controller, source) = open("ab");
    drain(&source);
    controller.emit(&ControllerEvent::WillChange).unwrap();
    controller
        .emit(&ControllerEvent::deleted(p(0, 1)))
        .unwrap();
    assert_eq!(
        controller.emit(&ControllerEvent::WillChange),
        Err(DataSourceError::Protocol(ProtocolError::AlreadyOpen))
    );
    controller.emit(&ControllerEvent::DidChange).unwrap();
    assert_eq!(drain(&source), ["begin 1", "remove 0.1", "end"]);
}

#[test]
fn stray_did_change_is_ignored() {
    let (controller, source) = open("a");
    drain(&source);
    controller.emit(&ControllerEvent::DidChange).unwrap();
    assert!(drain(&source).is_empty());
}

// ============================================================================
// Section scope
// ============================================================================

fn scoped() -> (FakeResultsController<char>, Source) {
    let controller = FakeResultsController::new(vec![vec!['a'], vec!['b', 'c'], vec!['d']]);
    let source = QueryDataSource::with_config(
        controller.clone(),
        RecordingSink::new(),
        DataSourceConfig::new().section_scope(1),
    );
    drain(&source);
    (controller, source)
}

#[test]
fn scope_exposes_one_section_as_section_zero() {
    let (_controller, source) = scoped();
    assert_eq!(source.section_count(), 1);
    assert_eq!(source.item_count(0), 2);
    assert_eq!(source.item_count(1), 0);
    assert_eq!(source.item_at(p(0, 1)), Ok('c'));
    assert_eq!(
        source.item_at(p(1, 0)),
        Err(DataSourceError::OutOfRange { position: p(1, 0) })
    );
    assert_eq!(source.positions_of(&'b'), vec![p(0, 0)]);
    assert!(source.positions_of(&'d').is_empty());
}

#[test]
fn scope_renumbers_and_filters_changes() {
    let (controller, source) = scoped();
    controller
        .emit_batch([
            ControllerEvent::inserted(p(0, 1)),
            ControllerEvent::inserted(p(1, 2)),
            ControllerEvent::section(ChangeType::Insert, 3),
            ControllerEvent::updated(p(1, 0)),
        ])
        .unwrap();
    assert_eq!(
        drain(&source),
        ["begin 2", "insert 0.2", "refresh 0.0", "end"]
    );
}

#[test]
fn scope_splits_moves_across_the_boundary() {
    let (controller, source) = scoped();
    controller
        .emit_batch([
            ControllerEvent::moved(p(1, 0), p(2, 0)),
            ControllerEvent::moved(p(0, 0), p(1, 1)),
            ControllerEvent::moved(p(1, 1), p(1, 0)),
        ])
        .unwrap();
    assert_eq!(
        drain(&source),
        [
            "begin 3",
            "remove 0.0",
            "insert 0.1",
            "move 0.1 -> 0.0",
            "end"
        ]
    );
}

#[test]
fn scope_still_rejects_invalid_section_changes() {
    let (controller, source) = scoped();
    let err = controller
        .emit_batch([ControllerEvent::section(ChangeType::Update, 0)])
        .unwrap_err();
    assert!(err.is_fatal());
    controller.emit(&ControllerEvent::DidChange).unwrap();
    assert!(drain(&source).is_empty());
}

#[test]
fn batch_entirely_outside_scope_is_silent() {
    let (controller, source) = scoped();
    controller
        .emit_batch([ControllerEvent::deleted(p(2, 0))])
        .unwrap();
    assert!(drain(&source).is_empty());
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn teardown_unregisters_and_silences() {
    let (controller, mut source) = open("ab");
    drain(&source);
    assert_eq!(controller.observer_count(), 1);

    source.teardown();
    assert!(!source.is_observing());
    assert_eq!(controller.observer_count(), 0);

    controller
        .emit_batch([ControllerEvent::inserted(p(0, 0))])
        .unwrap();
    assert!(drain(&source).is_empty());

    source.teardown();
    assert_eq!(controller.observer_count(), 0);
}

#[test]
fn teardown_mid_batch_drops_the_pending_batch() {
    let (controller, mut source) = open("ab");
    drain(&source);
    controller.emit(&ControllerEvent::WillChange).unwrap();
    controller
        .emit(&ControllerEvent::deleted(p(0, 0)))
        .unwrap();
    source.teardown();
    assert!(!source.is_collecting());
    controller.emit(&ControllerEvent::DidChange).unwrap();
    assert!(drain(&source).is_empty());
}

#[test]
fn dropping_the_source_unregisters() {
    let (controller, source) = open("a");
    drop(source);
    assert_eq!(controller.observer_count(), 0);
    controller
        .emit_batch([ControllerEvent::inserted(p(0, 0))])
        .unwrap();
}
