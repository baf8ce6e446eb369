#![forbid(unsafe_code)]

//! Proptest strategies for data source inputs.

use ftui_datasource::{ChangeRecord, ChangeType, ControllerEvent, Position, RawChangeType};
use proptest::prelude::*;

/// Sections drawn by the strategies below.
pub const MAX_SECTIONS: usize = 4;
/// Items per section drawn by the strategies below.
pub const MAX_INDEX: usize = 32;

pub fn position() -> impl Strategy<Value = Position> {
    (0..MAX_SECTIONS, 0..MAX_INDEX).prop_map(Position::from)
}

pub fn change_type() -> impl Strategy<Value = ChangeType> {
    prop_oneof![
        Just(ChangeType::Insert),
        Just(ChangeType::Delete),
        Just(ChangeType::Move),
        Just(ChangeType::Update),
    ]
}

/// Any classified record.
pub fn change_record() -> impl Strategy<Value = ChangeRecord> {
    prop_oneof![
        (0..MAX_SECTIONS).prop_map(ChangeRecord::SectionInserted),
        (0..MAX_SECTIONS).prop_map(ChangeRecord::SectionRemoved),
        position().prop_map(|new| ChangeRecord::ItemInserted { new }),
        position().prop_map(|old| ChangeRecord::ItemRemoved { old }),
        (position(), position()).prop_map(|(old, new)| ChangeRecord::ItemMoved { old, new }),
        position().prop_map(|at| ChangeRecord::ItemUpdated { at }),
    ]
}

/// Up to `max` records, possibly empty.
pub fn change_records(max: usize) -> impl Strategy<Value = Vec<ChangeRecord>> {
    prop::collection::vec(change_record(), 0..=max)
}

/// A non-empty batch of in-place updates.
pub fn update_records(max: usize) -> impl Strategy<Value = Vec<ChangeRecord>> {
    prop::collection::vec(
        position().prop_map(|at| ChangeRecord::ItemUpdated { at }),
        1..=max.max(1),
    )
}

/// The controller event a record would arrive as.
#[must_use]
pub fn event_for(record: ChangeRecord) -> ControllerEvent {
    match record {
        ChangeRecord::SectionInserted(s) => ControllerEvent::section(ChangeType::Insert, s),
        ChangeRecord::SectionRemoved(s) => ControllerEvent::section(ChangeType::Delete, s),
        ChangeRecord::ItemInserted { new } => ControllerEvent::inserted(new),
        ChangeRecord::ItemRemoved { old } => ControllerEvent::deleted(old),
        ChangeRecord::ItemMoved { old, new } => ControllerEvent::moved(old, new),
        ChangeRecord::ItemUpdated { at } => ControllerEvent::updated(at),
    }
}

/// Object or section events that classify cleanly, with their expected
/// records.
pub fn valid_events(max: usize) -> impl Strategy<Value = Vec<(ControllerEvent, ChangeRecord)>> {
    change_records(max).prop_map(|records| {
        records
            .into_iter()
            .map(|record| (event_for(record), record))
            .collect()
    })
}

/// Raw change-kind codes no backend contract defines.
pub fn unknown_raw_kind() -> impl Strategy<Value = RawChangeType> {
    prop_oneof![Just(0u64), 5u64..=u64::MAX].prop_map(RawChangeType)
}

/// Section events that must be rejected.
pub fn invalid_section_event() -> impl Strategy<Value = ControllerEvent> {
    (
        prop_oneof![Just(ChangeType::Move), Just(ChangeType::Update)],
        0..MAX_SECTIONS,
    )
        .prop_map(|(kind, section)| ControllerEvent::section(kind, section))
}
