#![forbid(unsafe_code)]

//! A [`BatchSink`] that records every call.
//!
//! Assertions usually go through [`RecordingSink::transcript`], one line per
//! call:
//!
//! ```text
//! begin 3
//! remove 0.2
//! insert 0.0
//! move 0.1 -> 0.4
//! end
//! ```
//!
//! A refresh-only batch opens with `begin 2 refresh-only`.

use std::fmt;

use ftui_datasource::{BatchInfo, BatchSink, Position, QueryError};

/// One recorded sink call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Begin(BatchInfo),
    End,
    SectionsInserted(Vec<usize>),
    SectionsRemoved(Vec<usize>),
    ItemsInserted(Vec<Position>),
    ItemsRemoved(Vec<Position>),
    ItemsRefreshed(Vec<Position>),
    ItemMoved(Position, Position),
    Reload,
    ContentLoaded(Option<QueryError>),
}

impl SinkCall {
    /// Whether this call may only appear inside a batch.
    #[must_use]
    pub fn is_batch_body(&self) -> bool {
        !matches!(
            self,
            Self::Begin(_) | Self::End | Self::Reload | Self::ContentLoaded(_)
        )
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for SinkCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Begin(info) if info.refresh_only => write!(f, "begin {} refresh-only", info.len),
            Self::Begin(info) => write!(f, "begin {}", info.len),
            Self::End => f.write_str("end"),
            Self::SectionsInserted(s) => write!(f, "insert section {}", join(s)),
            Self::SectionsRemoved(s) => write!(f, "remove section {}", join(s)),
            Self::ItemsInserted(p) => write!(f, "insert {}", join(p)),
            Self::ItemsRemoved(p) => write!(f, "remove {}", join(p)),
            Self::ItemsRefreshed(p) => write!(f, "refresh {}", join(p)),
            Self::ItemMoved(from, to) => write!(f, "move {from} -> {to}"),
            Self::Reload => f.write_str("reload"),
            Self::ContentLoaded(None) => f.write_str("loaded"),
            Self::ContentLoaded(Some(e)) => write!(f, "load failed: {}", e.message()),
        }
    }
}

/// Ways a recorded call sequence can violate batch framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// `begin_batch` while a batch was open.
    NestedBegin { at: usize },
    /// `end_batch` with no open batch.
    UnmatchedEnd { at: usize },
    /// A batch-body call outside a batch.
    StrayCall { at: usize },
    /// A reload or load notification inside a batch.
    LifecycleInBatch { at: usize },
    /// A batch that never closed.
    Unterminated,
    /// `begin_batch` announced a length the body does not match.
    LengthMismatch { at: usize, announced: usize, actual: usize },
}

impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NestedBegin { at } => write!(f, "call {at}: begin inside an open batch"),
            Self::UnmatchedEnd { at } => write!(f, "call {at}: end without begin"),
            Self::StrayCall { at } => write!(f, "call {at}: change outside a batch"),
            Self::LifecycleInBatch { at } => write!(f, "call {at}: lifecycle call inside a batch"),
            Self::Unterminated => f.write_str("batch never ended"),
            Self::LengthMismatch {
                at,
                announced,
                actual,
            } => write!(f, "call {at}: batch announced {announced} records, carried {actual}"),
        }
    }
}

impl std::error::Error for FramingError {}

/// Records every sink call in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    calls: Vec<SinkCall>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call so far.
    #[must_use]
    pub fn calls(&self) -> &[SinkCall] {
        &self.calls
    }

    /// Take and clear the recorded calls.
    pub fn take(&mut self) -> Vec<SinkCall> {
        std::mem::take(&mut self.calls)
    }

    /// One line per call, see the module docs.
    #[must_use]
    pub fn transcript(&self) -> Vec<String> {
        self.calls.iter().map(ToString::to_string).collect()
    }

    /// Number of `begin_batch` calls.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, SinkCall::Begin(_)))
            .count()
    }

    /// Bodies of every completed batch, framing calls stripped.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<SinkCall>> {
        let mut batches = Vec::new();
        let mut current: Option<Vec<SinkCall>> = None;
        for call in &self.calls {
            match call {
                SinkCall::Begin(_) => current = Some(Vec::new()),
                SinkCall::End => batches.extend(current.take()),
                other => {
                    if let Some(body) = current.as_mut() {
                        body.push(other.clone());
                    }
                }
            }
        }
        batches
    }

    /// Check begin/end pairing, body placement and announced lengths.
    ///
    /// # Errors
    ///
    /// The first [`FramingError`] found.
    pub fn check_framing(&self) -> Result<(), FramingError> {
        check_framing(&self.calls)
    }
}

/// Check a call sequence for well-formed batch framing.
///
/// # Errors
///
/// The first [`FramingError`] found.
pub fn check_framing(calls: &[SinkCall]) -> Result<(), FramingError> {
    let mut open: Option<(usize, usize)> = None;
    let mut body = 0;
    for (at, call) in calls.iter().enumerate() {
        match call {
            SinkCall::Begin(info) => {
                if open.is_some() {
                    return Err(FramingError::NestedBegin { at });
                }
                open = Some((at, info.len));
                body = 0;
            }
            SinkCall::End => {
                let Some((begin_at, announced)) = open.take() else {
                    return Err(FramingError::UnmatchedEnd { at });
                };
                if announced != body {
                    return Err(FramingError::LengthMismatch {
                        at: begin_at,
                        announced,
                        actual: body,
                    });
                }
            }
            SinkCall::Reload | SinkCall::ContentLoaded(_) => {
                if open.is_some() {
                    return Err(FramingError::LifecycleInBatch { at });
                }
            }
            _ => {
                if open.is_none() {
                    return Err(FramingError::StrayCall { at });
                }
                body += 1;
            }
        }
    }
    if open.is_some() {
        return Err(FramingError::Unterminated);
    }
    Ok(())
}

impl BatchSink for RecordingSink {
    fn begin_batch(&mut self, info: &BatchInfo) {
        self.calls.push(SinkCall::Begin(*info));
    }

    fn end_batch(&mut self) {
        self.calls.push(SinkCall::End);
    }

    fn sections_inserted(&mut self, sections: &[usize]) {
        self.calls.push(SinkCall::SectionsInserted(sections.to_vec()));
    }

    fn sections_removed(&mut self, sections: &[usize]) {
        self.calls.push(SinkCall::SectionsRemoved(sections.to_vec()));
    }

    fn items_inserted(&mut self, positions: &[Position]) {
        self.calls.push(SinkCall::ItemsInserted(positions.to_vec()));
    }

    fn items_removed(&mut self, positions: &[Position]) {
        self.calls.push(SinkCall::ItemsRemoved(positions.to_vec()));
    }

    fn items_refreshed(&mut self, positions: &[Position]) {
        self.calls.push(SinkCall::ItemsRefreshed(positions.to_vec()));
    }

    fn item_moved(&mut self, from: Position, to: Position) {
        self.calls.push(SinkCall::ItemMoved(from, to));
    }

    fn reload_data(&mut self) {
        self.calls.push(SinkCall::Reload);
    }

    fn content_loaded(&mut self, error: Option<&QueryError>) {
        self.calls.push(SinkCall::ContentLoaded(error.cloned()));
    }
}
