#![forbid(unsafe_code)]

//! Error types for data sources.
//!
//! # Taxonomy
//!
//! | Error | Cause | Handling |
//! |-------|-------|----------|
//! | [`ClassifyError`] | Backend reported a change the contract forbids | Fatal: batch aborted, error returned |
//! | [`ProtocolError`] | Batch signals out of order | Fatal: error returned |
//! | [`DataSourceError::OutOfRange`] | Read of a position not in the snapshot | Returned to the reader |
//! | [`DataSourceError::Unsupported`] | Mutation of a query-derived list | Returned to the caller |
//! | [`QueryError`] | Initial fetch failed | Recovered: list left empty, reported |
//!
//! Fatal errors are never retried or skipped. They mean the backend and the
//! engine disagree about the notification contract.

use core::fmt;

use crate::change::{ChangeType, ObjectChangeField};
use crate::position::Position;

/// A backend reported a change that cannot be classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    /// Raw change-type code outside insert/delete/move/update.
    UnknownChangeType(u64),
    /// Section changes may only insert or delete.
    UnexpectedSectionChange(ChangeType),
    /// A change of `kind` arrived without the position it requires.
    MissingPosition {
        kind: ChangeType,
        field: ObjectChangeField,
    },
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownChangeType(raw) => write!(f, "unknown change type code {raw}"),
            Self::UnexpectedSectionChange(kind) => {
                write!(f, "unexpected section change type: {kind}")
            }
            Self::MissingPosition { kind, field } => {
                write!(f, "{kind} change is missing its {field} position")
            }
        }
    }
}

impl std::error::Error for ClassifyError {}

/// The notification buffer was used out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// A record arrived while no batch was open.
    NotOpen,
    /// A batch was opened while another was still collecting.
    AlreadyOpen,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotOpen => write!(f, "change recorded while no batch is open"),
            Self::AlreadyOpen => write!(f, "batch opened while another is still collecting"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// The backend failed to execute its query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    message: String,
}

impl QueryError {
    /// Create a query error with a backend-supplied message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Backend-supplied description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query failed: {}", self.message)
    }
}

impl std::error::Error for QueryError {}

/// Errors surfaced by data source operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    /// No item exists at `position` in the current snapshot.
    OutOfRange { position: Position },
    /// The operation cannot be performed on a query-derived list.
    Unsupported { operation: &'static str },
    /// See [`ProtocolError`].
    Protocol(ProtocolError),
    /// See [`ClassifyError`].
    Classify(ClassifyError),
}

impl DataSourceError {
    /// Whether the error indicates a contract violation that must stop the batch.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::Classify(_))
    }
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { position } => write!(f, "no item at position {position}"),
            Self::Unsupported { operation } => {
                write!(f, "{operation} is not supported by a query-derived list")
            }
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
            Self::Classify(e) => write!(f, "classification error: {e}"),
        }
    }
}

impl std::error::Error for DataSourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Protocol(e) => Some(e),
            Self::Classify(e) => Some(e),
            Self::OutOfRange { .. } | Self::Unsupported { .. } => None,
        }
    }
}

impl From<ProtocolError> for DataSourceError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl From<ClassifyError> for DataSourceError {
    fn from(e: ClassifyError) -> Self {
        Self::Classify(e)
    }
}
