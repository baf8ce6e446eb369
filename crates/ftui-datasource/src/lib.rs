#![forbid(unsafe_code)]

//! Change-batching list data sources for FrankenTUI.
//!
//! Adapts an observable, ordered backend collection into a list surface that
//! reports every change as one atomic batch of structural operations.
//!
//! This crate provides:
//! - [`QueryDataSource`] for live queries that report changes incrementally
//!   between will-change and did-change signals
//! - [`LibraryDataSource`] for media libraries that report whole diffs, from
//!   any thread
//! - [`BatchTranslator`] and the [`BatchSink`] contract list widgets implement
//! - [`ListSurface`] for positional reads against the current snapshot

pub mod backend;
pub mod buffer;
pub mod change;
pub mod config;
pub mod context;
pub mod error;
pub mod library;
pub mod position;
pub mod query;
pub mod sink;
pub mod subscription;
pub mod surface;
pub mod translate;

pub use backend::{
    ControllerEvent, ControllerObserver, FetchResult, FetchResultChanges, LibraryChange,
    LibraryObserver, MediaLibrary, RawChangeType, ResultsController,
};
pub use buffer::NotificationBuffer;
pub use change::{ChangeRecord, ChangeType, ObjectChangeField};
pub use config::DataSourceConfig;
pub use context::{ImmediateContext, QueuedContext, Task, TaskQueue, UiContext};
pub use error::{ClassifyError, DataSourceError, ProtocolError, QueryError};
pub use library::LibraryDataSource;
pub use position::Position;
pub use query::QueryDataSource;
pub use sink::{BatchInfo, BatchSink};
pub use subscription::{LocalObservers, SharedObservers, Subscription};
pub use surface::{ListSurface, LoadState, ObservationBridge};
pub use translate::{BatchTranslator, is_refresh_only};
