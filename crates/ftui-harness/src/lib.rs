#![forbid(unsafe_code)]

//! Test harness and reference fixtures for FrankenTUI data sources.
//!
//! This crate provides:
//! - [`RecordingSink`] capturing every [`BatchSink`](ftui_datasource::BatchSink)
//!   call with framing checks and a text transcript
//! - [`FakeResultsController`] for incremental-notification backends
//! - [`FakeLibrary`], [`FakeChange`] and [`VecFetchResult`] for snapshot-diff
//!   backends
//! - [`strategies`] with proptest generators for positions, change records and
//!   controller events
//! - [`LogCapture`], a `tracing` layer that records events and spans for
//!   assertions

pub mod controller;
pub mod library;
pub mod logs;
pub mod recording;
pub mod strategies;

pub use controller::FakeResultsController;
pub use library::{FakeChange, FakeLibrary, VecFetchResult};
pub use logs::{CapturedEvent, CapturedSpan, LogCapture};
pub use recording::{FramingError, RecordingSink, SinkCall};
