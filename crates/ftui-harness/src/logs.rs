#![forbid(unsafe_code)]

//! Capture `tracing` output for assertions.
//!
//! ```
//! use ftui_harness::LogCapture;
//!
//! let logs = LogCapture::new();
//! tracing::subscriber::with_default(logs.subscriber(), || {
//!     tracing::warn!(attempt = 2, "fetch failed");
//! });
//! let events = logs.events();
//! assert_eq!(events[0].message, "fetch failed");
//! assert_eq!(events[0].field("attempt"), Some("2"));
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Registry;
use tracing_subscriber::layer::{Context, Layer, Layered, SubscriberExt};

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    /// Recorded value of `name`, if the event carried it.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        lookup(&self.fields, name)
    }
}

/// One span creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedSpan {
    pub name: &'static str,
    pub fields: Vec<(String, String)>,
}

impl CapturedSpan {
    /// Recorded value of `name`, if the span carried it.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        lookup(&self.fields, name)
    }
}

fn lookup<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

#[derive(Default)]
struct Captured {
    events: Vec<CapturedEvent>,
    spans: Vec<CapturedSpan>,
}

/// A `tracing` layer that stores every event and span it sees.
///
/// Clones share storage, so keep one handle for assertions and install
/// another.
#[derive(Clone, Default)]
pub struct LogCapture {
    captured: Arc<Mutex<Captured>>,
}

impl LogCapture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with this layer attached, for `with_default`.
    #[must_use]
    pub fn subscriber(&self) -> Layered<Self, Registry> {
        tracing_subscriber::registry().with(self.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Captured> {
        self.captured.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Events recorded so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.lock().events.clone()
    }

    /// Events at exactly `level`.
    #[must_use]
    pub fn events_at(&self, level: Level) -> Vec<CapturedEvent> {
        self.lock()
            .events
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    /// Spans created so far, oldest first.
    #[must_use]
    pub fn spans(&self) -> Vec<CapturedSpan> {
        self.lock().spans.clone()
    }

    /// Spans named `name`.
    #[must_use]
    pub fn spans_named(&self, name: &str) -> Vec<CapturedSpan> {
        self.lock()
            .spans
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect()
    }
}

impl fmt::Debug for LogCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let captured = self.lock();
        f.debug_struct("LogCapture")
            .field("events", &captured.events.len())
            .field("spans", &captured.spans.len())
            .finish()
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl FieldVisitor {
    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.push((field.name().to_owned(), value));
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);
        self.lock().spans.push(CapturedSpan {
            name: attrs.metadata().name(),
            fields: visitor.fields,
        });
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.lock().events.push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_spans_and_levels() {
        let logs = LogCapture::new();
        tracing::subscriber::with_default(logs.subscriber(), || {
            let _span = tracing::debug_span!("work", len = 3).entered();
            tracing::error!(reason = "bad", "stopped");
            tracing::trace!("noise");
        });
        assert_eq!(logs.spans_named("work")[0].field("len"), Some("3"));
        let errors = logs.events_at(Level::ERROR);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field("reason"), Some("bad"));
        assert_eq!(logs.events().len(), 2);
    }
}
