#![forbid(unsafe_code)]

//! In-memory results controller.
//!
//! The fake holds sectioned contents and a list of observers. Tests mutate
//! the contents with [`FakeResultsController::set_sections`] and then emit
//! the events that describe the mutation; the fake never derives events on
//! its own.

use std::cell::RefCell;
use std::rc::Rc;

use ftui_datasource::{
    ControllerEvent, ControllerObserver, DataSourceError, LocalObservers, Position, QueryError,
    ResultsController, Subscription,
};

#[derive(Debug)]
struct FakeState<T> {
    sections: Vec<Vec<T>>,
    fetched: bool,
    fail_with: Option<QueryError>,
}

/// Cloneable handle to an in-memory [`ResultsController`].
///
/// Clones share contents and observers, so a test can keep one handle while
/// the data source owns another.
pub struct FakeResultsController<T> {
    state: Rc<RefCell<FakeState<T>>>,
    observers: LocalObservers<ControllerEvent>,
}

impl<T> Clone for FakeResultsController<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            observers: self.observers.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for FakeResultsController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeResultsController")
            .field("state", &*self.state.borrow())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<T> FakeResultsController<T> {
    /// A controller whose query yields `sections` once fetched.
    #[must_use]
    pub fn new(sections: Vec<Vec<T>>) -> Self {
        Self {
            state: Rc::new(RefCell::new(FakeState {
                sections,
                fetched: false,
                fail_with: None,
            })),
            observers: LocalObservers::new(),
        }
    }

    /// A single-section controller.
    #[must_use]
    pub fn single(items: Vec<T>) -> Self {
        Self::new(vec![items])
    }

    /// Make the next fetch fail with `message`.
    #[must_use]
    pub fn failing(self, message: &str) -> Self {
        self.state.borrow_mut().fail_with = Some(QueryError::new(message));
        self
    }

    /// Replace the contents. Emit the matching events separately.
    pub fn set_sections(&self, sections: Vec<Vec<T>>) {
        self.state.borrow_mut().sections = sections;
    }

    /// Replace the contents of a single-section controller.
    pub fn set_items(&self, items: Vec<T>) {
        self.set_sections(vec![items]);
    }

    /// Whether `perform_fetch` has succeeded.
    #[must_use]
    pub fn is_fetched(&self) -> bool {
        self.state.borrow().fetched
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Deliver one event to every observer.
    ///
    /// # Errors
    ///
    /// The first observer error.
    pub fn emit(&self, event: &ControllerEvent) -> Result<(), DataSourceError> {
        self.observers.notify(event)
    }

    /// Deliver `events` framed by will-change and did-change.
    ///
    /// # Errors
    ///
    /// The first observer error; the remaining events, including did-change,
    /// are not delivered.
    pub fn emit_batch(
        &self,
        events: impl IntoIterator<Item = ControllerEvent>,
    ) -> Result<(), DataSourceError> {
        self.emit(&ControllerEvent::WillChange)?;
        for event in events {
            self.emit(&event)?;
        }
        self.emit(&ControllerEvent::DidChange)
    }
}

impl<T: Clone + PartialEq + 'static> ResultsController for FakeResultsController<T> {
    type Item = T;

    fn perform_fetch(&mut self) -> Result<(), QueryError> {
        let mut state = self.state.borrow_mut();
        if let Some(e) = state.fail_with.take() {
            state.fetched = false;
            return Err(e);
        }
        state.fetched = true;
        Ok(())
    }

    fn observe(&self, observer: ControllerObserver) -> Subscription {
        self.observers.subscribe(observer)
    }

    fn section_count(&self) -> usize {
        let state = self.state.borrow();
        if state.fetched { state.sections.len() } else { 0 }
    }

    fn item_count(&self, section: usize) -> usize {
        let state = self.state.borrow();
        if !state.fetched {
            return 0;
        }
        state.sections.get(section).map_or(0, Vec::len)
    }

    fn object_at(&self, position: Position) -> Option<T> {
        let state = self.state.borrow();
        if !state.fetched {
            return None;
        }
        state
            .sections
            .get(position.section)?
            .get(position.index)
            .cloned()
    }

    fn position_of(&self, item: &T) -> Option<Position> {
        let state = self.state.borrow();
        if !state.fetched {
            return None;
        }
        state.sections.iter().enumerate().find_map(|(section, items)| {
            items
                .iter()
                .position(|candidate| candidate == item)
                .map(|index| Position::new(section, index))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contents_hidden_until_fetched() {
        let mut controller = FakeResultsController::single(vec!['a', 'b']);
        assert_eq!(controller.item_count(0), 0);
        controller.perform_fetch().unwrap();
        assert_eq!(controller.item_count(0), 2);
        assert_eq!(controller.position_of(&'b'), Some(Position::item(1)));
        assert_eq!(controller.object_at(Position::new(1, 0)), None);
    }

    #[test]
    fn failing_fetch_stays_empty() {
        let mut controller = FakeResultsController::single(vec![1]).failing("offline");
        let err = controller.perform_fetch().unwrap_err();
        assert_eq!(err.message(), "offline");
        assert_eq!(controller.section_count(), 0);
    }

    #[test]
    fn observers_follow_subscriptions() {
        let controller = FakeResultsController::<u8>::single(vec![]);
        let sub = controller.observe(Box::new(
            |_: &ControllerEvent| -> Result<(), DataSourceError> { Ok(()) },
        ));
        assert_eq!(controller.observer_count(), 1);
        drop(sub);
        assert_eq!(controller.observer_count(), 0);
        assert!(controller.emit(&ControllerEvent::WillChange).is_ok());
    }
}
