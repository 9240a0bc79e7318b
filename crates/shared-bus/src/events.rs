//! # Bus Events
//!
//! The contract an event type must satisfy to travel on the bus, and the
//! topic filter subscribers use to select a subset.

use std::fmt::Debug;
use std::hash::Hash;

/// An event that can be published on the bus.
///
/// Events are cloned once per subscriber, so they should be cheap to clone
/// or wrap their heavy parts in an `Arc`.
pub trait BusEvent: Clone + Debug + Send + Sync + 'static {
    /// Topic type used for filtering.
    type Topic: Copy + Debug + Eq + Hash + Send + Sync + Unpin + 'static;

    /// The topic this event belongs to.
    fn topic(&self) -> Self::Topic;

    /// Short name of the component that emitted the event.
    fn source(&self) -> &'static str;
}

/// Filter for subscribing to specific event topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter<T> {
    /// Topics to include (empty = all topics).
    pub topics: Vec<T>,
}

impl<T: Copy + Eq> EventFilter<T> {
    /// Create a filter that matches all events.
    #[must_use]
    pub fn all() -> Self {
        Self { topics: Vec::new() }
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<T>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches<E: BusEvent<Topic = T>>(&self, event: &E) -> bool {
        self.topics.is_empty() || self.topics.contains(&event.topic())
    }
}

impl<T: Copy + Eq> Default for EventFilter<T> {
    fn default() -> Self {
        Self::all()
    }
}
