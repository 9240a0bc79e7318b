//! # Shared Bus - Observer Event Bus
//!
//! Broadcasts events from a single writer (the workflow runner) to any
//! number of read-only observers.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │    Runner    │                    │   Observer   │
//! │              │    publish()       │  (UI, CLI)   │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! The bus is generic over the event type. Events declare a topic so that
//! subscribers can filter, and publishing never blocks: a slow subscriber
//! lags and skips events instead of stalling the writer.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{BusEvent, EventFilter};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
