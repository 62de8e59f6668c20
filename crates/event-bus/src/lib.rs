//! # colorcast Event Bus
//!
//! The event bus broadcasts what the classification engine has done to its
//! rule set and caches, so a host can react (for example by re-rendering the
//! documents it has open after new rules are applied).
//!
//! ## Event Flow
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────┐    ┌─────────────────┐
//! │   Engine        │    │  Event Bus   │    │   Consumers     │
//! │   Operations    │───▶│  (Broadcast) │───▶│   • Editor host │
//! │ • apply         │    │              │    │   • CLI         │
//! │ • reset scope   │    │              │    │                 │
//! └─────────────────┘    └──────────────┘    └─────────────────┘
//! ```
//!
//! ## Event-Bus vs Logging
//!
//! Logging explains *what the engine is doing*; events tell clients *what
//! has changed* so cached renderings can be refreshed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast::{self, Sender};

const EVENT_BUS_CAPACITY: usize = 1024;

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum ColorCastEvent {
    RuleSetApplied(RuleSetApplied),
    CachesInvalidated(CachesInvalidated),
    ApplyRejected(ApplyRejected),
}

/// A new rule set became active. Anything rendered before `generation` is stale.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct RuleSetApplied {
    pub generation: u64,
    pub scheme: String,
    pub rule_count: usize,
    pub applied_at: DateTime<Utc>,
}

/// Caches were dropped without a rule change (document or session reload).
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CachesInvalidated {
    pub generation: u64,
    pub reason: String,
    pub invalidated_at: DateTime<Utc>,
}

/// An apply was refused because some patterns were malformed.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ApplyRejected {
    pub scheme: String,
    pub invalid_patterns: Vec<String>,
    pub rejected_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct EventBus {
    sender: Sender<ColorCastEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self { sender }
    }

    pub fn send(&self, event: &ColorCastEvent) {
        if self.sender.send(event.clone()).is_err() {
            // No receivers; hosts that do not render incrementally never subscribe.
            tracing::debug!("No receivers for event bus, ignoring event: {:?}", &event);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ColorCastEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
