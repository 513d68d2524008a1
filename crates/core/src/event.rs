//! Engine events — lets telemetry and UI collaborators watch gathers, cache
//! traffic and provider failures without the manager knowing who listens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All events the context manager publishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextEvent {
    /// A fresh gather finished
    GatherCompleted {
        gather_id: String,
        cache_key: String,
        trigger: String,
        fragments: usize,
        errors: usize,
        total_tokens: usize,
        duration_ms: f64,
        timestamp: DateTime<Utc>,
    },

    /// A gather was answered from the cache
    CacheHit {
        cache_key: String,
        timestamp: DateTime<Utc>,
    },

    /// A provider failed or timed out during a gather
    ProviderFailed {
        gather_id: String,
        provider: String,
        reason: String,
        timed_out: bool,
        timestamp: DateTime<Utc>,
    },

    /// Entries left the cache to make room or because they expired
    CacheEvicted {
        count: usize,
        reason: String, // "memory_pressure", "expired"
        timestamp: DateTime<Utc>,
    },
}

/// Fan-out channel for [`ContextEvent`]s.
///
/// Slow subscribers lag and lose the oldest events rather than blocking the
/// manager; the channel keeps `capacity` events per receiver.
pub struct EventBus {
    sender: broadcast::Sender<Arc<ContextEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity.max(1)).0,
        }
    }

    /// Send to every current subscriber, returning how many received it.
    pub fn publish(&self, event: ContextEvent) -> usize {
        self.sender.send(Arc::new(event)).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ContextEvent>> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
