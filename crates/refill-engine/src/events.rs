//! Run event system for observability.
//!
//! The orchestrator publishes [`RunEvent`]s on a [`tokio::sync::broadcast`]
//! channel; the CLI reporter (or any other observer) subscribes without the
//! orchestrator knowing who is listening.

use serde::{Deserialize, Serialize};

use refill_types::{Decision, EntityKind, ItemStatus, PipeGroup};

/// Events emitted during a refresh run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEvent {
    RunStarted {
        workspace: String,
        dry_run: bool,
        data_sources: usize,
        pipes: usize,
    },
    /// One per entity the selection engine evaluated, included or not.
    EntityClassified {
        name: String,
        kind: EntityKind,
        decision: Decision,
        reason: String,
    },
    RunAborted {
        workspace: String,
    },
    ItemStarted {
        name: String,
        kind: EntityKind,
        group: Option<PipeGroup>,
    },
    ItemCompleted {
        name: String,
        kind: EntityKind,
        status: ItemStatus,
    },
    ItemFailed {
        name: String,
        kind: EntityKind,
        error: String,
    },
    RunCompleted {
        workspace: String,
        completed: usize,
        failed: usize,
        duration_ms: u64,
    },
}

/// Fan-out handle for [`RunEvent`]s over a broadcast channel.
#[derive(Clone)]
pub struct EventEmitter {
    sender: tokio::sync::broadcast::Sender<RunEvent>,
}

impl EventEmitter {
    /// Channel capacity bounds how far a slow subscriber may lag before
    /// it starts missing events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Send to whoever is listening; with no receivers the event is
    /// discarded rather than treated as an error.
    pub fn emit(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }

    /// Open a new receiver; it only sees events emitted from here on.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}
