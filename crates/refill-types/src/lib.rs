//! Shared types, errors, classifications, and run reports for the refill orchestrator.
//!
//! This crate provides the foundational types used across all other refill crates:
//! - `RefillError` — unified error taxonomy
//! - `Entity` / `EntityKind` — catalog snapshot items
//! - `Classification` — per-entity audit record from the selection engine
//! - `ItemOutcome` / `RunSummary` — what actually happened during a run

use serde::{Deserialize, Serialize};

/// Unified error type for all refill subsystems.
#[derive(Debug, thiserror::Error)]
pub enum RefillError {
    // === Configuration errors ===
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    // === Backend errors ===
    #[error("Backend rejected the auth token")]
    Auth,

    #[error("Backend returned HTTP {status}: {message}")]
    Backend {
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("Rate limited by backend, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("{kind} '{name}' not found in workspace")]
    UnknownEntity { kind: EntityKind, name: String },

    #[error("HTTP transport error: {0}")]
    Http(String),

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RefillError {
    /// Returns `true` if the error is transient and the operation may succeed on retry.
    /// The core never retries; callers may use this to decide whether re-running helps.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RefillError::RateLimited { .. } | RefillError::Backend { retryable: true, .. }
        )
    }

    /// Returns `true` if the error originated from rule configuration, i.e. before
    /// any backend call was made.
    pub fn is_config(&self) -> bool {
        matches!(self, RefillError::Config { .. })
    }

    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        RefillError::Config {
            message: message.into(),
        }
    }
}

/// A convenience alias for `Result<T, RefillError>`.
pub type Result<T> = std::result::Result<T, RefillError>;

// ---------------------------------------------------------------------------
// Entity — a named catalog item
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    DataSource,
    Pipe,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::DataSource => write!(f, "data source"),
            EntityKind::Pipe => write!(f, "pipe"),
        }
    }
}

/// A read-only snapshot item from the backend catalog. The engine never
/// mutates entities; they are captured once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
}

impl Entity {
    pub fn data_source(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntityKind::DataSource,
        }
    }

    pub fn pipe(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntityKind::Pipe,
        }
    }
}

// ---------------------------------------------------------------------------
// Classification — audit record from the selection engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Included,
    Skipped,
}

/// Emitted for every entity the selection engine evaluates. Purely for
/// audit and reporting; has no effect on execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub name: String,
    pub kind: EntityKind,
    pub decision: Decision,
    pub reason: String,
}

impl Classification {
    pub fn included(name: impl Into<String>, kind: EntityKind, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            decision: Decision::Included,
            reason: reason.into(),
        }
    }

    pub fn skipped(name: impl Into<String>, kind: EntityKind, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            decision: Decision::Skipped,
            reason: reason.into(),
        }
    }

    pub fn is_included(&self) -> bool {
        self.decision == Decision::Included
    }
}

// ---------------------------------------------------------------------------
// PipeGroup — scheduling bucket for an included pipe
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipeGroup {
    Priority,
    Regular,
    Final,
}

impl std::fmt::Display for PipeGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipeGroup::Priority => write!(f, "priority"),
            PipeGroup::Regular => write!(f, "regular"),
            PipeGroup::Final => write!(f, "final"),
        }
    }
}

// ---------------------------------------------------------------------------
// ItemOutcome — result of one orchestrated action
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// The backend action completed.
    Done,
    /// Dry-run mode: the action was recorded but not issued.
    WouldRun,
    /// The backend action failed; the run continued.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub name: String,
    pub kind: EntityKind,
    /// Scheduling group for pipes; data sources carry no group.
    pub group: Option<PipeGroup>,
    pub status: ItemStatus,
    /// Failure text, or the dry-run "would ..." note.
    pub detail: Option<String>,
}

impl ItemOutcome {
    pub fn done(name: impl Into<String>, kind: EntityKind, group: Option<PipeGroup>) -> Self {
        Self {
            name: name.into(),
            kind,
            group,
            status: ItemStatus::Done,
            detail: None,
        }
    }

    pub fn would_run(
        name: impl Into<String>,
        kind: EntityKind,
        group: Option<PipeGroup>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            group,
            status: ItemStatus::WouldRun,
            detail: Some(detail.into()),
        }
    }

    pub fn failed(
        name: impl Into<String>,
        kind: EntityKind,
        group: Option<PipeGroup>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            group,
            status: ItemStatus::Failed,
            detail: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// RunSummary — the overall report returned by the orchestrator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: uuid::Uuid,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub dry_run: bool,
    /// True when the confirmation gate declined; no backend mutation occurred.
    pub aborted: bool,
    pub completed: Vec<ItemOutcome>,
    pub skipped: Vec<Classification>,
    pub failed: Vec<ItemOutcome>,
}

impl RunSummary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            started_at: chrono::Utc::now(),
            dry_run,
            aborted: false,
            completed: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// A summary for a run the confirmation gate declined.
    pub fn aborted(dry_run: bool) -> Self {
        Self {
            aborted: true,
            ..Self::new(dry_run)
        }
    }

    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome.status {
            ItemStatus::Failed => self.failed.push(outcome),
            ItemStatus::Done | ItemStatus::WouldRun => self.completed.push(outcome),
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}
