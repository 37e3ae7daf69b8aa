use async_trait::async_trait;

use refill_types::{Entity, Result};

// ---------------------------------------------------------------------------
// PopulateOptions
// ---------------------------------------------------------------------------

/// Options passed to a pipe populate call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PopulateOptions {
    /// Block until the backend reports the population complete (or failed).
    pub wait: bool,
    /// Truncate the pipe's target data source before writing.
    pub truncate: bool,
}

impl PopulateOptions {
    /// The options the orchestrator uses for a live run: truncate the target
    /// and block until done, so population requests are never concurrent.
    pub fn blocking_refresh() -> Self {
        Self {
            wait: true,
            truncate: true,
        }
    }
}

// ---------------------------------------------------------------------------
// BackendClient trait
// ---------------------------------------------------------------------------

/// The backend operations the orchestrator sequences. The backend owns the
/// semantics of truncate and populate; this trait only names them.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Snapshot the data source catalog, in backend listing order.
    async fn list_data_sources(&self) -> Result<Vec<Entity>>;

    /// Remove all rows from a data source without dropping its schema.
    async fn truncate_data_source(&self, name: &str) -> Result<()>;

    /// Snapshot the pipe catalog, in backend listing order.
    async fn list_pipes(&self) -> Result<Vec<Entity>>;

    /// Trigger population of a pipe's output. With `options.wait` the call
    /// does not return until the backend reports completion or failure.
    async fn populate_pipe(&self, name: &str, options: PopulateOptions) -> Result<()>;
}
