//! Execution orchestrator — the sequential refresh loop.
//!
//! Captures both catalogs once, builds the plans, consults the confirmation
//! gate, then runs two passes: every data source is truncated before any
//! pipe is populated. Execution is strictly sequential; one item's action
//! completes (success or failure) before the next begins, and a per-item
//! failure never aborts the batch.

use std::sync::Arc;

use refill_client::{BackendClient, PopulateOptions};
use refill_types::{EntityKind, ItemOutcome, ItemStatus, Result, RunSummary};

use crate::events::{EventEmitter, RunEvent};
use crate::gate::{ConfirmationGate, PlanSummary};
use crate::rules::RuleSet;
use crate::selection::{plan_data_sources, plan_pipes, ScheduledPipe};

pub struct Orchestrator {
    backend: Arc<dyn BackendClient>,
    gate: Arc<dyn ConfirmationGate>,
    events: EventEmitter,
    dry_run: bool,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn BackendClient>,
        gate: Arc<dyn ConfirmationGate>,
        dry_run: bool,
    ) -> Self {
        Self {
            backend,
            gate,
            events: EventEmitter::default(),
            dry_run,
        }
    }

    /// Subscribe here to observe run progress.
    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// Run the full refresh: snapshot, plan, confirm, truncate pass,
    /// populate pass, summary.
    pub async fn run(&self, workspace: &str, rules: &RuleSet) -> Result<RunSummary> {
        // Both catalogs are captured exactly once, before planning. Plans
        // and execution share this snapshot, so inclusion is never
        // re-derived against a drifted catalog.
        let source_catalog = self.backend.list_data_sources().await?;
        let pipe_catalog = self.backend.list_pipes().await?;

        let source_plan = plan_data_sources(&source_catalog, &rules.data_sources);
        let pipe_plan = plan_pipes(&pipe_catalog, &rules.pipes);
        let plan = PlanSummary::new(workspace, &source_plan, &pipe_plan);

        self.events.emit(RunEvent::RunStarted {
            workspace: workspace.to_string(),
            dry_run: self.dry_run,
            data_sources: plan.data_sources.len(),
            pipes: plan.pipes.len(),
        });
        // Audit records go out before the gate is consulted, so a declined
        // run still leaves a trace of what was evaluated.
        for c in source_plan
            .classifications
            .iter()
            .chain(pipe_plan.classifications.iter())
        {
            self.events.emit(RunEvent::EntityClassified {
                name: c.name.clone(),
                kind: c.kind,
                decision: c.decision,
                reason: c.reason.clone(),
            });
        }

        let skipped: Vec<_> = source_plan
            .classifications
            .iter()
            .chain(pipe_plan.classifications.iter())
            .filter(|c| !c.is_included())
            .cloned()
            .collect();

        if !self.gate.confirm(&plan, self.dry_run).await? {
            tracing::info!(workspace, "confirmation declined, aborting run");
            self.events.emit(RunEvent::RunAborted {
                workspace: workspace.to_string(),
            });
            let mut summary = RunSummary::aborted(self.dry_run);
            summary.skipped = skipped;
            return Ok(summary);
        }

        let mut summary = RunSummary::new(self.dry_run);
        summary.skipped = skipped;

        for name in &source_plan.order {
            self.truncate_one(name, &mut summary).await;
        }
        for pipe in &pipe_plan.order {
            self.populate_one(pipe, &mut summary).await;
        }

        let duration_ms = (chrono::Utc::now() - summary.started_at)
            .num_milliseconds()
            .max(0) as u64;
        self.events.emit(RunEvent::RunCompleted {
            workspace: workspace.to_string(),
            completed: summary.completed.len(),
            failed: summary.failed.len(),
            duration_ms,
        });
        tracing::info!(
            workspace,
            completed = summary.completed.len(),
            failed = summary.failed.len(),
            "run finished"
        );

        Ok(summary)
    }

    async fn truncate_one(&self, name: &str, summary: &mut RunSummary) {
        let kind = EntityKind::DataSource;
        self.events.emit(RunEvent::ItemStarted {
            name: name.to_string(),
            kind,
            group: None,
        });

        if self.dry_run {
            let outcome = ItemOutcome::would_run(name, kind, None, format!("would truncate {name}"));
            self.emit_outcome(&outcome);
            summary.record(outcome);
            return;
        }

        match self.backend.truncate_data_source(name).await {
            Ok(()) => {
                tracing::info!(name, "truncated data source");
                let outcome = ItemOutcome::done(name, kind, None);
                self.emit_outcome(&outcome);
                summary.record(outcome);
            }
            Err(e) => {
                tracing::warn!(name, error = %e, "truncate failed, continuing");
                let outcome = ItemOutcome::failed(name, kind, None, e.to_string());
                self.emit_outcome(&outcome);
                summary.record(outcome);
            }
        }
    }

    async fn populate_one(&self, pipe: &ScheduledPipe, summary: &mut RunSummary) {
        let kind = EntityKind::Pipe;
        let group = Some(pipe.group);
        self.events.emit(RunEvent::ItemStarted {
            name: pipe.name.clone(),
            kind,
            group,
        });

        if self.dry_run {
            let outcome = ItemOutcome::would_run(
                &pipe.name,
                kind,
                group,
                format!("would populate {} [{}]", pipe.name, pipe.group),
            );
            self.emit_outcome(&outcome);
            summary.record(outcome);
            return;
        }

        // Blocking populate: the backend does not return until population
        // completes or fails, so requests are never concurrent.
        match self
            .backend
            .populate_pipe(&pipe.name, PopulateOptions::blocking_refresh())
            .await
        {
            Ok(()) => {
                tracing::info!(name = %pipe.name, group = %pipe.group, "populated pipe");
                let outcome = ItemOutcome::done(&pipe.name, kind, group);
                self.emit_outcome(&outcome);
                summary.record(outcome);
            }
            Err(e) => {
                tracing::warn!(name = %pipe.name, error = %e, "populate failed, continuing");
                let outcome = ItemOutcome::failed(&pipe.name, kind, group, e.to_string());
                self.emit_outcome(&outcome);
                summary.record(outcome);
            }
        }
    }

    fn emit_outcome(&self, outcome: &ItemOutcome) {
        match outcome.status {
            ItemStatus::Failed => self.events.emit(RunEvent::ItemFailed {
                name: outcome.name.clone(),
                kind: outcome.kind,
                error: outcome.detail.clone().unwrap_or_default(),
            }),
            status => self.events.emit(RunEvent::ItemCompleted {
                name: outcome.name.clone(),
                kind: outcome.kind,
                status,
            }),
        }
    }
}
