//! Confirmation gate trait and built-in implementations.
//!
//! The gate must grant proceed authorization before the orchestrator runs
//! any live mutation. The interactive gate walks an explicit linear state
//! machine; any step can short-circuit to abort.

use async_trait::async_trait;

use refill_types::Result;

use crate::selection::{PipePlan, ScheduledPipe, SourcePlan};

// ---------------------------------------------------------------------------
// PlanSummary — what the gate gets to review
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub workspace: String,
    /// Data sources to truncate, in execution order.
    pub data_sources: Vec<String>,
    /// Pipes to populate, in priority -> regular -> final order.
    pub pipes: Vec<ScheduledPipe>,
    /// Count of entities evaluated but not scheduled.
    pub skipped: usize,
}

impl PlanSummary {
    pub fn new(workspace: impl Into<String>, sources: &SourcePlan, pipes: &PipePlan) -> Self {
        let skipped = sources
            .classifications
            .iter()
            .chain(pipes.classifications.iter())
            .filter(|c| !c.is_included())
            .count();
        Self {
            workspace: workspace.into(),
            data_sources: sources.order.clone(),
            pipes: pipes.order.clone(),
            skipped,
        }
    }
}

// ---------------------------------------------------------------------------
// ConfirmationGate trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// Review the plan and decide whether the run proceeds. A `false`
    /// answer aborts the run cleanly, in dry-run mode as well — rehearsal
    /// of the gate is part of the rehearsal.
    async fn confirm(&self, plan: &PlanSummary, dry_run: bool) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// GateStep — the linear review state machine
// ---------------------------------------------------------------------------

/// Steps of the interactive review, in order. Each step is a guarded
/// transition; declining at any step aborts without reaching the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStep {
    ReviewConfig,
    ConfirmWorkspace,
    AcknowledgeMode,
    FinalProceed,
}

impl GateStep {
    pub fn first() -> Self {
        GateStep::ReviewConfig
    }

    pub fn next(self) -> Option<Self> {
        match self {
            GateStep::ReviewConfig => Some(GateStep::ConfirmWorkspace),
            GateStep::ConfirmWorkspace => Some(GateStep::AcknowledgeMode),
            GateStep::AcknowledgeMode => Some(GateStep::FinalProceed),
            GateStep::FinalProceed => None,
        }
    }

    fn prompt(&self, plan: &PlanSummary, dry_run: bool) -> String {
        match self {
            GateStep::ReviewConfig => format!(
                "Plan: truncate {} data source(s), populate {} pipe(s), {} skipped. Reviewed?",
                plan.data_sources.len(),
                plan.pipes.len(),
                plan.skipped
            ),
            GateStep::ConfirmWorkspace => {
                format!("Target workspace is '{}'. Correct?", plan.workspace)
            }
            GateStep::AcknowledgeMode => {
                if dry_run {
                    "This is a DRY RUN; no backend action will be taken. Continue?".to_string()
                } else {
                    "This is a LIVE run; data sources WILL be truncated. Continue?".to_string()
                }
            }
            GateStep::FinalProceed => "Proceed?".to_string(),
        }
    }
}

/// Drive the state machine with an answer function. Returns `true` only
/// when every step was affirmed.
fn walk_steps<F: FnMut(GateStep) -> bool>(mut answer: F) -> bool {
    let mut step = GateStep::first();
    loop {
        if !answer(step) {
            return false;
        }
        match step.next() {
            Some(next) => step = next,
            None => return true,
        }
    }
}

// ---------------------------------------------------------------------------
// ConsoleGate
// ---------------------------------------------------------------------------

pub struct ConsoleGate;

impl ConsoleGate {
    fn read_yes() -> Result<bool> {
        let mut input = String::new();
        std::io::stdin()
            .read_line(&mut input)
            .map_err(refill_types::RefillError::Io)?;
        let trimmed = input.trim().to_ascii_lowercase();
        Ok(trimmed == "y" || trimmed == "yes")
    }
}

#[async_trait]
impl ConfirmationGate for ConsoleGate {
    async fn confirm(&self, plan: &PlanSummary, dry_run: bool) -> Result<bool> {
        println!("\nWorkspace: {}", plan.workspace);
        println!("Data sources to truncate ({}):", plan.data_sources.len());
        for name in &plan.data_sources {
            println!("  {name}");
        }
        println!("Pipes to populate ({}):", plan.pipes.len());
        for pipe in &plan.pipes {
            println!("  {} [{}]", pipe.name, pipe.group);
        }

        let mut io_error = None;
        let granted = walk_steps(|step| {
            println!("\n{} [y/N]", step.prompt(plan, dry_run));
            match Self::read_yes() {
                Ok(yes) => yes,
                Err(e) => {
                    io_error = Some(e);
                    false
                }
            }
        });
        match io_error {
            Some(e) => Err(e),
            None => Ok(granted),
        }
    }
}

// ---------------------------------------------------------------------------
// AutoApproveGate
// ---------------------------------------------------------------------------

/// Grants every run without interaction. For rehearsal and scripted use.
pub struct AutoApproveGate;

#[async_trait]
impl ConfirmationGate for AutoApproveGate {
    async fn confirm(&self, _plan: &PlanSummary, _dry_run: bool) -> Result<bool> {
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// ScriptedGate
// ---------------------------------------------------------------------------

/// Answers with a preset decision and records every plan it was shown.
pub struct ScriptedGate {
    answer: bool,
    seen: std::sync::Mutex<Vec<PlanSummary>>,
}

impl ScriptedGate {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<PlanSummary> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfirmationGate for ScriptedGate {
    async fn confirm(&self, plan: &PlanSummary, _dry_run: bool) -> Result<bool> {
        self.seen.lock().unwrap().push(plan.clone());
        Ok(self.answer)
    }
}
