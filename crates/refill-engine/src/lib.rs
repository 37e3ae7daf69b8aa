//! Rule sets, selection engine, confirmation gate, and execution orchestrator.
//!
//! This crate implements the core refill workflow: building one immutable
//! rule set per run, deciding which data sources and pipes to act on (and
//! in what order), gating live mutations behind confirmation, and driving
//! the sequential truncate/populate passes.

pub mod events;
pub mod gate;
pub mod orchestrator;
pub mod rules;
pub mod selection;

pub use events::{EventEmitter, RunEvent};
pub use gate::{
    AutoApproveGate, ConfirmationGate, ConsoleGate, GateStep, PlanSummary, ScriptedGate,
};
pub use orchestrator::Orchestrator;
pub use rules::{
    DataSourceRuleConfig, DataSourceRules, PipeRuleConfig, PipeRules, RuleSet, RunConfig,
    DEFAULT_EXCLUDE_PREFIXES,
};
pub use selection::{
    classify_data_source, classify_pipe, plan_data_sources, plan_pipes, PipePlan, ScheduledPipe,
    SourcePlan,
};
