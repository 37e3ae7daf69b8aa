//! Selection engine — pure inclusion predicates and pipe ordering.
//!
//! Everything here is a pure function over (name, rule set); no IO, no
//! captured state. Every entity evaluated yields a [`Classification`] audit
//! record, whether or not it ends up scheduled.

use std::collections::BTreeSet;

use refill_types::{Classification, Entity, EntityKind, PipeGroup};

use crate::rules::{DataSourceRules, PipeRules};

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

fn matches_prefix(name: &str, prefixes: &BTreeSet<String>) -> bool {
    prefixes.iter().any(|p| name.starts_with(p.as_str()))
}

/// Decide whether a data source is truncated this run.
///
/// Override prefixes, when set, are the sole criterion; otherwise the name
/// must pass the whitelist (if any), the exclusion prefixes, and the
/// exclusion names, in that order.
pub fn classify_data_source(name: &str, rules: &DataSourceRules) -> Classification {
    let kind = EntityKind::DataSource;

    if !rules.override_prefixes.is_empty() {
        return if matches_prefix(name, &rules.override_prefixes) {
            Classification::included(name, kind, "matches override prefix")
        } else {
            Classification::skipped(name, kind, "no override prefix match")
        };
    }

    if !rules.whitelist.is_empty() && !rules.whitelist.contains(name) {
        return Classification::skipped(name, kind, "not whitelisted");
    }
    if matches_prefix(name, &rules.prefix_exclude) {
        return Classification::skipped(name, kind, "excluded prefix");
    }
    if rules.name_exclude.contains(name) {
        return Classification::skipped(name, kind, "excluded by name");
    }
    Classification::included(name, kind, "eligible")
}

/// Decide whether a pipe is populated this run.
///
/// Override prefixes win outright; otherwise a non-empty whitelist decides
/// by membership; otherwise the include prefixes decide. A pipe that passes
/// any of those is still dropped when explicitly excluded.
pub fn classify_pipe(name: &str, rules: &PipeRules) -> Classification {
    let kind = EntityKind::Pipe;

    let processed = if !rules.override_prefixes.is_empty() {
        if matches_prefix(name, &rules.override_prefixes) {
            Ok("matches override prefix")
        } else {
            Err("no override prefix match")
        }
    } else if !rules.whitelist.is_empty() {
        if rules.whitelist.contains(name) {
            Ok("whitelisted")
        } else {
            Err("not whitelisted")
        }
    } else if matches_prefix(name, &rules.include_prefixes) {
        Ok("matches include prefix")
    } else {
        Err("does not match any include prefix")
    };

    match processed {
        Ok(_) if rules.explicit_exclude.contains(name) => {
            Classification::skipped(name, kind, "explicitly excluded")
        }
        Ok(reason) => Classification::included(name, kind, reason),
        Err(reason) => Classification::skipped(name, kind, reason),
    }
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// Ordered truncate plan for data sources. Catalog order is preserved;
/// data sources carry no ordering requirement beyond stability.
#[derive(Debug, Clone)]
pub struct SourcePlan {
    pub order: Vec<String>,
    pub classifications: Vec<Classification>,
}

/// One scheduled pipe with its group tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledPipe {
    pub name: String,
    pub group: PipeGroup,
}

/// Ordered populate plan: priority ++ regular ++ final, strict
/// concatenation. No entity moves once grouped.
#[derive(Debug, Clone)]
pub struct PipePlan {
    pub order: Vec<ScheduledPipe>,
    pub classifications: Vec<Classification>,
}

pub fn plan_data_sources(catalog: &[Entity], rules: &DataSourceRules) -> SourcePlan {
    let mut order = Vec::new();
    let mut classifications = Vec::new();

    for entity in catalog {
        let classification = classify_data_source(&entity.name, rules);
        if classification.is_included() {
            order.push(entity.name.clone());
        }
        classifications.push(classification);
    }

    SourcePlan {
        order,
        classifications,
    }
}

/// Three-bucket stable partition of included pipes.
///
/// Priority and final entries resolve by name, not catalog lookup: a listed
/// pipe absent from the live catalog is still scheduled if it passes the
/// predicate. Catalog pipes named in either list never enter the regular
/// group, so each name is processed at most once.
pub fn plan_pipes(catalog: &[Entity], rules: &PipeRules) -> PipePlan {
    let mut order = Vec::new();
    let mut classifications = Vec::new();

    for name in &rules.priority_order {
        let classification = classify_pipe(name, rules);
        if classification.is_included() {
            order.push(ScheduledPipe {
                name: name.clone(),
                group: PipeGroup::Priority,
            });
        }
        classifications.push(classification);
    }

    for entity in catalog {
        let name = &entity.name;
        if rules.priority_order.contains(name) || rules.final_order.contains(name) {
            // Already classified by its explicit list.
            continue;
        }
        let classification = classify_pipe(name, rules);
        if classification.is_included() {
            order.push(ScheduledPipe {
                name: name.clone(),
                group: PipeGroup::Regular,
            });
        }
        classifications.push(classification);
    }

    for name in &rules.final_order {
        let classification = classify_pipe(name, rules);
        if classification.is_included() {
            order.push(ScheduledPipe {
                name: name.clone(),
                group: PipeGroup::Final,
            });
        }
        classifications.push(classification);
    }

    PipePlan {
        order,
        classifications,
    }
}
