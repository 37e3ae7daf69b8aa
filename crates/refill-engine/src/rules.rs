//! Rule set model and builder.
//!
//! A `RuleSet` is constructed once per run from static configuration, is
//! immutable thereafter, and is discarded at run end. Construction is the
//! only point where configuration can fail; the selection engine and
//! orchestrator never see malformed rules.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use refill_types::{RefillError, Result};

/// Built-in exclusion prefixes for data sources. These apply unconditionally
/// and cannot be removed by configuration, only augmented.
pub const DEFAULT_EXCLUDE_PREFIXES: [&str; 3] = ["source_", "ops_", "snapshot_"];

// ---------------------------------------------------------------------------
// Configuration (serde) — the static, pre-run input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSourceRuleConfig {
    #[serde(default)]
    pub exclude_prefixes: Vec<String>,
    #[serde(default)]
    pub exclude_names: Vec<String>,
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub override_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipeRuleConfig {
    #[serde(default)]
    pub include_prefixes: Vec<String>,
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Pipes processed first, in listed order.
    #[serde(default)]
    pub priority: Vec<String>,
    /// Pipes processed last, in listed order.
    #[serde(default, rename = "final")]
    pub final_pipes: Vec<String>,
    #[serde(default)]
    pub override_prefixes: Vec<String>,
}

/// The full per-run configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Workspace name, shown to the confirmation gate before any mutation.
    pub workspace: String,
    /// Base URL of the backend API.
    pub base_url: String,
    #[serde(default)]
    pub datasources: DataSourceRuleConfig,
    #[serde(default)]
    pub pipes: PipeRuleConfig,
}

impl RunConfig {
    /// Read a configuration file from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Rule sets — immutable, validated
// ---------------------------------------------------------------------------

/// Selection rules for data sources.
///
/// When `override_prefixes` is non-empty it is the sole inclusion criterion;
/// whitelist and exclusion rules are bypassed entirely. This precedence is
/// deliberate, not a validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceRules {
    pub prefix_exclude: BTreeSet<String>,
    pub name_exclude: BTreeSet<String>,
    /// Empty means "all eligible".
    pub whitelist: BTreeSet<String>,
    /// Empty means inactive.
    pub override_prefixes: BTreeSet<String>,
}

/// Selection and ordering rules for pipes. Same override precedence as
/// [`DataSourceRules`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeRules {
    pub include_prefixes: BTreeSet<String>,
    pub whitelist: BTreeSet<String>,
    pub explicit_exclude: BTreeSet<String>,
    pub priority_order: Vec<String>,
    pub final_order: Vec<String>,
    pub override_prefixes: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    pub data_sources: DataSourceRules,
    pub pipes: PipeRules,
}

impl RuleSet {
    /// Build the immutable rule set for a run, merging built-in defaults
    /// with the user configuration. Fails fast on malformed entries; no
    /// backend call happens before this succeeds.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let ds = &config.datasources;
        let mut prefix_exclude = as_name_set("datasources.exclude_prefixes", &ds.exclude_prefixes)?;
        for prefix in DEFAULT_EXCLUDE_PREFIXES {
            prefix_exclude.insert(prefix.to_string());
        }

        let data_sources = DataSourceRules {
            prefix_exclude,
            name_exclude: as_name_set("datasources.exclude_names", &ds.exclude_names)?,
            whitelist: as_name_set("datasources.whitelist", &ds.whitelist)?,
            override_prefixes: as_name_set("datasources.override_prefixes", &ds.override_prefixes)?,
        };

        let p = &config.pipes;
        let priority_order = as_ordered("pipes.priority", &p.priority)?;
        let final_order = as_ordered("pipes.final", &p.final_pipes)?;
        if let Some(dup) = priority_order.iter().find(|&n| final_order.contains(n)) {
            return Err(RefillError::config(format!(
                "pipe '{dup}' appears in both pipes.priority and pipes.final"
            )));
        }

        let pipes = PipeRules {
            include_prefixes: as_name_set("pipes.include_prefixes", &p.include_prefixes)?,
            whitelist: as_name_set("pipes.whitelist", &p.whitelist)?,
            explicit_exclude: as_name_set("pipes.exclude", &p.exclude)?,
            priority_order,
            final_order,
            override_prefixes: as_name_set("pipes.override_prefixes", &p.override_prefixes)?,
        };

        Ok(Self { data_sources, pipes })
    }
}

/// Validate a set-valued field: entries must be non-empty after trimming.
/// Duplicates are harmless here (set union).
fn as_name_set(field: &str, entries: &[String]) -> Result<BTreeSet<String>> {
    let mut set = BTreeSet::new();
    for entry in entries {
        if entry.trim().is_empty() {
            return Err(RefillError::config(format!("{field} contains an empty entry")));
        }
        set.insert(entry.clone());
    }
    Ok(set)
}

/// Validate an order-valued field: entries must be non-empty and unique,
/// since a duplicated name cannot be processed "at most once" in a
/// well-defined position.
fn as_ordered(field: &str, entries: &[String]) -> Result<Vec<String>> {
    let mut seen = BTreeSet::new();
    for entry in entries {
        if entry.trim().is_empty() {
            return Err(RefillError::config(format!("{field} contains an empty entry")));
        }
        if !seen.insert(entry.as_str()) {
            return Err(RefillError::config(format!(
                "{field} lists '{entry}' more than once"
            )));
        }
    }
    Ok(entries.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> RunConfig {
        RunConfig {
            workspace: "analytics-prod".into(),
            base_url: "https://api.example.com".into(),
            datasources: DataSourceRuleConfig::default(),
            pipes: PipeRuleConfig::default(),
        }
    }

    #[test]
    fn defaults_are_always_present() {
        let rules = RuleSet::from_config(&minimal_config()).unwrap();
        for prefix in DEFAULT_EXCLUDE_PREFIXES {
            assert!(
                rules.data_sources.prefix_exclude.contains(prefix),
                "missing built-in prefix {prefix}"
            );
        }
    }

    #[test]
    fn user_prefixes_union_with_defaults() {
        let mut config = minimal_config();
        config.datasources.exclude_prefixes = vec!["tmp_".into(), "ops_".into()];
        let rules = RuleSet::from_config(&config).unwrap();

        assert!(rules.data_sources.prefix_exclude.contains("tmp_"));
        // Duplicate of a built-in is harmless.
        assert_eq!(
            rules
                .data_sources
                .prefix_exclude
                .iter()
                .filter(|p| p.as_str() == "ops_")
                .count(),
            1
        );
        assert_eq!(rules.data_sources.prefix_exclude.len(), 4);
    }

    #[test]
    fn empty_entry_in_set_field_is_rejected() {
        let mut config = minimal_config();
        config.datasources.whitelist = vec!["good".into(), "  ".into()];
        let err = RuleSet::from_config(&config).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("datasources.whitelist"));
    }

    #[test]
    fn duplicate_priority_entry_is_rejected() {
        let mut config = minimal_config();
        config.pipes.priority = vec!["etl_a".into(), "etl_b".into(), "etl_a".into()];
        let err = RuleSet::from_config(&config).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("etl_a"));
    }

    #[test]
    fn name_in_both_priority_and_final_is_rejected() {
        let mut config = minimal_config();
        config.pipes.priority = vec!["etl_a".into()];
        config.pipes.final_pipes = vec!["etl_z".into(), "etl_a".into()];
        let err = RuleSet::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("both pipes.priority and pipes.final"));
    }

    #[test]
    fn priority_and_final_preserve_declared_order() {
        let mut config = minimal_config();
        config.pipes.priority = vec!["etl_c".into(), "etl_a".into()];
        config.pipes.final_pipes = vec!["etl_z".into(), "etl_m".into()];
        let rules = RuleSet::from_config(&config).unwrap();
        assert_eq!(rules.pipes.priority_order, vec!["etl_c", "etl_a"]);
        assert_eq!(rules.pipes.final_order, vec!["etl_z", "etl_m"]);
    }

    #[test]
    fn override_plus_whitelist_is_not_an_error() {
        // Override prefixes silently take precedence; this is documented
        // precedence, not a validation failure.
        let mut config = minimal_config();
        config.datasources.whitelist = vec!["cdc_x".into()];
        config.datasources.override_prefixes = vec!["agg_".into()];
        assert!(RuleSet::from_config(&config).is_ok());
    }

    #[test]
    fn config_round_trips_through_json() {
        let json = r#"{
            "workspace": "analytics-prod",
            "base_url": "https://api.example.com",
            "datasources": {
                "exclude_prefixes": ["tmp_"],
                "whitelist": ["cdc_orders"]
            },
            "pipes": {
                "include_prefixes": ["etl_"],
                "priority": ["etl_first"],
                "final": ["etl_last"]
            }
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.workspace, "analytics-prod");
        assert_eq!(config.pipes.final_pipes, vec!["etl_last"]);

        let rules = RuleSet::from_config(&config).unwrap();
        assert_eq!(rules.pipes.priority_order, vec!["etl_first"]);
        assert!(rules.data_sources.whitelist.contains("cdc_orders"));
    }

    #[test]
    fn malformed_json_fails_at_load() {
        let config: std::result::Result<RunConfig, _> =
            serde_json::from_str(r#"{"workspace": "w", "base_url": "u", "pipes": {"priority": [1, 2]}}"#);
        assert!(config.is_err());
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refill.json");
        std::fs::write(
            &path,
            r#"{"workspace": "w", "base_url": "https://api.example.com"}"#,
        )
        .unwrap();
        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.workspace, "w");
    }
}
