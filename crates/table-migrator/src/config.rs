//! Migration configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for the copy and reconciliation passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyTuning {
    /// Rows per bulk-copy page.
    pub page_size: u64,
    /// Ids per delta upsert statement.
    pub delta_batch_size: usize,
    /// Upper bound on unlocked delta passes.
    pub max_delta_passes: u32,
    /// A delta pass finishing within this window signals convergence: the
    /// remaining write volume fits in a single locked pass.
    pub convergence_threshold: Duration,
    /// Unlocked pause before the locked catch-up, letting in-flight writes
    /// land so the locked pass absorbs a smaller tail.
    pub settle_pause: Duration,
}

impl Default for CopyTuning {
    fn default() -> Self {
        Self {
            page_size: 50_000,
            delta_batch_size: 1_000,
            max_delta_passes: 5,
            convergence_threshold: Duration::from_secs(5),
            settle_pause: Duration::from_secs(5),
        }
    }
}

/// Configuration for one table migration. Immutable once the engine starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Monotonically non-decreasing column used for change detection. Must be
    /// updated on every mutating write to a tracked row.
    pub delta_column: String,
    /// Suppress every mutation and fabricate safe reads, while still
    /// producing the full statement plan.
    pub dry_run: bool,
    /// Create and bulk-populate the new table. Disable when a prepare step
    /// already ran.
    pub create_temp_table: bool,
    /// Run unlocked delta passes before the locked catch-up.
    pub multi_pass: bool,
    /// Names the old table `<table>_pre_<name>` instead of `<table>_old`.
    pub migration_name: Option<String>,
    /// Pass and page sizing.
    pub tuning: CopyTuning,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            delta_column: "updated_at".to_string(),
            dry_run: false,
            create_temp_table: true,
            multi_pass: false,
            migration_name: None,
            tuning: CopyTuning::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MigrationConfig::default();
        assert_eq!(config.delta_column, "updated_at");
        assert!(!config.dry_run);
        assert!(config.create_temp_table);
        assert!(!config.multi_pass);
        assert!(config.migration_name.is_none());
        assert_eq!(config.tuning.page_size, 50_000);
        assert_eq!(config.tuning.delta_batch_size, 1_000);
        assert_eq!(config.tuning.max_delta_passes, 5);
        assert_eq!(config.tuning.convergence_threshold, Duration::from_secs(5));
        assert_eq!(config.tuning.settle_pause, Duration::from_secs(5));
    }

    #[test]
    fn test_config_from_json_with_defaults() {
        let config: MigrationConfig =
            serde_json::from_str(r#"{"delta_column": "touched_at", "multi_pass": true}"#).unwrap();
        assert_eq!(config.delta_column, "touched_at");
        assert!(config.multi_pass);
        // unspecified fields fall back to defaults
        assert!(config.create_temp_table);
        assert_eq!(config.tuning.page_size, 50_000);
    }
}
