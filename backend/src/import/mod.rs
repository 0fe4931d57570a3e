//! Import reconciliation engine.
//!
//! # Architecture
//!
//! ```text
//! bytes ─┬─ archive ──► per entry ─┐
//!        └─────────────────────────┴─► parser ─► columns ─► folder
//!                                                             │
//!            result ◄── reconcile (dedup + snapshot) ◄── transaction
//! ```
//!
//! - [`columns`] resolves raw headers to canonical fields once per import
//! - [`folder`] builds the Campaign → AdGroup → {Keyword, Ad} draft tree
//! - [`reconcile`] decides create / update / skip against the store
//! - [`dedup`] keeps keywords and ads unique per ad group
//! - [`snapshot`] captures a campaign subtree before ad-group mutation
//! - [`transaction`] makes one pass all-or-nothing
//! - [`archive`] expands zip bundles and aggregates per-entry results
//! - [`result`] builds the caller-facing [`ImportResult`]
//! - [`pipeline`] ties the steps together behind the public entry points

pub mod archive;
pub mod columns;
pub mod dedup;
pub mod folder;
pub mod pipeline;
pub mod reconcile;
pub mod result;
pub mod snapshot;
pub mod transaction;

use serde::{Deserialize, Serialize};

use crate::config::ImportDefaults;

pub use crate::models::ImportIssue;
pub use archive::import_archive;
pub use columns::{CanonicalField, ColumnSchema};
pub use folder::{fold_rows, FoldOutput};
pub use pipeline::{import_file, import_rows, import_tabular, import_upload};
pub use result::{ImportResult, ImportStats};
pub use snapshot::{get_snapshot, list_snapshots, take_snapshot};

/// Caller-facing switches for one import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOptions {
    /// Merge into existing campaigns / ad groups instead of skipping them
    pub update_existing: bool,
    /// Snapshot each processed campaign before touching its ad groups
    pub create_snapshot: bool,
    /// Fallback values for attributes the input does not carry
    #[serde(skip)]
    pub defaults: ImportDefaults,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            update_existing: false,
            create_snapshot: true,
            defaults: ImportDefaults::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_defaults() {
        let options = ImportOptions::default();
        assert!(!options.update_existing);
        assert!(options.create_snapshot);
    }

    #[test]
    fn test_options_from_partial_json() {
        let options: ImportOptions = serde_json::from_value(json!({ "updateExisting": true })).unwrap();
        assert!(options.update_existing);
        assert!(options.create_snapshot);
        assert_eq!(options.defaults.headline_columns, 15);
    }
}
