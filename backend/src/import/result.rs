//! Import statistics and the caller-facing [`ImportResult`].

use serde::{Deserialize, Serialize};

use crate::error::ImportError;
use crate::models::ImportIssue;

/// Per-entity counters for one import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    pub campaigns_created: u64,
    pub campaigns_updated: u64,
    pub campaigns_skipped: u64,
    pub ad_groups_created: u64,
    pub ad_groups_updated: u64,
    pub ad_groups_skipped: u64,
    pub ads_created: u64,
    pub ads_updated: u64,
    pub keywords_created: u64,
    pub errors_count: u64,
}

impl ImportStats {
    /// Created plus updated entities across every level.
    pub fn entities_touched(&self) -> u64 {
        self.campaigns_created
            + self.campaigns_updated
            + self.ad_groups_created
            + self.ad_groups_updated
            + self.ads_created
            + self.ads_updated
            + self.keywords_created
    }

    /// Field-wise sum.
    pub fn absorb(&mut self, other: &ImportStats) {
        self.campaigns_created += other.campaigns_created;
        self.campaigns_updated += other.campaigns_updated;
        self.campaigns_skipped += other.campaigns_skipped;
        self.ad_groups_created += other.ad_groups_created;
        self.ad_groups_updated += other.ad_groups_updated;
        self.ad_groups_skipped += other.ad_groups_skipped;
        self.ads_created += other.ads_created;
        self.ads_updated += other.ads_updated;
        self.keywords_created += other.keywords_created;
        self.errors_count += other.errors_count;
    }
}

/// Accumulator threaded through one pass.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub stats: ImportStats,
    pub errors: Vec<ImportIssue>,
    pub warnings: Vec<ImportIssue>,
}

impl ImportReport {
    pub fn error(&mut self, issue: ImportIssue) {
        self.errors.push(issue);
    }

    pub fn warning(&mut self, issue: ImportIssue) {
        self.warnings.push(issue);
    }

    /// Record a fatal error. Nothing was committed, so counters go back to zero.
    pub fn abort(&mut self, err: &ImportError) {
        self.stats = ImportStats::default();
        self.errors.push(ImportIssue::new(err.to_string()));
    }

    pub fn into_result(mut self, import_id: Option<String>) -> ImportResult {
        self.stats.errors_count = self.errors.len() as u64;
        ImportResult {
            success: self.errors.is_empty(),
            import_id,
            stats: self.stats,
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

/// Structured outcome returned for every import, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    /// True iff `errors` is empty
    pub success: bool,
    pub import_id: Option<String>,
    pub stats: ImportStats,
    pub errors: Vec<ImportIssue>,
    pub warnings: Vec<ImportIssue>,
}

impl ImportResult {
    /// A failure that never reached the store (no import id).
    pub fn failed(message: impl Into<String>) -> Self {
        ImportReport {
            errors: vec![ImportIssue::new(message)],
            ..ImportReport::default()
        }
        .into_result(None)
    }

    /// An empty result to fold archive entries into.
    pub fn empty() -> Self {
        ImportReport::default().into_result(None)
    }

    /// Fold one archive entry's result into this aggregate.
    ///
    /// Stats are summed, issues are tagged with `source`, and the first
    /// import id seen is kept.
    pub fn merge(&mut self, other: ImportResult, source: &str) {
        self.stats.absorb(&other.stats);
        self.errors
            .extend(other.errors.into_iter().map(|i| i.with_source(source)));
        self.warnings
            .extend(other.warnings.into_iter().map(|i| i.with_source(source)));
        if self.import_id.is_none() {
            self.import_id = other.import_id;
        }
        self.stats.errors_count = self.errors.len() as u64;
        self.success = self.errors.is_empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_iff_no_errors() {
        let mut report = ImportReport::default();
        report.warning(ImportIssue::at_row(3, "Missing campaign name, row skipped"));
        report.stats.campaigns_created = 2;
        let result = report.into_result(Some("imp-1".into()));

        assert!(result.success);
        assert_eq!(result.stats.errors_count, 0);
        assert_eq!(result.warnings.len(), 1);

        let mut report = ImportReport::default();
        report.error(ImportIssue::at_row(1, "Invalid daily budget 'x'"));
        let result = report.into_result(None);
        assert!(!result.success);
        assert_eq!(result.stats.errors_count, 1);
    }

    #[test]
    fn test_abort_zeroes_counters_keeps_issues() {
        let mut report = ImportReport::default();
        report.stats.campaigns_created = 2;
        report.warning(ImportIssue::at_row(1, "w"));
        report.abort(&ImportError::EmptyInput);

        let result = report.into_result(Some("imp".into()));
        assert_eq!(result.stats.campaigns_created, 0);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.errors[0].message, "No rows to import");
    }

    #[test]
    fn test_merge_sums_and_tags() {
        let mut total = ImportResult::empty();

        let mut first = ImportReport::default();
        first.stats.campaigns_created = 1;
        first.stats.keywords_created = 4;
        total.merge(first.into_result(Some("a".into())), "one.csv");

        let mut second = ImportReport::default();
        second.stats.campaigns_created = 2;
        second.error(ImportIssue::at_row(2, "bad"));
        total.merge(second.into_result(Some("b".into())), "two.csv");

        assert_eq!(total.import_id.as_deref(), Some("a"));
        assert_eq!(total.stats.campaigns_created, 3);
        assert_eq!(total.stats.keywords_created, 4);
        assert_eq!(total.stats.errors_count, 1);
        assert_eq!(total.errors[0].source.as_deref(), Some("two.csv"));
        assert!(!total.success);
    }

    #[test]
    fn test_camel_case_wire_format() {
        let json = serde_json::to_value(ImportResult::failed("boom")).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["importId"].is_null());
        assert_eq!(json["stats"]["campaignsCreated"], 0);
        assert_eq!(json["stats"]["errorsCount"], 1);
    }
}
