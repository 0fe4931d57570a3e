//! Single-file import pipeline and public entry points.
//!
//! Every entry point returns an [`ImportResult`]. Structural and store
//! failures become a failed result with the error in `errors`; nothing
//! escapes as `Err`.
//!
//! # Example
//!
//! ```rust,ignore
//! use campaign_import::import::{import_file, ImportOptions};
//! use campaign_import::store::Store;
//!
//! let mut store = Store::open(".campaign-import/campaigns.db")?;
//! let result = import_file(&mut store, "spring.csv", &ImportOptions::default());
//! println!("{} campaigns created", result.stats.campaigns_created);
//! ```

use chrono::Utc;
use std::path::Path;

use super::archive::{import_archive, is_zip};
use super::columns::ColumnSchema;
use super::folder::fold_rows;
use super::reconcile::reconcile;
use super::result::{ImportReport, ImportResult};
use super::transaction::run_atomic;
use super::ImportOptions;
use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::error::{ImportError, PipelineResult};
use crate::models::{ImportRecord, ImportStatus, SourceKind};
use crate::parser::{is_blank_row, parse_bytes_auto, Row};
use crate::store::{new_id, Store};

/// Identifies the input of one pass in its import record.
#[derive(Debug, Clone)]
pub(crate) struct SourceMeta<'a> {
    pub name: &'a str,
    pub kind: SourceKind,
    pub byte_size: u64,
}

/// Import rows that were already parsed.
pub fn import_rows(
    store: &mut Store,
    source_name: &str,
    headers: &[String],
    rows: &[Row],
    options: &ImportOptions,
) -> ImportResult {
    let meta = SourceMeta {
        name: source_name,
        kind: SourceKind::File,
        byte_size: 0,
    };
    run_pass(store, meta, options, |store, report| {
        reconcile_rows(store, source_name, headers, rows, options, report)
    })
}

/// Import one tabular file given as raw bytes.
pub fn import_tabular(
    store: &mut Store,
    source_name: &str,
    bytes: &[u8],
    options: &ImportOptions,
) -> ImportResult {
    let meta = SourceMeta {
        name: source_name,
        kind: SourceKind::File,
        byte_size: bytes.len() as u64,
    };
    import_tabular_source(store, meta, bytes, options)
}

/// Import an upload, dispatching zip bundles to the archive expander.
pub fn import_upload(
    store: &mut Store,
    file_name: &str,
    bytes: &[u8],
    options: &ImportOptions,
) -> ImportResult {
    if is_zip(file_name, bytes) {
        import_archive(store, bytes, options)
    } else {
        import_tabular(store, file_name, bytes, options)
    }
}

/// Read `path` from disk and import it.
pub fn import_file(store: &mut Store, path: impl AsRef<Path>, options: &ImportOptions) -> ImportResult {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    match std::fs::read(path) {
        Ok(bytes) => import_upload(store, &file_name, &bytes, options),
        Err(e) => {
            log_error(format!("Cannot read '{}': {}", path.display(), e));
            ImportResult::failed(format!("Failed to read file '{}': {}", path.display(), e))
        }
    }
}

pub(crate) fn import_tabular_source(
    store: &mut Store,
    meta: SourceMeta<'_>,
    bytes: &[u8],
    options: &ImportOptions,
) -> ImportResult {
    let source_name = meta.name;
    run_pass(store, meta, options, |store, report| {
        log_info(format!("📖 Reading {}...", source_name));
        let parsed = parse_bytes_auto(bytes)?;
        log_success(format!(
            "Detected encoding {} and separator '{}', {} row(s)",
            parsed.encoding,
            format_delimiter(parsed.delimiter),
            parsed.rows.len()
        ));
        reconcile_rows(store, source_name, &parsed.headers, &parsed.rows, options, report)
    })
}

/// Wrap one pass with its import record.
///
/// The record is created in autocommit mode before the pass, so it survives
/// a rolled-back pass, and is finalised exactly once afterwards.
fn run_pass<F>(store: &mut Store, meta: SourceMeta<'_>, options: &ImportOptions, pass: F) -> ImportResult
where
    F: FnOnce(&mut Store, &mut ImportReport) -> PipelineResult<()>,
{
    let record = ImportRecord {
        id: new_id(),
        source_name: meta.name.to_string(),
        source_kind: meta.kind,
        byte_size: meta.byte_size,
        status: ImportStatus::Processing,
        entity_count: 0,
        errors: Vec::new(),
        created_at: Utc::now(),
        completed_at: None,
    };

    if let Err(e) = store.repository().insert_import_record(&record) {
        log_error(format!("Cannot record import of '{}': {}", meta.name, e));
        return ImportResult::failed(ImportError::from(e).to_string());
    }

    log_info(format!(
        "📥 Import {} started for '{}' (updateExisting={}, createSnapshot={})",
        record.id, meta.name, options.update_existing, options.create_snapshot
    ));

    let mut report = ImportReport::default();
    let status = match pass(store, &mut report) {
        Ok(()) => ImportStatus::Completed,
        Err(e) => {
            log_error(format!("Import of '{}' failed: {}", meta.name, e));
            report.abort(&e);
            ImportStatus::Failed
        }
    };

    let entity_count = match status {
        ImportStatus::Completed => report.stats.entities_touched(),
        _ => 0,
    };
    if let Err(e) = store.repository().finish_import_record(
        &record.id,
        status,
        entity_count,
        &report.errors,
        Utc::now(),
    ) {
        log_error(format!("Cannot finalise import record {}: {}", record.id, e));
        report.error(crate::models::ImportIssue::new(format!(
            "Failed to finalise import record: {}",
            e
        )));
    }

    let result = report.into_result(Some(record.id));
    log_summary(meta.name, &result);
    result
}

/// Resolve columns, fold rows and reconcile them in one transaction.
fn reconcile_rows(
    store: &mut Store,
    source_name: &str,
    headers: &[String],
    rows: &[Row],
    options: &ImportOptions,
    report: &mut ImportReport,
) -> PipelineResult<()> {
    let schema = ColumnSchema::resolve_with(headers, &options.defaults);
    let missing = schema.missing_required();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns(
            missing.iter().map(|f| f.to_string()).collect(),
        ));
    }
    if !schema.unmapped().is_empty() {
        log_info(format!("Ignoring columns: {}", schema.unmapped().join(", ")));
    }

    if rows.iter().all(is_blank_row) {
        return Err(ImportError::EmptyInput);
    }

    let folded = fold_rows(&schema, rows, &options.defaults);
    log_success(format!(
        "Folded {} row(s) into {} campaign(s), {} ad group(s), {} keyword(s), {} ad(s)",
        folded.rows_read,
        folded.campaigns.len(),
        folded.ad_group_count(),
        folded.keyword_count(),
        folded.ad_count()
    ));
    if !folded.warnings.is_empty() {
        log_warning(format!("{} row warning(s)", folded.warnings.len()));
    }
    report.errors.extend(folded.errors);
    report.warnings.extend(folded.warnings);

    run_atomic(store, source_name, |repo| {
        reconcile(repo, &folded.campaigns, options, report)
    })
}

fn format_delimiter(delimiter: char) -> String {
    match delimiter {
        '\t' => "TAB".to_string(),
        other => other.to_string(),
    }
}

fn log_summary(source_name: &str, result: &ImportResult) {
    let stats = &result.stats;
    let line = format!(
        "{}: campaigns {}/{}/{} (created/updated/skipped), ad groups {}/{}/{}, ads {}/{}, keywords {}, errors {}, warnings {}",
        source_name,
        stats.campaigns_created,
        stats.campaigns_updated,
        stats.campaigns_skipped,
        stats.ad_groups_created,
        stats.ad_groups_updated,
        stats.ad_groups_skipped,
        stats.ads_created,
        stats.ads_updated,
        stats.keywords_created,
        stats.errors_count,
        result.warnings.len()
    );
    if result.success {
        log_success(line);
    } else {
        log_error(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportDefaults;
    use serde_json::{json, Value};

    /// Rows from JSON objects, as a loosely keyed export would produce.
    fn json_rows(value: Value) -> (Vec<String>, Vec<Row>) {
        let mut headers: Vec<String> = Vec::new();
        let mut rows = Vec::new();
        for obj in value.as_array().unwrap() {
            let mut row = Row::new();
            for (k, v) in obj.as_object().unwrap() {
                if !headers.contains(k) {
                    headers.push(k.clone());
                }
                row.insert(k.clone(), v.as_str().unwrap().to_string());
            }
            rows.push(row);
        }
        (headers, rows)
    }

    fn spring_sale() -> (Vec<String>, Vec<Row>) {
        json_rows(json!([
            { "campaign": "Spring Sale", "adGroup": "Shoes", "headline1": "50% Off", "description1": "Shop now and save." },
            { "campaign": "Spring Sale", "adGroup": "Shoes", "keyword": "running shoes", "matchType": "Exact" }
        ]))
    }

    #[test]
    fn test_spring_sale_scenario() {
        let mut store = Store::open_in_memory().unwrap();
        let (headers, rows) = spring_sale();

        let result = import_rows(&mut store, "rows", &headers, &rows, &ImportOptions::default());

        assert!(result.success);
        assert_eq!(result.stats.campaigns_created, 1);
        assert_eq!(result.stats.ad_groups_created, 1);
        assert_eq!(result.stats.ads_created, 1);
        assert_eq!(result.stats.keywords_created, 1);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());

        let repo = store.repository();
        let record = repo.get_import_record(result.import_id.as_deref().unwrap()).unwrap().unwrap();
        assert_eq!(record.status, ImportStatus::Completed);
        assert_eq!(record.entity_count, 4);
    }

    #[test]
    fn test_reimport_is_idempotent() {
        let mut store = Store::open_in_memory().unwrap();
        let (headers, rows) = spring_sale();
        let options = ImportOptions::default();

        import_rows(&mut store, "first", &headers, &rows, &options);
        let second = import_rows(&mut store, "second", &headers, &rows, &options);

        assert!(second.success);
        assert_eq!(second.stats.campaigns_created, 0);
        assert_eq!(second.stats.ad_groups_created, 0);
        assert_eq!(second.stats.ads_created, 0);
        assert_eq!(second.stats.keywords_created, 0);
        assert_eq!(second.stats.campaigns_skipped, 1);
        assert_eq!(store.repository().list_campaigns().unwrap().len(), 1);
    }

    #[test]
    fn test_first_seen_budget_wins() {
        let mut store = Store::open_in_memory().unwrap();
        let csv = b"Campaign,Budget,Ad group\nSpring,12.50,Shoes\nSpring,99,Boots\n";

        let result = import_tabular(&mut store, "spring.csv", csv, &ImportOptions::default());

        assert!(result.success);
        let campaign = store.repository().find_campaign_by_name("Spring").unwrap().unwrap();
        assert_eq!(campaign.daily_budget, 12.5);
        assert_eq!(result.stats.ad_groups_created, 2);
    }

    #[test]
    fn test_later_row_does_not_fill_uncaptured_budget() {
        let mut store = Store::open_in_memory().unwrap();
        let csv = b"Campaign,Budget,Ad group\nSpring,,Shoes\nSpring,90,Boots\n";

        let result = import_tabular(&mut store, "spring.csv", csv, &ImportOptions::default());

        assert!(result.success);
        let campaign = store.repository().find_campaign_by_name("Spring").unwrap().unwrap();
        assert_eq!(campaign.daily_budget, ImportDefaults::default().daily_budget);
    }

    #[test]
    fn test_malformed_budgets_are_rejected_not_guessed() {
        let mut store = Store::open_in_memory().unwrap();
        let csv = "Campaign;Budget\nEU;12,50\nTxt;10 per day\nSci;1e3\nOk;1,250\n";

        let result = import_tabular(&mut store, "eu.csv", csv.as_bytes(), &ImportOptions::default());

        assert!(!result.success);
        let rows: Vec<Option<usize>> = result.errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![Some(1), Some(2), Some(3)]);

        let repo = store.repository();
        let default_budget = ImportDefaults::default().daily_budget;
        for name in ["EU", "Txt", "Sci"] {
            let campaign = repo.find_campaign_by_name(name).unwrap().unwrap();
            assert_eq!(campaign.daily_budget, default_budget);
        }
        assert_eq!(repo.find_campaign_by_name("Ok").unwrap().unwrap().daily_budget, 1250.0);
    }

    #[test]
    fn test_blank_records_keep_reported_row_numbers() {
        let mut store = Store::open_in_memory().unwrap();
        let csv = b"Campaign;Budget;Ad group\nSpring;5;Shoes\n;;\nBrand;lots;Logo\n";

        let result = import_tabular(&mut store, "x.csv", csv, &ImportOptions::default());

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row, Some(3));
        assert!(result.warnings.is_empty());
        assert_eq!(result.stats.campaigns_created, 2);

        let blank = import_tabular(&mut store, "y.csv", b"Campaign;Ad group\n;\n", &ImportOptions::default());
        assert_eq!(blank.errors[0].message, "No rows to import");
    }

    #[test]
    fn test_store_failure_mid_pass_rolls_everything_back() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .connection()
            .execute_batch(
                "CREATE TRIGGER boom BEFORE INSERT ON campaigns WHEN NEW.name = 'Three'
                 BEGIN SELECT RAISE(ABORT, 'boom'); END;",
            )
            .unwrap();
        let csv = b"Campaign,Ad group,Keyword\nOne,G,k\nTwo,G,k\nThree,G,k\nFour,G,k\nFive,G,k\n";

        let result = import_tabular(&mut store, "five.csv", csv, &ImportOptions::default());

        assert!(!result.success);
        assert_eq!(result.stats.campaigns_created, 0);
        assert_eq!(result.stats.ad_groups_created, 0);
        assert_eq!(result.stats.keywords_created, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("boom"));

        let repo = store.repository();
        assert!(repo.list_campaigns().unwrap().is_empty());
        let record = repo.get_import_record(result.import_id.as_deref().unwrap()).unwrap().unwrap();
        assert_eq!(record.status, ImportStatus::Failed);
        assert_eq!(record.entity_count, 0);
        assert_eq!(record.errors.len(), 1);
    }

    #[test]
    fn test_missing_campaign_column_is_fatal() {
        let mut store = Store::open_in_memory().unwrap();
        let result = import_tabular(&mut store, "x.csv", b"Ad group,Keyword\nShoes,k\n", &ImportOptions::default());

        assert!(!result.success);
        assert!(result.errors[0].message.contains("campaign name"));
        assert!(result.import_id.is_some());
    }

    #[test]
    fn test_header_only_input_is_empty() {
        let mut store = Store::open_in_memory().unwrap();
        let result = import_tabular(&mut store, "x.csv", b"Campaign,Ad group\n", &ImportOptions::default());

        assert!(!result.success);
        assert_eq!(result.errors[0].message, "No rows to import");
    }

    #[test]
    fn test_row_errors_do_not_fail_the_pass() {
        let mut store = Store::open_in_memory().unwrap();
        let csv = b"Campaign,Budget,Ad group\nSpring,abc,Shoes\n,,Orphan\n";

        let result = import_tabular(&mut store, "x.csv", csv, &ImportOptions::default());

        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row, Some(1));
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.stats.campaigns_created, 1);

        let record = store
            .repository()
            .get_import_record(result.import_id.as_deref().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(record.status, ImportStatus::Completed);
    }

    #[test]
    fn test_import_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spring.csv");
        std::fs::write(&path, "Campaign;Ad group;Keyword\nSpring;Shoes;running shoes\n").unwrap();
        let mut store = Store::open_in_memory().unwrap();

        let result = import_file(&mut store, &path, &ImportOptions::default());
        assert!(result.success);
        assert_eq!(result.stats.keywords_created, 1);

        let record = store.repository().list_import_records().unwrap().remove(0);
        assert_eq!(record.source_name, "spring.csv");
        assert_eq!(record.byte_size, 53);

        let missing = import_file(&mut store, dir.path().join("nope.csv"), &ImportOptions::default());
        assert!(!missing.success);
        assert!(missing.import_id.is_none());
    }
}
