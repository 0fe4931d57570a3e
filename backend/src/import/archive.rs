//! Archive expander for zip bundles of tabular exports.
//!
//! Entries are imported one after another in the archive's own order, each
//! as an independent pass with its own import record and transaction. The
//! aggregate sums statistics, tags every issue with its entry name and
//! reports the import id of the first entry that started.

use std::io::{Cursor, Read};

use super::pipeline::{import_tabular_source, SourceMeta};
use super::result::ImportResult;
use super::ImportOptions;
use crate::api::logs::{log_error, log_info, log_info_indent};
use crate::config::ImportDefaults;
use crate::error::{ArchiveError, ArchiveResult, ImportError};
use crate::models::SourceKind;
use crate::store::Store;

/// Local file header magic of a zip archive.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// One tabular file extracted from a bundle.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Whether an upload should be treated as a bundle.
pub fn is_zip(file_name: &str, bytes: &[u8]) -> bool {
    file_name.to_lowercase().ends_with(".zip") || bytes.starts_with(ZIP_MAGIC)
}

/// Extract the tabular entries of a zip archive, in archive order.
///
/// Directories and entries without a recognised extension are skipped. An
/// entry larger than `max_entry_bytes` rejects the whole archive.
pub fn read_tabular_entries(bytes: &[u8], defaults: &ImportDefaults) -> ArchiveResult<Vec<ArchiveEntry>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let name = file.name().to_string();

        if file.is_dir() || !defaults.is_tabular(&name) {
            log_info_indent(format!("Skipping archive entry '{}'", name), 1);
            continue;
        }

        // The declared size comes from the archive itself, so only the bytes
        // actually read are trusted
        let limit = defaults.max_entry_bytes;
        let mut content = Vec::new();
        (&mut file).take(limit.saturating_add(1)).read_to_end(&mut content)?;
        if content.len() as u64 > limit {
            return Err(ArchiveError::EntryTooLarge { name, limit });
        }
        entries.push(ArchiveEntry { name, bytes: content });
    }

    if entries.is_empty() {
        return Err(ArchiveError::NoTabularEntries);
    }

    Ok(entries)
}

/// Import every tabular entry of a zip bundle.
///
/// An unreadable archive or one without tabular entries yields a single
/// error and no import id; nothing is written to the store.
pub fn import_archive(store: &mut Store, bytes: &[u8], options: &ImportOptions) -> ImportResult {
    let entries = match read_tabular_entries(bytes, &options.defaults) {
        Ok(entries) => entries,
        Err(e) => {
            let err = ImportError::from(e);
            log_error(format!("Archive rejected: {}", err));
            return ImportResult::failed(err.to_string());
        }
    };

    log_info(format!("📦 Archive holds {} tabular file(s)", entries.len()));

    let mut total = ImportResult::empty();
    for entry in &entries {
        log_info(format!("📄 Entry {}", entry.name));
        let meta = SourceMeta {
            name: &entry.name,
            kind: SourceKind::ArchiveEntry,
            byte_size: entry.bytes.len() as u64,
        };
        let result = import_tabular_source(store, meta, &entry.bytes, options);
        total.merge(result, &entry.name);
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_of(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            if name.ends_with('/') {
                writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_is_zip_by_name_or_magic() {
        assert!(is_zip("bundle.ZIP", b""));
        assert!(is_zip("upload", b"PK\x03\x04rest"));
        assert!(!is_zip("spring.csv", b"Campaign,Ad group"));
    }

    #[test]
    fn test_entries_filtered_in_archive_order() {
        let bytes = zip_of(&[
            ("b.csv", "Campaign\nB\n"),
            ("notes/", ""),
            ("readme.md", "# hi"),
            ("a.tsv", "Campaign\nA\n"),
        ]);

        let entries = read_tabular_entries(&bytes, &ImportDefaults::default()).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b.csv", "a.tsv"]);
    }

    #[test]
    fn test_archive_aggregates_entries() {
        let bytes = zip_of(&[
            ("spring.csv", "Campaign,Ad group,Keyword\nSpring,Shoes,running shoes\n"),
            ("brand.csv", "Campaign,Ad group,Budget\nBrand,Logo,oops\n"),
        ]);
        let mut store = Store::open_in_memory().unwrap();

        let result = import_archive(&mut store, &bytes, &ImportOptions::default());

        assert_eq!(result.stats.campaigns_created, 2);
        assert_eq!(result.stats.ad_groups_created, 2);
        assert_eq!(result.stats.keywords_created, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].source.as_deref(), Some("brand.csv"));
        assert!(!result.success);

        let records = store.repository().list_import_records().unwrap();
        assert_eq!(records.len(), 2);
        // Newest first, so the first entry's record is last
        assert_eq!(result.import_id.as_deref(), Some(records[1].id.as_str()));
        assert_eq!(records[1].source_name, "spring.csv");
        assert_eq!(records[1].source_kind, SourceKind::ArchiveEntry);
    }

    #[test]
    fn test_archive_without_tabular_entries() {
        let bytes = zip_of(&[("readme.md", "nothing here")]);
        let mut store = Store::open_in_memory().unwrap();

        let result = import_archive(&mut store, &bytes, &ImportOptions::default());

        assert!(!result.success);
        assert!(result.import_id.is_none());
        assert_eq!(result.errors.len(), 1);
        assert!(store.repository().list_import_records().unwrap().is_empty());
    }

    /// Overwrite the 32-bit uncompressed size in every local and central header.
    fn patch_declared_size(bytes: &mut [u8], size: u32) {
        let mut i = 0;
        while i + 4 <= bytes.len() {
            let offset = match &bytes[i..i + 4] {
                b"PK\x03\x04" => Some(22),
                b"PK\x01\x02" => Some(24),
                _ => None,
            };
            if let Some(offset) = offset {
                bytes[i + offset..i + offset + 4].copy_from_slice(&size.to_le_bytes());
            }
            i += 1;
        }
    }

    #[test]
    fn test_declared_size_is_not_trusted() {
        let content = "Campaign,Ad group\nSpring,Shoes\n";
        let mut bytes = zip_of(&[("spring.csv", content)]);
        patch_declared_size(&mut bytes, 0xFFFF_FFF0);

        // Either the reader notices the mismatch or it returns the real bytes
        if let Ok(entries) = read_tabular_entries(&bytes, &ImportDefaults::default()) {
            assert_eq!(entries[0].bytes, content.as_bytes());
        }
    }

    #[test]
    fn test_oversized_entry_rejects_archive() {
        let bytes = zip_of(&[("spring.csv", "Campaign,Ad group\nSpring,Shoes\n")]);
        let defaults = ImportDefaults {
            max_entry_bytes: 8,
            ..ImportDefaults::default()
        };

        let err = read_tabular_entries(&bytes, &defaults).unwrap_err();
        assert!(matches!(err, ArchiveError::EntryTooLarge { limit: 8, .. }));

        let mut store = Store::open_in_memory().unwrap();
        let options = ImportOptions {
            defaults,
            ..ImportOptions::default()
        };
        let result = import_archive(&mut store, &bytes, &options);
        assert!(!result.success);
        assert!(result.errors[0].message.contains("spring.csv"));
        assert!(result.import_id.is_none());
    }

    #[test]
    fn test_corrupt_archive_fails_cleanly() {
        let mut store = Store::open_in_memory().unwrap();
        let result = import_archive(&mut store, b"PK\x03\x04garbage", &ImportOptions::default());

        assert!(!result.success);
        assert!(result.import_id.is_none());
    }
}
