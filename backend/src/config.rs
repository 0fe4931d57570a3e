//! Runtime configuration and the import defaults table.
//!
//! [`ImportDefaults`] is the one place where fallback values for imported
//! attributes live. The row folder and the reconciliation engine read it;
//! nothing else hard-codes a default.

use std::env;
use std::path::PathBuf;

use crate::models::{EntityStatus, MatchType};

/// Default SQLite database location (relative to current dir)
pub const DEFAULT_DB_PATH: &str = ".campaign-import/campaigns.db";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3000;

/// Fallback values applied when an imported row does not carry an attribute.
#[derive(Debug, Clone)]
pub struct ImportDefaults {
    pub campaign_status: EntityStatus,
    pub ad_group_status: EntityStatus,
    pub ad_status: EntityStatus,
    pub daily_budget: f64,
    pub max_cpc: f64,
    pub match_type: MatchType,
    pub final_url: String,
    pub path1: String,
    pub path2: String,
    /// Headline columns are probed as `headline 1..=headline_columns`
    pub headline_columns: u8,
    /// Description columns are probed as `description 1..=description_columns`
    pub description_columns: u8,
    /// File extensions treated as tabular inside an archive (lowercase, no dot)
    pub tabular_extensions: Vec<String>,
    /// Largest decompressed archive entry accepted, in bytes
    pub max_entry_bytes: u64,
}

impl Default for ImportDefaults {
    fn default() -> Self {
        Self {
            campaign_status: EntityStatus::Active,
            ad_group_status: EntityStatus::Active,
            ad_status: EntityStatus::Active,
            daily_budget: 10.0,
            max_cpc: 1.0,
            match_type: MatchType::Broad,
            final_url: String::new(),
            path1: String::new(),
            path2: String::new(),
            headline_columns: 15,
            description_columns: 4,
            tabular_extensions: vec!["csv".to_string(), "tsv".to_string(), "txt".to_string()],
            max_entry_bytes: 64 * 1024 * 1024,
        }
    }
}

impl ImportDefaults {
    /// Whether an archive entry name has a recognised tabular extension.
    pub fn is_tabular(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        match lower.rsplit_once('.') {
            Some((_, ext)) => self.tabular_extensions.iter().any(|e| e == ext),
            None => false,
        }
    }
}

/// Process configuration read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
}

impl AppConfig {
    /// Read `CAMPAIGN_IMPORT_DB` and `CAMPAIGN_IMPORT_PORT`.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Self {
        let db_path = env::var("CAMPAIGN_IMPORT_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH));
        let port = env::var("CAMPAIGN_IMPORT_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Self { db_path, port }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            port: DEFAULT_PORT,
        }
    }
}
