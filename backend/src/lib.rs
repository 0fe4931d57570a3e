//! # Campaign Import - reconcile ad-platform exports into a campaign store
//!
//! Flat spreadsheet exports (campaign → ad group → keywords / ads, one row per
//! keyword or ad) are folded into a tree and merged into a SQLite store,
//! without duplicating keywords or ads and with a snapshot of every touched
//! campaign taken first.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ CSV/TSV/zip │────▶│   Parser    │────▶│   Folder    │────▶│  Reconcile  │
//! │ (UTF-8/16)  │     │  (auto-enc) │     │ (draft tree)│     │ (1 tx/file) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use campaign_import::{import_file, ImportOptions, Store};
//!
//! let mut store = Store::open("campaigns.db")?;
//! let result = import_file(&mut store, "spring.csv", &ImportOptions::default());
//! println!("{} campaigns created", result.stats.campaigns_created);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Import defaults table and runtime settings
//! - [`models`] - Persisted entities, snapshots and import records
//! - [`parser`] - Tabular parsing with encoding/delimiter detection
//! - [`store`] - SQLite store and repository
//! - [`import`] - Column resolution, folding, reconciliation, archives
//! - [`api`] - HTTP API server and log streaming

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Persistence
pub mod store;

// Import engine
pub mod import;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ArchiveError, CsvError, ImportError, PipelineResult, ServerError, StoreError,
};

// =============================================================================
// Re-exports - Config & Models
// =============================================================================

pub use config::{AppConfig, ImportDefaults};

pub use models::{
    Ad, AdGroup, Campaign, CampaignSubtree, EntityStatus, ImportIssue, ImportRecord,
    ImportStatus, Keyword, MatchType, Snapshot, SnapshotType,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, is_blank_row, parse_bytes_auto,
    parse_file_auto, ParseResult, Row,
};

// =============================================================================
// Re-exports - Store
// =============================================================================

pub use store::{Repository, Store};

// =============================================================================
// Re-exports - Import
// =============================================================================

pub use import::{
    fold_rows, get_snapshot, import_archive, import_file, import_rows, import_tabular,
    import_upload, list_snapshots, take_snapshot, CanonicalField, ColumnSchema, FoldOutput,
    ImportOptions, ImportResult, ImportStats,
};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
