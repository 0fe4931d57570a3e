//! Domain models for the campaign import pipeline.
//!
//! This module contains the persisted entity graph and the import audit
//! records:
//!
//! - [`Campaign`] → [`AdGroup`] → {[`Keyword`], [`Ad`]}
//! - [`EntityStatus`] / [`MatchType`] - value mappings from export spellings
//! - [`Snapshot`] - immutable capture of one campaign subtree
//! - [`ImportRecord`] - one row per pipeline invocation
//! - [`ImportIssue`] - structured row/entity-level error or warning

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Status & Match Type
// =============================================================================

/// Lifecycle status shared by campaigns, ad groups and ads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    Active,
    Paused,
    Draft,
}

impl EntityStatus {
    /// Parse a status as spelled in platform exports.
    ///
    /// `enabled`/`active` → Active, `paused` → Paused,
    /// `removed`/`deleted`/`disabled` → Draft. Anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "enabled" | "active" => Some(Self::Active),
            "paused" => Some(Self::Paused),
            "removed" | "deleted" | "disabled" => Some(Self::Draft),
            // Stored spelling
            "draft" => Some(Self::Draft),
            _ => None,
        }
    }

    /// Parse an optional raw value, falling back to `default`.
    pub fn parse_or(raw: Option<&str>, default: Self) -> Self {
        raw.and_then(Self::parse).unwrap_or(default)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Draft => "draft",
        }
    }
}

/// How strictly a keyword must match a search query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    Broad,
    Phrase,
    Exact,
}

impl MatchType {
    /// `exact` / `[exact]` → Exact, `phrase` / `"phrase"` → Phrase,
    /// anything else → Broad.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "exact" | "[exact]" => Self::Exact,
            "phrase" | "\"phrase\"" => Self::Phrase,
            _ => Self::Broad,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Broad => "broad",
            Self::Phrase => "phrase",
            Self::Exact => "exact",
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

/// A campaign. Identity is its name, unique within the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub status: EntityStatus,
    pub daily_budget: f64,
    pub final_url: String,
    pub path1: String,
    pub path2: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An ad group. Identity is (campaign id, name).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdGroup {
    pub id: String,
    pub campaign_id: String,
    pub name: String,
    pub status: EntityStatus,
    pub max_cpc: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A keyword. Unique by exact text within its ad group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Keyword {
    pub id: String,
    pub ad_group_id: String,
    pub text: String,
    pub match_type: MatchType,
    /// Per-keyword bid override
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_cpc: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// A responsive ad. Unique by headline multiset within its ad group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ad {
    pub id: String,
    pub ad_group_id: String,
    pub headlines: Vec<String>,
    pub descriptions: Vec<String>,
    pub final_url: String,
    pub path1: String,
    pub path2: String,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An ad group with everything it owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdGroupSubtree {
    pub ad_group: AdGroup,
    pub keywords: Vec<Keyword>,
    pub ads: Vec<Ad>,
}

/// A campaign with its full ad group / keyword / ad subtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSubtree {
    pub campaign: Campaign,
    pub ad_groups: Vec<AdGroupSubtree>,
}

impl CampaignSubtree {
    pub fn ad_count(&self) -> usize {
        self.ad_groups.iter().map(|g| g.ads.len()).sum()
    }

    pub fn keyword_count(&self) -> usize {
        self.ad_groups.iter().map(|g| g.keywords.len()).sum()
    }
}

// =============================================================================
// Snapshots
// =============================================================================

/// Why a snapshot was taken.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotType {
    /// Taken by the reconciliation engine before ad-group-level mutation
    PreImport,
    /// Taken on request
    Manual,
}

impl SnapshotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreImport => "pre_import",
            Self::Manual => "manual",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pre_import" => Some(Self::PreImport),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// Immutable, append-only capture of a campaign subtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    pub campaign_id: String,
    pub snapshot_type: SnapshotType,
    pub description: String,
    pub data: CampaignSubtree,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Import records
// =============================================================================

/// A structured row- or entity-level problem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportIssue {
    /// 1-based data row index (header excluded), when known
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub row: Option<usize>,
    /// Archive entry the issue came from
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source: Option<String>,
    pub message: String,
}

impl ImportIssue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            row: None,
            source: None,
            message: message.into(),
        }
    }

    pub fn at_row(row: usize, message: impl Into<String>) -> Self {
        Self {
            row: Some(row),
            source: None,
            message: message.into(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl std::fmt::Display for ImportIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "[{}] ", source)?;
        }
        match self.row {
            Some(row) => write!(f, "Row {}: {}", row, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Lifecycle of an import record: processing → completed | failed, once.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Processing,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Where the imported bytes came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    File,
    ArchiveEntry,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::ArchiveEntry => "archive_entry",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "file" => Some(Self::File),
            "archive_entry" => Some(Self::ArchiveEntry),
            _ => None,
        }
    }
}

/// Audit row for one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    pub id: String,
    pub source_name: String,
    pub source_kind: SourceKind,
    pub byte_size: u64,
    pub status: ImportStatus,
    /// Created + updated entities, zero when failed
    pub entity_count: u64,
    pub errors: Vec<ImportIssue>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub completed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Tests
// =============================================================================
