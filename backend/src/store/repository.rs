//! Entity-level reads and writes over an explicit connection handle.
//!
//! A [`Repository`] never opens or commits transactions itself. When built
//! from a transaction it participates in it; when built from the plain
//! connection every statement autocommits.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    Ad, AdGroup, AdGroupSubtree, Campaign, CampaignSubtree, EntityStatus, ImportIssue,
    ImportRecord, ImportStatus, Keyword, MatchType, Snapshot, SnapshotType, SourceKind,
};

const CAMPAIGN_COLUMNS: &str =
    "id, name, status, daily_budget, final_url, path1, path2, created_at, updated_at";
const AD_GROUP_COLUMNS: &str = "id, campaign_id, name, status, max_cpc, created_at, updated_at";
const KEYWORD_COLUMNS: &str = "id, ad_group_id, text, match_type, max_cpc, created_at";
const AD_COLUMNS: &str = "id, ad_group_id, headlines, descriptions, final_url, path1, path2, status, created_at, updated_at";
const SNAPSHOT_COLUMNS: &str = "id, campaign_id, snapshot_type, description, data, created_at";
const IMPORT_COLUMNS: &str = "id, source_name, source_kind, byte_size, status, entity_count, errors, created_at, completed_at";

/// Borrowing data-access layer.
#[derive(Clone, Copy)]
pub struct Repository<'c> {
    conn: &'c Connection,
}

impl<'c> Repository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    // ─── Campaigns ─────────────────────────────────────────────────────────

    pub fn find_campaign_by_name(&self, name: &str) -> StoreResult<Option<Campaign>> {
        let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE name = ?1");
        Ok(self.conn.query_row(&sql, params![name], campaign_from_row).optional()?)
    }

    pub fn get_campaign(&self, id: &str) -> StoreResult<Option<Campaign>> {
        let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1");
        Ok(self.conn.query_row(&sql, params![id], campaign_from_row).optional()?)
    }

    pub fn list_campaigns(&self) -> StoreResult<Vec<Campaign>> {
        let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY rowid");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], campaign_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn insert_campaign(&self, campaign: &Campaign) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO campaigns (id, name, status, daily_budget, final_url, path1, path2, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                campaign.id,
                campaign.name,
                campaign.status.as_str(),
                campaign.daily_budget,
                campaign.final_url,
                campaign.path1,
                campaign.path2,
                campaign.created_at,
                campaign.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn update_campaign(&self, campaign: &Campaign) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE campaigns
             SET status = ?2, daily_budget = ?3, final_url = ?4, path1 = ?5, path2 = ?6, updated_at = ?7
             WHERE id = ?1",
            params![
                campaign.id,
                campaign.status.as_str(),
                campaign.daily_budget,
                campaign.final_url,
                campaign.path1,
                campaign.path2,
                campaign.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("Campaign", &campaign.id));
        }
        Ok(())
    }

    // ─── Ad groups ─────────────────────────────────────────────────────────

    pub fn find_ad_group(&self, campaign_id: &str, name: &str) -> StoreResult<Option<AdGroup>> {
        let sql = format!("SELECT {AD_GROUP_COLUMNS} FROM ad_groups WHERE campaign_id = ?1 AND name = ?2");
        Ok(self
            .conn
            .query_row(&sql, params![campaign_id, name], ad_group_from_row)
            .optional()?)
    }

    pub fn list_ad_groups(&self, campaign_id: &str) -> StoreResult<Vec<AdGroup>> {
        let sql = format!("SELECT {AD_GROUP_COLUMNS} FROM ad_groups WHERE campaign_id = ?1 ORDER BY rowid");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![campaign_id], ad_group_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn insert_ad_group(&self, ad_group: &AdGroup) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO ad_groups (id, campaign_id, name, status, max_cpc, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                ad_group.id,
                ad_group.campaign_id,
                ad_group.name,
                ad_group.status.as_str(),
                ad_group.max_cpc,
                ad_group.created_at,
                ad_group.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn update_ad_group(&self, ad_group: &AdGroup) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE ad_groups SET status = ?2, max_cpc = ?3, updated_at = ?4 WHERE id = ?1",
            params![
                ad_group.id,
                ad_group.status.as_str(),
                ad_group.max_cpc,
                ad_group.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("Ad group", &ad_group.id));
        }
        Ok(())
    }

    // ─── Keywords ──────────────────────────────────────────────────────────

    pub fn list_keywords(&self, ad_group_id: &str) -> StoreResult<Vec<Keyword>> {
        let sql = format!("SELECT {KEYWORD_COLUMNS} FROM keywords WHERE ad_group_id = ?1 ORDER BY rowid");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![ad_group_id], keyword_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn insert_keyword(&self, keyword: &Keyword) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO keywords (id, ad_group_id, text, match_type, max_cpc, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                keyword.id,
                keyword.ad_group_id,
                keyword.text,
                keyword.match_type.as_str(),
                keyword.max_cpc,
                keyword.created_at,
            ],
        )?;
        Ok(())
    }

    // ─── Ads ───────────────────────────────────────────────────────────────

    pub fn list_ads(&self, ad_group_id: &str) -> StoreResult<Vec<Ad>> {
        let sql = format!("SELECT {AD_COLUMNS} FROM ads WHERE ad_group_id = ?1 ORDER BY rowid");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![ad_group_id], ad_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Insert an ad under its precomputed headline dedup key.
    pub fn insert_ad(&self, ad: &Ad, dedup_key: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO ads (id, ad_group_id, dedup_key, headlines, descriptions, final_url, path1, path2, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                ad.id,
                ad.ad_group_id,
                dedup_key,
                serde_json::to_string(&ad.headlines)?,
                serde_json::to_string(&ad.descriptions)?,
                ad.final_url,
                ad.path1,
                ad.path2,
                ad.status.as_str(),
                ad.created_at,
                ad.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update everything but the headlines (which carry the ad's identity).
    pub fn update_ad(&self, ad: &Ad) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE ads SET descriptions = ?2, final_url = ?3, path1 = ?4, path2 = ?5, status = ?6, updated_at = ?7
             WHERE id = ?1",
            params![
                ad.id,
                serde_json::to_string(&ad.descriptions)?,
                ad.final_url,
                ad.path1,
                ad.path2,
                ad.status.as_str(),
                ad.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("Ad", &ad.id));
        }
        Ok(())
    }

    // ─── Subtree ───────────────────────────────────────────────────────────

    /// Read a campaign with all of its ad groups, keywords and ads.
    pub fn load_subtree(&self, campaign_id: &str) -> StoreResult<Option<CampaignSubtree>> {
        let Some(campaign) = self.get_campaign(campaign_id)? else {
            return Ok(None);
        };

        let mut ad_groups = Vec::new();
        for ad_group in self.list_ad_groups(campaign_id)? {
            let keywords = self.list_keywords(&ad_group.id)?;
            let ads = self.list_ads(&ad_group.id)?;
            ad_groups.push(AdGroupSubtree {
                ad_group,
                keywords,
                ads,
            });
        }

        Ok(Some(CampaignSubtree { campaign, ad_groups }))
    }

    // ─── Snapshots (append-only) ───────────────────────────────────────────

    pub fn insert_snapshot(&self, snapshot: &Snapshot) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO snapshots (id, campaign_id, snapshot_type, description, data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                snapshot.id,
                snapshot.campaign_id,
                snapshot.snapshot_type.as_str(),
                snapshot.description,
                serde_json::to_string(&snapshot.data)?,
                snapshot.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn list_snapshots(&self, campaign_id: &str) -> StoreResult<Vec<Snapshot>> {
        let sql = format!("SELECT {SNAPSHOT_COLUMNS} FROM snapshots WHERE campaign_id = ?1 ORDER BY rowid");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![campaign_id], snapshot_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_snapshot(&self, id: &str) -> StoreResult<Option<Snapshot>> {
        let sql = format!("SELECT {SNAPSHOT_COLUMNS} FROM snapshots WHERE id = ?1");
        Ok(self.conn.query_row(&sql, params![id], snapshot_from_row).optional()?)
    }

    // ─── Import records ────────────────────────────────────────────────────

    pub fn insert_import_record(&self, record: &ImportRecord) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO import_records (id, source_name, source_kind, byte_size, status, entity_count, errors, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id,
                record.source_name,
                record.source_kind.as_str(),
                record.byte_size as i64,
                record.status.as_str(),
                record.entity_count as i64,
                serde_json::to_string(&record.errors)?,
                record.created_at,
                record.completed_at,
            ],
        )?;
        Ok(())
    }

    /// Move a processing record to its final status. Allowed exactly once.
    pub fn finish_import_record(
        &self,
        id: &str,
        status: ImportStatus,
        entity_count: u64,
        errors: &[ImportIssue],
        completed_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE import_records SET status = ?2, entity_count = ?3, errors = ?4, completed_at = ?5
             WHERE id = ?1",
            params![
                id,
                status.as_str(),
                entity_count as i64,
                serde_json::to_string(errors)?,
                completed_at,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("Import record", id));
        }
        Ok(())
    }

    pub fn get_import_record(&self, id: &str) -> StoreResult<Option<ImportRecord>> {
        let sql = format!("SELECT {IMPORT_COLUMNS} FROM import_records WHERE id = ?1");
        Ok(self.conn.query_row(&sql, params![id], import_record_from_row).optional()?)
    }

    pub fn list_import_records(&self) -> StoreResult<Vec<ImportRecord>> {
        let sql = format!("SELECT {IMPORT_COLUMNS} FROM import_records ORDER BY rowid DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], import_record_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

// =============================================================================
// Row mapping
// =============================================================================

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn status_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<EntityStatus> {
    let raw: String = row.get(idx)?;
    EntityStatus::parse(&raw).ok_or_else(|| conversion_error(idx, format!("unknown status '{}'", raw)))
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn campaign_from_row(row: &Row<'_>) -> rusqlite::Result<Campaign> {
    Ok(Campaign {
        id: row.get(0)?,
        name: row.get(1)?,
        status: status_column(row, 2)?,
        daily_budget: row.get(3)?,
        final_url: row.get(4)?,
        path1: row.get(5)?,
        path2: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn ad_group_from_row(row: &Row<'_>) -> rusqlite::Result<AdGroup> {
    Ok(AdGroup {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        name: row.get(2)?,
        status: status_column(row, 3)?,
        max_cpc: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn keyword_from_row(row: &Row<'_>) -> rusqlite::Result<Keyword> {
    let match_type: String = row.get(3)?;
    Ok(Keyword {
        id: row.get(0)?,
        ad_group_id: row.get(1)?,
        text: row.get(2)?,
        match_type: MatchType::parse(&match_type),
        max_cpc: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn ad_from_row(row: &Row<'_>) -> rusqlite::Result<Ad> {
    Ok(Ad {
        id: row.get(0)?,
        ad_group_id: row.get(1)?,
        headlines: json_column(row, 2)?,
        descriptions: json_column(row, 3)?,
        final_url: row.get(4)?,
        path1: row.get(5)?,
        path2: row.get(6)?,
        status: status_column(row, 7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<Snapshot> {
    let raw_type: String = row.get(2)?;
    let snapshot_type = SnapshotType::parse(&raw_type)
        .ok_or_else(|| conversion_error(2, format!("unknown snapshot type '{}'", raw_type)))?;
    Ok(Snapshot {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        snapshot_type,
        description: row.get(3)?,
        data: json_column(row, 4)?,
        created_at: row.get(5)?,
    })
}

fn import_record_from_row(row: &Row<'_>) -> rusqlite::Result<ImportRecord> {
    let raw_kind: String = row.get(2)?;
    let source_kind = SourceKind::parse(&raw_kind)
        .ok_or_else(|| conversion_error(2, format!("unknown source kind '{}'", raw_kind)))?;
    let raw_status: String = row.get(4)?;
    let status = ImportStatus::parse(&raw_status)
        .ok_or_else(|| conversion_error(4, format!("unknown import status '{}'", raw_status)))?;
    let byte_size: i64 = row.get(3)?;
    let entity_count: i64 = row.get(5)?;

    Ok(ImportRecord {
        id: row.get(0)?,
        source_name: row.get(1)?,
        source_kind,
        byte_size: byte_size.max(0) as u64,
        status,
        entity_count: entity_count.max(0) as u64,
        errors: json_column(row, 6)?,
        created_at: row.get(7)?,
        completed_at: row.get(8)?,
    })
}
