//! Fold a flat row stream into a Campaign → AdGroup → {Keyword, Ad} tree.
//!
//! # Architecture
//!
//! ```text
//! Flat rows (any order)                     Draft tree (insertion order)
//! ┌──────────────────────────────────┐      ┌──────────────────────────┐
//! │ Spring, Shoes, headline/desc     │      │ Spring                   │
//! │ Brand,  Logo,  keyword           │  →   │   Shoes: ads[1] kw[1]    │
//! │ Spring, Shoes, keyword           │      │ Brand                    │
//! └──────────────────────────────────┘      │   Logo:  kw[1]           │
//!                                           └──────────────────────────┘
//! ```
//!
//! Rows for the same campaign need not be contiguous. Campaign and ad group
//! attributes are first-seen-wins: they are captured from the row that
//! creates the entry, and later rows are only validated. Bad cells are
//! row-level errors; rows that cannot contribute anything are warnings.
//! Rows whose cells are all empty are skipped but keep their row number.
//! Nothing here aborts.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use super::columns::{CanonicalField, ColumnSchema};
use crate::config::ImportDefaults;
use crate::models::{EntityStatus, ImportIssue, MatchType};
use crate::parser::{is_blank_row, Row};

/// Optional sign and currency symbol around a plain or comma-grouped amount.
static MONEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-)?\s*[$€£¥]?\s*(-)?(\d{1,3}(?:,\d{3})+|\d+)?(\.\d+)?\s*[$€£¥]?$").expect("valid regex")
});

// =============================================================================
// Drafts
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordDraft {
    pub text: String,
    pub match_type: MatchType,
    pub max_cpc: Option<f64>,
    /// 1-based data row the keyword came from
    pub row: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdDraft {
    /// Non-empty headlines in column order
    pub headlines: Vec<String>,
    /// Non-empty descriptions in column order
    pub descriptions: Vec<String>,
    pub final_url: Option<String>,
    pub path1: Option<String>,
    pub path2: Option<String>,
    pub status: Option<EntityStatus>,
    pub row: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdGroupDraft {
    pub name: String,
    pub status: Option<EntityStatus>,
    pub max_cpc: Option<f64>,
    /// First row that mentioned this ad group
    pub row: usize,
    pub keywords: Vec<KeywordDraft>,
    pub ads: Vec<AdDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CampaignDraft {
    pub name: String,
    pub status: Option<EntityStatus>,
    pub daily_budget: Option<f64>,
    pub final_url: Option<String>,
    pub path1: Option<String>,
    pub path2: Option<String>,
    /// First row that mentioned this campaign
    pub row: usize,
    pub ad_groups: Vec<AdGroupDraft>,
    ad_group_index: HashMap<String, usize>,
}

impl CampaignDraft {
    fn new(name: &str, row: usize) -> Self {
        Self {
            name: name.to_string(),
            status: None,
            daily_budget: None,
            final_url: None,
            path1: None,
            path2: None,
            row,
            ad_groups: Vec::new(),
            ad_group_index: HashMap::new(),
        }
    }

    fn ad_group_mut(&mut self, name: &str, row: usize) -> &mut AdGroupDraft {
        let idx = match self.ad_group_index.get(name) {
            Some(&idx) => idx,
            None => {
                self.ad_groups.push(AdGroupDraft {
                    name: name.to_string(),
                    status: None,
                    max_cpc: None,
                    row,
                    keywords: Vec::new(),
                    ads: Vec::new(),
                });
                self.ad_group_index.insert(name.to_string(), self.ad_groups.len() - 1);
                self.ad_groups.len() - 1
            }
        };
        &mut self.ad_groups[idx]
    }
}

/// Everything the folder produced from one row stream.
#[derive(Debug, Clone, Default)]
pub struct FoldOutput {
    pub campaigns: Vec<CampaignDraft>,
    pub errors: Vec<ImportIssue>,
    pub warnings: Vec<ImportIssue>,
    pub rows_read: usize,
}

impl FoldOutput {
    pub fn ad_group_count(&self) -> usize {
        self.campaigns.iter().map(|c| c.ad_groups.len()).sum()
    }

    pub fn keyword_count(&self) -> usize {
        self.campaigns
            .iter()
            .flat_map(|c| &c.ad_groups)
            .map(|g| g.keywords.len())
            .sum()
    }

    pub fn ad_count(&self) -> usize {
        self.campaigns
            .iter()
            .flat_map(|c| &c.ad_groups)
            .map(|g| g.ads.len())
            .sum()
    }
}

// =============================================================================
// Folding
// =============================================================================

/// Parse a money cell such as `12.5`, `$1,250.00` or `€ 3`.
///
/// Commas are only accepted as thousands separators between groups of
/// three digits, so `12,50` is rejected rather than read as 1250.
pub fn parse_money(raw: &str) -> Option<f64> {
    let caps = MONEY.captures(raw.trim())?;
    if caps.get(1).is_some() && caps.get(2).is_some() {
        return None;
    }
    let sign = if caps.get(1).or(caps.get(2)).is_some() { "-" } else { "" };
    let int = caps.get(3).map_or(String::new(), |m| m.as_str().replace(',', ""));
    let frac = caps.get(4).map_or("", |m| m.as_str());
    if int.is_empty() && frac.is_empty() {
        return None;
    }

    let int = if int.is_empty() { "0" } else { int.as_str() };
    format!("{}{}{}", sign, int, frac)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

struct RowFolder<'a> {
    schema: &'a ColumnSchema,
    defaults: &'a ImportDefaults,
    out: FoldOutput,
    campaign_index: HashMap<String, usize>,
}

/// Fold `rows` into an insertion-ordered draft tree.
pub fn fold_rows(schema: &ColumnSchema, rows: &[Row], defaults: &ImportDefaults) -> FoldOutput {
    let mut folder = RowFolder {
        schema,
        defaults,
        out: FoldOutput::default(),
        campaign_index: HashMap::new(),
    };

    for (idx, row) in rows.iter().enumerate() {
        if is_blank_row(row) {
            continue;
        }
        folder.fold_row(idx + 1, row);
        folder.out.rows_read += 1;
    }

    folder.out
}

impl<'a> RowFolder<'a> {
    fn fold_row(&mut self, row_no: usize, row: &Row) {
        let schema = self.schema;

        let Some(campaign_name) = schema.value(row, CanonicalField::CampaignName) else {
            self.out
                .warnings
                .push(ImportIssue::at_row(row_no, "Missing campaign name, row skipped"));
            return;
        };

        // Cells are validated on every row, even when the attribute is already captured
        let status = self.status(row, CanonicalField::CampaignStatus, self.defaults.campaign_status);
        let budget = self.money(row_no, row, CanonicalField::DailyBudget, "daily budget");
        let final_url = schema.value(row, CanonicalField::FinalUrl).map(String::from);
        let path1 = schema.value(row, CanonicalField::Path1).map(String::from);
        let path2 = schema.value(row, CanonicalField::Path2).map(String::from);

        let ad_group_name = schema.value(row, CanonicalField::AdGroupName);
        let ad_group_status = self.status(row, CanonicalField::AdGroupStatus, self.defaults.ad_group_status);
        let max_cpc = self.money(row_no, row, CanonicalField::MaxCpc, "max CPC");
        let keyword = self.keyword(row_no, row);
        let ad = self.ad(row_no, row);

        let campaign = self.campaign_mut(campaign_name, row_no);
        if campaign.row == row_no {
            campaign.status = status;
            campaign.daily_budget = budget;
            campaign.final_url = final_url.clone();
            campaign.path1 = path1.clone();
            campaign.path2 = path2.clone();
        }

        let Some(ad_group_name) = ad_group_name else {
            let message = if keyword.is_some() || ad.is_some() {
                format!(
                    "No ad group for campaign '{}', keyword/ad data ignored",
                    campaign_name
                )
            } else {
                format!("Campaign-only row for '{}', only campaign attributes applied", campaign_name)
            };
            self.out.warnings.push(ImportIssue::at_row(row_no, message));
            return;
        };

        let group = campaign.ad_group_mut(ad_group_name, row_no);
        if group.row == row_no {
            group.status = ad_group_status;
            group.max_cpc = max_cpc;
        }

        if let Some(keyword) = keyword {
            group.keywords.push(keyword);
        }
        if let Some(mut ad) = ad {
            ad.final_url = final_url;
            ad.path1 = path1;
            ad.path2 = path2;
            group.ads.push(ad);
        }
    }

    fn campaign_mut(&mut self, name: &str, row_no: usize) -> &mut CampaignDraft {
        let idx = match self.campaign_index.get(name) {
            Some(&idx) => idx,
            None => {
                self.out.campaigns.push(CampaignDraft::new(name, row_no));
                self.campaign_index.insert(name.to_string(), self.out.campaigns.len() - 1);
                self.out.campaigns.len() - 1
            }
        };
        &mut self.out.campaigns[idx]
    }

    fn status(&self, row: &Row, field: CanonicalField, default: EntityStatus) -> Option<EntityStatus> {
        self.schema
            .value(row, field)
            .map(|raw| EntityStatus::parse_or(Some(raw), default))
    }

    fn money(&mut self, row_no: usize, row: &Row, field: CanonicalField, label: &str) -> Option<f64> {
        let raw = self.schema.value(row, field)?;
        match parse_money(raw) {
            Some(value) => Some(value),
            None => {
                self.out
                    .errors
                    .push(ImportIssue::at_row(row_no, format!("Invalid {} '{}'", label, raw)));
                None
            }
        }
    }

    fn keyword(&mut self, row_no: usize, row: &Row) -> Option<KeywordDraft> {
        let text = self.schema.value(row, CanonicalField::KeywordText)?.to_string();
        let match_type = self
            .schema
            .value(row, CanonicalField::MatchType)
            .map(MatchType::parse)
            .unwrap_or(self.defaults.match_type);
        let max_cpc = self.money(row_no, row, CanonicalField::KeywordMaxCpc, "keyword bid");

        Some(KeywordDraft {
            text,
            match_type,
            max_cpc,
            row: row_no,
        })
    }

    fn ad(&mut self, row_no: usize, row: &Row) -> Option<AdDraft> {
        let headlines = self.numbered(row, self.defaults.headline_columns, CanonicalField::Headline);
        let descriptions =
            self.numbered(row, self.defaults.description_columns, CanonicalField::Description);

        match (headlines.is_empty(), descriptions.is_empty()) {
            (true, true) => None,
            (false, false) => Some(AdDraft {
                headlines,
                descriptions,
                final_url: None,
                path1: None,
                path2: None,
                status: self.status(row, CanonicalField::AdStatus, self.defaults.ad_status),
                row: row_no,
            }),
            (false, true) => {
                self.out.warnings.push(ImportIssue::at_row(
                    row_no,
                    "Ad has headlines but no description, ad skipped",
                ));
                None
            }
            (true, false) => {
                self.out.warnings.push(ImportIssue::at_row(
                    row_no,
                    "Ad has descriptions but no headline, ad skipped",
                ));
                None
            }
        }
    }

    fn numbered(&self, row: &Row, count: u8, field: fn(u8) -> CanonicalField) -> Vec<String> {
        (1..=count)
            .filter_map(|n| self.schema.value(row, field(n)))
            .map(String::from)
            .collect()
    }
}
