//! Column resolver: raw export headers → canonical fields.
//!
//! Exports spell the same logical column many ways (`Campaign`,
//! `Campaign name`, `campaign_name`, `campaignName`...). A [`ColumnSchema`]
//! is resolved once per import from the header row and then applied to every
//! row, so per-row access is a plain map lookup.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::ImportDefaults;
use crate::parser::Row;

/// Logical columns understood by the row folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    CampaignName,
    CampaignStatus,
    DailyBudget,
    AdGroupName,
    AdGroupStatus,
    MaxCpc,
    KeywordText,
    MatchType,
    KeywordMaxCpc,
    /// Numbered headline, 1-based
    Headline(u8),
    /// Numbered description, 1-based
    Description(u8),
    Path1,
    Path2,
    FinalUrl,
    AdStatus,
}

impl CanonicalField {
    /// Every field, with the given number of headline and description slots.
    pub fn all(headlines: u8, descriptions: u8) -> Vec<CanonicalField> {
        let mut fields = vec![
            Self::CampaignName,
            Self::CampaignStatus,
            Self::DailyBudget,
            Self::AdGroupName,
            Self::AdGroupStatus,
            Self::MaxCpc,
            Self::KeywordText,
            Self::MatchType,
            Self::KeywordMaxCpc,
        ];
        fields.extend((1..=headlines).map(Self::Headline));
        fields.extend((1..=descriptions).map(Self::Description));
        fields.extend([Self::Path1, Self::Path2, Self::FinalUrl, Self::AdStatus]);
        fields
    }

    /// Accepted header spellings, lowercase, in priority order.
    pub fn aliases(&self) -> Vec<String> {
        let fixed: &[&str] = match self {
            Self::CampaignName => &["campaign", "campaign name", "campaign_name", "campaignname"],
            Self::CampaignStatus => &["campaign status", "campaign_status", "campaignstatus"],
            Self::DailyBudget => &["daily budget", "budget", "daily_budget", "dailybudget"],
            Self::AdGroupName => &[
                "ad group",
                "ad group name",
                "adgroup",
                "ad_group",
                "ad_group_name",
                "adgroupname",
            ],
            Self::AdGroupStatus => &["ad group status", "ad_group_status", "adgroupstatus"],
            Self::MaxCpc => &[
                "max cpc",
                "default max. cpc",
                "default max cpc",
                "max_cpc",
                "maxcpc",
            ],
            Self::KeywordText => &["keyword", "keyword text", "keyword_text", "keywordtext"],
            Self::MatchType => &[
                "match type",
                "keyword match type",
                "criterion type",
                "match_type",
                "matchtype",
            ],
            Self::KeywordMaxCpc => &["keyword max cpc", "keyword bid", "keyword_max_cpc", "keywordmaxcpc"],
            Self::Path1 => &["path 1", "path1", "path_1"],
            Self::Path2 => &["path 2", "path2", "path_2"],
            Self::FinalUrl => &[
                "final url",
                "destination url",
                "url",
                "final_url",
                "finalurl",
            ],
            Self::AdStatus => &["ad status", "ad_status", "adstatus"],
            Self::Headline(n) => {
                return vec![
                    format!("headline {}", n),
                    format!("headline{}", n),
                    format!("headline_{}", n),
                ]
            }
            Self::Description(n) => {
                return vec![
                    format!("description {}", n),
                    format!("description line {}", n),
                    format!("description{}", n),
                    format!("description_{}", n),
                ]
            }
        };
        fixed.iter().map(|a| a.to_string()).collect()
    }

    /// Whether the import cannot proceed without this column.
    pub fn is_required(&self) -> bool {
        matches!(self, Self::CampaignName)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CampaignName => f.write_str("campaign name"),
            Self::CampaignStatus => f.write_str("campaign status"),
            Self::DailyBudget => f.write_str("daily budget"),
            Self::AdGroupName => f.write_str("ad group name"),
            Self::AdGroupStatus => f.write_str("ad group status"),
            Self::MaxCpc => f.write_str("max cpc"),
            Self::KeywordText => f.write_str("keyword"),
            Self::MatchType => f.write_str("match type"),
            Self::KeywordMaxCpc => f.write_str("keyword max cpc"),
            Self::Headline(n) => write!(f, "headline {}", n),
            Self::Description(n) => write!(f, "description {}", n),
            Self::Path1 => f.write_str("path 1"),
            Self::Path2 => f.write_str("path 2"),
            Self::FinalUrl => f.write_str("final url"),
            Self::AdStatus => f.write_str("ad status"),
        }
    }
}

/// Canonical field → raw header label, resolved once per import.
#[derive(Debug, Clone, Default)]
pub struct ColumnSchema {
    resolved: BTreeMap<CanonicalField, String>,
    unmapped: Vec<String>,
}

impl ColumnSchema {
    /// Resolve with the default headline/description column counts.
    pub fn resolve(headers: &[String]) -> Self {
        Self::resolve_with(headers, &ImportDefaults::default())
    }

    pub fn resolve_with(headers: &[String], defaults: &ImportDefaults) -> Self {
        let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let mut resolved = BTreeMap::new();

        for field in CanonicalField::all(defaults.headline_columns, defaults.description_columns) {
            let hit = field
                .aliases()
                .iter()
                .find_map(|alias| normalized.iter().position(|h| h == alias));
            if let Some(idx) = hit {
                resolved.insert(field, headers[idx].clone());
            }
        }

        let unmapped = headers
            .iter()
            .filter(|h| !h.trim().is_empty() && !resolved.values().any(|r| r == *h))
            .cloned()
            .collect();

        Self { resolved, unmapped }
    }

    /// Trimmed, non-empty value of `field` in `row`.
    pub fn value<'r>(&self, row: &'r Row, field: CanonicalField) -> Option<&'r str> {
        let header = self.resolved.get(&field)?;
        row.get(header)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Header label `field` resolved to, if any.
    pub fn header(&self, field: CanonicalField) -> Option<&str> {
        self.resolved.get(&field).map(String::as_str)
    }

    pub fn has(&self, field: CanonicalField) -> bool {
        self.resolved.contains_key(&field)
    }

    /// Required fields with no matching header.
    pub fn missing_required(&self) -> Vec<CanonicalField> {
        [CanonicalField::CampaignName]
            .into_iter()
            .filter(|f| f.is_required() && !self.has(*f))
            .collect()
    }

    pub fn resolved(&self) -> impl Iterator<Item = (&CanonicalField, &String)> {
        self.resolved.iter()
    }

    /// Headers no field claimed, in file order.
    pub fn unmapped(&self) -> &[String] {
        &self.unmapped
    }
}
