//! REST API types.
//!
//! Import results and records are returned as-is (they are already
//! camelCase serializable); listings use the lighter summaries below.

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ServerError, StoreError};
use crate::models::{Campaign, CampaignSubtree, Snapshot, SnapshotType};

/// A campaign with the size of its subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSummary {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub ad_group_count: usize,
    pub keyword_count: usize,
    pub ad_count: usize,
}

impl From<CampaignSubtree> for CampaignSummary {
    fn from(tree: CampaignSubtree) -> Self {
        Self {
            ad_group_count: tree.ad_groups.len(),
            keyword_count: tree.keyword_count(),
            ad_count: tree.ad_count(),
            campaign: tree.campaign,
        }
    }
}

/// Snapshot metadata without the captured subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub id: String,
    pub campaign_id: String,
    pub snapshot_type: SnapshotType,
    pub description: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub ad_group_count: usize,
    pub ad_count: usize,
}

impl From<&Snapshot> for SnapshotSummary {
    fn from(s: &Snapshot) -> Self {
        Self {
            id: s.id.clone(),
            campaign_id: s.campaign_id.clone(),
            snapshot_type: s.snapshot_type,
            description: s.description.clone(),
            created_at: s.created_at,
            ad_group_count: s.data.ad_groups.len(),
            ad_count: s.data.ad_count(),
        }
    }
}

/// Parse a multipart boolean field (`true`/`false`/`1`/`0`/`on`/`off`).
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Create an error response body
pub fn error_response(error: &str) -> Value {
    json!({
        "success": false,
        "error": error,
    })
}

/// Error type returned by handlers.
pub type ApiError = (StatusCode, Json<Value>);

impl From<ServerError> for ApiError {
    fn from(err: ServerError) -> Self {
        let status = match &err {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ServerError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(error_response(&err.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityStatus;
    use chrono::Utc;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("true"), Some(true));
        assert_eq!(parse_flag(" ON "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_campaign_summary_is_flat() {
        let now = Utc::now();
        let tree = CampaignSubtree {
            campaign: Campaign {
                id: "c1".into(),
                name: "Spring".into(),
                status: EntityStatus::Active,
                daily_budget: 10.0,
                final_url: String::new(),
                path1: String::new(),
                path2: String::new(),
                created_at: now,
                updated_at: now,
            },
            ad_groups: Vec::new(),
        };

        let json = serde_json::to_value(CampaignSummary::from(tree)).unwrap();
        assert_eq!(json["name"], "Spring");
        assert_eq!(json["dailyBudget"], 10.0);
        assert_eq!(json["adGroupCount"], 0);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let (status, body) = ApiError::from(ServerError::Store(StoreError::not_found("Import record", "x")));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.0["success"], false);
    }
}
