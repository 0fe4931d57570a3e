//! Point-in-time captures of one campaign subtree.
//!
//! Snapshots are append-only: the store rejects UPDATE and DELETE on the
//! snapshot table, and nothing here offers either.

use chrono::Utc;

use crate::error::{StoreError, StoreResult};
use crate::models::{Snapshot, SnapshotType};
use crate::store::{new_id, Repository};

/// Capture `campaign_id` with its ad groups, keywords and ads.
///
/// Reads nothing outside that campaign's subtree. Fails with
/// [`StoreError::NotFound`] when the campaign does not exist.
pub fn take_snapshot(
    repo: &Repository<'_>,
    campaign_id: &str,
    snapshot_type: SnapshotType,
    description: &str,
) -> StoreResult<Snapshot> {
    let data = repo
        .load_subtree(campaign_id)?
        .ok_or_else(|| StoreError::not_found("Campaign", campaign_id))?;

    let snapshot = Snapshot {
        id: new_id(),
        campaign_id: campaign_id.to_string(),
        snapshot_type,
        description: description.to_string(),
        data,
        created_at: Utc::now(),
    };
    repo.insert_snapshot(&snapshot)?;

    Ok(snapshot)
}

/// Snapshots of one campaign, oldest first.
pub fn list_snapshots(repo: &Repository<'_>, campaign_id: &str) -> StoreResult<Vec<Snapshot>> {
    repo.list_snapshots(campaign_id)
}

pub fn get_snapshot(repo: &Repository<'_>, snapshot_id: &str) -> StoreResult<Snapshot> {
    repo.get_snapshot(snapshot_id)?
        .ok_or_else(|| StoreError::not_found("Snapshot", snapshot_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdGroup, Campaign, EntityStatus};
    use crate::store::Store;

    fn seed(store: &Store) -> (String, String) {
        let repo = store.repository();
        let now = Utc::now();
        let campaign = Campaign {
            id: new_id(),
            name: "Spring".to_string(),
            status: EntityStatus::Active,
            daily_budget: 10.0,
            final_url: String::new(),
            path1: String::new(),
            path2: String::new(),
            created_at: now,
            updated_at: now,
        };
        repo.insert_campaign(&campaign).unwrap();

        let other = Campaign {
            id: new_id(),
            name: "Other".to_string(),
            ..campaign.clone()
        };
        repo.insert_campaign(&other).unwrap();

        repo.insert_ad_group(&AdGroup {
            id: new_id(),
            campaign_id: campaign.id.clone(),
            name: "Shoes".to_string(),
            status: EntityStatus::Active,
            max_cpc: 1.0,
            created_at: now,
            updated_at: now,
        })
        .unwrap();

        (campaign.id, other.id)
    }

    #[test]
    fn test_snapshot_captures_only_its_subtree() {
        let store = Store::open_in_memory().unwrap();
        let (spring, other) = seed(&store);
        let repo = store.repository();

        let snapshot = take_snapshot(&repo, &spring, SnapshotType::Manual, "checkpoint").unwrap();

        assert_eq!(snapshot.data.campaign.name, "Spring");
        assert_eq!(snapshot.data.ad_groups.len(), 1);
        assert_eq!(list_snapshots(&repo, &spring).unwrap().len(), 1);
        assert!(list_snapshots(&repo, &other).unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_is_frozen() {
        let store = Store::open_in_memory().unwrap();
        let (spring, _) = seed(&store);
        let repo = store.repository();

        let snapshot = take_snapshot(&repo, &spring, SnapshotType::PreImport, "before").unwrap();
        store
            .connection()
            .execute("UPDATE campaigns SET daily_budget = 99", [])
            .unwrap();

        let stored = get_snapshot(&repo, &snapshot.id).unwrap();
        assert_eq!(stored.data.campaign.daily_budget, 10.0);
        assert_eq!(stored.snapshot_type, SnapshotType::PreImport);
    }

    #[test]
    fn test_snapshot_of_missing_campaign_fails() {
        let store = Store::open_in_memory().unwrap();
        let repo = store.repository();

        let err = take_snapshot(&repo, "nope", SnapshotType::Manual, "x").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "Campaign", .. }));
        assert!(matches!(get_snapshot(&repo, "nope"), Err(StoreError::NotFound { .. })));
    }
}
