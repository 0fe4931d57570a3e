//! Transaction coordinator: one atomic unit per import pass.
//!
//! Every write of a pass goes through the repository handed to the closure.
//! An `Err` anywhere inside rolls back the whole pass, including entities
//! written for earlier campaigns.

use crate::api::logs::{log_error, log_info, log_success};
use crate::error::PipelineResult;
use crate::store::{Repository, Store};

/// Run `pass` inside a single store transaction labelled `label` in logs.
pub fn run_atomic<T, F>(store: &mut Store, label: &str, pass: F) -> PipelineResult<T>
where
    F: FnOnce(&Repository<'_>) -> PipelineResult<T>,
{
    log_info(format!("🔒 Transaction opened for {}", label));

    match store.in_transaction(pass) {
        Ok(value) => {
            log_success(format!("Transaction committed for {}", label));
            Ok(value)
        }
        Err(e) => {
            log_error(format!("Transaction rolled back for {}: {}", label, e));
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImportError;
    use crate::models::{Campaign, EntityStatus};
    use crate::store::new_id;
    use chrono::Utc;

    fn campaign(name: &str) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: new_id(),
            name: name.to_string(),
            status: EntityStatus::Active,
            daily_budget: 5.0,
            final_url: String::new(),
            path1: String::new(),
            path2: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_structural_error_rolls_back_earlier_writes() {
        let mut store = Store::open_in_memory().unwrap();

        let result: PipelineResult<()> = run_atomic(&mut store, "test.csv", |repo| {
            repo.insert_campaign(&campaign("One"))?;
            repo.insert_campaign(&campaign("Two"))?;
            Err(ImportError::EmptyInput)
        });

        assert!(matches!(result, Err(ImportError::EmptyInput)));
        assert!(store.repository().list_campaigns().unwrap().is_empty());
    }

    #[test]
    fn test_store_error_converts_and_rolls_back() {
        let mut store = Store::open_in_memory().unwrap();

        let result: PipelineResult<()> = run_atomic(&mut store, "test.csv", |repo| {
            repo.insert_campaign(&campaign("One"))?;
            // Unique name violation
            repo.insert_campaign(&campaign("One"))?;
            Ok(())
        });

        assert!(matches!(result, Err(ImportError::Store(_))));
        assert!(store.repository().list_campaigns().unwrap().is_empty());
    }

    #[test]
    fn test_commit_returns_value() {
        let mut store = Store::open_in_memory().unwrap();

        let count = run_atomic(&mut store, "test.csv", |repo| {
            repo.insert_campaign(&campaign("One"))?;
            Ok(repo.list_campaigns()?.len())
        })
        .unwrap();

        assert_eq!(count, 1);
        assert_eq!(store.repository().list_campaigns().unwrap().len(), 1);
    }
}
