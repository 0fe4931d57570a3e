//! Duplicate detection for keywords and ads within one ad group.
//!
//! Keywords are identified by exact, case-sensitive text. Ads are identified
//! by their headline multiset: headlines sorted and encoded as a JSON array,
//! so `["A","B","C"]` and `["C","A","B"]` are the same ad while `["A|B"]`
//! and `["A","B"]` stay distinct.

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use super::folder::KeywordDraft;
use crate::models::{Ad, Keyword};

/// Canonical dedup key for a list of headlines.
pub fn ad_dedup_key(headlines: &[String]) -> String {
    let mut sorted: Vec<&str> = headlines.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    Value::from(sorted).to_string()
}

/// Draft keywords whose text is neither persisted nor repeated earlier in
/// the draft list. Existing keywords are never touched.
///
/// Only drafts that will actually be inserted should be passed in; a
/// rejected draft would otherwise shadow a later valid one.
pub fn new_keywords<'d, I>(existing: &[Keyword], drafts: I) -> Vec<&'d KeywordDraft>
where
    I: IntoIterator<Item = &'d KeywordDraft>,
{
    let mut seen: HashSet<&str> = existing.iter().map(|k| k.text.as_str()).collect();
    drafts
        .into_iter()
        .filter(|draft| seen.insert(draft.text.as_str()))
        .collect()
}

/// Outcome of matching an ad draft against an ad group.
#[derive(Debug, PartialEq)]
pub enum AdMatch {
    /// No ad with this headline set yet
    New { key: String },
    /// Same headline set as an existing ad
    Duplicate { ad_id: String },
}

/// Known ad keys of one ad group, persisted and inserted during this pass.
#[derive(Debug, Default)]
pub struct AdIndex {
    by_key: HashMap<String, Ad>,
}

impl AdIndex {
    pub fn new(existing: Vec<Ad>) -> Self {
        let by_key = existing
            .into_iter()
            .map(|ad| (ad_dedup_key(&ad.headlines), ad))
            .collect();
        Self { by_key }
    }

    pub fn classify(&self, headlines: &[String]) -> AdMatch {
        let key = ad_dedup_key(headlines);
        match self.by_key.get(&key) {
            Some(ad) => AdMatch::Duplicate { ad_id: ad.id.clone() },
            None => AdMatch::New { key },
        }
    }

    /// Record an ad inserted during the pass so later drafts collapse onto it.
    pub fn insert(&mut self, key: String, ad: Ad) {
        self.by_key.insert(key, ad);
    }

    pub fn get_mut(&mut self, ad_id: &str) -> Option<&mut Ad> {
        self.by_key.values_mut().find(|ad| ad.id == ad_id)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityStatus, MatchType};
    use chrono::Utc;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn ad(id: &str, headlines: &[&str]) -> Ad {
        let now = Utc::now();
        Ad {
            id: id.to_string(),
            ad_group_id: "g".to_string(),
            headlines: strings(headlines),
            descriptions: strings(&["d"]),
            final_url: String::new(),
            path1: String::new(),
            path2: String::new(),
            status: EntityStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    fn keyword_draft(text: &str) -> KeywordDraft {
        KeywordDraft {
            text: text.to_string(),
            match_type: MatchType::Broad,
            max_cpc: None,
            row: 1,
        }
    }

    #[test]
    fn test_dedup_key_is_order_insensitive() {
        let a = ad_dedup_key(&strings(&["A", "B", "C"]));
        let b = ad_dedup_key(&strings(&["C", "A", "B"]));
        assert_eq!(a, b);
        assert_eq!(a, r#"["A","B","C"]"#);
    }

    #[test]
    fn test_dedup_key_is_case_sensitive_multiset() {
        assert_ne!(ad_dedup_key(&strings(&["a", "B"])), ad_dedup_key(&strings(&["A", "B"])));
        assert_ne!(
            ad_dedup_key(&strings(&["A", "A", "B"])),
            ad_dedup_key(&strings(&["A", "B"]))
        );
    }

    #[test]
    fn test_dedup_key_separator_in_headline_does_not_collide() {
        assert_ne!(ad_dedup_key(&strings(&["A|B"])), ad_dedup_key(&strings(&["A", "B"])));
        assert_ne!(ad_dedup_key(&strings(&["A\",\"B"])), ad_dedup_key(&strings(&["A", "B"])));
    }

    #[test]
    fn test_new_keywords_skips_persisted_and_repeats() {
        let now = Utc::now();
        let existing = vec![Keyword {
            id: "k1".to_string(),
            ad_group_id: "g".to_string(),
            text: "running shoes".to_string(),
            match_type: MatchType::Exact,
            max_cpc: Some(2.0),
            created_at: now,
        }];
        let drafts = vec![
            keyword_draft("running shoes"),
            keyword_draft("Running Shoes"),
            keyword_draft("trail shoes"),
            keyword_draft("trail shoes"),
        ];

        let fresh: Vec<&str> = new_keywords(&existing, &drafts)
            .into_iter()
            .map(|k| k.text.as_str())
            .collect();
        assert_eq!(fresh, vec!["Running Shoes", "trail shoes"]);
    }

    #[test]
    fn test_ad_index_classifies_and_tracks_inserts() {
        let mut index = AdIndex::new(vec![ad("a1", &["A", "B"])]);

        assert_eq!(
            index.classify(&strings(&["B", "A"])),
            AdMatch::Duplicate { ad_id: "a1".to_string() }
        );

        let AdMatch::New { key } = index.classify(&strings(&["X"])) else {
            panic!("expected a new ad");
        };
        index.insert(key, ad("a2", &["X"]));

        assert_eq!(index.len(), 2);
        assert!(matches!(index.classify(&strings(&["X"])), AdMatch::Duplicate { .. }));
        assert!(index.get_mut("a2").is_some());
    }
}
