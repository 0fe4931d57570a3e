//! Reconciliation engine: decide create / update / skip per draft.
//!
//! Walks the folded draft tree in insertion order against the persisted
//! store. Campaigns are matched by exact name, ad groups by (campaign id,
//! name). With `update_existing` off, an existing campaign skips its whole
//! subtree and an existing ad group skips its keywords and ads.
//!
//! Entity-level validation problems are recorded and the entity skipped.
//! Store failures are returned as `Err` and abort the pass.

use chrono::{DateTime, Utc};

use super::dedup::{new_keywords, AdIndex, AdMatch};
use super::folder::{AdDraft, AdGroupDraft, CampaignDraft};
use super::result::ImportReport;
use super::snapshot::take_snapshot;
use super::ImportOptions;
use crate::api::logs::{log_info_indent, log_warning};
use crate::error::PipelineResult;
use crate::models::{Ad, AdGroup, Campaign, ImportIssue, Keyword, SnapshotType};
use crate::store::{new_id, Repository};

/// Reconcile every campaign draft through `repo`.
pub fn reconcile(
    repo: &Repository<'_>,
    campaigns: &[CampaignDraft],
    options: &ImportOptions,
    report: &mut ImportReport,
) -> PipelineResult<()> {
    let mut engine = Reconciler {
        repo,
        options,
        report,
        now: Utc::now(),
    };

    for draft in campaigns {
        engine.campaign(draft)?;
    }

    Ok(())
}

struct Reconciler<'r, 'c> {
    repo: &'r Repository<'c>,
    options: &'r ImportOptions,
    report: &'r mut ImportReport,
    now: DateTime<Utc>,
}

impl<'r, 'c> Reconciler<'r, 'c> {
    fn campaign(&mut self, draft: &CampaignDraft) -> PipelineResult<()> {
        let existing = self.repo.find_campaign_by_name(&draft.name)?;
        if existing.is_some() && !self.options.update_existing {
            self.report.stats.campaigns_skipped += 1;
            log_info_indent(format!("Campaign '{}' exists, skipped", draft.name), 1);
            return Ok(());
        }

        if let Some(budget) = draft.daily_budget.filter(|b| *b < 0.0) {
            self.report.error(ImportIssue::at_row(
                draft.row,
                format!("Campaign '{}' has negative daily budget {}", draft.name, budget),
            ));
            return Ok(());
        }

        let campaign = match existing {
            Some(mut existing) => {
                apply_campaign_draft(&mut existing, draft, self.now);
                self.repo.update_campaign(&existing)?;
                self.report.stats.campaigns_updated += 1;
                log_info_indent(format!("Campaign '{}' updated", draft.name), 1);
                existing
            }
            None => {
                let campaign = self.new_campaign(draft);
                self.repo.insert_campaign(&campaign)?;
                self.report.stats.campaigns_created += 1;
                log_info_indent(format!("Campaign '{}' created", draft.name), 1);
                campaign
            }
        };

        if self.options.create_snapshot {
            let description = format!("Before import into campaign '{}'", campaign.name);
            if let Err(e) = take_snapshot(self.repo, &campaign.id, SnapshotType::PreImport, &description) {
                log_warning(format!("Snapshot failed for '{}': {}", campaign.name, e));
                self.report.warning(ImportIssue::at_row(
                    draft.row,
                    format!("Snapshot failed for campaign '{}': {}", campaign.name, e),
                ));
            }
        }

        for group in &draft.ad_groups {
            self.ad_group(&campaign, group)?;
        }

        Ok(())
    }

    fn ad_group(&mut self, campaign: &Campaign, draft: &AdGroupDraft) -> PipelineResult<()> {
        let existing = self.repo.find_ad_group(&campaign.id, &draft.name)?;
        if existing.is_some() && !self.options.update_existing {
            self.report.stats.ad_groups_skipped += 1;
            log_info_indent(format!("Ad group '{}' exists, skipped", draft.name), 2);
            return Ok(());
        }

        if let Some(bid) = draft.max_cpc.filter(|b| *b < 0.0) {
            self.report.error(ImportIssue::at_row(
                draft.row,
                format!("Ad group '{}' has negative max CPC {}", draft.name, bid),
            ));
            return Ok(());
        }

        let ad_group = match existing {
            Some(mut existing) => {
                if let Some(status) = draft.status {
                    existing.status = status;
                }
                if let Some(max_cpc) = draft.max_cpc {
                    existing.max_cpc = max_cpc;
                }
                existing.updated_at = self.now;
                self.repo.update_ad_group(&existing)?;
                self.report.stats.ad_groups_updated += 1;
                existing
            }
            None => {
                let defaults = &self.options.defaults;
                let ad_group = AdGroup {
                    id: new_id(),
                    campaign_id: campaign.id.clone(),
                    name: draft.name.clone(),
                    status: draft.status.unwrap_or(defaults.ad_group_status),
                    max_cpc: draft.max_cpc.unwrap_or(defaults.max_cpc),
                    created_at: self.now,
                    updated_at: self.now,
                };
                self.repo.insert_ad_group(&ad_group)?;
                self.report.stats.ad_groups_created += 1;
                ad_group
            }
        };

        self.merge_keywords(&ad_group, draft)?;
        self.merge_ads(&ad_group, &draft.ads)?;
        log_info_indent(
            format!(
                "Ad group '{}': {} keyword draft(s), {} ad draft(s)",
                ad_group.name,
                draft.keywords.len(),
                draft.ads.len()
            ),
            2,
        );

        Ok(())
    }

    fn merge_keywords(&mut self, ad_group: &AdGroup, draft: &AdGroupDraft) -> PipelineResult<()> {
        let existing = self.repo.list_keywords(&ad_group.id)?;

        let mut valid = Vec::with_capacity(draft.keywords.len());
        for kw in &draft.keywords {
            match kw.max_cpc.filter(|b| *b < 0.0) {
                Some(bid) => self.report.error(ImportIssue::at_row(
                    kw.row,
                    format!("Keyword '{}' has negative bid {}", kw.text, bid),
                )),
                None => valid.push(kw),
            }
        }

        for kw in new_keywords(&existing, valid) {
            self.repo.insert_keyword(&Keyword {
                id: new_id(),
                ad_group_id: ad_group.id.clone(),
                text: kw.text.clone(),
                match_type: kw.match_type,
                max_cpc: kw.max_cpc,
                created_at: self.now,
            })?;
            self.report.stats.keywords_created += 1;
        }

        Ok(())
    }

    fn merge_ads(&mut self, ad_group: &AdGroup, drafts: &[AdDraft]) -> PipelineResult<()> {
        let defaults = &self.options.defaults;
        let mut index = AdIndex::new(self.repo.list_ads(&ad_group.id)?);

        for draft in drafts {
            match index.classify(&draft.headlines) {
                AdMatch::New { key } => {
                    let ad = Ad {
                        id: new_id(),
                        ad_group_id: ad_group.id.clone(),
                        headlines: draft.headlines.clone(),
                        descriptions: draft.descriptions.clone(),
                        final_url: draft.final_url.clone().unwrap_or_else(|| defaults.final_url.clone()),
                        path1: draft.path1.clone().unwrap_or_else(|| defaults.path1.clone()),
                        path2: draft.path2.clone().unwrap_or_else(|| defaults.path2.clone()),
                        status: draft.status.unwrap_or(defaults.ad_status),
                        created_at: self.now,
                        updated_at: self.now,
                    };
                    self.repo.insert_ad(&ad, &key)?;
                    self.report.stats.ads_created += 1;
                    index.insert(key, ad);
                }
                AdMatch::Duplicate { .. } if !self.options.update_existing => {}
                AdMatch::Duplicate { ad_id } => {
                    if let Some(existing) = index.get_mut(&ad_id) {
                        apply_ad_draft(existing, draft, self.now);
                        self.repo.update_ad(existing)?;
                        self.report.stats.ads_updated += 1;
                    }
                }
            }
        }

        Ok(())
    }

    fn new_campaign(&self, draft: &CampaignDraft) -> Campaign {
        let defaults = &self.options.defaults;
        Campaign {
            id: new_id(),
            name: draft.name.clone(),
            status: draft.status.unwrap_or(defaults.campaign_status),
            daily_budget: draft.daily_budget.unwrap_or(defaults.daily_budget),
            final_url: draft.final_url.clone().unwrap_or_else(|| defaults.final_url.clone()),
            path1: draft.path1.clone().unwrap_or_else(|| defaults.path1.clone()),
            path2: draft.path2.clone().unwrap_or_else(|| defaults.path2.clone()),
            created_at: self.now,
            updated_at: self.now,
        }
    }
}

/// Overwrite only the attributes the draft captured.
fn apply_campaign_draft(campaign: &mut Campaign, draft: &CampaignDraft, now: DateTime<Utc>) {
    if let Some(status) = draft.status {
        campaign.status = status;
    }
    if let Some(budget) = draft.daily_budget {
        campaign.daily_budget = budget;
    }
    if let Some(url) = &draft.final_url {
        campaign.final_url = url.clone();
    }
    if let Some(path) = &draft.path1 {
        campaign.path1 = path.clone();
    }
    if let Some(path) = &draft.path2 {
        campaign.path2 = path.clone();
    }
    campaign.updated_at = now;
}

fn apply_ad_draft(ad: &mut Ad, draft: &AdDraft, now: DateTime<Utc>) {
    ad.descriptions = draft.descriptions.clone();
    if let Some(url) = &draft.final_url {
        ad.final_url = url.clone();
    }
    if let Some(path) = &draft.path1 {
        ad.path1 = path.clone();
    }
    if let Some(path) = &draft.path2 {
        ad.path2 = path.clone();
    }
    if let Some(status) = draft.status {
        ad.status = status;
    }
    ad.updated_at = now;
}
