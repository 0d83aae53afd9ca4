//! The dedup pass: snapshot -> plan -> (optionally) bounded batch deletes.
//!
//! The pass is single-threaded and batch-sequential: batches are disjoint
//! id sets applied strictly in order with a rate-limit delay between them.
//! A failed batch is logged, counted, and skipped; partial application is
//! an accepted outcome because re-running the pass against current data
//! reproduces an equivalent or smaller plan.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::dedup::{group_by_fingerprint, quality_score, resolve, DedupConfig, Fingerprinter};
use crate::product::ProductRecord;

use super::store::{fetch_all, ProductStore};

/// One member of a sampled duplicate group, as shown in plan reports.
#[derive(Debug, Clone, Serialize)]
pub struct SampleMember {
    pub id: String,
    pub title: String,
    pub brand: String,
    pub price: Option<f64>,
    pub affiliate_network: Option<String>,
    pub quality_score: u32,
    pub keeper: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleGroup {
    pub fingerprint: String,
    pub members: Vec<SampleMember>,
}

/// The full deletion plan for a snapshot, plus the report material the
/// dry-run mode prints.
#[derive(Debug, Clone, Serialize)]
pub struct DedupPlan {
    pub total_records: usize,
    pub unique: usize,
    pub duplicate_groups: usize,
    pub duplicate_records: usize,
    pub delete_ids: Vec<String>,
    pub samples: Vec<SampleGroup>,
    /// Would-be-deleted record counts by brand, descending.
    pub deleted_by_brand: Vec<(String, usize)>,
    /// Would-be-deleted record counts by affiliate network, descending.
    pub deleted_by_network: Vec<(String, usize)>,
}

/// Final accounting for a pass, produced in both modes.
#[derive(Debug, Clone, Serialize)]
pub struct DedupSummary {
    pub live: bool,
    pub total_before: i64,
    pub planned: usize,
    pub deleted: u64,
    pub failed_batches: usize,
    pub remaining: i64,
}

/// Compute the deletion plan for a batch of records. Pure; no I/O.
pub fn build_plan(records: &[ProductRecord], cfg: &DedupConfig) -> DedupPlan {
    let fingerprinter = Fingerprinter::new(cfg.price_bucket_width);
    let (groups, stats) = group_by_fingerprint(records, &fingerprinter);

    let mut delete_ids = Vec::with_capacity(stats.duplicate_records);
    let mut samples = Vec::new();
    let mut by_brand: HashMap<String, usize> = HashMap::new();
    let mut by_network: HashMap<String, usize> = HashMap::new();

    for (fingerprint, members) in &groups {
        let Some(resolution) = resolve(members) else {
            continue;
        };

        if samples.len() < cfg.sample_groups {
            samples.push(SampleGroup {
                fingerprint: fingerprint.clone(),
                members: members
                    .iter()
                    .map(|r| SampleMember {
                        id: r.id.clone(),
                        title: r.title.clone(),
                        brand: r.brand.clone(),
                        price: r.price,
                        affiliate_network: r.affiliate_network.clone(),
                        quality_score: quality_score(r),
                        keeper: r.id == resolution.keeper.id,
                    })
                    .collect(),
            });
        }

        for loser in resolution.losers {
            let brand = if loser.brand.trim().is_empty() {
                "Unknown".to_string()
            } else {
                loser.brand.clone()
            };
            *by_brand.entry(brand).or_default() += 1;
            let network = loser
                .affiliate_network
                .clone()
                .unwrap_or_else(|| "unknown".to_string());
            *by_network.entry(network).or_default() += 1;
            delete_ids.push(loser.id.clone());
        }
    }

    DedupPlan {
        total_records: stats.total_records,
        unique: stats.unique,
        duplicate_groups: stats.duplicate_groups,
        duplicate_records: stats.duplicate_records,
        delete_ids,
        samples,
        deleted_by_brand: sorted_counts(by_brand),
        deleted_by_network: sorted_counts(by_network),
    }
}

fn sorted_counts(map: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> = map.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyStats {
    pub deleted: u64,
    pub failed_batches: usize,
}

/// Apply a deletion-id plan in bounded, rate-limited batches.
///
/// Batches are issued strictly in order; each round-trip completes before
/// the next begins. A failed batch is skipped, not retried; the pass is
/// re-runnable and stragglers are picked up next time.
#[instrument(skip(store, ids, cfg), fields(planned = ids.len()))]
pub async fn apply_deletions(
    store: &dyn ProductStore,
    ids: &[String],
    cfg: &DedupConfig,
) -> ApplyStats {
    let mut stats = ApplyStats::default();
    let mut applied = 0usize;
    for (batch_index, batch) in ids.chunks(cfg.batch_size.max(1)).enumerate() {
        if batch_index > 0 && cfg.batch_delay_ms > 0 {
            sleep(Duration::from_millis(cfg.batch_delay_ms)).await;
        }
        match store.delete_by_ids(batch).await {
            Ok(n) => {
                stats.deleted += n;
                applied += batch.len();
                info!(applied, planned = ids.len(), "deleted batch");
            }
            Err(e) => {
                stats.failed_batches += 1;
                error!(batch = batch_index, error = %e, "batch delete failed; continuing");
            }
        }
    }
    stats
}

/// Run a full dedup pass. `live = false` computes and reports the plan with
/// zero side effects; `live = true` additionally applies it.
#[instrument(skip(store, cfg))]
pub async fn run_pass(
    store: &dyn ProductStore,
    cfg: &DedupConfig,
    live: bool,
) -> Result<(DedupPlan, DedupSummary)> {
    let total_before = store.count_all().await?;
    let records = fetch_all(store, cfg.fetch_page_size).await?;
    info!(total = records.len(), "catalog snapshot materialized");

    let plan = build_plan(&records, cfg);
    info!(
        unique = plan.unique,
        duplicate_groups = plan.duplicate_groups,
        duplicate_records = plan.duplicate_records,
        planned = plan.delete_ids.len(),
        "deduplication analysis complete"
    );

    let mut summary = DedupSummary {
        live,
        total_before,
        planned: plan.delete_ids.len(),
        deleted: 0,
        failed_batches: 0,
        remaining: total_before,
    };

    if !live {
        info!("dry run; no changes made");
        return Ok((plan, summary));
    }

    let applied = apply_deletions(store, &plan.delete_ids, cfg).await;
    summary.deleted = applied.deleted;
    summary.failed_batches = applied.failed_batches;

    // Post-condition check. A mismatch is a warning, not an error: some
    // deletes may have no-op'd on rows a concurrent process already removed,
    // and committed batches cannot be unwound anyway.
    summary.remaining = store.count_all().await?;
    let expected = total_before - summary.deleted as i64;
    if summary.remaining != expected {
        warn!(
            remaining = summary.remaining,
            expected, "post-delete count does not match expectation"
        );
    }

    Ok((plan, summary))
}
