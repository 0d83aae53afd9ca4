//! Idempotent content-hash backfill.
//!
//! Re-sync workflows diff incoming feed rows against the stored
//! `content_hash` to skip unchanged listings. Rows ingested before the
//! column existed (or whose writes failed) have no hash; this job computes
//! and stores them in the same bounded, rate-limited batch style as the
//! dedup mutator. Re-running it only touches rows that still lack a hash.

use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{error, info, instrument};

use crate::dedup::{content_hash, DedupConfig};

use super::store::{fetch_all_missing_hash, ProductStore};

#[derive(Debug, Clone, Serialize)]
pub struct BackfillSummary {
    pub live: bool,
    /// Rows still missing a hash when the job started.
    pub scanned: usize,
    pub planned: usize,
    pub updated: u64,
    pub failed_batches: usize,
}

/// Backfill hashes for up to `limit` rows (None = all missing rows).
#[instrument(skip(store, cfg))]
pub async fn run_backfill(
    store: &dyn ProductStore,
    cfg: &DedupConfig,
    live: bool,
    limit: Option<usize>,
) -> Result<BackfillSummary> {
    let mut missing = fetch_all_missing_hash(store, cfg.fetch_page_size).await?;
    let scanned = missing.len();
    if let Some(limit) = limit {
        missing.truncate(limit);
    }
    info!(scanned, planned = missing.len(), "missing content hashes");

    let pairs: Vec<(String, String)> = missing
        .iter()
        .map(|r| (r.id.clone(), content_hash(r)))
        .collect();

    let mut summary = BackfillSummary {
        live,
        scanned,
        planned: pairs.len(),
        updated: 0,
        failed_batches: 0,
    };

    if !live {
        info!("dry run; no changes made");
        return Ok(summary);
    }

    let mut applied = 0usize;
    for (batch_index, batch) in pairs.chunks(cfg.batch_size.max(1)).enumerate() {
        if batch_index > 0 && cfg.batch_delay_ms > 0 {
            sleep(Duration::from_millis(cfg.batch_delay_ms)).await;
        }
        match store.update_content_hashes(batch).await {
            Ok(n) => {
                summary.updated += n;
                applied += batch.len();
                info!(applied, planned = pairs.len(), "updated batch");
            }
            Err(e) => {
                summary.failed_batches += 1;
                error!(batch = batch_index, error = %e, "batch update failed; continuing");
            }
        }
    }

    Ok(summary)
}
