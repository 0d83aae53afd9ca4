use serde::Serialize;

use crate::normalization::text::DEFAULT_PRICE_BUCKET_WIDTH;
use crate::util::env::env_parse;

/// Tunable policy constants for a dedup pass.
///
/// The numbers were chosen by trial against the production catalog, not
/// derived; treat them as knobs. The one hard rule is that a dry-run and
/// its matching live run must share one config, otherwise the reported
/// plan no longer predicts the applied effect.
#[derive(Debug, Clone, Serialize)]
pub struct DedupConfig {
    /// Price bucket width used in fingerprints.
    pub price_bucket_width: f64,
    /// Ids per delete/update batch.
    pub batch_size: usize,
    /// Pause between batches, so a pass never hammers the store.
    pub batch_delay_ms: u64,
    /// Rows per page when materializing the candidate set.
    pub fetch_page_size: i64,
    /// How many duplicate groups to show in the plan report.
    pub sample_groups: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            price_bucket_width: DEFAULT_PRICE_BUCKET_WIDTH,
            batch_size: 100,
            batch_delay_ms: 250,
            fetch_page_size: 1000,
            sample_groups: 5,
        }
    }
}

impl DedupConfig {
    /// Defaults overlaid with DEDUP_* env overrides.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            price_bucket_width: env_parse("PRICE_BUCKET_WIDTH", d.price_bucket_width),
            batch_size: env_parse("DEDUP_BATCH_SIZE", d.batch_size),
            batch_delay_ms: env_parse("DEDUP_BATCH_DELAY_MS", d.batch_delay_ms),
            fetch_page_size: env_parse("DEDUP_PAGE_SIZE", d.fetch_page_size),
            sample_groups: env_parse("DEDUP_SAMPLE_GROUPS", d.sample_groups),
        }
    }
}
