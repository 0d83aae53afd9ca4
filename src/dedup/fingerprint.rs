//! Content-addressed keys for product records.
//!
//! Two distinct relations live here and must not be conflated:
//!
//! * the **fingerprint** is a fuzzy, lossy grouping key: equal
//!   fingerprints mean "duplicate candidates", and distinct products can
//!   collide (the precision/recall tradeoff deliberately favors not
//!   deleting distinct products);
//! * the **content hash** is an exact SHA-256 digest over the descriptive
//!   fields, used only for idempotent change detection between re-sync
//!   passes. Same hash means byte-for-byte equal hashed fields.

use sha2::{Digest, Sha256};

use crate::normalization::text::{
    extract_core_title, normalize_price_bucket_with, normalize_text, DEFAULT_PRICE_BUCKET_WIDTH,
};
use crate::product::ProductRecord;

/// Builds grouping fingerprints at a fixed price-bucket width.
#[derive(Debug, Clone, Copy)]
pub struct Fingerprinter {
    bucket_width: f64,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_BUCKET_WIDTH)
    }
}

impl Fingerprinter {
    pub fn new(bucket_width: f64) -> Self {
        Self { bucket_width }
    }

    /// `coreTitle|normalizedBrand|priceBucket`. Pure, no I/O.
    pub fn fingerprint(&self, record: &ProductRecord) -> String {
        let core_title = extract_core_title(&record.title);
        let brand = normalize_text(&record.brand);
        let bucket = normalize_price_bucket_with(record.effective_price(), self.bucket_width);
        format!("{core_title}|{brand}|{bucket}")
    }
}

/// SHA-256 hex over the lowercased `title|brand|price|description`
/// concatenation, empty/absent fields omitted. `id` and `created_at`
/// never participate, so a re-synced copy of the same listing hashes
/// identically.
pub fn content_hash(record: &ProductRecord) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(4);
    push_non_empty(&mut parts, &record.title);
    push_non_empty(&mut parts, &record.brand);
    if let Some(price) = record.effective_price() {
        parts.push(price.to_string());
    }
    if let Some(desc) = record.description.as_deref() {
        push_non_empty(&mut parts, desc);
    }
    sha256_hex(&parts.join("|"))
}

fn push_non_empty(parts: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        parts.push(trimmed.to_lowercase());
    }
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
