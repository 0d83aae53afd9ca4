//! Heuristic field-completeness score used to rank duplicates.
//!
//! This measures how *complete* a listing is, not how accurate: a long
//! title scores the same whether or not it describes the product well.
//! Absent or malformed fields simply contribute 0 for their term, so
//! scoring never fails.

use crate::product::ProductRecord;

const LONG_TITLE_CHARS: usize = 50;
const MEDIUM_TITLE_CHARS: usize = 30;
const LONG_DESCRIPTION_CHARS: usize = 100;
const MEDIUM_DESCRIPTION_CHARS: usize = 50;
const UNKNOWN_BRAND_SENTINEL: &str = "Unknown";

/// Maximum attainable score (all bonuses at their top tier).
pub const MAX_QUALITY_SCORE: u32 = 10;

/// Sum of independent per-field completeness bonuses, 0..=10.
pub fn quality_score(record: &ProductRecord) -> u32 {
    let mut score = 0;

    let title_len = record.title.chars().count();
    if title_len > LONG_TITLE_CHARS {
        score += 2;
    } else if title_len > MEDIUM_TITLE_CHARS {
        score += 1;
    }

    let desc_len = record
        .description
        .as_deref()
        .map(|d| d.chars().count())
        .unwrap_or(0);
    if desc_len > LONG_DESCRIPTION_CHARS {
        score += 3;
    } else if desc_len > MEDIUM_DESCRIPTION_CHARS {
        score += 2;
    } else if desc_len > 0 {
        score += 1;
    }

    if record.effective_price().is_some() {
        score += 2;
    }

    let brand = record.brand.trim();
    if !brand.is_empty() && brand != UNKNOWN_BRAND_SENTINEL {
        score += 2;
    }

    if record
        .image_url
        .as_deref()
        .map(|u| !u.trim().is_empty())
        .unwrap_or(false)
    {
        score += 1;
    }

    score
}
