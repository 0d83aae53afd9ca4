//! Pure text and price transforms feeding the product fingerprint.
//!
//! These are deliberately cheap and deterministic: lowercase folding, a
//! denylist of noise tokens, and fixed-width price buckets. No stemming, no
//! similarity scoring. The denylist will under-strip novel noise words and
//! over-strip legitimate tokens that collide with it; extend the token
//! tables below rather than the matching logic.

use std::sync::LazyLock;

use regex::Regex;

/// Default width of a price bucket. Wider buckets group more aggressively
/// (more false duplicates), narrower buckets miss price-jittered copies.
pub const DEFAULT_PRICE_BUCKET_WIDTH: f64 = 5.0;

/// Sentinel bucket for absent, zero, or negative prices.
pub const NO_PRICE_BUCKET: &str = "no-price";

// Noise-token tables, versioned as data so they can grow without touching
// the matching code. Entries are regex fragments matched between \b anchors
// against a lowercased title.
const GENDER_TOKENS: &[&str] = &["for women", "women's", "womens", "ladies", "female"];
const FILLER_TOKENS: &[&str] = &["clothes", "clothing", "apparel", "wear"];
const SIZE_TOKENS: &[&str] = &["size", "sz", "small", "medium", "large", "xl+", "[0-9]+"];
const COLOR_TOKENS: &[&str] = &[
    "black", "white", "gray", "grey", "blue", "red", "green", "pink", "purple", "navy", "beige",
];

fn denylist(tokens: &[&str]) -> Regex {
    Regex::new(&format!(r"\b(?:{})\b", tokens.join("|"))).expect("valid denylist pattern")
}

static GENDER_RE: LazyLock<Regex> = LazyLock::new(|| denylist(GENDER_TOKENS));
static FILLER_RE: LazyLock<Regex> = LazyLock::new(|| denylist(FILLER_TOKENS));
static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| denylist(SIZE_TOKENS));
static COLOR_RE: LazyLock<Regex> = LazyLock::new(|| denylist(COLOR_TOKENS));

/// Lowercase, replace anything that is not a word character or whitespace
/// with a space, collapse whitespace runs, trim. Idempotent.
pub fn normalize_text(input: &str) -> String {
    let lowered = input.to_lowercase();
    let spaced: String = lowered
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    collapse_whitespace(&spaced)
}

/// Bucket a price to the nearest multiple of `width`, rendered as `$<n>`.
/// Absent, zero, and negative prices all map to the `no-price` sentinel so
/// feeds that disagree about "missing" still land in the same bucket.
pub fn normalize_price_bucket_with(price: Option<f64>, width: f64) -> String {
    match price {
        Some(p) if p > 0.0 => {
            let bucket = (p / width).round() * width;
            format!("${}", bucket as i64)
        }
        _ => NO_PRICE_BUCKET.to_string(),
    }
}

/// `normalize_price_bucket_with` at the default width.
pub fn normalize_price_bucket(price: Option<f64>) -> String {
    normalize_price_bucket_with(price, DEFAULT_PRICE_BUCKET_WIDTH)
}

/// Strip gender markers, generic apparel nouns, size tokens, and common
/// color names from a title, leaving the identity-bearing core.
///
/// Note this operates on the raw lowercased title (punctuation intact);
/// only whitespace is collapsed afterwards. That matches how the stored
/// fingerprints were originally generated, and changing it would silently
/// re-key the whole catalog.
pub fn extract_core_title(title: &str) -> String {
    let mut core = title.to_lowercase();
    for re in [&*GENDER_RE, &*FILLER_RE, &*SIZE_RE, &*COLOR_RE] {
        core = re.replace_all(&core, " ").into_owned();
    }
    collapse_whitespace(&core)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_punctuation_and_collapses() {
        assert_eq!(
            normalize_text("  Acme & Co. -- \"Premium\"  Brand!  "),
            "acme co premium brand"
        );
    }

    #[test]
    fn normalize_text_is_idempotent() {
        for raw in [
            "Women's Élan Dress, Size M!",
            "  multiple   spaces\tand\ttabs ",
            "",
            "already normalized text",
            "$19.99 (was $29.99)",
        ] {
            let once = normalize_text(raw);
            assert_eq!(normalize_text(&once), once, "input {raw:?}");
        }
    }

    #[test]
    fn price_buckets_round_to_nearest_multiple() {
        assert_eq!(normalize_price_bucket(Some(41.0)), "$40");
        assert_eq!(normalize_price_bucket(Some(42.0)), "$40");
        assert_eq!(normalize_price_bucket(Some(43.0)), "$45");
        assert_eq!(normalize_price_bucket(Some(44.0)), "$45");
        assert_eq!(normalize_price_bucket(Some(21.59)), "$20");
        assert_eq!(normalize_price_bucket(Some(2.49)), "$0");
    }

    #[test]
    fn missing_zero_and_negative_prices_share_a_sentinel() {
        assert_eq!(normalize_price_bucket(None), NO_PRICE_BUCKET);
        assert_eq!(normalize_price_bucket(Some(0.0)), NO_PRICE_BUCKET);
        assert_eq!(normalize_price_bucket(Some(-4.0)), NO_PRICE_BUCKET);
    }

    #[test]
    fn custom_bucket_width_is_respected() {
        assert_eq!(normalize_price_bucket_with(Some(98.0), 100.0), "$100");
        assert_eq!(normalize_price_bucket_with(Some(149.0), 100.0), "$100");
    }

    #[test]
    fn core_title_strips_gender_size_and_color_noise() {
        assert_eq!(
            extract_core_title("Women's Black Dress Size M"),
            "dress m" // "m" is not in the size table; only bare numbers and named sizes are
        );
        assert_eq!(
            extract_core_title("black dress size large"),
            "dress"
        );
        assert_eq!(
            extract_core_title("Floral Maxi Dress For Women Size 12 Navy"),
            "floral maxi dress"
        );
    }

    #[test]
    fn core_title_keeps_identity_tokens() {
        assert_eq!(
            extract_core_title("Acme Runner 3000 Trail Shoe"),
            "acme runner trail shoe" // the bare number is size-like noise, the rest stays
        );
        assert_eq!(extract_core_title("Leather Tote Bag"), "leather tote bag");
    }

    #[test]
    fn core_title_of_pure_noise_is_empty() {
        assert_eq!(extract_core_title("Women's Clothing Size XL Black"), "");
    }
}
