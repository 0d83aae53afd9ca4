use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalog row as fetched from the `products` table.
///
/// Upstream feeds are untrusted: every field except `id`, `title` and
/// `created_at` may be absent, empty, or the "Unknown" sentinel. `title`
/// itself can arrive empty from a broken feed; normalization treats that as
/// an empty core rather than failing the pass.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub brand: String,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Which affiliate network the record was ingested from (CJ, Impact, ...).
    /// Reporting only; never participates in fingerprinting or scoring.
    pub affiliate_network: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProductRecord {
    /// Price if present and strictly positive; zero/negative is the
    /// "no price" state upstream feeds use interchangeably with NULL.
    pub fn effective_price(&self) -> Option<f64> {
        self.price.filter(|p| *p > 0.0)
    }
}
