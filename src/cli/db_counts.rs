use anyhow::Result;
use serde_json::json;

use crate::database_ops::db::PgProductStore;
use crate::database_ops::store::ProductStore;
use crate::util::env as env_util;

#[derive(Debug, Clone, Default)]
pub struct DbCountsConfig {
    /// Optional override for the Postgres connection string.
    pub database_url: Option<String>,
    /// How many rows to show per breakdown (defaults to env DB_COUNTS_TOP or 10).
    pub top: Option<i64>,
    /// Emit machine-readable JSON instead of the text report.
    pub json: bool,
}

pub async fn run(cfg: DbCountsConfig) -> Result<()> {
    env_util::init_env();
    let db_url = match cfg.database_url.clone() {
        Some(url) => url,
        None => env_util::db_url()?,
    };
    let top = cfg
        .top
        .unwrap_or_else(|| env_util::env_parse("DB_COUNTS_TOP", 10));

    let store = PgProductStore::connect(&db_url, 5).await?;
    let total = store.count_all().await?;
    let missing_hash = store.count_missing_hash().await?;
    let brands = store.brand_counts(top).await?;
    let networks = store.network_counts(top).await?;

    if cfg.json {
        let payload = json!({
            "total_products": total,
            "missing_content_hash": missing_hash,
            "by_brand": brands.iter().map(|(k, n)| json!({"brand": k, "count": n})).collect::<Vec<_>>(),
            "by_network": networks.iter().map(|(k, n)| json!({"network": k, "count": n})).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let mut out = String::new();
    out.push_str(&format!("products:              {total}\n"));
    out.push_str(&format!("missing content_hash:  {missing_hash}\n"));
    out.push_str(&format!("\ntop {top} brands:\n"));
    for (brand, n) in &brands {
        out.push_str(&format!("  {n:>8}  {brand}\n"));
    }
    out.push_str(&format!("\ntop {top} affiliate networks:\n"));
    for (network, n) in &networks {
        out.push_str(&format!("  {n:>8}  {network}\n"));
    }
    print!("{out}");
    Ok(())
}
