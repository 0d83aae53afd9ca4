use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool, Row,
};
use tracing::{info, instrument};

use crate::product::ProductRecord;

use super::store::ProductStore;

const PRODUCT_COLUMNS: &str = "id::text AS id, title, COALESCE(brand, '') AS brand, \
     price::float8 AS price, description, image_url, affiliate_network, created_at";

/// Postgres-backed product store.
#[derive(Clone)]
pub struct PgProductStore {
    pub pool: PgPool,
}

impl PgProductStore {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let mut connect_options = PgConnectOptions::from_str(database_url)?
            // PgBouncer txn mode safe
            .statement_cache_capacity(0);

        // Ensure TLS is enabled when the DSN demands it; sqlx usually infers
        // this from the DSN but being explicit avoids surprises.
        if database_url.contains("sslmode=require") && !database_url.contains("sslmode=disable") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await?;
        info!("connected to db");
        Ok(Self { pool })
    }

    /// Top-N record counts grouped by brand ('' folded into Unknown).
    pub async fn brand_counts(&self, top: i64) -> Result<Vec<(String, i64)>> {
        self.grouped_counts("COALESCE(NULLIF(TRIM(brand), ''), 'Unknown')", top)
            .await
    }

    /// Top-N record counts grouped by affiliate network.
    pub async fn network_counts(&self, top: i64) -> Result<Vec<(String, i64)>> {
        self.grouped_counts(
            "COALESCE(NULLIF(TRIM(affiliate_network), ''), 'unknown')",
            top,
        )
        .await
    }

    async fn grouped_counts(&self, key_expr: &str, top: i64) -> Result<Vec<(String, i64)>> {
        let sql = format!(
            "SELECT {key_expr} AS k, COUNT(*) AS n FROM products GROUP BY 1 ORDER BY 2 DESC, 1 LIMIT $1"
        );
        let rows = sqlx::query(&sql)
            .persistent(false)
            .bind(top)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.get::<String, _>("k"), row.get::<i64, _>("n")))
            .collect())
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn fetch_page(&self, offset: i64, limit: i64) -> Result<Vec<ProductRecord>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at, id OFFSET $1 LIMIT $2"
        );
        let records = sqlx::query_as::<_, ProductRecord>(&sql)
            .persistent(false)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn fetch_missing_hash_page(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ProductRecord>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE content_hash IS NULL OR content_hash = '' \
             ORDER BY created_at, id OFFSET $1 LIMIT $2"
        );
        let records = sqlx::query_as::<_, ProductRecord>(&sql)
            .persistent(false)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn delete_by_ids(&self, ids: &[String]) -> Result<u64> {
        let result = sqlx::query("DELETE FROM products WHERE id::text = ANY($1)")
            .persistent(false)
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn update_content_hashes(&self, pairs: &[(String, String)]) -> Result<u64> {
        let ids: Vec<String> = pairs.iter().map(|(id, _)| id.clone()).collect();
        let hashes: Vec<String> = pairs.iter().map(|(_, h)| h.clone()).collect();
        let result = sqlx::query(
            "UPDATE products SET content_hash = data.hash \
             FROM UNNEST($1::text[], $2::text[]) AS data(id, hash) \
             WHERE products.id::text = data.id",
        )
        .persistent(false)
        .bind(&ids)
        .bind(&hashes)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count_all(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
            .persistent(false)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_missing_hash(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE content_hash IS NULL OR content_hash = ''",
        )
        .persistent(false)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
