//! The persistent-store boundary the dedup engine consumes.
//!
//! Everything the engine needs from the catalog database fits in this
//! trait: paginated reads to materialize a snapshot, bulk delete/update
//! keyed by id, and the count queries used for pre/post verification.
//! Upstream API clients, embeddings, and classifiers live elsewhere.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::product::ProductRecord;

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// One page of the catalog in a stable order.
    async fn fetch_page(&self, offset: i64, limit: i64) -> Result<Vec<ProductRecord>>;

    /// One page of records whose stored content hash is missing.
    async fn fetch_missing_hash_page(&self, offset: i64, limit: i64)
        -> Result<Vec<ProductRecord>>;

    /// Bulk delete; returns rows actually removed (already-gone ids no-op).
    async fn delete_by_ids(&self, ids: &[String]) -> Result<u64>;

    /// Bulk `(id, content_hash)` upsert onto existing rows; returns rows updated.
    async fn update_content_hashes(&self, pairs: &[(String, String)]) -> Result<u64>;

    async fn count_all(&self) -> Result<i64>;

    async fn count_missing_hash(&self) -> Result<i64>;
}

/// Materialize the full catalog snapshot with bounded pages.
///
/// The pass computes its plan against this snapshot; concurrent ingestion
/// can make it slightly stale, which is tolerated because deletes target
/// specific ids and the whole pass is safely re-runnable.
pub async fn fetch_all(store: &dyn ProductStore, page_size: i64) -> Result<Vec<ProductRecord>> {
    let mut all = Vec::new();
    let mut offset = 0i64;
    loop {
        let page = store.fetch_page(offset, page_size).await?;
        let fetched = page.len() as i64;
        all.extend(page);
        info!(fetched = all.len(), "fetching products");
        if fetched < page_size {
            break;
        }
        offset += page_size;
    }
    Ok(all)
}

/// Same materialization loop over the missing-hash subset.
pub async fn fetch_all_missing_hash(
    store: &dyn ProductStore,
    page_size: i64,
) -> Result<Vec<ProductRecord>> {
    let mut all = Vec::new();
    let mut offset = 0i64;
    loop {
        let page = store.fetch_missing_hash_page(offset, page_size).await?;
        let fetched = page.len() as i64;
        all.extend(page);
        if fetched < page_size {
            break;
        }
        offset += page_size;
    }
    Ok(all)
}

#[cfg(test)]
pub(crate) mod mem {
    //! In-memory store used by the batch-workflow tests.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use crate::product::ProductRecord;

    use super::ProductStore;

    #[derive(Default)]
    pub struct MemStore {
        pub records: Mutex<Vec<ProductRecord>>,
        pub hashes: Mutex<HashMap<String, String>>,
        /// 0-based delete-batch indexes that should fail.
        pub fail_delete_batches: Vec<usize>,
        delete_calls: AtomicUsize,
    }

    impl MemStore {
        pub fn new(records: Vec<ProductRecord>) -> Self {
            Self {
                records: Mutex::new(records),
                ..Default::default()
            }
        }

        pub fn failing_on(records: Vec<ProductRecord>, batches: Vec<usize>) -> Self {
            Self {
                records: Mutex::new(records),
                fail_delete_batches: batches,
                ..Default::default()
            }
        }

        pub fn delete_calls(&self) -> usize {
            self.delete_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProductStore for MemStore {
        async fn fetch_page(&self, offset: i64, limit: i64) -> Result<Vec<ProductRecord>> {
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn fetch_missing_hash_page(
            &self,
            offset: i64,
            limit: i64,
        ) -> Result<Vec<ProductRecord>> {
            let records = self.records.lock().unwrap();
            let hashes = self.hashes.lock().unwrap();
            Ok(records
                .iter()
                .filter(|r| !hashes.contains_key(&r.id))
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn delete_by_ids(&self, ids: &[String]) -> Result<u64> {
            let call = self.delete_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_delete_batches.contains(&call) {
                bail!("injected delete failure for batch {call}");
            }
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|r| !ids.contains(&r.id));
            Ok((before - records.len()) as u64)
        }

        async fn update_content_hashes(&self, pairs: &[(String, String)]) -> Result<u64> {
            let records = self.records.lock().unwrap();
            let mut hashes = self.hashes.lock().unwrap();
            let mut updated = 0u64;
            for (id, hash) in pairs {
                if records.iter().any(|r| &r.id == id) {
                    hashes.insert(id.clone(), hash.clone());
                    updated += 1;
                }
            }
            Ok(updated)
        }

        async fn count_all(&self) -> Result<i64> {
            Ok(self.records.lock().unwrap().len() as i64)
        }

        async fn count_missing_hash(&self) -> Result<i64> {
            let records = self.records.lock().unwrap();
            let hashes = self.hashes.lock().unwrap();
            Ok(records.iter().filter(|r| !hashes.contains_key(&r.id)).count() as i64)
        }
    }
}
