pub mod backfill_hashes;
pub mod db;
pub mod dedup_pass;
pub mod store;
