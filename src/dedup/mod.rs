pub mod config;
pub mod fingerprint;
pub mod group;
pub mod resolve;
pub mod score;

pub use config::DedupConfig;
pub use fingerprint::{content_hash, Fingerprinter};
pub use group::{group_by_fingerprint, GroupStats};
pub use resolve::{resolve, Resolution};
pub use score::quality_score;
