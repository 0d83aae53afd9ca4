use indexmap::IndexMap;
use serde::Serialize;

use crate::product::ProductRecord;

use super::Fingerprinter;

/// Batch-level accounting for a grouping pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GroupStats {
    pub total_records: usize,
    /// Number of distinct fingerprints.
    pub unique: usize,
    /// Groups with two or more members.
    pub duplicate_groups: usize,
    /// Records beyond the first of each group: `total - unique`.
    pub duplicate_records: usize,
}

/// Partition a batch by fingerprint, keeping only groups of two or more.
///
/// Group order is first-encounter order and members keep their input order
/// (IndexMap + push), so reports and tests are deterministic for a given
/// input sequence.
pub fn group_by_fingerprint<'a>(
    records: &'a [ProductRecord],
    fingerprinter: &Fingerprinter,
) -> (IndexMap<String, Vec<&'a ProductRecord>>, GroupStats) {
    let mut groups: IndexMap<String, Vec<&ProductRecord>> = IndexMap::new();
    for record in records {
        groups
            .entry(fingerprinter.fingerprint(record))
            .or_default()
            .push(record);
    }

    let unique = groups.len();
    groups.retain(|_, members| members.len() > 1);

    let stats = GroupStats {
        total_records: records.len(),
        unique,
        duplicate_groups: groups.len(),
        duplicate_records: records.len() - unique,
    };
    (groups, stats)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn record(id: &str, title: &str, price: Option<f64>) -> ProductRecord {
        ProductRecord {
            id: id.into(),
            title: title.into(),
            brand: "Acme".into(),
            price,
            description: None,
            image_url: None,
            affiliate_network: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn singletons_are_dropped_from_the_duplicate_view() {
        let records = vec![
            record("a", "Leather Tote Bag", Some(41.0)),
            record("b", "Leather Tote Bag", Some(42.0)),
            record("c", "Silk Scarf", Some(15.0)),
        ];
        let (groups, stats) = group_by_fingerprint(&records, &Fingerprinter::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.unique, 2);
        assert_eq!(stats.duplicate_groups, 1);
        assert_eq!(stats.duplicate_records, 1);
    }

    #[test]
    fn group_sizes_plus_singletons_cover_the_batch() {
        let records = vec![
            record("a", "Leather Tote Bag", Some(40.0)),
            record("b", "Leather Tote Bag", Some(40.0)),
            record("c", "Silk Scarf", Some(15.0)),
            record("d", "Wool Coat", Some(120.0)),
            record("e", "Wool Coat", Some(121.0)),
            record("f", "Wool Coat", Some(119.0)),
        ];
        let (groups, stats) = group_by_fingerprint(&records, &Fingerprinter::default());
        let grouped: usize = groups.values().map(Vec::len).sum();
        let singletons = stats.unique - stats.duplicate_groups;
        assert_eq!(grouped + singletons, stats.total_records);
    }

    #[test]
    fn member_order_is_input_order() {
        let records = vec![
            record("first", "Wool Coat", Some(120.0)),
            record("second", "Wool Coat", Some(120.0)),
            record("third", "Wool Coat", Some(120.0)),
        ];
        let (groups, _) = group_by_fingerprint(&records, &Fingerprinter::default());
        let members = groups.values().next().unwrap();
        let ids: Vec<&str> = members.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn empty_batch_yields_empty_stats() {
        let (groups, stats) = group_by_fingerprint(&[], &Fingerprinter::default());
        assert!(groups.is_empty());
        assert_eq!(stats.total_records, 0);
        assert_eq!(stats.unique, 0);
        assert_eq!(stats.duplicate_records, 0);
    }
}
