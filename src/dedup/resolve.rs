//! Keeper selection within a duplicate group.
//!
//! Ordering is: quality score descending, then price ascending (missing
//! price sorts last), then `created_at` descending. The price tie-break
//! assumes the cheaper listing is the canonical/base offer; that ordering
//! is load-bearing for compatibility with prior passes even though the
//! business rationale was never confirmed. Resolution never fails: a group
//! of fully malformed records still resolves, just with low scores.

use crate::product::ProductRecord;

use super::score::quality_score;

/// Outcome for one duplicate group: exactly one keeper, everything else
/// marked for deletion.
#[derive(Debug)]
pub struct Resolution<'a> {
    pub keeper: &'a ProductRecord,
    pub keeper_score: u32,
    pub losers: Vec<&'a ProductRecord>,
}

/// Pick the keeper for a group. Returns `None` only for an empty slice.
///
/// The sort is stable, so records tying on every criterion resolve to the
/// first-encountered one: arbitrary but deterministic, which is acceptable
/// since such records are near-identical by definition.
pub fn resolve<'a>(members: &[&'a ProductRecord]) -> Option<Resolution<'a>> {
    let mut scored: Vec<(u32, &ProductRecord)> =
        members.iter().map(|r| (quality_score(r), *r)).collect();

    scored.sort_by(|(score_a, a), (score_b, b)| {
        score_b
            .cmp(score_a)
            .then_with(|| {
                let price_a = a.effective_price().unwrap_or(f64::INFINITY);
                let price_b = b.effective_price().unwrap_or(f64::INFINITY);
                price_a.total_cmp(&price_b)
            })
            .then_with(|| b.created_at.cmp(&a.created_at))
    });

    let mut iter = scored.into_iter();
    let (keeper_score, keeper) = iter.next()?;
    let losers = iter.map(|(_, r)| r).collect();
    Some(Resolution {
        keeper,
        keeper_score,
        losers,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;

    fn record(id: &str, price: Option<f64>, created_at: DateTime<Utc>) -> ProductRecord {
        ProductRecord {
            id: id.into(),
            title: "Leather Tote Bag".into(),
            brand: "Acme".into(),
            price,
            description: None,
            image_url: None,
            affiliate_network: None,
            created_at,
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn higher_score_wins() {
        let mut rich = record("rich", Some(42.0), day(1));
        rich.description = Some("d".repeat(120));
        let poor = record("poor", Some(40.0), day(2));

        let members = vec![&poor, &rich];
        let resolution = resolve(&members).unwrap();
        assert_eq!(resolution.keeper.id, "rich");
        assert_eq!(resolution.losers.len(), 1);
        assert_eq!(resolution.losers[0].id, "poor");
    }

    #[test]
    fn score_tie_prefers_cheaper_price() {
        let cheap = record("cheap", Some(39.0), day(1));
        let pricey = record("pricey", Some(41.0), day(5));
        let members = vec![&pricey, &cheap];
        assert_eq!(resolve(&members).unwrap().keeper.id, "cheap");
    }

    #[test]
    fn no_price_records_fall_through_to_recency() {
        // Two records without prices tie on score and on the +inf price
        // key, so the newer one wins.
        let older = record("older", None, day(1));
        let newer = record("newer", None, day(9));
        let members = vec![&older, &newer];
        assert_eq!(resolve(&members).unwrap().keeper.id, "newer");
    }

    #[test]
    fn full_tie_prefers_newest_then_input_order() {
        let a = record("a", Some(40.0), day(3));
        let b = record("b", Some(40.0), day(3));
        let c = record("c", Some(40.0), day(2));
        let members = vec![&a, &b, &c];
        let resolution = resolve(&members).unwrap();
        // a and b tie on everything; stable sort keeps a first.
        assert_eq!(resolution.keeper.id, "a");
        let loser_ids: Vec<&str> = resolution.losers.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(loser_ids, vec!["b", "c"]);
    }

    #[test]
    fn resolution_is_deterministic_across_runs() {
        let a = record("a", Some(41.0), day(1));
        let mut b = record("b", Some(40.0), day(2));
        b.image_url = Some("https://cdn.example.com/b.jpg".into());
        let c = record("c", None, day(3));
        let members = vec![&a, &b, &c];

        let first = resolve(&members).unwrap();
        let second = resolve(&members).unwrap();
        assert_eq!(first.keeper.id, second.keeper.id);
        let ids = |r: &Resolution| {
            r.losers
                .iter()
                .map(|p| p.id.clone())
                .collect::<Vec<String>>()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn empty_group_resolves_to_none() {
        assert!(resolve(&[]).is_none());
    }
}
