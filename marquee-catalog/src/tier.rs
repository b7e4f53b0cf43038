use crate::unit::SellableUnit;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Display projection of a price tier: name, sections, price band, total
/// listed quantity. Carries no availability; live availability is computed
/// against the hold ledger, never cached here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierSummary {
    pub event_id: Uuid,
    pub tier_name: String,
    pub sections: Vec<String>,
    pub min_price_cents: i32,
    pub max_price_cents: i32,
    pub total_quantity: i32,
    pub unit_count: usize,
}

/// Group an event's units into per-tier summaries.
///
/// Pure aggregation over an explicit snapshot; tiers come back sorted by
/// name and sections sorted within each tier.
pub fn summarize_tiers(units: &[SellableUnit]) -> Vec<TierSummary> {
    let mut by_tier: BTreeMap<&str, Vec<&SellableUnit>> = BTreeMap::new();
    for unit in units {
        by_tier.entry(unit.tier_name.as_str()).or_default().push(unit);
    }

    by_tier
        .into_iter()
        .map(|(tier_name, members)| {
            let mut sections: Vec<String> =
                members.iter().map(|u| u.section.clone()).collect();
            sections.sort();
            sections.dedup();

            TierSummary {
                event_id: members[0].event_id,
                tier_name: tier_name.to_string(),
                sections,
                min_price_cents: members.iter().map(|u| u.price_cents).min().unwrap_or(0),
                max_price_cents: members.iter().map(|u| u.price_cents).max().unwrap_or(0),
                total_quantity: members.iter().map(|u| u.total_quantity).sum(),
                unit_count: members.len(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_groups_by_tier() {
        let event_id = Uuid::new_v4();
        let units = vec![
            SellableUnit::seat(event_id, "VIP", "A", "1", "A-1-1", 20000),
            SellableUnit::seat(event_id, "VIP", "B", "1", "B-1-1", 24000),
            SellableUnit::general_admission(event_id, "Floor", "GA", 300, 6500),
        ];

        let tiers = summarize_tiers(&units);
        assert_eq!(tiers.len(), 2);

        // BTreeMap ordering: "Floor" before "VIP"
        assert_eq!(tiers[0].tier_name, "Floor");
        assert_eq!(tiers[0].total_quantity, 300);

        assert_eq!(tiers[1].tier_name, "VIP");
        assert_eq!(tiers[1].sections, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(tiers[1].min_price_cents, 20000);
        assert_eq!(tiers[1].max_price_cents, 24000);
        assert_eq!(tiers[1].total_quantity, 2);
        assert_eq!(tiers[1].unit_count, 2);
    }

    #[test]
    fn test_duplicate_sections_are_deduped() {
        let event_id = Uuid::new_v4();
        let units = vec![
            SellableUnit::seat(event_id, "Balcony", "C", "1", "C-1-1", 9000),
            SellableUnit::seat(event_id, "Balcony", "C", "1", "C-1-2", 9000),
        ];

        let tiers = summarize_tiers(&units);
        assert_eq!(tiers[0].sections, vec!["C".to_string()]);
    }

    #[test]
    fn test_empty_input_yields_no_tiers() {
        assert!(summarize_tiers(&[]).is_empty());
    }
}
