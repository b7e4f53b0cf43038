use crate::hold::Hold;
use chrono::{DateTime, Utc};
use marquee_catalog::SellableUnit;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Live availability snapshot for one unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitAvailability {
    pub unit_id: Uuid,
    pub event_id: Uuid,
    pub tier_name: String,
    pub section: String,
    pub total_quantity: i32,
    pub held_quantity: i32,
    pub available_quantity: i32,
    pub price_cents: i32,
}

/// Live availability for a whole tier: summed unit availability, price band
/// and section list recomputed over the units that still have capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierAvailability {
    pub event_id: Uuid,
    pub tier_name: String,
    pub total_quantity: i32,
    pub available_quantity: i32,
    /// Price band across units with availability left; `None` when sold out.
    pub min_price_cents: Option<i32>,
    pub max_price_cents: Option<i32>,
    /// Sections that still have at least one available spot.
    pub open_sections: Vec<String>,
}

/// Effective remaining quantity of a unit at `now`.
///
/// Expiry is logical: an `Active` hold past its TTL frees capacity here
/// even if the reaper has not marked it `Expired` yet. Capacity checks and
/// display must never depend on the sweep having run.
pub fn available_quantity(unit: &SellableUnit, holds: &[Hold], now: DateTime<Utc>) -> i32 {
    let held: i32 = holds
        .iter()
        .filter(|h| h.unit_id == unit.id && h.counts_against_capacity(now))
        .map(|h| h.quantity)
        .sum();
    unit.total_quantity - held
}

pub fn unit_availability(unit: &SellableUnit, holds: &[Hold], now: DateTime<Utc>) -> UnitAvailability {
    let available = available_quantity(unit, holds, now);
    UnitAvailability {
        unit_id: unit.id,
        event_id: unit.event_id,
        tier_name: unit.tier_name.clone(),
        section: unit.section.clone(),
        total_quantity: unit.total_quantity,
        held_quantity: unit.total_quantity - available,
        available_quantity: available,
        price_cents: unit.price_cents,
    }
}

/// Aggregate availability over a tier's units.
///
/// Pure function over explicit snapshots; nothing here caches derived
/// availability.
pub fn tier_availability(
    event_id: Uuid,
    tier_name: &str,
    units: &[SellableUnit],
    holds_by_unit: &HashMap<Uuid, Vec<Hold>>,
    now: DateTime<Utc>,
) -> TierAvailability {
    let no_holds: Vec<Hold> = Vec::new();

    let mut total_quantity = 0;
    let mut available_quantity_sum = 0;
    let mut min_price: Option<i32> = None;
    let mut max_price: Option<i32> = None;
    let mut open_sections: Vec<String> = Vec::new();

    for unit in units {
        let holds = holds_by_unit.get(&unit.id).unwrap_or(&no_holds);
        let available = available_quantity(unit, holds, now);

        total_quantity += unit.total_quantity;
        available_quantity_sum += available;

        if available > 0 {
            min_price = Some(min_price.map_or(unit.price_cents, |p| p.min(unit.price_cents)));
            max_price = Some(max_price.map_or(unit.price_cents, |p| p.max(unit.price_cents)));
            open_sections.push(unit.section.clone());
        }
    }

    open_sections.sort();
    open_sections.dedup();

    TierAvailability {
        event_id,
        tier_name: tier_name.to_string(),
        total_quantity,
        available_quantity: available_quantity_sum,
        min_price_cents: min_price,
        max_price_cents: max_price,
        open_sections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hold::HoldState;
    use chrono::Duration;

    fn hold_on(unit: &SellableUnit, quantity: i32, now: DateTime<Utc>) -> Hold {
        Hold::new(unit.id, "owner", quantity, now, Duration::minutes(10))
    }

    #[test]
    fn test_available_subtracts_active_and_confirmed() {
        let now = Utc::now();
        let unit = SellableUnit::general_admission(Uuid::new_v4(), "Floor", "GA", 10, 6500);

        let active = hold_on(&unit, 3, now);
        let mut confirmed = hold_on(&unit, 2, now);
        confirmed.state = HoldState::Confirmed;
        let mut released = hold_on(&unit, 4, now);
        released.state = HoldState::Released;

        let holds = vec![active, confirmed, released];
        assert_eq!(available_quantity(&unit, &holds, now), 5);
    }

    #[test]
    fn test_expired_active_hold_frees_capacity_without_reaper() {
        let now = Utc::now();
        let unit = SellableUnit::general_admission(Uuid::new_v4(), "Floor", "GA", 10, 6500);

        // Still ACTIVE in the ledger, but TTL has elapsed
        let holds = vec![hold_on(&unit, 10, now - Duration::minutes(11))];

        assert_eq!(available_quantity(&unit, &holds, now), 10);
    }

    #[test]
    fn test_confirmed_hold_never_expires() {
        let now = Utc::now();
        let unit = SellableUnit::general_admission(Uuid::new_v4(), "Floor", "GA", 10, 6500);

        let mut hold = hold_on(&unit, 4, now - Duration::days(2));
        hold.state = HoldState::Confirmed;

        assert_eq!(available_quantity(&unit, &[hold], now), 6);
    }

    #[test]
    fn test_holds_for_other_units_are_ignored() {
        let now = Utc::now();
        let unit = SellableUnit::general_admission(Uuid::new_v4(), "Floor", "GA", 10, 6500);
        let other = SellableUnit::general_admission(Uuid::new_v4(), "Floor", "GA", 10, 6500);

        let holds = vec![hold_on(&other, 5, now)];
        assert_eq!(available_quantity(&unit, &holds, now), 10);
    }

    #[test]
    fn test_unit_availability_snapshot() {
        let now = Utc::now();
        let unit = SellableUnit::seat(Uuid::new_v4(), "VIP", "A", "1", "A-1-1", 20000);
        let snapshot = unit_availability(&unit, &[hold_on(&unit, 1, now)], now);

        assert_eq!(snapshot.total_quantity, 1);
        assert_eq!(snapshot.held_quantity, 1);
        assert_eq!(snapshot.available_quantity, 0);
        assert_eq!(snapshot.price_cents, 20000);
    }

    #[test]
    fn test_tier_availability_recomputes_price_band_over_open_units() {
        let now = Utc::now();
        let event_id = Uuid::new_v4();
        let cheap = SellableUnit::seat(event_id, "VIP", "A", "1", "A-1-1", 18000);
        let pricey = SellableUnit::seat(event_id, "VIP", "B", "1", "B-1-1", 26000);

        // Sell out the cheap seat; only the pricey one stays in the band
        let mut holds_by_unit = HashMap::new();
        holds_by_unit.insert(cheap.id, vec![hold_on(&cheap, 1, now)]);

        let units = vec![cheap.clone(), pricey.clone()];
        let tier = tier_availability(event_id, "VIP", &units, &holds_by_unit, now);

        assert_eq!(tier.total_quantity, 2);
        assert_eq!(tier.available_quantity, 1);
        assert_eq!(tier.min_price_cents, Some(26000));
        assert_eq!(tier.max_price_cents, Some(26000));
        assert_eq!(tier.open_sections, vec!["B".to_string()]);
    }

    #[test]
    fn test_sold_out_tier_has_no_price_band() {
        let now = Utc::now();
        let event_id = Uuid::new_v4();
        let unit = SellableUnit::seat(event_id, "VIP", "A", "1", "A-1-1", 18000);

        let mut holds_by_unit = HashMap::new();
        holds_by_unit.insert(unit.id, vec![hold_on(&unit, 1, now)]);

        let tier = tier_availability(event_id, "VIP", &[unit], &holds_by_unit, now);
        assert_eq!(tier.available_quantity, 0);
        assert_eq!(tier.min_price_cents, None);
        assert_eq!(tier.max_price_cents, None);
        assert!(tier.open_sections.is_empty());
    }
}
