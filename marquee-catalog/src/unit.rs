use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One sellable unit of event inventory: a numbered seat (quantity 1) or a
/// fungible general-admission block (quantity N).
///
/// Units are immutable once listed; quantity changes happen through a
/// separate inventory-management flow, never through the reservation path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellableUnit {
    pub id: Uuid,
    pub event_id: Uuid,
    pub tier_name: String,
    pub section: String,
    pub row: Option<String>,
    pub seat_label: Option<String>,
    pub total_quantity: i32,
    /// Price in currency minor units (cents).
    pub price_cents: i32,
}

impl SellableUnit {
    /// A single numbered seat.
    pub fn seat(
        event_id: Uuid,
        tier_name: impl Into<String>,
        section: impl Into<String>,
        row: impl Into<String>,
        seat_label: impl Into<String>,
        price_cents: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            tier_name: tier_name.into(),
            section: section.into(),
            row: Some(row.into()),
            seat_label: Some(seat_label.into()),
            total_quantity: 1,
            price_cents,
        }
    }

    /// A general-admission block with `total_quantity` interchangeable spots.
    pub fn general_admission(
        event_id: Uuid,
        tier_name: impl Into<String>,
        section: impl Into<String>,
        total_quantity: i32,
        price_cents: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            tier_name: tier_name.into(),
            section: section.into(),
            row: None,
            seat_label: None,
            total_quantity,
            price_cents,
        }
    }

    pub fn is_general_admission(&self) -> bool {
        self.seat_label.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_has_quantity_one() {
        let unit = SellableUnit::seat(Uuid::new_v4(), "VIP", "A", "3", "A-3-12", 15000);
        assert_eq!(unit.total_quantity, 1);
        assert!(!unit.is_general_admission());
    }

    #[test]
    fn test_ga_block_carries_capacity() {
        let unit = SellableUnit::general_admission(Uuid::new_v4(), "Floor", "GA", 500, 6500);
        assert_eq!(unit.total_quantity, 500);
        assert!(unit.is_general_admission());
        assert!(unit.row.is_none());
    }
}
