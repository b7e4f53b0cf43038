use crate::tier::{summarize_tiers, TierSummary};
use crate::unit::SellableUnit;
use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Event not found: {0}")]
    EventNotFound(Uuid),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of the sellable units listed for sale.
///
/// The reservation engine only ever reads the catalog; listing and
/// inventory management are separate flows with their own write path.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Per-tier summaries for an event. Fails with `EventNotFound` when the
    /// event is unknown (as opposed to listed with zero units).
    async fn list_tiers(&self, event_id: Uuid) -> Result<Vec<TierSummary>, CatalogError>;

    /// All units of one tier of an event.
    async fn list_units(
        &self,
        event_id: Uuid,
        tier_name: &str,
    ) -> Result<Vec<SellableUnit>, CatalogError>;

    /// Look up a single unit by id.
    async fn get_unit(&self, unit_id: Uuid) -> Result<Option<SellableUnit>, CatalogError>;
}

/// In-memory catalog over a fixed unit list, for tests and local runs.
pub struct InMemoryCatalog {
    by_event: HashMap<Uuid, Vec<SellableUnit>>,
    by_unit: HashMap<Uuid, SellableUnit>,
}

impl InMemoryCatalog {
    pub fn new(units: Vec<SellableUnit>) -> Self {
        let mut by_event: HashMap<Uuid, Vec<SellableUnit>> = HashMap::new();
        let mut by_unit = HashMap::new();
        for unit in units {
            by_unit.insert(unit.id, unit.clone());
            by_event.entry(unit.event_id).or_default().push(unit);
        }
        Self { by_event, by_unit }
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn list_tiers(&self, event_id: Uuid) -> Result<Vec<TierSummary>, CatalogError> {
        let units = self
            .by_event
            .get(&event_id)
            .ok_or(CatalogError::EventNotFound(event_id))?;
        Ok(summarize_tiers(units))
    }

    async fn list_units(
        &self,
        event_id: Uuid,
        tier_name: &str,
    ) -> Result<Vec<SellableUnit>, CatalogError> {
        let units = self
            .by_event
            .get(&event_id)
            .ok_or(CatalogError::EventNotFound(event_id))?;
        Ok(units
            .iter()
            .filter(|u| u.tier_name == tier_name)
            .cloned()
            .collect())
    }

    async fn get_unit(&self, unit_id: Uuid) -> Result<Option<SellableUnit>, CatalogError> {
        Ok(self.by_unit.get(&unit_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_catalog(event_id: Uuid) -> InMemoryCatalog {
        InMemoryCatalog::new(vec![
            SellableUnit::seat(event_id, "VIP", "A", "1", "A-1-1", 20000),
            SellableUnit::seat(event_id, "VIP", "A", "1", "A-1-2", 20000),
            SellableUnit::general_admission(event_id, "Floor", "GA", 250, 6500),
        ])
    }

    #[tokio::test]
    async fn test_list_tiers_for_known_event() {
        let event_id = Uuid::new_v4();
        let catalog = seeded_catalog(event_id);

        let tiers = catalog.list_tiers(event_id).await.unwrap();
        assert_eq!(tiers.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_event_is_not_found() {
        let catalog = seeded_catalog(Uuid::new_v4());

        let result = catalog.list_tiers(Uuid::new_v4()).await;
        assert!(matches!(result, Err(CatalogError::EventNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_units_filters_by_tier() {
        let event_id = Uuid::new_v4();
        let catalog = seeded_catalog(event_id);

        let vip = catalog.list_units(event_id, "VIP").await.unwrap();
        assert_eq!(vip.len(), 2);

        let none = catalog.list_units(event_id, "Lawn").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_get_unit_by_id() {
        let event_id = Uuid::new_v4();
        let unit = SellableUnit::seat(event_id, "VIP", "A", "1", "A-1-1", 20000);
        let unit_id = unit.id;
        let catalog = InMemoryCatalog::new(vec![unit]);

        assert!(catalog.get_unit(unit_id).await.unwrap().is_some());
        assert!(catalog.get_unit(Uuid::new_v4()).await.unwrap().is_none());
    }
}
