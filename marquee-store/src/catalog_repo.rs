use async_trait::async_trait;
use marquee_catalog::{summarize_tiers, Catalog, CatalogError, SellableUnit, TierSummary};
use sqlx::PgPool;
use uuid::Uuid;

/// Postgres-backed catalog. Tier summaries are projected through the same
/// pure aggregation the in-memory catalog uses, so both views agree.
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn event_exists(&self, event_id: Uuid) -> Result<bool, CatalogError> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
                .bind(event_id)
                .fetch_one(&self.pool)
                .await
                .map_err(storage_err)?;
        Ok(exists.0)
    }
}

#[derive(sqlx::FromRow)]
struct UnitRow {
    id: Uuid,
    event_id: Uuid,
    tier_name: String,
    section: String,
    row_label: Option<String>,
    seat_label: Option<String>,
    total_quantity: i32,
    price_cents: i32,
}

impl From<UnitRow> for SellableUnit {
    fn from(row: UnitRow) -> Self {
        SellableUnit {
            id: row.id,
            event_id: row.event_id,
            tier_name: row.tier_name,
            section: row.section,
            row: row.row_label,
            seat_label: row.seat_label,
            total_quantity: row.total_quantity,
            price_cents: row.price_cents,
        }
    }
}

fn storage_err(err: sqlx::Error) -> CatalogError {
    CatalogError::Unavailable(err.to_string())
}

const UNIT_COLUMNS: &str =
    "id, event_id, tier_name, section, row_label, seat_label, total_quantity, price_cents";

#[async_trait]
impl Catalog for PgCatalog {
    async fn list_tiers(&self, event_id: Uuid) -> Result<Vec<TierSummary>, CatalogError> {
        if !self.event_exists(event_id).await? {
            return Err(CatalogError::EventNotFound(event_id));
        }

        let rows = sqlx::query_as::<_, UnitRow>(&format!(
            "SELECT {} FROM sellable_units WHERE event_id = $1",
            UNIT_COLUMNS
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        let units: Vec<SellableUnit> = rows.into_iter().map(SellableUnit::from).collect();
        Ok(summarize_tiers(&units))
    }

    async fn list_units(
        &self,
        event_id: Uuid,
        tier_name: &str,
    ) -> Result<Vec<SellableUnit>, CatalogError> {
        if !self.event_exists(event_id).await? {
            return Err(CatalogError::EventNotFound(event_id));
        }

        let rows = sqlx::query_as::<_, UnitRow>(&format!(
            "SELECT {} FROM sellable_units WHERE event_id = $1 AND tier_name = $2 \
             ORDER BY section, row_label, seat_label",
            UNIT_COLUMNS
        ))
        .bind(event_id)
        .bind(tier_name)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows.into_iter().map(SellableUnit::from).collect())
    }

    async fn get_unit(&self, unit_id: Uuid) -> Result<Option<SellableUnit>, CatalogError> {
        let row = sqlx::query_as::<_, UnitRow>(&format!(
            "SELECT {} FROM sellable_units WHERE id = $1",
            UNIT_COLUMNS
        ))
        .bind(unit_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(row.map(SellableUnit::from))
    }
}
