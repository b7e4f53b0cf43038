use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_reserve::{Hold, HoldLedger, HoldState, LedgerError};
use sqlx::PgPool;
use uuid::Uuid;

/// Postgres-backed hold ledger.
///
/// State transitions run inside a transaction with the row locked
/// (`FOR UPDATE`), so the `Active`-only transition guard holds even with a
/// second writer process on the same database.
pub struct PgHoldLedger {
    pool: PgPool,
}

impl PgHoldLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct HoldRow {
    id: Uuid,
    unit_id: Uuid,
    owner_id: String,
    quantity: i32,
    state: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl HoldRow {
    fn into_hold(self) -> Result<Hold, LedgerError> {
        let state = HoldState::parse(&self.state).ok_or_else(|| {
            LedgerError::Unavailable(format!("unknown hold state in storage: {}", self.state))
        })?;
        Ok(Hold {
            id: self.id,
            unit_id: self.unit_id,
            owner_id: self.owner_id,
            quantity: self.quantity,
            state,
            created_at: self.created_at,
            expires_at: self.expires_at,
        })
    }
}

fn storage_err(err: sqlx::Error) -> LedgerError {
    LedgerError::Unavailable(err.to_string())
}

const HOLD_COLUMNS: &str = "id, unit_id, owner_id, quantity, state, created_at, expires_at";

#[async_trait]
impl HoldLedger for PgHoldLedger {
    async fn insert(&self, hold: &Hold) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO holds (id, unit_id, owner_id, quantity, state, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(hold.id)
        .bind(hold.unit_id)
        .bind(&hold.owner_id)
        .bind(hold.quantity)
        .bind(hold.state.as_str())
        .bind(hold.created_at)
        .bind(hold.expires_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn get(&self, hold_id: Uuid) -> Result<Option<Hold>, LedgerError> {
        let row = sqlx::query_as::<_, HoldRow>(&format!(
            "SELECT {} FROM holds WHERE id = $1",
            HOLD_COLUMNS
        ))
        .bind(hold_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(HoldRow::into_hold).transpose()
    }

    async fn update_state(&self, hold_id: Uuid, new_state: HoldState) -> Result<Hold, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let row = sqlx::query_as::<_, HoldRow>(&format!(
            "SELECT {} FROM holds WHERE id = $1 FOR UPDATE",
            HOLD_COLUMNS
        ))
        .bind(hold_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_err)?;

        let mut hold = row
            .ok_or(LedgerError::NotFound(hold_id))?
            .into_hold()?;

        if !hold.state.can_transition_to(new_state) {
            return Err(LedgerError::InvalidTransition {
                from: hold.state.as_str().to_string(),
                to: new_state.as_str().to_string(),
            });
        }

        sqlx::query("UPDATE holds SET state = $1 WHERE id = $2")
            .bind(new_state.as_str())
            .bind(hold_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;

        tx.commit().await.map_err(storage_err)?;

        hold.state = new_state;
        Ok(hold)
    }

    async fn find_open_by_unit(&self, unit_id: Uuid) -> Result<Vec<Hold>, LedgerError> {
        let rows = sqlx::query_as::<_, HoldRow>(&format!(
            "SELECT {} FROM holds WHERE unit_id = $1 AND state IN ('ACTIVE', 'CONFIRMED')",
            HOLD_COLUMNS
        ))
        .bind(unit_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.into_iter().map(HoldRow::into_hold).collect()
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Hold>, LedgerError> {
        let rows = sqlx::query_as::<_, HoldRow>(&format!(
            "SELECT {} FROM holds WHERE owner_id = $1 ORDER BY created_at",
            HOLD_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.into_iter().map(HoldRow::into_hold).collect()
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Hold>, LedgerError> {
        let rows = sqlx::query_as::<_, HoldRow>(&format!(
            "SELECT {} FROM holds WHERE state = 'ACTIVE' AND expires_at <= $1",
            HOLD_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.into_iter().map(HoldRow::into_hold).collect()
    }
}
