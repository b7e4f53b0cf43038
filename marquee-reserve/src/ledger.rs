use crate::hold::{Hold, HoldState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Hold not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Append-mostly store of hold records.
///
/// `update_state` is the only mutation after insert and must reject any
/// transition the state machine forbids, so a lost race (confirm vs.
/// release vs. reaper) can never overwrite a terminal state.
#[async_trait]
pub trait HoldLedger: Send + Sync {
    async fn insert(&self, hold: &Hold) -> Result<(), LedgerError>;

    async fn get(&self, hold_id: Uuid) -> Result<Option<Hold>, LedgerError>;

    /// Apply a state transition and return the updated hold. Fails with
    /// `InvalidTransition` when the stored state is not `Active`.
    async fn update_state(&self, hold_id: Uuid, new_state: HoldState) -> Result<Hold, LedgerError>;

    /// Holds that may still consume capacity on a unit: `Active` (possibly
    /// past TTL, callers apply logical expiry) and `Confirmed`.
    async fn find_open_by_unit(&self, unit_id: Uuid) -> Result<Vec<Hold>, LedgerError>;

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Hold>, LedgerError>;

    /// `Active` holds whose TTL has elapsed at `now`, for the reaper.
    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Hold>, LedgerError>;
}

#[derive(Default)]
struct LedgerInner {
    holds: HashMap<Uuid, Hold>,
    by_unit: HashMap<Uuid, Vec<Uuid>>,
    by_owner: HashMap<String, Vec<Uuid>>,
}

/// In-memory ledger for tests and single-process deployments. The Postgres
/// implementation lives in the store crate.
#[derive(Default)]
pub struct InMemoryLedger {
    inner: RwLock<LedgerInner>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HoldLedger for InMemoryLedger {
    async fn insert(&self, hold: &Hold) -> Result<(), LedgerError> {
        let mut inner = self.inner.write().await;
        inner.by_unit.entry(hold.unit_id).or_default().push(hold.id);
        inner
            .by_owner
            .entry(hold.owner_id.clone())
            .or_default()
            .push(hold.id);
        inner.holds.insert(hold.id, hold.clone());
        Ok(())
    }

    async fn get(&self, hold_id: Uuid) -> Result<Option<Hold>, LedgerError> {
        let inner = self.inner.read().await;
        Ok(inner.holds.get(&hold_id).cloned())
    }

    async fn update_state(&self, hold_id: Uuid, new_state: HoldState) -> Result<Hold, LedgerError> {
        let mut inner = self.inner.write().await;
        let hold = inner
            .holds
            .get_mut(&hold_id)
            .ok_or(LedgerError::NotFound(hold_id))?;

        if !hold.state.can_transition_to(new_state) {
            return Err(LedgerError::InvalidTransition {
                from: hold.state.as_str().to_string(),
                to: new_state.as_str().to_string(),
            });
        }

        hold.state = new_state;
        Ok(hold.clone())
    }

    async fn find_open_by_unit(&self, unit_id: Uuid) -> Result<Vec<Hold>, LedgerError> {
        let inner = self.inner.read().await;
        let ids = match inner.by_unit.get(&unit_id) {
            Some(ids) => ids,
            None => return Ok(Vec::new()),
        };
        Ok(ids
            .iter()
            .filter_map(|id| inner.holds.get(id))
            .filter(|h| matches!(h.state, HoldState::Active | HoldState::Confirmed))
            .cloned()
            .collect())
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Hold>, LedgerError> {
        let inner = self.inner.read().await;
        let ids = match inner.by_owner.get(owner_id) {
            Some(ids) => ids,
            None => return Ok(Vec::new()),
        };
        Ok(ids.iter().filter_map(|id| inner.holds.get(id)).cloned().collect())
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Hold>, LedgerError> {
        let inner = self.inner.read().await;
        Ok(inner
            .holds
            .values()
            .filter(|h| h.is_expired(now))
            .cloned()
            .collect())
    }
}
