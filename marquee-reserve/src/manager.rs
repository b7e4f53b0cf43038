use crate::availability::{self, TierAvailability, UnitAvailability};
use crate::clock::Clock;
use crate::hold::{Hold, HoldState};
use crate::ledger::{HoldLedger, LedgerError};
use chrono::Duration;
use marquee_catalog::{Catalog, CatalogError, SellableUnit};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Attempts per operation before a transient storage failure is surfaced.
const STORAGE_RETRIES: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum ReserveError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient availability: requested {requested}, available {available}")]
    InsufficientAvailability { requested: i32, available: i32 },

    #[error("Hold does not belong to the caller")]
    Forbidden,

    #[error("Hold is no longer active")]
    AlreadyFinalized,

    #[error("Hold has expired")]
    Expired,

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<LedgerError> for ReserveError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(id) => ReserveError::NotFound(format!("hold {}", id)),
            LedgerError::InvalidTransition { from, to } => {
                ReserveError::InvalidTransition { from, to }
            }
            LedgerError::Unavailable(msg) => ReserveError::StorageUnavailable(msg),
        }
    }
}

impl From<CatalogError> for ReserveError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::EventNotFound(id) => ReserveError::NotFound(format!("event {}", id)),
            CatalogError::Unavailable(msg) => ReserveError::StorageUnavailable(msg),
        }
    }
}

/// The only writer of the hold ledger.
///
/// Serializes every read-compute-write sequence per unit behind a per-unit
/// async mutex, which is what makes the capacity check-then-insert atomic
/// and keeps the no-oversell invariant under concurrent requests.
/// Operations on different units never contend.
pub struct ReservationManager {
    catalog: Arc<dyn Catalog>,
    ledger: Arc<dyn HoldLedger>,
    clock: Arc<dyn Clock>,
    hold_duration: Duration,
    unit_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ReservationManager {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        ledger: Arc<dyn HoldLedger>,
        clock: Arc<dyn Clock>,
        hold_duration: Duration,
    ) -> Self {
        Self {
            catalog,
            ledger,
            clock,
            hold_duration,
            unit_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Place a hold on `quantity` spots of a unit.
    ///
    /// Availability is recomputed inside the unit's critical section right
    /// before the insert; when two requests race for the last spots, the
    /// first to commit wins and the loser gets `InsufficientAvailability`.
    pub async fn request_hold(
        &self,
        unit_id: Uuid,
        owner_id: &str,
        quantity: i32,
    ) -> Result<Hold, ReserveError> {
        if quantity < 1 {
            return Err(ReserveError::InvalidInput(format!(
                "quantity must be at least 1, got {}",
                quantity
            )));
        }

        let unit = self
            .catalog
            .get_unit(unit_id)
            .await?
            .ok_or_else(|| ReserveError::NotFound(format!("unit {}", unit_id)))?;

        let lock = self.unit_lock(unit_id).await;
        let _guard = lock.lock().await;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.checked_insert(&unit, owner_id, quantity).await {
                Err(ReserveError::StorageUnavailable(_)) if attempt < STORAGE_RETRIES => continue,
                other => return other,
            }
        }
    }

    /// Capacity check plus insert. Only ever called with the unit lock held.
    async fn checked_insert(
        &self,
        unit: &SellableUnit,
        owner_id: &str,
        quantity: i32,
    ) -> Result<Hold, ReserveError> {
        let now = self.clock.now();
        let holds = self.ledger.find_open_by_unit(unit.id).await?;
        let available = availability::available_quantity(unit, &holds, now);

        if quantity > available {
            return Err(ReserveError::InsufficientAvailability {
                requested: quantity,
                available,
            });
        }

        let hold = Hold::new(unit.id, owner_id, quantity, now, self.hold_duration);
        self.ledger.insert(&hold).await?;
        Ok(hold)
    }

    /// Finalize a hold after payment capture.
    ///
    /// Re-checks the TTL at confirm time: an expired hold cannot be
    /// confirmed no matter whether the reaper has swept it yet.
    pub async fn confirm_hold(&self, hold_id: Uuid, owner_id: &str) -> Result<Hold, ReserveError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_confirm(hold_id, owner_id).await {
                Err(ReserveError::StorageUnavailable(_)) if attempt < STORAGE_RETRIES => continue,
                other => return other,
            }
        }
    }

    async fn try_confirm(&self, hold_id: Uuid, owner_id: &str) -> Result<Hold, ReserveError> {
        let hold = self
            .ledger
            .get(hold_id)
            .await?
            .ok_or_else(|| ReserveError::NotFound(format!("hold {}", hold_id)))?;

        if hold.owner_id != owner_id {
            return Err(ReserveError::Forbidden);
        }
        if hold.state.is_terminal() {
            return Err(ReserveError::AlreadyFinalized);
        }

        let now = self.clock.now();
        if hold.expires_at <= now {
            // Catch the ledger up; ignore a race with the reaper.
            let _ = self.ledger.update_state(hold_id, HoldState::Expired).await;
            return Err(ReserveError::Expired);
        }

        match self.ledger.update_state(hold_id, HoldState::Confirmed).await {
            Ok(confirmed) => Ok(confirmed),
            // Another finalizer committed between our read and this write
            Err(LedgerError::InvalidTransition { .. }) => Err(ReserveError::AlreadyFinalized),
            Err(e) => Err(e.into()),
        }
    }

    /// Give a hold back.
    ///
    /// Idempotent over terminal outcomes: releasing a hold that already
    /// ended up `Released` or `Expired` is a success, because a cancel
    /// action racing the reaper cannot know which terminal state won.
    pub async fn release_hold(&self, hold_id: Uuid, owner_id: &str) -> Result<Hold, ReserveError> {
        let hold = self
            .ledger
            .get(hold_id)
            .await?
            .ok_or_else(|| ReserveError::NotFound(format!("hold {}", hold_id)))?;

        if hold.owner_id != owner_id {
            return Err(ReserveError::Forbidden);
        }

        match hold.state {
            HoldState::Released | HoldState::Expired => Ok(hold),
            HoldState::Confirmed => Err(ReserveError::AlreadyFinalized),
            HoldState::Active => {
                let now = self.clock.now();
                let target = if hold.expires_at <= now {
                    HoldState::Expired
                } else {
                    HoldState::Released
                };

                match self.ledger.update_state(hold_id, target).await {
                    Ok(updated) => Ok(updated),
                    Err(LedgerError::InvalidTransition { .. }) => {
                        // Lost a race; report whatever terminal state won.
                        let current = self
                            .ledger
                            .get(hold_id)
                            .await?
                            .ok_or_else(|| ReserveError::NotFound(format!("hold {}", hold_id)))?;
                        match current.state {
                            HoldState::Released | HoldState::Expired => Ok(current),
                            _ => Err(ReserveError::AlreadyFinalized),
                        }
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    /// Mark every active hold past its TTL as `Expired`.
    ///
    /// Advisory bookkeeping only: capacity checks apply logical expiry on
    /// their own, so a late sweep never changes an accept/reject decision.
    /// Returns the number of holds swept.
    pub async fn reap_expired(&self) -> Result<usize, ReserveError> {
        let now = self.clock.now();
        let expired = self.ledger.find_expired(now).await?;

        let mut reaped = 0;
        for hold in expired {
            match self.ledger.update_state(hold.id, HoldState::Expired).await {
                Ok(_) => reaped += 1,
                // Confirmed or released since the scan; leave it be
                Err(LedgerError::InvalidTransition { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(reaped)
    }

    /// Read-only availability snapshot for one unit. No side effects.
    pub async fn unit_availability(&self, unit_id: Uuid) -> Result<UnitAvailability, ReserveError> {
        let unit = self
            .catalog
            .get_unit(unit_id)
            .await?
            .ok_or_else(|| ReserveError::NotFound(format!("unit {}", unit_id)))?;
        let holds = self.ledger.find_open_by_unit(unit_id).await?;
        Ok(availability::unit_availability(&unit, &holds, self.clock.now()))
    }

    /// Read-only availability for every unit of a tier.
    pub async fn tier_unit_availability(
        &self,
        event_id: Uuid,
        tier_name: &str,
    ) -> Result<Vec<UnitAvailability>, ReserveError> {
        let units = self.catalog.list_units(event_id, tier_name).await?;
        let now = self.clock.now();
        let mut out = Vec::with_capacity(units.len());
        for unit in &units {
            let holds = self.ledger.find_open_by_unit(unit.id).await?;
            out.push(availability::unit_availability(unit, &holds, now));
        }
        Ok(out)
    }

    /// Read-only aggregate availability for one tier.
    pub async fn tier_availability(
        &self,
        event_id: Uuid,
        tier_name: &str,
    ) -> Result<TierAvailability, ReserveError> {
        let units = self.catalog.list_units(event_id, tier_name).await?;
        let mut holds_by_unit = HashMap::new();
        for unit in &units {
            holds_by_unit.insert(unit.id, self.ledger.find_open_by_unit(unit.id).await?);
        }
        Ok(availability::tier_availability(
            event_id,
            tier_name,
            &units,
            &holds_by_unit,
            self.clock.now(),
        ))
    }

    /// Aggregate availability for every tier of an event.
    pub async fn list_tier_availability(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<TierAvailability>, ReserveError> {
        let tiers = self.catalog.list_tiers(event_id).await?;
        let mut out = Vec::with_capacity(tiers.len());
        for tier in tiers {
            out.push(self.tier_availability(event_id, &tier.tier_name).await?);
        }
        Ok(out)
    }

    /// All holds ever placed by an owner, newest state included.
    pub async fn holds_for_owner(&self, owner_id: &str) -> Result<Vec<Hold>, ReserveError> {
        Ok(self.ledger.find_by_owner(owner_id).await?)
    }

    async fn unit_lock(&self, unit_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.unit_locks.lock().await;
        locks
            .entry(unit_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
