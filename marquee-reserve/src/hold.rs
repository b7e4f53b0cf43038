use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hold lifecycle. `Active` is the only non-terminal state; every
/// transition out of it is final.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldState {
    Active,
    Confirmed,
    Released,
    Expired,
}

impl HoldState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, HoldState::Active)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: HoldState) -> bool {
        matches!(self, HoldState::Active) && next != HoldState::Active
    }

    /// Storage representation, shared by every ledger implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldState::Active => "ACTIVE",
            HoldState::Confirmed => "CONFIRMED",
            HoldState::Released => "RELEASED",
            HoldState::Expired => "EXPIRED",
        }
    }

    pub fn parse(s: &str) -> Option<HoldState> {
        match s {
            "ACTIVE" => Some(HoldState::Active),
            "CONFIRMED" => Some(HoldState::Confirmed),
            "RELEASED" => Some(HoldState::Released),
            "EXPIRED" => Some(HoldState::Expired),
            _ => None,
        }
    }
}

/// A reservation against one sellable unit.
///
/// Holds are created only by the reservation manager and are never
/// physically deleted; terminal rows stay in the ledger for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hold {
    pub id: Uuid,
    pub unit_id: Uuid,
    /// JWT subject of the requester: an account id or an anonymous guest
    /// session id.
    pub owner_id: String,
    pub quantity: i32,
    pub state: HoldState,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Hold {
    pub fn new(
        unit_id: Uuid,
        owner_id: impl Into<String>,
        quantity: i32,
        now: DateTime<Utc>,
        hold_duration: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            unit_id,
            owner_id: owner_id.into(),
            quantity,
            state: HoldState::Active,
            created_at: now,
            expires_at: now + hold_duration,
        }
    }

    /// Logically expired: still `Active` in the ledger but past its TTL.
    /// The reaper may not have caught up yet; callers must treat such a
    /// hold as dead regardless.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.state == HoldState::Active && self.expires_at <= now
    }

    /// Whether this hold still consumes capacity at `now`. Confirmed holds
    /// always do; active holds only until their TTL.
    pub fn counts_against_capacity(&self, now: DateTime<Utc>) -> bool {
        match self.state {
            HoldState::Confirmed => true,
            HoldState::Active => self.expires_at > now,
            HoldState::Released | HoldState::Expired => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hold(now: DateTime<Utc>) -> Hold {
        Hold::new(Uuid::new_v4(), "owner-1", 2, now, Duration::minutes(10))
    }

    #[test]
    fn test_new_hold_is_active_with_ttl() {
        let now = Utc::now();
        let hold = sample_hold(now);
        assert_eq!(hold.state, HoldState::Active);
        assert_eq!(hold.expires_at, now + Duration::minutes(10));
    }

    #[test]
    fn test_transitions_only_leave_active() {
        assert!(HoldState::Active.can_transition_to(HoldState::Confirmed));
        assert!(HoldState::Active.can_transition_to(HoldState::Released));
        assert!(HoldState::Active.can_transition_to(HoldState::Expired));
        assert!(!HoldState::Active.can_transition_to(HoldState::Active));

        assert!(!HoldState::Confirmed.can_transition_to(HoldState::Active));
        assert!(!HoldState::Confirmed.can_transition_to(HoldState::Released));
        assert!(!HoldState::Released.can_transition_to(HoldState::Confirmed));
        assert!(!HoldState::Expired.can_transition_to(HoldState::Confirmed));
    }

    #[test]
    fn test_logical_expiry() {
        let now = Utc::now();
        let hold = sample_hold(now);

        assert!(!hold.is_expired(now));
        assert!(!hold.is_expired(now + Duration::minutes(9)));
        // Boundary: expires_at <= now counts as expired
        assert!(hold.is_expired(now + Duration::minutes(10)));
        assert!(hold.is_expired(now + Duration::minutes(11)));
    }

    #[test]
    fn test_capacity_accounting_per_state() {
        let now = Utc::now();
        let mut hold = sample_hold(now);

        assert!(hold.counts_against_capacity(now));
        assert!(!hold.counts_against_capacity(now + Duration::minutes(10)));

        hold.state = HoldState::Confirmed;
        // Confirmed holds never age out
        assert!(hold.counts_against_capacity(now + Duration::days(30)));

        hold.state = HoldState::Released;
        assert!(!hold.counts_against_capacity(now));

        hold.state = HoldState::Expired;
        assert!(!hold.counts_against_capacity(now));
    }

    #[test]
    fn test_state_round_trips_through_storage_form() {
        for state in [
            HoldState::Active,
            HoldState::Confirmed,
            HoldState::Released,
            HoldState::Expired,
        ] {
            assert_eq!(HoldState::parse(state.as_str()), Some(state));
        }
        assert_eq!(HoldState::parse("PENDING"), None);
    }
}
