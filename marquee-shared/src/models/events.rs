use uuid::Uuid;

/// Lifecycle change of a hold, published to Kafka and pushed to event-page
/// SSE subscribers. `available_quantity` is the unit's availability after
/// the change.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct HoldActivityEvent {
    pub hold_id: Uuid,
    pub event_id: Uuid,
    pub unit_id: Uuid,
    pub tier_name: String,
    pub activity: HoldActivity,
    pub quantity: i32,
    pub available_quantity: i32,
    pub occurred_at: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldActivity {
    Created,
    Confirmed,
    Released,
}

impl HoldActivity {
    /// Kafka topic this activity is published to.
    pub fn topic(&self) -> &'static str {
        match self {
            HoldActivity::Created => "holds.created",
            HoldActivity::Confirmed => "holds.confirmed",
            HoldActivity::Released => "holds.released",
        }
    }
}
