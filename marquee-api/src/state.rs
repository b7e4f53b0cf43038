use marquee_reserve::ReservationManager;
use marquee_shared::models::events::HoldActivityEvent;
use marquee_store::app_config::BusinessRules;
use marquee_store::{EventProducer, RedisClient};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ReservationManager>,
    pub redis: Arc<RedisClient>,
    pub kafka: Arc<EventProducer>,
    pub sse_tx: broadcast::Sender<HoldActivityEvent>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}
