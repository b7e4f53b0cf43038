use marquee_reserve::ReservationManager;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

/// Periodic sweep marking expired holds. Bookkeeping only: capacity checks
/// apply logical expiry on their own, so this loop can lag or fail without
/// affecting accept/reject decisions.
pub async fn start_reaper(manager: Arc<ReservationManager>, interval: Duration) {
    info!("Hold reaper started, sweeping every {:?}", interval);

    loop {
        sleep(interval).await;

        match manager.reap_expired().await {
            Ok(0) => {}
            Ok(count) => info!("Reaped {} expired holds", count),
            Err(e) => error!("Reaper sweep failed: {}", e),
        }
    }
}
