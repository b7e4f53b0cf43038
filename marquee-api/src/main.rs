use marquee_api::{
    app,
    state::{AppState, AuthConfig},
    worker,
};
use marquee_reserve::{ReservationManager, SystemClock};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = marquee_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Marquee API on port {}", config.server.port);

    let db = marquee_store::DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let redis = Arc::new(
        marquee_store::RedisClient::new(&config.redis.url)
            .await
            .expect("Failed to create Redis client"),
    );

    let kafka = Arc::new(
        marquee_store::EventProducer::new(&config.kafka.brokers)
            .expect("Failed to create Kafka producer"),
    );

    let manager = Arc::new(ReservationManager::new(
        Arc::new(marquee_store::PgCatalog::new(db.pool.clone())),
        Arc::new(marquee_store::PgHoldLedger::new(db.pool.clone())),
        Arc::new(SystemClock),
        chrono::Duration::seconds(config.business_rules.hold_duration_seconds as i64),
    ));

    // Expired-hold sweep
    tokio::spawn(worker::start_reaper(
        manager.clone(),
        std::time::Duration::from_secs(config.business_rules.reaper_interval_seconds),
    ));

    // SSE fan-out channel
    let (sse_tx, _) = tokio::sync::broadcast::channel(100);

    let app_state = AppState {
        manager,
        redis,
        kafka,
        sse_tx,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        business_rules: config.business_rules.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
