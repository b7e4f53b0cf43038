pub mod app_config;
pub mod catalog_repo;
pub mod database;
pub mod events;
pub mod ledger_repo;
pub mod redis_repo;

pub use catalog_repo::PgCatalog;
pub use database::DbClient;
pub use events::EventProducer;
pub use ledger_repo::PgHoldLedger;
pub use redis_repo::RedisClient;
