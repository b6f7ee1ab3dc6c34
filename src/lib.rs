//! Course catalog backend: courses and lessons on PostgreSQL, with identity and startup seeding.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod host;
pub mod identity;
pub mod migration;
pub mod model;
pub mod response;
pub mod routes;
pub mod seed;
pub mod service;
pub mod state;
pub mod storage;
pub mod store;

pub use config::{AppConfig, Environment};
pub use error::{AppError, ConfigError, HostError, StorageError};
pub use host::{run, BootPhase, Host};
pub use migration::apply_migrations;
pub use response::{error_body, success_many, success_one};
pub use routes::app_router;
pub use seed::{SeedReport, Seeder};
pub use state::AppState;
pub use store::ensure_database_exists;

/// Local calendar date, used for release and creation dates.
pub fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
