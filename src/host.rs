//! Boot sequence: configure, migrate, seed, serve.
//!
//! Configure and migrate failures abort startup. Seeding is best-effort: a failure is
//! logged and the server starts anyway.

use crate::config::AppConfig;
use crate::error::HostError;
use crate::migration::apply_migrations;
use crate::routes::app_router;
use crate::seed::{SeedReport, Seeder};
use crate::state::AppState;
use crate::storage::build_storage;
use crate::store::{connect, ensure_database_exists};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootPhase {
    Configure,
    Migrate,
    Seed,
    Serve,
}

impl fmt::Display for BootPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BootPhase::Configure => "configure",
            BootPhase::Migrate => "migrate",
            BootPhase::Seed => "seed",
            BootPhase::Serve => "serve",
        })
    }
}

pub struct Host {
    config: AppConfig,
    state: AppState,
}

impl Host {
    /// Create the database if missing, open the pool and build every service.
    pub async fn configure(config: AppConfig) -> Result<Self, HostError> {
        tracing::info!(phase = %BootPhase::Configure, environment = ?config.environment, "boot");
        ensure_database_exists(&config.database_url).await?;
        let pool = connect(&config.database_url, config.max_connections).await?;
        let storage = build_storage(&config.storage, &config.web_root).await?;
        let state = AppState::new(pool, &config, storage);
        Ok(Host { config, state })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn migrate(&self) -> Result<Vec<i64>, HostError> {
        tracing::info!(phase = %BootPhase::Migrate, "boot");
        let applied = apply_migrations(&self.state.pool).await?;
        if applied.is_empty() {
            tracing::info!("schema up to date");
        } else {
            tracing::info!(versions = ?applied, "migrations applied");
        }
        Ok(applied)
    }

    pub async fn seed(&self) -> Option<SeedReport> {
        tracing::info!(phase = %BootPhase::Seed, "boot");
        seed_best_effort(&self.state.seeder()).await
    }

    /// Bind and serve until Ctrl-C.
    pub async fn serve(self) -> Result<(), HostError> {
        tracing::info!(phase = %BootPhase::Serve, addr = %self.config.bind_addr, "boot");
        let app = app_router(self.state);
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        tracing::info!("server stopped");
        Ok(())
    }
}

/// Run the seeder once. Errors are logged, never propagated.
pub async fn seed_best_effort(seeder: &Seeder) -> Option<SeedReport> {
    tracing::info!("Seeding data...");
    match seeder.seed().await {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::error!(error = %e, "An error occurred while seeding the database.");
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

/// Full boot: configure, migrate, seed, serve.
pub async fn run(config: AppConfig) -> Result<(), HostError> {
    let host = Host::configure(config).await?;
    host.migrate().await?;
    host.seed().await;
    host.serve().await
}
