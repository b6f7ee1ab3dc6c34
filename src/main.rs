//! Course catalog server.
//!
//! Reads settings from the environment (and `.env`), migrates, seeds, then serves.
//!   DATABASE_URL=postgres://localhost/course_catalog cargo run

use course_catalog::{run, AppConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("course_catalog=info,tower_http=info")),
        )
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return Err(e.into());
        }
    };
    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "startup failed");
        return Err(e.into());
    }
    Ok(())
}
