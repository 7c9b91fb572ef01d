//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! tidepool-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `TIDEPOOL_DATABASE_URL` - `PostgreSQL` connection string
//!
//! Migration files live in `crates/storefront/migrations/` and are embedded
//! into the binary at compile time.

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tracing::info;

use super::CommandError;

/// Run storefront database migrations.
pub async fn run() -> Result<(), CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("TIDEPOOL_DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("TIDEPOOL_DATABASE_URL"))?;

    info!("Connecting to database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    info!("Running migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    info!("Migrations complete!");
    Ok(())
}
