//! Database migration command.
//!
//! ```bash
//! furnish migrate
//! ```
//!
//! Applies `crates/storefront/migrations/` and creates the session table used
//! by `tower-sessions-sqlx-store`.

use tower_sessions_sqlx_store::PostgresStore;

use super::{CliError, connect};

/// Run all storefront migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Creating session store table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
