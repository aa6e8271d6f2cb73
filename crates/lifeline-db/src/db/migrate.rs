//! Embedded schema migrations, applied at server startup.

use diesel::Connection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::error::DbError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// ## Summary
/// Applies all pending migrations over a blocking connection.
///
/// Diesel's migration harness is synchronous, so this runs on the blocking
/// thread pool rather than holding an async pool slot.
///
/// ## Errors
/// Returns an error if a connection cannot be established or a migration
/// fails to apply.
#[tracing::instrument(skip(database_url))]
pub async fn run_pending(database_url: &str) -> Result<(), DbError> {
    let url = database_url.to_owned();

    tokio::task::spawn_blocking(move || {
        let mut conn = diesel::PgConnection::establish(&url)
            .map_err(|e| DbError::MigrationError(format!("failed to connect: {e}")))?;

        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::MigrationError(e.to_string()))?;

        for version in &applied {
            tracing::info!(migration = %version, "Applied migration");
        }

        Ok(())
    })
    .await
    .map_err(|e| DbError::MigrationError(format!("migration task panicked: {e}")))?
}
