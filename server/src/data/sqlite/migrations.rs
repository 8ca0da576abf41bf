//! Database migration system
//!
//! Version 1 is the initial schema; later versions are applied incrementally
//! and recorded with a checksum in `schema_migrations`.

use sqlx::SqlitePool;

use super::error::SqliteError;
use super::schema::{MIGRATION_V2, SCHEMA, SCHEMA_VERSION};
use crate::utils::crypto::sha256_hex;

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteError> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        tracing::debug!("Initializing database with initial schema");
        apply_initial_schema(pool).await?;
    }

    let current_version: i32 =
        sqlx::query_scalar("SELECT version FROM schema_version WHERE id = 1")
            .fetch_optional(pool)
            .await?
            .unwrap_or(0);

    if current_version >= SCHEMA_VERSION {
        tracing::debug!(
            "Database schema is up to date (version {})",
            current_version
        );
        return Ok(());
    }

    for version in (current_version + 1)..=SCHEMA_VERSION {
        tracing::debug!("Applying migration to version {}", version);
        apply_migration(pool, version).await?;
    }

    Ok(())
}

async fn apply_initial_schema(pool: &SqlitePool) -> Result<(), SqliteError> {
    let start = std::time::Instant::now();

    let mut tx = pool.begin().await?;

    sqlx::query(SCHEMA).execute(&mut *tx).await?;

    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        "INSERT INTO schema_version (id, version, applied_at, description) VALUES (1, 1, ?, 'Initial schema')",
    )
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let checksum = sha256_hex(SCHEMA);
    let elapsed_ms = start.elapsed().as_millis() as i64;
    sqlx::query(
        "INSERT INTO schema_migrations (version, name, applied_at, checksum, execution_time_ms, success) VALUES (1, ?, ?, ?, ?, 1)",
    )
    .bind("initial_schema")
    .bind(now)
    .bind(&checksum)
    .bind(elapsed_ms)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::debug!("Applied initial schema in {}ms", elapsed_ms);
    Ok(())
}

async fn apply_migration(pool: &SqlitePool, version: i32) -> Result<(), SqliteError> {
    match version {
        1 => Ok(()),
        2 => apply_versioned_migration(pool, 2, "identity_indexes", MIGRATION_V2).await,
        _ => Err(SqliteError::MigrationFailed {
            version,
            name: "unknown".to_string(),
            error: format!("Unknown migration version: {}", version),
        }),
    }
}

/// Apply a versioned migration with tracking
async fn apply_versioned_migration(
    pool: &SqlitePool,
    version: i32,
    name: &str,
    sql: &str,
) -> Result<(), SqliteError> {
    let start = std::time::Instant::now();

    let mut tx = pool.begin().await?;

    // SQLite prepares one statement at a time
    for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .map_err(|e| SqliteError::MigrationFailed {
                version,
                name: name.to_string(),
                error: format!(
                    "Failed at statement: {} - {}",
                    &statement[..statement.len().min(50)],
                    e
                ),
            })?;
    }

    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        "UPDATE schema_version SET version = ?, applied_at = ?, description = ? WHERE id = 1",
    )
    .bind(version)
    .bind(now)
    .bind(name)
    .execute(&mut *tx)
    .await?;

    let checksum = sha256_hex(sql);
    let elapsed_ms = start.elapsed().as_millis() as i64;
    sqlx::query(
        "INSERT INTO schema_migrations (version, name, applied_at, checksum, execution_time_ms, success) VALUES (?, ?, ?, ?, ?, 1)",
    )
    .bind(version)
    .bind(name)
    .bind(now)
    .bind(&checksum)
    .bind(elapsed_ms)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::debug!(
        "Applied migration v{} ({}) in {}ms",
        version,
        name,
        elapsed_ms
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::test_pool_without_migrations;

    #[tokio::test]
    async fn test_fresh_database_reaches_current_version() {
        let pool = test_pool_without_migrations().await;
        run_migrations(&pool).await.unwrap();

        let version: i32 = sqlx::query_scalar("SELECT version FROM schema_version WHERE id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);

        let recorded: Vec<(i32, String)> =
            sqlx::query_as("SELECT version, checksum FROM schema_migrations ORDER BY version")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(recorded.len(), SCHEMA_VERSION as usize);
        assert_eq!(recorded[0].1, sha256_hex(SCHEMA));
        assert_eq!(recorded[1].1, sha256_hex(MIGRATION_V2));
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = test_pool_without_migrations().await;
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, SCHEMA_VERSION as i64);
    }

    #[tokio::test]
    async fn test_unknown_version_fails() {
        let pool = test_pool_without_migrations().await;
        let err = apply_migration(&pool, 99).await.unwrap_err();
        assert!(matches!(err, SqliteError::MigrationFailed { version: 99, .. }));
    }
}
