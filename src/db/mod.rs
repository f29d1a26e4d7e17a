/// Database layer for Clipstream
///
/// Manages the SQLite connection pool and embedded migrations, and holds the
/// transaction helpers every state transition in the core goes through.

pub mod models;

use crate::error::{AppError, AppResult};
use sqlx::sqlite::SqlitePool;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
    /// How long a writer waits for the database write lock
    pub busy_timeout: Duration,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Create a SQLite connection pool
pub async fn create_pool(path: &Path, options: DatabaseOptions) -> AppResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(if options.enable_wal {
                    sqlx::sqlite::SqliteJournalMode::Wal
                } else {
                    sqlx::sqlite::SqliteJournalMode::Delete
                })
                .foreign_keys(true)
                .busy_timeout(options.busy_timeout),
        )
        .await?;

    Ok(pool)
}

/// Run migrations for a database
/// Migrations are embedded at compile time from ./migrations directory
pub async fn run_migrations(pool: &SqlitePool) -> AppResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;

    Ok(())
}

/// Test database connection
pub async fn test_connection(pool: &SqlitePool) -> AppResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

/// Run `fut` under a caller-supplied deadline.
///
/// On expiry the future is dropped, which drops any open `sqlx::Transaction`
/// it owns and rolls it back; no partial mutation survives.
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(?deadline, "operation cancelled at deadline");
            Err(AppError::DeadlineExceeded(deadline))
        }
    }
}

/// Whether `err` is a UNIQUE / PRIMARY KEY constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// File-backed pool with migrations applied, for tests
#[cfg(test)]
pub(crate) async fn test_pool() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let pool = create_pool(&dir.path().join("test.sqlite"), DatabaseOptions::default())
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    (dir, pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    async fn user_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let (_dir, pool) = test_pool().await;

        {
            let mut tx = pool.begin().await.unwrap();
            sqlx::query("INSERT INTO users (uid, username, created_at) VALUES (?1, ?2, ?3)")
                .bind("u1")
                .bind("alice")
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .unwrap();
            // dropped without commit
        }

        assert_eq!(user_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_deadline_cancels_and_rolls_back() {
        let (_dir, pool) = test_pool().await;

        let result: AppResult<()> = with_deadline(Duration::from_millis(50), async {
            let mut tx = pool.begin().await?;
            sqlx::query("INSERT INTO users (uid, username, created_at) VALUES (?1, ?2, ?3)")
                .bind("u1")
                .bind("alice")
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
            tokio::time::sleep(Duration::from_secs(5)).await;
            tx.commit().await?;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(AppError::DeadlineExceeded(_))));
        assert_eq!(user_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_unique_violation_detection() {
        let (_dir, pool) = test_pool().await;

        let insert = || {
            sqlx::query("INSERT INTO users (uid, username, created_at) VALUES (?1, ?2, ?3)")
                .bind("u1")
                .bind("alice")
                .bind(Utc::now())
                .execute(&pool)
        };

        insert().await.unwrap();
        let err = insert().await.unwrap_err();
        assert!(is_unique_violation(&err));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
