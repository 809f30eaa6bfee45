//! SQLite connection pool factory and migration runner.
//!
//! Modules contribute [`Migration`]s through the kernel; [`run_migrations`]
//! applies each one exactly once, tracking applied ids in `schema_migrations`.

use std::str::FromStr;
use std::time::Duration;

use bookshelf_kernel::settings::DatabaseSettings;
use bookshelf_kernel::Migration;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

/// Pool type shared by every module.
pub type Pool = SqlitePool;

const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS schema_migrations (
        module     TEXT NOT NULL,
        id         TEXT NOT NULL,
        applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (module, id)
    )
"#;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("invalid database url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to connect to database at '{url}': {source}")]
    Connect {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("migration '{module}/{id}' failed: {source}")]
    Migration {
        module: String,
        id: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open a connection pool for the configured database.
///
/// In-memory databases live only as long as their connection, so they get a
/// single connection that is never reaped.
pub async fn connect(settings: &DatabaseSettings) -> Result<Pool> {
    let options = SqliteConnectOptions::from_str(&settings.url)
        .map_err(|source| DbError::InvalidUrl {
            url: settings.url.clone(),
            source,
        })?
        .foreign_keys(true);

    let pool_options =
        SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));

    let pool_options = if settings.is_in_memory() {
        pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        pool_options.max_connections(settings.max_connections)
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(|source| DbError::Connect {
            url: settings.url.clone(),
            source,
        })?;

    tracing::info!(
        target: "bookshelf-db",
        url = %settings.url,
        in_memory = settings.is_in_memory(),
        "database pool ready"
    );

    Ok(pool)
}

/// Private in-memory database, used by tests and throwaway runs.
pub async fn connect_in_memory() -> Result<Pool> {
    connect(&DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        ..DatabaseSettings::default()
    })
    .await
}

/// Apply every migration not yet recorded, in the given order.
///
/// Each migration runs in its own transaction together with its bookkeeping
/// row. Returns the number of migrations applied by this call.
pub async fn run_migrations(pool: &Pool, migrations: &[(String, Migration)]) -> Result<usize> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let already: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM schema_migrations WHERE module = ? AND id = ?")
                .bind(module)
                .bind(migration.id)
                .fetch_optional(pool)
                .await?;

        if already.is_some() {
            tracing::debug!(module = %module, id = migration.id, "migration already applied");
            continue;
        }

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(|source| DbError::Migration {
                module: module.clone(),
                id: migration.id,
                source,
            })?;
        sqlx::query("INSERT INTO schema_migrations (module, id) VALUES (?, ?)")
            .bind(module)
            .bind(migration.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(module = %module, id = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}

/// Applied migrations as `(module, id)` pairs in application order.
pub async fn applied_migrations(pool: &Pool) -> Result<Vec<(String, String)>> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT module, id FROM schema_migrations ORDER BY applied_at, module, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widgets() -> Vec<(String, Migration)> {
        vec![
            (
                "widgets".to_string(),
                Migration {
                    id: "001_init",
                    up: "CREATE TABLE widgets (id TEXT PRIMARY KEY);",
                },
            ),
            (
                "widgets".to_string(),
                Migration {
                    id: "002_name",
                    up: "ALTER TABLE widgets ADD COLUMN name TEXT;
                         CREATE INDEX widgets_name ON widgets (name);",
                },
            ),
        ]
    }

    #[tokio::test]
    async fn migrations_apply_once() {
        let pool = connect_in_memory().await.unwrap();

        assert_eq!(run_migrations(&pool, &widgets()).await.unwrap(), 2);
        assert_eq!(run_migrations(&pool, &widgets()).await.unwrap(), 0);

        let applied = applied_migrations(&pool).await.unwrap();
        assert_eq!(
            applied,
            vec![
                ("widgets".to_string(), "001_init".to_string()),
                ("widgets".to_string(), "002_name".to_string()),
            ]
        );

        sqlx::query("INSERT INTO widgets (id, name) VALUES ('w1', 'gear')")
            .execute(&pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_migration_is_not_recorded() {
        let pool = connect_in_memory().await.unwrap();
        let broken = vec![(
            "broken".to_string(),
            Migration {
                id: "001_init",
                up: "CREATE TABLE oops (",
            },
        )];

        let err = run_migrations(&pool, &broken).await.unwrap_err();
        assert!(matches!(err, DbError::Migration { id: "001_init", .. }));
        assert!(applied_migrations(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn in_memory_pool_keeps_state_between_queries() {
        let pool = connect_in_memory().await.unwrap();
        sqlx::query("CREATE TABLE t (v INTEGER)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t (v) VALUES (7)")
            .execute(&pool)
            .await
            .unwrap();
        let v: i64 = sqlx::query_scalar("SELECT v FROM t")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(v, 7);
    }

    #[tokio::test]
    async fn unreachable_database_is_reported() {
        let settings = DatabaseSettings {
            url: "sqlite:///nonexistent-dir/books.db".to_string(),
            ..DatabaseSettings::default()
        };
        assert!(connect(&settings).await.is_err());
    }
}
