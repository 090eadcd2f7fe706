use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// DbConnection manages the SQLite pool and schema
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Open (creating if needed) the database at `url`
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::setup_schema(&pool).await?;

        info!("Database ready at {}", url);
        Ok(Self { pool: Arc::new(pool) })
    }

    /// Initialize a private in-memory test database
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        // Every `:memory:` parse yields a uniquely named shared-cache database;
        // keep one connection alive so it is not dropped between queries.
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;
        Self::setup_schema(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a transaction; dropped without commit it rolls back
    pub async fn begin(&self) -> sqlx::Result<Transaction<'static, Sqlite>> {
        self.pool.begin().await
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS organizations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                common_discount REAL,
                max_discount REAL,
                step_amount INTEGER,
                days_to_step_back INTEGER
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                login TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL,
                organization_id INTEGER,
                FOREIGN KEY (organization_id) REFERENCES organizations (id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS goals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                FOREIGN KEY (owner_id) REFERENCES organizations (id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        // Timestamps are epoch milliseconds so expiry comparisons stay numeric
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS codes (
                value TEXT PRIMARY KEY,
                code_type TEXT NOT NULL,
                content BLOB NOT NULL,
                is_valid INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL,
                expiration INTEGER NOT NULL,
                owner_id INTEGER NOT NULL,
                goal_id INTEGER,
                organization_id INTEGER,
                CHECK ((goal_id IS NULL) <> (organization_id IS NULL)),
                FOREIGN KEY (owner_id) REFERENCES users (id),
                FOREIGN KEY (goal_id) REFERENCES goals (id),
                FOREIGN KEY (organization_id) REFERENCES organizations (id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_codes_owner_id
            ON codes(owner_id, is_valid);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                description TEXT NOT NULL,
                is_recommending INTEGER NOT NULL,
                moderation_state TEXT NOT NULL DEFAULT 'on_check',
                position INTEGER NOT NULL DEFAULT 0 CHECK (position >= 0 AND position <= 6),
                owner_id INTEGER NOT NULL,
                goal_id INTEGER,
                organization_id INTEGER,
                content TEXT NOT NULL,
                code_value TEXT,
                created_at INTEGER NOT NULL,
                CHECK ((goal_id IS NULL) <> (organization_id IS NULL)),
                FOREIGN KEY (owner_id) REFERENCES users (id),
                FOREIGN KEY (goal_id) REFERENCES goals (id),
                FOREIGN KEY (organization_id) REFERENCES organizations (id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_stories_moderation_state
            ON stories(moderation_state);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS discounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                discount_percentage REAL NOT NULL,
                updated_at INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                organization_id INTEGER NOT NULL,
                UNIQUE (user_id, organization_id),
                FOREIGN KEY (user_id) REFERENCES users (id),
                FOREIGN KEY (organization_id) REFERENCES organizations (id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn test_schema_is_created_once_and_reopens() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let url = format!("sqlite://{}", dir.path().join("loyalty.db").display());

        let db = DbConnection::new(&url).await.expect("Failed to open database");
        drop(db);
        let db = DbConnection::new(&url).await.expect("Failed to reopen database");

        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(db.pool())
            .await
            .expect("Failed to list tables");
        let tables: Vec<String> = rows.iter().map(|row| row.get("name")).collect();

        for table in ["codes", "discounts", "goals", "organizations", "stories", "users"] {
            assert!(tables.contains(&table.to_string()), "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_in_memory_databases_are_isolated() {
        let first = DbConnection::init_test().await.expect("Failed to create test database");
        let second = DbConnection::init_test().await.expect("Failed to create test database");

        sqlx::query("INSERT INTO organizations (name) VALUES ('only in first')")
            .execute(first.pool())
            .await
            .expect("Failed to insert");

        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM organizations")
            .fetch_one(second.pool())
            .await
            .expect("Failed to count")
            .get("n");
        assert_eq!(count, 0);
    }
}
