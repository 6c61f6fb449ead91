pub mod models;
pub mod schema;

use diesel::r2d2::{self, ConnectionManager};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;
pub type DbConn = r2d2::PooledConnection<ConnectionManager<SqliteConnection>>;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database initialization error: {0}")]
    Init(String),
    #[error("database migration error: {0}")]
    Migration(String),
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::Error),
    #[error("diesel error: {0}")]
    Diesel(#[from] diesel::result::Error),
}

/// Build a connection pool against `database_url` (a file path or
/// `:memory:`) and run pending migrations. Unlike the desktop app this
/// replaces, there is no `AppHandle`-resolved data directory: the caller
/// supplies the path directly (from `AppConfig::store.database_url`, itself
/// overridable via the `DatabaseURL` environment variable).
pub fn init(database_url: &str) -> Result<DbPool, DbError> {
    tracing::info!(database_url, "initializing database");

    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = r2d2::Pool::builder()
        .max_size(10)
        .build(manager)
        .map_err(|e| DbError::Init(format!("failed to create connection pool: {e}")))?;

    let mut conn = pool
        .get()
        .map_err(|e| DbError::Init(format!("failed to get database connection: {e}")))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| DbError::Migration(e.to_string()))?;

    tracing::info!("database initialized successfully");
    Ok(pool)
}
