use std::time::Duration;

use db_migration::Migrator;
use sea_orm::{
    ConnectOptions, Database, DatabaseConnection,
    sqlx::sqlite::{SqliteJournalMode, SqliteSynchronous},
};
use sea_orm_migration::MigratorTrait;
use utils::assets::asset_dir;

pub mod entities;
pub mod models;
mod retry;
pub mod types;

pub use sea_orm::{ConnectionTrait, DbErr, TransactionTrait};

pub type DbPool = DatabaseConnection;

const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Clone)]
pub struct DBService {
    pub pool: DbPool,
}

impl DBService {
    /// Connects to `DATABASE_URL`, or the sqlite file in the asset dir, and applies migrations.
    pub async fn new() -> Result<DBService, DbErr> {
        let database_url = match std::env::var(DATABASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => format!(
                "sqlite://{}?mode=rwc",
                asset_dir().join("db.sqlite").to_string_lossy()
            ),
        };
        Self::connect(&database_url).await
    }

    pub async fn connect(database_url: &str) -> Result<DBService, DbErr> {
        let mut options = ConnectOptions::new(database_url.to_string());
        options.sqlx_logging(false);
        if !database_url.contains(":memory:") {
            options.map_sqlx_sqlite_opts(|opts| {
                opts.journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal)
                    .busy_timeout(Duration::from_secs(30))
                    .foreign_keys(true)
            });
        }

        let pool = Database::connect(options).await?;
        Migrator::up(&pool, None).await?;
        tracing::debug!("Database ready at {}", redact_url(database_url));
        Ok(DBService { pool })
    }
}

fn redact_url(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
