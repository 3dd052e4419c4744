//! SQLite pool, embedded migrations and the budget table guard.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::Utc;
use soot_core::SootError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

/// Ordered migrations; the version is the file name prefix.
static MIGRATIONS: &[(&str, &str)] = &[
    ("0001_core.sql", include_str!("../migrations/0001_core.sql")),
    ("0002_budget.sql", include_str!("../migrations/0002_budget.sql")),
];

fn version_of(name: &str) -> &str {
    name.split('_').next().unwrap_or(name)
}

/// Open (creating if needed) the database behind `url`.
pub async fn connect(url: &str) -> Result<SqlitePool> {
    if let Some(path) = url.strip_prefix("sqlite://").filter(|p| !p.starts_with(':')) {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
        }
    }

    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("Invalid database url {url}"))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database {url}"))?;

    Ok(pool)
}

async fn ensure_migrations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Versions already applied, in order.
pub async fn applied_versions(pool: &SqlitePool) -> Result<Vec<String>> {
    ensure_migrations_table(pool).await?;
    let rows = sqlx::query("SELECT version FROM schema_migrations ORDER BY version")
        .fetch_all(pool)
        .await?;
    rows.iter()
        .map(|row| row.try_get::<String, _>("version").map_err(Into::into))
        .collect()
}

/// Every known migration with whether it has been applied.
pub async fn status(pool: &SqlitePool) -> Result<Vec<(&'static str, bool)>> {
    let applied = applied_versions(pool).await?;
    Ok(MIGRATIONS
        .iter()
        .map(|(name, _)| (*name, applied.iter().any(|v| v == version_of(name))))
        .collect())
}

/// Apply every pending migration.
pub async fn migrate(pool: &SqlitePool) -> Result<Vec<&'static str>> {
    migrate_to(pool, None).await
}

/// Apply pending migrations up to and including version `target`.
pub async fn migrate_to(pool: &SqlitePool, target: Option<&str>) -> Result<Vec<&'static str>> {
    if let Some(target) = target {
        if !MIGRATIONS.iter().any(|(name, _)| version_of(name) == target) {
            anyhow::bail!("Unknown migration version {target}");
        }
    }

    let applied = applied_versions(pool).await?;
    let mut newly_applied = Vec::new();

    for (name, sql) in MIGRATIONS {
        let version = version_of(name);
        if applied.iter().any(|v| v == version) {
            continue;
        }
        if target.is_some_and(|t| version > t) {
            break;
        }

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(sql)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Migration {name} failed"))?;
        sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)")
            .bind(version)
            .bind(*name)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(target: "soot", event = "migration_applied", name = *name);
        newly_applied.push(*name);
    }

    Ok(newly_applied)
}

/// Whether `err` means the queried table does not exist yet.
///
/// SQLite reports "no such table"; Postgres uses SQLSTATE 42P01.
pub fn is_missing_table(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some("42P01") || db.message().contains("no such table")
        }
        _ => false,
    }
}

/// Rewrite a failed budget query into `BudgetNotMigrated` when the table
/// it reads does not exist yet; any other error passes through.
pub fn budget_guard(err: sqlx::Error) -> anyhow::Error {
    if is_missing_table(&err) {
        warn!(target: "soot", event = "budget_not_migrated", error = %err);
        SootError::BudgetNotMigrated.into()
    } else {
        err.into()
    }
}
