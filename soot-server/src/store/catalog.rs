//! Per-house lookup lists tasks link to: zones, categories, animals and people.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use soot_core::SootError;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use super::new_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Zone,
    Category,
    Animal,
    Person,
}

impl CatalogKind {
    /// Path segment used by the HTTP routes.
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogKind::Zone => "zones",
            CatalogKind::Category => "categories",
            CatalogKind::Animal => "animals",
            CatalogKind::Person => "people",
        }
    }

    pub fn table(&self) -> &'static str {
        // Tables are named after the path segment.
        self.as_str()
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CatalogKind {
    type Err = SootError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zones" => Ok(CatalogKind::Zone),
            "categories" => Ok(CatalogKind::Category),
            "animals" => Ok(CatalogKind::Animal),
            "people" => Ok(CatalogKind::Person),
            _ => Err(SootError::not_found("Liste")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub house_id: String,
    pub name: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn from_row(row: &SqliteRow) -> sqlx::Result<CatalogEntry> {
    Ok(CatalogEntry {
        id: row.try_get("id")?,
        house_id: row.try_get("house_id")?,
        name: row.try_get("name")?,
        color: row.try_get("color")?,
        created_at: row.try_get("created_at")?,
    })
}

pub async fn list(pool: &SqlitePool, kind: CatalogKind, house_id: &str) -> Result<Vec<CatalogEntry>> {
    let rows = sqlx::query(&format!(
        "SELECT id, house_id, name, color, created_at FROM {} WHERE house_id = ? ORDER BY name, id",
        kind.table()
    ))
    .bind(house_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(from_row).collect::<sqlx::Result<_>>()?)
}

pub async fn create(
    pool: &SqlitePool,
    kind: CatalogKind,
    house_id: &str,
    name: &str,
    color: Option<&str>,
) -> Result<CatalogEntry> {
    let entry = CatalogEntry {
        id: new_id(),
        house_id: house_id.to_string(),
        name: name.to_string(),
        color: color.map(str::to_string),
        created_at: Utc::now(),
    };

    sqlx::query(&format!(
        "INSERT INTO {} (id, house_id, name, color, created_at) VALUES (?, ?, ?, ?, ?)",
        kind.table()
    ))
    .bind(&entry.id)
    .bind(&entry.house_id)
    .bind(&entry.name)
    .bind(&entry.color)
    .bind(entry.created_at)
    .execute(pool)
    .await?;

    info!(target: "soot", event = "catalog_entry_created", kind = %kind, id = %entry.id, house_id);
    Ok(entry)
}

/// Whether `id` names a row of `table` belonging to `house_id`.
pub(crate) async fn exists_in_house(pool: &SqlitePool, table: &str, house_id: &str, id: &str) -> Result<bool> {
    let row = sqlx::query(&format!("SELECT 1 FROM {table} WHERE id = ? AND house_id = ?"))
        .bind(id)
        .bind(house_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}
