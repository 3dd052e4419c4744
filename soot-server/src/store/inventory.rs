//! Projects and equipment: the two inventory lists that can carry a
//! generated image.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use soot_core::SootError;
use soot_core::image_job::{ImageEntityKind, ImageState};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use super::{catalog, image_jobs, new_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryKind {
    Project,
    Equipment,
}

impl InventoryKind {
    pub fn table(&self) -> &'static str {
        self.image_kind().table()
    }

    pub fn image_kind(&self) -> ImageEntityKind {
        match self {
            InventoryKind::Project => ImageEntityKind::Project,
            InventoryKind::Equipment => ImageEntityKind::Equipment,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InventoryKind::Project => "Projet",
            InventoryKind::Equipment => "Équipement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryItem {
    pub id: String,
    pub house_id: String,
    pub name: String,
    pub description: Option<String>,
    pub zone_id: Option<String>,
    pub image_path: Option<String>,
    pub image: ImageState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewInventoryItem {
    pub name: String,
    pub description: Option<String>,
    pub zone_id: Option<String>,
}

const COLUMNS: &str = "id, house_id, name, description, zone_id, image_path, created_at, updated_at";

fn from_row(row: &SqliteRow, generating: bool) -> sqlx::Result<InventoryItem> {
    let image_path: Option<String> = row.try_get("image_path")?;
    Ok(InventoryItem {
        id: row.try_get("id")?,
        house_id: row.try_get("house_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        zone_id: row.try_get("zone_id")?,
        image: ImageState {
            has_image: image_path.as_deref().is_some_and(|p| !p.is_empty()),
            generating,
        },
        image_path,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn list(pool: &SqlitePool, kind: InventoryKind, house_id: &str, now: DateTime<Utc>) -> Result<Vec<InventoryItem>> {
    let generating = image_jobs::live_pending_ids(pool, kind.image_kind(), now).await?;
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM {} WHERE house_id = ? ORDER BY name, id",
        kind.table()
    ))
    .bind(house_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let id: String = row.try_get("id")?;
            from_row(row, generating.contains(&id))
        })
        .collect::<sqlx::Result<_>>()
        .map_err(Into::into)
}

/// House owning an inventory item, if it exists.
pub async fn house_of(pool: &SqlitePool, kind: InventoryKind, id: &str) -> Result<Option<String>> {
    let target = image_jobs::target(pool, kind.image_kind(), id).await?;
    Ok(target.map(|t| t.house_id))
}

pub async fn create(pool: &SqlitePool, kind: InventoryKind, house_id: &str, new: NewInventoryItem) -> Result<InventoryItem> {
    if let Some(zone_id) = &new.zone_id {
        if !catalog::exists_in_house(pool, "zones", house_id, zone_id).await? {
            return Err(SootError::validation("Zone inconnue pour cette maison").into());
        }
    }

    let now = Utc::now();
    let item = InventoryItem {
        id: new_id(),
        house_id: house_id.to_string(),
        name: new.name,
        description: new.description,
        zone_id: new.zone_id,
        image_path: None,
        image: ImageState::default(),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(&format!(
        "INSERT INTO {} ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        kind.table()
    ))
    .bind(&item.id)
    .bind(&item.house_id)
    .bind(&item.name)
    .bind(&item.description)
    .bind(&item.zone_id)
    .bind(&item.image_path)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(pool)
    .await?;

    info!(target: "soot", event = "inventory_item_created", table = kind.table(), id = %item.id, house_id);
    Ok(item)
}

pub async fn delete(pool: &SqlitePool, kind: InventoryKind, id: &str) -> Result<bool> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", kind.table()))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
