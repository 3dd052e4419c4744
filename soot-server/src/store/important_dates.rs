use anyhow::Result;
use chrono::{NaiveDate, Utc};
use soot_core::important_date::{ImportantDate, ImportantDateType};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::info;

use super::new_id;

#[derive(Debug, Clone)]
pub struct NewImportantDate {
    pub title: String,
    pub date: NaiveDate,
    pub recurring_yearly: bool,
    pub date_type: ImportantDateType,
    pub notes: Option<String>,
}

/// Fields to change; `notes: Some(None)` clears the notes.
#[derive(Debug, Clone, Default)]
pub struct ImportantDatePatch {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub recurring_yearly: Option<bool>,
    pub date_type: Option<ImportantDateType>,
    pub notes: Option<Option<String>>,
}

impl ImportantDatePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.date.is_none()
            && self.recurring_yearly.is_none()
            && self.date_type.is_none()
            && self.notes.is_none()
    }
}

const COLUMNS: &str = "id, house_id, title, date, recurring_yearly, date_type, notes, created_at, updated_at";

fn from_row(row: &SqliteRow) -> Result<ImportantDate> {
    let date_type: String = row.try_get("date_type")?;
    Ok(ImportantDate {
        id: row.try_get("id")?,
        house_id: row.try_get("house_id")?,
        title: row.try_get("title")?,
        date: row.try_get("date")?,
        recurring_yearly: row.try_get("recurring_yearly")?,
        date_type: date_type.parse()?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn list(pool: &SqlitePool, house_id: &str) -> Result<Vec<ImportantDate>> {
    list_for_houses(pool, &[house_id.to_string()]).await
}

/// Important dates of every house in `house_ids`, ordered by date.
pub async fn list_for_houses(pool: &SqlitePool, house_ids: &[String]) -> Result<Vec<ImportantDate>> {
    if house_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {COLUMNS} FROM important_dates WHERE house_id IN ("));
    let mut separated = query.separated(", ");
    for id in house_ids {
        separated.push_bind(id);
    }
    query.push(") ORDER BY date, title, id");

    let rows = query.build().fetch_all(pool).await?;
    rows.iter().map(from_row).collect()
}

pub async fn get(pool: &SqlitePool, id: &str) -> Result<Option<ImportantDate>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM important_dates WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn create(pool: &SqlitePool, house_id: &str, new: NewImportantDate) -> Result<ImportantDate> {
    let now = Utc::now();
    let record = ImportantDate {
        id: new_id(),
        house_id: house_id.to_string(),
        title: new.title,
        date: new.date,
        recurring_yearly: new.recurring_yearly,
        date_type: new.date_type,
        notes: new.notes,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(&format!(
        "INSERT INTO important_dates ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&record.id)
    .bind(&record.house_id)
    .bind(&record.title)
    .bind(record.date)
    .bind(record.recurring_yearly)
    .bind(record.date_type.as_str())
    .bind(&record.notes)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    info!(target: "soot", event = "important_date_created", id = %record.id, house_id);
    Ok(record)
}

/// Apply `patch` to an existing record and return the stored result.
pub async fn update(pool: &SqlitePool, existing: ImportantDate, patch: ImportantDatePatch) -> Result<ImportantDate> {
    let updated = ImportantDate {
        title: patch.title.unwrap_or(existing.title),
        date: patch.date.unwrap_or(existing.date),
        recurring_yearly: patch.recurring_yearly.unwrap_or(existing.recurring_yearly),
        date_type: patch.date_type.unwrap_or(existing.date_type),
        notes: patch.notes.unwrap_or(existing.notes),
        updated_at: Utc::now(),
        ..existing
    };

    sqlx::query(
        "UPDATE important_dates
            SET title = ?, date = ?, recurring_yearly = ?, date_type = ?, notes = ?, updated_at = ?
          WHERE id = ?",
    )
    .bind(&updated.title)
    .bind(updated.date)
    .bind(updated.recurring_yearly)
    .bind(updated.date_type.as_str())
    .bind(&updated.notes)
    .bind(updated.updated_at)
    .bind(&updated.id)
    .execute(pool)
    .await?;

    info!(target: "soot", event = "important_date_updated", id = %updated.id);
    Ok(updated)
}

pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM important_dates WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    info!(target: "soot", event = "important_date_deleted", id);
    Ok(result.rows_affected() > 0)
}
