//! Image generation job records.
//!
//! At most one live pending job exists per entity. Expiry is evaluated in
//! Rust against `now`, never by the database clock.

use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use soot_core::SootError;
use soot_core::image_job::{EXPIRED_JOB_ERROR, ImageEntityKind, ImageJob, JobStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{info, warn};

use super::new_id;

/// What a worker reports when it is done with a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded { image_path: String },
    Failed { error: String },
}

const COLUMNS: &str = "id, entity_kind, entity_id, status, owner, expires_at, error, created_at, updated_at";

fn from_row(row: &SqliteRow) -> Result<ImageJob> {
    let kind: String = row.try_get("entity_kind")?;
    let status: String = row.try_get("status")?;
    Ok(ImageJob {
        id: row.try_get("id")?,
        entity_kind: kind.parse()?,
        entity_id: row.try_get("entity_id")?,
        status: status.parse()?,
        owner: row.try_get("owner")?,
        expires_at: row.try_get("expires_at")?,
        error: row.try_get("error")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn get(pool: &SqlitePool, job_id: &str) -> Result<Option<ImageJob>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM image_jobs WHERE id = ?"))
        .bind(job_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(from_row).transpose()
}

/// Most recent job for an entity.
pub async fn latest(pool: &SqlitePool, kind: ImageEntityKind, entity_id: &str) -> Result<Option<ImageJob>> {
    let row = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM image_jobs
          WHERE entity_kind = ? AND entity_id = ?
          ORDER BY created_at DESC, id DESC
          LIMIT 1"
    ))
    .bind(kind.as_str())
    .bind(entity_id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(from_row).transpose()
}

/// Ids of `kind` entities with a live pending job at `now`.
pub async fn live_pending_ids(pool: &SqlitePool, kind: ImageEntityKind, now: DateTime<Utc>) -> Result<HashSet<String>> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM image_jobs WHERE entity_kind = ? AND status = 'pending'"
    ))
    .bind(kind.as_str())
    .fetch_all(pool)
    .await?;

    let mut ids = HashSet::new();
    for row in &rows {
        let job = from_row(row)?;
        if job.is_live(now) {
            ids.insert(job.entity_id);
        }
    }
    Ok(ids)
}

/// The entity a job generates an image for.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTarget {
    pub house_id: String,
    pub image_path: Option<String>,
}

pub async fn target(pool: &SqlitePool, kind: ImageEntityKind, entity_id: &str) -> Result<Option<ImageTarget>> {
    let row = sqlx::query(&format!("SELECT house_id, image_path FROM {} WHERE id = ?", kind.table()))
        .bind(entity_id)
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    Ok(Some(ImageTarget {
        house_id: row.try_get("house_id")?,
        image_path: row.try_get("image_path")?,
    }))
}

async fn entity_exists(tx: &mut Transaction<'_, Sqlite>, kind: ImageEntityKind, entity_id: &str) -> Result<bool> {
    let row = sqlx::query(&format!("SELECT 1 FROM {} WHERE id = ?", kind.table()))
        .bind(entity_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.is_some())
}

/// Start a job for an entity on behalf of `owner`.
///
/// Fails with `JobInProgress` while another job is live. Expired pending
/// jobs are marked failed before the new one is recorded.
pub async fn begin(
    pool: &SqlitePool,
    kind: ImageEntityKind,
    entity_id: &str,
    owner: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<ImageJob> {
    let mut tx = pool.begin().await?;

    if !entity_exists(&mut tx, kind, entity_id).await? {
        return Err(SootError::not_found("Élément").into());
    }

    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM image_jobs
          WHERE entity_kind = ? AND entity_id = ? AND status = 'pending'"
    ))
    .bind(kind.as_str())
    .bind(entity_id)
    .fetch_all(&mut *tx)
    .await?;

    for row in &rows {
        let job = from_row(row)?;
        if job.is_live(now) {
            return Err(SootError::JobInProgress.into());
        }
        sqlx::query("UPDATE image_jobs SET status = 'failed', error = ?, updated_at = ? WHERE id = ?")
            .bind(EXPIRED_JOB_ERROR)
            .bind(now)
            .bind(&job.id)
            .execute(&mut *tx)
            .await?;
        warn!(target: "soot", event = "image_job_expired", job_id = %job.id, entity_id);
    }

    let job = ImageJob {
        id: new_id(),
        entity_kind: kind,
        entity_id: entity_id.to_string(),
        status: JobStatus::Pending,
        owner: owner.to_string(),
        expires_at: now + ttl,
        error: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(&format!(
        "INSERT INTO image_jobs ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&job.id)
    .bind(job.entity_kind.as_str())
    .bind(&job.entity_id)
    .bind(job.status.as_str())
    .bind(&job.owner)
    .bind(job.expires_at)
    .bind(&job.error)
    .bind(job.created_at)
    .bind(job.updated_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(target: "soot", event = "image_job_started", job_id = %job.id, kind = %kind, entity_id);
    Ok(job)
}

/// Record the outcome of a job. Only its owner may do so, and only while
/// the job is live. A success stores the image path on the entity.
pub async fn finish(
    pool: &SqlitePool,
    job_id: &str,
    owner: &str,
    outcome: JobOutcome,
    now: DateTime<Utc>,
) -> Result<ImageJob> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM image_jobs WHERE id = ?"))
        .bind(job_id)
        .fetch_optional(&mut *tx)
        .await?;
    let Some(row) = row else {
        return Err(SootError::not_found("Génération").into());
    };
    let mut job = from_row(&row)?;
    job.check_finish(owner, now)?;

    match &outcome {
        JobOutcome::Succeeded { image_path } => {
            sqlx::query(&format!(
                "UPDATE {} SET image_path = ?, updated_at = ? WHERE id = ?",
                job.entity_kind.table()
            ))
            .bind(image_path)
            .bind(now)
            .bind(&job.entity_id)
            .execute(&mut *tx)
            .await?;
            job.status = JobStatus::Succeeded;
            job.error = None;
        }
        JobOutcome::Failed { error } => {
            job.status = JobStatus::Failed;
            job.error = Some(error.clone());
        }
    }
    job.updated_at = now;

    sqlx::query("UPDATE image_jobs SET status = ?, error = ?, updated_at = ? WHERE id = ?")
        .bind(job.status.as_str())
        .bind(&job.error)
        .bind(job.updated_at)
        .bind(&job.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(target: "soot", event = "image_job_finished", job_id = %job.id, status = job.status.as_str());
    Ok(job)
}
