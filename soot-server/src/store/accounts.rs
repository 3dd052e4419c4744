//! Users and bearer sessions.
//!
//! Logging in (magic links) happens elsewhere; sessions are issued
//! directly, e.g. by `soot session`.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::new_id;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

fn user_from_row(row: &SqliteRow) -> sqlx::Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
    })
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, email, name FROM users WHERE email = ?")
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(user_from_row).transpose()?)
}

/// Look up a user by email, creating it when unknown.
pub async fn find_or_create(pool: &SqlitePool, email: &str, name: Option<&str>) -> Result<User> {
    if let Some(user) = find_by_email(pool, email).await? {
        return Ok(user);
    }

    let email = normalize_email(email);
    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_string());

    let user = User {
        id: new_id(),
        email,
        name,
    };

    sqlx::query("INSERT INTO users (id, email, name, created_at) VALUES (?, ?, ?, ?)")
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(Utc::now())
        .execute(pool)
        .await?;

    info!(target: "soot", event = "user_created", user_id = %user.id);
    Ok(user)
}

/// Issue a new session for `user_id`, valid for `ttl_days`. Sessions that
/// have already expired are deleted on the way.
pub async fn issue_session(pool: &SqlitePool, user_id: &str, ttl_days: i64) -> Result<String> {
    let token = Uuid::new_v4().simple().to_string();
    let now = Utc::now();
    purge_expired_sessions(pool, now).await?;

    sqlx::query("INSERT INTO sessions (token, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
        .bind(&token)
        .bind(user_id)
        .bind(now + Duration::days(ttl_days))
        .bind(now)
        .execute(pool)
        .await?;

    Ok(token)
}

/// Delete every session expired at `now`; returns how many were removed.
pub async fn purge_expired_sessions(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64> {
    let rows = sqlx::query("SELECT token, expires_at FROM sessions").fetch_all(pool).await?;

    let mut tx = pool.begin().await?;
    let mut removed = 0;
    for row in &rows {
        let expires_at: DateTime<Utc> = row.try_get("expires_at")?;
        if expires_at <= now {
            let token: String = row.try_get("token")?;
            removed += sqlx::query("DELETE FROM sessions WHERE token = ?")
                .bind(&token)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
    }
    tx.commit().await?;

    if removed > 0 {
        info!(target: "soot", event = "sessions_purged", removed);
    }
    Ok(removed)
}

/// The user behind a session token, if the session exists and has not expired.
pub async fn resolve_session(pool: &SqlitePool, token: &str, now: DateTime<Utc>) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT u.id, u.email, u.name, s.expires_at
           FROM sessions s
           JOIN users u ON u.id = s.user_id
          WHERE s.token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let expires_at: DateTime<Utc> = row.try_get("expires_at")?;
    if expires_at <= now {
        return Ok(None);
    }

    Ok(Some(user_from_row(&row)?))
}
