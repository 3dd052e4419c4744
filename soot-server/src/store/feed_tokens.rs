//! Per-user secret tokens for the iCal subscription feed.
//!
//! A user holds at most one token; regenerating replaces it, so the old
//! subscription URL stops working immediately.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedToken {
    pub user_id: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

fn from_row(row: &SqliteRow) -> sqlx::Result<FeedToken> {
    Ok(FeedToken {
        user_id: row.try_get("user_id")?,
        token: row.try_get("token")?,
        created_at: row.try_get("created_at")?,
    })
}

pub async fn get(pool: &SqlitePool, user_id: &str) -> Result<Option<FeedToken>> {
    let row = sqlx::query("SELECT user_id, token, created_at FROM calendar_feed_tokens WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(from_row).transpose()?)
}

/// Replace the user's token with a fresh one.
pub async fn regenerate(pool: &SqlitePool, user_id: &str) -> Result<FeedToken> {
    let token = FeedToken {
        user_id: user_id.to_string(),
        token: Uuid::new_v4().simple().to_string(),
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO calendar_feed_tokens (user_id, token, created_at) VALUES (?, ?, ?)
         ON CONFLICT(user_id) DO UPDATE SET token = excluded.token, created_at = excluded.created_at",
    )
    .bind(&token.user_id)
    .bind(&token.token)
    .bind(token.created_at)
    .execute(pool)
    .await?;

    info!(target: "soot", event = "feed_token_regenerated", user_id);
    Ok(token)
}

/// The user a feed token belongs to.
pub async fn resolve(pool: &SqlitePool, token: &str) -> Result<Option<String>> {
    let row = sqlx::query("SELECT user_id FROM calendar_feed_tokens WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.try_get::<String, _>("user_id")).transpose()?)
}
