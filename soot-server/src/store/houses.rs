//! Houses and their members.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soot_core::SootError;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use super::accounts::User;
use super::new_id;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct House {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HouseRole {
    Member,
    Admin,
    Owner,
}

impl HouseRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            HouseRole::Member => "member",
            HouseRole::Admin => "admin",
            HouseRole::Owner => "owner",
        }
    }

    pub fn can_manage_members(&self) -> bool {
        matches!(self, HouseRole::Admin | HouseRole::Owner)
    }
}

impl fmt::Display for HouseRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HouseRole {
    type Err = SootError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(HouseRole::Member),
            "admin" => Ok(HouseRole::Admin),
            "owner" => Ok(HouseRole::Owner),
            other => Err(SootError::validation(format!("Rôle inconnu « {other} »"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HouseMember {
    pub id: String,
    pub house_id: String,
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: HouseRole,
    pub created_at: DateTime<Utc>,
}

fn house_from_row(row: &SqliteRow) -> sqlx::Result<House> {
    Ok(House {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}

fn member_from_row(row: &SqliteRow) -> Result<HouseMember> {
    let role: String = row.try_get("role")?;
    Ok(HouseMember {
        id: row.try_get("id")?,
        house_id: row.try_get("house_id")?,
        user_id: row.try_get("user_id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        role: role.parse()?,
        created_at: row.try_get("created_at")?,
    })
}

const MEMBER_COLUMNS: &str = "m.id, m.house_id, m.user_id, u.email, u.name, m.role, m.created_at";

/// Create a house owned by `owner`.
pub async fn create(pool: &SqlitePool, name: &str, owner: &User) -> Result<House> {
    let house = House {
        id: new_id(),
        name: name.to_string(),
        created_at: Utc::now(),
    };

    let mut tx = pool.begin().await?;
    sqlx::query("INSERT INTO houses (id, name, created_at) VALUES (?, ?, ?)")
        .bind(&house.id)
        .bind(&house.name)
        .bind(house.created_at)
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        "INSERT INTO house_members (id, house_id, user_id, role, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(new_id())
    .bind(&house.id)
    .bind(&owner.id)
    .bind(HouseRole::Owner.as_str())
    .bind(house.created_at)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(target: "soot", event = "house_created", house_id = %house.id, owner_id = %owner.id);
    Ok(house)
}

pub async fn get(pool: &SqlitePool, house_id: &str) -> Result<Option<House>> {
    let row = sqlx::query("SELECT id, name, created_at FROM houses WHERE id = ?")
        .bind(house_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(house_from_row).transpose()?)
}

/// Houses `user_id` belongs to, by name.
pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<House>> {
    let rows = sqlx::query(
        "SELECT DISTINCT h.id, h.name, h.created_at
           FROM houses h
           JOIN house_members m ON m.house_id = h.id
          WHERE m.user_id = ?
          ORDER BY h.name, h.id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(house_from_row).collect::<sqlx::Result<_>>()?)
}

/// Membership of `user_id` in `house_id`; with legacy duplicate rows the
/// strongest role wins.
pub async fn membership(pool: &SqlitePool, house_id: &str, user_id: &str) -> Result<Option<HouseMember>> {
    let row = sqlx::query(&format!(
        "SELECT {MEMBER_COLUMNS}
           FROM house_members m
           JOIN users u ON u.id = m.user_id
          WHERE m.house_id = ? AND m.user_id = ?
          ORDER BY CASE m.role WHEN 'owner' THEN 0 WHEN 'admin' THEN 1 ELSE 2 END, m.created_at
          LIMIT 1"
    ))
    .bind(house_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(member_from_row).transpose()
}

/// Membership of `user_id`, or `NotFound` for an unknown house and
/// `AccessDenied` for someone else's house.
pub async fn require_member(pool: &SqlitePool, house_id: &str, user_id: &str) -> Result<HouseMember> {
    if let Some(member) = membership(pool, house_id, user_id).await? {
        return Ok(member);
    }
    if get(pool, house_id).await?.is_none() {
        return Err(SootError::not_found("Maison").into());
    }
    Err(SootError::AccessDenied.into())
}

pub async fn list_members(pool: &SqlitePool, house_id: &str) -> Result<Vec<HouseMember>> {
    let rows = sqlx::query(&format!(
        "SELECT {MEMBER_COLUMNS}
           FROM house_members m
           JOIN users u ON u.id = m.user_id
          WHERE m.house_id = ?
          ORDER BY m.created_at, m.id"
    ))
    .bind(house_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(member_from_row).collect()
}

/// Add `user` to a house; refuses users that are already members.
pub async fn add_member(pool: &SqlitePool, house_id: &str, user: &User, role: HouseRole) -> Result<HouseMember> {
    if membership(pool, house_id, &user.id).await?.is_some() {
        return Err(SootError::Conflict(format!("{} est déjà membre de cette maison", user.email)).into());
    }

    let member = HouseMember {
        id: new_id(),
        house_id: house_id.to_string(),
        user_id: user.id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        role,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO house_members (id, house_id, user_id, role, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&member.id)
    .bind(&member.house_id)
    .bind(&member.user_id)
    .bind(member.role.as_str())
    .bind(member.created_at)
    .execute(pool)
    .await?;

    info!(target: "soot", event = "member_added", house_id, user_id = %user.id, role = %role);
    Ok(member)
}

/// Duplicate membership rows for one (house, user) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateMembership {
    pub house_id: String,
    pub user_id: String,
    /// Row that survives: strongest role, then oldest.
    pub keep: HouseMember,
    pub remove: Vec<HouseMember>,
}

pub async fn find_duplicate_memberships(pool: &SqlitePool) -> Result<Vec<DuplicateMembership>> {
    let rows = sqlx::query(&format!(
        "SELECT {MEMBER_COLUMNS}
           FROM house_members m
           JOIN users u ON u.id = m.user_id
          WHERE (m.house_id, m.user_id) IN (
                SELECT house_id, user_id FROM house_members
                 GROUP BY house_id, user_id
                HAVING COUNT(*) > 1)
          ORDER BY m.house_id, m.user_id,
                   CASE m.role WHEN 'owner' THEN 0 WHEN 'admin' THEN 1 ELSE 2 END,
                   m.created_at, m.id"
    ))
    .fetch_all(pool)
    .await?;

    let mut duplicates: Vec<DuplicateMembership> = Vec::new();
    for row in &rows {
        let member = member_from_row(row)?;
        match duplicates.last_mut() {
            Some(group) if group.house_id == member.house_id && group.user_id == member.user_id => {
                group.remove.push(member);
            }
            _ => duplicates.push(DuplicateMembership {
                house_id: member.house_id.clone(),
                user_id: member.user_id.clone(),
                keep: member,
                remove: Vec::new(),
            }),
        }
    }

    Ok(duplicates)
}

/// Delete the surplus rows of every duplicate group; returns the number removed.
pub async fn remove_duplicate_memberships(pool: &SqlitePool, duplicates: &[DuplicateMembership]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut removed = 0;

    for group in duplicates {
        for member in &group.remove {
            removed += sqlx::query("DELETE FROM house_members WHERE id = ?")
                .bind(&member.id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
    }

    tx.commit().await?;
    info!(target: "soot", event = "duplicate_members_removed", removed);
    Ok(removed)
}
