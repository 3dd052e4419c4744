//! Budget bookkeeping.
//!
//! The budget tables come from their own migration. Every query here maps
//! its error through [`budget_guard`] so a database that has not run that
//! migration yields `BudgetNotMigrated` instead of a raw SQL error.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use soot_core::{MonthKey, SootError};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use super::new_id;
use crate::db::budget_guard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetKind {
    Expense,
    Income,
}

impl BudgetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetKind::Expense => "expense",
            BudgetKind::Income => "income",
        }
    }
}

impl fmt::Display for BudgetKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BudgetKind {
    type Err = SootError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expense" => Ok(BudgetKind::Expense),
            "income" => Ok(BudgetKind::Income),
            other => Err(SootError::validation(format!("Type de mouvement inconnu « {other} »"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetEntry {
    pub id: String,
    pub house_id: String,
    pub label: String,
    pub amount_cents: i64,
    pub kind: BudgetKind,
    pub occurred_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecurringEntry {
    pub id: String,
    pub house_id: String,
    pub label: String,
    pub amount_cents: i64,
    pub kind: BudgetKind,
    pub day_of_month: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEntry {
    pub label: String,
    pub amount_cents: i64,
    pub kind: BudgetKind,
    pub occurred_on: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewRecurringEntry {
    pub label: String,
    pub amount_cents: i64,
    pub kind: BudgetKind,
    pub day_of_month: u32,
}

/// Totals for one month: dated entries of the month plus every active
/// recurring entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthSummary {
    pub month: MonthKey,
    pub income_cents: i64,
    pub expense_cents: i64,
    pub balance_cents: i64,
    pub entry_count: usize,
    pub recurring_count: usize,
}

fn entry_from_row(row: &SqliteRow) -> Result<BudgetEntry> {
    let kind: String = row.try_get("kind")?;
    Ok(BudgetEntry {
        id: row.try_get("id")?,
        house_id: row.try_get("house_id")?,
        label: row.try_get("label")?,
        amount_cents: row.try_get("amount_cents")?,
        kind: kind.parse()?,
        occurred_on: row.try_get("occurred_on")?,
        created_at: row.try_get("created_at")?,
    })
}

fn recurring_from_row(row: &SqliteRow) -> Result<RecurringEntry> {
    let kind: String = row.try_get("kind")?;
    Ok(RecurringEntry {
        id: row.try_get("id")?,
        house_id: row.try_get("house_id")?,
        label: row.try_get("label")?,
        amount_cents: row.try_get("amount_cents")?,
        kind: kind.parse()?,
        day_of_month: row.try_get("day_of_month")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Largest accepted amount, one billion in currency units.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

fn validate_amount(label: &str, amount_cents: i64) -> Result<()> {
    if label.trim().is_empty() {
        return Err(SootError::validation("Le libellé est obligatoire").into());
    }
    if amount_cents <= 0 {
        return Err(SootError::validation("Le montant doit être positif").into());
    }
    if amount_cents > MAX_AMOUNT_CENTS {
        return Err(SootError::validation("Le montant dépasse la limite autorisée").into());
    }
    Ok(())
}

/// Entries of a house, optionally limited to one month, newest first.
pub async fn list_entries(pool: &SqlitePool, house_id: &str, month: Option<MonthKey>) -> Result<Vec<BudgetEntry>> {
    let rows = match month {
        Some(month) => {
            sqlx::query(
                "SELECT id, house_id, label, amount_cents, kind, occurred_on, created_at
                   FROM budget_entries
                  WHERE house_id = ? AND occurred_on BETWEEN ? AND ?
                  ORDER BY occurred_on DESC, created_at DESC",
            )
            .bind(house_id)
            .bind(month.first_day())
            .bind(month.last_day())
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(
                "SELECT id, house_id, label, amount_cents, kind, occurred_on, created_at
                   FROM budget_entries
                  WHERE house_id = ?
                  ORDER BY occurred_on DESC, created_at DESC",
            )
            .bind(house_id)
            .fetch_all(pool)
            .await
        }
    }
    .map_err(budget_guard)?;

    rows.iter().map(entry_from_row).collect()
}

pub async fn create_entry(pool: &SqlitePool, house_id: &str, new: NewEntry) -> Result<BudgetEntry> {
    validate_amount(&new.label, new.amount_cents)?;

    let entry = BudgetEntry {
        id: new_id(),
        house_id: house_id.to_string(),
        label: new.label.trim().to_string(),
        amount_cents: new.amount_cents,
        kind: new.kind,
        occurred_on: new.occurred_on,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO budget_entries (id, house_id, label, amount_cents, kind, occurred_on, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&entry.id)
    .bind(&entry.house_id)
    .bind(&entry.label)
    .bind(entry.amount_cents)
    .bind(entry.kind.as_str())
    .bind(entry.occurred_on)
    .bind(entry.created_at)
    .execute(pool)
    .await
    .map_err(budget_guard)?;

    info!(target: "soot", event = "budget_entry_created", id = %entry.id, house_id, kind = %entry.kind);
    Ok(entry)
}

pub async fn list_recurring(pool: &SqlitePool, house_id: &str) -> Result<Vec<RecurringEntry>> {
    let rows = sqlx::query(
        "SELECT id, house_id, label, amount_cents, kind, day_of_month, active, created_at
           FROM budget_recurring_entries
          WHERE house_id = ?
          ORDER BY day_of_month, label",
    )
    .bind(house_id)
    .fetch_all(pool)
    .await
    .map_err(budget_guard)?;

    rows.iter().map(recurring_from_row).collect()
}

pub async fn create_recurring(pool: &SqlitePool, house_id: &str, new: NewRecurringEntry) -> Result<RecurringEntry> {
    validate_amount(&new.label, new.amount_cents)?;
    if !(1..=31).contains(&new.day_of_month) {
        return Err(SootError::validation("Le jour du mois doit être compris entre 1 et 31").into());
    }

    let entry = RecurringEntry {
        id: new_id(),
        house_id: house_id.to_string(),
        label: new.label.trim().to_string(),
        amount_cents: new.amount_cents,
        kind: new.kind,
        day_of_month: new.day_of_month,
        active: true,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO budget_recurring_entries
             (id, house_id, label, amount_cents, kind, day_of_month, active, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&entry.id)
    .bind(&entry.house_id)
    .bind(&entry.label)
    .bind(entry.amount_cents)
    .bind(entry.kind.as_str())
    .bind(entry.day_of_month)
    .bind(entry.active)
    .bind(entry.created_at)
    .execute(pool)
    .await
    .map_err(budget_guard)?;

    info!(target: "soot", event = "budget_recurring_created", id = %entry.id, house_id);
    Ok(entry)
}

fn overflow() -> SootError {
    SootError::validation("Les montants du mois sont trop élevés pour être totalisés")
}

/// Income and expense totals, refusing sums that do not fit in an i64.
fn totals(amounts: impl IntoIterator<Item = (BudgetKind, i64)>) -> Result<(i64, i64), SootError> {
    let mut income_cents: i64 = 0;
    let mut expense_cents: i64 = 0;
    for (kind, amount) in amounts {
        let total = match kind {
            BudgetKind::Income => &mut income_cents,
            BudgetKind::Expense => &mut expense_cents,
        };
        *total = total.checked_add(amount).ok_or_else(overflow)?;
    }
    Ok((income_cents, expense_cents))
}

pub async fn summary(pool: &SqlitePool, house_id: &str, month: MonthKey) -> Result<MonthSummary> {
    let entries = list_entries(pool, house_id, Some(month)).await?;
    let recurring: Vec<RecurringEntry> = list_recurring(pool, house_id)
        .await?
        .into_iter()
        .filter(|r| r.active)
        .collect();

    let (income_cents, expense_cents) = totals(
        entries
            .iter()
            .map(|e| (e.kind, e.amount_cents))
            .chain(recurring.iter().map(|r| (r.kind, r.amount_cents))),
    )?;

    Ok(MonthSummary {
        month,
        income_cents,
        expense_cents,
        balance_cents: income_cents.checked_sub(expense_cents).ok_or_else(overflow)?,
        entry_count: entries.len(),
        recurring_count: recurring.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_split_by_kind() {
        let (income, expense) = totals([
            (BudgetKind::Income, 1_000),
            (BudgetKind::Expense, 250),
            (BudgetKind::Expense, 50),
        ])
        .unwrap();
        assert_eq!((income, expense), (1_000, 300));
    }

    #[test]
    fn totals_overflow_is_a_validation_error() {
        let err = totals([(BudgetKind::Income, i64::MAX), (BudgetKind::Income, i64::MAX)]).unwrap_err();
        assert!(matches!(err, SootError::Validation(_)));

        let (_, expense) = totals([(BudgetKind::Income, i64::MAX), (BudgetKind::Expense, i64::MAX)]).unwrap();
        assert_eq!(expense, i64::MAX);
    }
}
