//! Budget endpoints
//!
//! All of them answer 503 with an instructional message while the budget
//! migration has not been applied.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use chrono::Local;
use serde::Deserialize;
use soot_core::date_range::parse_iso_date;
use soot_core::{MonthKey, SootError, SootResult};

use crate::auth::CurrentUser;
use crate::routes::{AppError, Validate, ValidJson, required};
use crate::state::AppState;
use crate::store::budget::{self, BudgetEntry, BudgetKind, MonthSummary, NewEntry, NewRecurringEntry, RecurringEntry};
use crate::store::houses;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/houses/{house_id}/budget/entries",
            get(list_entries).post(create_entry),
        )
        .route(
            "/houses/{house_id}/budget/recurring",
            get(list_recurring).post(create_recurring),
        )
        .route("/houses/{house_id}/budget/summary", get(summary))
}

#[derive(Deserialize)]
pub struct MonthQuery {
    pub month: Option<String>,
}

impl MonthQuery {
    fn month(&self) -> SootResult<Option<MonthKey>> {
        self.month.as_deref().map(str::parse::<MonthKey>).transpose()
    }
}

/// GET /houses/{house_id}/budget/entries?month=YYYY-MM
async fn list_entries(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(house_id): Path<String>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Vec<BudgetEntry>>, AppError> {
    let month = query.month()?;
    houses::require_member(&state.pool, &house_id, &user.id).await?;
    Ok(Json(budget::list_entries(&state.pool, &house_id, month).await?))
}

#[derive(Deserialize)]
pub struct CreateEntryRequest {
    pub label: String,
    pub amount_cents: i64,
    pub kind: BudgetKind,
    pub occurred_on: String,
}

impl Validate for CreateEntryRequest {
    type Output = NewEntry;

    fn validate(self) -> SootResult<NewEntry> {
        Ok(NewEntry {
            label: required(self.label, "Le libellé est obligatoire")?,
            amount_cents: self.amount_cents,
            kind: self.kind,
            occurred_on: parse_iso_date(self.occurred_on.trim())?,
        })
    }
}

/// POST /houses/{house_id}/budget/entries
async fn create_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(house_id): Path<String>,
    ValidJson(new): ValidJson<CreateEntryRequest>,
) -> Result<(StatusCode, Json<BudgetEntry>), AppError> {
    houses::require_member(&state.pool, &house_id, &user.id).await?;
    let entry = budget::create_entry(&state.pool, &house_id, new).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /houses/{house_id}/budget/recurring
async fn list_recurring(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(house_id): Path<String>,
) -> Result<Json<Vec<RecurringEntry>>, AppError> {
    houses::require_member(&state.pool, &house_id, &user.id).await?;
    Ok(Json(budget::list_recurring(&state.pool, &house_id).await?))
}

#[derive(Deserialize)]
pub struct CreateRecurringRequest {
    pub label: String,
    pub amount_cents: i64,
    pub kind: BudgetKind,
    pub day_of_month: u32,
}

impl Validate for CreateRecurringRequest {
    type Output = NewRecurringEntry;

    fn validate(self) -> SootResult<NewRecurringEntry> {
        if !(1..=31).contains(&self.day_of_month) {
            return Err(SootError::validation("Le jour du mois doit être compris entre 1 et 31"));
        }
        Ok(NewRecurringEntry {
            label: required(self.label, "Le libellé est obligatoire")?,
            amount_cents: self.amount_cents,
            kind: self.kind,
            day_of_month: self.day_of_month,
        })
    }
}

/// POST /houses/{house_id}/budget/recurring
async fn create_recurring(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(house_id): Path<String>,
    ValidJson(new): ValidJson<CreateRecurringRequest>,
) -> Result<(StatusCode, Json<RecurringEntry>), AppError> {
    houses::require_member(&state.pool, &house_id, &user.id).await?;
    let entry = budget::create_recurring(&state.pool, &house_id, new).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /houses/{house_id}/budget/summary?month=YYYY-MM - Defaults to the current month
async fn summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(house_id): Path<String>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<MonthSummary>, AppError> {
    let month = query
        .month()?
        .unwrap_or_else(|| MonthKey::from_date(Local::now().date_naive()));
    houses::require_member(&state.pool, &house_id, &user.id).await?;
    Ok(Json(budget::summary(&state.pool, &house_id, month).await?))
}
