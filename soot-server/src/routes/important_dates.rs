//! Important date endpoints

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use soot_core::date_range::parse_iso_date;
use soot_core::important_date::{ImportantDate, ImportantDateType};
use soot_core::{DateRange, Occurrence, SootError, SootResult, expand_occurrences};

use crate::auth::CurrentUser;
use crate::routes::{AppError, Validate, ValidJson, double_option, non_blank, required};
use crate::state::AppState;
use crate::store::accounts::User;
use crate::store::houses;
use crate::store::important_dates::{self, ImportantDatePatch, NewImportantDate};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/houses/{house_id}/important-dates",
            get(list_important_dates).post(create_important_date),
        )
        .route(
            "/important-dates/{id}",
            patch(update_important_date).delete(delete_important_date),
        )
}

/// An important date with its computed next occurrence.
#[derive(Serialize)]
pub struct ImportantDateView {
    #[serde(flatten)]
    pub date: ImportantDate,
    pub next_occurrence: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct ImportantDateList {
    pub important_dates: Vec<ImportantDateView>,
    /// Present when a `from`/`to` range was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<Vec<Occurrence>>,
}

#[derive(Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

fn view(state: &AppState, date: ImportantDate) -> ImportantDateView {
    let today = Local::now().date_naive();
    ImportantDateView {
        next_occurrence: date.next_occurrence(today, state.config.leap_day_policy),
        date,
    }
}

/// GET /houses/{house_id}/important-dates - List, expanding occurrences over `from`..`to`
async fn list_important_dates(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(house_id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<ImportantDateList>, AppError> {
    let range = DateRange::from_args(query.from.as_deref(), query.to.as_deref())?;
    houses::require_member(&state.pool, &house_id, &user.id).await?;

    let dates = important_dates::list(&state.pool, &house_id).await?;
    let occurrences = range.map(|range| expand_occurrences(&dates, &range, state.config.leap_day_policy));

    Ok(Json(ImportantDateList {
        important_dates: dates.into_iter().map(|d| view(&state, d)).collect(),
        occurrences,
    }))
}

#[derive(Deserialize)]
pub struct CreateImportantDateRequest {
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub recurring_yearly: bool,
    #[serde(default, alias = "type")]
    pub date_type: Option<String>,
    pub notes: Option<String>,
}

fn parse_type(value: &str) -> SootResult<ImportantDateType> {
    value.parse()
}

impl Validate for CreateImportantDateRequest {
    type Output = NewImportantDate;

    fn validate(self) -> SootResult<NewImportantDate> {
        Ok(NewImportantDate {
            title: required(self.title, "Le titre est obligatoire")?,
            date: parse_iso_date(self.date.trim())?,
            recurring_yearly: self.recurring_yearly,
            date_type: self.date_type.as_deref().map(parse_type).transpose()?.unwrap_or_default(),
            notes: non_blank(self.notes),
        })
    }
}

/// POST /houses/{house_id}/important-dates - Create an important date
async fn create_important_date(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(house_id): Path<String>,
    ValidJson(new): ValidJson<CreateImportantDateRequest>,
) -> Result<(StatusCode, Json<ImportantDateView>), AppError> {
    houses::require_member(&state.pool, &house_id, &user.id).await?;
    let created = important_dates::create(&state.pool, &house_id, new).await?;
    Ok((StatusCode::CREATED, Json(view(&state, created))))
}

#[derive(Deserialize)]
pub struct UpdateImportantDateRequest {
    pub title: Option<String>,
    pub date: Option<String>,
    pub recurring_yearly: Option<bool>,
    #[serde(alias = "type")]
    pub date_type: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl Validate for UpdateImportantDateRequest {
    type Output = ImportantDatePatch;

    fn validate(self) -> SootResult<ImportantDatePatch> {
        let patch = ImportantDatePatch {
            title: self
                .title
                .map(|t| required(t, "Le titre ne peut pas être vide"))
                .transpose()?,
            date: self.date.as_deref().map(|d| parse_iso_date(d.trim())).transpose()?,
            recurring_yearly: self.recurring_yearly,
            date_type: self.date_type.as_deref().map(parse_type).transpose()?,
            notes: self.notes.map(non_blank),
        };
        if patch.is_empty() {
            return Err(SootError::validation("Aucune modification demandée"));
        }
        Ok(patch)
    }
}

/// Load an important date the caller may modify: 404 when unknown, 403
/// when it belongs to a house the caller is not a member of.
async fn load_for_member(state: &AppState, id: &str, user: &User) -> Result<ImportantDate, AppError> {
    let date = important_dates::get(&state.pool, id)
        .await?
        .ok_or_else(|| SootError::not_found("Date importante"))?;
    houses::require_member(&state.pool, &date.house_id, &user.id).await?;
    Ok(date)
}

/// PATCH /important-dates/{id} - Partial update
async fn update_important_date(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ValidJson(patch): ValidJson<UpdateImportantDateRequest>,
) -> Result<Json<ImportantDateView>, AppError> {
    let existing = load_for_member(&state, &id, &user).await?;
    let updated = important_dates::update(&state.pool, existing, patch).await?;
    Ok(Json(view(&state, updated)))
}

/// DELETE /important-dates/{id}
async fn delete_important_date(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    load_for_member(&state, &id, &user).await?;
    important_dates::delete(&state.pool, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
