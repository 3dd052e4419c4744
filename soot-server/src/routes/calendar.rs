//! Calendar projection and iCal feed endpoints

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use soot_core::calendar::{CalendarItem, project};
use soot_core::ics::generate_feed;
use soot_core::{DateRange, MonthKey, SootError, expand_occurrences};
use tracing::info;

use crate::auth::CurrentUser;
use crate::routes::AppError;
use crate::state::AppState;
use crate::store::{feed_tokens, houses, important_dates, tasks};

const FEED_NAME: &str = "Soot";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/houses/{house_id}/calendar", get(house_calendar))
        .route("/calendar/feed-token", get(get_feed_token).post(regenerate_feed_token))
        .route("/calendar/feed", get(feed))
}

#[derive(Deserialize)]
pub struct CalendarQuery {
    pub month: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl CalendarQuery {
    /// `month` or `from`+`to`; the current month when neither is given.
    fn range(&self) -> Result<DateRange, SootError> {
        let explicit = DateRange::from_args(self.from.as_deref(), self.to.as_deref())?;
        match (&self.month, explicit) {
            (Some(_), Some(_)) => Err(SootError::validation(
                "Utilisez soit « month », soit « from » et « to »",
            )),
            (Some(month), None) => Ok(DateRange::for_month(month.parse()?)),
            (None, Some(range)) => Ok(range),
            (None, None) => Ok(DateRange::for_month(MonthKey::from_date(Local::now().date_naive()))),
        }
    }
}

#[derive(Serialize)]
pub struct CalendarResponse {
    pub range: DateRange,
    pub items: Vec<CalendarItem>,
}

/// GET /houses/{house_id}/calendar - Tasks, reminders and important dates for a month or range
async fn house_calendar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(house_id): Path<String>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarResponse>, AppError> {
    let range = query.range()?;
    houses::require_member(&state.pool, &house_id, &user.id).await?;

    let entries = tasks::list_with_context(&state.pool, &house_id, Utc::now()).await?;
    let dates = important_dates::list(&state.pool, &house_id).await?;
    let occurrences = expand_occurrences(&dates, &range, state.config.leap_day_policy);

    let mut items = project(&entries, &occurrences, &range)?;
    items.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.title.cmp(&b.title)));

    Ok(Json(CalendarResponse { range, items }))
}

#[derive(Serialize)]
pub struct FeedTokenResponse {
    pub token: Option<String>,
    pub url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl FeedTokenResponse {
    fn new(state: &AppState, token: Option<feed_tokens::FeedToken>) -> Self {
        match token {
            Some(token) => FeedTokenResponse {
                url: Some(state.config.feed_url(&token.token)),
                token: Some(token.token),
                created_at: Some(token.created_at),
            },
            None => FeedTokenResponse {
                token: None,
                url: None,
                created_at: None,
            },
        }
    }
}

/// GET /calendar/feed-token - The caller's current feed token, if any
async fn get_feed_token(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<FeedTokenResponse>, AppError> {
    let token = feed_tokens::get(&state.pool, &user.id).await?;
    Ok(Json(FeedTokenResponse::new(&state, token)))
}

/// POST /calendar/feed-token - Issue a new token, invalidating the previous one
async fn regenerate_feed_token(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<FeedTokenResponse>, AppError> {
    let token = feed_tokens::regenerate(&state.pool, &user.id).await?;
    Ok(Json(FeedTokenResponse::new(&state, Some(token))))
}

#[derive(Deserialize)]
pub struct FeedQuery {
    pub token: Option<String>,
}

/// GET /calendar/feed?token= - Public iCal feed of every house the token's owner belongs to
async fn feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, AppError> {
    let token = query
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SootError::validation("Le paramètre « token » est obligatoire"))?;

    let user_id = feed_tokens::resolve(&state.pool, token)
        .await?
        .ok_or_else(|| SootError::not_found("Flux de calendrier"))?;

    let house_ids: Vec<String> = houses::list_for_user(&state.pool, &user_id)
        .await?
        .into_iter()
        .map(|h| h.id)
        .collect();

    let range = DateRange::around(
        Local::now().date_naive(),
        state.config.feed_past_days,
        state.config.feed_future_days,
    );

    let feed_tasks: Vec<_> = tasks::list_for_houses(&state.pool, &house_ids)
        .await?
        .into_iter()
        .filter(|task| match task.due_date {
            Some(due) => range.contains(due) || (task.is_recurring() && !task.done && due <= range.to),
            None => false,
        })
        .collect();

    let dates = important_dates::list_for_houses(&state.pool, &house_ids).await?;
    let occurrences = expand_occurrences(&dates, &range, state.config.leap_day_policy);

    let body = generate_feed(FEED_NAME, &feed_tasks, &occurrences, Utc::now())?;

    info!(
        target: "soot",
        event = "feed_served",
        user_id = %user_id,
        tasks = feed_tasks.len(),
        occurrences = occurrences.len(),
    );

    Ok(([(header::CONTENT_TYPE, "text/calendar; charset=utf-8")], body))
}
