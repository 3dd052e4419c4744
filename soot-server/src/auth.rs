//! Bearer session extraction.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use soot_core::SootError;

use crate::routes::AppError;
use crate::state::AppState;
use crate::store::accounts::{self, User};

/// The user behind the request's `Authorization: Bearer` session.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(SootError::Unauthorized)?;
        let user = accounts::resolve_session(&state.pool, token, Utc::now())
            .await?
            .ok_or(SootError::Unauthorized)?;
        Ok(CurrentUser(user))
    }
}
