pub mod budget;
pub mod calendar;
pub mod houses;
pub mod image_jobs;
pub mod important_dates;
pub mod inventory;
pub mod manifest;
pub mod tasks;

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use soot_core::{SootError, SootResult};
use tracing::error;

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

const INTERNAL_ERROR_MESSAGE: &str = "Une erreur inattendue est survenue";

/// Convert anyhow errors to HTTP responses.
///
/// Domain errors carry their own status; anything else is a 500.
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<SootError>() {
            Some(SootError::Validation(_) | SootError::Recurrence(_)) => StatusCode::BAD_REQUEST,
            Some(SootError::Unauthorized) => StatusCode::UNAUTHORIZED,
            Some(SootError::AccessDenied) => StatusCode::FORBIDDEN,
            Some(SootError::NotFound(_)) => StatusCode::NOT_FOUND,
            Some(SootError::Conflict(_) | SootError::JobInProgress) => StatusCode::CONFLICT,
            Some(SootError::BudgetNotMigrated) => StatusCode::SERVICE_UNAVAILABLE,
            Some(SootError::Config(_) | SootError::Io(_)) | None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut message = self.0.to_string();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(target: "soot", event = "request_failed", error = ?self.0);
            if message.trim().is_empty() {
                message = INTERNAL_ERROR_MESSAGE.to_string();
            }
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Request bodies that turn into domain input after checking their fields.
pub trait Validate {
    type Output;

    fn validate(self) -> SootResult<Self::Output>;
}

/// JSON body extractor that runs [`Validate`] and reports every failure,
/// including malformed JSON, as a 400 with a French message.
pub struct ValidJson<T: Validate>(pub T::Output);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: Validate + DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        Ok(ValidJson(body.validate()?))
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    let message = match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Le corps de la requête doit être du JSON (Content-Type: application/json)".to_string()
        }
        other => format!("Requête invalide : {}", other.body_text()),
    };
    SootError::Validation(message).into()
}

/// For PATCH bodies: an absent field stays `None`, an explicit `null`
/// becomes `Some(None)`. Use with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trim an optional text field, treating blank input as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reject a blank required text field.
pub fn required(value: String, message: &str) -> SootResult<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(SootError::validation(message));
    }
    Ok(value)
}
