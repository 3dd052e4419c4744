//! Image generation status endpoints
//!
//! The generator itself runs elsewhere; these routes only track its jobs
//! so the UI knows whether an image is on its way. A job belongs to the
//! user whose session started it, and only that session can finish it.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use soot_core::image_job::{EXPIRED_JOB_ERROR, ImageEntityKind, ImageJob, ImageState, JobStatus};
use soot_core::{SootError, SootResult};

use crate::auth::CurrentUser;
use crate::routes::{AppError, Validate, ValidJson, non_blank};
use crate::state::AppState;
use crate::store::accounts::User;
use crate::store::houses;
use crate::store::image_jobs::{self, ImageTarget, JobOutcome};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/image-jobs/{kind}/{entity_id}",
            get(image_status).post(start_job),
        )
        .route("/image-jobs/{job_id}", patch(finish_job))
}

/// A job as reported to clients: an expired pending job shows as failed.
fn reported(mut job: ImageJob) -> ImageJob {
    let now = Utc::now();
    if job.is_expired(now) {
        job.status = job.effective_status(now);
        job.error = Some(EXPIRED_JOB_ERROR.to_string());
    }
    job
}

async fn load_target(state: &AppState, kind: ImageEntityKind, entity_id: &str, user: &User) -> Result<ImageTarget, AppError> {
    let target = image_jobs::target(&state.pool, kind, entity_id)
        .await?
        .ok_or_else(|| SootError::not_found("Élément"))?;
    houses::require_member(&state.pool, &target.house_id, &user.id).await?;
    Ok(target)
}

#[derive(Serialize)]
pub struct ImageStatusResponse {
    pub image: ImageState,
    pub image_path: Option<String>,
    pub latest_job: Option<ImageJob>,
}

/// GET /image-jobs/{kind}/{entity_id} - Image state and most recent job
async fn image_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((kind, entity_id)): Path<(String, String)>,
) -> Result<Json<ImageStatusResponse>, AppError> {
    let kind: ImageEntityKind = kind.parse()?;
    let target = load_target(&state, kind, &entity_id, &user).await?;
    let latest = image_jobs::latest(&state.pool, kind, &entity_id).await?;

    Ok(Json(ImageStatusResponse {
        image: ImageState::from_parts(target.image_path.as_deref(), latest.as_ref(), Utc::now()),
        image_path: target.image_path,
        latest_job: latest.map(reported),
    }))
}

/// POST /image-jobs/{kind}/{entity_id} - Claim a generation job for the caller (409 while one is live)
async fn start_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((kind, entity_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<ImageJob>), AppError> {
    let kind: ImageEntityKind = kind.parse()?;
    load_target(&state, kind, &entity_id, &user).await?;

    let ttl = Duration::minutes(state.config.image_job_ttl_minutes);
    let job = image_jobs::begin(&state.pool, kind, &entity_id, &user.id, ttl, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(reported(job))))
}

#[derive(Deserialize)]
pub struct FinishJobRequest {
    pub status: JobStatus,
    pub image_path: Option<String>,
    pub error: Option<String>,
}

impl Validate for FinishJobRequest {
    type Output = JobOutcome;

    fn validate(self) -> SootResult<JobOutcome> {
        match self.status {
            JobStatus::Succeeded => Ok(JobOutcome::Succeeded {
                image_path: non_blank(self.image_path).ok_or_else(|| {
                    SootError::validation("Le chemin de l'image est obligatoire pour une génération réussie")
                })?,
            }),
            JobStatus::Failed => Ok(JobOutcome::Failed {
                error: non_blank(self.error).unwrap_or_else(|| "Échec de la génération".to_string()),
            }),
            JobStatus::Pending => Err(SootError::validation(
                "Le statut final doit être « succeeded » ou « failed »",
            )),
        }
    }
}

/// PATCH /image-jobs/{job_id} - Report the outcome of a job (the user who started it only)
async fn finish_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(job_id): Path<String>,
    ValidJson(outcome): ValidJson<FinishJobRequest>,
) -> Result<Json<ImageJob>, AppError> {
    let job = image_jobs::get(&state.pool, &job_id)
        .await?
        .ok_or_else(|| SootError::not_found("Génération"))?;
    load_target(&state, job.entity_kind, &job.entity_id, &user).await?;

    let job = image_jobs::finish(&state.pool, &job_id, &user.id, outcome, Utc::now()).await?;
    Ok(Json(reported(job)))
}
