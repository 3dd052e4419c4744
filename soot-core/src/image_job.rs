//! Status records for asynchronous image generation.
//!
//! Each attempt to generate an image for a project, piece of equipment or
//! task is one job. A job is owned by the worker that claimed it and
//! expires if the worker never reports back.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SootError;

/// Error message recorded on jobs superseded after expiring.
pub const EXPIRED_JOB_ERROR: &str = "expired";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageEntityKind {
    Project,
    Equipment,
    Task,
}

impl ImageEntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageEntityKind::Project => "project",
            ImageEntityKind::Equipment => "equipment",
            ImageEntityKind::Task => "task",
        }
    }

    /// Table holding entities of this kind.
    pub fn table(&self) -> &'static str {
        match self {
            ImageEntityKind::Project => "projects",
            ImageEntityKind::Equipment => "equipment",
            ImageEntityKind::Task => "tasks",
        }
    }
}

impl fmt::Display for ImageEntityKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ImageEntityKind {
    type Err = SootError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project" => Ok(ImageEntityKind::Project),
            "equipment" => Ok(ImageEntityKind::Equipment),
            "task" => Ok(ImageEntityKind::Task),
            other => Err(SootError::validation(format!(
                "Type d'élément inconnu « {other} »"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

impl FromStr for JobStatus {
    type Err = SootError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "succeeded" => Ok(JobStatus::Succeeded),
            "failed" => Ok(JobStatus::Failed),
            other => Err(SootError::validation(format!("Statut inconnu « {other} »"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageJob {
    pub id: String,
    pub entity_kind: ImageEntityKind,
    pub entity_id: String,
    pub status: JobStatus,
    pub owner: String,
    pub expires_at: DateTime<Utc>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImageJob {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Pending && now >= self.expires_at
    }

    /// A pending job that has not expired.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Pending && now < self.expires_at
    }

    /// Status as it should be reported: an expired pending job has failed.
    pub fn effective_status(&self, now: DateTime<Utc>) -> JobStatus {
        if self.is_expired(now) {
            JobStatus::Failed
        } else {
            self.status
        }
    }

    /// Check that `owner` may report an outcome for this job.
    pub fn check_finish(&self, owner: &str, now: DateTime<Utc>) -> Result<(), SootError> {
        if self.owner != owner {
            return Err(SootError::AccessDenied);
        }
        if self.status != JobStatus::Pending {
            return Err(SootError::Conflict("Cette génération est déjà terminée".into()));
        }
        if self.is_expired(now) {
            return Err(SootError::Conflict("Cette génération a expiré".into()));
        }
        Ok(())
    }
}

/// Image state attached to calendar items and inventory listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageState {
    pub has_image: bool,
    pub generating: bool,
}

impl ImageState {
    pub fn from_parts(image_path: Option<&str>, latest_job: Option<&ImageJob>, now: DateTime<Utc>) -> Self {
        ImageState {
            has_image: image_path.is_some_and(|p| !p.is_empty()),
            generating: latest_job.is_some_and(|job| job.is_live(now)),
        }
    }
}
