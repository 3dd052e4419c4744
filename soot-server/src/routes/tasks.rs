//! Task endpoints

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use soot_core::date_range::parse_iso_date;
use soot_core::recurrence::normalize_rule;
use soot_core::task::Task;
use soot_core::{SootError, SootResult};

use crate::auth::CurrentUser;
use crate::routes::{AppError, Validate, ValidJson, double_option, non_blank, required};
use crate::state::AppState;
use crate::store::accounts::User;
use crate::store::houses;
use crate::store::tasks::{self, NewTask, TaskLinks, TaskPatch};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/houses/{house_id}/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", patch(update_task).delete(delete_task))
        .route("/tasks/{id}/complete", post(complete_task))
}

fn parse_optional_date(value: Option<String>) -> SootResult<Option<NaiveDate>> {
    non_blank(value).as_deref().map(parse_iso_date).transpose()
}

fn parse_rule(value: Option<String>) -> Option<String> {
    non_blank(value).map(|rule| normalize_rule(&rule))
}

/// GET /houses/{house_id}/tasks
async fn list_tasks(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(house_id): Path<String>,
) -> Result<Json<Vec<Task>>, AppError> {
    houses::require_member(&state.pool, &house_id, &user.id).await?;
    Ok(Json(tasks::list(&state.pool, &house_id).await?))
}

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub reminder_offset_days: Option<i64>,
    pub recurrence: Option<String>,
    pub zone_id: Option<String>,
    pub category_id: Option<String>,
    pub project_id: Option<String>,
    pub equipment_id: Option<String>,
    pub animal_id: Option<String>,
    pub person_id: Option<String>,
    pub assignee_id: Option<String>,
}

impl Validate for CreateTaskRequest {
    type Output = NewTask;

    fn validate(self) -> SootResult<NewTask> {
        Ok(NewTask {
            title: required(self.title, "Le titre est obligatoire")?,
            description: non_blank(self.description),
            due_date: parse_optional_date(self.due_date)?,
            reminder_offset_days: self.reminder_offset_days,
            recurrence: parse_rule(self.recurrence),
            links: TaskLinks {
                zone_id: non_blank(self.zone_id),
                category_id: non_blank(self.category_id),
                project_id: non_blank(self.project_id),
                equipment_id: non_blank(self.equipment_id),
                animal_id: non_blank(self.animal_id),
                person_id: non_blank(self.person_id),
                assignee_id: non_blank(self.assignee_id),
            },
        })
    }
}

/// POST /houses/{house_id}/tasks - Create a task
async fn create_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(house_id): Path<String>,
    ValidJson(new): ValidJson<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    houses::require_member(&state.pool, &house_id, &user.id).await?;
    let task = tasks::create(&state.pool, &house_id, new).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[derive(Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub reminder_offset_days: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub recurrence: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub zone_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub project_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub equipment_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub animal_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub person_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<String>>,
}

impl Validate for UpdateTaskRequest {
    type Output = TaskPatch;

    fn validate(self) -> SootResult<TaskPatch> {
        Ok(TaskPatch {
            title: self
                .title
                .map(|t| required(t, "Le titre ne peut pas être vide"))
                .transpose()?,
            description: self.description.map(non_blank),
            due_date: self.due_date.map(parse_optional_date).transpose()?,
            reminder_offset_days: self.reminder_offset_days,
            recurrence: self.recurrence.map(parse_rule),
            zone_id: self.zone_id.map(non_blank),
            category_id: self.category_id.map(non_blank),
            project_id: self.project_id.map(non_blank),
            equipment_id: self.equipment_id.map(non_blank),
            animal_id: self.animal_id.map(non_blank),
            person_id: self.person_id.map(non_blank),
            assignee_id: self.assignee_id.map(non_blank),
        })
    }
}

async fn load_for_member(state: &AppState, id: &str, user: &User) -> Result<Task, AppError> {
    let task = tasks::get(&state.pool, id)
        .await?
        .ok_or_else(|| SootError::not_found("Tâche"))?;
    houses::require_member(&state.pool, &task.house_id, &user.id).await?;
    Ok(task)
}

/// PATCH /tasks/{id} - Partial update
async fn update_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ValidJson(patch): ValidJson<UpdateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let existing = load_for_member(&state, &id, &user).await?;
    Ok(Json(tasks::update(&state.pool, existing, patch).await?))
}

/// DELETE /tasks/{id}
async fn delete_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    load_for_member(&state, &id, &user).await?;
    tasks::delete(&state.pool, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct CompleteTaskResponse {
    pub task: Task,
    pub next: Option<Task>,
}

/// POST /tasks/{id}/complete - Mark done, spawning the next instance of a recurring task
async fn complete_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<CompleteTaskResponse>, AppError> {
    let task = load_for_member(&state, &id, &user).await?;
    let completion = tasks::complete(&state.pool, task, Utc::now()).await?;
    Ok(Json(CompleteTaskResponse {
        task: completion.task,
        next: completion.next,
    }))
}
