//! Task storage, completion of recurring series and the calendar context join.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use soot_core::SootError;
use soot_core::calendar::{NamedRef, TaskContext, TaskEntry};
use soot_core::image_job::{ImageEntityKind, ImageState};
use soot_core::task::{Task, validate_schedule};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteExecutor, SqlitePool};
use tracing::info;

use super::{catalog, image_jobs, new_id};

/// Optional links from a task to the house's other records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskLinks {
    pub zone_id: Option<String>,
    pub category_id: Option<String>,
    pub project_id: Option<String>,
    pub equipment_id: Option<String>,
    pub animal_id: Option<String>,
    pub person_id: Option<String>,
    pub assignee_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub reminder_offset_days: Option<i64>,
    pub recurrence: Option<String>,
    pub links: TaskLinks,
}

/// Fields to change. The nested options distinguish "leave as is" (`None`)
/// from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub reminder_offset_days: Option<Option<i64>>,
    pub recurrence: Option<Option<String>>,
    pub zone_id: Option<Option<String>>,
    pub category_id: Option<Option<String>>,
    pub project_id: Option<Option<String>>,
    pub equipment_id: Option<Option<String>>,
    pub animal_id: Option<Option<String>>,
    pub person_id: Option<Option<String>>,
    pub assignee_id: Option<Option<String>>,
}

/// Result of completing a task.
#[derive(Debug, Clone)]
pub struct Completion {
    pub task: Task,
    /// Next instance, for recurring tasks whose rule continues.
    pub next: Option<Task>,
}

const COLUMNS: &str = "id, house_id, title, description, due_date, reminder_offset_days, recurrence, \
     parent_id, zone_id, category_id, project_id, equipment_id, animal_id, person_id, assignee_id, \
     image_path, done, completed_at, created_at, updated_at";

fn from_row(row: &SqliteRow) -> sqlx::Result<Task> {
    Ok(Task {
        id: row.try_get("id")?,
        house_id: row.try_get("house_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        due_date: row.try_get("due_date")?,
        reminder_offset_days: row.try_get("reminder_offset_days")?,
        recurrence: row.try_get("recurrence")?,
        parent_id: row.try_get("parent_id")?,
        zone_id: row.try_get("zone_id")?,
        category_id: row.try_get("category_id")?,
        project_id: row.try_get("project_id")?,
        equipment_id: row.try_get("equipment_id")?,
        animal_id: row.try_get("animal_id")?,
        person_id: row.try_get("person_id")?,
        assignee_id: row.try_get("assignee_id")?,
        image_path: row.try_get("image_path")?,
        done: row.try_get("done")?,
        completed_at: row.try_get("completed_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn insert<'e>(executor: impl SqliteExecutor<'e>, task: &Task) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO tasks ({COLUMNS})
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&task.id)
    .bind(&task.house_id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.due_date)
    .bind(task.reminder_offset_days)
    .bind(&task.recurrence)
    .bind(&task.parent_id)
    .bind(&task.zone_id)
    .bind(&task.category_id)
    .bind(&task.project_id)
    .bind(&task.equipment_id)
    .bind(&task.animal_id)
    .bind(&task.person_id)
    .bind(&task.assignee_id)
    .bind(&task.image_path)
    .bind(task.done)
    .bind(task.completed_at)
    .bind(task.created_at)
    .bind(task.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Every link must point at a record of the same house; the assignee must
/// be a member of it.
async fn validate_links(pool: &SqlitePool, house_id: &str, links: &TaskLinks) -> Result<()> {
    let checks = [
        ("zones", &links.zone_id, "Zone"),
        ("categories", &links.category_id, "Catégorie"),
        ("projects", &links.project_id, "Projet"),
        ("equipment", &links.equipment_id, "Équipement"),
        ("animals", &links.animal_id, "Animal"),
        ("people", &links.person_id, "Personne"),
    ];
    for (table, id, label) in checks {
        if let Some(id) = id {
            if !catalog::exists_in_house(pool, table, house_id, id).await? {
                return Err(SootError::validation(format!("{label} inconnu(e) pour cette maison")).into());
            }
        }
    }

    if let Some(user_id) = &links.assignee_id {
        let member = sqlx::query("SELECT 1 FROM house_members WHERE house_id = ? AND user_id = ?")
            .bind(house_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        if member.is_none() {
            return Err(SootError::validation("La personne assignée n'est pas membre de cette maison").into());
        }
    }

    Ok(())
}

fn links_of(task: &Task) -> TaskLinks {
    TaskLinks {
        zone_id: task.zone_id.clone(),
        category_id: task.category_id.clone(),
        project_id: task.project_id.clone(),
        equipment_id: task.equipment_id.clone(),
        animal_id: task.animal_id.clone(),
        person_id: task.person_id.clone(),
        assignee_id: task.assignee_id.clone(),
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(SootError::validation("Le titre est obligatoire").into());
    }
    Ok(())
}

pub async fn create(pool: &SqlitePool, house_id: &str, new: NewTask) -> Result<Task> {
    validate_title(&new.title)?;
    validate_schedule(new.due_date, new.reminder_offset_days, new.recurrence.as_deref())?;
    validate_links(pool, house_id, &new.links).await?;

    let now = Utc::now();
    let TaskLinks {
        zone_id,
        category_id,
        project_id,
        equipment_id,
        animal_id,
        person_id,
        assignee_id,
    } = new.links;

    let task = Task {
        id: new_id(),
        house_id: house_id.to_string(),
        title: new.title.trim().to_string(),
        description: new.description,
        due_date: new.due_date,
        reminder_offset_days: new.reminder_offset_days,
        recurrence: new.recurrence,
        parent_id: None,
        zone_id,
        category_id,
        project_id,
        equipment_id,
        animal_id,
        person_id,
        assignee_id,
        image_path: None,
        done: false,
        completed_at: None,
        created_at: now,
        updated_at: now,
    };

    insert(pool, &task).await?;
    info!(target: "soot", event = "task_created", task_id = %task.id, house_id, recurring = task.is_recurring());
    Ok(task)
}

pub async fn get(pool: &SqlitePool, id: &str) -> Result<Option<Task>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM tasks WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(from_row).transpose()?)
}

pub async fn list(pool: &SqlitePool, house_id: &str) -> Result<Vec<Task>> {
    list_for_houses(pool, &[house_id.to_string()]).await
}

/// Tasks of every house in `house_ids`; undated tasks come last.
pub async fn list_for_houses(pool: &SqlitePool, house_ids: &[String]) -> Result<Vec<Task>> {
    if house_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {COLUMNS} FROM tasks WHERE house_id IN ("));
    let mut separated = query.separated(", ");
    for id in house_ids {
        separated.push_bind(id);
    }
    query.push(") ORDER BY due_date IS NULL, due_date, title, id");

    let rows = query.build().fetch_all(pool).await?;
    Ok(rows.iter().map(from_row).collect::<sqlx::Result<_>>()?)
}

/// Tasks of a house with the names and image state calendar items display.
pub async fn list_with_context(pool: &SqlitePool, house_id: &str, now: DateTime<Utc>) -> Result<Vec<TaskEntry>> {
    let generating = image_jobs::live_pending_ids(pool, ImageEntityKind::Task, now).await?;

    let rows = sqlx::query(
        "SELECT t.*,
                z.name AS zone_name, c.name AS category_name, u.name AS assignee_name,
                p.name AS project_name, e.name AS equipment_name
           FROM tasks t
           LEFT JOIN zones z ON z.id = t.zone_id
           LEFT JOIN categories c ON c.id = t.category_id
           LEFT JOIN users u ON u.id = t.assignee_id
           LEFT JOIN projects p ON p.id = t.project_id
           LEFT JOIN equipment e ON e.id = t.equipment_id
          WHERE t.house_id = ?
          ORDER BY t.due_date IS NULL, t.due_date, t.title, t.id",
    )
    .bind(house_id)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in &rows {
        let task = from_row(row)?;
        let named = |id: &Option<String>, column: &str| -> sqlx::Result<Option<NamedRef>> {
            let name: Option<String> = row.try_get(column)?;
            Ok(id.clone().zip(name).map(|(id, name)| NamedRef { id, name }))
        };
        let context = TaskContext {
            zone: named(&task.zone_id, "zone_name")?,
            category: named(&task.category_id, "category_name")?,
            assignee: named(&task.assignee_id, "assignee_name")?,
            project: named(&task.project_id, "project_name")?,
            equipment: named(&task.equipment_id, "equipment_name")?,
            image: ImageState {
                has_image: task.image_path.as_deref().is_some_and(|p| !p.is_empty()),
                generating: generating.contains(&task.id),
            },
        };
        entries.push(TaskEntry { task, context });
    }

    Ok(entries)
}

pub async fn update(pool: &SqlitePool, existing: Task, patch: TaskPatch) -> Result<Task> {
    let updated = Task {
        title: patch.title.map(|t| t.trim().to_string()).unwrap_or(existing.title),
        description: patch.description.unwrap_or(existing.description),
        due_date: patch.due_date.unwrap_or(existing.due_date),
        reminder_offset_days: patch.reminder_offset_days.unwrap_or(existing.reminder_offset_days),
        recurrence: patch.recurrence.unwrap_or(existing.recurrence),
        zone_id: patch.zone_id.unwrap_or(existing.zone_id),
        category_id: patch.category_id.unwrap_or(existing.category_id),
        project_id: patch.project_id.unwrap_or(existing.project_id),
        equipment_id: patch.equipment_id.unwrap_or(existing.equipment_id),
        animal_id: patch.animal_id.unwrap_or(existing.animal_id),
        person_id: patch.person_id.unwrap_or(existing.person_id),
        assignee_id: patch.assignee_id.unwrap_or(existing.assignee_id),
        updated_at: Utc::now(),
        ..existing
    };

    validate_title(&updated.title)?;
    validate_schedule(updated.due_date, updated.reminder_offset_days, updated.recurrence.as_deref())?;
    validate_links(pool, &updated.house_id, &links_of(&updated)).await?;

    sqlx::query(
        "UPDATE tasks
            SET title = ?, description = ?, due_date = ?, reminder_offset_days = ?, recurrence = ?,
                zone_id = ?, category_id = ?, project_id = ?, equipment_id = ?, animal_id = ?,
                person_id = ?, assignee_id = ?, updated_at = ?
          WHERE id = ?",
    )
    .bind(&updated.title)
    .bind(&updated.description)
    .bind(updated.due_date)
    .bind(updated.reminder_offset_days)
    .bind(&updated.recurrence)
    .bind(&updated.zone_id)
    .bind(&updated.category_id)
    .bind(&updated.project_id)
    .bind(&updated.equipment_id)
    .bind(&updated.animal_id)
    .bind(&updated.person_id)
    .bind(&updated.assignee_id)
    .bind(updated.updated_at)
    .bind(&updated.id)
    .execute(pool)
    .await?;

    info!(target: "soot", event = "task_updated", task_id = %updated.id);
    Ok(updated)
}

/// Mark a task done. For an open recurring task the next instance is
/// created in the same transaction, linked to the series root.
pub async fn complete(pool: &SqlitePool, task: Task, now: DateTime<Utc>) -> Result<Completion> {
    if task.done {
        return Err(SootError::Conflict("Cette tâche est déjà terminée".into()).into());
    }

    let next_due = task.next_due_date()?;
    let mut tx = pool.begin().await?;

    // The done = 0 guard keeps two concurrent completions from both spawning.
    let result = sqlx::query("UPDATE tasks SET done = 1, completed_at = ?, updated_at = ? WHERE id = ? AND done = 0")
        .bind(now)
        .bind(now)
        .bind(&task.id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(SootError::Conflict("Cette tâche est déjà terminée".into()).into());
    }

    let next = match next_due {
        Some(due) => {
            let next = task.spawn_next(new_id(), due, now);
            insert(&mut *tx, &next).await?;
            Some(next)
        }
        None => None,
    };

    tx.commit().await?;

    info!(
        target: "soot",
        event = "task_completed",
        task_id = %task.id,
        next_task_id = next.as_ref().map(|t| t.id.as_str()),
    );

    Ok(Completion {
        task: Task {
            done: true,
            completed_at: Some(now),
            updated_at: now,
            ..task
        },
        next,
    })
}

pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    info!(target: "soot", event = "task_deleted", task_id = id);
    Ok(result.rows_affected() > 0)
}
