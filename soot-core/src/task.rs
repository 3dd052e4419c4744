//! Household tasks and chores.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SootError, SootResult};
use crate::recurrence;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub house_id: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    /// Days before the due date at which a reminder is shown.
    pub reminder_offset_days: Option<i64>,
    /// RRULE body, e.g. `FREQ=WEEKLY;BYDAY=MO`.
    pub recurrence: Option<String>,
    /// Root task of the recurring series this instance belongs to.
    pub parent_id: Option<String>,

    pub zone_id: Option<String>,
    pub category_id: Option<String>,
    pub project_id: Option<String>,
    pub equipment_id: Option<String>,
    pub animal_id: Option<String>,
    pub person_id: Option<String>,
    pub assignee_id: Option<String>,

    pub image_path: Option<String>,
    pub done: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Date of the secondary reminder marker, if any.
    pub fn reminder_date(&self) -> Option<NaiveDate> {
        let due = self.due_date?;
        let offset = self.reminder_offset_days.filter(|days| *days > 0)?;
        Some(due - Duration::days(offset))
    }

    /// Id shared by every instance of this task's series.
    pub fn series_root_id(&self) -> &str {
        self.parent_id.as_deref().unwrap_or(&self.id)
    }

    /// Due date of the instance following this one, if the rule continues.
    pub fn next_due_date(&self) -> SootResult<Option<NaiveDate>> {
        let (Some(rule), Some(due)) = (self.recurrence.as_deref(), self.due_date) else {
            return Ok(None);
        };
        recurrence::next_after(rule, due, due)
    }

    /// The next instance of this recurring task, due on `due_date`.
    pub fn spawn_next(&self, id: String, due_date: NaiveDate, now: DateTime<Utc>) -> Task {
        Task {
            id,
            parent_id: Some(self.series_root_id().to_string()),
            due_date: Some(due_date),
            done: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }
}

/// Check the combination of due date, reminder and rule before storing a task.
pub fn validate_schedule(
    due_date: Option<NaiveDate>,
    reminder_offset_days: Option<i64>,
    rule: Option<&str>,
) -> SootResult<()> {
    if let Some(days) = reminder_offset_days {
        if !(0..=365).contains(&days) {
            return Err(SootError::validation(
                "Le rappel doit être compris entre 0 et 365 jours avant l'échéance",
            ));
        }
        if due_date.is_none() {
            return Err(SootError::validation(
                "Un rappel nécessite une date d'échéance",
            ));
        }
    }

    if let Some(rule) = rule {
        let due = due_date.ok_or_else(|| {
            SootError::validation("Une tâche récurrente nécessite une date d'échéance")
        })?;
        // Each instance re-anchors the rule on its own due date, so COUNT
        // would never run out.
        if recurrence::normalize_rule(rule)
            .to_ascii_uppercase()
            .split(';')
            .any(|part| part.starts_with("COUNT="))
        {
            return Err(SootError::validation(
                "COUNT n'est pas pris en charge pour les tâches : utilisez UNTIL",
            ));
        }
        recurrence::validate_rule(rule, due)
            .map_err(|e| SootError::validation(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample_task() -> Task {
        let now = Utc::now();
        Task {
            id: "task-1".into(),
            house_id: "house-1".into(),
            title: "Sortir les poubelles".into(),
            description: None,
            due_date: Some(d(2024, 1, 8)),
            reminder_offset_days: None,
            recurrence: None,
            parent_id: None,
            zone_id: None,
            category_id: None,
            project_id: None,
            equipment_id: None,
            animal_id: None,
            person_id: None,
            assignee_id: None,
            image_path: None,
            done: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn reminder_is_shifted_back_from_due_date() {
        let mut task = sample_task();
        task.reminder_offset_days = Some(3);
        assert_eq!(task.reminder_date(), Some(d(2024, 1, 5)));

        task.reminder_offset_days = Some(0);
        assert_eq!(task.reminder_date(), None);

        task.due_date = None;
        task.reminder_offset_days = Some(3);
        assert_eq!(task.reminder_date(), None);
    }

    #[test]
    fn spawned_instance_shares_the_series_root() {
        let mut task = sample_task();
        task.recurrence = Some("FREQ=WEEKLY".into());
        task.done = true;

        let next_due = task.next_due_date().unwrap().unwrap();
        assert_eq!(next_due, d(2024, 1, 15));

        let child = task.spawn_next("task-2".into(), next_due, Utc::now());
        assert_eq!(child.parent_id.as_deref(), Some("task-1"));
        assert!(!child.done);

        let grandchild = child.spawn_next("task-3".into(), d(2024, 1, 22), Utc::now());
        assert_eq!(grandchild.parent_id.as_deref(), Some("task-1"));
    }

    #[test]
    fn schedule_validation() {
        assert!(validate_schedule(None, None, None).is_ok());
        assert!(validate_schedule(None, Some(2), None).is_err());
        assert!(validate_schedule(Some(d(2024, 1, 1)), Some(400), None).is_err());
        assert!(validate_schedule(None, None, Some("FREQ=DAILY")).is_err());
        assert!(validate_schedule(Some(d(2024, 1, 1)), None, Some("FREQ=DAILY")).is_ok());
        assert!(validate_schedule(Some(d(2024, 1, 1)), None, Some("nope")).is_err());
        assert!(validate_schedule(Some(d(2024, 1, 1)), None, Some("FREQ=DAILY;COUNT=3")).is_err());
    }
}
