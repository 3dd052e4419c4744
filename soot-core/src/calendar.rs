//! Calendar projection: tasks and important-date occurrences merged into
//! one list of displayable items.
//!
//! Each item carries the names and image state the calendar view needs, so
//! rendering never has to look anything else up. Ordering is left to the
//! caller.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::date_range::DateRange;
use crate::error::SootResult;
use crate::image_job::ImageState;
use crate::important_date::ImportantDateType;
use crate::occurrence::Occurrence;
use crate::recurrence;
use crate::task::Task;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: String,
    pub name: String,
}

/// Denormalized task links resolved by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContext {
    pub zone: Option<NamedRef>,
    pub category: Option<NamedRef>,
    pub assignee: Option<NamedRef>,
    pub project: Option<NamedRef>,
    pub equipment: Option<NamedRef>,
    pub image: ImageState,
}

#[derive(Debug, Clone)]
pub struct TaskEntry {
    pub task: Task,
    pub context: TaskContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarItemKind {
    Task,
    Reminder,
    ImportantDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarItem {
    pub kind: CalendarItemKind,
    pub date: NaiveDate,
    pub title: String,
    pub task_id: Option<String>,
    pub important_date_id: Option<String>,
    /// Reminder items point at the due date they announce.
    pub due_date: Option<NaiveDate>,
    pub done: bool,
    /// Future instance of a recurring task that is not stored yet.
    pub projected: bool,
    pub date_type: Option<ImportantDateType>,
    pub years_since: Option<i32>,
    pub context: TaskContext,
}

impl CalendarItem {
    fn for_task(entry: &TaskEntry, kind: CalendarItemKind, date: NaiveDate, due: NaiveDate, projected: bool) -> Self {
        CalendarItem {
            kind,
            date,
            title: entry.task.title.clone(),
            task_id: Some(entry.task.id.clone()),
            important_date_id: None,
            due_date: Some(due),
            done: entry.task.done && !projected,
            projected,
            date_type: None,
            years_since: None,
            context: entry.context.clone(),
        }
    }

    fn for_occurrence(occurrence: &Occurrence) -> Self {
        CalendarItem {
            kind: CalendarItemKind::ImportantDate,
            date: occurrence.date,
            title: occurrence.title.clone(),
            task_id: None,
            important_date_id: Some(occurrence.important_date_id.clone()),
            due_date: None,
            done: false,
            projected: false,
            date_type: Some(occurrence.date_type),
            years_since: occurrence.years_since,
            context: TaskContext::default(),
        }
    }
}

/// Project `tasks` and `occurrences` onto `range`.
///
/// Tasks without a due date are left out. A reminder offset adds a
/// `Reminder` item before the due date of stored instances; open recurring
/// tasks also yield `projected` items for later rule dates in the range.
pub fn project(tasks: &[TaskEntry], occurrences: &[Occurrence], range: &DateRange) -> SootResult<Vec<CalendarItem>> {
    let mut items = Vec::new();

    for entry in tasks {
        let Some(due) = entry.task.due_date else {
            continue;
        };

        if range.contains(due) {
            items.push(CalendarItem::for_task(entry, CalendarItemKind::Task, due, due, false));
        }

        if let Some(reminder) = entry.task.reminder_date().filter(|d| range.contains(*d)) {
            items.push(CalendarItem::for_task(entry, CalendarItemKind::Reminder, reminder, due, false));
        }

        if let (Some(rule), false) = (entry.task.recurrence.as_deref(), entry.task.done) {
            for date in recurrence::occurrences_between(rule, due, range)? {
                if date > due {
                    items.push(CalendarItem::for_task(entry, CalendarItemKind::Task, date, date, true));
                }
            }
        }
    }

    items.extend(
        occurrences
            .iter()
            .filter(|o| range.contains(o.date))
            .map(CalendarItem::for_occurrence),
    );

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::important_date::ImportantDateType;
    use chrono::{Utc, NaiveDateTime};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn entry(id: &str, due: Option<NaiveDate>) -> TaskEntry {
        let now = Utc::now();
        TaskEntry {
            task: Task {
                id: id.into(),
                house_id: "h".into(),
                title: format!("Tâche {id}"),
                description: None,
                due_date: due,
                reminder_offset_days: None,
                recurrence: None,
                parent_id: None,
                zone_id: Some("z1".into()),
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
            },
            context: TaskContext {
                zone: Some(NamedRef {
                    id: "z1".into(),
                    name: "Cuisine".into(),
                }),
                ..TaskContext::default()
            },
        }
    }

    fn march() -> DateRange {
        DateRange::new(d(2024, 3, 1), d(2024, 3, 31)).unwrap()
    }

    #[test]
    fn undated_tasks_are_excluded() {
        let items = project(&[entry("a", None)], &[], &march()).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn reminder_does_not_move_the_due_item() {
        let mut e = entry("a", Some(d(2024, 3, 10)));
        e.task.reminder_offset_days = Some(2);

        let items = project(&[e], &[], &march()).unwrap();
        assert_eq!(items.len(), 2);

        let due = items.iter().find(|i| i.kind == CalendarItemKind::Task).unwrap();
        assert_eq!(due.date, d(2024, 3, 10));
        assert_eq!(due.context.zone.as_ref().unwrap().name, "Cuisine");

        let reminder = items.iter().find(|i| i.kind == CalendarItemKind::Reminder).unwrap();
        assert_eq!(reminder.date, d(2024, 3, 8));
        assert_eq!(reminder.due_date, Some(d(2024, 3, 10)));
    }

    #[test]
    fn reminder_inside_range_for_due_date_outside() {
        let mut e = entry("a", Some(d(2024, 4, 2)));
        e.task.reminder_offset_days = Some(5);

        let items = project(&[e], &[], &march()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, CalendarItemKind::Reminder);
        assert_eq!(items[0].date, d(2024, 3, 28));
    }

    #[test]
    fn open_recurring_task_is_projected_forward() {
        let mut e = entry("a", Some(d(2024, 3, 4)));
        e.task.recurrence = Some("FREQ=WEEKLY".into());

        let items = project(&[e.clone()], &[], &march()).unwrap();
        let dates: Vec<_> = items.iter().map(|i| (i.date, i.projected)).collect();
        assert_eq!(
            dates,
            vec![
                (d(2024, 3, 4), false),
                (d(2024, 3, 11), true),
                (d(2024, 3, 18), true),
                (d(2024, 3, 25), true),
            ]
        );

        e.task.done = true;
        let items = project(&[e], &[], &march()).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].done);
    }

    #[test]
    fn occurrences_become_important_date_items() {
        let occurrence = Occurrence {
            important_date_id: "id1".into(),
            title: "Anniversaire de Léa".into(),
            date_type: ImportantDateType::Birthday,
            date: d(2024, 3, 15),
            at: NaiveDateTime::default(),
            recurring: true,
            years_since: Some(7),
        };

        let items = project(&[], &[occurrence], &march()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, CalendarItemKind::ImportantDate);
        assert_eq!(items[0].years_since, Some(7));
        assert_eq!(items[0].date_type, Some(ImportantDateType::Birthday));
    }
}
