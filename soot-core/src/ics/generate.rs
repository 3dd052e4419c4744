//! ICS feed generation.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use icalendar::{Alarm, Calendar, Component, EventLike, Property, Trigger, ValueType};

use crate::error::SootResult;
use crate::occurrence::Occurrence;
use crate::recurrence::rule_for_all_day;
use crate::task::Task;

const PRODID: &str = "PRODID:-//Soot//Calendrier//FR";

/// Generate the feed body for `tasks` and important-date `occurrences`.
///
/// Tasks without a due date are skipped. An open recurring task carries
/// its RRULE; completed instances are exported as single events.
pub fn generate_feed(
    calendar_name: &str,
    tasks: &[Task],
    occurrences: &[Occurrence],
    now: DateTime<Utc>,
) -> SootResult<String> {
    let mut cal = Calendar::new();
    cal.name(calendar_name);

    let dtstamp = now.format("%Y%m%dT%H%M%SZ").to_string();

    for task in tasks {
        let Some(due) = task.due_date else {
            continue;
        };

        let mut ics_event = icalendar::Event::new();
        ics_event.uid(&format!("task-{}@soot", task.id));
        if task.done {
            ics_event.summary(&format!("✓ {}", task.title));
        } else {
            ics_event.summary(&task.title);
        }
        ics_event.add_property("DTSTAMP", &dtstamp);
        add_all_day(&mut ics_event, due);

        if let Some(ref desc) = task.description {
            ics_event.description(desc);
        }

        if let (Some(rule), false) = (&task.recurrence, task.done) {
            ics_event.add_property("RRULE", rule_for_all_day(rule));
        }

        if let Some(days) = task.reminder_offset_days.filter(|d| *d > 0) {
            let trigger = Trigger::before_start(Duration::days(days));
            ics_event.alarm(Alarm::display("Rappel", trigger));
        }

        cal.push(ics_event.done());
    }

    for occurrence in occurrences {
        let mut ics_event = icalendar::Event::new();
        ics_event.uid(&format!(
            "important-date-{}-{}@soot",
            occurrence.important_date_id,
            occurrence.date.format("%Y%m%d")
        ));
        ics_event.summary(&occurrence_summary(occurrence));
        ics_event.add_property("DTSTAMP", &dtstamp);
        ics_event.add_property("CATEGORIES", occurrence.date_type.label());
        ics_event.add_property("TRANSP", "TRANSPARENT");
        add_all_day(&mut ics_event, occurrence.date);

        cal.push(ics_event.done());
    }

    let cal = cal.done();
    Ok(strip_ics_bloat(&cal.to_string()))
}

fn occurrence_summary(occurrence: &Occurrence) -> String {
    match occurrence.years_since {
        Some(years) if years > 0 => format!("{} ({} ans)", occurrence.title, years),
        _ => occurrence.title.clone(),
    }
}

/// All-day event covering `date`; DTEND is exclusive.
fn add_all_day(ics_event: &mut icalendar::Event, date: NaiveDate) {
    let end = date.succ_opt().unwrap_or(date);
    for (name, value) in [("DTSTART", date), ("DTEND", end)] {
        let mut prop = Property::new(name, value.format("%Y%m%d").to_string());
        prop.append_parameter(ValueType::Date);
        ics_event.append_property(prop);
    }
}

/// Clean up ICS output from the icalendar crate
/// - Replace PRODID with Soot's identifier
/// - Remove DTSTAMP and UID inside VALARM sections (not required by RFC 5545)
fn strip_ics_bloat(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());
    let mut in_valarm = false;

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str(PRODID);
            result.push_str("\r\n");
            continue;
        }

        if line == "BEGIN:VALARM" {
            in_valarm = true;
        } else if line == "END:VALARM" {
            in_valarm = false;
        }

        if in_valarm && (line.starts_with("DTSTAMP:") || line.starts_with("UID:")) {
            continue;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_range::at_noon;
    use crate::important_date::ImportantDateType;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    fn make_task() -> Task {
        Task {
            id: "t1".into(),
            house_id: "h1".into(),
            title: "Vidanger la chaudière".into(),
            description: Some("Avant l'hiver".into()),
            due_date: Some(d(2024, 3, 20)),
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
            created_at: now(),
            updated_at: now(),
        }
    }

    fn birthday(years_since: Option<i32>) -> Occurrence {
        Occurrence {
            important_date_id: "i1".into(),
            title: "Anniversaire de Léa".into(),
            date_type: ImportantDateType::Birthday,
            date: d(2024, 3, 15),
            at: at_noon(d(2024, 3, 15)),
            recurring: true,
            years_since,
        }
    }

    #[test]
    fn task_is_an_all_day_event() {
        let ics = generate_feed("Maison", &[make_task()], &[], now()).unwrap();

        assert!(ics.contains("PRODID:-//Soot//Calendrier//FR"), "ICS:\n{}", ics);
        assert!(ics.contains("UID:task-t1@soot"));
        assert!(ics.contains("DTSTART;VALUE=DATE:20240320"), "ICS:\n{}", ics);
        assert!(ics.contains("DTEND;VALUE=DATE:20240321"), "ICS:\n{}", ics);
        assert!(ics.contains("DTSTAMP:20240301T093000Z"));
    }

    #[test]
    fn recurring_task_until_is_exported_as_a_date() {
        let mut task = make_task();
        task.recurrence = Some("FREQ=WEEKLY;UNTIL=20240601T000000Z".into());
        let ics = generate_feed("Maison", &[task], &[], now()).unwrap();

        assert!(ics.contains("RRULE:FREQ=WEEKLY;UNTIL=20240601\r\n"), "ICS:\n{}", ics);

        let mut task = make_task();
        task.recurrence = Some("FREQ=WEEKLY;UNTIL=20240601".into());
        let ics = generate_feed("Maison", &[task], &[], now()).unwrap();
        assert!(ics.contains("RRULE:FREQ=WEEKLY;UNTIL=20240601\r\n"), "ICS:\n{}", ics);
    }

    #[test]
    fn undated_task_is_skipped() {
        let mut task = make_task();
        task.due_date = None;
        let ics = generate_feed("Maison", &[task], &[], now()).unwrap();
        assert!(!ics.contains("BEGIN:VEVENT"));
    }

    #[test]
    fn reminder_becomes_minimal_alarm() {
        let mut task = make_task();
        task.reminder_offset_days = Some(2);
        let ics = generate_feed("Maison", &[task], &[], now()).unwrap();

        assert!(ics.contains("BEGIN:VALARM"));
        assert!(ics.contains("ACTION:DISPLAY"));
        let valarm_section = ics
            .split("BEGIN:VALARM")
            .nth(1)
            .unwrap()
            .split("END:VALARM")
            .next()
            .unwrap()
            .to_string();
        assert!(!valarm_section.contains("UID:"), "Got:\n{}", valarm_section);
        assert!(!valarm_section.contains("DTSTAMP:"), "Got:\n{}", valarm_section);
    }

    #[test]
    fn only_open_recurring_task_carries_rrule() {
        let mut task = make_task();
        task.recurrence = Some("RRULE:FREQ=WEEKLY".into());
        let ics = generate_feed("Maison", &[task.clone()], &[], now()).unwrap();
        assert!(ics.contains("RRULE:FREQ=WEEKLY"), "ICS:\n{}", ics);

        task.done = true;
        let ics = generate_feed("Maison", &[task], &[], now()).unwrap();
        assert!(!ics.contains("RRULE"));
        assert!(ics.contains("SUMMARY:✓ Vidanger la chaudière"), "ICS:\n{}", ics);
    }

    #[test]
    fn occurrence_uid_is_unique_per_date() {
        let ics = generate_feed("Maison", &[], &[birthday(Some(7))], now()).unwrap();
        assert!(ics.contains("UID:important-date-i1-20240315@soot"));
        assert!(ics.contains("Anniversaire de Léa (7 ans)"), "ICS:\n{}", ics);
        assert!(ics.contains("TRANSP:TRANSPARENT"));

        let ics = generate_feed("Maison", &[], &[birthday(Some(0))], now()).unwrap();
        assert!(!ics.contains("(0 ans)"));
    }
}
