//! Expansion of important dates into concrete occurrences.
//!
//! A one-off date yields at most one occurrence; a yearly date yields one
//! per calendar year touched by the query range, starting from the year
//! it was recorded in.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::date_range::{DateRange, at_noon};
use crate::important_date::{ImportantDate, ImportantDateType};

/// What a February 29 yearly date becomes in a non-leap year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LeapDayPolicy {
    /// No occurrence that year.
    #[serde(rename = "skip")]
    Skip,
    /// Celebrate on February 28.
    #[default]
    #[serde(rename = "feb28")]
    ShiftToFeb28,
    /// Celebrate on March 1.
    #[serde(rename = "mar1")]
    ShiftToMar1,
}

/// A concrete calendar instance of an important date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub important_date_id: String,
    pub title: String,
    pub date_type: ImportantDateType,
    pub date: NaiveDate,
    /// The occurrence date pinned to noon.
    pub at: NaiveDateTime,
    pub recurring: bool,
    /// Years since the recorded date, for yearly dates (age, anniversary count).
    pub years_since: Option<i32>,
}

/// The month/day of `source` placed in `year`, honouring `policy` for leap days.
pub fn occurrence_in_year(source: NaiveDate, year: i32, policy: LeapDayPolicy) -> Option<NaiveDate> {
    if let Some(date) = NaiveDate::from_ymd_opt(year, source.month(), source.day()) {
        return Some(date);
    }

    // The only month/day missing from some years is Feb 29.
    match policy {
        LeapDayPolicy::Skip => None,
        LeapDayPolicy::ShiftToFeb28 => NaiveDate::from_ymd_opt(year, 2, 28),
        LeapDayPolicy::ShiftToMar1 => NaiveDate::from_ymd_opt(year, 3, 1),
    }
}

/// Expand `dates` into the occurrences falling inside `range`, sorted by date.
pub fn expand_occurrences(
    dates: &[ImportantDate],
    range: &DateRange,
    policy: LeapDayPolicy,
) -> Vec<Occurrence> {
    let mut occurrences: Vec<Occurrence> = dates
        .iter()
        .flat_map(|record| occurrences_of(record, range, policy))
        .collect();

    occurrences.sort_by(|a, b| {
        a.at.cmp(&b.at)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.important_date_id.cmp(&b.important_date_id))
    });
    occurrences
}

fn occurrences_of(record: &ImportantDate, range: &DateRange, policy: LeapDayPolicy) -> Vec<Occurrence> {
    if !record.recurring_yearly {
        return if range.contains(record.date) {
            vec![make_occurrence(record, record.date, None)]
        } else {
            Vec::new()
        };
    }

    range
        .years()
        .filter(|year| *year >= record.date.year())
        .filter_map(|year| occurrence_in_year(record.date, year, policy).map(|date| (year, date)))
        .filter(|(_, date)| range.contains(*date))
        .map(|(year, date)| make_occurrence(record, date, Some(year - record.date.year())))
        .collect()
}

fn make_occurrence(record: &ImportantDate, date: NaiveDate, years_since: Option<i32>) -> Occurrence {
    Occurrence {
        important_date_id: record.id.clone(),
        title: record.title.clone(),
        date_type: record.date_type,
        date,
        at: at_noon(date),
        recurring: record.recurring_yearly,
        years_since,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Timelike, Utc};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn record(id: &str, date: NaiveDate, recurring_yearly: bool) -> ImportantDate {
        ImportantDate {
            id: id.to_string(),
            house_id: "house".to_string(),
            title: format!("Date {id}"),
            date,
            recurring_yearly,
            date_type: ImportantDateType::Birthday,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn range(from: NaiveDate, to: NaiveDate) -> DateRange {
        DateRange::new(from, to).unwrap()
    }

    #[test]
    fn one_off_date_inside_range_appears_once() {
        let dates = vec![record("a", d(2024, 5, 10), false)];
        let out = expand_occurrences(&dates, &range(d(2024, 1, 1), d(2026, 12, 31)), LeapDayPolicy::Skip);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].date, d(2024, 5, 10));
        assert_eq!(out[0].years_since, None);
        assert_eq!(out[0].at.hour(), 12);
    }

    #[test]
    fn one_off_date_outside_range_is_dropped() {
        let dates = vec![record("a", d(2023, 12, 31), false)];
        let out = expand_occurrences(&dates, &range(d(2024, 1, 1), d(2024, 12, 31)), LeapDayPolicy::Skip);
        assert!(out.is_empty());
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let dates = vec![
            record("first", d(2024, 3, 1), false),
            record("last", d(2024, 3, 31), false),
        ];
        let out = expand_occurrences(&dates, &range(d(2024, 3, 1), d(2024, 3, 31)), LeapDayPolicy::Skip);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn yearly_date_yields_one_occurrence_per_year() {
        let dates = vec![record("bday", d(1990, 7, 14), true)];
        let out = expand_occurrences(&dates, &range(d(2023, 1, 1), d(2025, 12, 31)), LeapDayPolicy::Skip);

        let got: Vec<_> = out.iter().map(|o| (o.date, o.years_since)).collect();
        assert_eq!(
            got,
            vec![
                (d(2023, 7, 14), Some(33)),
                (d(2024, 7, 14), Some(34)),
                (d(2025, 7, 14), Some(35)),
            ]
        );
        assert!(out.iter().all(|o| o.important_date_id == "bday"));
    }

    #[test]
    fn yearly_date_wraps_across_new_year() {
        let dates = vec![record("nye", d(2000, 12, 31), true), record("jan", d(2000, 1, 2), true)];
        let out = expand_occurrences(&dates, &range(d(2023, 12, 15), d(2024, 1, 15)), LeapDayPolicy::Skip);

        let got: Vec<_> = out.iter().map(|o| o.date).collect();
        assert_eq!(got, vec![d(2023, 12, 31), d(2024, 1, 2)]);
    }

    #[test]
    fn yearly_date_does_not_precede_its_origin() {
        let dates = vec![record("wedding", d(2024, 6, 1), true)];
        let out = expand_occurrences(&dates, &range(d(2020, 1, 1), d(2025, 12, 31)), LeapDayPolicy::Skip);

        let got: Vec<_> = out.iter().map(|o| o.date).collect();
        assert_eq!(got, vec![d(2024, 6, 1), d(2025, 6, 1)]);
        assert_eq!(out[0].years_since, Some(0));
    }

    #[test]
    fn leap_day_policies() {
        let dates = vec![record("leap", d(2000, 2, 29), true)];
        let span = range(d(2023, 1, 1), d(2024, 12, 31));

        let skip: Vec<_> = expand_occurrences(&dates, &span, LeapDayPolicy::Skip)
            .into_iter()
            .map(|o| o.date)
            .collect();
        assert_eq!(skip, vec![d(2024, 2, 29)]);

        let feb28: Vec<_> = expand_occurrences(&dates, &span, LeapDayPolicy::ShiftToFeb28)
            .into_iter()
            .map(|o| o.date)
            .collect();
        assert_eq!(feb28, vec![d(2023, 2, 28), d(2024, 2, 29)]);

        let mar1: Vec<_> = expand_occurrences(&dates, &span, LeapDayPolicy::ShiftToMar1)
            .into_iter()
            .map(|o| o.date)
            .collect();
        assert_eq!(mar1, vec![d(2023, 3, 1), d(2024, 2, 29)]);
    }

    #[test]
    fn shifted_leap_day_respects_range_edge() {
        // Mar 1 shift lands outside a range that ends on Feb 28.
        let dates = vec![record("leap", d(2000, 2, 29), true)];
        let span = range(d(2023, 2, 1), d(2023, 2, 28));
        assert!(expand_occurrences(&dates, &span, LeapDayPolicy::ShiftToMar1).is_empty());
        assert_eq!(expand_occurrences(&dates, &span, LeapDayPolicy::ShiftToFeb28).len(), 1);
    }

    #[test]
    fn output_is_sorted_and_stable() {
        let dates = vec![
            record("b", d(2024, 9, 1), false),
            record("a", d(2000, 3, 1), true),
            record("c", d(2024, 3, 1), false),
        ];
        let span = range(d(2024, 1, 1), d(2024, 12, 31));
        let first = expand_occurrences(&dates, &span, LeapDayPolicy::Skip);
        let second = expand_occurrences(&dates, &span, LeapDayPolicy::Skip);

        assert_eq!(first, second);
        let ids: Vec<_> = first.iter().map(|o| o.important_date_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }
}
