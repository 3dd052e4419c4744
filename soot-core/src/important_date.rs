//! Important dates: birthdays, anniversaries and other dated events.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SootError;
use crate::occurrence::{LeapDayPolicy, occurrence_in_year};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImportantDateType {
    Birthday,
    Anniversary,
    Deadline,
    Holiday,
    #[default]
    Other,
}

impl ImportantDateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportantDateType::Birthday => "birthday",
            ImportantDateType::Anniversary => "anniversary",
            ImportantDateType::Deadline => "deadline",
            ImportantDateType::Holiday => "holiday",
            ImportantDateType::Other => "other",
        }
    }

    /// Label used in exported calendars.
    pub fn label(&self) -> &'static str {
        match self {
            ImportantDateType::Birthday => "Anniversaire",
            ImportantDateType::Anniversary => "Anniversaire de mariage",
            ImportantDateType::Deadline => "Échéance",
            ImportantDateType::Holiday => "Fête",
            ImportantDateType::Other => "Date importante",
        }
    }
}

impl fmt::Display for ImportantDateType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ImportantDateType {
    type Err = SootError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "birthday" => Ok(ImportantDateType::Birthday),
            "anniversary" => Ok(ImportantDateType::Anniversary),
            "deadline" => Ok(ImportantDateType::Deadline),
            "holiday" => Ok(ImportantDateType::Holiday),
            "other" => Ok(ImportantDateType::Other),
            other => Err(SootError::validation(format!(
                "Type de date inconnu « {other} »"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportantDate {
    pub id: String,
    pub house_id: String,
    pub title: String,
    pub date: NaiveDate,
    pub recurring_yearly: bool,
    pub date_type: ImportantDateType,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImportantDate {
    /// Next occurrence on or after `today`, or None for a past one-off date.
    pub fn next_occurrence(&self, today: NaiveDate, policy: LeapDayPolicy) -> Option<NaiveDate> {
        next_occurrence(self.date, self.recurring_yearly, today, policy)
    }
}

pub fn next_occurrence(
    date: NaiveDate,
    recurring_yearly: bool,
    today: NaiveDate,
    policy: LeapDayPolicy,
) -> Option<NaiveDate> {
    if !recurring_yearly {
        return (date >= today).then_some(date);
    }
    if date >= today {
        return Some(date);
    }

    // Leap years can be eight years apart (2096, 2104), so a skipped leap
    // day may only come back in the ninth year counted from today's.
    (today.year()..)
        .take(9)
        .filter_map(|year| occurrence_in_year(date, year, policy))
        .find(|candidate| *candidate >= today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn one_off_dates_expire() {
        let today = d(2024, 6, 1);
        assert_eq!(
            next_occurrence(d(2024, 7, 1), false, today, LeapDayPolicy::ShiftToFeb28),
            Some(d(2024, 7, 1))
        );
        assert_eq!(
            next_occurrence(d(2024, 5, 1), false, today, LeapDayPolicy::ShiftToFeb28),
            None
        );
    }

    #[test]
    fn yearly_dates_roll_to_next_year() {
        let today = d(2024, 6, 1);
        assert_eq!(
            next_occurrence(d(1990, 6, 1), true, today, LeapDayPolicy::ShiftToFeb28),
            Some(d(2024, 6, 1))
        );
        assert_eq!(
            next_occurrence(d(1990, 5, 31), true, today, LeapDayPolicy::ShiftToFeb28),
            Some(d(2025, 5, 31))
        );
    }

    #[test]
    fn skipped_leap_day_waits_for_next_leap_year() {
        let today = d(2024, 3, 1);
        assert_eq!(
            next_occurrence(d(2000, 2, 29), true, today, LeapDayPolicy::Skip),
            Some(d(2028, 2, 29))
        );
        assert_eq!(
            next_occurrence(d(2000, 2, 29), true, today, LeapDayPolicy::ShiftToMar1),
            Some(d(2025, 3, 1))
        );

        // 2100 is not a leap year.
        assert_eq!(
            next_occurrence(d(2000, 2, 29), true, d(2097, 3, 1), LeapDayPolicy::Skip),
            Some(d(2104, 2, 29))
        );
        assert_eq!(
            next_occurrence(d(2000, 2, 29), true, d(2096, 3, 1), LeapDayPolicy::Skip),
            Some(d(2104, 2, 29))
        );
    }

    #[test]
    fn type_round_trips_through_str() {
        for t in [
            ImportantDateType::Birthday,
            ImportantDateType::Anniversary,
            ImportantDateType::Deadline,
            ImportantDateType::Holiday,
            ImportantDateType::Other,
        ] {
            assert_eq!(t.as_str().parse::<ImportantDateType>().unwrap(), t);
        }
        assert!("party".parse::<ImportantDateType>().is_err());
    }
}
