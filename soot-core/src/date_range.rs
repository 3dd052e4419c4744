//! Inclusive calendar ranges and strict `YYYY-MM-DD` parsing.
//!
//! Every calendar date handled by Soot is pinned to noon before being
//! compared, so a date never slides into the neighbouring day when it is
//! rendered in another timezone.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{SootError, SootResult};
use crate::month_key::MonthKey;

/// Hour every calendar date is normalized to.
pub const NORMALIZED_HOUR: u32 = 12;

/// Pin a calendar date to noon.
pub fn at_noon(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(NORMALIZED_HOUR, 0, 0).unwrap_or(NaiveTime::MIN))
}

/// Parse a strict `YYYY-MM-DD` date.
///
/// chrono accepts unpadded fields (`2024-1-5`), so the shape is checked first.
pub fn parse_iso_date(s: &str) -> SootResult<NaiveDate> {
    let bytes = s.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());

    if !well_formed {
        return Err(SootError::validation(format!(
            "Date invalide « {s} » : format attendu AAAA-MM-JJ"
        )));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| SootError::validation(format!("Date invalide « {s} » : ce jour n'existe pas")))
}

/// Widest distance from today accepted by [`DateRange::around`], about a century.
pub const MAX_WINDOW_DAYS: i64 = 36_525;

/// Closed calendar range `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> SootResult<Self> {
        if from > to {
            return Err(SootError::validation(
                "La date de début doit précéder ou égaler la date de fin",
            ));
        }
        Ok(DateRange { from, to })
    }

    /// Parse `from`/`to` query values. Both must be present, or neither.
    pub fn from_args(from: Option<&str>, to: Option<&str>) -> SootResult<Option<Self>> {
        match (from, to) {
            (None, None) => Ok(None),
            (Some(from), Some(to)) => {
                Ok(Some(Self::new(parse_iso_date(from)?, parse_iso_date(to)?)?))
            }
            _ => Err(SootError::validation(
                "Les paramètres « from » et « to » doivent être fournis ensemble",
            )),
        }
    }

    /// The whole month identified by `key`.
    pub fn for_month(key: MonthKey) -> Self {
        DateRange {
            from: key.first_day(),
            to: key.last_day(),
        }
    }

    /// `[today - past_days, today + future_days]`, each side clamped to
    /// [`MAX_WINDOW_DAYS`].
    pub fn around(today: NaiveDate, past_days: i64, future_days: i64) -> Self {
        let span = |days: i64| Duration::days(days.clamp(0, MAX_WINDOW_DAYS));
        DateRange {
            from: today.checked_sub_signed(span(past_days)).unwrap_or(NaiveDate::MIN),
            to: today.checked_add_signed(span(future_days)).unwrap_or(NaiveDate::MAX),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let at = at_noon(date);
        at >= self.start() && at <= self.end()
    }

    /// Inclusive lower bound, normalized to noon.
    pub fn start(&self) -> NaiveDateTime {
        at_noon(self.from)
    }

    /// Inclusive upper bound, normalized to noon.
    pub fn end(&self) -> NaiveDateTime {
        at_noon(self.to)
    }

    /// Calendar years the range touches, in order.
    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.from.year()..=self.to.year()
    }
}
