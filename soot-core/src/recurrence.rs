//! RRULE handling for recurring tasks.
//!
//! A task's rule is anchored on its due date (pinned to noon UTC) and only
//! ever yields whole calendar dates.

use chrono::{Duration, NaiveDate, Utc};
use rrule::RRuleSet;

use crate::date_range::{DateRange, at_noon};
use crate::error::{SootError, SootResult};

/// Upper bound on instances produced for one query.
const MAX_INSTANCES: u16 = 366;

/// Strip an optional `RRULE:` prefix and surrounding whitespace.
pub fn normalize_rule(rule: &str) -> String {
    let trimmed = rule.trim();
    trimmed
        .strip_prefix("RRULE:")
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

/// Calendar date carried by an `UNTIL` value: `YYYYMMDD`, optionally
/// followed by a floating or UTC time.
fn until_date(value: &str) -> Option<&str> {
    let bytes = value.as_bytes();
    let digits = |range: &[u8]| range.iter().all(u8::is_ascii_digit);
    let time_ok = match bytes.len() {
        8 => true,
        15 => bytes[8] == b'T' && digits(&bytes[9..]),
        16 => bytes[8] == b'T' && bytes[15] == b'Z' && digits(&bytes[9..15]),
        _ => false,
    };
    (time_ok && digits(&bytes[..8])).then(|| &value[..8])
}

/// Rewrite the `UNTIL` part of `rule`, leaving values that are not dates untouched.
fn map_until(rule: &str, rewrite: impl Fn(&str) -> String) -> String {
    rule.split(';')
        .map(|part| match part.split_once('=') {
            Some((key, value)) if key.trim().eq_ignore_ascii_case("UNTIL") => match until_date(value.trim()) {
                Some(date) => format!("UNTIL={}", rewrite(date)),
                None => part.to_string(),
            },
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Tasks are whole days, so `UNTIL` bounds the series at the end of its date
/// whatever form it was written in.
fn until_end_of_day(rule: &str) -> String {
    map_until(rule, |date| format!("{date}T235959Z"))
}

/// The rule as written next to a `DTSTART;VALUE=DATE`: `UNTIL` must then be a DATE.
pub fn rule_for_all_day(rule: &str) -> String {
    map_until(&normalize_rule(rule), str::to_string)
}

/// Build an iCalendar-format rule set for the rrule crate parser.
fn build_rule_set(rule: &str, anchor: NaiveDate) -> SootResult<RRuleSet> {
    let rule = normalize_rule(rule);

    if rule.is_empty() || rule.contains(['\n', '\r', ':']) {
        return Err(SootError::Recurrence(format!("« {rule} »")));
    }

    let source = format!(
        "DTSTART:{}\nRRULE:{}",
        at_noon(anchor).format("%Y%m%dT%H%M%SZ"),
        until_end_of_day(&rule)
    );

    source
        .parse::<RRuleSet>()
        .map_err(|_| SootError::Recurrence(format!("« {rule} »")))
}

/// Check that `rule` parses when anchored on `anchor`.
pub fn validate_rule(rule: &str, anchor: NaiveDate) -> SootResult<()> {
    build_rule_set(rule, anchor).map(|_| ())
}

/// Dates produced by `rule` (anchored on `anchor`) inside `range`, inclusive.
pub fn occurrences_between(rule: &str, anchor: NaiveDate, range: &DateRange) -> SootResult<Vec<NaiveDate>> {
    let set = build_rule_set(rule, anchor)?;

    // after/before are exclusive, so widen by one second.
    let tz: rrule::Tz = Utc.into();
    let after = (range.start().and_utc() - Duration::seconds(1)).with_timezone(&tz);
    let before = (range.end().and_utc() + Duration::seconds(1)).with_timezone(&tz);

    let result = set.after(after).before(before).all(MAX_INSTANCES);

    Ok(result.dates.iter().map(|dt| dt.date_naive()).collect())
}

/// First date produced by `rule` strictly after `after`.
pub fn next_after(rule: &str, anchor: NaiveDate, after: NaiveDate) -> SootResult<Option<NaiveDate>> {
    let set = build_rule_set(rule, anchor)?;

    let tz: rrule::Tz = Utc.into();
    let after = (at_noon(after).and_utc() + Duration::seconds(1)).with_timezone(&tz);

    let result = set.after(after).all(1);

    Ok(result.dates.first().map(|dt| dt.date_naive()))
}
