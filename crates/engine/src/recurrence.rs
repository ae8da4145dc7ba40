//! The recurrence engine of `spec.md` §4.3: computes the next due instant
//! for a recurring task. Deliberately kept separate from
//! `curve::expected_interval_duration`, which approximates interval length
//! for the Accumulator ramp rather than computing an exact next occurrence.

use crate::model::{IntervalUnit, RecurrenceKind, RecurrenceMode, RecurrencePattern};
use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc, Weekday};

/// Computes the next due instant for `pattern`, given the task's last
/// completion (if any), its creation time, and the instant recurrence is
/// being evaluated from (typically "now" or the completion instant).
pub fn next_due(
    pattern: &RecurrencePattern,
    last_completed: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let computed = match pattern.mode {
        RecurrenceMode::Calendar => next_due_calendar(pattern, created_at, now),
        RecurrenceMode::Completion => next_due_completion(pattern, last_completed, now),
    };
    match pattern.time_of_day {
        Some(time) => overwrite_time_of_day(computed, time),
        None => computed,
    }
}

fn next_due_calendar(pattern: &RecurrencePattern, created_at: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    match pattern.kind {
        RecurrenceKind::Daily => midnight_of(now + Duration::days(1)),
        RecurrenceKind::Weekly => match pattern.day_of_week {
            Some(day) => next_weekday_strictly_after(now, day),
            None => now + Duration::days(7),
        },
        RecurrenceKind::Monthly => add_calendar_months(now, 1),
        RecurrenceKind::Interval => {
            let anchor = pattern.anchor.unwrap_or(created_at);
            let interval = interval_duration(pattern);
            if interval.num_milliseconds() <= 0 {
                return now;
            }
            let elapsed = now - anchor;
            let steps = ceil_div(elapsed.num_milliseconds(), interval.num_milliseconds());
            anchor + interval * (steps as i32)
        }
    }
}

fn next_due_completion(
    pattern: &RecurrencePattern,
    last_completed: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    debug_assert_eq!(pattern.kind, RecurrenceKind::Interval);
    let base = last_completed.unwrap_or(now);
    base + interval_duration(pattern)
}

fn interval_duration(pattern: &RecurrencePattern) -> Duration {
    let n = pattern.interval.unwrap_or(1) as i64;
    match pattern.unit {
        Some(IntervalUnit::Days) | None => Duration::days(n),
        Some(IntervalUnit::Weeks) => Duration::days(n * 7),
        // Calendar-month intervals are approximated as 30 days here; exact
        // month-boundary semantics are only defined for RecurrenceKind::Monthly.
        Some(IntervalUnit::Months) => Duration::days(n * 30),
    }
}

fn ceil_div(numerator: i64, denominator: i64) -> i64 {
    if denominator == 0 {
        return 0;
    }
    let (q, r) = (numerator / denominator, numerator % denominator);
    if r != 0 && (r > 0) == (denominator > 0) {
        q + 1
    } else {
        q
    }
}

fn midnight_of(t: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&t.date_naive().and_hms_opt(0, 0, 0).unwrap())
}

fn next_weekday_strictly_after(now: DateTime<Utc>, target: u8) -> DateTime<Utc> {
    let target_weekday = weekday_from_u8(target);
    let mut candidate = midnight_of(now + Duration::days(1));
    loop {
        if candidate.weekday() == target_weekday {
            return candidate;
        }
        candidate += Duration::days(1);
    }
}

fn weekday_from_u8(d: u8) -> Weekday {
    match d {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        _ => Weekday::Sat,
    }
}

/// Adds whole calendar months, clamping the day-of-month into the target
/// month when it would otherwise overflow (e.g. Jan 31 + 1 month -> Feb 28).
fn add_calendar_months(t: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    let total_months = t.month0() + months;
    let years_to_add = total_months / 12;
    let target_month0 = total_months % 12;
    let target_year = t.year() + years_to_add as i32;
    let target_month = target_month0 + 1;

    let last_day = days_in_month(target_year, target_month);
    let target_day = t.day().min(last_day);

    let naive_date = chrono::NaiveDate::from_ymd_opt(target_year, target_month, target_day)
        .expect("clamped day is valid for target month");
    let naive = naive_date.and_time(t.time());
    Utc.from_utc_datetime(&naive)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_of_next = chrono::NaiveDate::from_ymd_opt(next_year, next_month, 1).unwrap();
    let first_of_this = chrono::NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    (first_of_next - first_of_this).num_days() as u32
}

fn overwrite_time_of_day(t: DateTime<Utc>, time: NaiveTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&t.date_naive().and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pattern(mode: RecurrenceMode, kind: RecurrenceKind) -> RecurrencePattern {
        RecurrencePattern {
            mode,
            kind,
            interval: None,
            unit: None,
            day_of_week: None,
            days_of_week: None,
            time_of_day: None,
            anchor: None,
        }
    }

    #[test]
    fn weekly_recurrence_skips_to_next_matching_weekday() {
        // Monday = 1. Completed on Wednesday 2025-01-08.
        let mut p = pattern(RecurrenceMode::Calendar, RecurrenceKind::Weekly);
        p.day_of_week = Some(1);
        let completed = Utc.with_ymd_and_hms(2025, 1, 8, 10, 0, 0).unwrap();
        let due = next_due(&p, None, completed, completed);
        assert_eq!(due.date_naive(), Utc.with_ymd_and_hms(2025, 1, 13, 0, 0, 0).unwrap().date_naive());
    }

    #[test]
    fn completion_interval_adds_exact_duration() {
        let mut p = pattern(RecurrenceMode::Completion, RecurrenceKind::Interval);
        p.interval = Some(2);
        p.unit = Some(IntervalUnit::Weeks);
        let completed = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        let due = next_due(&p, Some(completed), completed, completed);
        assert_eq!(due, Utc.with_ymd_and_hms(2025, 1, 24, 12, 0, 0).unwrap());
    }

    #[test]
    fn monthly_recurrence_clamps_into_shorter_month() {
        let p = pattern(RecurrenceMode::Calendar, RecurrenceKind::Monthly);
        let now = Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap();
        let due = next_due(&p, None, now, now);
        assert_eq!(due.date_naive(), Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap().date_naive());
    }

    #[test]
    fn daily_recurrence_is_midnight_of_next_day() {
        let p = pattern(RecurrenceMode::Calendar, RecurrenceKind::Daily);
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 14, 30, 0).unwrap();
        let due = next_due(&p, None, now, now);
        assert_eq!(due, Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn time_of_day_override_replaces_computed_time() {
        let mut p = pattern(RecurrenceMode::Calendar, RecurrenceKind::Daily);
        p.time_of_day = Some(NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 14, 30, 0).unwrap();
        let due = next_due(&p, None, now, now);
        assert_eq!(due, Utc.with_ymd_and_hms(2025, 3, 2, 8, 30, 0).unwrap());
    }

    #[test]
    fn calendar_interval_uses_anchor_and_ceils_steps() {
        let mut p = pattern(RecurrenceMode::Calendar, RecurrenceKind::Interval);
        p.interval = Some(3);
        p.unit = Some(IntervalUnit::Days);
        let anchor = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        p.anchor = Some(anchor);
        let now = Utc.with_ymd_and_hms(2025, 1, 4, 12, 0, 0).unwrap();
        let due = next_due(&p, None, anchor, now);
        // elapsed = 3.5 days, interval = 3 days -> ceil(3.5/3) = 2 steps -> anchor + 6d
        assert_eq!(due, anchor + Duration::days(6));
    }
}
