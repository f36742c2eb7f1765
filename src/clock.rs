use std::time::Duration;

use chrono::{DateTime, Days, Local, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Timelike};

use crate::alarm::model::TimeOfDay;

/// Minimum repaint delay so a tick landing right on a boundary cannot spin.
const MIN_TICK_DELAY_MS: i64 = 10;

pub(crate) fn resolve_local_datetime<Tz>(timezone: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    match timezone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(first, _second) => Some(first),
        LocalResult::None => None,
    }
}

/// Next calendar instant with the given hour:minute (seconds zeroed) that is
/// strictly after `now`: today if the time of day is still ahead, otherwise
/// tomorrow. Wall times erased by a DST jump are skipped to the next day.
pub(crate) fn next_occurrence_in_tz<Tz>(now: &DateTime<Tz>, time: TimeOfDay) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    let wall = NaiveTime::from_hms_opt(time.hour, time.minute, 0)?;
    let timezone = now.timezone();
    for day_offset in 0_u64..=7 {
        let date = now.date_naive().checked_add_days(Days::new(day_offset))?;
        let candidate = match resolve_local_datetime(&timezone, date.and_time(wall)) {
            Some(value) => value,
            None => continue,
        };
        if candidate > *now {
            return Some(candidate);
        }
    }
    None
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TimeDisplayMode {
    Hour24,
    Hour12,
}

pub fn format_clock(dt: &DateTime<Local>, mode: TimeDisplayMode) -> String {
    match mode {
        TimeDisplayMode::Hour24 => {
            format!("{:02}:{:02}:{:02}", dt.hour(), dt.minute(), dt.second())
        }
        TimeDisplayMode::Hour12 => {
            let (is_pm, hour12) = dt.hour12();
            format!(
                "{}:{:02}:{:02} {}",
                hour12,
                dt.minute(),
                dt.second(),
                if is_pm { "PM" } else { "AM" }
            )
        }
    }
}

pub fn format_time_of_day(time: TimeOfDay) -> String {
    format!("{:02}:{:02}", time.hour, time.minute)
}

/// Short weekday-plus-time rendering of an absolute due instant, for the
/// next-alarm readout.
pub fn format_due_instant(due_at_ms: i64, mode: TimeDisplayMode) -> String {
    let Some(dt) = Local.timestamp_millis_opt(due_at_ms).single() else {
        return "-".to_string();
    };
    match mode {
        TimeDisplayMode::Hour24 => {
            format!("{} {:02}:{:02}", dt.format("%a"), dt.hour(), dt.minute())
        }
        TimeDisplayMode::Hour12 => {
            let (is_pm, hour12) = dt.hour12();
            format!(
                "{} {}:{:02} {}",
                dt.format("%a"),
                hour12,
                dt.minute(),
                if is_pm { "PM" } else { "AM" }
            )
        }
    }
}

/// Delay until the next whole tick boundary, so a 1 Hz clock lands on second
/// edges instead of accumulating drift.
pub fn delay_to_next_tick(now_ms: i64, tick_ms: i64) -> Duration {
    let tick = tick_ms.max(1);
    let drift = now_ms.rem_euclid(tick);
    Duration::from_millis((tick - drift).max(MIN_TICK_DELAY_MS) as u64)
}
