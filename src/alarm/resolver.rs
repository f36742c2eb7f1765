use chrono::{DateTime, Datelike, Days, Local, NaiveTime, TimeZone};
use serde::Serialize;

use crate::alarm::model::{Alarm, AlarmConfig, AlarmId, AlarmStatus};
use crate::clock::{next_occurrence_in_tz, resolve_local_datetime};

/// The single alarm the scheduler should wake up for next, with its absolute
/// due instant in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueAlarm {
    pub alarm_id: AlarmId,
    pub due_at_ms: i64,
}

/// Scans the whole collection and returns the alarm with the earliest
/// upcoming due instant, or `None` if nothing qualifies.
///
/// Disabled alarms never contribute; a ringing alarm is already firing and is
/// not "next due". A pending snooze takes absolute precedence over the
/// recurring schedule. Ties keep the first-encountered alarm (strict `<`
/// against the running best).
pub fn next_due_alarm(now: &DateTime<Local>, alarms: &[Alarm]) -> Option<DueAlarm> {
    next_due_alarm_in_tz(now, alarms)
}

pub(crate) fn next_due_alarm_in_tz<Tz>(now: &DateTime<Tz>, alarms: &[Alarm]) -> Option<DueAlarm>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    let mut best: Option<DueAlarm> = None;
    for alarm in alarms {
        if !alarm.config.enabled {
            continue;
        }
        if alarm.runtime.status == AlarmStatus::Ringing {
            continue;
        }

        let due_at_ms = match alarm.runtime.snooze_until_ms {
            Some(until_ms) => until_ms,
            None => match next_scheduled_occurrence_in_tz(now, &alarm.config) {
                Some(at) => at.timestamp_millis(),
                None => continue,
            },
        };

        if best.as_ref().is_none_or(|b| due_at_ms < b.due_at_ms) {
            best = Some(DueAlarm {
                alarm_id: alarm.config.id.clone(),
                due_at_ms,
            });
        }
    }
    best
}

/// Next occurrence of the alarm's time on a selected weekday. Anchors at the
/// plain next occurrence, then advances day by day, re-anchoring the
/// hour:minute each step. A week is the full period of the pattern, so the
/// search never needs more than 7 steps; an empty day-set yields nothing.
pub fn next_scheduled_occurrence(
    now: &DateTime<Local>,
    config: &AlarmConfig,
) -> Option<DateTime<Local>> {
    next_scheduled_occurrence_in_tz(now, config)
}

pub(crate) fn next_scheduled_occurrence_in_tz<Tz>(
    now: &DateTime<Tz>,
    config: &AlarmConfig,
) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    if !config.days.any_selected() {
        return None;
    }

    let anchor = next_occurrence_in_tz(now, config.time)?;
    let wall = NaiveTime::from_hms_opt(config.time.hour, config.time.minute, 0)?;
    let timezone = now.timezone();
    for day_offset in 0_u64..7 {
        let date = anchor.date_naive().checked_add_days(Days::new(day_offset))?;
        if !config.days.contains(date.weekday()) {
            continue;
        }
        match resolve_local_datetime(&timezone, date.and_time(wall)) {
            Some(candidate) => return Some(candidate),
            None => continue,
        }
    }
    None
}
