use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use crate::alarm::model::{
    Alarm, AlarmConfig, AlarmId, AlarmRuntime, AlarmStatus, DaysOfWeek, PlayDuration, TimeOfDay,
    ToneId, create_alarm_id, default_alarm,
};

pub const SCHEMA_VERSION: u32 = 1;

/// Everything the app persists between runs.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredState {
    pub alarms: Vec<Alarm>,
    pub selected_alarm_id: Option<AlarmId>,
}

impl StoredState {
    fn fresh() -> Self {
        let alarms = vec![default_alarm("Alarm 1")];
        let selected = alarms.first().map(|alarm| alarm.config.id.clone());
        Self {
            alarms,
            selected_alarm_id: selected,
        }
    }
}

/// Loads persisted state. Total: an unreadable file, bad JSON, or a foreign
/// schema version all fall back to one stock alarm instead of failing.
pub fn load_state(path: &Path) -> StoredState {
    let Ok(content) = fs::read_to_string(path) else {
        return StoredState::fresh();
    };
    let Ok(raw) = serde_json::from_str::<Value>(&content) else {
        return StoredState::fresh();
    };
    normalize_state(&raw)
}

pub fn normalize_state(raw: &Value) -> StoredState {
    let version = raw.get("version").and_then(Value::as_u64).unwrap_or(1);
    if version != u64::from(SCHEMA_VERSION) {
        return StoredState::fresh();
    }

    let alarms = normalize_alarms(raw.get("alarms").unwrap_or(&Value::Null));
    let selected_alarm_id = raw
        .get("selectedAlarmId")
        .and_then(Value::as_str)
        .filter(|id| alarms.iter().any(|alarm| alarm.config.id == *id))
        .map(str::to_string)
        .or_else(|| alarms.first().map(|alarm| alarm.config.id.clone()));

    StoredState {
        alarms,
        selected_alarm_id,
    }
}

/// Decode-with-defaults over the raw alarm list. Never fails; the result is
/// always non-empty and schema-valid.
pub fn normalize_alarms(raw: &Value) -> Vec<Alarm> {
    let Some(items) = raw.as_array() else {
        return vec![default_alarm("Alarm 1")];
    };

    let mut out = Vec::new();
    for item in items {
        if let Some(alarm) = normalize_alarm(item) {
            out.push(alarm);
        }
    }
    if out.is_empty() {
        let mut fallback = default_alarm("Alarm 1");
        fallback.config.days = DaysOfWeek::every_day();
        return vec![fallback];
    }
    out
}

fn normalize_alarm(item: &Value) -> Option<Alarm> {
    let config_raw = item.get("config")?.as_object()?;

    let id = config_raw
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(create_alarm_id);
    let label = config_raw
        .get("label")
        .and_then(Value::as_str)
        .unwrap_or("Alarm")
        .to_string();
    let enabled = config_raw
        .get("enabled")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let tone_id = config_raw
        .get("toneId")
        .and_then(Value::as_str)
        .and_then(ToneId::from_key)
        .unwrap_or(ToneId::Beep);
    let snooze_minutes = config_raw
        .get("snoozeMinutes")
        .and_then(Value::as_u64)
        .map(|minutes| u32::try_from(minutes).unwrap_or(u32::MAX))
        .unwrap_or(7);

    Some(Alarm {
        config: AlarmConfig {
            id,
            label,
            enabled,
            time: normalize_time(config_raw.get("time")),
            days: normalize_days(config_raw.get("days")),
            tone_id,
            play_duration: normalize_play_duration(config_raw.get("playDurationSec")),
            snooze_minutes,
        },
        runtime: normalize_runtime(item.get("runtime"), enabled),
    })
}

fn normalize_time(raw: Option<&Value>) -> TimeOfDay {
    let hour = raw
        .and_then(|time| time.get("hour"))
        .and_then(Value::as_u64)
        .map(|hour| u32::try_from(hour).unwrap_or(u32::MAX))
        .unwrap_or(7);
    let minute = raw
        .and_then(|time| time.get("minute"))
        .and_then(Value::as_u64)
        .map(|minute| u32::try_from(minute).unwrap_or(u32::MAX))
        .unwrap_or(30);
    TimeOfDay::new(hour, minute)
}

fn normalize_days(raw: Option<&Value>) -> DaysOfWeek {
    let Some(obj) = raw.and_then(Value::as_object) else {
        return DaysOfWeek::weekdays();
    };

    let flag = |key: &str| obj.get(key).and_then(Value::as_bool).unwrap_or(false);
    let days = DaysOfWeek {
        mon: flag("mon"),
        tue: flag("tue"),
        wed: flag("wed"),
        thu: flag("thu"),
        fri: flag("fri"),
        sat: flag("sat"),
        sun: flag("sun"),
    };
    // An all-false set is the signature of bad or pre-migration data; an
    // alarm that can never fire is more surprising than a weekday default.
    if days.any_selected() {
        days
    } else {
        DaysOfWeek::weekdays()
    }
}

fn normalize_play_duration(raw: Option<&Value>) -> PlayDuration {
    match raw {
        Some(Value::String(text)) if text == "untilStop" => PlayDuration::UntilStop,
        Some(Value::Number(number)) => number
            .as_u64()
            .filter(|secs| *secs > 0)
            .map(|secs| PlayDuration::Seconds(u32::try_from(secs).unwrap_or(u32::MAX)))
            .unwrap_or(PlayDuration::Seconds(30)),
        _ => PlayDuration::Seconds(30),
    }
}

fn normalize_runtime(raw: Option<&Value>, enabled: bool) -> AlarmRuntime {
    let base = AlarmRuntime::derived(enabled);
    let Some(obj) = raw.and_then(Value::as_object) else {
        return base;
    };

    let status = obj
        .get("status")
        .and_then(Value::as_str)
        .and_then(AlarmStatus::from_key)
        .unwrap_or(base.status);
    let snooze_until_ms = if status == AlarmStatus::Snoozed {
        obj.get("snoozeUntilMs").and_then(Value::as_i64)
    } else {
        None
    };
    AlarmRuntime {
        status,
        snooze_until_ms,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredStateFile<'a> {
    version: u32,
    alarms: &'a [Alarm],
    selected_alarm_id: Option<&'a str>,
}

pub fn save_state(path: &Path, alarms: &[Alarm], selected_alarm_id: Option<&str>) -> Result<()> {
    let payload = StoredStateFile {
        version: SCHEMA_VERSION,
        alarms,
        selected_alarm_id,
    };
    let text = serde_json::to_string_pretty(&payload)?;
    fs::write(path, format!("{text}\n"))
        .with_context(|| format!("unable to write alarm file {}", path.display()))?;
    Ok(())
}

/// Serializes an alarm snapshot the same way `save_state` does; used by the
/// inspect output.
pub fn state_to_value(alarms: &[Alarm], selected_alarm_id: Option<&str>) -> Result<Value> {
    let payload = StoredStateFile {
        version: SCHEMA_VERSION,
        alarms,
        selected_alarm_id,
    };
    serde_json::to_value(&payload).context("failed to serialize alarm state")
}
