use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Local, Weekday};
use serde::{Serialize, Serializer};

pub type AlarmId = String;

/// Wall-clock time of day, no seconds. Out-of-range input is clamped rather
/// than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self {
            hour: hour.min(23),
            minute: minute.min(59),
        }
    }
}

/// The weekdays an alarm is eligible to fire on. All-false means the alarm
/// can never fire from its schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DaysOfWeek {
    pub mon: bool,
    pub tue: bool,
    pub wed: bool,
    pub thu: bool,
    pub fri: bool,
    pub sat: bool,
    pub sun: bool,
}

impl DaysOfWeek {
    pub fn every_day() -> Self {
        Self {
            mon: true,
            tue: true,
            wed: true,
            thu: true,
            fri: true,
            sat: true,
            sun: true,
        }
    }

    pub fn weekdays() -> Self {
        Self {
            mon: true,
            tue: true,
            wed: true,
            thu: true,
            fri: true,
            sat: false,
            sun: false,
        }
    }

    pub fn weekend() -> Self {
        Self {
            mon: false,
            tue: false,
            wed: false,
            thu: false,
            fri: false,
            sat: true,
            sun: true,
        }
    }

    pub fn none() -> Self {
        Self {
            mon: false,
            tue: false,
            wed: false,
            thu: false,
            fri: false,
            sat: false,
            sun: false,
        }
    }

    pub fn any_selected(&self) -> bool {
        self.mon || self.tue || self.wed || self.thu || self.fri || self.sat || self.sun
    }

    pub fn contains(&self, day: Weekday) -> bool {
        match day {
            Weekday::Mon => self.mon,
            Weekday::Tue => self.tue,
            Weekday::Wed => self.wed,
            Weekday::Thu => self.thu,
            Weekday::Fri => self.fri,
            Weekday::Sat => self.sat,
            Weekday::Sun => self.sun,
        }
    }

    pub fn set(&mut self, day: Weekday, selected: bool) {
        let slot = match day {
            Weekday::Mon => &mut self.mon,
            Weekday::Tue => &mut self.tue,
            Weekday::Wed => &mut self.wed,
            Weekday::Thu => &mut self.thu,
            Weekday::Fri => &mut self.fri,
            Weekday::Sat => &mut self.sat,
            Weekday::Sun => &mut self.sun,
        };
        *slot = selected;
    }

    pub fn short_label(&self) -> String {
        let mut parts = Vec::new();
        for (selected, name) in [
            (self.mon, "Mon"),
            (self.tue, "Tue"),
            (self.wed, "Wed"),
            (self.thu, "Thu"),
            (self.fri, "Fri"),
            (self.sat, "Sat"),
            (self.sun, "Sun"),
        ] {
            if selected {
                parts.push(name);
            }
        }
        if parts.is_empty() {
            "—".to_string()
        } else {
            parts.join(" ")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToneId {
    Beep,
    Chime,
    Digital,
    Bell,
}

impl ToneId {
    pub const ALL: [ToneId; 4] = [ToneId::Beep, ToneId::Chime, ToneId::Digital, ToneId::Bell];

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "beep" => Some(ToneId::Beep),
            "chime" => Some(ToneId::Chime),
            "digital" => Some(ToneId::Digital),
            "bell" => Some(ToneId::Bell),
            _ => None,
        }
    }
}

/// How long a ringing alarm plays before it is auto-stopped. `UntilStop`
/// means it rings until the user acts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayDuration {
    Seconds(u32),
    UntilStop,
}

impl PlayDuration {
    pub fn as_millis(&self) -> Option<i64> {
        match self {
            PlayDuration::Seconds(secs) => Some(i64::from(*secs) * 1_000),
            PlayDuration::UntilStop => None,
        }
    }
}

impl Serialize for PlayDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PlayDuration::Seconds(secs) => serializer.serialize_u32(*secs),
            PlayDuration::UntilStop => serializer.serialize_str("untilStop"),
        }
    }
}

/// Persisted, user-edited settings. Replaced wholesale on save; never
/// partially mutated by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmConfig {
    pub id: AlarmId,
    pub label: String,
    pub enabled: bool,
    pub time: TimeOfDay,
    pub days: DaysOfWeek,
    pub tone_id: ToneId,
    #[serde(rename = "playDurationSec")]
    pub play_duration: PlayDuration,
    pub snooze_minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmStatus {
    Idle,
    Armed,
    Snoozed,
    Ringing,
}

impl AlarmStatus {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "idle" => Some(AlarmStatus::Idle),
            "armed" => Some(AlarmStatus::Armed),
            "snoozed" => Some(AlarmStatus::Snoozed),
            "ringing" => Some(AlarmStatus::Ringing),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AlarmStatus::Idle => "Idle",
            AlarmStatus::Armed => "Armed",
            AlarmStatus::Snoozed => "Snoozed",
            AlarmStatus::Ringing => "Ringing",
        }
    }
}

/// Transient scheduling state, owned by the ringing/snooze lifecycle. The
/// config editor never touches this directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlarmRuntime {
    pub status: AlarmStatus,
    #[serde(rename = "snoozeUntilMs")]
    pub snooze_until_ms: Option<i64>,
}

impl AlarmRuntime {
    pub fn derived(enabled: bool) -> Self {
        Self {
            status: if enabled {
                AlarmStatus::Armed
            } else {
                AlarmStatus::Idle
            },
            snooze_until_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alarm {
    pub config: AlarmConfig,
    pub runtime: AlarmRuntime,
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fresh id from the current wall clock plus a process-wide counter. Unique
/// for the lifetime of a local alarm list; never reused.
pub fn create_alarm_id() -> AlarmId {
    let millis = Local::now().timestamp_millis().max(0) as u64;
    let count = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", to_base36(millis), to_base36(count))
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(char::from(DIGITS[(value % 36) as usize]));
        value /= 36;
    }
    out.iter().rev().collect()
}

/// Factory for a new alarm with the stock settings: disabled, 07:30 on
/// weekdays, beep for 30 seconds, 7 minute snooze.
pub fn default_alarm(label: &str) -> Alarm {
    let enabled = false;
    Alarm {
        config: AlarmConfig {
            id: create_alarm_id(),
            label: label.to_string(),
            enabled,
            time: TimeOfDay::new(7, 30),
            days: DaysOfWeek::weekdays(),
            tone_id: ToneId::Beep,
            play_duration: PlayDuration::Seconds(30),
            snooze_minutes: 7,
        },
        runtime: AlarmRuntime::derived(enabled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_of_day_clamps_out_of_range_input() {
        let time = TimeOfDay::new(99, 75);
        assert_eq!(time, TimeOfDay { hour: 23, minute: 59 });
        let valid = TimeOfDay::new(8, 30);
        assert_eq!(valid, TimeOfDay { hour: 8, minute: 30 });
    }

    #[test]
    fn day_set_helpers_cover_the_week() {
        assert!(DaysOfWeek::every_day().any_selected());
        assert!(!DaysOfWeek::none().any_selected());
        let wk = DaysOfWeek::weekdays();
        assert!(wk.contains(Weekday::Mon) && wk.contains(Weekday::Fri));
        assert!(!wk.contains(Weekday::Sat) && !wk.contains(Weekday::Sun));
        let we = DaysOfWeek::weekend();
        assert!(we.contains(Weekday::Sat) && we.contains(Weekday::Sun));
        assert!(!we.contains(Weekday::Wed));
    }

    #[test]
    fn short_label_lists_selected_days_in_week_order() {
        assert_eq!(DaysOfWeek::weekend().short_label(), "Sat Sun");
        assert_eq!(DaysOfWeek::none().short_label(), "—");
    }

    #[test]
    fn generated_ids_are_unique() {
        let first = create_alarm_id();
        let second = create_alarm_id();
        assert_ne!(first, second);
    }

    #[test]
    fn default_alarm_derives_idle_runtime() {
        let alarm = default_alarm("Alarm 1");
        assert_eq!(alarm.config.label, "Alarm 1");
        assert!(!alarm.config.enabled);
        assert_eq!(alarm.runtime.status, AlarmStatus::Idle);
        assert_eq!(alarm.runtime.snooze_until_ms, None);
    }

    #[test]
    fn alarm_serializes_with_wire_field_names() {
        let mut alarm = default_alarm("Wake");
        alarm.config.play_duration = PlayDuration::UntilStop;
        let value = serde_json::to_value(&alarm).expect("serialize");
        assert_eq!(value["config"]["toneId"], "beep");
        assert_eq!(value["config"]["playDurationSec"], "untilStop");
        assert_eq!(value["config"]["snoozeMinutes"], 7);
        assert_eq!(value["runtime"]["status"], "idle");
        assert!(value["runtime"]["snoozeUntilMs"].is_null());

        alarm.config.play_duration = PlayDuration::Seconds(45);
        let value = serde_json::to_value(&alarm).expect("serialize");
        assert_eq!(value["config"]["playDurationSec"], 45);
    }
}
