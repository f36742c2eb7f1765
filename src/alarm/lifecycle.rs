use chrono::{DateTime, Local};

use crate::alarm::model::{Alarm, AlarmConfig, AlarmId, AlarmRuntime, AlarmStatus, default_alarm};

/// The live alarm collection plus the ringing/snooze state machine around it.
///
/// At most one alarm rings at a time. The invariant is structural: the slot
/// below is the single source of truth for "which alarm is ringing", and
/// every transition that sets a status to `Ringing` goes through it.
pub struct AlarmSet {
    alarms: Vec<Alarm>,
    ringing: Option<AlarmId>,
}

impl AlarmSet {
    /// Adopts a (typically just-loaded) collection. Persisted state can
    /// carry several ringing alarms; the first one keeps the slot, the rest
    /// are demoted to armed/idle.
    pub fn new(alarms: Vec<Alarm>) -> Self {
        let mut set = Self {
            alarms,
            ringing: None,
        };
        for alarm in &mut set.alarms {
            if alarm.runtime.status != AlarmStatus::Ringing {
                continue;
            }
            if set.ringing.is_none() {
                set.ringing = Some(alarm.config.id.clone());
            } else {
                alarm.runtime = AlarmRuntime::derived(alarm.config.enabled);
            }
        }
        set
    }

    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Alarm> {
        self.alarms.iter().find(|alarm| alarm.config.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Alarm> {
        self.alarms.iter_mut().find(|alarm| alarm.config.id == id)
    }

    pub fn ringing_id(&self) -> Option<&AlarmId> {
        self.ringing.as_ref()
    }

    pub fn ringing_alarm(&self) -> Option<&Alarm> {
        let id = self.ringing.as_deref()?;
        self.get(id)
    }

    /// Appends a fresh default alarm and returns its id.
    pub fn add(&mut self) -> AlarmId {
        let label = format!("Alarm {}", self.alarms.len() + 1);
        let alarm = default_alarm(&label);
        let id = alarm.config.id.clone();
        self.alarms.push(alarm);
        id
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.alarms.len();
        self.alarms.retain(|alarm| alarm.config.id != id);
        if self.ringing.as_deref() == Some(id) {
            self.ringing = None;
        }
        self.alarms.len() != before
    }

    /// Replace-on-save config edit. Disabling forces the alarm idle; an
    /// alarm mid-ring or mid-snooze otherwise keeps that status.
    pub fn update_config(&mut self, id: &str, config: AlarmConfig) -> bool {
        let was_ringing = self.ringing.as_deref() == Some(id);
        let Some(alarm) = self.get_mut(id) else {
            return false;
        };

        let enabled = config.enabled;
        alarm.config = config;
        if !enabled {
            alarm.runtime.status = AlarmStatus::Idle;
            alarm.runtime.snooze_until_ms = None;
            if was_ringing {
                self.ringing = None;
            }
            return true;
        }

        alarm.runtime.status = match alarm.runtime.status {
            AlarmStatus::Ringing => AlarmStatus::Ringing,
            AlarmStatus::Snoozed => AlarmStatus::Snoozed,
            AlarmStatus::Idle | AlarmStatus::Armed => AlarmStatus::Armed,
        };
        true
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        let Some(alarm) = self.get(id) else {
            return false;
        };
        let mut config = alarm.config.clone();
        config.enabled = enabled;
        self.update_config(id, config)
    }

    /// Transition fired by the scheduler driver. Any previously ringing
    /// alarm is stopped first so the slot never covers two alarms.
    pub fn mark_ringing(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        if let Some(previous) = self.ringing.clone()
            && previous != id
        {
            self.stop(&previous);
        }

        if let Some(alarm) = self.get_mut(id) {
            alarm.runtime.status = AlarmStatus::Ringing;
            alarm.runtime.snooze_until_ms = None;
        }
        self.ringing = Some(id.to_string());
        true
    }

    /// User deferral of a ringing alarm: schedule a one-shot re-ring at
    /// `now + snooze interval` and release the ringing slot.
    pub fn snooze(&mut self, id: &str, now: &DateTime<Local>) -> bool {
        let now_ms = now.timestamp_millis();
        let Some(alarm) = self.get_mut(id) else {
            return false;
        };
        if alarm.runtime.status != AlarmStatus::Ringing {
            return false;
        }

        let minutes = i64::from(alarm.config.snooze_minutes.max(1));
        alarm.runtime.status = AlarmStatus::Snoozed;
        alarm.runtime.snooze_until_ms = Some(now_ms + minutes * 60_000);
        if self.ringing.as_deref() == Some(id) {
            self.ringing = None;
        }
        true
    }

    /// Stops a ringing or snoozed alarm: back to armed while enabled, idle
    /// otherwise, snooze consumed either way.
    pub fn stop(&mut self, id: &str) -> bool {
        let Some(alarm) = self.get_mut(id) else {
            return false;
        };
        alarm.runtime.status = if alarm.config.enabled {
            AlarmStatus::Armed
        } else {
            AlarmStatus::Idle
        };
        alarm.runtime.snooze_until_ms = None;
        if self.ringing.as_deref() == Some(id) {
            self.ringing = None;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::alarm::model::AlarmRuntime;

    fn enabled_alarm(id: &str) -> Alarm {
        let mut alarm = default_alarm(id);
        alarm.config.id = id.to_string();
        alarm.config.enabled = true;
        alarm.runtime = AlarmRuntime::derived(true);
        alarm
    }

    fn now() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2026, 2, 20, 8, 0, 0)
            .single()
            .expect("valid datetime")
    }

    fn ringing_count(set: &AlarmSet) -> usize {
        set.alarms()
            .iter()
            .filter(|alarm| alarm.runtime.status == AlarmStatus::Ringing)
            .count()
    }

    #[test]
    fn adoption_demotes_all_but_the_first_ringing_alarm() {
        let mut first = enabled_alarm("a");
        first.runtime.status = AlarmStatus::Ringing;
        let mut second = enabled_alarm("b");
        second.runtime.status = AlarmStatus::Ringing;
        second.runtime.snooze_until_ms = Some(1);

        let set = AlarmSet::new(vec![first, second]);
        assert_eq!(set.ringing_id().map(String::as_str), Some("a"));
        assert_eq!(ringing_count(&set), 1);
        let demoted = set.get("b").expect("alarm b");
        assert_eq!(demoted.runtime.status, AlarmStatus::Armed);
        assert_eq!(demoted.runtime.snooze_until_ms, None);
    }

    #[test]
    fn ring_then_snooze_sets_the_override_and_frees_the_slot() {
        let mut set = AlarmSet::new(vec![enabled_alarm("a")]);
        assert!(set.mark_ringing("a"));
        assert_eq!(set.ringing_id().map(String::as_str), Some("a"));

        let at = now();
        assert!(set.snooze("a", &at));
        let alarm = set.get("a").expect("alarm");
        assert_eq!(alarm.runtime.status, AlarmStatus::Snoozed);
        assert_eq!(
            alarm.runtime.snooze_until_ms,
            Some(at.timestamp_millis() + 7 * 60_000)
        );
        assert!(set.ringing_id().is_none());
    }

    #[test]
    fn snooze_interval_has_a_one_minute_floor() {
        let mut alarm = enabled_alarm("a");
        alarm.config.snooze_minutes = 0;
        let mut set = AlarmSet::new(vec![alarm]);
        set.mark_ringing("a");

        let at = now();
        set.snooze("a", &at);
        assert_eq!(
            set.get("a").expect("alarm").runtime.snooze_until_ms,
            Some(at.timestamp_millis() + 60_000)
        );
    }

    #[test]
    fn snooze_requires_a_ringing_alarm() {
        let mut set = AlarmSet::new(vec![enabled_alarm("a")]);
        assert!(!set.snooze("a", &now()));
        assert_eq!(set.get("a").expect("alarm").runtime.status, AlarmStatus::Armed);
    }

    #[test]
    fn stop_returns_to_armed_or_idle_and_clears_snooze() {
        let mut set = AlarmSet::new(vec![enabled_alarm("a")]);
        set.mark_ringing("a");
        assert!(set.stop("a"));
        assert_eq!(set.get("a").expect("alarm").runtime.status, AlarmStatus::Armed);
        assert!(set.ringing_id().is_none());

        set.mark_ringing("a");
        set.snooze("a", &now());
        assert!(set.stop("a"));
        let alarm = set.get("a").expect("alarm");
        assert_eq!(alarm.runtime.status, AlarmStatus::Armed);
        assert_eq!(alarm.runtime.snooze_until_ms, None);

        set.set_enabled("a", false);
        set.stop("a");
        assert_eq!(set.get("a").expect("alarm").runtime.status, AlarmStatus::Idle);
    }

    #[test]
    fn disabling_forces_idle_even_mid_ring() {
        let mut set = AlarmSet::new(vec![enabled_alarm("a")]);
        set.mark_ringing("a");
        assert!(set.set_enabled("a", false));

        let alarm = set.get("a").expect("alarm");
        assert_eq!(alarm.runtime.status, AlarmStatus::Idle);
        assert_eq!(alarm.runtime.snooze_until_ms, None);
        assert!(set.ringing_id().is_none());
    }

    #[test]
    fn editing_preserves_ringing_and_snoozed_status() {
        let mut set = AlarmSet::new(vec![enabled_alarm("a")]);
        set.mark_ringing("a");

        let mut edited = set.get("a").expect("alarm").config.clone();
        edited.label = "Morning".to_string();
        assert!(set.update_config("a", edited));
        assert_eq!(set.get("a").expect("alarm").runtime.status, AlarmStatus::Ringing);
        assert_eq!(set.ringing_id().map(String::as_str), Some("a"));

        set.snooze("a", &now());
        let mut edited = set.get("a").expect("alarm").config.clone();
        edited.label = "Morning again".to_string();
        assert!(set.update_config("a", edited));
        let alarm = set.get("a").expect("alarm");
        assert_eq!(alarm.runtime.status, AlarmStatus::Snoozed);
        assert!(alarm.runtime.snooze_until_ms.is_some());
    }

    #[test]
    fn enabling_an_idle_alarm_arms_it() {
        let mut alarm = enabled_alarm("a");
        alarm.config.enabled = false;
        alarm.runtime = AlarmRuntime::derived(false);
        let mut set = AlarmSet::new(vec![alarm]);

        assert!(set.set_enabled("a", true));
        assert_eq!(set.get("a").expect("alarm").runtime.status, AlarmStatus::Armed);
    }

    #[test]
    fn marking_a_second_ringer_stops_the_first() {
        let mut set = AlarmSet::new(vec![enabled_alarm("a"), enabled_alarm("b")]);
        set.mark_ringing("a");
        set.mark_ringing("b");

        assert_eq!(set.ringing_id().map(String::as_str), Some("b"));
        assert_eq!(ringing_count(&set), 1);
        assert_eq!(set.get("a").expect("alarm").runtime.status, AlarmStatus::Armed);
    }

    #[test]
    fn removing_the_ringing_alarm_releases_the_slot() {
        let mut set = AlarmSet::new(vec![enabled_alarm("a")]);
        set.mark_ringing("a");
        assert!(set.remove("a"));
        assert!(set.is_empty());
        assert!(set.ringing_id().is_none());
    }

    #[test]
    fn add_appends_with_a_sequential_label() {
        let mut set = AlarmSet::new(vec![enabled_alarm("a")]);
        let id = set.add();
        assert_eq!(set.len(), 2);
        let added = set.get(&id).expect("added alarm");
        assert_eq!(added.config.label, "Alarm 2");
        assert_eq!(added.runtime.status, AlarmStatus::Idle);
    }
}
