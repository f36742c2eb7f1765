use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::alarm::model::{Alarm, AlarmId};
use crate::alarm::resolver::{DueAlarm, next_due_alarm};

/// Arming a wake-up is the one scheduler failure the host must not swallow:
/// it means no alarm will ring until the next recompute manages to re-arm.
#[derive(Debug, Error)]
pub enum ArmError {
    #[error("failed to spawn wake-up timer: {0}")]
    Spawn(#[from] std::io::Error),
}

struct FireEvent {
    generation: u64,
    alarm_id: AlarmId,
}

struct ArmedWakeup {
    alarm_id: AlarmId,
    due_at_ms: i64,
    generation: u64,
    // Dropping the sender wakes the parked timer thread, which then exits
    // without firing.
    _cancel_tx: Sender<()>,
}

/// Stateful wrapper around the resolver. Owns at most one pending deferred
/// wake-up; re-armed only when the resolved (alarm, due instant) pair
/// actually changes, so repeated recomputes with unchanged inputs never
/// recreate the timer.
pub struct SchedulerDriver {
    fire_tx: Sender<FireEvent>,
    fire_rx: Receiver<FireEvent>,
    armed: Option<ArmedWakeup>,
    resolved: Option<DueAlarm>,
    generation: u64,
    waker: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl SchedulerDriver {
    pub fn new() -> Self {
        let (fire_tx, fire_rx) = mpsc::channel();
        Self {
            fire_tx,
            fire_rx,
            armed: None,
            resolved: None,
            generation: 0,
            waker: None,
        }
    }

    /// Hook invoked from the timer thread right after a fire is posted. The
    /// GUI passes a repaint request here so rings are handled promptly
    /// instead of on the next clock tick.
    pub fn set_waker(&mut self, waker: Arc<dyn Fn() + Send + Sync>) {
        self.waker = Some(waker);
    }

    /// The currently resolved due alarm, for display. Tracks the last
    /// recompute regardless of whether its wake-up has fired.
    pub fn resolved(&self) -> Option<&DueAlarm> {
        self.resolved.as_ref()
    }

    /// Recomputes the due alarm and reconciles the pending wake-up with it:
    /// unchanged resolution keeps the existing timer, anything else cancels
    /// and re-arms for `max(0, due - now)`.
    pub fn sync(
        &mut self,
        now: &DateTime<Local>,
        alarms: &[Alarm],
    ) -> Result<Option<DueAlarm>, ArmError> {
        let due = next_due_alarm(now, alarms);
        self.resolved = due.clone();

        match (&due, &self.armed) {
            (Some(d), Some(armed))
                if armed.alarm_id == d.alarm_id && armed.due_at_ms == d.due_at_ms =>
            {
                return Ok(due);
            }
            (None, None) => return Ok(None),
            _ => {}
        }

        self.disarm();
        if let Some(d) = &due {
            self.arm(d)?;
        }
        Ok(due)
    }

    /// Cancels any pending wake-up. A canceled wake-up never surfaces a ring.
    pub fn disarm(&mut self) {
        self.armed = None;
    }

    fn arm(&mut self, due: &DueAlarm) -> Result<(), ArmError> {
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        let delay_ms = (due.due_at_ms - Local::now().timestamp_millis()).max(0);
        let delay = Duration::from_millis(delay_ms as u64);

        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let fire_tx = self.fire_tx.clone();
        let alarm_id = due.alarm_id.clone();
        let waker = self.waker.clone();
        thread::Builder::new()
            .name("alarm-wakeup".to_string())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = cancel_rx.recv_timeout(delay) {
                    let delivered = fire_tx.send(FireEvent {
                        generation,
                        alarm_id,
                    });
                    if delivered.is_ok()
                        && let Some(waker) = waker
                    {
                        waker();
                    }
                }
            })?;

        self.armed = Some(ArmedWakeup {
            alarm_id: due.alarm_id.clone(),
            due_at_ms: due.due_at_ms,
            generation,
            _cancel_tx: cancel_tx,
        });
        Ok(())
    }

    /// Drains the fired wake-up, if any. Fires from superseded armings are
    /// discarded, so a cancellation that raced an elapsed timer is invisible
    /// to the host.
    pub fn poll_ring(&mut self) -> Option<AlarmId> {
        loop {
            match self.fire_rx.try_recv() {
                Ok(event) => {
                    let current = self
                        .armed
                        .as_ref()
                        .is_some_and(|armed| armed.generation == event.generation);
                    if current {
                        self.armed = None;
                        return Some(event.alarm_id);
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }
}

impl Default for SchedulerDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    use super::*;
    use crate::alarm::model::{
        AlarmConfig, AlarmRuntime, AlarmStatus, DaysOfWeek, PlayDuration, TimeOfDay, ToneId,
    };

    fn snoozed_alarm(id: &str, due_in_ms: i64) -> Alarm {
        Alarm {
            config: AlarmConfig {
                id: id.to_string(),
                label: id.to_string(),
                enabled: true,
                time: TimeOfDay::new(7, 30),
                days: DaysOfWeek::every_day(),
                tone_id: ToneId::Beep,
                play_duration: PlayDuration::Seconds(30),
                snooze_minutes: 5,
            },
            runtime: AlarmRuntime {
                status: AlarmStatus::Snoozed,
                snooze_until_ms: Some(Local::now().timestamp_millis() + due_in_ms),
            },
        }
    }

    fn wait_for_ring(driver: &mut SchedulerDriver) -> Option<AlarmId> {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if let Some(id) = driver.poll_ring() {
                return Some(id);
            }
            thread::sleep(Duration::from_millis(10));
        }
        None
    }

    #[test]
    fn fires_once_at_the_due_instant() {
        let mut driver = SchedulerDriver::new();
        let alarms = vec![snoozed_alarm("wake", 50)];
        let due = driver
            .sync(&Local::now(), &alarms)
            .expect("arm")
            .expect("due alarm");
        assert_eq!(due.alarm_id, "wake");

        assert_eq!(wait_for_ring(&mut driver).as_deref(), Some("wake"));
        // Consumed: nothing further without a re-arm.
        assert_eq!(driver.poll_ring(), None);
    }

    #[test]
    fn unchanged_resolution_keeps_the_pending_wakeup() {
        let mut driver = SchedulerDriver::new();
        let alarms = vec![snoozed_alarm("wake", 60_000)];

        driver.sync(&Local::now(), &alarms).expect("first arm");
        let generation = driver.generation;
        driver.sync(&Local::now(), &alarms).expect("second sync");
        driver.sync(&Local::now(), &alarms).expect("third sync");

        assert_eq!(driver.generation, generation);
        assert!(driver.armed.is_some());
    }

    #[test]
    fn cancellation_suppresses_the_ring() {
        let mut driver = SchedulerDriver::new();
        let alarms = vec![snoozed_alarm("wake", 100)];
        driver.sync(&Local::now(), &alarms).expect("arm");

        driver.sync(&Local::now(), &[]).expect("cancel");
        assert!(driver.armed.is_none());
        assert!(driver.resolved().is_none());

        thread::sleep(Duration::from_millis(250));
        assert_eq!(driver.poll_ring(), None);
    }

    #[test]
    fn rearm_discards_a_stale_fire() {
        let mut driver = SchedulerDriver::new();
        driver
            .sync(&Local::now(), &[snoozed_alarm("old", 30)])
            .expect("arm old");
        // Let the old wake-up elapse and queue its fire.
        thread::sleep(Duration::from_millis(150));

        driver
            .sync(&Local::now(), &[snoozed_alarm("new", 60_000)])
            .expect("arm new");
        assert_eq!(driver.poll_ring(), None);
    }

    #[test]
    fn resolved_tracks_the_latest_recompute() {
        let mut driver = SchedulerDriver::new();
        let alarms = vec![snoozed_alarm("wake", 60_000)];
        driver.sync(&Local::now(), &alarms).expect("arm");

        let resolved = driver.resolved().expect("resolved").clone();
        assert_eq!(resolved.alarm_id, "wake");
        assert_eq!(
            Some(resolved.due_at_ms),
            alarms[0].runtime.snooze_until_ms
        );
    }

    #[test]
    fn waker_runs_when_the_wakeup_fires() {
        let woke = Arc::new(AtomicBool::new(false));
        let observed = Arc::clone(&woke);

        let mut driver = SchedulerDriver::new();
        driver.set_waker(Arc::new(move || observed.store(true, Ordering::SeqCst)));
        driver
            .sync(&Local::now(), &[snoozed_alarm("wake", 30)])
            .expect("arm");

        assert!(wait_for_ring(&mut driver).is_some());
        assert!(woke.load(Ordering::SeqCst));
    }
}
