use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Local, Weekday};
use eframe::egui::{self, Align, Color32, Layout, RichText, ScrollArea, TextEdit, TopBottomPanel, Ui};

use crate::alarm::driver::SchedulerDriver;
use crate::alarm::lifecycle::AlarmSet;
use crate::alarm::model::{AlarmId, AlarmStatus, PlayDuration, ToneId};
use crate::alarm::resolver::next_scheduled_occurrence;
use crate::audio::{AudioSink, PlayOptions, SilentSink, tone_label};
use crate::clock::{TimeDisplayMode, delay_to_next_tick, format_clock, format_due_instant, format_time_of_day};
use crate::store::{StoredState, save_state};

const STATUS_TTL: Duration = Duration::from_secs(4);
const TICK_MS: i64 = 1_000;
const RING_VOLUME: f32 = 0.22;

pub fn run_gui(
    state: StoredState,
    alarm_file: PathBuf,
    display_mode: TimeDisplayMode,
) -> Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("DarkAlarm")
            .with_inner_size([980.0, 680.0])
            .with_min_inner_size([760.0, 520.0]),
        ..Default::default()
    };

    eframe::run_native(
        "DarkAlarm",
        native_options,
        Box::new(move |cc| {
            configure_theme(&cc.egui_ctx);
            let mut app = DarkAlarmApp::new(state, alarm_file, display_mode);
            let repaint_ctx = cc.egui_ctx.clone();
            app.driver
                .set_waker(Arc::new(move || repaint_ctx.request_repaint()));
            Ok(Box::new(app))
        }),
    )
    .map_err(|err| anyhow::anyhow!("failed to launch DarkAlarm GUI: {err}"))?;

    Ok(())
}

fn configure_theme(ctx: &egui::Context) {
    let mut visuals = egui::Visuals::dark();
    visuals.override_text_color = Some(Color32::from_rgb(226, 234, 246));
    visuals.panel_fill = Color32::from_rgb(8, 16, 26);
    visuals.window_fill = Color32::from_rgb(12, 20, 32);
    visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(10, 18, 30);
    visuals.widgets.inactive.bg_fill = Color32::from_rgb(16, 24, 38);
    visuals.widgets.hovered.bg_fill = Color32::from_rgb(26, 42, 62);
    visuals.widgets.active.bg_fill = Color32::from_rgb(34, 60, 88);
    visuals.selection.bg_fill = Color32::from_rgb(43, 148, 178);
    ctx.set_visuals(visuals);
}

#[derive(Debug, Clone)]
struct AlarmRow {
    id: AlarmId,
    label: String,
    enabled: bool,
    status: AlarmStatus,
    time_text: String,
    days_text: String,
    next_text: String,
}

struct RingDeadline {
    alarm_id: AlarmId,
    stop_at_ms: i64,
}

struct DarkAlarmApp {
    alarms: AlarmSet,
    driver: SchedulerDriver,
    audio: Box<dyn AudioSink>,
    alarm_file: PathBuf,
    selected: Option<AlarmId>,
    display_mode: TimeDisplayMode,
    ring_deadline: Option<RingDeadline>,
    status_message: Option<(String, Instant)>,
    now: DateTime<Local>,
}

impl DarkAlarmApp {
    fn new(state: StoredState, alarm_file: PathBuf, display_mode: TimeDisplayMode) -> Self {
        Self {
            alarms: AlarmSet::new(state.alarms),
            driver: SchedulerDriver::new(),
            audio: Box::new(SilentSink::new()),
            alarm_file,
            selected: state.selected_alarm_id,
            display_mode,
            ring_deadline: None,
            status_message: None,
            now: Local::now(),
        }
    }

    fn set_status(&mut self, text: impl Into<String>, ttl: Duration) {
        self.status_message = Some((text.into(), Instant::now() + ttl));
    }

    fn persist(&mut self) {
        let result = save_state(
            &self.alarm_file,
            self.alarms.alarms(),
            self.selected.as_deref(),
        );
        if let Err(err) = result {
            self.set_status(format!("Could not save alarms: {err:#}"), STATUS_TTL);
        }
    }

    fn on_ring(&mut self, alarm_id: &str) {
        if !self.alarms.mark_ringing(alarm_id) {
            return;
        }

        let Some(alarm) = self.alarms.get(alarm_id) else {
            return;
        };
        let label = alarm.config.label.clone();
        let tone = alarm.config.tone_id;
        let duration_ms = alarm.config.play_duration.as_millis();
        let opts = PlayOptions {
            duration_ms: duration_ms.map(|ms| ms.max(0) as u64),
            volume: RING_VOLUME,
        };

        // A failed tone still shows the ringing banner.
        if let Err(err) = self.audio.play(tone, opts) {
            self.set_status(format!("Audio unavailable: {err:#}"), STATUS_TTL);
        } else {
            self.set_status(format!("'{label}' is ringing."), STATUS_TTL);
        }
        self.ring_deadline = duration_ms.map(|ms| RingDeadline {
            alarm_id: alarm_id.to_string(),
            stop_at_ms: self.now.timestamp_millis() + ms,
        });
        self.persist();
    }

    fn silence_feedback(&mut self) {
        self.audio.stop();
        self.ring_deadline = None;
    }

    fn finish_elapsed_ring(&mut self) {
        let Some(deadline) = &self.ring_deadline else {
            return;
        };
        let still_ringing =
            self.alarms.ringing_id().map(String::as_str) == Some(deadline.alarm_id.as_str());
        if !still_ringing {
            self.ring_deadline = None;
            return;
        }
        if self.now.timestamp_millis() < deadline.stop_at_ms {
            return;
        }

        let alarm_id = deadline.alarm_id.clone();
        self.ring_deadline = None;
        self.alarms.stop(&alarm_id);
        self.audio.stop();
        self.persist();
    }

    /// One scheduling pass per frame: advance the clock, auto-stop a ring
    /// whose play window elapsed, consume fired wake-ups, then reconcile the
    /// pending wake-up against the current alarm list.
    fn step(&mut self) {
        self.now = Local::now();
        self.finish_elapsed_ring();

        while let Some(alarm_id) = self.driver.poll_ring() {
            self.on_ring(&alarm_id);
        }

        let now = self.now;
        if let Err(err) = self.driver.sync(&now, self.alarms.alarms()) {
            self.set_status(format!("Alarm scheduling degraded: {err}"), STATUS_TTL);
        }

        if let Some((_, expires_at)) = &self.status_message
            && Instant::now() >= *expires_at
        {
            self.status_message = None;
        }
    }

    fn snooze_alarm(&mut self, alarm_id: &str) {
        let now = self.now;
        if self.alarms.snooze(alarm_id, &now) {
            self.silence_feedback();
            let until = self
                .alarms
                .get(alarm_id)
                .and_then(|alarm| alarm.runtime.snooze_until_ms);
            if let Some(until_ms) = until {
                self.set_status(
                    format!(
                        "Snoozed until {}.",
                        format_due_instant(until_ms, self.display_mode)
                    ),
                    STATUS_TTL,
                );
            }
            self.persist();
        }
    }

    fn stop_alarm(&mut self, alarm_id: &str) {
        if self.alarms.stop(alarm_id) {
            self.silence_feedback();
            self.persist();
        }
    }

    fn show_header(&mut self, ui: &mut Ui) {
        let clock_text = format_clock(&self.now, self.display_mode);
        let next_text = match self.driver.resolved() {
            Some(due) => {
                let label = self
                    .alarms
                    .get(&due.alarm_id)
                    .map(|alarm| alarm.config.label.clone())
                    .unwrap_or_else(|| due.alarm_id.clone());
                format!(
                    "Next: '{label}' at {}",
                    format_due_instant(due.due_at_ms, self.display_mode)
                )
            }
            None => "Next: none scheduled".to_string(),
        };
        let enabled_count = self
            .alarms
            .alarms()
            .iter()
            .filter(|alarm| alarm.config.enabled)
            .count();

        ui.horizontal_wrapped(|ui| {
            ui.label(
                RichText::new("DarkAlarm")
                    .size(26.0)
                    .color(Color32::from_rgb(96, 228, 206))
                    .strong(),
            );
            ui.separator();
            ui.label(
                RichText::new(clock_text)
                    .size(30.0)
                    .color(Color32::from_rgb(255, 214, 117))
                    .strong(),
            );
            ui.separator();
            ui.label(
                RichText::new(self.now.format("%A, %B %d %Y").to_string())
                    .size(18.0)
                    .color(Color32::from_rgb(169, 188, 209)),
            );
        });

        ui.horizontal(|ui| {
            ui.label(
                RichText::new(next_text)
                    .color(Color32::from_rgb(102, 211, 171))
                    .strong(),
            );
            ui.label(
                RichText::new(format!("Enabled: {enabled_count}/{}", self.alarms.len()))
                    .color(Color32::from_rgb(169, 188, 209)),
            );
            if ui
                .button(match self.display_mode {
                    TimeDisplayMode::Hour24 => "Switch to 12h",
                    TimeDisplayMode::Hour12 => "Switch to 24h",
                })
                .clicked()
            {
                self.display_mode = match self.display_mode {
                    TimeDisplayMode::Hour24 => TimeDisplayMode::Hour12,
                    TimeDisplayMode::Hour12 => TimeDisplayMode::Hour24,
                };
            }
        });

        if let Some((msg, _)) = &self.status_message {
            ui.label(
                RichText::new(msg)
                    .color(Color32::from_rgb(111, 228, 134))
                    .strong(),
            );
        }
    }

    fn show_ringing_banner(&mut self, ui: &mut Ui) {
        let Some((ringing_id, ringing_label)) = self
            .alarms
            .ringing_alarm()
            .map(|alarm| (alarm.config.id.clone(), alarm.config.label.clone()))
        else {
            return;
        };

        let mut snooze_clicked = false;
        let mut stop_clicked = false;
        ui.horizontal(|ui| {
            ui.label(
                RichText::new(format!("RINGING: {ringing_label}"))
                    .size(20.0)
                    .color(Color32::from_rgb(255, 101, 101))
                    .strong(),
            );
            snooze_clicked = ui
                .add(
                    egui::Button::new(RichText::new("Snooze").strong())
                        .fill(Color32::from_rgb(34, 64, 108))
                        .min_size(egui::vec2(110.0, 26.0)),
                )
                .clicked();
            stop_clicked = ui
                .add(
                    egui::Button::new(RichText::new("Stop").strong())
                        .fill(Color32::from_rgb(51, 20, 24))
                        .min_size(egui::vec2(110.0, 26.0)),
                )
                .clicked();
        });
        ui.separator();

        if snooze_clicked {
            self.snooze_alarm(&ringing_id);
        } else if stop_clicked {
            self.stop_alarm(&ringing_id);
        }
    }

    fn show_alarm_list(&mut self, ui: &mut Ui) {
        ui.heading(
            RichText::new("Alarms")
                .color(Color32::from_rgb(104, 221, 205))
                .strong(),
        );
        ui.add_space(4.0);

        if self.alarms.is_empty() {
            ui.label(
                RichText::new("No alarms configured.")
                    .color(Color32::from_rgb(255, 190, 106))
                    .strong(),
            );
        }

        let now = self.now;
        let mode = self.display_mode;
        let rows: Vec<AlarmRow> = self
            .alarms
            .alarms()
            .iter()
            .map(|alarm| {
                let next_text = match alarm.runtime.snooze_until_ms {
                    Some(until_ms) if alarm.config.enabled => format_due_instant(until_ms, mode),
                    _ if alarm.config.enabled => next_scheduled_occurrence(&now, &alarm.config)
                        .map(|at| format_due_instant(at.timestamp_millis(), mode))
                        .unwrap_or_else(|| "-".to_string()),
                    _ => "-".to_string(),
                };
                AlarmRow {
                    id: alarm.config.id.clone(),
                    label: alarm.config.label.clone(),
                    enabled: alarm.config.enabled,
                    status: alarm.runtime.status,
                    time_text: format_time_of_day(alarm.config.time),
                    days_text: alarm.config.days.short_label(),
                    next_text,
                }
            })
            .collect();

        let mut select_id: Option<AlarmId> = None;
        let mut toggle: Option<(AlarmId, bool)> = None;
        let mut stop_id: Option<AlarmId> = None;
        let mut remove_id: Option<AlarmId> = None;
        ScrollArea::vertical()
            .id_salt("alarms_scroll")
            .show(ui, |ui| {
                egui::Grid::new("alarms_grid")
                    .striped(true)
                    .num_columns(7)
                    .show(ui, |ui| {
                        ui.label(RichText::new("Label").strong());
                        ui.label(RichText::new("On").strong());
                        ui.label(RichText::new("Time").strong());
                        ui.label(RichText::new("Days").strong());
                        ui.label(RichText::new("Status").strong());
                        ui.label(RichText::new("Next").strong());
                        ui.label(RichText::new("Remove").strong());
                        ui.end_row();

                        for row in &rows {
                            let selected = self.selected.as_deref() == Some(row.id.as_str());
                            if ui.selectable_label(selected, row.label.clone()).clicked() {
                                select_id = Some(row.id.clone());
                            }
                            let mut enabled = row.enabled;
                            if ui.checkbox(&mut enabled, "").changed() {
                                toggle = Some((row.id.clone(), enabled));
                            }
                            ui.label(RichText::new(row.time_text.clone()).monospace());
                            ui.label(row.days_text.clone());
                            let (status_text, status_color) = match row.status {
                                AlarmStatus::Idle => ("IDLE", Color32::from_rgb(146, 160, 177)),
                                AlarmStatus::Armed => ("ARMED", Color32::from_rgb(109, 206, 197)),
                                AlarmStatus::Snoozed => {
                                    ("SNOOZED", Color32::from_rgb(255, 183, 95))
                                }
                                AlarmStatus::Ringing => {
                                    ("RINGING", Color32::from_rgb(255, 101, 101))
                                }
                            };
                            ui.colored_label(status_color, status_text);
                            ui.label(row.next_text.clone());
                            ui.horizontal(|ui| {
                                if row.status == AlarmStatus::Snoozed && ui.button("Stop").clicked()
                                {
                                    stop_id = Some(row.id.clone());
                                }
                                if ui
                                    .add(
                                        egui::Button::new(
                                            RichText::new("Delete")
                                                .color(Color32::from_rgb(255, 124, 124))
                                                .strong(),
                                        )
                                        .fill(Color32::from_rgb(51, 20, 24)),
                                    )
                                    .clicked()
                                {
                                    remove_id = Some(row.id.clone());
                                }
                            });
                            ui.end_row();
                        }
                    });
            });

        if let Some(id) = select_id {
            self.selected = Some(id);
            self.persist();
        }
        if let Some((id, enabled)) = toggle {
            if !enabled && self.alarms.ringing_id().map(String::as_str) == Some(id.as_str()) {
                self.silence_feedback();
            }
            self.alarms.set_enabled(&id, enabled);
            self.persist();
        }
        if let Some(id) = stop_id {
            self.stop_alarm(&id);
        }
        if let Some(id) = remove_id {
            let was_ringing = self.alarms.ringing_id().map(String::as_str) == Some(id.as_str());
            if self.alarms.remove(&id) {
                if was_ringing {
                    self.silence_feedback();
                }
                if self.selected.as_deref() == Some(id.as_str()) {
                    self.selected = self
                        .alarms
                        .alarms()
                        .first()
                        .map(|alarm| alarm.config.id.clone());
                }
                self.set_status("Alarm removed.", STATUS_TTL);
                self.persist();
            }
        }
    }

    fn show_editor(&mut self, ui: &mut Ui) {
        ui.heading(
            RichText::new("Edit Alarm")
                .color(Color32::from_rgb(104, 221, 205))
                .strong(),
        );
        ui.separator();

        if ui
            .add(
                egui::Button::new(RichText::new("Add Alarm").strong())
                    .fill(Color32::from_rgb(22, 78, 89))
                    .min_size(egui::vec2(150.0, 26.0)),
            )
            .clicked()
        {
            let id = self.alarms.add();
            self.selected = Some(id);
            self.set_status("Alarm added (disabled until switched on).", STATUS_TTL);
            self.persist();
        }
        ui.add_space(8.0);

        let Some(mut config) = self
            .selected
            .as_deref()
            .and_then(|id| self.alarms.get(id))
            .map(|alarm| alarm.config.clone())
        else {
            ui.label(
                RichText::new("Select an alarm to edit it.")
                    .color(Color32::from_rgb(169, 188, 209)),
            );
            return;
        };

        let mut changed = false;
        ui.horizontal(|ui| {
            ui.label("Label");
            changed |= ui
                .add(TextEdit::singleline(&mut config.label).desired_width(160.0))
                .changed();
        });
        changed |= ui.checkbox(&mut config.enabled, "Enabled").changed();
        ui.horizontal(|ui| {
            ui.label("Time");
            changed |= ui
                .add(egui::DragValue::new(&mut config.time.hour).range(0..=23))
                .changed();
            ui.label(":");
            changed |= ui
                .add(egui::DragValue::new(&mut config.time.minute).range(0..=59))
                .changed();
        });
        ui.horizontal_wrapped(|ui| {
            ui.label("Days:");
            for (day, label) in [
                (Weekday::Mon, "Mon"),
                (Weekday::Tue, "Tue"),
                (Weekday::Wed, "Wed"),
                (Weekday::Thu, "Thu"),
                (Weekday::Fri, "Fri"),
                (Weekday::Sat, "Sat"),
                (Weekday::Sun, "Sun"),
            ] {
                let mut on = config.days.contains(day);
                if ui.checkbox(&mut on, label).changed() {
                    config.days.set(day, on);
                    changed = true;
                }
            }
        });
        if !config.days.any_selected() {
            ui.label(
                RichText::new("No days selected; this alarm will never fire.")
                    .color(Color32::from_rgb(255, 183, 95)),
            );
        }

        ui.horizontal(|ui| {
            ui.label("Tone");
            egui::ComboBox::from_id_salt("tone_combo")
                .selected_text(tone_label(config.tone_id))
                .show_ui(ui, |ui| {
                    for tone in ToneId::ALL {
                        changed |= ui
                            .selectable_value(&mut config.tone_id, tone, tone_label(tone))
                            .changed();
                    }
                });
        });

        let mut until_stop = config.play_duration == PlayDuration::UntilStop;
        let mut play_secs = match config.play_duration {
            PlayDuration::Seconds(secs) => secs,
            PlayDuration::UntilStop => 30,
        };
        if ui.checkbox(&mut until_stop, "Ring until stopped").changed() {
            changed = true;
        }
        if !until_stop {
            ui.horizontal(|ui| {
                ui.label("Play for (s)");
                changed |= ui
                    .add(egui::DragValue::new(&mut play_secs).range(1..=600))
                    .changed();
            });
        }
        config.play_duration = if until_stop {
            PlayDuration::UntilStop
        } else {
            PlayDuration::Seconds(play_secs)
        };

        ui.horizontal(|ui| {
            ui.label("Snooze (min)");
            changed |= ui
                .add(egui::DragValue::new(&mut config.snooze_minutes).range(1..=120))
                .changed();
        });

        if changed {
            let id = config.id.clone();
            let disabling = !config.enabled;
            if disabling && self.alarms.ringing_id().map(String::as_str) == Some(id.as_str()) {
                self.silence_feedback();
            }
            self.alarms.update_config(&id, config);
            self.persist();
        }
    }
}

impl eframe::App for DarkAlarmApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.step();

        TopBottomPanel::top("header")
            .resizable(false)
            .show(ctx, |ui| self.show_header(ui));

        TopBottomPanel::bottom("footer")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal_wrapped(|ui| {
                    ui.label(
                        RichText::new(format!("Alarm file: {}", self.alarm_file.display()))
                            .color(Color32::from_rgb(161, 180, 201)),
                    );
                    ui.separator();
                    ui.label(
                        RichText::new("Alarms persist on each change.")
                            .color(Color32::from_rgb(161, 180, 201)),
                    );
                });
            });

        egui::SidePanel::right("editor_panel")
            .resizable(true)
            .min_width(280.0)
            .default_width(320.0)
            .show(ctx, |ui| self.show_editor(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.with_layout(Layout::top_down(Align::Min), |ui| {
                self.show_ringing_banner(ui);
                self.show_alarm_list(ui);
            });
        });

        ctx.request_repaint_after(delay_to_next_tick(self.now.timestamp_millis(), TICK_MS));
    }
}
