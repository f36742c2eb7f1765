mod alarm;
mod audio;
mod clock;
mod store;
mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};

use crate::alarm::resolver::next_due_alarm;
use crate::clock::TimeDisplayMode;
use crate::store::load_state;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliTimeFormat {
    #[value(name = "24h")]
    Hour24,
    #[value(name = "12h")]
    Hour12,
}

impl From<CliTimeFormat> for TimeDisplayMode {
    fn from(value: CliTimeFormat) -> Self {
        match value {
            CliTimeFormat::Hour24 => TimeDisplayMode::Hour24,
            CliTimeFormat::Hour12 => TimeDisplayMode::Hour12,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "darkalarm",
    version,
    about = "Desktop multi-alarm clock with a single-wake-up scheduler"
)]
struct Cli {
    #[arg(long, default_value = "alarms.json")]
    alarms: PathBuf,

    #[arg(long, value_enum, default_value_t = CliTimeFormat::Hour24)]
    time_format: CliTimeFormat,

    /// Print the loaded alarm state and the next due alarm, then exit.
    #[arg(long)]
    inspect: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let state = load_state(&cli.alarms);

    if cli.inspect {
        return inspect(&state);
    }

    ui::app::run_gui(state, cli.alarms, cli.time_format.into())
}

fn inspect(state: &store::StoredState) -> Result<()> {
    let value = store::state_to_value(&state.alarms, state.selected_alarm_id.as_deref())
        .context("failed to render alarm state")?;
    println!("{}", serde_json::to_string_pretty(&value)?);

    let now = Local::now();
    match next_due_alarm(&now, &state.alarms) {
        Some(due) => {
            let label = state
                .alarms
                .iter()
                .find(|alarm| alarm.config.id == due.alarm_id)
                .map(|alarm| alarm.config.label.as_str())
                .unwrap_or(due.alarm_id.as_str());
            println!(
                "next due: '{}' ({}) at {}",
                label,
                due.alarm_id,
                clock::format_due_instant(due.due_at_ms, TimeDisplayMode::Hour24)
            );
        }
        None => println!("next due: none"),
    }
    Ok(())
}
