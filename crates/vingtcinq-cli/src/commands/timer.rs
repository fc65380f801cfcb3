use clap::Subcommand;

use super::common::{emit, emit_all, CliResult, Workspace};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume; after completion, record the session first
    Start,
    /// Pause the countdown
    Pause,
    /// Pause when running, start otherwise
    Toggle,
    /// Back to 00:00, discarding the current session
    Reset,
    /// Set the duration of a fresh timer ("25:00", "2500", "1h 05m 00s")
    Set {
        duration: String,
    },
    /// Add bonus time (negative values remove time)
    Extra {
        #[arg(allow_hyphen_values = true)]
        seconds: i64,
    },
    /// Record the current session now and clear the timer
    New,
    /// Print current timer state as JSON
    Status,
}

pub fn run(action: TimerAction) -> CliResult {
    let (mut ws, caught_up) = Workspace::open()?;
    emit_all(&caught_up)?;

    let event = match action {
        TimerAction::Start => ws.tracker.start(),
        TimerAction::Pause => ws.tracker.pause(),
        TimerAction::Toggle => ws.tracker.toggle(),
        TimerAction::Reset => ws.tracker.reset(),
        TimerAction::Set { duration } => {
            if !ws.tracker.set_time_string(&duration) {
                tracing::warn!("timer already started; duration unchanged");
            }
            None
        }
        TimerAction::Extra { seconds } => ws.tracker.add_extra_time(seconds),
        TimerAction::New => ws.tracker.start_new_session(),
        TimerAction::Status => None,
    };

    match event {
        Some(event) => emit(&event)?,
        None => emit(&ws.tracker.snapshot())?,
    }

    if let Some(err) = ws.tracker.history().last_error() {
        eprintln!("warning: session not synced: {err}");
    }
    ws.save()
}
