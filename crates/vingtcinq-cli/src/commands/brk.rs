use clap::Subcommand;
use vingtcinq_core::{format_clock, BreakKind};

use super::common::{emit, emit_all, CliResult, Workspace};

#[derive(Subcommand)]
pub enum BreakAction {
    /// Start a short (5 min) or long (15 min) break
    Start {
        #[arg(default_value = "short")]
        kind: BreakKind,
    },
    /// Pause the break
    Pause,
    /// Resume a paused break
    Resume,
    /// Clear the break timer
    Reset,
    /// Skip the break
    Skip,
    /// Print break state as JSON
    Status,
}

pub fn run(action: BreakAction) -> CliResult {
    let (mut ws, caught_up) = Workspace::open()?;
    emit_all(&caught_up)?;

    let event = match action {
        BreakAction::Start { kind } => ws.tracker.start_break(kind),
        BreakAction::Pause => ws.tracker.pause_break(),
        BreakAction::Resume => ws.tracker.resume_break(),
        BreakAction::Reset => ws.tracker.reset_break(),
        BreakAction::Skip => ws.tracker.skip_break(),
        BreakAction::Status => None,
    };

    match event {
        Some(event) => emit(&event)?,
        None => {
            let breaks = ws.tracker.breaks();
            emit(&serde_json::json!({
                "type": "BreakStatus",
                "kind": breaks.kind(),
                "label": breaks.kind().map(|k| k.label()),
                "remaining_secs": breaks.remaining_secs(),
                "display": format_clock(breaks.remaining_secs()),
                "running": breaks.is_running(),
                "completed": breaks.is_completed(),
                "suggested": ws.tracker.break_suggested(),
            }))?;
        }
    }
    ws.save()
}
