use clap::Subcommand;
use vingtcinq_core::{format_clock, SyncOutcome};

use super::common::{emit, CliResult, Workspace};

#[derive(Subcommand)]
pub enum SessionsAction {
    /// List completed sessions
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename a session (empty name restores "Session N")
    Rename {
        number: u64,
        #[arg(default_value = "")]
        name: String,
    },
    /// Delete a session
    Delete {
        number: u64,
    },
    /// Reload from the session store and upload local-only sessions
    Sync,
}

pub fn run(action: SessionsAction) -> CliResult {
    let (mut ws, _) = Workspace::open()?;

    match action {
        SessionsAction::List { json } => {
            let sessions = ws.tracker.history().to_vec();
            if json {
                emit(&sessions)?;
            } else if sessions.is_empty() {
                println!("No completed sessions.");
            } else {
                for s in &sessions {
                    println!(
                        "#{:<4} {:<16}  total {}  active {}  pause {}  extra {}{}",
                        s.session_number,
                        s.display_name(),
                        format_clock(s.data.total_secs.round() as u64),
                        format_clock(s.data.active_secs.round() as u64),
                        format_clock(s.data.pause_secs.round() as u64),
                        format_clock(s.data.extra_secs.round() as u64),
                        if s.is_synced() { "" } else { "  (local)" },
                    );
                }
            }
        }
        SessionsAction::Rename { number, name } => {
            let recorded = ws.tracker.history().get(number).is_some();
            if !recorded && number != ws.tracker.current_session_number() {
                return Err(format!("no session #{number}").into());
            }
            let outcome = ws.tracker.rename_session(number, &name);
            report(&ws, outcome, number)?;
        }
        SessionsAction::Delete { number } => {
            let outcome = ws.tracker.delete_session(number);
            if outcome == SyncOutcome::Unchanged {
                return Err(format!("no session #{number}").into());
            }
            report(&ws, outcome, number)?;
        }
        SessionsAction::Sync => {
            let outcome = ws.tracker.sync();
            emit(&serde_json::json!({
                "sync": outcome,
                "sessions": ws.tracker.history().len(),
                "local_only": ws.tracker.history().unsynced().len(),
            }))?;
        }
    }
    ws.save()
}

fn report(ws: &Workspace, outcome: SyncOutcome, number: u64) -> CliResult {
    emit(&serde_json::json!({
        "session_number": number,
        "name": ws.tracker.history().display_name(number),
        "sync": outcome,
    }))?;
    if let Some(err) = ws.tracker.history().last_error() {
        eprintln!("warning: {err}");
    }
    Ok(())
}
