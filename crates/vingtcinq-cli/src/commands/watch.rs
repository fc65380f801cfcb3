use clap::Args;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;
use vingtcinq_core::ticker::{self, TickerConfig};
use vingtcinq_core::{format_clock, Clock, Event, Tracker};

use super::common::{emit, emit_all, save_state, CliResult, Workspace};

#[derive(Args)]
pub struct WatchArgs {
    /// Keep watching after both timers stop
    #[arg(long)]
    pub follow: bool,
}

pub fn run(args: WatchArgs) -> CliResult {
    let (ws, caught_up) = Workspace::open()?;
    emit_all(&caught_up)?;

    let Workspace {
        config, db, tracker, ..
    } = ws;
    let ticker_config = TickerConfig {
        stop_when_idle: !args.follow,
        ..TickerConfig::from(&config.timer)
    };
    let tracker = Arc::new(Mutex::new(tracker));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let state = runtime.block_on(async {
        let shutdown = install_ctrl_c();
        let exit = ticker::run(tracker.clone(), ticker_config, shutdown, render).await;
        info!(?exit, "watch finished");
        tracker.lock().await.state()
    });

    eprintln!();
    save_state(&db, &state)
}

fn install_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, stopping watch");
        }
        cancel.cancel();
    });
    token
}

fn render<C: Clock>(tracker: &Tracker<C>, event: Option<&Event>) {
    if let Some(event) = event {
        eprintln!();
        if let Err(e) = emit(event) {
            tracing::warn!(error = %e, "failed to print event");
        }
    }
    let timer = tracker.timer();
    let breaks = tracker.breaks();
    let line = match breaks.kind() {
        Some(kind) if breaks.is_running() => {
            format!("{} {}", kind.label(), format_clock(breaks.remaining_secs()))
        }
        _ => format!(
            "Session {} {} ({:?})",
            tracker.current_session_number(),
            format_clock(timer.remaining_secs()),
            timer.state()
        ),
    };
    let mut stderr = std::io::stderr();
    if let Err(e) = write!(stderr, "\r{line:<40}").and_then(|()| stderr.flush()) {
        tracing::debug!(error = %e, "failed to draw status line");
    }
}
