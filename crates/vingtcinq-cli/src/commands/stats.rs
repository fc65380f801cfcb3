use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;
use vingtcinq_core::stats::{export_csv, export_file_name, goal_progress_percent};
use vingtcinq_core::Export;

use super::common::{emit, CliResult, Workspace};

#[derive(Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

#[derive(Subcommand)]
pub enum StatsAction {
    /// Totals across all sessions, plus today's progress
    Summary,
    /// Export sessions as JSON or CSV
    Export {
        #[arg(long, value_enum, default_value = "json")]
        format: ExportFormat,
        /// Write to this file; "-" for stdout. Defaults to vingtcinq-export-<date>.<ext>
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

pub fn run(action: StatsAction) -> CliResult {
    let (ws, _) = Workspace::open()?;
    let sessions = ws.tracker.history().to_vec();

    match action {
        StatsAction::Summary => {
            let today = ws.tracker.today_total_secs();
            let goal_hours = ws.config.goals.daily_goal_hours;
            emit(&serde_json::json!({
                "statistics": ws.tracker.statistics(),
                "today_total_secs": today,
                "daily_goal_hours": goal_hours,
                "goal_progress_percent": goal_progress_percent(today, goal_hours),
            }))?;
        }
        StatsAction::Export { format, output } => {
            let now = ws.tracker.now();
            let (content, ext) = match format {
                ExportFormat::Json => (Export::new(&sessions, now).to_json()?, "json"),
                ExportFormat::Csv => (export_csv(&sessions)?, "csv"),
            };
            let path = output.unwrap_or_else(|| PathBuf::from(export_file_name(now, ext)));
            if path.as_os_str() == "-" {
                print!("{content}");
            } else {
                std::fs::write(&path, content)?;
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}
