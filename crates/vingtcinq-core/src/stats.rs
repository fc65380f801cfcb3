//! Aggregate statistics over completed sessions, daily goal progress and
//! data export (JSON / CSV).

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::CompletedSession;

pub const CSV_HEADER: [&str; 5] = [
    "Session Number",
    "Active Time (s)",
    "Pause Time (s)",
    "Extra Time (s)",
    "Total Time (s)",
];

/// Totals across every completed session, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_sessions: u64,
    pub total_time: f64,
    pub average_time: f64,
    pub total_active_time: f64,
    pub total_pause_time: f64,
    pub total_extra_time: f64,
}

impl Statistics {
    pub fn compute<'a, I>(sessions: I) -> Self
    where
        I: IntoIterator<Item = &'a CompletedSession>,
    {
        let mut stats = Self::default();
        for session in sessions {
            stats.total_sessions += 1;
            stats.total_time += session.data.total_secs;
            stats.total_active_time += session.data.active_secs;
            stats.total_pause_time += session.data.pause_secs;
            stats.total_extra_time += session.data.extra_secs;
        }
        if stats.total_sessions > 0 {
            stats.average_time = stats.total_time / stats.total_sessions as f64;
        }
        stats
    }
}

/// Total time of sessions completed on the same calendar day as `now`,
/// in `now`'s time zone.
pub fn today_total_secs<'a, I, Tz>(sessions: I, now: &DateTime<Tz>) -> f64
where
    I: IntoIterator<Item = &'a CompletedSession>,
    Tz: TimeZone,
{
    let today = now.date_naive();
    sessions
        .into_iter()
        .filter(|s| s.completed_at.with_timezone(&now.timezone()).date_naive() == today)
        .map(|s| s.data.total_secs)
        .sum()
}

/// Percentage of the daily goal reached, capped at 100. `None` when no goal is set.
pub fn goal_progress_percent(today_secs: f64, goal_hours: u32) -> Option<u8> {
    if goal_hours == 0 {
        return None;
    }
    let percent = (today_secs / (f64::from(goal_hours) * 3600.0) * 100.0).round();
    Some(percent.clamp(0.0, 100.0) as u8)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedSessionData {
    pub active_time: f64,
    pub pause_time: f64,
    pub extra_time: f64,
    pub total_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedSession {
    pub session_number: u64,
    pub session_data: ExportedSessionData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Export {
    pub export_date: DateTime<Utc>,
    pub statistics: Statistics,
    pub sessions: Vec<ExportedSession>,
}

impl Export {
    pub fn new(sessions: &[CompletedSession], export_date: DateTime<Utc>) -> Self {
        Self {
            export_date,
            statistics: Statistics::compute(sessions),
            sessions: sessions
                .iter()
                .map(|s| ExportedSession {
                    session_number: s.session_number,
                    session_data: ExportedSessionData {
                        active_time: s.data.active_secs,
                        pause_time: s.data.pause_secs,
                        extra_time: s.data.extra_secs,
                        total_time: s.data.total_secs,
                    },
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One row per session, values with two decimals.
pub fn export_csv(sessions: &[CompletedSession]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for s in sessions {
        writer.write_record([
            s.session_number.to_string(),
            format!("{:.2}", s.data.active_secs),
            format!("{:.2}", s.data.pause_secs),
            format!("{:.2}", s.data.extra_secs),
            format!("{:.2}", s.data.total_secs),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| crate::error::CoreError::Custom(e.to_string()))
}

/// Default export file name, e.g. `vingtcinq-export-2024-05-01.csv`.
pub fn export_file_name(date: DateTime<Utc>, extension: &str) -> String {
    format!("vingtcinq-export-{}.{extension}", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionData;
    use chrono::{Duration, FixedOffset};

    fn session(number: u64, active: f64, pause: f64, extra: f64, at: DateTime<Utc>) -> CompletedSession {
        CompletedSession {
            session_number: number,
            name: None,
            data: SessionData::new(active, pause, extra),
            remote_id: None,
            completed_at: at,
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_statistics_are_zero() {
        let none: Vec<CompletedSession> = Vec::new();
        assert_eq!(Statistics::compute(&none), Statistics::default());
    }

    #[test]
    fn statistics_sum_and_average() {
        let sessions = vec![
            session(1, 1500.0, 60.0, 0.0, noon()),
            session(2, 900.0, 0.0, 300.0, noon()),
        ];
        let stats = Statistics::compute(&sessions);
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_time, 2700.0);
        assert_eq!(stats.average_time, 1350.0);
        assert_eq!(stats.total_pause_time, 60.0);
        assert_eq!(stats.total_extra_time, 300.0);
    }

    #[test]
    fn today_total_respects_time_zone() {
        let sessions = vec![
            session(1, 600.0, 0.0, 0.0, noon()),
            session(2, 300.0, 0.0, 0.0, noon() - Duration::hours(13)),
        ];
        assert_eq!(today_total_secs(&sessions, &noon()), 600.0);

        // At UTC+1 both land on May 1st.
        let plus1 = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(today_total_secs(&sessions, &noon().with_timezone(&plus1)), 900.0);
    }

    #[test]
    fn goal_progress_rounds_and_caps() {
        assert_eq!(goal_progress_percent(1800.0, 0), None);
        assert_eq!(goal_progress_percent(1800.0, 1), Some(50));
        assert_eq!(goal_progress_percent(1234.0, 2), Some(17));
        assert_eq!(goal_progress_percent(20_000.0, 1), Some(100));
    }

    #[test]
    fn json_export_uses_camel_case() {
        let sessions = vec![session(3, 10.0, 2.0, 0.0, noon())];
        let json = Export::new(&sessions, noon()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["statistics"]["totalSessions"], 1);
        assert_eq!(value["sessions"][0]["sessionNumber"], 3);
        assert_eq!(value["sessions"][0]["sessionData"]["pauseTime"], 2.0);
        assert!(value["exportDate"].as_str().unwrap().starts_with("2024-05-01"));
    }

    #[test]
    fn csv_export_has_header_and_two_decimals() {
        let sessions = vec![session(1, 12.25, 0.5, 0.0, noon())];
        let csv = export_csv(&sessions).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Session Number,Active Time (s),Pause Time (s),Extra Time (s),Total Time (s)")
        );
        assert_eq!(lines.next(), Some("1,12.25,0.50,0.00,12.25"));
    }

    #[test]
    fn export_file_name_uses_date() {
        assert_eq!(export_file_name(noon(), "json"), "vingtcinq-export-2024-05-01.json");
    }
}
