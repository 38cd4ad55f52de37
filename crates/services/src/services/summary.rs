//! Hour totals for reports and the per-project CSV export.

use db::models::{project::Project, time_log::TimeLog};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub const NOT_STOPPED: &str = "Not stopped";
const CSV_HEADER: [&str; 6] = ["logId", "name", "description", "startTime", "endTime", "timeSpent"];

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("failed to finish csv buffer: {0}")]
    Buffer(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectHours {
    pub project_id: Uuid,
    pub project_name: String,
    pub total_hours: f64,
    pub formatted: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RangeHours {
    pub total_hours_for_range: f64,
    pub total_hours_formatted: String,
    pub log_count: usize,
}

pub fn round_to_hundredths(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

/// Whole hours and leftover minutes of an already rounded total.
pub fn split_hours(rounded: f64) -> (u64, u64) {
    let hours = rounded.floor();
    let minutes = ((rounded - hours) * 60.0).round();
    (hours as u64, minutes as u64)
}

/// `"H hrs and M mins"`
pub fn format_project_hours(total: f64) -> String {
    let (hours, minutes) = split_hours(round_to_hundredths(total));
    format!("{hours} hrs and {minutes} mins")
}

/// `"H hours and M minutes"`
pub fn format_range_hours(total: f64) -> String {
    let (hours, minutes) = split_hours(round_to_hundredths(total));
    format!("{hours} hours and {minutes} minutes")
}

pub fn project_hours(project: &Project) -> ProjectHours {
    ProjectHours {
        project_id: project.id,
        project_name: project.name.clone(),
        total_hours: round_to_hundredths(project.total_hours),
        formatted: format_project_hours(project.total_hours),
    }
}

pub fn range_hours(logs: &[TimeLog]) -> RangeHours {
    let total: f64 = logs.iter().map(|log| log.time_spent).sum();
    RangeHours {
        total_hours_for_range: round_to_hundredths(total),
        total_hours_formatted: format_range_hours(total),
        log_count: logs.len(),
    }
}

pub fn csv_filename(project_id: Uuid) -> String {
    format!("project_{project_id}_summary.csv")
}

pub fn logs_to_csv(logs: &[TimeLog]) -> Result<Vec<u8>, SummaryError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for log in logs {
        let end_time = log
            .end_time_of_log
            .map(|end| end.to_rfc3339())
            .unwrap_or_else(|| NOT_STOPPED.to_string());
        writer.write_record([
            log.id.to_string(),
            log.name.clone().unwrap_or_default(),
            log.description.clone().unwrap_or_default(),
            log.start_time_of_log.to_rfc3339(),
            end_time,
            format!("{:.2}", log.time_spent),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|err| SummaryError::Buffer(err.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn log(time_spent: f64, stopped: bool) -> TimeLog {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        TimeLog {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            task_id: None,
            name: stopped.then(|| "Planning, phase 1".to_string()),
            description: stopped.then(|| "Sprint planning".to_string()),
            start_time_of_log: start,
            end_time_of_log: stopped.then(|| start + Duration::minutes(90)),
            time_spent,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn range_total_rounds_and_formats() {
        let summary = range_hours(&[log(1.5, true), log(2.25, true)]);
        assert_eq!(summary.total_hours_for_range, 3.75);
        assert_eq!(summary.total_hours_formatted, "3 hours and 45 minutes");
        assert_eq!(summary.log_count, 2);
    }

    #[test]
    fn project_format_uses_short_units() {
        assert_eq!(format_project_hours(0.0), "0 hrs and 0 mins");
        assert_eq!(format_project_hours(1.999), "2 hrs and 0 mins");
        assert_eq!(format_project_hours(2.504), "2 hrs and 30 mins");
    }

    #[test]
    fn csv_marks_running_logs_and_quotes_commas() {
        let done = log(1.5, true);
        let running = log(0.0, false);
        let bytes = logs_to_csv(&[done.clone(), running.clone()]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "logId,name,description,startTime,endTime,timeSpent");
        assert!(lines[1].starts_with(&format!("{},\"Planning, phase 1\",", done.id)));
        assert!(lines[1].ends_with(",1.50"));
        assert!(lines[2].ends_with(&format!(",{NOT_STOPPED},0.00")));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn csv_filename_embeds_project_id() {
        let id = Uuid::new_v4();
        assert_eq!(csv_filename(id), format!("project_{id}_summary.csv"));
    }
}
