// src/poc/model.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/* ============================================================
   Plan of care + duties
   ============================================================ */

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Poc {
    pub id: String,
    pub individual_id: String,
    pub poc_number: Option<String>,
    pub shift: Option<String>,
    pub note: Option<String>,
    pub created_by: Option<String>,
    pub start_date: DateTime<Utc>,
    pub stop_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Duty {
    pub id: String,
    pub poc_id: String,
    pub category: Option<String>,
    pub task_no: i32,
    pub duty: String,
    pub minutes: Option<i32>,
    pub as_needed: bool,
    pub times_week_min: Option<i32>,
    pub times_week_max: Option<i32>,
    pub days_of_week: Option<String>,
    pub instruction: Option<String>,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct NewPoc {
    pub id: String,
    pub individual_id: String,
    pub poc_number: Option<String>,
    pub shift: Option<String>,
    pub note: Option<String>,
    pub created_by: Option<String>,
    pub start_date: DateTime<Utc>,
    pub stop_date: Option<DateTime<Utc>>,
    pub duties: Vec<NewDuty>,
}

#[derive(Debug, Clone)]
pub struct NewDuty {
    pub id: String,
    pub category: Option<String>,
    pub task_no: i32,
    pub duty: String,
    pub minutes: Option<i32>,
    pub as_needed: bool,
    pub times_week_min: Option<i32>,
    pub times_week_max: Option<i32>,
    pub days_of_week: Option<String>,
    pub instruction: Option<String>,
    pub sort_order: i32,
}

/* ============================================================
   Daily logs
   ============================================================ */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DailyLogStatus {
    Draft,
    Submitted,
}

impl DailyLogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DailyLogStatus::Draft => "DRAFT",
            DailyLogStatus::Submitted => "SUBMITTED",
        }
    }
}

impl fmt::Display for DailyLogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DailyLogStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(DailyLogStatus::Draft),
            "SUBMITTED" => Ok(DailyLogStatus::Submitted),
            other => Err(format!("unknown daily log status {other:?}")),
        }
    }
}

/// Unique key of a daily log.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DailyLogKey {
    pub poc_id: String,
    pub dsp_id: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyLog {
    pub id: String,
    pub poc_id: String,
    pub individual_id: String,
    pub dsp_id: String,
    pub date: NaiveDate,
    pub status: DailyLogStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDailyLog {
    pub id: String,
    pub key: DailyLogKey,
    pub individual_id: String,
    pub created_by: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyLogWithTasks {
    #[serde(flatten)]
    pub log: DailyLog,
    pub tasks: Vec<TaskLog>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyLogSummary {
    #[serde(flatten)]
    pub log: DailyLog,
    pub task_count: i64,
}

/* ============================================================
   Task logs
   ============================================================ */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionStatus {
    #[default]
    Independent,
    VerbalPrompt,
    PhysicalAssist,
    TotalAssist,
    Refused,
    NotDone,
}

impl CompletionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionStatus::Independent => "INDEPENDENT",
            CompletionStatus::VerbalPrompt => "VERBAL_PROMPT",
            CompletionStatus::PhysicalAssist => "PHYSICAL_ASSIST",
            CompletionStatus::TotalAssist => "TOTAL_ASSIST",
            CompletionStatus::Refused => "REFUSED",
            CompletionStatus::NotDone => "NOT_DONE",
        }
    }
}

impl FromStr for CompletionStatus {
    type Err = String;

    /// Case-insensitive; spaces and dashes are accepted in place of underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let canonical: String = s
            .trim()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c.to_ascii_uppercase() })
            .collect();

        match canonical.as_str() {
            "INDEPENDENT" => Ok(CompletionStatus::Independent),
            "VERBAL_PROMPT" => Ok(CompletionStatus::VerbalPrompt),
            "PHYSICAL_ASSIST" => Ok(CompletionStatus::PhysicalAssist),
            "TOTAL_ASSIST" => Ok(CompletionStatus::TotalAssist),
            "REFUSED" => Ok(CompletionStatus::Refused),
            "NOT_DONE" => Ok(CompletionStatus::NotDone),
            _ => Err(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskLog {
    pub id: String,
    pub daily_log_id: String,
    pub duty_id: String,
    pub completion_status: CompletionStatus,
    pub note: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTaskLog {
    pub id: String,
    pub duty_id: String,
    pub completion_status: CompletionStatus,
    pub note: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

/* ============================================================
   Listing
   ============================================================ */

#[derive(Debug, Clone, Default)]
pub struct DailyLogFilter {
    pub poc_id: Option<String>,
    pub individual_id: Option<String>,
    pub dsp_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub statuses: Vec<DailyLogStatus>,
}
