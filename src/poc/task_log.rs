// src/poc/task_log.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::daily_log::get_with_tasks;
use super::error::PocError;
use super::model::{CompletionStatus, DailyLogStatus, DailyLogWithTasks, NewTaskLog};
use super::store::{PocStore, ReplaceOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaveAction {
    SaveDraft,
    Submit,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEntry {
    pub duty_id: String,
    pub completion_status: Option<String>,
    pub note: Option<String>,
}

/// Every Unicode dash punctuation (Pd) other than ASCII `-`, plus the
/// hyphen bullet and minus sign.
fn is_dash_variant(c: char) -> bool {
    matches!(
        c,
        '\u{058A}'
            | '\u{05BE}'
            | '\u{1400}'
            | '\u{1806}'
            | '\u{2010}'..='\u{2015}'
            | '\u{2043}'
            | '\u{2212}'
            | '\u{2E17}'
            | '\u{2E1A}'
            | '\u{2E3A}'
            | '\u{2E3B}'
            | '\u{2E40}'
            | '\u{2E5D}'
            | '\u{301C}'
            | '\u{3030}'
            | '\u{30A0}'
            | '\u{FE31}'
            | '\u{FE32}'
            | '\u{FE58}'
            | '\u{FE63}'
            | '\u{FF0D}'
            | '\u{10EAD}'
    )
}

pub fn normalize_duty_id(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if is_dash_variant(c) { '-' } else { c })
        .collect()
}

/// A validated entry, ready to become a task row.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedEntry {
    pub duty_id: String,
    pub completion_status: CompletionStatus,
    pub note: Option<String>,
}

/// Normalizes, dedupes (first occurrence wins) and validates entries against
/// the POC's duty ids. Nothing is accepted unless every entry is.
pub fn prepare_entries(
    entries: &[TaskEntry],
    duty_ids: &HashSet<String>,
) -> Result<Vec<PreparedEntry>, PocError> {
    let mut seen = HashSet::new();
    let mut prepared = Vec::with_capacity(entries.len());
    let mut invalid = Vec::new();

    for entry in entries {
        let duty_id = normalize_duty_id(&entry.duty_id);
        if !seen.insert(duty_id.clone()) {
            continue;
        }
        if !duty_ids.contains(&duty_id) {
            invalid.push(duty_id);
            continue;
        }

        let completion_status = match entry
            .completion_status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(raw) => raw.parse().map_err(PocError::InvalidCompletionStatus)?,
            None => CompletionStatus::default(),
        };

        let note = entry
            .note
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        prepared.push(PreparedEntry {
            duty_id,
            completion_status,
            note,
        });
    }

    if !invalid.is_empty() {
        return Err(PocError::InvalidDutyIds(invalid));
    }
    if prepared.is_empty() {
        return Err(PocError::EmptyTaskList);
    }
    Ok(prepared)
}

pub fn to_rows(entries: &[PreparedEntry], action: SaveAction, now: DateTime<Utc>) -> Vec<NewTaskLog> {
    let completed_at = match action {
        SaveAction::Submit => Some(now),
        SaveAction::SaveDraft => None,
    };

    entries
        .iter()
        .map(|e| NewTaskLog {
            id: Uuid::new_v4().to_string(),
            duty_id: e.duty_id.clone(),
            completion_status: e.completion_status,
            note: e.note.clone(),
            completed_at,
        })
        .collect()
}

pub async fn duty_id_set(store: &dyn PocStore, poc_id: &str) -> Result<HashSet<String>, PocError> {
    Ok(store
        .duties_for_poc(poc_id)
        .await?
        .into_iter()
        .map(|d| d.id)
        .collect())
}

/// Validated, all-or-nothing replacement of a daily log's task rows.
pub async fn replace(
    store: &dyn PocStore,
    daily_log_id: &str,
    poc_id: &str,
    entries: &[TaskEntry],
    action: SaveAction,
    now: DateTime<Utc>,
) -> Result<DailyLogWithTasks, PocError> {
    let log = store
        .get_daily_log(daily_log_id)
        .await?
        .ok_or_else(|| PocError::DailyLogNotFound(daily_log_id.to_string()))?;
    if log.poc_id != poc_id {
        return Err(PocError::Validation(format!(
            "daily log {daily_log_id} does not belong to plan of care {poc_id}"
        )));
    }

    let duty_ids = duty_id_set(store, poc_id).await?;
    let prepared = prepare_entries(entries, &duty_ids)?;

    if action == SaveAction::SaveDraft && log.status == DailyLogStatus::Submitted {
        return Err(PocError::AlreadySubmitted(log.id));
    }

    write(store, daily_log_id, &prepared, action, now).await
}

pub(crate) async fn write(
    store: &dyn PocStore,
    daily_log_id: &str,
    prepared: &[PreparedEntry],
    action: SaveAction,
    now: DateTime<Utc>,
) -> Result<DailyLogWithTasks, PocError> {
    let rows = to_rows(prepared, action, now);
    let submit_at = (action == SaveAction::Submit).then_some(now);

    match store.replace_task_logs(daily_log_id, &rows, submit_at).await? {
        ReplaceOutcome::Replaced => {}
        ReplaceOutcome::NotFound => return Err(PocError::DailyLogNotFound(daily_log_id.to_string())),
        ReplaceOutcome::AlreadySubmitted => return Err(PocError::AlreadySubmitted(daily_log_id.to_string())),
    }
    if submit_at.is_some() {
        tracing::info!(daily_log_id, tasks = rows.len(), "daily log submitted");
    }

    get_with_tasks(store, daily_log_id).await
}
