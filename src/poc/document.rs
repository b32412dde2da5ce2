// src/poc/document.rs

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::PocError;
use super::model::{Duty, NewDuty, NewPoc, Poc};
use super::resolver::{parse_date, start_of_day};
use super::store::PocStore;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePocRequest {
    pub individual_id: String,
    pub poc_number: Option<String>,
    pub shift: Option<String>,
    pub note: Option<String>,
    pub created_by: Option<String>,
    /// YYYY-MM-DD
    pub start_date: String,
    /// YYYY-MM-DD, inclusive
    pub stop_date: Option<String>,
    #[serde(default)]
    pub duties: Vec<CreateDutyRequest>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDutyRequest {
    pub category: Option<String>,
    pub task_no: i32,
    pub duty: String,
    pub minutes: Option<i32>,
    #[serde(default)]
    pub as_needed: bool,
    pub times_week_min: Option<i32>,
    pub times_week_max: Option<i32>,
    pub days_of_week: Option<String>,
    pub instruction: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PocWithDuties {
    pub poc: Poc,
    pub duties: Vec<Duty>,
}

fn trimmed(v: &Option<String>) -> Option<String> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn validate_duty(index: usize, d: &CreateDutyRequest) -> Result<NewDuty, PocError> {
    let text = d.duty.trim();
    if text.is_empty() {
        return Err(PocError::Validation(format!("duties[{index}].duty is required")));
    }
    if d.minutes.is_some_and(|m| m < 0) {
        return Err(PocError::Validation(format!("duties[{index}].minutes must be >= 0")));
    }
    if d.times_week_min.is_some_and(|n| n < 0) || d.times_week_max.is_some_and(|n| n < 0) {
        return Err(PocError::Validation(format!("duties[{index}] weekly frequency must be >= 0")));
    }
    if let (Some(min), Some(max)) = (d.times_week_min, d.times_week_max) {
        if min > max {
            return Err(PocError::Validation(format!(
                "duties[{index}].timesWeekMin must not exceed timesWeekMax"
            )));
        }
    }

    Ok(NewDuty {
        id: Uuid::new_v4().to_string(),
        category: trimmed(&d.category),
        task_no: d.task_no,
        duty: text.to_string(),
        minutes: d.minutes,
        as_needed: d.as_needed,
        times_week_min: d.times_week_min,
        times_week_max: d.times_week_max,
        days_of_week: trimmed(&d.days_of_week),
        instruction: trimmed(&d.instruction),
        sort_order: d.sort_order.unwrap_or(index as i32),
    })
}

pub async fn create_poc(
    store: &dyn PocStore,
    req: &CreatePocRequest,
    offset: FixedOffset,
) -> Result<PocWithDuties, PocError> {
    let individual_id = req.individual_id.trim();
    if individual_id.is_empty() {
        return Err(PocError::MissingFields(vec!["individualId"]));
    }

    let start = parse_date(&req.start_date, "startDate")?;
    let stop = match req.stop_date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(parse_date(raw, "stopDate")?),
        None => None,
    };
    if stop.is_some_and(|s| s < start) {
        return Err(PocError::Validation("stopDate must not be before startDate".into()));
    }

    let duties = req
        .duties
        .iter()
        .enumerate()
        .map(|(i, d)| validate_duty(i, d))
        .collect::<Result<Vec<_>, _>>()?;

    let new_poc = NewPoc {
        id: Uuid::new_v4().to_string(),
        individual_id: individual_id.to_string(),
        poc_number: trimmed(&req.poc_number),
        shift: trimmed(&req.shift),
        note: trimmed(&req.note),
        created_by: trimmed(&req.created_by),
        start_date: start_of_day(start, offset),
        stop_date: stop.map(|s| start_of_day(s, offset)),
        duties,
    };

    let poc = store.create_poc(&new_poc).await?;
    let duties = store.duties_for_poc(&poc.id).await?;
    tracing::info!(poc_id = %poc.id, individual_id = %poc.individual_id, duties = duties.len(), "plan of care created");

    Ok(PocWithDuties { poc, duties })
}

pub async fn get_poc(store: &dyn PocStore, poc_id: &str) -> Result<PocWithDuties, PocError> {
    let poc = store
        .get_poc(poc_id)
        .await?
        .ok_or_else(|| PocError::PocNotFound(poc_id.to_string()))?;
    let duties = store.duties_for_poc(&poc.id).await?;
    Ok(PocWithDuties { poc, duties })
}

pub async fn list_pocs(store: &dyn PocStore, individual_id: &str) -> Result<Vec<Poc>, PocError> {
    let individual_id = individual_id.trim();
    if individual_id.is_empty() {
        return Err(PocError::MissingFields(vec!["individualId"]));
    }
    Ok(store.list_pocs(individual_id).await?)
}

/// Duties go with the POC; daily logs and task logs stay.
pub async fn delete_poc(store: &dyn PocStore, poc_id: &str) -> Result<(), PocError> {
    if !store.delete_poc(poc_id).await? {
        return Err(PocError::PocNotFound(poc_id.to_string()));
    }
    tracing::info!(poc_id, "plan of care deleted");
    Ok(())
}
