// src/poc/worksheet.rs
//
// The day-level flows a DSP device drives: fetch today's worksheet, then save
// it as a draft or submit it.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

use super::daily_log::{find_or_create, load_with_tasks};
use super::error::PocError;
use super::model::{DailyLogKey, DailyLogStatus, DailyLogWithTasks, Duty, Poc};
use super::resolver::resolve;
use super::store::PocStore;
use super::task_log::{SaveAction, TaskEntry, duty_id_set, prepare_entries, write};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Worksheet {
    pub poc: Option<Poc>,
    pub duties: Vec<Duty>,
    pub daily_log: Option<DailyLogWithTasks>,
}

pub async fn worksheet(
    store: &dyn PocStore,
    individual_id: &str,
    date: NaiveDate,
    dsp_id: Option<&str>,
    offset: FixedOffset,
) -> Result<Worksheet, PocError> {
    let Some(poc) = resolve(store, individual_id, date, offset).await? else {
        return Ok(Worksheet {
            poc: None,
            duties: vec![],
            daily_log: None,
        });
    };

    let duties = store.duties_for_poc(&poc.id).await?;

    let log = match dsp_id {
        Some(dsp_id) => {
            store
                .find_daily_log(&DailyLogKey {
                    poc_id: poc.id.clone(),
                    dsp_id: dsp_id.to_string(),
                    date,
                })
                .await?
        }
        None => store.latest_daily_log(&poc.id, date).await?,
    };

    let daily_log = match log {
        Some(log) => Some(load_with_tasks(store, log).await?),
        None => None,
    };

    Ok(Worksheet {
        poc: Some(poc),
        duties,
        daily_log,
    })
}

#[derive(Debug, Clone)]
pub struct SaveDay {
    pub individual_id: Option<String>,
    pub date: Option<String>,
    pub dsp_id: Option<String>,
    pub action: SaveAction,
    pub tasks: Vec<TaskEntry>,
    pub created_by: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDay {
    pub poc_id: String,
    pub daily_log: DailyLogWithTasks,
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Every check runs before the first write.
pub async fn save_day(
    store: &dyn PocStore,
    req: &SaveDay,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> Result<SavedDay, PocError> {
    let individual_id = required(&req.individual_id);
    let raw_date = required(&req.date);
    let dsp_id = required(&req.dsp_id);

    let (Some(individual_id), Some(raw_date), Some(dsp_id)) = (individual_id, raw_date, dsp_id) else {
        let mut missing = Vec::new();
        if individual_id.is_none() {
            missing.push("individualId");
        }
        if raw_date.is_none() {
            missing.push("date");
        }
        if dsp_id.is_none() {
            missing.push("dspId");
        }
        return Err(PocError::MissingFields(missing));
    };

    let date = super::resolver::parse_date(raw_date, "date")?;

    let poc = resolve(store, individual_id, date, offset)
        .await?
        .ok_or_else(|| PocError::NoActivePoc {
            individual_id: individual_id.to_string(),
            date,
        })?;

    let duty_ids = duty_id_set(store, &poc.id).await?;
    let prepared = prepare_entries(&req.tasks, &duty_ids)?;

    let key = DailyLogKey {
        poc_id: poc.id.clone(),
        dsp_id: dsp_id.to_string(),
        date,
    };
    let day = find_or_create(store, key, individual_id, req.created_by.as_deref()).await?;

    if req.action == SaveAction::SaveDraft && day.log.status == DailyLogStatus::Submitted {
        return Err(PocError::AlreadySubmitted(day.id));
    }

    let daily_log = write(store, &day.id, &prepared, req.action, now).await?;

    Ok(SavedDay {
        poc_id: poc.id,
        daily_log,
    })
}
