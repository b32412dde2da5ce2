// src/routes/daily_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    error::ApiError,
    middleware::current_user::CurrentUser,
    models::AppState,
    poc::{
        PocError,
        daily_log::{self, FindOrCreate},
        listing::{self, PageRequest, Paged},
        model::{DailyLogFilter, DailyLogKey, DailyLogStatus, DailyLogSummary, DailyLogWithTasks},
        resolver::parse_date,
        task_log::{self, SaveAction, TaskEntry},
        worksheet::{self, SaveDay, SavedDay, Worksheet},
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/poc/daily", get(get_worksheet).post(save_day))
        .route("/poc/daily-logs", get(list_daily_logs).post(create_or_get_daily_log))
        .route("/poc/daily-logs/{daily_log_id}", get(get_daily_log))
        .route("/poc/daily-logs/{daily_log_id}/tasks", put(replace_task_logs))
        .route("/poc/daily-logs/{daily_log_id}/submit", post(submit_daily_log))
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/* ============================================================
   GET /poc/daily?individualId=&date=[&dspId=]
   ============================================================ */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorksheetQuery {
    pub individual_id: Option<String>,
    pub date: Option<String>,
    pub dsp_id: Option<String>,
}

pub async fn get_worksheet(
    State(state): State<AppState>,
    Query(q): Query<WorksheetQuery>,
) -> Result<Json<Worksheet>, ApiError> {
    let individual_id = non_blank(q.individual_id);
    let date = non_blank(q.date);

    let (Some(individual_id), Some(date)) = (individual_id.as_deref(), date.as_deref()) else {
        let mut missing = Vec::new();
        if individual_id.is_none() {
            missing.push("individualId");
        }
        if date.is_none() {
            missing.push("date");
        }
        return Err(ApiError::MissingFields(missing));
    };

    let date = parse_date(date, "date")?;
    let dsp_id = non_blank(q.dsp_id);

    let sheet = worksheet::worksheet(
        state.store.as_ref(),
        individual_id,
        date,
        dsp_id.as_deref(),
        state.reference_offset,
    )
    .await?;

    Ok(Json(sheet))
}

/* ============================================================
   POST /poc/daily
   ============================================================ */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDayRequest {
    pub individual_id: Option<String>,
    pub date: Option<String>,
    pub dsp_id: Option<String>,
    pub action: Option<SaveAction>, // default SAVE_DRAFT
    #[serde(default)]
    pub tasks: Vec<TaskEntry>,
}

pub async fn save_day(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<SaveDayRequest>,
) -> Result<Json<SavedDay>, ApiError> {
    let action = req.action.unwrap_or(SaveAction::SaveDraft);

    let saved = worksheet::save_day(
        state.store.as_ref(),
        &SaveDay {
            individual_id: req.individual_id,
            date: req.date,
            dsp_id: req.dsp_id,
            action,
            tasks: req.tasks,
            created_by: user.display_name.or(user.user_id),
        },
        state.reference_offset,
        Utc::now(),
    )
    .await?;

    Ok(Json(saved))
}

/* ============================================================
   GET /poc/daily-logs
   ============================================================ */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLogsQuery {
    pub poc_id: Option<String>,
    pub individual_id: Option<String>,
    pub dsp_id: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    /// comma separated, e.g. `DRAFT,SUBMITTED`
    pub status: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

fn parse_statuses(raw: Option<&str>) -> Result<Vec<DailyLogStatus>, ApiError> {
    let Some(raw) = raw else {
        return Ok(vec![]);
    };

    let mut out = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let status: DailyLogStatus = part
            .parse()
            .map_err(|msg| ApiError::BadRequest("VALIDATION_ERROR", msg))?;
        if !out.contains(&status) {
            out.push(status);
        }
    }
    Ok(out)
}

pub async fn list_daily_logs(
    State(state): State<AppState>,
    Query(q): Query<ListLogsQuery>,
) -> Result<Json<Paged<DailyLogSummary>>, ApiError> {
    let date_from = match non_blank(q.date_from) {
        Some(raw) => Some(parse_date(&raw, "dateFrom")?),
        None => None,
    };
    let date_to = match non_blank(q.date_to) {
        Some(raw) => Some(parse_date(&raw, "dateTo")?),
        None => None,
    };

    let filter = DailyLogFilter {
        poc_id: non_blank(q.poc_id),
        individual_id: non_blank(q.individual_id),
        dsp_id: non_blank(q.dsp_id),
        date_from,
        date_to,
        statuses: parse_statuses(q.status.as_deref())?,
    };

    let page = listing::list(
        state.store.as_ref(),
        &filter,
        PageRequest::new(q.page, q.page_size),
    )
    .await?;

    Ok(Json(page))
}

/* ============================================================
   POST /poc/daily-logs  (create or get)
   ============================================================ */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrGetRequest {
    pub poc_id: Option<String>,
    pub individual_id: Option<String>,
    pub date: Option<String>,
    pub dsp_id: Option<String>,
    pub created_by: Option<String>,
}

pub async fn create_or_get_daily_log(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateOrGetRequest>,
) -> Result<Json<FindOrCreate>, ApiError> {
    let poc_id = non_blank(req.poc_id);
    let individual_id = non_blank(req.individual_id);
    let date = non_blank(req.date);
    let dsp_id = non_blank(req.dsp_id).or(user.user_id);

    let (Some(poc_id), Some(individual_id), Some(date), Some(dsp_id)) =
        (poc_id.as_deref(), individual_id.as_deref(), date.as_deref(), dsp_id.as_deref())
    else {
        let mut missing = Vec::new();
        if poc_id.is_none() {
            missing.push("pocId");
        }
        if individual_id.is_none() {
            missing.push("individualId");
        }
        if date.is_none() {
            missing.push("date");
        }
        if dsp_id.is_none() {
            missing.push("dspId");
        }
        return Err(ApiError::MissingFields(missing));
    };

    let date = parse_date(date, "date")?;

    let poc = state
        .store
        .get_poc(poc_id)
        .await?
        .ok_or_else(|| PocError::PocNotFound(poc_id.to_string()))?;
    if poc.individual_id != individual_id {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("plan of care {poc_id} does not belong to individual {individual_id}"),
        ));
    }

    let key = DailyLogKey {
        poc_id: poc.id,
        dsp_id: dsp_id.to_string(),
        date,
    };
    let result = daily_log::find_or_create(
        state.store.as_ref(),
        key,
        individual_id,
        req.created_by.as_deref(),
    )
    .await?;

    Ok(Json(result))
}

/* ============================================================
   GET /poc/daily-logs/{id}
   ============================================================ */

pub async fn get_daily_log(
    State(state): State<AppState>,
    Path(daily_log_id): Path<String>,
) -> Result<Json<DailyLogWithTasks>, ApiError> {
    let log = daily_log::get_with_tasks(state.store.as_ref(), &daily_log_id).await?;
    Ok(Json(log))
}

/* ============================================================
   POST /poc/daily-logs/{id}/submit
   ============================================================ */

pub async fn submit_daily_log(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(daily_log_id): Path<String>,
) -> Result<Json<DailyLogWithTasks>, ApiError> {
    tracing::info!(daily_log_id = %daily_log_id, actor = ?user.user_id, "submit requested");
    let log = daily_log::set_status(
        state.store.as_ref(),
        &daily_log_id,
        DailyLogStatus::Submitted,
        Utc::now(),
    )
    .await?;
    let log = daily_log::load_with_tasks(state.store.as_ref(), log).await?;
    Ok(Json(log))
}

/* ============================================================
   PUT /poc/daily-logs/{id}/tasks  (replace all)
   ============================================================ */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceTasksRequest {
    pub poc_id: Option<String>,
    pub action: Option<SaveAction>,
    #[serde(default)]
    pub tasks: Vec<TaskEntry>,
}

pub async fn replace_task_logs(
    State(state): State<AppState>,
    Path(daily_log_id): Path<String>,
    Json(req): Json<ReplaceTasksRequest>,
) -> Result<Json<DailyLogWithTasks>, ApiError> {
    let Some(poc_id) = non_blank(req.poc_id) else {
        return Err(ApiError::MissingFields(vec!["pocId"]));
    };

    let log = task_log::replace(
        state.store.as_ref(),
        &daily_log_id,
        &poc_id,
        &req.tasks,
        req.action.unwrap_or(SaveAction::SaveDraft),
        Utc::now(),
    )
    .await?;

    Ok(Json(log))
}
