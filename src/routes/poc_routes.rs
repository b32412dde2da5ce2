// src/routes/poc_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::ApiError,
    middleware::current_user::CurrentUser,
    models::{AppState, OkResponse},
    poc::{
        document::{self, CreatePocRequest, PocWithDuties},
        model::Poc,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/poc", post(create_poc).get(list_pocs))
        .route("/poc/{poc_id}", get(get_poc).delete(delete_poc))
}

/* ============================================================
   POST /poc
   ============================================================ */

pub async fn create_poc(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(mut req): Json<CreatePocRequest>,
) -> Result<Json<PocWithDuties>, ApiError> {
    if req.created_by.is_none() {
        req.created_by = user.display_name.or(user.user_id);
    }
    let created = document::create_poc(state.store.as_ref(), &req, state.reference_offset).await?;
    Ok(Json(created))
}

/* ============================================================
   GET /poc?individualId=
   ============================================================ */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPocsQuery {
    pub individual_id: Option<String>,
}

pub async fn list_pocs(
    State(state): State<AppState>,
    Query(q): Query<ListPocsQuery>,
) -> Result<Json<Vec<Poc>>, ApiError> {
    let individual_id = q.individual_id.unwrap_or_default();
    let pocs = document::list_pocs(state.store.as_ref(), &individual_id).await?;
    Ok(Json(pocs))
}

/* ============================================================
   GET /poc/{id}
   ============================================================ */

pub async fn get_poc(
    State(state): State<AppState>,
    Path(poc_id): Path<String>,
) -> Result<Json<PocWithDuties>, ApiError> {
    let poc = document::get_poc(state.store.as_ref(), &poc_id).await?;
    Ok(Json(poc))
}

/* ============================================================
   DELETE /poc/{id}
   ============================================================ */

pub async fn delete_poc(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(poc_id): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    tracing::info!(poc_id = %poc_id, actor = ?user.user_id, "deleting plan of care");
    document::delete_poc(state.store.as_ref(), &poc_id).await?;
    Ok(Json(OkResponse { ok: true }))
}
