use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::poc::{PocError, StoreError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_duty_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_fields: Option<Vec<&'static str>>,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(&'static str, String),
    MissingFields(Vec<&'static str>),
    InvalidDutyIds(Vec<String>),
    NotFound(&'static str, String),
    Conflict(&'static str, String),
    /// Logged server-side; the client only sees a generic message.
    Internal(String),
}

impl ApiError {
    fn to_error_response(code: &str, message: &str) -> Json<ErrorResponse> {
        Json(ErrorResponse {
            error: ErrorObject {
                code: code.to_string(),
                message: message.to_string(),
                invalid_duty_ids: None,
                missing_fields: None,
            },
        })
    }
}

impl From<PocError> for ApiError {
    fn from(e: PocError) -> Self {
        let message = e.to_string();
        match e {
            PocError::MissingFields(fields) => ApiError::MissingFields(fields),
            PocError::Validation(_) => ApiError::BadRequest("VALIDATION_ERROR", message),
            PocError::EmptyTaskList => ApiError::BadRequest("EMPTY_TASK_LIST", message),
            PocError::InvalidDutyIds(ids) => ApiError::InvalidDutyIds(ids),
            PocError::InvalidCompletionStatus(_) => {
                ApiError::BadRequest("INVALID_COMPLETION_STATUS", message)
            }
            PocError::NoActivePoc { .. } => ApiError::NotFound("NO_ACTIVE_POC", message),
            PocError::PocNotFound(_) | PocError::DailyLogNotFound(_) => {
                ApiError::NotFound("NOT_FOUND", message)
            }
            PocError::AlreadySubmitted(_) => ApiError::Conflict("LOG_ALREADY_SUBMITTED", message),
            PocError::Store(e) => ApiError::from(e),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(code, msg) => {
                (StatusCode::BAD_REQUEST, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::MissingFields(fields) => {
                let message = format!("missing required fields: {}", fields.join(", "));
                let mut body = ApiError::to_error_response("MISSING_FIELDS", &message);
                body.error.missing_fields = Some(fields);
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::InvalidDutyIds(ids) => {
                let message = format!("{} duty id(s) do not belong to this plan of care", ids.len());
                let mut body = ApiError::to_error_response("INVALID_DUTY_IDS", &message);
                body.error.invalid_duty_ids = Some(ids);
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::NotFound(code, msg) => {
                (StatusCode::NOT_FOUND, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Conflict(code, msg) => {
                (StatusCode::CONFLICT, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Internal(msg) => {
                tracing::error!(cause = %msg, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::to_error_response("INTERNAL", "internal server error"),
                )
                    .into_response()
            }
        }
    }
}
