use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::models::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";

/// Identity forwarded by the upstream auth gateway. Sessions are not handled
/// here; absent headers simply mean an anonymous caller.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let user = CurrentUser {
            user_id: header_value(parts, USER_ID_HEADER),
            display_name: header_value(parts, USER_NAME_HEADER),
        };
        async move { Ok(user) }
    }
}
