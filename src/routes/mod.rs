use crate::models::AppState;
use axum::Router;

pub mod daily_routes;
pub mod health_routes;
pub mod poc_routes;


pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api", daily_routes::router())
        .nest("/api", poc_routes::router())
        .merge(health_routes::router())
        .with_state(state)
}
