mod config;
mod middleware;

mod db;
mod error;
mod models;
mod poc;
mod routes;

use std::sync::Arc;

use crate::{config::Config, models::AppState, poc::PgPocStore};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::{HeaderName, header};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let pool = db::connect_pg(&cfg.database_url, cfg.db_max_connections, &cfg.db_schema).await?;

    let state = AppState {
        store: Arc::new(PgPocStore::new(pool, cfg.db_schema.clone())),
        reference_offset: cfg.reference_offset,
    };

    // Office and DSP device clients are served from other origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(middleware::current_user::USER_ID_HEADER),
            HeaderName::from_static(middleware::current_user::USER_NAME_HEADER),
        ]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!(offset = %cfg.reference_offset, "Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
