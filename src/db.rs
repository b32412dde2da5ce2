use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

use crate::poc::schema::quote_ident;

/// Unqualified table names resolve in `schema`, the same schema the column
/// introspector reads.
pub fn search_path_statement(schema: &str) -> String {
    format!("SET search_path TO {}", quote_ident(schema))
}

pub async fn connect_pg(database_url: &str, max_connections: u32, schema: &str) -> anyhow::Result<PgPool> {
    let set_search_path = search_path_statement(schema);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .after_connect(move |conn, _meta| {
            let stmt = set_search_path.clone();
            Box::pin(async move {
                conn.execute(stmt.as_str()).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await?;

    tracing::info!(max_connections, schema, "connected to postgres");
    Ok(pool)
}
