// src/poc/schema.rs
//
// Optional-column discovery. Deployments may lag behind the reference DDL
// (e.g. `poc_daily_log.created_by`), so writes only touch optional columns
// the catalog confirms.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::error::StoreError;

/// Candidate names for the daily log's created-by column, in priority order.
pub const CREATED_BY_CANDIDATES: &[&str] = &["created_by", "createdBy"];

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn fetch_columns(&self, schema: &str, table: &str) -> Result<HashSet<String>, StoreError>;
}

#[async_trait]
impl Catalog for sqlx::PgPool {
    async fn fetch_columns(&self, schema: &str, table: &str) -> Result<HashSet<String>, StoreError> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT column_name::text
            FROM information_schema.columns
            WHERE table_schema = $1
              AND table_name = $2
            "#,
        )
        .bind(schema)
        .bind(table)
        .fetch_all(self)
        .await?;

        Ok(names.into_iter().collect())
    }
}

/// Process-wide cache of discovered column sets, keyed by (schema, table).
/// Entries are never invalidated; a schema change needs a restart.
#[derive(Debug, Default)]
pub struct ColumnCache {
    entries: RwLock<HashMap<(String, String), Arc<HashSet<String>>>>,
}

impl ColumnCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn cached(&self, schema: &str, table: &str) -> Option<Arc<HashSet<String>>> {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        entries.get(&(schema.to_string(), table.to_string())).cloned()
    }

    /// A failed catalog query yields an empty set and is not cached.
    pub async fn columns_of<C>(&self, catalog: &C, schema: &str, table: &str) -> Arc<HashSet<String>>
    where
        C: Catalog + ?Sized,
    {
        if let Some(hit) = self.cached(schema, table) {
            return hit;
        }

        match catalog.fetch_columns(schema, table).await {
            Ok(columns) => {
                let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
                entries
                    .entry((schema.to_string(), table.to_string()))
                    .or_insert_with(|| Arc::new(columns))
                    .clone()
            }
            Err(e) => {
                tracing::warn!(schema, table, error = %e, "column discovery failed; treating optional columns as absent");
                Arc::new(HashSet::new())
            }
        }
    }
}

pub fn pick_existing<'a>(columns: &HashSet<String>, candidates: &[&'a str]) -> Option<&'a str> {
    candidates.iter().copied().find(|c| columns.contains(*c))
}

/* ============================================================
   Insert builder
   ============================================================ */

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Date(NaiveDate),
}

/// An INSERT whose optional columns are kept only when they exist.
#[derive(Debug, Clone)]
pub struct InsertPlan {
    table: String,
    columns: Vec<(String, SqlValue)>,
}

impl InsertPlan {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
        }
    }

    pub fn value(mut self, column: &str, value: SqlValue) -> Self {
        self.columns.push((column.to_string(), value));
        self
    }

    /// Adds `value` under the first of `candidates` present in `existing`;
    /// silently skipped when none is.
    pub fn optional(mut self, candidates: &[&str], value: SqlValue, existing: &HashSet<String>) -> Self {
        if let Some(column) = pick_existing(existing, candidates) {
            self.columns.push((column.to_string(), value));
        }
        self
    }

    #[cfg(test)]
    pub fn value_of(&self, column: &str) -> Option<&SqlValue> {
        self.columns.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.columns.iter().map(|(_, v)| v)
    }

    pub fn sql(&self, returning: &str) -> String {
        let columns: Vec<String> = self.columns.iter().map(|(c, _)| quote_ident(c)).collect();
        let placeholders: Vec<String> = (1..=self.columns.len()).map(|i| format!("${i}")).collect();

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&self.table),
            columns.join(", "),
            placeholders.join(", ")
        );
        if !returning.is_empty() {
            sql.push_str(" RETURNING ");
            sql.push_str(returning);
        }
        sql
    }
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
