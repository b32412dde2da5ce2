// src/poc/store.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::error::StoreError;
use super::model::{
    DailyLog, DailyLogFilter, DailyLogKey, DailyLogSummary, Duty, NewDailyLog, NewPoc, NewTaskLog,
    Poc, TaskLog,
};
use super::resolver::DayWindow;

/// Result of a task-row replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Replaced,
    NotFound,
    /// Draft write refused: the locked row was already SUBMITTED.
    AlreadySubmitted,
}

/// Persistence seam for the POC daily logging engine.
///
/// Every method is a single round of storage work; methods that touch more
/// than one row (`create_poc`, `delete_poc`, `replace_task_logs`) are atomic.
#[async_trait]
pub trait PocStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    /* ---------- POC documents ---------- */

    /// POCs of `individual_id` whose interval intersects `window`.
    async fn pocs_covering(&self, individual_id: &str, window: &DayWindow) -> Result<Vec<Poc>, StoreError>;

    async fn get_poc(&self, poc_id: &str) -> Result<Option<Poc>, StoreError>;

    /// Newest `start_date` first.
    async fn list_pocs(&self, individual_id: &str) -> Result<Vec<Poc>, StoreError>;

    async fn create_poc(&self, poc: &NewPoc) -> Result<Poc, StoreError>;

    /// Deletes the POC and its duties. Returns false when it did not exist.
    async fn delete_poc(&self, poc_id: &str) -> Result<bool, StoreError>;

    /// Duties of `poc_id` in presentation order.
    async fn duties_for_poc(&self, poc_id: &str) -> Result<Vec<Duty>, StoreError>;

    /* ---------- daily logs ---------- */

    async fn find_daily_log(&self, key: &DailyLogKey) -> Result<Option<DailyLog>, StoreError>;

    /// Fails with `StoreError::UniqueViolation` when the key is taken.
    async fn insert_daily_log(&self, log: &NewDailyLog) -> Result<DailyLog, StoreError>;

    async fn get_daily_log(&self, daily_log_id: &str) -> Result<Option<DailyLog>, StoreError>;

    /// Most recently updated log for (POC, date) across all DSPs.
    async fn latest_daily_log(&self, poc_id: &str, date: NaiveDate) -> Result<Option<DailyLog>, StoreError>;

    /// Sets SUBMITTED; `submitted_at` keeps an earlier stamp if present.
    async fn mark_submitted(&self, daily_log_id: &str, at: DateTime<Utc>) -> Result<Option<DailyLog>, StoreError>;

    /* ---------- task logs ---------- */

    async fn task_logs(&self, daily_log_id: &str) -> Result<Vec<TaskLog>, StoreError>;

    /// Replaces every task row of the log in one transaction and bumps
    /// `updated_at`. With `submit_at`, the log also moves to SUBMITTED.
    /// Without it, the status is checked under the row lock and a SUBMITTED
    /// log is left untouched. Nothing is written unless `Replaced`.
    async fn replace_task_logs(
        &self,
        daily_log_id: &str,
        rows: &[NewTaskLog],
        submit_at: Option<DateTime<Utc>>,
    ) -> Result<ReplaceOutcome, StoreError>;

    /* ---------- listing ---------- */

    /// Ordered by date desc, `updated_at` desc, id. Returns the page and the
    /// total count of the filter.
    async fn list_daily_logs(
        &self,
        filter: &DailyLogFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<DailyLogSummary>, i64), StoreError>;
}
