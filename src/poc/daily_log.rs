// src/poc/daily_log.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::error::{PocError, StoreError};
use super::model::{DailyLog, DailyLogKey, DailyLogStatus, DailyLogWithTasks, NewDailyLog};
use super::store::PocStore;

pub const DEFAULT_CREATED_BY: &str = "office";

#[derive(Debug, Clone, Serialize)]
pub struct FindOrCreate {
    pub id: String,
    pub created: bool,
    #[serde(skip)]
    pub log: DailyLog,
}

/// Lookup, insert, and on a lost insert race re-read the winner.
pub async fn find_or_create(
    store: &dyn PocStore,
    key: DailyLogKey,
    individual_id: &str,
    created_by: Option<&str>,
) -> Result<FindOrCreate, PocError> {
    if let Some(log) = store.find_daily_log(&key).await? {
        return Ok(FindOrCreate {
            id: log.id.clone(),
            created: false,
            log,
        });
    }

    let created_by = created_by
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_CREATED_BY);

    let new_log = NewDailyLog {
        id: Uuid::new_v4().to_string(),
        key: key.clone(),
        individual_id: individual_id.to_string(),
        created_by: created_by.to_string(),
    };

    match store.insert_daily_log(&new_log).await {
        Ok(log) => {
            tracing::info!(
                daily_log_id = %log.id,
                poc_id = %key.poc_id,
                dsp_id = %key.dsp_id,
                date = %key.date,
                "daily log created"
            );
            Ok(FindOrCreate {
                id: log.id.clone(),
                created: true,
                log,
            })
        }
        Err(StoreError::UniqueViolation) => {
            tracing::debug!(poc_id = %key.poc_id, dsp_id = %key.dsp_id, date = %key.date, "daily log insert lost race; re-reading");
            // the conflicting row was removed before the re-read
            let log = store
                .find_daily_log(&key)
                .await?
                .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
            Ok(FindOrCreate {
                id: log.id.clone(),
                created: false,
                log,
            })
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Submit,
}

/// DRAFT -> SUBMITTED is the only move; repeating the current status is a no-op.
pub fn plan_transition(log: &DailyLog, target: DailyLogStatus) -> Result<Transition, PocError> {
    match (log.status, target) {
        (DailyLogStatus::Draft, DailyLogStatus::Submitted) => Ok(Transition::Submit),
        (DailyLogStatus::Submitted, DailyLogStatus::Draft) => Err(PocError::AlreadySubmitted(log.id.clone())),
        _ => Ok(Transition::Unchanged),
    }
}

pub async fn set_status(
    store: &dyn PocStore,
    daily_log_id: &str,
    target: DailyLogStatus,
    now: DateTime<Utc>,
) -> Result<DailyLog, PocError> {
    let log = store
        .get_daily_log(daily_log_id)
        .await?
        .ok_or_else(|| PocError::DailyLogNotFound(daily_log_id.to_string()))?;

    match plan_transition(&log, target)? {
        Transition::Unchanged => Ok(log),
        Transition::Submit => {
            let log = store
                .mark_submitted(daily_log_id, now)
                .await?
                .ok_or_else(|| PocError::DailyLogNotFound(daily_log_id.to_string()))?;
            tracing::info!(daily_log_id, "daily log submitted");
            Ok(log)
        }
    }
}

pub async fn load_with_tasks(store: &dyn PocStore, log: DailyLog) -> Result<DailyLogWithTasks, PocError> {
    let tasks = store.task_logs(&log.id).await?;
    Ok(DailyLogWithTasks { log, tasks })
}

pub async fn get_with_tasks(store: &dyn PocStore, daily_log_id: &str) -> Result<DailyLogWithTasks, PocError> {
    let log = store
        .get_daily_log(daily_log_id)
        .await?
        .ok_or_else(|| PocError::DailyLogNotFound(daily_log_id.to_string()))?;
    load_with_tasks(store, log).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{Duration, NaiveDate, TimeZone};

    use crate::poc::memory_store::MemoryStore;
    use crate::poc::schema::CREATED_BY_CANDIDATES;

    fn key() -> DailyLogKey {
        DailyLogKey {
            poc_id: "P1".into(),
            dsp_id: "DSP-9".into(),
            date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
        }
    }

    #[tokio::test]
    async fn find_or_create_is_idempotent() {
        let store = MemoryStore::new();

        let first = find_or_create(&store, key(), "IND-1", None).await.unwrap();
        let second = find_or_create(&store, key(), "IND-1", None).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert_eq!(first.log.status, DailyLogStatus::Draft);
        assert_eq!(store.daily_log_count(), 1);
    }

    #[tokio::test]
    async fn lost_insert_race_returns_existing_row() {
        let store = MemoryStore::new();
        let winner = find_or_create(&store, key(), "IND-1", None).await.unwrap();

        // the next lookup misses, as if the winner had not committed yet
        store.miss_next_lookup();
        let loser = find_or_create(&store, key(), "IND-1", None).await.unwrap();

        assert!(!loser.created);
        assert_eq!(loser.id, winner.id);
        assert_eq!(store.daily_log_count(), 1);
    }

    #[tokio::test]
    async fn conflict_without_surviving_row_is_a_storage_error() {
        let store = MemoryStore::new();
        store.phantom_next_insert();

        let err = find_or_create(&store, key(), "IND-1", None).await.unwrap_err();
        assert!(matches!(
            err,
            PocError::Store(StoreError::Database(sqlx::Error::RowNotFound))
        ));
        assert_eq!(store.daily_log_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creation_yields_one_row() {
        let store = Arc::new(MemoryStore::new());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                find_or_create(store.as_ref(), key(), "IND-1", None).await.unwrap()
            }));
        }

        let mut ids = Vec::new();
        let mut created = 0;
        for h in handles {
            let r = h.await.unwrap();
            if r.created {
                created += 1;
            }
            ids.push(r.id);
        }

        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(created, 1);
        assert_eq!(store.daily_log_count(), 1);
    }

    #[tokio::test]
    async fn created_by_defaults_to_office_when_column_exists() {
        let store = MemoryStore::new();
        let r = find_or_create(&store, key(), "IND-1", Some("  ")).await.unwrap();
        assert_eq!(store.created_by_of(&r.id).as_deref(), Some(DEFAULT_CREATED_BY));

        let other = DailyLogKey { dsp_id: "DSP-2".into(), ..key() };
        let r = find_or_create(&store, other, "IND-1", Some("nurse.kim")).await.unwrap();
        assert_eq!(store.created_by_of(&r.id).as_deref(), Some("nurse.kim"));
    }

    #[tokio::test]
    async fn created_by_is_skipped_when_column_is_absent() {
        let store = MemoryStore::with_daily_log_columns(&["id", "poc_id", "dsp_id", "log_date"]);
        let r = find_or_create(&store, key(), "IND-1", Some("nurse.kim")).await.unwrap();
        assert!(r.created);
        assert_eq!(store.created_by_of(&r.id), None);

        let camel = MemoryStore::with_daily_log_columns(&["id", CREATED_BY_CANDIDATES[1]]);
        let r = find_or_create(&camel, key(), "IND-1", Some("nurse.kim")).await.unwrap();
        assert_eq!(camel.created_by_of(&r.id).as_deref(), Some("nurse.kim"));
    }

    #[tokio::test]
    async fn resubmitting_keeps_first_submitted_at() {
        let store = MemoryStore::new();
        let log = find_or_create(&store, key(), "IND-1", None).await.unwrap();

        let t1 = Utc.with_ymd_and_hms(2025, 3, 15, 18, 0, 0).unwrap();
        let t2 = t1 + Duration::hours(2);

        let first = set_status(&store, &log.id, DailyLogStatus::Submitted, t1).await.unwrap();
        let second = set_status(&store, &log.id, DailyLogStatus::Submitted, t2).await.unwrap();

        assert_eq!(first.status, DailyLogStatus::Submitted);
        assert_eq!(first.submitted_at, Some(t1));
        assert_eq!(second.status, DailyLogStatus::Submitted);
        assert_eq!(second.submitted_at, Some(t1));
    }

    #[tokio::test]
    async fn submitted_log_cannot_return_to_draft() {
        let store = MemoryStore::new();
        let log = find_or_create(&store, key(), "IND-1", None).await.unwrap();
        set_status(&store, &log.id, DailyLogStatus::Submitted, Utc::now()).await.unwrap();

        let err = set_status(&store, &log.id, DailyLogStatus::Draft, Utc::now()).await.unwrap_err();
        assert!(matches!(err, PocError::AlreadySubmitted(_)));
    }

    #[tokio::test]
    async fn unknown_log_is_not_found() {
        let store = MemoryStore::new();
        let err = set_status(&store, "missing", DailyLogStatus::Submitted, Utc::now()).await.unwrap_err();
        assert!(matches!(err, PocError::DailyLogNotFound(_)));
    }
}
