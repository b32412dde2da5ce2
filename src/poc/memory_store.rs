// src/poc/memory_store.rs
//
// In-process `PocStore` for tests. One mutex guards every table, so each
// method is atomic; the (poc, dsp, date) key is unique like the real index.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use super::error::StoreError;
use super::model::{
    DailyLog, DailyLogFilter, DailyLogKey, DailyLogStatus, DailyLogSummary, Duty, NewDailyLog,
    NewPoc, NewTaskLog, Poc, TaskLog,
};
use super::resolver::{DayWindow, covers};
use super::schema::{CREATED_BY_CANDIDATES, Catalog, ColumnCache, InsertPlan, SqlValue};
use super::store::{PocStore, ReplaceOutcome};

const DAILY_LOG_TABLE: &str = "poc_daily_log";

#[derive(Default)]
struct Tables {
    pocs: Vec<Poc>,
    duties: Vec<Duty>,
    daily_logs: Vec<DailyLog>,
    created_by: HashMap<String, String>,
    task_logs: Vec<TaskLog>,
}

struct MemoryCatalog {
    daily_log_columns: HashSet<String>,
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn fetch_columns(&self, _schema: &str, table: &str) -> Result<HashSet<String>, StoreError> {
        if table == DAILY_LOG_TABLE {
            Ok(self.daily_log_columns.clone())
        } else {
            Ok(HashSet::new())
        }
    }
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
    catalog: MemoryCatalog,
    columns: ColumnCache,
    miss_next_lookup: AtomicBool,
    phantom_next_insert: AtomicBool,
    fail_next_replace: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_daily_log_columns(&[
            "id",
            "poc_id",
            "individual_id",
            "dsp_id",
            "log_date",
            "status",
            "submitted_at",
            "created_by",
            "created_at",
            "updated_at",
        ])
    }

    pub fn with_daily_log_columns(columns: &[&str]) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            catalog: MemoryCatalog {
                daily_log_columns: columns.iter().map(|c| c.to_string()).collect(),
            },
            columns: ColumnCache::new(),
            miss_next_lookup: AtomicBool::new(false),
            phantom_next_insert: AtomicBool::new(false),
            fail_next_replace: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn seed_poc(&self, poc: Poc, duties: Vec<Duty>) {
        let mut t = self.lock();
        t.pocs.push(poc);
        t.duties.extend(duties);
    }

    /// `count` extra logs on distinct DSP keys, dated 2024.
    pub fn seed_bulk_logs(&self, poc_id: &str, individual_id: &str, count: usize) {
        let mut t = self.lock();
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for i in 0..count {
            let now = Utc::now();
            t.daily_logs.push(DailyLog {
                id: format!("bulk-{i}"),
                poc_id: poc_id.to_string(),
                individual_id: individual_id.to_string(),
                dsp_id: format!("BULK-{i}"),
                date: base + Duration::days((i % 300) as i64),
                status: DailyLogStatus::Draft,
                submitted_at: None,
                created_at: now,
                updated_at: now,
            });
        }
    }

    /// The next `find_daily_log` misses, like a read racing an uncommitted insert.
    pub fn miss_next_lookup(&self) {
        self.miss_next_lookup.store(true, Ordering::SeqCst);
    }

    /// The next `insert_daily_log` reports a unique violation without any row
    /// holding the key, like a conflicting row deleted before the re-read.
    pub fn phantom_next_insert(&self) {
        self.phantom_next_insert.store(true, Ordering::SeqCst);
    }

    /// The next `replace_task_logs` fails before anything is applied.
    pub fn fail_next_replace(&self) {
        self.fail_next_replace.store(true, Ordering::SeqCst);
    }

    pub fn daily_log_count(&self) -> usize {
        self.lock().daily_logs.len()
    }

    pub fn created_by_of(&self, daily_log_id: &str) -> Option<String> {
        self.lock().created_by.get(daily_log_id).cloned()
    }
}

fn key_of(log: &DailyLog) -> DailyLogKey {
    DailyLogKey {
        poc_id: log.poc_id.clone(),
        dsp_id: log.dsp_id.clone(),
        date: log.date,
    }
}

/// Presentation order: `sort_order`, then `task_no`.
fn sort_duties(duties: &mut [Duty]) {
    duties.sort_by(|a, b| {
        a.sort_order
            .cmp(&b.sort_order)
            .then(a.task_no.cmp(&b.task_no))
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn matches(f: &DailyLogFilter, log: &DailyLog) -> bool {
    f.poc_id.as_ref().is_none_or(|v| *v == log.poc_id)
        && f.individual_id.as_ref().is_none_or(|v| *v == log.individual_id)
        && f.dsp_id.as_ref().is_none_or(|v| *v == log.dsp_id)
        && f.date_from.is_none_or(|d| log.date >= d)
        && f.date_to.is_none_or(|d| log.date <= d)
        && (f.statuses.is_empty() || f.statuses.contains(&log.status))
}

fn ordered_logs(logs: &mut [DailyLog]) {
    logs.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then(b.updated_at.cmp(&a.updated_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Strictly later than `prev`, so `updated_at` ordering is stable in tests.
fn bump(prev: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > prev { now } else { prev + Duration::microseconds(1) }
}

#[async_trait]
impl PocStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn pocs_covering(&self, individual_id: &str, window: &DayWindow) -> Result<Vec<Poc>, StoreError> {
        Ok(self
            .lock()
            .pocs
            .iter()
            .filter(|p| p.individual_id == individual_id && covers(p, window))
            .cloned()
            .collect())
    }

    async fn get_poc(&self, poc_id: &str) -> Result<Option<Poc>, StoreError> {
        Ok(self.lock().pocs.iter().find(|p| p.id == poc_id).cloned())
    }

    async fn list_pocs(&self, individual_id: &str) -> Result<Vec<Poc>, StoreError> {
        let mut pocs: Vec<Poc> = self
            .lock()
            .pocs
            .iter()
            .filter(|p| p.individual_id == individual_id)
            .cloned()
            .collect();
        pocs.sort_by(|a, b| b.start_date.cmp(&a.start_date).then_with(|| a.id.cmp(&b.id)));
        Ok(pocs)
    }

    async fn create_poc(&self, poc: &NewPoc) -> Result<Poc, StoreError> {
        let now = Utc::now();
        let row = Poc {
            id: poc.id.clone(),
            individual_id: poc.individual_id.clone(),
            poc_number: poc.poc_number.clone(),
            shift: poc.shift.clone(),
            note: poc.note.clone(),
            created_by: poc.created_by.clone(),
            start_date: poc.start_date,
            stop_date: poc.stop_date,
            created_at: now,
            updated_at: now,
        };

        let mut t = self.lock();
        if t.pocs.iter().any(|p| p.id == row.id) {
            return Err(StoreError::UniqueViolation);
        }
        t.pocs.push(row.clone());
        t.duties.extend(poc.duties.iter().map(|d| Duty {
            id: d.id.clone(),
            poc_id: row.id.clone(),
            category: d.category.clone(),
            task_no: d.task_no,
            duty: d.duty.clone(),
            minutes: d.minutes,
            as_needed: d.as_needed,
            times_week_min: d.times_week_min,
            times_week_max: d.times_week_max,
            days_of_week: d.days_of_week.clone(),
            instruction: d.instruction.clone(),
            sort_order: d.sort_order,
        }));
        Ok(row)
    }

    async fn delete_poc(&self, poc_id: &str) -> Result<bool, StoreError> {
        let mut t = self.lock();
        let before = t.pocs.len();
        t.pocs.retain(|p| p.id != poc_id);
        if t.pocs.len() == before {
            return Ok(false);
        }
        t.duties.retain(|d| d.poc_id != poc_id);
        Ok(true)
    }

    async fn duties_for_poc(&self, poc_id: &str) -> Result<Vec<Duty>, StoreError> {
        let mut duties: Vec<Duty> = self
            .lock()
            .duties
            .iter()
            .filter(|d| d.poc_id == poc_id)
            .cloned()
            .collect();
        sort_duties(&mut duties);
        Ok(duties)
    }

    async fn find_daily_log(&self, key: &DailyLogKey) -> Result<Option<DailyLog>, StoreError> {
        if self.miss_next_lookup.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self.lock().daily_logs.iter().find(|l| key_of(l) == *key).cloned())
    }

    async fn insert_daily_log(&self, log: &NewDailyLog) -> Result<DailyLog, StoreError> {
        if self.phantom_next_insert.swap(false, Ordering::SeqCst) {
            return Err(StoreError::UniqueViolation);
        }
        let existing = self.columns.columns_of(&self.catalog, "public", DAILY_LOG_TABLE).await;
        let plan = InsertPlan::new(DAILY_LOG_TABLE)
            .value("id", SqlValue::Text(log.id.clone()))
            .optional(CREATED_BY_CANDIDATES, SqlValue::Text(log.created_by.clone()), &existing);

        let now = Utc::now();
        let row = DailyLog {
            id: log.id.clone(),
            poc_id: log.key.poc_id.clone(),
            individual_id: log.individual_id.clone(),
            dsp_id: log.key.dsp_id.clone(),
            date: log.key.date,
            status: DailyLogStatus::Draft,
            submitted_at: None,
            created_at: now,
            updated_at: now,
        };

        let mut t = self.lock();
        if t.daily_logs.iter().any(|l| key_of(l) == log.key || l.id == log.id) {
            return Err(StoreError::UniqueViolation);
        }
        for column in CREATED_BY_CANDIDATES {
            if let Some(SqlValue::Text(by)) = plan.value_of(column) {
                t.created_by.insert(row.id.clone(), by.clone());
            }
        }
        t.daily_logs.push(row.clone());
        Ok(row)
    }

    async fn get_daily_log(&self, daily_log_id: &str) -> Result<Option<DailyLog>, StoreError> {
        Ok(self.lock().daily_logs.iter().find(|l| l.id == daily_log_id).cloned())
    }

    async fn latest_daily_log(&self, poc_id: &str, date: NaiveDate) -> Result<Option<DailyLog>, StoreError> {
        let mut logs: Vec<DailyLog> = self
            .lock()
            .daily_logs
            .iter()
            .filter(|l| l.poc_id == poc_id && l.date == date)
            .cloned()
            .collect();
        ordered_logs(&mut logs);
        Ok(logs.into_iter().next())
    }

    async fn mark_submitted(&self, daily_log_id: &str, at: DateTime<Utc>) -> Result<Option<DailyLog>, StoreError> {
        let mut t = self.lock();
        let Some(log) = t.daily_logs.iter_mut().find(|l| l.id == daily_log_id) else {
            return Ok(None);
        };
        log.status = DailyLogStatus::Submitted;
        log.submitted_at = log.submitted_at.or(Some(at));
        log.updated_at = bump(log.updated_at);
        Ok(Some(log.clone()))
    }

    async fn task_logs(&self, daily_log_id: &str) -> Result<Vec<TaskLog>, StoreError> {
        Ok(self
            .lock()
            .task_logs
            .iter()
            .filter(|t| t.daily_log_id == daily_log_id)
            .cloned()
            .collect())
    }

    async fn replace_task_logs(
        &self,
        daily_log_id: &str,
        rows: &[NewTaskLog],
        submit_at: Option<DateTime<Utc>>,
    ) -> Result<ReplaceOutcome, StoreError> {
        if self.fail_next_replace.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut t = self.lock();
        let Some(log) = t.daily_logs.iter_mut().find(|l| l.id == daily_log_id) else {
            return Ok(ReplaceOutcome::NotFound);
        };
        if submit_at.is_none() && log.status == DailyLogStatus::Submitted {
            return Ok(ReplaceOutcome::AlreadySubmitted);
        }
        if let Some(at) = submit_at {
            log.status = DailyLogStatus::Submitted;
            log.submitted_at = log.submitted_at.or(Some(at));
        }
        log.updated_at = bump(log.updated_at);

        let now = Utc::now();
        t.task_logs.retain(|r| r.daily_log_id != daily_log_id);
        t.task_logs.extend(rows.iter().map(|r| TaskLog {
            id: r.id.clone(),
            daily_log_id: daily_log_id.to_string(),
            duty_id: r.duty_id.clone(),
            completion_status: r.completion_status,
            note: r.note.clone(),
            completed_at: r.completed_at,
            created_at: now,
        }));
        Ok(ReplaceOutcome::Replaced)
    }

    async fn list_daily_logs(
        &self,
        filter: &DailyLogFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<DailyLogSummary>, i64), StoreError> {
        let t = self.lock();
        let mut logs: Vec<DailyLog> = t.daily_logs.iter().filter(|l| matches(filter, l)).cloned().collect();
        ordered_logs(&mut logs);
        let total = logs.len() as i64;

        let items = logs
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|log| {
                let task_count = t.task_logs.iter().filter(|r| r.daily_log_id == log.id).count() as i64;
                DailyLogSummary { log, task_count }
            })
            .collect();

        Ok((items, total))
    }
}

/* ============================================================
   Fixtures
   ============================================================ */

pub fn poc_fixture(id: &str, individual_id: &str, start: DateTime<Utc>, stop: Option<DateTime<Utc>>) -> Poc {
    let created = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap();
    Poc {
        id: id.to_string(),
        individual_id: individual_id.to_string(),
        poc_number: Some(format!("POC-{id}")),
        shift: None,
        note: None,
        created_by: Some("office".into()),
        start_date: start,
        stop_date: stop,
        created_at: created,
        updated_at: created,
    }
}

pub fn duty_fixture(id: &str, poc_id: &str, task_no: i32) -> Duty {
    Duty {
        id: id.to_string(),
        poc_id: poc_id.to_string(),
        category: Some("Personal care".into()),
        task_no,
        duty: format!("Duty {id}"),
        minutes: Some(15),
        as_needed: false,
        times_week_min: None,
        times_week_max: None,
        days_of_week: None,
        instruction: None,
        sort_order: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duties_sort_by_sort_order_then_task_no() {
        let duty = |id: &str, sort_order: i32, task_no: i32| Duty {
            id: id.into(),
            poc_id: "P1".into(),
            category: None,
            task_no,
            duty: id.into(),
            minutes: None,
            as_needed: false,
            times_week_min: None,
            times_week_max: None,
            days_of_week: None,
            instruction: None,
            sort_order,
        };

        let mut duties = vec![duty("c", 1, 1), duty("b", 0, 2), duty("a", 0, 1)];
        sort_duties(&mut duties);
        let ids: Vec<_> = duties.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
