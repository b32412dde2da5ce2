// src/poc/pg_store.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use super::error::StoreError;
use super::model::{
    DailyLog, DailyLogFilter, DailyLogKey, DailyLogStatus, DailyLogSummary, Duty, NewDailyLog,
    NewPoc, NewTaskLog, Poc, TaskLog,
};
use super::resolver::DayWindow;
use super::schema::{CREATED_BY_CANDIDATES, ColumnCache, InsertPlan, SqlValue};
use super::store::{PocStore, ReplaceOutcome};

const DAILY_LOG_TABLE: &str = "poc_daily_log";

const POC_COLUMNS: &str = r#"
  id, individual_id, poc_number, shift, note, created_by,
  start_date, stop_date, created_at, updated_at
"#;

const DUTY_COLUMNS: &str = r#"
  id, poc_id, category, task_no, duty, minutes, as_needed,
  times_week_min, times_week_max, days_of_week, instruction, sort_order
"#;

const DAILY_LOG_COLUMNS: &str = r#"
  id, poc_id, individual_id, dsp_id, log_date, status,
  submitted_at, created_at, updated_at
"#;

/* ============================================================
   DB rows
   ============================================================ */

#[derive(Debug, FromRow)]
struct DailyLogRow {
    id: String,
    poc_id: String,
    individual_id: String,
    dsp_id: String,
    log_date: NaiveDate,
    status: String,
    submitted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DailyLogRow> for DailyLog {
    type Error = StoreError;

    fn try_from(r: DailyLogRow) -> Result<Self, Self::Error> {
        let status: DailyLogStatus = r.status.parse().map_err(StoreError::Decode)?;
        Ok(DailyLog {
            id: r.id,
            poc_id: r.poc_id,
            individual_id: r.individual_id,
            dsp_id: r.dsp_id,
            date: r.log_date,
            status,
            submitted_at: r.submitted_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct DailyLogSummaryRow {
    #[sqlx(flatten)]
    log: DailyLogRow,
    task_count: i64,
}

#[derive(Debug, FromRow)]
struct TaskLogRow {
    id: String,
    daily_log_id: String,
    duty_id: String,
    completion_status: String,
    note: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TaskLogRow> for TaskLog {
    type Error = StoreError;

    fn try_from(r: TaskLogRow) -> Result<Self, Self::Error> {
        let completion_status = r
            .completion_status
            .parse()
            .map_err(|v| StoreError::Decode(format!("unknown completion status {v:?}")))?;
        Ok(TaskLog {
            id: r.id,
            daily_log_id: r.daily_log_id,
            duty_id: r.duty_id,
            completion_status,
            note: r.note,
            completed_at: r.completed_at,
            created_at: r.created_at,
        })
    }
}

fn bind_value<'q, O>(
    q: QueryAs<'q, Postgres, O, PgArguments>,
    v: &SqlValue,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    match v {
        SqlValue::Text(s) => q.bind(s.clone()),
        SqlValue::Date(d) => q.bind(*d),
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, f: &DailyLogFilter) {
    qb.push(" WHERE 1=1 ");

    if let Some(v) = &f.poc_id {
        qb.push(" AND l.poc_id = ");
        qb.push_bind(v.clone());
    }
    if let Some(v) = &f.individual_id {
        qb.push(" AND l.individual_id = ");
        qb.push_bind(v.clone());
    }
    if let Some(v) = &f.dsp_id {
        qb.push(" AND l.dsp_id = ");
        qb.push_bind(v.clone());
    }
    if let Some(from) = f.date_from {
        qb.push(" AND l.log_date >= ");
        qb.push_bind(from);
    }
    if let Some(to) = f.date_to {
        qb.push(" AND l.log_date <= ");
        qb.push_bind(to);
    }
    if !f.statuses.is_empty() {
        let statuses: Vec<String> = f.statuses.iter().map(|s| s.as_str().to_string()).collect();
        qb.push(" AND l.status = ANY(");
        qb.push_bind(statuses);
        qb.push(") ");
    }
}

/* ============================================================
   Store
   ============================================================ */

pub struct PgPocStore {
    pool: PgPool,
    schema: String,
    columns: ColumnCache,
}

impl PgPocStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
            columns: ColumnCache::new(),
        }
    }
}

#[async_trait]
impl PocStore for PgPocStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn pocs_covering(&self, individual_id: &str, window: &DayWindow) -> Result<Vec<Poc>, StoreError> {
        let rows = sqlx::query_as::<_, Poc>(&format!(
            r#"
            SELECT {POC_COLUMNS}
            FROM poc
            WHERE individual_id = $1
              AND start_date <= $2
              AND (stop_date IS NULL OR stop_date >= $3)
            ORDER BY start_date DESC, created_at DESC, id DESC
            "#
        ))
        .bind(individual_id)
        .bind(window.end)
        .bind(window.start)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn get_poc(&self, poc_id: &str) -> Result<Option<Poc>, StoreError> {
        let row = sqlx::query_as::<_, Poc>(&format!("SELECT {POC_COLUMNS} FROM poc WHERE id = $1"))
            .bind(poc_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_pocs(&self, individual_id: &str) -> Result<Vec<Poc>, StoreError> {
        let rows = sqlx::query_as::<_, Poc>(&format!(
            r#"
            SELECT {POC_COLUMNS}
            FROM poc
            WHERE individual_id = $1
            ORDER BY start_date DESC, id ASC
            "#
        ))
        .bind(individual_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_poc(&self, poc: &NewPoc) -> Result<Poc, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, Poc>(&format!(
            r#"
            INSERT INTO poc (id, individual_id, poc_number, shift, note, created_by, start_date, stop_date)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            RETURNING {POC_COLUMNS}
            "#
        ))
        .bind(&poc.id)
        .bind(&poc.individual_id)
        .bind(poc.poc_number.as_deref())
        .bind(poc.shift.as_deref())
        .bind(poc.note.as_deref())
        .bind(poc.created_by.as_deref())
        .bind(poc.start_date)
        .bind(poc.stop_date)
        .fetch_one(&mut *tx)
        .await?;

        for d in &poc.duties {
            sqlx::query(
                r#"
                INSERT INTO poc_duty (
                  id, poc_id, category, task_no, duty, minutes, as_needed,
                  times_week_min, times_week_max, days_of_week, instruction, sort_order
                )
                VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
                "#,
            )
            .bind(&d.id)
            .bind(&row.id)
            .bind(d.category.as_deref())
            .bind(d.task_no)
            .bind(&d.duty)
            .bind(d.minutes)
            .bind(d.as_needed)
            .bind(d.times_week_min)
            .bind(d.times_week_max)
            .bind(d.days_of_week.as_deref())
            .bind(d.instruction.as_deref())
            .bind(d.sort_order)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(row)
    }

    async fn delete_poc(&self, poc_id: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(r#"DELETE FROM poc_duty WHERE poc_id = $1"#)
            .bind(poc_id)
            .execute(&mut *tx)
            .await?;

        let res = sqlx::query(r#"DELETE FROM poc WHERE id = $1"#)
            .bind(poc_id)
            .execute(&mut *tx)
            .await?;

        if res.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn duties_for_poc(&self, poc_id: &str) -> Result<Vec<Duty>, StoreError> {
        let rows = sqlx::query_as::<_, Duty>(&format!(
            r#"
            SELECT {DUTY_COLUMNS}
            FROM poc_duty
            WHERE poc_id = $1
            ORDER BY sort_order ASC, task_no ASC, id ASC
            "#
        ))
        .bind(poc_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_daily_log(&self, key: &DailyLogKey) -> Result<Option<DailyLog>, StoreError> {
        let row = sqlx::query_as::<_, DailyLogRow>(&format!(
            r#"
            SELECT {DAILY_LOG_COLUMNS}
            FROM poc_daily_log
            WHERE poc_id = $1 AND dsp_id = $2 AND log_date = $3
            "#
        ))
        .bind(&key.poc_id)
        .bind(&key.dsp_id)
        .bind(key.date)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DailyLog::try_from).transpose()
    }

    async fn insert_daily_log(&self, log: &NewDailyLog) -> Result<DailyLog, StoreError> {
        let existing = self
            .columns
            .columns_of(&self.pool, &self.schema, DAILY_LOG_TABLE)
            .await;

        let plan = InsertPlan::new(DAILY_LOG_TABLE)
            .value("id", SqlValue::Text(log.id.clone()))
            .value("poc_id", SqlValue::Text(log.key.poc_id.clone()))
            .value("individual_id", SqlValue::Text(log.individual_id.clone()))
            .value("dsp_id", SqlValue::Text(log.key.dsp_id.clone()))
            .value("log_date", SqlValue::Date(log.key.date))
            .value("status", SqlValue::Text(DailyLogStatus::Draft.as_str().to_string()))
            .optional(CREATED_BY_CANDIDATES, SqlValue::Text(log.created_by.clone()), &existing);

        let sql = plan.sql(DAILY_LOG_COLUMNS);
        let mut query = sqlx::query_as::<_, DailyLogRow>(&sql);
        for v in plan.values() {
            query = bind_value(query, v);
        }

        let row = query.fetch_one(&self.pool).await?;
        DailyLog::try_from(row)
    }

    async fn get_daily_log(&self, daily_log_id: &str) -> Result<Option<DailyLog>, StoreError> {
        let row = sqlx::query_as::<_, DailyLogRow>(&format!(
            "SELECT {DAILY_LOG_COLUMNS} FROM poc_daily_log WHERE id = $1"
        ))
        .bind(daily_log_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DailyLog::try_from).transpose()
    }

    async fn latest_daily_log(&self, poc_id: &str, date: NaiveDate) -> Result<Option<DailyLog>, StoreError> {
        let row = sqlx::query_as::<_, DailyLogRow>(&format!(
            r#"
            SELECT {DAILY_LOG_COLUMNS}
            FROM poc_daily_log
            WHERE poc_id = $1 AND log_date = $2
            ORDER BY updated_at DESC, id ASC
            LIMIT 1
            "#
        ))
        .bind(poc_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DailyLog::try_from).transpose()
    }

    async fn mark_submitted(&self, daily_log_id: &str, at: DateTime<Utc>) -> Result<Option<DailyLog>, StoreError> {
        let row = sqlx::query_as::<_, DailyLogRow>(&format!(
            r#"
            UPDATE poc_daily_log
            SET status = 'SUBMITTED',
                submitted_at = COALESCE(submitted_at, $2),
                updated_at = now()
            WHERE id = $1
            RETURNING {DAILY_LOG_COLUMNS}
            "#
        ))
        .bind(daily_log_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DailyLog::try_from).transpose()
    }

    async fn task_logs(&self, daily_log_id: &str) -> Result<Vec<TaskLog>, StoreError> {
        let rows = sqlx::query_as::<_, TaskLogRow>(
            r#"
            SELECT t.id, t.daily_log_id, t.duty_id, t.completion_status, t.note, t.completed_at, t.created_at
            FROM poc_task_log t
            LEFT JOIN poc_duty d ON d.id = t.duty_id
            WHERE t.daily_log_id = $1
            ORDER BY d.sort_order ASC NULLS LAST, d.task_no ASC NULLS LAST, t.id ASC
            "#,
        )
        .bind(daily_log_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TaskLog::try_from).collect()
    }

    async fn replace_task_logs(
        &self,
        daily_log_id: &str,
        rows: &[NewTaskLog],
        submit_at: Option<DateTime<Utc>>,
    ) -> Result<ReplaceOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // serializes concurrent replaces and submits of the same log
        let locked: Option<String> = sqlx::query_scalar(
            r#"SELECT status FROM poc_daily_log WHERE id = $1 FOR UPDATE"#,
        )
        .bind(daily_log_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(status) = locked else {
            tx.rollback().await?;
            return Ok(ReplaceOutcome::NotFound);
        };
        let status: DailyLogStatus = status.parse().map_err(StoreError::Decode)?;
        if submit_at.is_none() && status == DailyLogStatus::Submitted {
            tx.rollback().await?;
            return Ok(ReplaceOutcome::AlreadySubmitted);
        }

        sqlx::query(r#"DELETE FROM poc_task_log WHERE daily_log_id = $1"#)
            .bind(daily_log_id)
            .execute(&mut *tx)
            .await?;

        for r in rows {
            sqlx::query(
                r#"
                INSERT INTO poc_task_log (id, daily_log_id, duty_id, completion_status, note, completed_at)
                VALUES ($1,$2,$3,$4,$5,$6)
                "#,
            )
            .bind(&r.id)
            .bind(daily_log_id)
            .bind(&r.duty_id)
            .bind(r.completion_status.as_str())
            .bind(r.note.as_deref())
            .bind(r.completed_at)
            .execute(&mut *tx)
            .await?;
        }

        match submit_at {
            Some(at) => {
                sqlx::query(
                    r#"
                    UPDATE poc_daily_log
                    SET status = 'SUBMITTED',
                        submitted_at = COALESCE(submitted_at, $2),
                        updated_at = now()
                    WHERE id = $1
                    "#,
                )
                .bind(daily_log_id)
                .bind(at)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query(r#"UPDATE poc_daily_log SET updated_at = now() WHERE id = $1"#)
                    .bind(daily_log_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(ReplaceOutcome::Replaced)
    }

    async fn list_daily_logs(
        &self,
        filter: &DailyLogFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<DailyLogSummary>, i64), StoreError> {
        let mut count_qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM poc_daily_log l");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT
              l.id, l.poc_id, l.individual_id, l.dsp_id, l.log_date, l.status,
              l.submitted_at, l.created_at, l.updated_at,
              (SELECT COUNT(*) FROM poc_task_log t WHERE t.daily_log_id = l.id) AS task_count
            FROM poc_daily_log l
            "#,
        );
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY l.log_date DESC, l.updated_at DESC, l.id ASC ");
        qb.push(" LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows: Vec<DailyLogSummaryRow> = qb
            .build_query_as::<DailyLogSummaryRow>()
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(|r| {
                Ok(DailyLogSummary {
                    log: DailyLog::try_from(r.log)?,
                    task_count: r.task_count,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok((items, total))
    }
}
