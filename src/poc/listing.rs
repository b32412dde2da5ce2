// src/poc/listing.rs

use serde::Serialize;

use super::error::PocError;
use super::model::{DailyLogFilter, DailyLogSummary};
use super::store::PocStore;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// `page` is at least 1; `page_size` is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

pub async fn list(
    store: &dyn PocStore,
    filter: &DailyLogFilter,
    page: PageRequest,
) -> Result<Paged<DailyLogSummary>, PocError> {
    if let (Some(from), Some(to)) = (filter.date_from, filter.date_to) {
        if from > to {
            return Err(PocError::Validation("dateFrom must not be after dateTo".into()));
        }
    }

    let (items, total) = store
        .list_daily_logs(filter, page.page_size, page.offset())
        .await?;

    Ok(Paged {
        items,
        total,
        page: page.page,
        page_size: page.page_size,
    })
}
