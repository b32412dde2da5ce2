//! Plan-of-care daily logging: which POC is active on a day, one daily log per
//! (POC, DSP, date), and validated replacement of its task rows.

pub mod daily_log;
pub mod document;
pub mod error;
pub mod listing;
pub mod model;
pub mod pg_store;
pub mod resolver;
pub mod schema;
pub mod store;
pub mod task_log;
pub mod worksheet;

#[cfg(test)]
pub mod memory_store;

pub use error::{PocError, StoreError};
pub use pg_store::PgPocStore;
pub use store::PocStore;
