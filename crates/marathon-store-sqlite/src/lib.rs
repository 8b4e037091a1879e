//! SQLite backend for the marathon stores.
//!
//! One [`SqliteStore`] implements both the per-photo [`SlotStore`] and the
//! durable [`RecordStore`]. It wraps [`tokio_rusqlite`] so all database access
//! runs on a dedicated thread without blocking the async runtime.
//!
//! [`SlotStore`]: marathon_core::slot::SlotStore
//! [`RecordStore`]: marathon_core::store::RecordStore

mod encode;
mod schema;
mod slots;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
