//! SQLite-backed local fallback store for Vitals.
//!
//! The database is used as a plain key-value store: one `kv` table of JSON
//! documents under deterministic keys (see [`keys`]). [`tokio_rusqlite`] runs
//! every statement on a dedicated thread so the async runtime never blocks.

mod keys;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
