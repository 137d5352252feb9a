//! Error type for `vitals-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error in {key}: {source}")]
  Json {
    key:    String,
    #[source]
    source: serde_json::Error,
  },

  /// Another user already registered this email address.
  #[error("email already registered: {0}")]
  DuplicateEmail(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
