//! Error type for `vitals-rest`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The backend answered with a non-success status.
  #[error("{path} returned {status}: {message}")]
  Request {
    status:  u16,
    path:    String,
    /// The `message` field of a JSON error body, or the raw body text.
    message: String,
  },

  /// Transport failure, including timeouts.
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("unexpected response from {path}: {source}")]
  Json {
    path:   String,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid configuration: {0}")]
  Config(String),

  /// A write succeeded but the backend returned no representation of it.
  #[error("{0} returned no rows")]
  EmptyResponse(String),

  #[error(transparent)]
  Core(#[from] vitals_core::Error),
}

impl Error {
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Request { status, .. } => Some(*status),
      Self::Http(e) => e.status().map(|s| s.as_u16()),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
