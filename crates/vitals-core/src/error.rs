//! Error types for `vitals-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("expected a JSON object, got {0}")]
  NotAnObject(&'static str),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Serialise `value` into a JSON object so callers can stamp extra columns
/// onto it before sending it anywhere.
pub fn to_object<T: serde::Serialize>(value: &T) -> Result<crate::Fields> {
  match serde_json::to_value(value)? {
    serde_json::Value::Object(map) => Ok(map),
    serde_json::Value::Array(_) => Err(Error::NotAnObject("array")),
    serde_json::Value::Null => Err(Error::NotAnObject("null")),
    _ => Err(Error::NotAnObject("scalar")),
  }
}
