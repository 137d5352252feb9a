//! Remote backend for Vitals over a PostgREST-style HTTP API.
//!
//! Every operation of [`vitals_core::store::HealthStore`] maps to a single
//! GET, POST or PATCH under `<base>/rest/v1`, filtered with `field=op.value`
//! query parameters. Nothing is cached and nothing is retried; the backend
//! orders concurrent writes.

mod client;
mod query;
mod store;

pub mod error;

pub use client::{DEFAULT_TIMEOUT, RestClient, RestConfig};
pub use error::{Error, Result};

#[cfg(test)]
mod tests;
