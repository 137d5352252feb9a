//! Core types and trait definitions for the Vitals health store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Backends (`vitals-rest`, `vitals-store-sqlite`) implement
//! [`store::HealthStore`]; callers depend on the trait alone.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod bioage;
pub mod biomarker;
pub mod error;
pub mod goal;
pub mod insight;
pub mod metrics;
pub mod store;
pub mod supplement;
pub mod twin;
pub mod user;
pub mod wearable;
pub mod workflow;

pub use error::{Error, Result};

/// Open-ended record columns that the client carries but does not interpret.
///
/// Flattened into each record's JSON form so backend-defined fields survive a
/// read-modify-write untouched.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Read a column the backend may return as `null` as the type's default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
  D: serde::Deserializer<'de>,
  T: Default + serde::Deserialize<'de>,
{
  use serde::Deserialize as _;
  Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
