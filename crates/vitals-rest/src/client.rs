//! Async HTTP client for the hosted Vitals REST backend.

use std::time::Duration;

use reqwest::{
  Client, Method,
  header::{self, HeaderMap, HeaderName, HeaderValue},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::{Error, Result, query::Query};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const API_PREFIX: &str = "/rest/v1";

/// `Prefer` header value asking the backend to echo written rows.
pub(crate) const RETURN_REPRESENTATION: &str = "return=representation";

/// `Prefer` header value for an upsert that echoes the merged row.
pub(crate) const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=representation";

/// Connection settings for the hosted backend.
#[derive(Debug, Clone)]
pub struct RestConfig {
  pub base_url:         String,
  pub api_key:          String,
  pub timeout:          Duration,
  /// Read the weekly summary from the precomputed server-side view.
  pub use_summary_view: bool,
}

impl RestConfig {
  pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
    Self {
      base_url:         base_url.into(),
      api_key:          api_key.into(),
      timeout:          DEFAULT_TIMEOUT,
      use_summary_view: false,
    }
  }

  /// Reject settings that can never produce a working client.
  pub fn validate(&self) -> Result<()> {
    let url = self.base_url.trim();
    if url.is_empty() {
      return Err(Error::Config("base URL is empty".into()));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
      return Err(Error::Config(format!("base URL must be http(s): {url}")));
    }
    if self.api_key.trim().is_empty() {
      return Err(Error::Config("API key is empty".into()));
    }
    Ok(())
  }
}

/// Async HTTP client for the backend's REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based. The URL
/// and key are fixed for the client's lifetime.
#[derive(Clone)]
pub struct RestClient {
  http:                        Client,
  base:                        String,
  pub(crate) use_summary_view: bool,
}

impl RestClient {
  pub fn new(config: RestConfig) -> Result<Self> {
    config.validate()?;

    let key = config.api_key.trim();
    let invalid_key = |_| Error::Config("API key is not a valid header value".into());

    let mut apikey = HeaderValue::from_str(key).map_err(invalid_key)?;
    apikey.set_sensitive(true);
    let mut bearer = HeaderValue::from_str(&format!("Bearer {key}")).map_err(invalid_key)?;
    bearer.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static("apikey"), apikey);
    headers.insert(header::AUTHORIZATION, bearer);
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let http = Client::builder()
      .default_headers(headers)
      .timeout(config.timeout)
      .build()?;

    Ok(Self {
      http,
      base: format!("{}{API_PREFIX}", config.base_url.trim().trim_end_matches('/')),
      use_summary_view: config.use_summary_view,
    })
  }

  /// A minimal read used to check the backend is reachable and the key is
  /// accepted.
  pub async fn ping(&self) -> Result<()> {
    let query = Query::new().select("id").limit(1);
    self.get::<Value>("/users", query).await?;
    Ok(())
  }

  // ── Request plumbing ──────────────────────────────────────────────────────

  pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str, query: Query) -> Result<Vec<T>> {
    self.execute(Method::GET, path, query, None, None).await
  }

  pub(crate) async fn post<T: DeserializeOwned>(
    &self,
    path: &str,
    query: Query,
    body: &Value,
    prefer: &str,
  ) -> Result<Vec<T>> {
    self.execute(Method::POST, path, query, Some(body), Some(prefer)).await
  }

  pub(crate) async fn patch<T: DeserializeOwned>(
    &self,
    path: &str,
    query: Query,
    body: &Value,
  ) -> Result<Vec<T>> {
    self
      .execute(Method::PATCH, path, query, Some(body), Some(RETURN_REPRESENTATION))
      .await
  }

  async fn execute<T: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    query: Query,
    body: Option<&Value>,
    prefer: Option<&str>,
  ) -> Result<Vec<T>> {
    let mut req = self
      .http
      .request(method.clone(), format!("{}{path}", self.base))
      .query(query.pairs());
    if let Some(prefer) = prefer {
      req = req.header("Prefer", prefer);
    }
    if let Some(body) = body {
      req = req.json(body);
    }

    let resp = req.send().await?;
    let status = resp.status();
    let text = resp.text().await?;
    debug!(%method, path, status = status.as_u16(), "rest request");

    if !status.is_success() {
      return Err(Error::Request {
        status:  status.as_u16(),
        path:    path.to_owned(),
        message: error_message(&text, status.canonical_reason()),
      });
    }
    parse_rows(path, &text)
  }
}

/// The `message` of a JSON error body, else the body itself.
fn error_message(body: &str, reason: Option<&str>) -> String {
  let trimmed = body.trim();
  if trimmed.is_empty() {
    return reason.unwrap_or("request failed").to_owned();
  }
  serde_json::from_str::<Value>(trimmed)
    .ok()
    .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
    .unwrap_or_else(|| trimmed.to_owned())
}

/// Accept an array, a single object, or an empty body.
fn parse_rows<T: DeserializeOwned>(path: &str, body: &str) -> Result<Vec<T>> {
  let json_err = |source| Error::Json { path: path.to_owned(), source };

  if body.trim().is_empty() {
    return Ok(Vec::new());
  }
  match serde_json::from_str::<Value>(body).map_err(json_err)? {
    Value::Array(items) => items
      .into_iter()
      .map(|item| serde_json::from_value(item).map_err(json_err))
      .collect(),
    Value::Null => Ok(Vec::new()),
    single => Ok(vec![serde_json::from_value(single).map_err(json_err)?]),
  }
}
