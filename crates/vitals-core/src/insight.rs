//! Insights: generated recommendations and alerts with a read flag.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::EnumString;
use uuid::Uuid;

use crate::{Fields, null_as_default};

/// How urgently an insight wants the user's attention.
///
/// Insights are also written by an external analysis pipeline, so a level
/// this client does not know is kept verbatim in [`Severity::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, EnumString)]
#[serde(from = "String", into = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Severity {
  #[default]
  Info,
  Low,
  Medium,
  High,
  Critical,
  #[strum(default)]
  Other(String),
}

impl Severity {
  pub fn as_str(&self) -> &str {
    match self {
      Self::Info => "info",
      Self::Low => "low",
      Self::Medium => "medium",
      Self::High => "high",
      Self::Critical => "critical",
      Self::Other(level) => level,
    }
  }
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl From<String> for Severity {
  fn from(level: String) -> Self {
    let parsed = level.parse::<Self>();
    parsed.unwrap_or(Self::Other(level))
  }
}

impl From<Severity> for String {
  fn from(severity: Severity) -> Self {
    match severity {
      Severity::Other(level) => level,
      known => known.as_str().to_owned(),
    }
  }
}

/// Append-only; `is_read` flips from `false` to `true` once.
///
/// Columns the pipeline may leave `null` read as their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
  pub id:           Uuid,
  pub user_id:      Uuid,
  #[serde(default, deserialize_with = "null_as_default")]
  pub title:        String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub message:      String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category:     Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub severity:     Severity,
  #[serde(default, deserialize_with = "null_as_default")]
  pub is_read:      bool,
  pub generated_at: DateTime<Utc>,
  #[serde(flatten)]
  pub extra:        Fields,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInsight {
  pub title:    String,
  #[serde(default)]
  pub message:  String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(default)]
  pub severity: Severity,
  #[serde(flatten)]
  pub extra:    Fields,
}

impl NewInsight {
  /// The insight every newly provisioned user starts with.
  pub fn welcome() -> Self {
    Self {
      title:    "Welcome to your health dashboard".into(),
      message:  "Connect a wearable or record a biomarker analysis to start \
                 receiving personalised insights."
        .into(),
      category: Some("onboarding".into()),
      severity: Severity::Info,
      extra:    Fields::new(),
    }
  }

  pub fn into_insight(self, id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Insight {
    Insight {
      id,
      user_id,
      title: self.title,
      message: self.message,
      category: self.category,
      severity: self.severity,
      is_read: false,
      generated_at: now,
      extra: self.extra,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn severity_text_forms_agree() {
    assert_eq!(Severity::High.to_string(), "high");
    assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
    assert_eq!(serde_json::to_value(Severity::Medium).unwrap(), "medium");
    assert_eq!(serde_json::from_value::<Severity>("HIGH".into()).unwrap(), Severity::High);
  }

  #[test]
  fn unknown_severity_is_kept_verbatim() {
    let severity: Severity = serde_json::from_value("warning".into()).unwrap();
    assert_eq!(severity, Severity::Other("warning".into()));
    assert_eq!(severity.to_string(), "warning");
    assert_eq!(serde_json::to_value(&severity).unwrap(), "warning");
  }

  #[test]
  fn pipeline_row_with_nulls_still_reads() {
    let row = serde_json::json!({
      "id": Uuid::nil(),
      "user_id": Uuid::nil(),
      "title": null,
      "message": null,
      "severity": null,
      "is_read": null,
      "generated_at": "2026-03-01T08:00:00Z",
      "model_version": "v7",
    });
    let insight: Insight = serde_json::from_value(row).unwrap();
    assert_eq!(insight.title, "");
    assert_eq!(insight.severity, Severity::Info);
    assert!(!insight.is_read);
    assert_eq!(insight.extra["model_version"], "v7");
  }
}
