//! Biomarker analyses and lab results, dated, append-only readings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Fields;

/// A recorded lab- or photo-derived health reading. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomarkerAnalysis {
  pub id:                Uuid,
  pub user_id:           Uuid,
  pub analysis_date:     DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub biological_age:    Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub chronological_age: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub longevity_score:   Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at:        Option<DateTime<Utc>>,
  /// Algorithm-specific result fields.
  #[serde(flatten)]
  pub extra:             Fields,
}

/// Input for a new analysis. `analysis_date` defaults to the time of saving.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBiomarkerAnalysis {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub analysis_date:     Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub biological_age:    Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub chronological_age: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub longevity_score:   Option<i64>,
  #[serde(flatten)]
  pub extra:             Fields,
}

impl NewBiomarkerAnalysis {
  /// Materialise the stored record.
  pub fn into_analysis(self, id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> BiomarkerAnalysis {
    BiomarkerAnalysis {
      id,
      user_id,
      analysis_date: self.analysis_date.unwrap_or(now),
      biological_age: self.biological_age,
      chronological_age: self.chronological_age,
      longevity_score: self.longevity_score,
      created_at: Some(now),
      extra: self.extra,
    }
  }
}

/// A laboratory test result. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabResult {
  pub id:         Uuid,
  pub user_id:    Uuid,
  pub test_date:  NaiveDate,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub test_name:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(flatten)]
  pub extra:      Fields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLabResult {
  pub test_date: NaiveDate,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub test_name: Option<String>,
  #[serde(flatten)]
  pub extra:     Fields,
}

impl NewLabResult {
  pub fn into_result(self, id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> LabResult {
    LabResult {
      id,
      user_id,
      test_date: self.test_date,
      test_name: self.test_name,
      created_at: Some(now),
      extra: self.extra,
    }
  }
}

/// Pick the analysis with the greatest `analysis_date`.
pub fn latest(analyses: &[BiomarkerAnalysis]) -> Option<&BiomarkerAnalysis> {
  analyses.iter().max_by_key(|a| a.analysis_date)
}
