//! Wearable connections and the per-sync sample they deliver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Fields,
  metrics::{DailyHealthMetrics, DailyMetricsInput},
};

/// Links a user to a third-party device or data provider.
/// Unique per `(user_id, provider)`; reconnecting replaces the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WearableConnection {
  pub id:           Uuid,
  pub user_id:      Uuid,
  pub provider:     String,
  #[serde(default)]
  pub is_connected: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_sync_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at:   Option<DateTime<Utc>>,
  /// Provider-specific connection data (tokens, device ids, ...).
  #[serde(flatten)]
  pub extra:        Fields,
}

/// One sync payload as delivered by a wearable integration.
///
/// Field names follow the integration's camel-case JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WearableSample {
  #[serde(default)]
  pub steps:          Option<i64>,
  #[serde(default)]
  pub calories:       Option<i64>,
  #[serde(default, rename = "activeMinutes")]
  pub active_minutes: Option<i64>,
  #[serde(default, rename = "restingHR")]
  pub resting_hr:     Option<i64>,
  #[serde(default, rename = "avgHR")]
  pub avg_hr:         Option<i64>,
  #[serde(default)]
  pub hrv:            Option<f64>,
  #[serde(default, rename = "sleepMinutes")]
  pub sleep_minutes:  Option<i64>,
  #[serde(default, rename = "deepSleep")]
  pub deep_sleep:     Option<i64>,
  #[serde(default, rename = "remSleep")]
  pub rem_sleep:      Option<i64>,
  #[serde(default, rename = "sleepScore")]
  pub sleep_score:    Option<i64>,
  #[serde(default)]
  pub spo2:           Option<f64>,
}

impl WearableSample {
  /// Map the sample onto a daily-metrics row sourced from `provider`.
  pub fn into_daily(self, provider: &str) -> DailyMetricsInput {
    DailyMetricsInput {
      steps: self.steps,
      calories_burned: self.calories,
      active_minutes: self.active_minutes,
      resting_heart_rate: self.resting_hr,
      avg_heart_rate: self.avg_hr,
      hrv_ms: self.hrv,
      sleep_duration_minutes: self.sleep_minutes,
      deep_sleep_minutes: self.deep_sleep,
      rem_sleep_minutes: self.rem_sleep,
      sleep_score_computed: self.sleep_score,
      spo2_avg: self.spo2,
      sources: vec![provider.to_owned()],
      ..DailyMetricsInput::default()
    }
  }
}

/// Outcome of a successful wearable sync.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
  pub metrics:    DailyHealthMetrics,
  /// `None` when no connection exists for the provider; the metrics were
  /// still written.
  pub connection: Option<WearableConnection>,
}
