//! Daily and hourly health metrics, plus the aggregates computed over them.
//!
//! Both backends share [`summarize_week`] and [`score_history`] so the
//! in-memory aggregation is identical whichever store answered the query.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Fields;

/// Length of the window [`summarize_week`] covers, counted back from today.
pub const WEEK_DAYS: i64 = 7;

// ─── Daily ───────────────────────────────────────────────────────────────────

/// One day of metrics for one user. Unique per `(user_id, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyHealthMetrics {
  pub id:                     Uuid,
  pub user_id:                Uuid,
  pub date:                   NaiveDate,
  #[serde(default)]
  pub steps:                  Option<i64>,
  #[serde(default)]
  pub calories_burned:        Option<i64>,
  #[serde(default)]
  pub active_minutes:         Option<i64>,
  #[serde(default)]
  pub resting_heart_rate:     Option<i64>,
  #[serde(default)]
  pub avg_heart_rate:         Option<i64>,
  #[serde(default)]
  pub hrv_ms:                 Option<f64>,
  #[serde(default)]
  pub sleep_duration_minutes: Option<i64>,
  #[serde(default)]
  pub deep_sleep_minutes:     Option<i64>,
  #[serde(default)]
  pub rem_sleep_minutes:      Option<i64>,
  #[serde(default)]
  pub sleep_score_computed:   Option<i64>,
  #[serde(default)]
  pub spo2_avg:               Option<f64>,
  #[serde(default)]
  pub overall_score:          Option<i64>,
  #[serde(default)]
  pub activity_score:         Option<i64>,
  #[serde(default)]
  pub recovery_score:         Option<i64>,
  #[serde(default)]
  pub sources:                Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at:             Option<DateTime<Utc>>,
  #[serde(flatten)]
  pub extra:                  Fields,
}

/// The metric columns of a daily row, without identity or timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyMetricsInput {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub steps:                  Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub calories_burned:        Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub active_minutes:         Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub resting_heart_rate:     Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avg_heart_rate:         Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub hrv_ms:                 Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sleep_duration_minutes: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deep_sleep_minutes:     Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rem_sleep_minutes:      Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sleep_score_computed:   Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub spo2_avg:               Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub overall_score:          Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub activity_score:         Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub recovery_score:         Option<i64>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub sources:                Vec<String>,
  #[serde(flatten)]
  pub extra:                  Fields,
}

impl DailyMetricsInput {
  pub fn into_metrics(
    self,
    id: Uuid,
    user_id: Uuid,
    date: NaiveDate,
    now: DateTime<Utc>,
  ) -> DailyHealthMetrics {
    DailyHealthMetrics {
      id,
      user_id,
      date,
      steps: self.steps,
      calories_burned: self.calories_burned,
      active_minutes: self.active_minutes,
      resting_heart_rate: self.resting_heart_rate,
      avg_heart_rate: self.avg_heart_rate,
      hrv_ms: self.hrv_ms,
      sleep_duration_minutes: self.sleep_duration_minutes,
      deep_sleep_minutes: self.deep_sleep_minutes,
      rem_sleep_minutes: self.rem_sleep_minutes,
      sleep_score_computed: self.sleep_score_computed,
      spo2_avg: self.spo2_avg,
      overall_score: self.overall_score,
      activity_score: self.activity_score,
      recovery_score: self.recovery_score,
      sources: self.sources,
      created_at: Some(now),
      extra: self.extra,
    }
  }
}

// ─── Hourly ──────────────────────────────────────────────────────────────────

/// An append-only per-sync reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyHealthMetrics {
  pub id:         Uuid,
  pub user_id:    Uuid,
  pub timestamp:  DateTime<Utc>,
  #[serde(default)]
  pub steps:      Option<i64>,
  #[serde(default)]
  pub heart_rate: Option<i64>,
  #[serde(default)]
  pub calories:   Option<i64>,
  #[serde(flatten)]
  pub extra:      Fields,
}

/// Input for an hourly reading. `timestamp` defaults to the time of saving.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HourlyMetricsInput {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timestamp:  Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub steps:      Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub heart_rate: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub calories:   Option<i64>,
  #[serde(flatten)]
  pub extra:      Fields,
}

impl HourlyMetricsInput {
  pub fn into_metrics(self, id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> HourlyHealthMetrics {
    HourlyHealthMetrics {
      id,
      user_id,
      timestamp: self.timestamp.unwrap_or(now),
      steps: self.steps,
      heart_rate: self.heart_rate,
      calories: self.calories,
      extra: self.extra,
    }
  }
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

/// Averages over the daily rows of the last week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
  pub week_start:        NaiveDate,
  #[serde(default)]
  pub avg_steps:         i64,
  #[serde(default)]
  pub avg_sleep_minutes: i64,
  #[serde(default)]
  pub avg_resting_hr:    i64,
  #[serde(default)]
  pub avg_hrv:           i64,
  #[serde(default)]
  pub avg_health_score:  i64,
  #[serde(default)]
  pub days_logged:       i64,
}

/// One point of the score history chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScorePoint {
  pub date:           NaiveDate,
  pub health_score:   Option<i64>,
  pub activity_score: Option<i64>,
  pub sleep_score:    Option<i64>,
  pub recovery_score: Option<i64>,
}

/// Mean of the present values, rounded to the nearest integer.
///
/// Absent values are skipped. An input with no present values averages to
/// `0` rather than NaN.
pub fn rounded_average<I>(values: I) -> i64
where
  I: IntoIterator<Item = Option<f64>>,
{
  let (sum, count) = values
    .into_iter()
    .flatten()
    .fold((0.0_f64, 0_u32), |(sum, count), v| (sum + v, count + 1));

  if count == 0 {
    return 0;
  }
  (sum / f64::from(count)).round() as i64
}

/// The inclusive `[start, end]` window of the last `days` days ending today.
///
/// A window reaching past the earliest representable date starts at
/// [`NaiveDate::MIN`].
pub fn trailing_window(today: NaiveDate, days: i64) -> (NaiveDate, NaiveDate) {
  let start = today
    .checked_sub_days(Days::new(u64::try_from(days).unwrap_or(0)))
    .unwrap_or(NaiveDate::MIN);
  (start, today)
}

/// Summarise the rows of one week. Returns `None` when there are no rows.
pub fn summarize_week(week_start: NaiveDate, rows: &[DailyHealthMetrics]) -> Option<WeeklySummary> {
  if rows.is_empty() {
    return None;
  }

  let int = |f: fn(&DailyHealthMetrics) -> Option<i64>| {
    rounded_average(rows.iter().map(|r| f(r).map(|v| v as f64)))
  };

  Some(WeeklySummary {
    week_start,
    avg_steps: int(|r| r.steps),
    avg_sleep_minutes: int(|r| r.sleep_duration_minutes),
    avg_resting_hr: int(|r| r.resting_heart_rate),
    avg_hrv: rounded_average(rows.iter().map(|r| r.hrv_ms)),
    avg_health_score: int(|r| r.overall_score),
    days_logged: rows.len() as i64,
  })
}

/// Project daily rows onto score points, oldest first.
pub fn score_history(rows: &[DailyHealthMetrics]) -> Vec<HealthScorePoint> {
  let mut points: Vec<HealthScorePoint> = rows
    .iter()
    .map(|r| HealthScorePoint {
      date:           r.date,
      health_score:   r.overall_score,
      activity_score: r.activity_score,
      sleep_score:    r.sleep_score_computed,
      recovery_score: r.recovery_score,
    })
    .collect();
  points.sort_by_key(|p| p.date);
  points
}
