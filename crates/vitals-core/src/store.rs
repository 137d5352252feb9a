//! The `HealthStore` trait.
//!
//! Implemented by the remote REST client (`vitals-rest`) and the local
//! fallback store (`vitals-store-sqlite`). The binary picks one at startup
//! and hands it to every caller; nothing else knows which one it got.
//!
//! Point lookups report absence as `Ok(None)`, never as an error.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  Fields,
  biomarker::{BiomarkerAnalysis, LabResult, NewBiomarkerAnalysis, NewLabResult},
  goal::{HealthGoal, NewGoal},
  insight::{Insight, NewInsight},
  metrics::{
    DailyHealthMetrics, DailyMetricsInput, HealthScorePoint, HourlyHealthMetrics,
    HourlyMetricsInput, WeeklySummary,
  },
  supplement::{NewSupplement, NewSupplementLog, Supplement, SupplementLog},
  twin::{DigitalTwin, OrganScores, TwinUpdate},
  user::{NewUser, User, UserUpdate},
  wearable::WearableConnection,
};

/// Abstraction over a Vitals data backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait HealthStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create a user. Assigns `id` and `created_at`.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Returns `None` if no user has this id.
  fn update_user(
    &self,
    id: Uuid,
    update: UserUpdate,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  // ── Biomarkers ────────────────────────────────────────────────────────

  fn save_biomarker_analysis(
    &self,
    user_id: Uuid,
    input: NewBiomarkerAnalysis,
  ) -> impl Future<Output = Result<BiomarkerAnalysis, Self::Error>> + Send + '_;

  /// Most recent first, at most `limit` entries.
  fn get_biomarker_analyses(
    &self,
    user_id: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<BiomarkerAnalysis>, Self::Error>> + Send + '_;

  /// The analysis with the greatest `analysis_date`.
  fn get_latest_biomarker_analysis(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<BiomarkerAnalysis>, Self::Error>> + Send + '_;

  // ── Wearables ─────────────────────────────────────────────────────────

  /// Connect (or reconnect) a provider. Replaces any prior connection for the
  /// same `(user_id, provider)` and stamps `last_sync_at`.
  fn connect_wearable(
    &self,
    user_id: Uuid,
    provider: String,
    details: Fields,
  ) -> impl Future<Output = Result<WearableConnection, Self::Error>> + Send + '_;

  fn get_wearable_connections(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<WearableConnection>, Self::Error>> + Send + '_;

  /// Stamp `last_sync_at` with the current time. `None` if not connected.
  fn mark_wearable_synced(
    &self,
    user_id: Uuid,
    provider: String,
  ) -> impl Future<Output = Result<Option<WearableConnection>, Self::Error>> + Send + '_;

  // ── Daily metrics ─────────────────────────────────────────────────────

  /// Create or overwrite the row for `(user_id, date)`.
  fn save_daily_metrics(
    &self,
    user_id: Uuid,
    date: NaiveDate,
    input: DailyMetricsInput,
  ) -> impl Future<Output = Result<DailyHealthMetrics, Self::Error>> + Send + '_;

  /// Stored rows with `start <= date <= end`, newest first. Days without
  /// data are skipped, not synthesised.
  fn get_daily_metrics(
    &self,
    user_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
  ) -> impl Future<Output = Result<Vec<DailyHealthMetrics>, Self::Error>> + Send + '_;

  /// Today's row, if one has been written.
  fn get_latest_daily_metrics(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<DailyHealthMetrics>, Self::Error>> + Send + '_;

  // ── Hourly metrics ────────────────────────────────────────────────────

  fn save_hourly_metrics(
    &self,
    user_id: Uuid,
    input: HourlyMetricsInput,
  ) -> impl Future<Output = Result<HourlyHealthMetrics, Self::Error>> + Send + '_;

  /// Readings with `start <= timestamp <= end`, newest first.
  fn get_hourly_metrics(
    &self,
    user_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<HourlyHealthMetrics>, Self::Error>> + Send + '_;

  // ── Supplements ───────────────────────────────────────────────────────

  fn add_supplement(
    &self,
    user_id: Uuid,
    input: NewSupplement,
  ) -> impl Future<Output = Result<Supplement, Self::Error>> + Send + '_;

  /// Active supplements only.
  fn get_supplements(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Supplement>, Self::Error>> + Send + '_;

  /// Flip `is_active` to `false`. The record is kept.
  fn deactivate_supplement(
    &self,
    user_id: Uuid,
    supplement_id: Uuid,
  ) -> impl Future<Output = Result<Option<Supplement>, Self::Error>> + Send + '_;

  /// Append a dose; `taken_at` is the current time.
  fn log_supplement(
    &self,
    user_id: Uuid,
    supplement_id: Uuid,
    input: NewSupplementLog,
  ) -> impl Future<Output = Result<SupplementLog, Self::Error>> + Send + '_;

  /// Most recent first, at most `limit` entries.
  fn get_supplement_logs(
    &self,
    user_id: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<SupplementLog>, Self::Error>> + Send + '_;

  // ── Digital twin ──────────────────────────────────────────────────────

  fn create_digital_twin(
    &self,
    user_id: Uuid,
    scores: OrganScores,
  ) -> impl Future<Output = Result<DigitalTwin, Self::Error>> + Send + '_;

  /// The local store answers with [`DigitalTwin::with_defaults`] instead of
  /// `None` when nothing is stored.
  fn get_digital_twin(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<DigitalTwin>, Self::Error>> + Send + '_;

  /// Apply a partial update and stamp `last_updated`.
  fn update_digital_twin(
    &self,
    user_id: Uuid,
    update: TwinUpdate,
  ) -> impl Future<Output = Result<Option<DigitalTwin>, Self::Error>> + Send + '_;

  // ── Insights ──────────────────────────────────────────────────────────

  fn create_insight(
    &self,
    user_id: Uuid,
    input: NewInsight,
  ) -> impl Future<Output = Result<Insight, Self::Error>> + Send + '_;

  /// Newest first; `unread_only` drops insights already read.
  fn get_insights(
    &self,
    user_id: Uuid,
    unread_only: bool,
  ) -> impl Future<Output = Result<Vec<Insight>, Self::Error>> + Send + '_;

  fn mark_insight_read(
    &self,
    insight_id: Uuid,
  ) -> impl Future<Output = Result<Option<Insight>, Self::Error>> + Send + '_;

  // ── Goals ─────────────────────────────────────────────────────────────

  fn create_goal(
    &self,
    user_id: Uuid,
    input: NewGoal,
  ) -> impl Future<Output = Result<HealthGoal, Self::Error>> + Send + '_;

  /// Newest first.
  fn get_goals(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<HealthGoal>, Self::Error>> + Send + '_;

  fn update_goal_progress(
    &self,
    goal_id: Uuid,
    current_value: f64,
    progress_percentage: f64,
  ) -> impl Future<Output = Result<Option<HealthGoal>, Self::Error>> + Send + '_;

  // ── Lab results ───────────────────────────────────────────────────────

  fn save_lab_result(
    &self,
    user_id: Uuid,
    input: NewLabResult,
  ) -> impl Future<Output = Result<LabResult, Self::Error>> + Send + '_;

  /// Newest `test_date` first.
  fn get_lab_results(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<LabResult>, Self::Error>> + Send + '_;

  // ── Aggregates ────────────────────────────────────────────────────────

  /// Averages over the last [`WEEK_DAYS`](crate::metrics::WEEK_DAYS) days.
  /// `None` when no daily rows fall in the window.
  fn weekly_summary(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<WeeklySummary>, Self::Error>> + Send + '_;

  /// Score points for the last `days` days, oldest first.
  fn health_score_history(
    &self,
    user_id: Uuid,
    days: u32,
  ) -> impl Future<Output = Result<Vec<HealthScorePoint>, Self::Error>> + Send + '_;
}
