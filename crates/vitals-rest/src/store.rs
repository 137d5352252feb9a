//! [`HealthStore`] over the REST API: one filtered request per operation.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use vitals_core::{
  Fields,
  biomarker::{BiomarkerAnalysis, LabResult, NewBiomarkerAnalysis, NewLabResult},
  error::to_object,
  goal::{HealthGoal, NewGoal},
  insight::{Insight, NewInsight},
  metrics::{
    self, DailyHealthMetrics, DailyMetricsInput, HealthScorePoint, HourlyHealthMetrics,
    HourlyMetricsInput, WEEK_DAYS, WeeklySummary,
  },
  store::HealthStore,
  supplement::{NewSupplement, NewSupplementLog, Supplement, SupplementLog},
  twin::{DigitalTwin, OrganScores, TwinUpdate},
  user::{NewUser, User, UserUpdate},
  wearable::WearableConnection,
};

use crate::{
  Error, Result,
  client::{MERGE_DUPLICATES, RETURN_REPRESENTATION, RestClient},
  query::{Order, Query},
};

const USERS: &str = "/users";
const BIOMARKER_ANALYSES: &str = "/biomarker_analyses";
const WEARABLE_CONNECTIONS: &str = "/wearable_connections";
const DAILY_METRICS: &str = "/daily_health_metrics";
const HOURLY_METRICS: &str = "/hourly_health_metrics";
const SUPPLEMENTS: &str = "/supplements";
const SUPPLEMENT_LOGS: &str = "/supplement_logs";
const DIGITAL_TWINS: &str = "/digital_twins";
const INSIGHTS: &str = "/ai_insights";
const GOALS: &str = "/health_goals";
const LAB_RESULTS: &str = "/lab_results";
const WEEKLY_SUMMARY_VIEW: &str = "/weekly_health_summary";

// ─── Body helpers ────────────────────────────────────────────────────────────

fn timestamp(at: DateTime<Utc>) -> String { at.to_rfc3339_opts(SecondsFormat::Millis, true) }

fn ts(at: DateTime<Utc>) -> Value { Value::String(timestamp(at)) }

fn text(s: impl ToString) -> Value { Value::String(s.to_string()) }

/// Serialise `input` and set the columns the client owns on top of it.
fn record<T: Serialize>(input: &T, columns: impl IntoIterator<Item = (&'static str, Value)>) -> Result<Value> {
  let mut fields: Fields = to_object(input)?;
  for (name, value) in columns {
    fields.insert(name.to_owned(), value);
  }
  Ok(Value::Object(fields))
}

fn columns(columns: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
  Value::Object(columns.into_iter().map(|(k, v)| (k.to_owned(), v)).collect())
}

impl RestClient {
  /// POST one record and return the row the backend created.
  async fn insert<T: DeserializeOwned>(&self, path: &str, query: Query, body: Value, prefer: &str) -> Result<T> {
    self
      .post(path, query, &body, prefer)
      .await?
      .into_iter()
      .next()
      .ok_or_else(|| Error::EmptyResponse(path.to_owned()))
  }

  async fn first<T: DeserializeOwned>(&self, path: &str, query: Query) -> Result<Option<T>> {
    Ok(self.get(path, query).await?.into_iter().next())
  }

  /// PATCH the rows selected by `query`; `None` when nothing matched.
  async fn update<T: DeserializeOwned>(&self, path: &str, query: Query, body: Value) -> Result<Option<T>> {
    Ok(self.patch(path, query, &body).await?.into_iter().next())
  }
}

// ─── HealthStore impl ────────────────────────────────────────────────────────

impl HealthStore for RestClient {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let now = Utc::now();
    let body = record(&input, [("created_at", ts(now)), ("updated_at", ts(now))])?;
    self.insert(USERS, Query::new(), body, RETURN_REPRESENTATION).await
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    self.first(USERS, Query::new().eq("id", id)).await
  }

  async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<Option<User>> {
    let body = record(&update, [("updated_at", ts(Utc::now()))])?;
    self.update(USERS, Query::new().eq("id", id), body).await
  }

  // ── Biomarkers ────────────────────────────────────────────────────────────

  async fn save_biomarker_analysis(
    &self,
    user_id: Uuid,
    input: NewBiomarkerAnalysis,
  ) -> Result<BiomarkerAnalysis> {
    let now = Utc::now();
    let analysis_date = input.analysis_date.unwrap_or(now);
    let body = record(&input, [
      ("user_id", text(user_id)),
      ("analysis_date", ts(analysis_date)),
      ("created_at", ts(now)),
    ])?;
    self.insert(BIOMARKER_ANALYSES, Query::new(), body, RETURN_REPRESENTATION).await
  }

  async fn get_biomarker_analyses(
    &self,
    user_id: Uuid,
    limit: usize,
  ) -> Result<Vec<BiomarkerAnalysis>> {
    let query = Query::new()
      .eq("user_id", user_id)
      .order("analysis_date", Order::Desc)
      .limit(limit);
    self.get(BIOMARKER_ANALYSES, query).await
  }

  async fn get_latest_biomarker_analysis(&self, user_id: Uuid) -> Result<Option<BiomarkerAnalysis>> {
    let query = Query::new()
      .eq("user_id", user_id)
      .order("analysis_date", Order::Desc)
      .limit(1);
    self.first(BIOMARKER_ANALYSES, query).await
  }

  // ── Wearables ─────────────────────────────────────────────────────────────

  async fn connect_wearable(
    &self,
    user_id: Uuid,
    provider: String,
    details: Fields,
  ) -> Result<WearableConnection> {
    let body = record(&details, [
      ("user_id", text(user_id)),
      ("provider", Value::String(provider)),
      ("is_connected", Value::Bool(true)),
      ("last_sync_at", ts(Utc::now())),
    ])?;
    // `created_at` is left to the column default so a reconnect keeps it.
    let query = Query::new().on_conflict(&["user_id", "provider"]);
    self.insert(WEARABLE_CONNECTIONS, query, body, MERGE_DUPLICATES).await
  }

  async fn get_wearable_connections(&self, user_id: Uuid) -> Result<Vec<WearableConnection>> {
    self.get(WEARABLE_CONNECTIONS, Query::new().eq("user_id", user_id)).await
  }

  async fn mark_wearable_synced(
    &self,
    user_id: Uuid,
    provider: String,
  ) -> Result<Option<WearableConnection>> {
    let query = Query::new().eq("user_id", user_id).eq("provider", provider);
    let body = columns([("last_sync_at", ts(Utc::now()))]);
    self.update(WEARABLE_CONNECTIONS, query, body).await
  }

  // ── Daily metrics ─────────────────────────────────────────────────────────

  async fn save_daily_metrics(
    &self,
    user_id: Uuid,
    date: NaiveDate,
    input: DailyMetricsInput,
  ) -> Result<DailyHealthMetrics> {
    let body = record(&input, [
      ("user_id", text(user_id)),
      ("date", text(date)),
      ("created_at", ts(Utc::now())),
    ])?;
    let query = Query::new().on_conflict(&["user_id", "date"]);
    self.insert(DAILY_METRICS, query, body, MERGE_DUPLICATES).await
  }

  async fn get_daily_metrics(
    &self,
    user_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<DailyHealthMetrics>> {
    let query = Query::new()
      .eq("user_id", user_id)
      .gte("date", start)
      .lte("date", end)
      .order("date", Order::Desc);
    self.get(DAILY_METRICS, query).await
  }

  async fn get_latest_daily_metrics(&self, user_id: Uuid) -> Result<Option<DailyHealthMetrics>> {
    let today = Utc::now().date_naive();
    let query = Query::new().eq("user_id", user_id).eq("date", today);
    self.first(DAILY_METRICS, query).await
  }

  // ── Hourly metrics ────────────────────────────────────────────────────────

  async fn save_hourly_metrics(
    &self,
    user_id: Uuid,
    input: HourlyMetricsInput,
  ) -> Result<HourlyHealthMetrics> {
    let at = input.timestamp.unwrap_or_else(Utc::now);
    let body = record(&input, [("user_id", text(user_id)), ("timestamp", ts(at))])?;
    self.insert(HOURLY_METRICS, Query::new(), body, RETURN_REPRESENTATION).await
  }

  async fn get_hourly_metrics(
    &self,
    user_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Vec<HourlyHealthMetrics>> {
    let query = Query::new()
      .eq("user_id", user_id)
      .gte("timestamp", timestamp(start))
      .lte("timestamp", timestamp(end))
      .order("timestamp", Order::Desc);
    self.get(HOURLY_METRICS, query).await
  }

  // ── Supplements ───────────────────────────────────────────────────────────

  async fn add_supplement(&self, user_id: Uuid, input: NewSupplement) -> Result<Supplement> {
    let body = record(&input, [
      ("user_id", text(user_id)),
      ("is_active", Value::Bool(true)),
      ("created_at", ts(Utc::now())),
    ])?;
    self.insert(SUPPLEMENTS, Query::new(), body, RETURN_REPRESENTATION).await
  }

  async fn get_supplements(&self, user_id: Uuid) -> Result<Vec<Supplement>> {
    let query = Query::new().eq("user_id", user_id).eq("is_active", true);
    self.get(SUPPLEMENTS, query).await
  }

  async fn deactivate_supplement(
    &self,
    user_id: Uuid,
    supplement_id: Uuid,
  ) -> Result<Option<Supplement>> {
    let query = Query::new().eq("id", supplement_id).eq("user_id", user_id);
    self.update(SUPPLEMENTS, query, columns([("is_active", Value::Bool(false))])).await
  }

  async fn log_supplement(
    &self,
    user_id: Uuid,
    supplement_id: Uuid,
    input: NewSupplementLog,
  ) -> Result<SupplementLog> {
    let body = record(&input, [
      ("user_id", text(user_id)),
      ("supplement_id", text(supplement_id)),
      ("taken_at", ts(Utc::now())),
    ])?;
    self.insert(SUPPLEMENT_LOGS, Query::new(), body, RETURN_REPRESENTATION).await
  }

  async fn get_supplement_logs(&self, user_id: Uuid, limit: usize) -> Result<Vec<SupplementLog>> {
    let query = Query::new()
      .eq("user_id", user_id)
      .order("taken_at", Order::Desc)
      .limit(limit);
    self.get(SUPPLEMENT_LOGS, query).await
  }

  // ── Digital twin ──────────────────────────────────────────────────────────

  async fn create_digital_twin(&self, user_id: Uuid, scores: OrganScores) -> Result<DigitalTwin> {
    let now = Utc::now();
    let body = record(&scores, [
      ("user_id", text(user_id)),
      ("last_updated", ts(now)),
      ("created_at", ts(now)),
    ])?;
    self.insert(DIGITAL_TWINS, Query::new(), body, RETURN_REPRESENTATION).await
  }

  /// `None` until a twin has been created for the user.
  async fn get_digital_twin(&self, user_id: Uuid) -> Result<Option<DigitalTwin>> {
    self.first(DIGITAL_TWINS, Query::new().eq("user_id", user_id)).await
  }

  async fn update_digital_twin(
    &self,
    user_id: Uuid,
    update: TwinUpdate,
  ) -> Result<Option<DigitalTwin>> {
    let body = record(&update, [("last_updated", ts(Utc::now()))])?;
    self.update(DIGITAL_TWINS, Query::new().eq("user_id", user_id), body).await
  }

  // ── Insights ──────────────────────────────────────────────────────────────

  async fn create_insight(&self, user_id: Uuid, input: NewInsight) -> Result<Insight> {
    let body = record(&input, [
      ("user_id", text(user_id)),
      ("is_read", Value::Bool(false)),
      ("generated_at", ts(Utc::now())),
    ])?;
    self.insert(INSIGHTS, Query::new(), body, RETURN_REPRESENTATION).await
  }

  async fn get_insights(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Insight>> {
    let mut query = Query::new()
      .eq("user_id", user_id)
      .order("generated_at", Order::Desc);
    if unread_only {
      query = query.eq("is_read", false);
    }
    self.get(INSIGHTS, query).await
  }

  async fn mark_insight_read(&self, insight_id: Uuid) -> Result<Option<Insight>> {
    let body = columns([("is_read", Value::Bool(true))]);
    self.update(INSIGHTS, Query::new().eq("id", insight_id), body).await
  }

  // ── Goals ─────────────────────────────────────────────────────────────────

  async fn create_goal(&self, user_id: Uuid, input: NewGoal) -> Result<HealthGoal> {
    let body = record(&input, [("user_id", text(user_id)), ("created_at", ts(Utc::now()))])?;
    self.insert(GOALS, Query::new(), body, RETURN_REPRESENTATION).await
  }

  async fn get_goals(&self, user_id: Uuid) -> Result<Vec<HealthGoal>> {
    let query = Query::new()
      .eq("user_id", user_id)
      .order("created_at", Order::Desc);
    self.get(GOALS, query).await
  }

  async fn update_goal_progress(
    &self,
    goal_id: Uuid,
    current_value: f64,
    progress_percentage: f64,
  ) -> Result<Option<HealthGoal>> {
    let body = columns([
      ("current_value", Value::from(current_value)),
      ("progress_percentage", Value::from(progress_percentage)),
      ("updated_at", ts(Utc::now())),
    ]);
    self.update(GOALS, Query::new().eq("id", goal_id), body).await
  }

  // ── Lab results ───────────────────────────────────────────────────────────

  async fn save_lab_result(&self, user_id: Uuid, input: NewLabResult) -> Result<LabResult> {
    let body = record(&input, [("user_id", text(user_id)), ("created_at", ts(Utc::now()))])?;
    self.insert(LAB_RESULTS, Query::new(), body, RETURN_REPRESENTATION).await
  }

  async fn get_lab_results(&self, user_id: Uuid) -> Result<Vec<LabResult>> {
    let query = Query::new()
      .eq("user_id", user_id)
      .order("test_date", Order::Desc);
    self.get(LAB_RESULTS, query).await
  }

  // ── Aggregates ────────────────────────────────────────────────────────────

  async fn weekly_summary(&self, user_id: Uuid) -> Result<Option<WeeklySummary>> {
    if self.use_summary_view {
      let query = Query::new().eq("user_id", user_id).limit(1);
      match self.first(WEEKLY_SUMMARY_VIEW, query).await {
        Ok(summary) => return Ok(summary),
        Err(Error::Request { status: 404, .. }) => {
          warn!(%user_id, "weekly summary view not found; computing from daily rows");
        }
        Err(e) => return Err(e),
      }
    }

    let (start, end) = metrics::trailing_window(Utc::now().date_naive(), WEEK_DAYS);
    let rows = self.get_daily_metrics(user_id, start, end).await?;
    Ok(metrics::summarize_week(start, &rows))
  }

  async fn health_score_history(&self, user_id: Uuid, days: u32) -> Result<Vec<HealthScorePoint>> {
    let (start, end) = metrics::trailing_window(Utc::now().date_naive(), i64::from(days));
    let query = Query::new()
      .eq("user_id", user_id)
      .gte("date", start)
      .lte("date", end)
      .order("date", Order::Asc);
    let rows: Vec<DailyHealthMetrics> = self.get(DAILY_METRICS, query).await?;
    Ok(metrics::score_history(&rows))
  }
}
