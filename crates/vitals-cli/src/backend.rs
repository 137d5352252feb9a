//! Startup selection between the hosted backend and the local store.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;
use vitals_core::{
  Fields,
  biomarker::{BiomarkerAnalysis, LabResult, NewBiomarkerAnalysis, NewLabResult},
  goal::{HealthGoal, NewGoal},
  insight::{Insight, NewInsight},
  metrics::{
    DailyHealthMetrics, DailyMetricsInput, HealthScorePoint, HourlyHealthMetrics,
    HourlyMetricsInput, WeeklySummary,
  },
  store::HealthStore,
  supplement::{NewSupplement, NewSupplementLog, Supplement, SupplementLog},
  twin::{DigitalTwin, OrganScores, TwinUpdate},
  user::{NewUser, User, UserUpdate},
  wearable::WearableConnection,
};
use vitals_rest::RestClient;
use vitals_store_sqlite::SqliteStore;

use crate::settings::Settings;

/// Whichever store was chosen at startup.
pub enum Backend {
  Remote(RestClient),
  Local(SqliteStore),
}

#[derive(Debug, Error)]
pub enum BackendError {
  #[error(transparent)]
  Remote(#[from] vitals_rest::Error),

  #[error(transparent)]
  Local(#[from] vitals_store_sqlite::Error),
}

impl Backend {
  /// Use the remote backend when it is configured and answers a ping,
  /// otherwise open the local store. `force_local` skips the remote probe.
  pub async fn select(
    settings: &Settings,
    force_local: bool,
  ) -> Result<Self, vitals_store_sqlite::Error> {
    if force_local {
      info!("local store requested");
    } else if let Some(remote) = Self::probe_remote(settings).await {
      return Ok(remote);
    }

    let path = settings.store_path();
    let store = SqliteStore::open(&path).await?;
    info!(path = %path.display(), "using local store");
    Ok(Self::Local(store))
  }

  async fn probe_remote(settings: &Settings) -> Option<Self> {
    let Some(config) = settings.remote() else {
      warn!("remote backend not configured; falling back to local store");
      return None;
    };
    let url = config.base_url.clone();

    let client = match RestClient::new(config) {
      Ok(client) => client,
      Err(e) => {
        warn!(error = %e, "remote backend misconfigured; falling back to local store");
        return None;
      }
    };

    if let Err(e) = client.ping().await {
      warn!(%url, error = %e, "remote backend unreachable; falling back to local store");
      return None;
    }

    info!(%url, "using remote backend");
    Some(Self::Remote(client))
  }

  pub fn name(&self) -> &'static str {
    match self {
      Self::Remote(_) => "remote",
      Self::Local(_) => "local",
    }
  }
}

macro_rules! dispatch {
  ($self:ident . $method:ident ( $($arg:expr),* )) => {
    match $self {
      Backend::Remote(store) => store.$method($($arg),*).await.map_err(BackendError::from),
      Backend::Local(store) => store.$method($($arg),*).await.map_err(BackendError::from),
    }
  };
}

impl HealthStore for Backend {
  type Error = BackendError;

  async fn create_user(&self, input: NewUser) -> Result<User, BackendError> {
    dispatch!(self.create_user(input))
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>, BackendError> {
    dispatch!(self.get_user(id))
  }

  async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<Option<User>, BackendError> {
    dispatch!(self.update_user(id, update))
  }

  async fn save_biomarker_analysis(
    &self,
    user_id: Uuid,
    input: NewBiomarkerAnalysis,
  ) -> Result<BiomarkerAnalysis, BackendError> {
    dispatch!(self.save_biomarker_analysis(user_id, input))
  }

  async fn get_biomarker_analyses(
    &self,
    user_id: Uuid,
    limit: usize,
  ) -> Result<Vec<BiomarkerAnalysis>, BackendError> {
    dispatch!(self.get_biomarker_analyses(user_id, limit))
  }

  async fn get_latest_biomarker_analysis(
    &self,
    user_id: Uuid,
  ) -> Result<Option<BiomarkerAnalysis>, BackendError> {
    dispatch!(self.get_latest_biomarker_analysis(user_id))
  }

  async fn connect_wearable(
    &self,
    user_id: Uuid,
    provider: String,
    details: Fields,
  ) -> Result<WearableConnection, BackendError> {
    dispatch!(self.connect_wearable(user_id, provider, details))
  }

  async fn get_wearable_connections(
    &self,
    user_id: Uuid,
  ) -> Result<Vec<WearableConnection>, BackendError> {
    dispatch!(self.get_wearable_connections(user_id))
  }

  async fn mark_wearable_synced(
    &self,
    user_id: Uuid,
    provider: String,
  ) -> Result<Option<WearableConnection>, BackendError> {
    dispatch!(self.mark_wearable_synced(user_id, provider))
  }

  async fn save_daily_metrics(
    &self,
    user_id: Uuid,
    date: NaiveDate,
    input: DailyMetricsInput,
  ) -> Result<DailyHealthMetrics, BackendError> {
    dispatch!(self.save_daily_metrics(user_id, date, input))
  }

  async fn get_daily_metrics(
    &self,
    user_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<DailyHealthMetrics>, BackendError> {
    dispatch!(self.get_daily_metrics(user_id, start, end))
  }

  async fn get_latest_daily_metrics(
    &self,
    user_id: Uuid,
  ) -> Result<Option<DailyHealthMetrics>, BackendError> {
    dispatch!(self.get_latest_daily_metrics(user_id))
  }

  async fn save_hourly_metrics(
    &self,
    user_id: Uuid,
    input: HourlyMetricsInput,
  ) -> Result<HourlyHealthMetrics, BackendError> {
    dispatch!(self.save_hourly_metrics(user_id, input))
  }

  async fn get_hourly_metrics(
    &self,
    user_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Vec<HourlyHealthMetrics>, BackendError> {
    dispatch!(self.get_hourly_metrics(user_id, start, end))
  }

  async fn add_supplement(
    &self,
    user_id: Uuid,
    input: NewSupplement,
  ) -> Result<Supplement, BackendError> {
    dispatch!(self.add_supplement(user_id, input))
  }

  async fn get_supplements(&self, user_id: Uuid) -> Result<Vec<Supplement>, BackendError> {
    dispatch!(self.get_supplements(user_id))
  }

  async fn deactivate_supplement(
    &self,
    user_id: Uuid,
    supplement_id: Uuid,
  ) -> Result<Option<Supplement>, BackendError> {
    dispatch!(self.deactivate_supplement(user_id, supplement_id))
  }

  async fn log_supplement(
    &self,
    user_id: Uuid,
    supplement_id: Uuid,
    input: NewSupplementLog,
  ) -> Result<SupplementLog, BackendError> {
    dispatch!(self.log_supplement(user_id, supplement_id, input))
  }

  async fn get_supplement_logs(
    &self,
    user_id: Uuid,
    limit: usize,
  ) -> Result<Vec<SupplementLog>, BackendError> {
    dispatch!(self.get_supplement_logs(user_id, limit))
  }

  async fn create_digital_twin(
    &self,
    user_id: Uuid,
    scores: OrganScores,
  ) -> Result<DigitalTwin, BackendError> {
    dispatch!(self.create_digital_twin(user_id, scores))
  }

  async fn get_digital_twin(&self, user_id: Uuid) -> Result<Option<DigitalTwin>, BackendError> {
    dispatch!(self.get_digital_twin(user_id))
  }

  async fn update_digital_twin(
    &self,
    user_id: Uuid,
    update: TwinUpdate,
  ) -> Result<Option<DigitalTwin>, BackendError> {
    dispatch!(self.update_digital_twin(user_id, update))
  }

  async fn create_insight(&self, user_id: Uuid, input: NewInsight) -> Result<Insight, BackendError> {
    dispatch!(self.create_insight(user_id, input))
  }

  async fn get_insights(
    &self,
    user_id: Uuid,
    unread_only: bool,
  ) -> Result<Vec<Insight>, BackendError> {
    dispatch!(self.get_insights(user_id, unread_only))
  }

  async fn mark_insight_read(&self, insight_id: Uuid) -> Result<Option<Insight>, BackendError> {
    dispatch!(self.mark_insight_read(insight_id))
  }

  async fn create_goal(&self, user_id: Uuid, input: NewGoal) -> Result<HealthGoal, BackendError> {
    dispatch!(self.create_goal(user_id, input))
  }

  async fn get_goals(&self, user_id: Uuid) -> Result<Vec<HealthGoal>, BackendError> {
    dispatch!(self.get_goals(user_id))
  }

  async fn update_goal_progress(
    &self,
    goal_id: Uuid,
    current_value: f64,
    progress_percentage: f64,
  ) -> Result<Option<HealthGoal>, BackendError> {
    dispatch!(self.update_goal_progress(goal_id, current_value, progress_percentage))
  }

  async fn save_lab_result(
    &self,
    user_id: Uuid,
    input: NewLabResult,
  ) -> Result<LabResult, BackendError> {
    dispatch!(self.save_lab_result(user_id, input))
  }

  async fn get_lab_results(&self, user_id: Uuid) -> Result<Vec<LabResult>, BackendError> {
    dispatch!(self.get_lab_results(user_id))
  }

  async fn weekly_summary(&self, user_id: Uuid) -> Result<Option<WeeklySummary>, BackendError> {
    dispatch!(self.weekly_summary(user_id))
  }

  async fn health_score_history(
    &self,
    user_id: Uuid,
    days: u32,
  ) -> Result<Vec<HealthScorePoint>, BackendError> {
    dispatch!(self.health_score_history(user_id, days))
  }
}
