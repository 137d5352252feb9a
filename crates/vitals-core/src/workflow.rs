//! Multi-step operations built on [`HealthStore`].
//!
//! None of these are atomic. Each step is a separate store call; when a later
//! step fails the earlier writes stay in place and the error carries them so
//! the caller can decide what to do.

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  bioage::{self, Biometrics, Gender},
  biomarker::NewLabResult,
  goal::NewGoal,
  insight::{Insight, NewInsight},
  metrics::{DailyHealthMetrics, DailyMetricsInput},
  store::HealthStore,
  supplement::NewSupplement,
  twin::{DigitalTwin, OrganScores},
  user::{NewUser, User},
  wearable::{SyncReport, WearableSample},
  Fields,
};

// ─── Provisioning ────────────────────────────────────────────────────────────

/// A user together with the records created for them at sign-up.
#[derive(Debug, Clone, Serialize)]
pub struct Provisioned {
  pub user:    User,
  pub twin:    DigitalTwin,
  pub welcome: Insight,
}

#[derive(Debug, Error)]
pub enum ProvisionError<E>
where
  E: std::error::Error + 'static,
{
  #[error("creating user failed: {0}")]
  User(#[source] E),

  #[error("user {} created but creating the digital twin failed: {source}", .user.id)]
  Twin {
    user:   Box<User>,
    #[source]
    source: E,
  },

  #[error("user {} created but creating the welcome insight failed: {source}", .user.id)]
  Welcome {
    user:   Box<User>,
    twin:   Box<DigitalTwin>,
    #[source]
    source: E,
  },
}

/// Create a user, then their default digital twin, then the welcome insight.
pub async fn provision_user<S: HealthStore>(
  store: &S,
  input: NewUser,
) -> Result<Provisioned, ProvisionError<S::Error>> {
  let user = store.create_user(input).await.map_err(ProvisionError::User)?;

  let twin = match store.create_digital_twin(user.id, OrganScores::default()).await {
    Ok(twin) => twin,
    Err(source) => {
      warn!(user_id = %user.id, "digital twin creation failed after user was created");
      return Err(ProvisionError::Twin { user: Box::new(user), source });
    }
  };

  let welcome = match store.create_insight(user.id, NewInsight::welcome()).await {
    Ok(insight) => insight,
    Err(source) => {
      warn!(user_id = %user.id, "welcome insight creation failed after user was created");
      return Err(ProvisionError::Welcome {
        user: Box::new(user),
        twin: Box::new(twin),
        source,
      });
    }
  };

  info!(user_id = %user.id, "provisioned user");
  Ok(Provisioned { user, twin, welcome })
}

// ─── Wearable sync ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SyncError<E>
where
  E: std::error::Error + 'static,
{
  #[error("saving daily metrics failed: {0}")]
  Metrics(#[source] E),

  #[error("daily metrics for {} saved but updating the sync time failed: {source}", .metrics.date)]
  MarkSynced {
    metrics: Box<DailyHealthMetrics>,
    #[source]
    source:  E,
  },
}

/// Write today's metrics from `sample`, then stamp the connection's
/// `last_sync_at`.
pub async fn sync_wearable<S: HealthStore>(
  store: &S,
  user_id: Uuid,
  provider: &str,
  sample: WearableSample,
) -> Result<SyncReport, SyncError<S::Error>> {
  let today = Utc::now().date_naive();

  let metrics = store
    .save_daily_metrics(user_id, today, sample.into_daily(provider))
    .await
    .map_err(SyncError::Metrics)?;

  let connection = match store.mark_wearable_synced(user_id, provider.to_owned()).await {
    Ok(connection) => connection,
    Err(source) => {
      warn!(%user_id, provider, "sync time update failed after metrics were saved");
      return Err(SyncError::MarkSynced { metrics: Box::new(metrics), source });
    }
  };

  if connection.is_none() {
    warn!(%user_id, provider, "synced metrics for a provider with no connection record");
  }
  info!(%user_id, provider, date = %today, "wearable sync complete");

  Ok(SyncReport { metrics, connection })
}

// ─── Demo seed ───────────────────────────────────────────────────────────────

/// Counts of what [`seed_demo_data`] wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
  pub daily_rows:  usize,
  pub analyses:    usize,
  pub supplements: usize,
  pub goals:       usize,
  pub lab_results: usize,
}

/// One day of plausible demo metrics. `offset` is the number of days before
/// today; values vary deterministically with it.
fn demo_day(offset: i64) -> DailyMetricsInput {
  let wobble = |period: i64, span: i64| (offset * 37 % period) * span / period;

  let steps = 7_000 + wobble(11, 5_000);
  let sleep = 380 + wobble(7, 90);
  let resting = 52 + wobble(5, 8);
  let hrv = 45.0 + wobble(9, 30) as f64;
  let sleep_score = 70 + wobble(7, 25);
  let activity = 60 + wobble(11, 35);
  let recovery = 65 + wobble(9, 30);

  DailyMetricsInput {
    steps: Some(steps),
    calories_burned: Some(1_900 + steps / 20),
    active_minutes: Some(20 + steps / 300),
    resting_heart_rate: Some(resting),
    avg_heart_rate: Some(resting + 18),
    hrv_ms: Some(hrv),
    sleep_duration_minutes: Some(sleep),
    deep_sleep_minutes: Some(sleep / 5),
    rem_sleep_minutes: Some(sleep / 4),
    sleep_score_computed: Some(sleep_score),
    spo2_avg: Some(97.0),
    overall_score: Some((sleep_score + activity + recovery) / 3),
    activity_score: Some(activity),
    recovery_score: Some(recovery),
    sources: vec!["demo".to_owned()],
    extra: Fields::new(),
  }
}

fn demo_biometrics() -> Biometrics {
  Biometrics {
    chronological_age:  38,
    gender:             Gender::Other,
    weight_kg:          70.0,
    height_cm:          172.0,
    waist_cm:           Some(80.0),
    hip_cm:             Some(98.0),
    exercise_frequency: 3,
    exercise_intensity: 2,
    sleep_hours:        7.2,
    sleep_quality:      4,
    stress_level:       3,
    diet_quality:       4,
    smoking_status:     0,
    alcohol_intake:     1,
  }
}

/// Populate a fresh account with `days` days of metrics ending `today`, a
/// biomarker analysis, two supplements, a goal and a lab result.
pub async fn seed_demo_data<S: HealthStore>(
  store: &S,
  user_id: Uuid,
  today: NaiveDate,
  days: u32,
) -> Result<SeedSummary, S::Error> {
  let mut summary = SeedSummary::default();

  for offset in 0..i64::from(days) {
    // Stops early once the dates run past the earliest representable day.
    let Some(date) = today.checked_sub_signed(Duration::days(offset)) else {
      break;
    };
    store.save_daily_metrics(user_id, date, demo_day(offset)).await?;
    summary.daily_rows += 1;
  }

  let report = bioage::calculate(&demo_biometrics());
  store.save_biomarker_analysis(user_id, report.to_analysis(Utc::now())).await?;
  summary.analyses += 1;

  for (name, dosage) in [("Vitamin D3", "2000 IU"), ("Omega-3", "1 g")] {
    let input = NewSupplement {
      name:      name.to_owned(),
      dosage:    Some(dosage.to_owned()),
      frequency: Some("daily".to_owned()),
      extra:     Fields::new(),
    };
    store.add_supplement(user_id, input).await?;
    summary.supplements += 1;
  }

  let goal = NewGoal {
    title:         "Walk 10,000 steps a day".to_owned(),
    unit:          Some("steps".to_owned()),
    target_value:  Some(10_000.0),
    current_value: Some(8_000.0),
    extra:         Fields::new(),
  };
  store.create_goal(user_id, goal).await?;
  summary.goals += 1;

  let lab = NewLabResult {
    test_date: today.checked_sub_signed(Duration::days(14)).unwrap_or(today),
    test_name: Some("Lipid panel".to_owned()),
    extra:     serde_json::json!({ "ldl_mg_dl": 96, "hdl_mg_dl": 61, "triglycerides_mg_dl": 88 })
      .as_object()
      .cloned()
      .unwrap_or_default(),
  };
  store.save_lab_result(user_id, lab).await?;
  summary.lab_results += 1;

  info!(%user_id, days, "seeded demo data");
  Ok(summary)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn demo_days_are_deterministic_and_plausible() {
    assert_eq!(demo_day(3), demo_day(3));
    for offset in 0..30 {
      let day = demo_day(offset);
      let steps = day.steps.unwrap();
      assert!((7_000..12_000).contains(&steps), "steps {steps} out of range");
      let score = day.overall_score.unwrap();
      assert!((0..=100).contains(&score), "score {score} out of range");
    }
  }
}
