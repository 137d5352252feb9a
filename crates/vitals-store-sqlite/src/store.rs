//! [`SqliteStore`], the local implementation of [`HealthStore`].

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::OptionalExtension as _;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use uuid::Uuid;

use vitals_core::{
  Fields,
  biomarker::{self, BiomarkerAnalysis, LabResult, NewBiomarkerAnalysis, NewLabResult},
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

use crate::{Error, Result, keys, schema::SCHEMA};

const SELECT_VALUE: &str = "SELECT value FROM kv WHERE key = ?1";

const UPSERT_VALUE: &str = "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
   ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

// ─── Encoding ────────────────────────────────────────────────────────────────

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T> {
  serde_json::from_str(raw).map_err(|source| Error::Json { key: key.to_owned(), source })
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<String> {
  serde_json::to_string(value).map_err(|source| Error::Json { key: key.to_owned(), source })
}

fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

fn write_row(conn: &rusqlite::Connection, key: &str, value: &str, at: &str) -> rusqlite::Result<()> {
  conn.execute(UPSERT_VALUE, rusqlite::params![key, value, at])?;
  Ok(())
}

/// Decode the current document (or start from the default), let `f` change
/// it, and re-encode.
fn rewrite<T, R>(key: &str, raw: Option<&str>, f: impl FnOnce(&mut T) -> Result<R>) -> Result<(String, R)>
where
  T: Serialize + DeserializeOwned + Default,
{
  let mut value = match raw {
    Some(raw) => decode(key, raw)?,
    None => T::default(),
  };
  let out = f(&mut value)?;
  Ok((encode(key, &value)?, out))
}

fn newest_first<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
  items.sort_by(|a, b| key(b).cmp(&key(a)));
  items
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Vitals store kept in a single SQLite file on the device.
///
/// Cloning is cheap; the inner connection is reference-counted. Every
/// read-modify-write of a key runs in one transaction on the connection
/// thread, so writers inside one process never lose each other's updates.
/// Separate processes sharing a file get no such guarantee.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// `true` until the first user is created; the first-run signal.
  pub async fn is_empty(&self) -> Result<bool> {
    Ok(self.list::<User>(keys::USERS.to_owned()).await?.is_empty())
  }

  // ── Key-value primitives ─────────────────────────────────────────────────

  async fn get<T: DeserializeOwned>(&self, key: String) -> Result<Option<T>> {
    let k = key.clone();
    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(SELECT_VALUE, rusqlite::params![k], |row| row.get(0))
            .optional()?,
        )
      })
      .await?;

    raw.map(|raw| decode(&key, &raw)).transpose()
  }

  async fn list<T: DeserializeOwned>(&self, key: String) -> Result<Vec<T>> {
    Ok(self.get::<Vec<T>>(key).await?.unwrap_or_default())
  }

  /// Read-modify-write one key inside a transaction. If `f` fails nothing is
  /// written.
  async fn modify<T, R, F>(&self, key: String, f: F) -> Result<R>
  where
    T: Serialize + DeserializeOwned + Default + Send + 'static,
    R: Send + 'static,
    F: FnOnce(&mut T) -> Result<R> + Send + 'static,
  {
    let at = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let raw: Option<String> = tx
          .query_row(SELECT_VALUE, rusqlite::params![key], |row| row.get(0))
          .optional()?;

        let (encoded, out) = match rewrite(&key, raw.as_deref(), f) {
          Ok(done) => done,
          Err(e) => return Ok(Err(e)),
        };

        write_row(&tx, &key, &encoded, &at)?;
        tx.commit()?;
        Ok(Ok(out))
      })
      .await?
  }

  /// Append `item` to the list under `key`.
  async fn append<T>(&self, key: String, item: T) -> Result<T>
  where
    T: Clone + Serialize + DeserializeOwned + Send + 'static,
  {
    let stored = item.clone();
    self
      .modify(key, move |list: &mut Vec<T>| {
        list.push(stored);
        Ok(())
      })
      .await?;
    Ok(item)
  }

  /// Offer every list stored under `prefix` to `f` until it reports a change,
  /// then persist that one list. A full scan of the matching keys.
  async fn modify_first<T, R, F>(&self, prefix: &'static str, mut f: F) -> Result<Option<R>>
  where
    T: Serialize + DeserializeOwned + Send + 'static,
    R: Send + 'static,
    F: FnMut(&mut Vec<T>) -> Option<R> + Send + 'static,
  {
    let pattern = keys::like_prefix(prefix);
    let at = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let rows: Vec<(String, String)> = {
          let mut stmt = tx.prepare("SELECT key, value FROM kv WHERE key LIKE ?1 ORDER BY key")?;
          stmt
            .query_map(rusqlite::params![pattern], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        for (key, raw) in rows {
          let mut list: Vec<T> = match decode(&key, &raw) {
            Ok(list) => list,
            Err(e) => return Ok(Err(e)),
          };
          let Some(out) = f(&mut list) else { continue };

          let encoded = match encode(&key, &list) {
            Ok(encoded) => encoded,
            Err(e) => return Ok(Err(e)),
          };
          write_row(&tx, &key, &encoded, &at)?;
          tx.commit()?;
          return Ok(Ok(Some(out)));
        }

        Ok(Ok(None))
      })
      .await?
  }

  /// The user's daily rows dated within `[start, end]`, oldest first.
  ///
  /// Scans the user's daily keys once, so the cost follows the number of
  /// stored rows and not the width of the window.
  async fn daily_range(
    &self,
    user_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<DailyHealthMetrics>> {
    let pattern = keys::like_prefix(&keys::daily_prefix(user_id));

    let found: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached("SELECT key, value FROM kv WHERE key LIKE ?1")?;
        let rows = stmt
          .query_map(rusqlite::params![pattern], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut rows = Vec::new();
    for (key, raw) in &found {
      let row: DailyHealthMetrics = decode(key, raw)?;
      if (start..=end).contains(&row.date) {
        rows.push(row);
      }
    }
    rows.sort_by_key(|row| row.date);
    Ok(rows)
  }
}

// ─── HealthStore impl ────────────────────────────────────────────────────────

impl HealthStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let now = Utc::now();
    let user = User {
      id:            Uuid::new_v4(),
      email:         input.email,
      full_name:     input.full_name,
      date_of_birth: input.date_of_birth,
      gender:        input.gender,
      created_at:    now,
      updated_at:    Some(now),
      extra:         input.extra,
    };

    let stored = user.clone();
    self
      .modify(keys::USERS.to_owned(), move |users: &mut Vec<User>| {
        if users.iter().any(|u| u.has_email(&stored.email)) {
          return Err(Error::DuplicateEmail(stored.email));
        }
        users.push(stored);
        Ok(())
      })
      .await?;

    debug!(user_id = %user.id, "created user");
    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let users: Vec<User> = self.list(keys::USERS.to_owned()).await?;
    Ok(users.into_iter().find(|u| u.id == id))
  }

  async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<Option<User>> {
    let now = Utc::now();
    self
      .modify(keys::USERS.to_owned(), move |users: &mut Vec<User>| {
        Ok(users.iter_mut().find(|u| u.id == id).map(|user| {
          user.apply(update, now);
          user.clone()
        }))
      })
      .await
  }

  // ── Biomarkers ────────────────────────────────────────────────────────────

  async fn save_biomarker_analysis(
    &self,
    user_id: Uuid,
    input: NewBiomarkerAnalysis,
  ) -> Result<BiomarkerAnalysis> {
    let analysis = input.into_analysis(Uuid::new_v4(), user_id, Utc::now());
    self.append(keys::biomarkers(user_id), analysis).await
  }

  async fn get_biomarker_analyses(
    &self,
    user_id: Uuid,
    limit: usize,
  ) -> Result<Vec<BiomarkerAnalysis>> {
    let all = self.list(keys::biomarkers(user_id)).await?;
    let mut sorted = newest_first(all, |a: &BiomarkerAnalysis| a.analysis_date);
    sorted.truncate(limit);
    Ok(sorted)
  }

  async fn get_latest_biomarker_analysis(&self, user_id: Uuid) -> Result<Option<BiomarkerAnalysis>> {
    let all: Vec<BiomarkerAnalysis> = self.list(keys::biomarkers(user_id)).await?;
    Ok(biomarker::latest(&all).cloned())
  }

  // ── Wearables ─────────────────────────────────────────────────────────────

  async fn connect_wearable(
    &self,
    user_id: Uuid,
    provider: String,
    details: Fields,
  ) -> Result<WearableConnection> {
    let now = Utc::now();
    self
      .modify(keys::wearables(user_id), move |list: &mut Vec<WearableConnection>| {
        // A reconnect keeps the connection's identity and creation time.
        let previous = list
          .iter()
          .position(|c| c.provider == provider)
          .map(|i| list.remove(i));
        let connection = WearableConnection {
          id: previous.as_ref().map_or_else(Uuid::new_v4, |c| c.id),
          user_id,
          provider,
          is_connected: true,
          last_sync_at: Some(now),
          created_at: previous.and_then(|c| c.created_at).or(Some(now)),
          extra: details,
        };
        list.push(connection.clone());
        Ok(connection)
      })
      .await
  }

  async fn get_wearable_connections(&self, user_id: Uuid) -> Result<Vec<WearableConnection>> {
    self.list(keys::wearables(user_id)).await
  }

  async fn mark_wearable_synced(
    &self,
    user_id: Uuid,
    provider: String,
  ) -> Result<Option<WearableConnection>> {
    let now = Utc::now();
    self
      .modify(keys::wearables(user_id), move |list: &mut Vec<WearableConnection>| {
        Ok(list.iter_mut().find(|c| c.provider == provider).map(|c| {
          c.last_sync_at = Some(now);
          c.clone()
        }))
      })
      .await
  }

  // ── Daily metrics ─────────────────────────────────────────────────────────

  async fn save_daily_metrics(
    &self,
    user_id: Uuid,
    date: NaiveDate,
    input: DailyMetricsInput,
  ) -> Result<DailyHealthMetrics> {
    let now = Utc::now();
    self
      .modify(keys::daily(user_id, date), move |slot: &mut Option<DailyHealthMetrics>| {
        // An overwrite keeps the row's identity.
        let id = slot.as_ref().map_or_else(Uuid::new_v4, |row| row.id);
        let row = input.into_metrics(id, user_id, date, now);
        *slot = Some(row.clone());
        Ok(row)
      })
      .await
  }

  async fn get_daily_metrics(
    &self,
    user_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<DailyHealthMetrics>> {
    let mut rows = self.daily_range(user_id, start, end).await?;
    rows.reverse();
    Ok(rows)
  }

  async fn get_latest_daily_metrics(&self, user_id: Uuid) -> Result<Option<DailyHealthMetrics>> {
    let today = Utc::now().date_naive();
    self.get(keys::daily(user_id, today)).await
  }

  // ── Hourly metrics ────────────────────────────────────────────────────────

  async fn save_hourly_metrics(
    &self,
    user_id: Uuid,
    input: HourlyMetricsInput,
  ) -> Result<HourlyHealthMetrics> {
    let reading = input.into_metrics(Uuid::new_v4(), user_id, Utc::now());
    self.append(keys::hourly(user_id), reading).await
  }

  async fn get_hourly_metrics(
    &self,
    user_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Vec<HourlyHealthMetrics>> {
    let all: Vec<HourlyHealthMetrics> = self.list(keys::hourly(user_id)).await?;
    let in_range: Vec<HourlyHealthMetrics> = all
      .into_iter()
      .filter(|h| start <= h.timestamp && h.timestamp <= end)
      .collect();
    Ok(newest_first(in_range, |h| h.timestamp))
  }

  // ── Supplements ───────────────────────────────────────────────────────────

  async fn add_supplement(&self, user_id: Uuid, input: NewSupplement) -> Result<Supplement> {
    let supplement = input.into_supplement(Uuid::new_v4(), user_id, Utc::now());
    self.append(keys::supplements(user_id), supplement).await
  }

  async fn get_supplements(&self, user_id: Uuid) -> Result<Vec<Supplement>> {
    let all: Vec<Supplement> = self.list(keys::supplements(user_id)).await?;
    Ok(all.into_iter().filter(|s| s.is_active).collect())
  }

  async fn deactivate_supplement(
    &self,
    user_id: Uuid,
    supplement_id: Uuid,
  ) -> Result<Option<Supplement>> {
    self
      .modify(keys::supplements(user_id), move |list: &mut Vec<Supplement>| {
        Ok(list.iter_mut().find(|s| s.id == supplement_id).map(|s| {
          s.is_active = false;
          s.clone()
        }))
      })
      .await
  }

  async fn log_supplement(
    &self,
    user_id: Uuid,
    supplement_id: Uuid,
    input: NewSupplementLog,
  ) -> Result<SupplementLog> {
    let log = input.into_log(Uuid::new_v4(), user_id, supplement_id, Utc::now());
    self.append(keys::supplement_logs(user_id), log).await
  }

  async fn get_supplement_logs(&self, user_id: Uuid, limit: usize) -> Result<Vec<SupplementLog>> {
    let all = self.list(keys::supplement_logs(user_id)).await?;
    let mut sorted = newest_first(all, |l: &SupplementLog| l.taken_at);
    sorted.truncate(limit);
    Ok(sorted)
  }

  // ── Digital twin ──────────────────────────────────────────────────────────

  async fn create_digital_twin(&self, user_id: Uuid, scores: OrganScores) -> Result<DigitalTwin> {
    let now = Utc::now();
    let twin = DigitalTwin {
      id: Some(Uuid::new_v4()),
      scores,
      last_updated: Some(now),
      created_at: Some(now),
      ..DigitalTwin::with_defaults(user_id)
    };

    let stored = twin.clone();
    self
      .modify(keys::twin(user_id), move |slot: &mut Option<DigitalTwin>| {
        *slot = Some(stored);
        Ok(())
      })
      .await?;
    Ok(twin)
  }

  async fn get_digital_twin(&self, user_id: Uuid) -> Result<Option<DigitalTwin>> {
    let stored: Option<DigitalTwin> = self.get(keys::twin(user_id)).await?;
    Ok(Some(stored.unwrap_or_else(|| DigitalTwin::with_defaults(user_id))))
  }

  /// Updating a user without a stored twin first materialises the default
  /// twin, so the update always lands.
  async fn update_digital_twin(
    &self,
    user_id: Uuid,
    update: TwinUpdate,
  ) -> Result<Option<DigitalTwin>> {
    let now = Utc::now();
    self
      .modify(keys::twin(user_id), move |slot: &mut Option<DigitalTwin>| {
        let twin = slot.get_or_insert_with(|| DigitalTwin {
          id: Some(Uuid::new_v4()),
          created_at: Some(now),
          ..DigitalTwin::with_defaults(user_id)
        });
        twin.apply(update, now);
        Ok(Some(twin.clone()))
      })
      .await
  }

  // ── Insights ──────────────────────────────────────────────────────────────

  async fn create_insight(&self, user_id: Uuid, input: NewInsight) -> Result<Insight> {
    let insight = input.into_insight(Uuid::new_v4(), user_id, Utc::now());
    self.append(keys::insights(user_id), insight).await
  }

  async fn get_insights(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Insight>> {
    let all: Vec<Insight> = self.list(keys::insights(user_id)).await?;
    let kept: Vec<Insight> = all.into_iter().filter(|i| !unread_only || !i.is_read).collect();
    Ok(newest_first(kept, |i| i.generated_at))
  }

  async fn mark_insight_read(&self, insight_id: Uuid) -> Result<Option<Insight>> {
    self
      .modify_first(keys::INSIGHTS_PREFIX, move |list: &mut Vec<Insight>| {
        list.iter_mut().find(|i| i.id == insight_id).map(|i| {
          i.is_read = true;
          i.clone()
        })
      })
      .await
  }

  // ── Goals ─────────────────────────────────────────────────────────────────

  async fn create_goal(&self, user_id: Uuid, input: NewGoal) -> Result<HealthGoal> {
    let goal = input.into_goal(Uuid::new_v4(), user_id, Utc::now());
    self.append(keys::goals(user_id), goal).await
  }

  async fn get_goals(&self, user_id: Uuid) -> Result<Vec<HealthGoal>> {
    let all = self.list(keys::goals(user_id)).await?;
    Ok(newest_first(all, |g: &HealthGoal| g.created_at))
  }

  async fn update_goal_progress(
    &self,
    goal_id: Uuid,
    current_value: f64,
    progress_percentage: f64,
  ) -> Result<Option<HealthGoal>> {
    let now = Utc::now();
    self
      .modify_first(keys::GOALS_PREFIX, move |list: &mut Vec<HealthGoal>| {
        list.iter_mut().find(|g| g.id == goal_id).map(|g| {
          g.record_progress(current_value, progress_percentage, now);
          g.clone()
        })
      })
      .await
  }

  // ── Lab results ───────────────────────────────────────────────────────────

  async fn save_lab_result(&self, user_id: Uuid, input: NewLabResult) -> Result<LabResult> {
    let result = input.into_result(Uuid::new_v4(), user_id, Utc::now());
    self.append(keys::labs(user_id), result).await
  }

  async fn get_lab_results(&self, user_id: Uuid) -> Result<Vec<LabResult>> {
    let all = self.list(keys::labs(user_id)).await?;
    Ok(newest_first(all, |r: &LabResult| r.test_date))
  }

  // ── Aggregates ────────────────────────────────────────────────────────────

  async fn weekly_summary(&self, user_id: Uuid) -> Result<Option<WeeklySummary>> {
    let (start, end) = metrics::trailing_window(Utc::now().date_naive(), WEEK_DAYS);
    let rows = self.daily_range(user_id, start, end).await?;
    Ok(metrics::summarize_week(start, &rows))
  }

  async fn health_score_history(&self, user_id: Uuid, days: u32) -> Result<Vec<HealthScorePoint>> {
    let (start, end) = metrics::trailing_window(Utc::now().date_naive(), i64::from(days));
    let rows = self.daily_range(user_id, start, end).await?;
    Ok(metrics::score_history(&rows))
  }
}
