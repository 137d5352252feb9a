//! `RestClient` against an in-process mock backend that records every
//! request and answers from a queue of canned replies. With no reply queued,
//! POSTed rows are kept per path and served back to later GETs.

use std::{
  collections::{HashMap, VecDeque},
  sync::{Arc, Mutex},
};

use axum::{
  Router,
  body::Bytes,
  extract::{Query, State},
  http::{HeaderMap, Method, StatusCode, Uri},
};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use uuid::Uuid;
use vitals_core::{
  Fields,
  goal::NewGoal,
  insight::{NewInsight, Severity},
  metrics::DailyMetricsInput,
  store::HealthStore,
  twin::TwinUpdate,
  user::NewUser,
  wearable::WearableSample,
  workflow::{self, SyncError},
};

use crate::{Error, RestClient, RestConfig};

const KEY: &str = "test-anon-key";

#[derive(Debug, Clone)]
struct Recorded {
  method:  Method,
  path:    String,
  query:   Vec<(String, String)>,
  headers: HeaderMap,
  body:    Option<Value>,
}

impl Recorded {
  fn header(&self, name: &str) -> Option<&str> {
    self.headers.get(name).and_then(|v| v.to_str().ok())
  }

  fn param(&self, name: &str) -> Vec<&str> {
    self
      .query
      .iter()
      .filter(|(k, _)| k == name)
      .map(|(_, v)| v.as_str())
      .collect()
  }
}

#[derive(Clone, Default)]
struct Mock {
  log:     Arc<Mutex<Vec<Recorded>>>,
  replies: Arc<Mutex<VecDeque<(StatusCode, String)>>>,
  rows:    Arc<Mutex<HashMap<String, Vec<Value>>>>,
}

impl Mock {
  fn reply(&self, status: StatusCode, body: impl Into<String>) -> &Self {
    self.replies.lock().unwrap().push_back((status, body.into()));
    self
  }

  fn ok(&self, body: Value) -> &Self { self.reply(StatusCode::OK, body.to_string()) }

  fn requests(&self) -> Vec<Recorded> { self.log.lock().unwrap().clone() }

  fn only_request(&self) -> Recorded {
    let requests = self.requests();
    assert_eq!(requests.len(), 1, "expected one request, got {requests:#?}");
    requests.into_iter().next().unwrap()
  }
}

async fn handle(
  State(mock): State<Mock>,
  method: Method,
  uri: Uri,
  headers: HeaderMap,
  Query(query): Query<Vec<(String, String)>>,
  body: Bytes,
) -> (StatusCode, String) {
  let path = uri.path().to_owned();
  let body: Option<Value> = serde_json::from_slice(&body).ok();
  mock.log.lock().unwrap().push(Recorded {
    method: method.clone(),
    path: path.clone(),
    query,
    headers,
    body: body.clone(),
  });

  if let Some(reply) = mock.replies.lock().unwrap().pop_front() {
    return reply;
  }

  let mut rows = mock.rows.lock().unwrap();
  let table = rows.entry(path).or_default();
  match (method, body) {
    (Method::POST, Some(Value::Object(mut row))) => {
      row.entry("id").or_insert_with(|| json!(Uuid::new_v4()));
      table.push(Value::Object(row.clone()));
      (StatusCode::CREATED, json!([row]).to_string())
    }
    (Method::GET, _) => (StatusCode::OK, Value::Array(table.clone()).to_string()),
    _ => (StatusCode::OK, "[]".to_owned()),
  }
}

async fn serve(mock: &Mock, use_summary_view: bool) -> RestClient {
  let app = Router::new().fallback(handle).with_state(mock.clone());
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
    .await
    .expect("bind mock backend");
  let addr = listener.local_addr().expect("mock address");
  tokio::spawn(async move { axum::serve(listener, app).await.expect("serve mock") });

  let mut config = RestConfig::new(format!("http://{addr}/"), KEY);
  config.use_summary_view = use_summary_view;
  RestClient::new(config).expect("client")
}

fn daily_row(user: Uuid, date: &str, steps: Option<i64>, score: Option<i64>) -> Value {
  json!({
    "id": Uuid::new_v4(),
    "user_id": user,
    "date": date,
    "steps": steps,
    "overall_score": score,
    "sources": ["oura"],
  })
}

// ─── Wire format ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn every_request_carries_credentials_and_json_type() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;
  let id = Uuid::new_v4();

  assert!(client.get_user(id).await.unwrap().is_none());

  let req = mock.only_request();
  assert_eq!(req.method, Method::GET);
  assert_eq!(req.path, "/rest/v1/users");
  assert_eq!(req.header("apikey"), Some(KEY));
  assert_eq!(req.header("authorization"), Some(format!("Bearer {KEY}").as_str()));
  assert_eq!(req.header("content-type"), Some("application/json"));
  assert_eq!(req.param("id"), vec![format!("eq.{id}")]);
}

#[tokio::test]
async fn ping_is_a_minimal_user_read() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;

  client.ping().await.unwrap();

  let req = mock.only_request();
  assert_eq!(req.path, "/rest/v1/users");
  assert_eq!(req.param("select"), vec!["id"]);
  assert_eq!(req.param("limit"), vec!["1"]);
}

#[tokio::test]
async fn daily_range_encodes_both_bounds_and_order() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;
  let user = Uuid::new_v4();

  let start = "2026-03-01".parse().unwrap();
  let end = "2026-03-07".parse().unwrap();
  client.get_daily_metrics(user, start, end).await.unwrap();

  let req = mock.only_request();
  assert_eq!(req.path, "/rest/v1/daily_health_metrics");
  assert_eq!(req.param("user_id"), vec![format!("eq.{user}")]);
  assert_eq!(req.param("date"), vec!["gte.2026-03-01", "lte.2026-03-07"]);
  assert_eq!(req.param("order"), vec!["date.desc"]);
}

#[tokio::test]
async fn latest_analysis_asks_for_one_row_newest_first() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;

  let latest = client.get_latest_biomarker_analysis(Uuid::new_v4()).await.unwrap();
  assert!(latest.is_none());

  let req = mock.only_request();
  assert_eq!(req.param("order"), vec!["analysis_date.desc"]);
  assert_eq!(req.param("limit"), vec!["1"]);
}

#[tokio::test]
async fn unread_insights_filter_on_read_flag() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;

  client.get_insights(Uuid::new_v4(), true).await.unwrap();
  client.get_insights(Uuid::new_v4(), false).await.unwrap();

  let requests = mock.requests();
  assert_eq!(requests[0].param("is_read"), vec!["eq.false"]);
  assert!(requests[1].param("is_read").is_empty());
  assert_eq!(requests[1].param("order"), vec!["generated_at.desc"]);
}

// ─── Writes ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn post_stamps_the_record_and_accepts_a_single_object() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;
  let user = Uuid::new_v4();
  let id = Uuid::new_v4();

  mock.ok(json!({
    "id": id,
    "user_id": user,
    "title": "Welcome to your health dashboard",
    "severity": "info",
    "is_read": false,
    "generated_at": "2026-03-01T08:00:00Z",
  }));
  let insight = client.create_insight(user, NewInsight::welcome()).await.unwrap();
  assert_eq!(insight.id, id);

  let req = mock.only_request();
  assert_eq!(req.method, Method::POST);
  assert_eq!(req.path, "/rest/v1/ai_insights");
  assert_eq!(req.header("prefer"), Some("return=representation"));
  let body = req.body.unwrap();
  assert_eq!(body["user_id"], json!(user));
  assert_eq!(body["is_read"], json!(false));
  assert_eq!(body["category"], json!("onboarding"));
  assert!(body["generated_at"].is_string());
}

#[tokio::test]
async fn daily_metrics_are_upserted_on_user_and_date() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;
  let user = Uuid::new_v4();

  mock.ok(json!([daily_row(user, "2026-03-02", Some(9000), None)]));
  let input = DailyMetricsInput { steps: Some(9000), ..Default::default() };
  let row = client
    .save_daily_metrics(user, "2026-03-02".parse().unwrap(), input)
    .await
    .unwrap();
  assert_eq!(row.steps, Some(9000));

  let req = mock.only_request();
  assert_eq!(req.param("on_conflict"), vec!["user_id,date"]);
  assert_eq!(
    req.header("prefer"),
    Some("resolution=merge-duplicates,return=representation")
  );
  let body = req.body.unwrap();
  assert_eq!(body["date"], json!("2026-03-02"));
  assert_eq!(body["steps"], json!(9000));
  assert!(body.get("calories_burned").is_none());
}

#[tokio::test]
async fn empty_write_response_is_an_error() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;

  mock.reply(StatusCode::CREATED, "");
  let err = client.create_user(NewUser::new("ada@example.com")).await.unwrap_err();
  assert!(matches!(err, Error::EmptyResponse(ref path) if path == "/users"));
}

#[tokio::test]
async fn patch_without_matches_is_none() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;
  let insight = Uuid::new_v4();

  assert!(client.mark_insight_read(insight).await.unwrap().is_none());

  let req = mock.only_request();
  assert_eq!(req.method, Method::PATCH);
  assert_eq!(req.param("id"), vec![format!("eq.{insight}")]);
  assert_eq!(req.body.unwrap(), json!({ "is_read": true }));
}

#[tokio::test]
async fn created_user_reads_back_unchanged() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;

  let mut input = NewUser::new("ada@example.com");
  input.full_name = Some("Ada Lovelace".into());
  let created = client.create_user(input).await.unwrap();
  let fetched = client.get_user(created.id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
  assert_eq!(fetched.full_name.as_deref(), Some("Ada Lovelace"));

  let requests = mock.requests();
  assert_eq!(requests[1].param("id"), vec![format!("eq.{}", created.id)]);
}

#[tokio::test]
async fn created_goal_reads_back_unchanged() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;
  let user = Uuid::new_v4();

  let input = NewGoal {
    title:         "Sleep eight hours".into(),
    unit:          Some("hours".into()),
    target_value:  Some(8.0),
    current_value: None,
    extra:         Fields::new(),
  };
  let created = client.create_goal(user, input).await.unwrap();
  let goals = client.get_goals(user).await.unwrap();
  assert_eq!(goals, vec![created]);
}

#[tokio::test]
async fn reconnecting_a_wearable_leaves_created_at_alone() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;
  let user = Uuid::new_v4();

  mock.ok(json!([{
    "id": Uuid::new_v4(),
    "user_id": user,
    "provider": "oura",
    "is_connected": true,
    "created_at": "2025-01-01T00:00:00Z",
  }]));
  let connection = client.connect_wearable(user, "oura".into(), Fields::new()).await.unwrap();
  assert_eq!(connection.created_at, Some("2025-01-01T00:00:00Z".parse().unwrap()));

  let req = mock.only_request();
  assert_eq!(req.param("on_conflict"), vec!["user_id,provider"]);
  let body = req.body.unwrap();
  assert!(body.get("created_at").is_none());
  assert!(body["last_sync_at"].is_string());
  assert_eq!(body["is_connected"], json!(true));
}

#[tokio::test]
async fn twin_update_patches_only_given_scores() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;
  let user = Uuid::new_v4();

  mock.ok(json!([{ "id": Uuid::new_v4(), "user_id": user, "heart_health": 91.4 }]));
  let update = TwinUpdate { heart_health: Some(91), ..Default::default() };
  let twin = client.update_digital_twin(user, update).await.unwrap().unwrap();
  assert_eq!(twin.scores.heart_health, 91);

  let req = mock.only_request();
  assert_eq!(req.method, Method::PATCH);
  assert_eq!(req.path, "/rest/v1/digital_twins");
  assert_eq!(req.param("user_id"), vec![format!("eq.{user}")]);
  assert_eq!(req.header("prefer"), Some("return=representation"));
  let body = req.body.unwrap();
  assert_eq!(body["heart_health"], json!(91));
  assert!(body.get("lung_health").is_none());
  assert!(body["last_updated"].is_string());
}

#[tokio::test]
async fn hourly_range_sends_rfc3339_bounds() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;
  let user = Uuid::new_v4();

  let start: DateTime<Utc> = "2026-03-01T06:00:00Z".parse().unwrap();
  let end: DateTime<Utc> = "2026-03-01T18:30:00Z".parse().unwrap();
  client.get_hourly_metrics(user, start, end).await.unwrap();

  let req = mock.only_request();
  assert_eq!(req.path, "/rest/v1/hourly_health_metrics");
  assert_eq!(req.param("timestamp"), vec![
    "gte.2026-03-01T06:00:00.000Z",
    "lte.2026-03-01T18:30:00.000Z",
  ]);
  assert_eq!(req.param("order"), vec!["timestamp.desc"]);
}

#[tokio::test]
async fn deactivating_a_supplement_is_scoped_to_its_owner() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;
  let user = Uuid::new_v4();
  let supplement = Uuid::new_v4();

  assert!(client.deactivate_supplement(user, supplement).await.unwrap().is_none());

  let req = mock.only_request();
  assert_eq!(req.method, Method::PATCH);
  assert_eq!(req.path, "/rest/v1/supplements");
  assert_eq!(req.param("id"), vec![format!("eq.{supplement}")]);
  assert_eq!(req.param("user_id"), vec![format!("eq.{user}")]);
  assert_eq!(req.body.unwrap(), json!({ "is_active": false }));
}

// ─── Pipeline rows ───────────────────────────────────────────────────────────

#[tokio::test]
async fn insights_with_unknown_severity_or_null_title_still_list() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;
  let user = Uuid::new_v4();

  mock.ok(json!([
    {
      "id": Uuid::new_v4(),
      "user_id": user,
      "title": null,
      "message": "Resting heart rate trending up",
      "severity": "warning",
      "is_read": false,
      "generated_at": "2026-03-02T08:00:00Z",
      "confidence": 0.82,
    },
    {
      "id": Uuid::new_v4(),
      "user_id": user,
      "title": "Great sleep streak",
      "severity": "low",
      "generated_at": "2026-03-01T08:00:00Z",
    },
  ]));
  let insights = client.get_insights(user, false).await.unwrap();

  assert_eq!(insights.len(), 2);
  assert_eq!(insights[0].title, "");
  assert_eq!(insights[0].severity, Severity::Other("warning".into()));
  assert_eq!(insights[0].extra["confidence"], json!(0.82));
  assert_eq!(insights[1].severity, Severity::Low);
}

#[tokio::test]
async fn goals_without_titles_still_list() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;
  let user = Uuid::new_v4();

  mock.ok(json!([{ "id": Uuid::new_v4(), "user_id": user, "title": null, "target_value": 5 }]));
  let goals = client.get_goals(user).await.unwrap();
  assert_eq!(goals[0].title, "");
  assert_eq!(goals[0].target_value, Some(5.0));
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn json_error_body_surfaces_its_message() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;

  mock.reply(
    StatusCode::CONFLICT,
    r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#,
  );
  let err = client.create_user(NewUser::new("ada@example.com")).await.unwrap_err();
  match err {
    Error::Request { status, path, message } => {
      assert_eq!(status, 409);
      assert_eq!(path, "/users");
      assert_eq!(message, "duplicate key value violates unique constraint");
    }
    other => panic!("expected a request error, got {other:?}"),
  }
}

#[tokio::test]
async fn plain_text_error_body_surfaces_verbatim() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;

  mock.reply(StatusCode::BAD_GATEWAY, "upstream connect error");
  let err = client.get_goals(Uuid::new_v4()).await.unwrap_err();
  assert_eq!(err.status(), Some(502));
  assert!(matches!(err, Error::Request { ref message, .. } if message == "upstream connect error"));
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn weekly_summary_is_computed_from_daily_rows() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;
  let user = Uuid::new_v4();

  mock.ok(json!([
    daily_row(user, "2026-03-03", Some(8000), Some(80)),
    daily_row(user, "2026-03-02", None, Some(71)),
    daily_row(user, "2026-03-01", Some(10001), None),
  ]));
  let summary = client.weekly_summary(user).await.unwrap().unwrap();

  assert_eq!(summary.days_logged, 3);
  assert_eq!(summary.avg_steps, 9001);
  assert_eq!(summary.avg_health_score, 76);
  assert_eq!(summary.avg_hrv, 0);
  assert_eq!(mock.only_request().path, "/rest/v1/daily_health_metrics");
}

#[tokio::test]
async fn weekly_summary_without_rows_is_none() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;
  assert!(client.weekly_summary(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn missing_summary_view_falls_back_to_computing() {
  let mock = Mock::default();
  let client = serve(&mock, true).await;
  let user = Uuid::new_v4();

  mock
    .reply(StatusCode::NOT_FOUND, r#"{"message":"relation does not exist"}"#)
    .ok(json!([daily_row(user, "2026-03-03", Some(5000), Some(60))]));
  let summary = client.weekly_summary(user).await.unwrap().unwrap();
  assert_eq!(summary.avg_steps, 5000);

  let paths: Vec<_> = mock.requests().into_iter().map(|r| r.path).collect();
  assert_eq!(paths, vec![
    "/rest/v1/weekly_health_summary",
    "/rest/v1/daily_health_metrics",
  ]);
}

#[tokio::test]
async fn summary_view_row_is_returned_as_is() {
  let mock = Mock::default();
  let client = serve(&mock, true).await;

  mock.ok(json!([{
    "week_start": "2026-02-24",
    "avg_steps": 7400,
    "avg_sleep_minutes": 431,
    "avg_resting_hr": 57,
    "avg_hrv": 49,
    "avg_health_score": 78,
    "days_logged": 7,
  }]));
  let summary = client.weekly_summary(Uuid::new_v4()).await.unwrap().unwrap();
  assert_eq!(summary.avg_sleep_minutes, 431);
  assert_eq!(mock.only_request().param("limit"), vec!["1"]);
}

#[tokio::test]
async fn score_history_is_oldest_first() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;
  let user = Uuid::new_v4();

  mock.ok(json!([
    daily_row(user, "2026-03-03", None, Some(82)),
    daily_row(user, "2026-03-01", None, Some(70)),
  ]));
  let points = client.health_score_history(user, 30).await.unwrap();
  let scores: Vec<_> = points.iter().map(|p| p.health_score).collect();
  assert_eq!(scores, vec![Some(70), Some(82)]);
  assert_eq!(mock.only_request().param("order"), vec!["date.asc"]);
}

#[tokio::test]
async fn score_history_over_every_day_starts_at_earliest_date() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;

  let points = client.health_score_history(Uuid::new_v4(), u32::MAX).await.unwrap();
  assert!(points.is_empty());

  let today = Utc::now().date_naive();
  let req = mock.only_request();
  assert_eq!(req.param("date"), vec![
    format!("gte.{}", chrono::NaiveDate::MIN),
    format!("lte.{today}"),
  ]);
}

// ─── Sync workflow ───────────────────────────────────────────────────────────

#[tokio::test]
async fn sync_reports_saved_metrics_when_marking_fails() {
  let mock = Mock::default();
  let client = serve(&mock, false).await;
  let user = Uuid::new_v4();
  let today = Utc::now().date_naive().to_string();

  mock
    .ok(json!([daily_row(user, &today, Some(4200), None)]))
    .reply(StatusCode::INTERNAL_SERVER_ERROR, "boom");

  let sample = WearableSample { steps: Some(4200), ..Default::default() };
  let err = workflow::sync_wearable(&client, user, "oura", sample)
    .await
    .unwrap_err();

  match err {
    SyncError::MarkSynced { metrics, source } => {
      assert_eq!(metrics.steps, Some(4200));
      assert_eq!(source.status(), Some(500));
    }
    other => panic!("expected MarkSynced, got {other:?}"),
  }

  let requests = mock.requests();
  assert_eq!(requests.len(), 2);
  assert_eq!(requests[0].body.as_ref().unwrap()["sources"], json!(["oura"]));
  assert_eq!(requests[1].method, Method::PATCH);
  assert_eq!(requests[1].param("provider"), vec!["eq.oura"]);
}
