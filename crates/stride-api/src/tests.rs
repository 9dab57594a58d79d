//! Router-level tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use stride_core::{
  kpi::{CategoryId, NewCategory, NewUser, UserId},
  store::KpiStore,
  tracker::KpiTracker,
};
use stride_store_sqlite::SqliteStore;
use tower::ServiceExt as _;

use crate::api_router;

async fn seeded_router() -> (Router, CategoryId, UserId) {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let category = store
    .insert_category(NewCategory {
      name:        "Sales".into(),
      description: None,
    })
    .await
    .unwrap();
  let user = store
    .insert_user(NewUser {
      username: "alice".into(),
      email:    "alice@example.com".into(),
    })
    .await
    .unwrap();
  let tracker = Arc::new(KpiTracker::new(store));
  (api_router(tracker), category.category_id, user.user_id)
}

async fn request(
  app: Router,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let builder = Request::builder().method(method).uri(uri);
  let req = match body {
    Some(v) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(v.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let resp = app.oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

/// A KPI body whose window straddles the present, so a fresh KPI with zero
/// progress classifies as On Track.
fn kpi_body(category: CategoryId, user: UserId) -> Value {
  let now = Utc::now();
  json!({
    "title": "Quarterly revenue",
    "description": "Gross revenue for the quarter",
    "category_id": category,
    "target_value": 100.0,
    "assigned_user": user,
    "start_date": (now - Duration::hours(1)).to_rfc3339(),
    "end_date": (now + Duration::days(30)).to_rfc3339(),
  })
}

async fn create_kpi(app: &Router, category: CategoryId, user: UserId) -> i64 {
  let (status, body) =
    request(app.clone(), "POST", "/kpis", Some(kpi_body(category, user))).await;
  assert_eq!(status, StatusCode::CREATED);
  body["kpi_id"].as_i64().unwrap()
}

// ── /kpis ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_get_round_trip() {
  let (app, category, user) = seeded_router().await;

  let (status, body) =
    request(app.clone(), "POST", "/kpis", Some(kpi_body(category, user))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["title"], "Quarterly revenue");
  assert_eq!(body["status"], "On Track");
  assert_eq!(body["progress_percentage"], 0);
  assert_eq!(body["category_name"], "Sales");
  assert_eq!(body["assigned_user_name"], "alice");

  let id = body["kpi_id"].as_i64().unwrap();
  let (status, detail) =
    request(app, "GET", &format!("/kpis/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(detail["kpi"]["kpi_id"], id);
  assert!(detail["recent_updates"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn create_with_unknown_category_is_bad_request() {
  let (app, _, user) = seeded_router().await;

  let mut body = kpi_body(999, user);
  body["category_id"] = json!(999);
  let (status, resp) = request(app, "POST", "/kpis", Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(resp["error"].is_string());
}

#[tokio::test]
async fn get_missing_kpi_is_not_found() {
  let (app, _, _) = seeded_router().await;
  let (status, _) = request(app, "GET", "/kpis/42", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_sort_field_is_bad_request() {
  let (app, _, _) = seeded_router().await;
  let (status, _) = request(app, "GET", "/kpis?sort_by=bogus", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_removes_the_kpi() {
  let (app, category, user) = seeded_router().await;
  let id = create_kpi(&app, category, user).await;

  let (status, _) =
    request(app.clone(), "DELETE", &format!("/kpis/{id}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, _) = request(app, "GET", &format!("/kpis/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── /kpis/{id}/value ────────────────────────────────────────────────────────

#[tokio::test]
async fn value_update_mutates_and_appends_history() {
  let (app, category, user) = seeded_router().await;
  let id = create_kpi(&app, category, user).await;

  let (status, body) = request(
    app.clone(),
    "PUT",
    &format!("/kpis/{id}/value"),
    Some(json!({
      "updated_value": 50.0,
      "comment": "halfway there",
      "updated_by": user,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["kpi"]["previous_value"], 0.0);
  assert_eq!(body["kpi"]["actual_value"], 50.0);
  assert_eq!(body["kpi"]["progress_percentage"], 50);
  assert_eq!(body["update"]["comment"], "halfway there");
  assert_eq!(body["update"]["kpi_title"], "Quarterly revenue");
  assert_eq!(body["update"]["updated_by_name"], "alice");

  let (status, history) =
    request(app, "GET", &format!("/kpis/{id}/updates"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn value_update_on_missing_kpi_is_not_found() {
  let (app, _, user) = seeded_router().await;
  let (status, _) = request(
    app,
    "PUT",
    "/kpis/42/value",
    Some(json!({ "updated_value": 1.0, "updated_by": user })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn negative_value_update_is_bad_request() {
  let (app, category, user) = seeded_router().await;
  let id = create_kpi(&app, category, user).await;

  let (status, _) = request(
    app,
    "PUT",
    &format!("/kpis/{id}/value"),
    Some(json!({ "updated_value": -5.0, "updated_by": user })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Collections ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn status_path_takes_display_strings() {
  let (app, category, user) = seeded_router().await;
  create_kpi(&app, category, user).await;

  let (status, kpis) =
    request(app.clone(), "GET", "/kpis/status/On%20Track", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(kpis.as_array().unwrap().len(), 1);

  let (status, _) = request(app, "GET", "/kpis/status/bogus", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn by_user_rejects_unknown_users() {
  let (app, category, user) = seeded_router().await;
  create_kpi(&app, category, user).await;

  let (status, body) =
    request(app.clone(), "GET", &format!("/kpis/user/{user}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["user"]["username"], "alice");
  assert_eq!(body["kpis"].as_array().unwrap().len(), 1);

  let (status, _) = request(app, "GET", "/kpis/user/999", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── /dashboard ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn overview_counts_and_achievement() {
  let (app, category, user) = seeded_router().await;
  create_kpi(&app, category, user).await;

  let mut achieved = kpi_body(category, user);
  achieved["title"] = json!("Signed contracts");
  achieved["actual_value"] = json!(100.0);
  let (status, _) = request(app.clone(), "POST", "/kpis", Some(achieved)).await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, overview) =
    request(app, "GET", "/dashboard/overview", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(overview["total_kpis"], 2);
  assert_eq!(overview["on_track"], 2);
  assert_eq!(overview["achieved_kpis"], 1);
  assert_eq!(overview["achievement_percentage"], 50);
  assert_eq!(overview["overdue_kpis"], 0);
}

#[tokio::test]
async fn recent_updates_honours_the_limit() {
  let (app, category, user) = seeded_router().await;
  let id = create_kpi(&app, category, user).await;

  for value in [10.0, 20.0, 30.0] {
    let (status, _) = request(
      app.clone(),
      "PUT",
      &format!("/kpis/{id}/value"),
      Some(json!({ "updated_value": value, "updated_by": user })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
  }

  let (status, updates) =
    request(app, "GET", "/dashboard/recent-updates?limit=2", None).await;
  assert_eq!(status, StatusCode::OK);
  let updates = updates.as_array().unwrap();
  assert_eq!(updates.len(), 2);
  assert_eq!(updates[0]["updated_value"], 30.0);
}
