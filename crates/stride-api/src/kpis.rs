//! Handlers for `/kpis` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/kpis` | Filters: `status`, `assigned_user`, `category_id`, `search`; sort via `sort_by`/`sort_order` |
//! | `POST`   | `/kpis` | Body: [`CreateBody`]; returns 201 + decorated KPI |
//! | `GET`    | `/kpis/overdue` | Deadline passed, status not yet Off Track |
//! | `GET`    | `/kpis/user/{user_id}` | 404 if the user is unknown |
//! | `GET`    | `/kpis/status/{status}` | Path segment is the display string, e.g. `On Track` |
//! | `GET`    | `/kpis/{id}` | Decorated KPI + five most recent updates |
//! | `PUT`    | `/kpis/{id}` | Partial edit; value change recomputes status |
//! | `DELETE` | `/kpis/{id}` | Cascades to update records |
//! | `PUT`    | `/kpis/{id}/value` | Tracked value update; appends a history record |
//! | `GET`    | `/kpis/{id}/updates` | Full history, newest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stride_core::{
  kpi::{CategoryId, KpiId, KpiPatch, NewKpi, User, UserId},
  status::Status,
  store::{KpiQuery, KpiStore, SortField, SortOrder},
  tracker::KpiTracker,
};

use crate::{
  error::ApiError,
  views::{self, KpiView, UpdateView, store_err},
};

/// How many history entries ride along on `GET /kpis/{id}`.
const RECENT_UPDATES: usize = 5;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub status:        Option<Status>,
  pub assigned_user: Option<UserId>,
  pub category_id:   Option<CategoryId>,
  /// Substring match over title and description.
  pub search:        Option<String>,
  /// One of `created_at`, `title`, `end_date`, `target_value`.
  pub sort_by:       Option<String>,
  /// `asc` or `desc`.
  pub sort_order:    Option<String>,
}

fn parse_sort(
  sort_by: Option<&str>,
  sort_order: Option<&str>,
) -> Result<(SortField, SortOrder), ApiError> {
  let field = match sort_by {
    None | Some("created_at") => SortField::CreatedAt,
    Some("title") => SortField::Title,
    Some("end_date") => SortField::EndDate,
    Some("target_value") => SortField::TargetValue,
    Some(other) => {
      return Err(ApiError::BadRequest(format!("unknown sort_by: {other:?}")));
    }
  };
  let order = match sort_order {
    None | Some("desc") => SortOrder::Desc,
    Some("asc") => SortOrder::Asc,
    Some(other) => {
      return Err(ApiError::BadRequest(format!(
        "unknown sort_order: {other:?}"
      )));
    }
  };
  Ok((field, order))
}

/// `GET /kpis[?status=...][&assigned_user=...][&category_id=...][&search=...]`
pub async fn list<S: KpiStore>(
  State(tracker): State<Arc<KpiTracker<S>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<KpiView>>, ApiError> {
  let (sort_by, sort_order) =
    parse_sort(params.sort_by.as_deref(), params.sort_order.as_deref())?;
  let query = KpiQuery {
    status: params.status,
    assigned_user: params.assigned_user,
    category_id: params.category_id,
    search: params.search,
    sort_by,
    sort_order,
  };

  let store = tracker.store();
  let kpis = store.list_kpis(&query).await.map_err(store_err)?;
  Ok(Json(views::kpi_views(store, kpis, Utc::now()).await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /kpis`.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub title:         String,
  pub description:   Option<String>,
  pub category_id:   CategoryId,
  pub target_value:  f64,
  #[serde(default)]
  pub actual_value:  f64,
  pub assigned_user: UserId,
  pub start_date:    DateTime<Utc>,
  pub end_date:      DateTime<Utc>,
}

impl From<CreateBody> for NewKpi {
  fn from(b: CreateBody) -> Self {
    NewKpi {
      title:         b.title,
      description:   b.description,
      category_id:   b.category_id,
      target_value:  b.target_value,
      actual_value:  b.actual_value,
      assigned_user: b.assigned_user,
      start_date:    b.start_date,
      end_date:      b.end_date,
    }
  }
}

/// `POST /kpis` — returns 201 + the decorated KPI.
pub async fn create<S: KpiStore>(
  State(tracker): State<Arc<KpiTracker<S>>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let now = Utc::now();
  let kpi = tracker.create_kpi(NewKpi::from(body), now).await?;
  let view = views::kpi_view(tracker.store(), kpi, now).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct KpiDetail {
  pub kpi:            KpiView,
  pub recent_updates: Vec<UpdateView>,
}

/// `GET /kpis/{id}` — the decorated KPI plus its most recent updates.
pub async fn get_one<S: KpiStore>(
  State(tracker): State<Arc<KpiTracker<S>>>,
  Path(id): Path<KpiId>,
) -> Result<Json<KpiDetail>, ApiError> {
  let store = tracker.store();
  let kpi = store
    .get_kpi(id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound(format!("KPI {id} not found")))?;

  let updates = store
    .updates_for_kpi(id, Some(RECENT_UPDATES))
    .await
    .map_err(store_err)?;

  Ok(Json(KpiDetail {
    kpi:            views::kpi_view(store, kpi, Utc::now()).await?,
    recent_updates: views::update_views(store, updates).await?,
  }))
}

// ─── Edit ─────────────────────────────────────────────────────────────────────

/// JSON body accepted by `PUT /kpis/{id}`. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Default)]
pub struct EditBody {
  pub title:         Option<String>,
  pub description:   Option<String>,
  pub category_id:   Option<CategoryId>,
  pub target_value:  Option<f64>,
  pub actual_value:  Option<f64>,
  /// Manual override; ignored when `actual_value` is also present.
  pub status:        Option<Status>,
  pub assigned_user: Option<UserId>,
  pub start_date:    Option<DateTime<Utc>>,
  pub end_date:      Option<DateTime<Utc>>,
}

impl From<EditBody> for KpiPatch {
  fn from(b: EditBody) -> Self {
    KpiPatch {
      title:         b.title,
      description:   b.description,
      category_id:   b.category_id,
      target_value:  b.target_value,
      actual_value:  b.actual_value,
      status:        b.status,
      assigned_user: b.assigned_user,
      start_date:    b.start_date,
      end_date:      b.end_date,
    }
  }
}

/// `PUT /kpis/{id}` — partial edit.
pub async fn edit<S: KpiStore>(
  State(tracker): State<Arc<KpiTracker<S>>>,
  Path(id): Path<KpiId>,
  Json(body): Json<EditBody>,
) -> Result<Json<KpiView>, ApiError> {
  let now = Utc::now();
  let kpi = tracker.edit_fields(id, KpiPatch::from(body), now).await?;
  Ok(Json(views::kpi_view(tracker.store(), kpi, now).await?))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /kpis/{id}` — removes the KPI and all of its update records.
pub async fn delete<S: KpiStore>(
  State(tracker): State<Arc<KpiTracker<S>>>,
  Path(id): Path<KpiId>,
) -> Result<StatusCode, ApiError> {
  tracker.delete_kpi(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Value update ─────────────────────────────────────────────────────────────

/// JSON body accepted by `PUT /kpis/{id}/value`.
///
/// `updated_by` identifies the acting user; authorization happens upstream
/// and the handler trusts the id.
#[derive(Debug, Deserialize)]
pub struct ValueBody {
  pub updated_value: f64,
  pub comment:       Option<String>,
  pub updated_by:    UserId,
}

#[derive(Debug, Serialize)]
pub struct ValueKpiSummary {
  pub kpi_id:              KpiId,
  pub title:               String,
  pub actual_value:        f64,
  pub previous_value:      f64,
  pub status:              Status,
  pub progress_percentage: i64,
}

#[derive(Debug, Serialize)]
pub struct ValueResponse {
  pub kpi:    ValueKpiSummary,
  pub update: UpdateView,
}

/// `PUT /kpis/{id}/value` — the tracked value-update path: mutates the KPI,
/// recomputes status, and appends exactly one history record.
pub async fn update_value<S: KpiStore>(
  State(tracker): State<Arc<KpiTracker<S>>>,
  Path(id): Path<KpiId>,
  Json(body): Json<ValueBody>,
) -> Result<Json<ValueResponse>, ApiError> {
  let store = tracker.store();

  // Retain the prior value for the diff in the response.
  let previous_value = store
    .get_kpi(id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound(format!("KPI {id} not found")))?
    .actual_value;

  let (kpi, record) = tracker
    .record_value_update(id, body.updated_value, body.comment, body.updated_by, Utc::now())
    .await?;

  Ok(Json(ValueResponse {
    kpi:    ValueKpiSummary {
      kpi_id: kpi.kpi_id,
      title: kpi.title.clone(),
      actual_value: kpi.actual_value,
      previous_value,
      status: kpi.status,
      progress_percentage: kpi.progress_percentage(),
    },
    update: views::update_view(store, record).await?,
  }))
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /kpis/{id}/updates` — full history, newest first.
pub async fn updates<S: KpiStore>(
  State(tracker): State<Arc<KpiTracker<S>>>,
  Path(id): Path<KpiId>,
) -> Result<Json<Vec<UpdateView>>, ApiError> {
  let store = tracker.store();
  if store.get_kpi(id).await.map_err(store_err)?.is_none() {
    return Err(ApiError::NotFound(format!("KPI {id} not found")));
  }
  let updates = store.updates_for_kpi(id, None).await.map_err(store_err)?;
  Ok(Json(views::update_views(store, updates).await?))
}

// ─── Collections by user / status / deadline ──────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UserKpis {
  pub user: User,
  pub kpis: Vec<KpiView>,
}

/// `GET /kpis/user/{user_id}`
pub async fn by_user<S: KpiStore>(
  State(tracker): State<Arc<KpiTracker<S>>>,
  Path(user_id): Path<UserId>,
) -> Result<Json<UserKpis>, ApiError> {
  let store = tracker.store();
  let user = store
    .get_user(user_id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))?;

  let query = KpiQuery {
    assigned_user: Some(user_id),
    ..Default::default()
  };
  let kpis = store.list_kpis(&query).await.map_err(store_err)?;
  Ok(Json(UserKpis {
    user,
    kpis: views::kpi_views(store, kpis, Utc::now()).await?,
  }))
}

/// `GET /kpis/status/{status}` — the path segment is the display string
/// (`On Track`, `At Risk`, `Off Track`).
pub async fn by_status<S: KpiStore>(
  State(tracker): State<Arc<KpiTracker<S>>>,
  Path(status): Path<String>,
) -> Result<Json<Vec<KpiView>>, ApiError> {
  let status: Status = status.parse().map_err(|_| {
    ApiError::BadRequest(
      "invalid status; must be one of: On Track, At Risk, Off Track".into(),
    )
  })?;

  let store = tracker.store();
  let query = KpiQuery {
    status: Some(status),
    ..Default::default()
  };
  let kpis = store.list_kpis(&query).await.map_err(store_err)?;
  Ok(Json(views::kpi_views(store, kpis, Utc::now()).await?))
}

/// `GET /kpis/overdue` — deadline passed without the status catching up.
pub async fn overdue<S: KpiStore>(
  State(tracker): State<Arc<KpiTracker<S>>>,
) -> Result<Json<Vec<KpiView>>, ApiError> {
  let now = Utc::now();
  let store = tracker.store();
  let kpis = store.overdue_kpis(now).await.map_err(store_err)?;
  Ok(Json(views::kpi_views(store, kpis, now).await?))
}
