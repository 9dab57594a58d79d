//! Handlers for `/dashboard` — read-only aggregation over KPIs and their
//! update history.
//!
//! Everything here is computed from stored rows at request time; the
//! dashboard never recomputes or writes back `status`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use stride_core::{
  kpi::{CategoryId, UserId},
  status::Status,
  store::{KpiQuery, KpiStore},
  tracker::KpiTracker,
};

use crate::{
  error::ApiError,
  views::{self, UpdateView, store_err},
};

const DEFAULT_RECENT: usize = 10;

// ─── Overview ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct OverviewParams {
  pub status:        Option<Status>,
  pub assigned_user: Option<UserId>,
  pub category_id:   Option<CategoryId>,
}

#[derive(Debug, Serialize)]
pub struct Overview {
  pub total_kpis:             usize,
  pub on_track:               usize,
  pub at_risk:                usize,
  pub off_track:              usize,
  /// KPIs whose progress has reached 100%.
  pub achieved_kpis:          usize,
  pub achievement_percentage: i64,
  pub average_progress:       i64,
  /// Deadline passed, not achieved, not yet marked Off Track.
  pub overdue_kpis:           usize,
}

/// `GET /dashboard/overview[?status=...][&assigned_user=...][&category_id=...]`
pub async fn overview<S: KpiStore>(
  State(tracker): State<Arc<KpiTracker<S>>>,
  Query(params): Query<OverviewParams>,
) -> Result<Json<Overview>, ApiError> {
  let now = Utc::now();
  let query = KpiQuery {
    status: params.status,
    assigned_user: params.assigned_user,
    category_id: params.category_id,
    ..Default::default()
  };
  let kpis = tracker.store().list_kpis(&query).await.map_err(store_err)?;

  let total = kpis.len();
  let count = |s: Status| kpis.iter().filter(|k| k.status == s).count();

  let achieved = kpis
    .iter()
    .filter(|k| k.progress_percentage() >= 100)
    .count();
  let achievement_percentage = if total > 0 {
    (achieved as f64 / total as f64 * 100.0).round() as i64
  } else {
    0
  };

  let average_progress = if total > 0 {
    let sum: i64 = kpis.iter().map(|k| k.progress_percentage()).sum();
    (sum as f64 / total as f64).round() as i64
  } else {
    0
  };

  let overdue = kpis
    .iter()
    .filter(|k| {
      k.days_remaining(now) < 0
        && k.status != Status::OffTrack
        && k.progress_percentage() < 100
    })
    .count();

  Ok(Json(Overview {
    total_kpis: total,
    on_track: count(Status::OnTrack),
    at_risk: count(Status::AtRisk),
    off_track: count(Status::OffTrack),
    achieved_kpis: achieved,
    achievement_percentage,
    average_progress,
    overdue_kpis: overdue,
  }))
}

// ─── Status distribution ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StatusSlice {
  pub status: Status,
  pub count:  usize,
}

/// `GET /dashboard/status-distribution`
pub async fn status_distribution<S: KpiStore>(
  State(tracker): State<Arc<KpiTracker<S>>>,
) -> Result<Json<Vec<StatusSlice>>, ApiError> {
  let kpis = tracker
    .store()
    .list_kpis(&KpiQuery::default())
    .await
    .map_err(store_err)?;

  let slices = [Status::OnTrack, Status::AtRisk, Status::OffTrack]
    .into_iter()
    .map(|status| StatusSlice {
      status,
      count: kpis.iter().filter(|k| k.status == status).count(),
    })
    .collect();

  Ok(Json(slices))
}

// ─── Recent updates ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct RecentParams {
  pub limit: Option<usize>,
}

/// `GET /dashboard/recent-updates[?limit=N]`
pub async fn recent_updates<S: KpiStore>(
  State(tracker): State<Arc<KpiTracker<S>>>,
  Query(params): Query<RecentParams>,
) -> Result<Json<Vec<UpdateView>>, ApiError> {
  let store = tracker.store();
  let updates = store
    .recent_updates(params.limit.unwrap_or(DEFAULT_RECENT))
    .await
    .map_err(store_err)?;
  Ok(Json(views::update_views(store, updates).await?))
}
