//! Handlers for `/users` — read-only directory endpoints.
//!
//! Account management and authentication live outside this service; these
//! endpoints exist so clients can resolve assignee and actor names.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use stride_core::{
  kpi::{User, UserId},
  store::KpiStore,
  tracker::KpiTracker,
};

use crate::{error::ApiError, views::store_err};

/// `GET /users`
pub async fn list<S: KpiStore>(
  State(tracker): State<Arc<KpiTracker<S>>>,
) -> Result<Json<Vec<User>>, ApiError> {
  let users = tracker.store().list_users().await.map_err(store_err)?;
  Ok(Json(users))
}

/// `GET /users/{id}`
pub async fn get_one<S: KpiStore>(
  State(tracker): State<Arc<KpiTracker<S>>>,
  Path(id): Path<UserId>,
) -> Result<Json<User>, ApiError> {
  let user = tracker
    .store()
    .get_user(id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
  Ok(Json(user))
}
