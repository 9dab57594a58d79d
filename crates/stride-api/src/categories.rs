//! Handlers for `/categories` — read-only directory endpoints.
//!
//! Category management is a collaborator's concern; the API only resolves
//! ids to display names for the client.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use stride_core::{
  kpi::{Category, CategoryId},
  store::KpiStore,
  tracker::KpiTracker,
};

use crate::{error::ApiError, views::store_err};

/// `GET /categories`
pub async fn list<S: KpiStore>(
  State(tracker): State<Arc<KpiTracker<S>>>,
) -> Result<Json<Vec<Category>>, ApiError> {
  let categories = tracker
    .store()
    .list_categories()
    .await
    .map_err(store_err)?;
  Ok(Json(categories))
}

/// `GET /categories/{id}`
pub async fn get_one<S: KpiStore>(
  State(tracker): State<Arc<KpiTracker<S>>>,
  Path(id): Path<CategoryId>,
) -> Result<Json<Category>, ApiError> {
  let category = tracker
    .store()
    .get_category(id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound(format!("category {id} not found")))?;
  Ok(Json(category))
}
