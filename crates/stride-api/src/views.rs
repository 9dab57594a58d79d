//! Read-side projections.
//!
//! Display-name joins and the derived `progress_percentage`/`days_remaining`
//! fields happen here, at read time — never in the core and never written
//! back to storage. Missing referents degrade to placeholder names rather
//! than failing the whole response.

use chrono::{DateTime, Utc};
use serde::Serialize;
use stride_core::{
  kpi::{Kpi, KpiUpdate},
  store::KpiStore,
};

use crate::error::ApiError;

/// A KPI decorated for display.
#[derive(Debug, Serialize)]
pub struct KpiView {
  #[serde(flatten)]
  pub kpi:                 Kpi,
  pub category_name:       String,
  pub assigned_user_name:  String,
  pub progress_percentage: i64,
  pub days_remaining:      i64,
}

/// An update record decorated with the KPI's title and the acting user's
/// name.
#[derive(Debug, Serialize)]
pub struct UpdateView {
  #[serde(flatten)]
  pub update:          KpiUpdate,
  pub kpi_title:       String,
  pub updated_by_name: String,
}

pub(crate) fn store_err<E>(e: E) -> ApiError
where
  E: std::error::Error + Send + Sync + 'static,
{
  ApiError::Store(Box::new(e))
}

pub async fn kpi_view<S: KpiStore>(
  store: &S,
  kpi: Kpi,
  now: DateTime<Utc>,
) -> Result<KpiView, ApiError> {
  let category_name = store
    .get_category(kpi.category_id)
    .await
    .map_err(store_err)?
    .map(|c| c.name)
    .unwrap_or_else(|| "Unknown Category".to_owned());
  let assigned_user_name = store
    .get_user(kpi.assigned_user)
    .await
    .map_err(store_err)?
    .map(|u| u.username)
    .unwrap_or_else(|| "Unknown User".to_owned());

  Ok(KpiView {
    progress_percentage: kpi.progress_percentage(),
    days_remaining: kpi.days_remaining(now),
    kpi,
    category_name,
    assigned_user_name,
  })
}

pub async fn kpi_views<S: KpiStore>(
  store: &S,
  kpis: Vec<Kpi>,
  now: DateTime<Utc>,
) -> Result<Vec<KpiView>, ApiError> {
  let mut views = Vec::with_capacity(kpis.len());
  for kpi in kpis {
    views.push(kpi_view(store, kpi, now).await?);
  }
  Ok(views)
}

pub async fn update_view<S: KpiStore>(
  store: &S,
  update: KpiUpdate,
) -> Result<UpdateView, ApiError> {
  let kpi_title = store
    .get_kpi(update.kpi_id)
    .await
    .map_err(store_err)?
    .map(|k| k.title)
    .unwrap_or_else(|| "Unknown KPI".to_owned());
  let updated_by_name = store
    .get_user(update.updated_by)
    .await
    .map_err(store_err)?
    .map(|u| u.username)
    .unwrap_or_else(|| "Unknown User".to_owned());
  Ok(UpdateView { update, kpi_title, updated_by_name })
}

pub async fn update_views<S: KpiStore>(
  store: &S,
  updates: Vec<KpiUpdate>,
) -> Result<Vec<UpdateView>, ApiError> {
  let mut views = Vec::with_capacity(updates.len());
  for update in updates {
    views.push(update_view(store, update).await?);
  }
  Ok(views)
}
