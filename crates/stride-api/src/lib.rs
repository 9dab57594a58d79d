//! JSON REST API for Stride.
//!
//! Exposes an axum [`Router`] backed by any [`stride_core::store::KpiStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility — the
//! handlers trust the acting-user id supplied in write bodies.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", stride_api::api_router(tracker.clone()))
//! ```

pub mod categories;
pub mod dashboard;
pub mod error;
pub mod kpis;
pub mod users;
pub mod views;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
  Router,
  routing::get,
};
use stride_core::{store::KpiStore, tracker::KpiTracker};

pub use error::ApiError;

/// Build a fully-materialised API router over `tracker`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(tracker: Arc<KpiTracker<S>>) -> Router<()>
where
  S: KpiStore + 'static,
{
  Router::new()
    // KPIs
    .route("/kpis", get(kpis::list::<S>).post(kpis::create::<S>))
    .route("/kpis/overdue", get(kpis::overdue::<S>))
    .route("/kpis/user/{user_id}", get(kpis::by_user::<S>))
    .route("/kpis/status/{status}", get(kpis::by_status::<S>))
    .route(
      "/kpis/{id}",
      get(kpis::get_one::<S>)
        .put(kpis::edit::<S>)
        .delete(kpis::delete::<S>),
    )
    .route("/kpis/{id}/value", axum::routing::put(kpis::update_value::<S>))
    .route("/kpis/{id}/updates", get(kpis::updates::<S>))
    // Directory (read-only)
    .route("/categories", get(categories::list::<S>))
    .route("/categories/{id}", get(categories::get_one::<S>))
    .route("/users", get(users::list::<S>))
    .route("/users/{id}", get(users::get_one::<S>))
    // Dashboard (read-only aggregation)
    .route("/dashboard/overview", get(dashboard::overview::<S>))
    .route(
      "/dashboard/status-distribution",
      get(dashboard::status_distribution::<S>),
    )
    .route(
      "/dashboard/recent-updates",
      get(dashboard::recent_updates::<S>),
    )
    .with_state(tracker)
}
