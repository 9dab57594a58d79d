//! The `KpiStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `stride-store-sqlite`).
//! Higher layers (`stride-api`, the tracker) depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  kpi::{
    Category, CategoryId, Kpi, KpiId, KpiUpdate, NewCategory, NewKpi,
    NewKpiUpdate, NewUser, User, UserId,
  },
  status::Status,
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Column to order KPI listings by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
  #[default]
  CreatedAt,
  Title,
  EndDate,
  TargetValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

/// Parameters for [`KpiStore::list_kpis`]. Default lists everything, newest
/// first.
#[derive(Debug, Clone, Default)]
pub struct KpiQuery {
  pub status:        Option<Status>,
  pub assigned_user: Option<UserId>,
  pub category_id:   Option<CategoryId>,
  /// Case-insensitive substring match over title and description.
  pub search:        Option<String>,
  pub sort_by:       SortField,
  pub sort_order:    SortOrder,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Stride storage backend.
///
/// The KPI row is the only shared mutable resource; the update stream is
/// append-only. Backends must serialize writes per KPI — [`update_kpi`]
/// carries an optimistic revision check for exactly that purpose — and must
/// assign identifiers from an atomic counter rather than a scan-then-insert.
///
/// Timestamps are caller-supplied so the tracker's status computation and
/// the persisted `updated_at`/`created_at` always agree on "now".
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
///
/// [`update_kpi`]: KpiStore::update_kpi
pub trait KpiStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── KPIs ──────────────────────────────────────────────────────────────

  /// Persist a new KPI with the given initial status. The store assigns the
  /// id and sets both timestamps to `now`.
  fn insert_kpi(
    &self,
    new: NewKpi,
    status: Status,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Kpi, Self::Error>> + Send + '_;

  /// Retrieve a KPI by id. Returns `None` if not found.
  fn get_kpi(
    &self,
    id: KpiId,
  ) -> impl Future<Output = Result<Option<Kpi>, Self::Error>> + Send + '_;

  /// List KPIs matching `query`.
  fn list_kpis<'a>(
    &'a self,
    query: &'a KpiQuery,
  ) -> impl Future<Output = Result<Vec<Kpi>, Self::Error>> + Send + 'a;

  /// KPIs whose window has closed (`end_date < now`) without the status
  /// having caught up to Off Track, ordered by end date ascending.
  fn overdue_kpis(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Kpi>, Self::Error>> + Send + '_;

  /// Write back a mutated KPI, guarded by its `revision` field.
  ///
  /// Returns the stored row with `revision` bumped and `updated_at = now`,
  /// or `None` when the revision check fails — meaning a concurrent writer
  /// committed first and the caller must re-read before retrying. `None` is
  /// also returned when the KPI no longer exists.
  fn update_kpi(
    &self,
    kpi: Kpi,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Kpi>, Self::Error>> + Send + '_;

  /// Delete a KPI and, in the same transaction, every update record that
  /// references it. Returns `false` if the KPI did not exist.
  fn delete_kpi(
    &self,
    id: KpiId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Update records — append-only ──────────────────────────────────────

  /// Append an update record with `created_at = now`. Records are never
  /// mutated afterwards.
  fn insert_update(
    &self,
    new: NewKpiUpdate,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<KpiUpdate, Self::Error>> + Send + '_;

  /// Update history for one KPI, newest first, optionally bounded.
  fn updates_for_kpi(
    &self,
    kpi_id: KpiId,
    limit: Option<usize>,
  ) -> impl Future<Output = Result<Vec<KpiUpdate>, Self::Error>> + Send + '_;

  /// Updates recorded by one user, newest first.
  fn updates_by_user(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<Vec<KpiUpdate>, Self::Error>> + Send + '_;

  /// The most recent updates across all KPIs.
  fn recent_updates(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<KpiUpdate>, Self::Error>> + Send + '_;

  // ── Directory ─────────────────────────────────────────────────────────

  fn get_category(
    &self,
    id: CategoryId,
  ) -> impl Future<Output = Result<Option<Category>, Self::Error>> + Send + '_;

  fn list_categories(
    &self,
  ) -> impl Future<Output = Result<Vec<Category>, Self::Error>> + Send + '_;

  fn insert_category(
    &self,
    new: NewCategory,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  fn insert_user(
    &self,
    new: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;
}
