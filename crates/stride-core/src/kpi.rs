//! Entity types for the KPI tracker.
//!
//! A [`Kpi`] is the tracked objective; each change to its actual value
//! appends an immutable [`KpiUpdate`]. Categories and users are thin
//! directory entities referenced by id — the core never manages them beyond
//! existence checks and read-time name resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::{self, Status};

/// Stable integer identifiers, assigned by the storage backend's atomic
/// counter. Never reused within a store.
pub type KpiId = i64;
pub type UpdateId = i64;
pub type UserId = i64;
pub type CategoryId = i64;

// ─── Kpi ─────────────────────────────────────────────────────────────────────

/// A tracked objective: numeric target, numeric current value, date window.
///
/// `status` is materialized at write time — it reflects the last mutation of
/// `actual_value`, not the current wall clock. A KPI left untouched keeps
/// its last-computed status even as the window runs out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kpi {
  pub kpi_id:        KpiId,
  pub title:         String,
  pub description:   Option<String>,
  pub category_id:   CategoryId,
  pub target_value:  f64,
  pub actual_value:  f64,
  pub status:        Status,
  pub assigned_user: UserId,
  pub start_date:    DateTime<Utc>,
  pub end_date:      DateTime<Utc>,
  /// Optimistic-concurrency counter, bumped by the store on every write.
  /// Not part of the API surface.
  #[serde(skip)]
  pub revision:      i64,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

impl Kpi {
  /// Rounded percentage of target achieved. Derived, never stored.
  pub fn progress_percentage(&self) -> i64 {
    status::progress_percentage(self.actual_value, self.target_value)
  }

  /// Whole days until the end date as of `now`; negative when overdue.
  pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
    status::days_remaining(self.end_date, now)
  }

  /// Elapsed fraction of the window as of `now`, in `[0, 100]`.
  pub fn time_ratio(&self, now: DateTime<Utc>) -> i64 {
    status::time_ratio(self.start_date, self.end_date, now)
  }

  /// What [`classify`](status::classify) says about this snapshot at `now`.
  /// The tracker calls this on every value change to refresh `status`.
  pub fn derive_status(&self, now: DateTime<Utc>) -> Status {
    status::derive(
      self.actual_value,
      self.target_value,
      self.start_date,
      self.end_date,
      now,
    )
  }
}

/// Input to [`KpiTracker::create_kpi`](crate::tracker::KpiTracker::create_kpi).
/// Identity, status, and timestamps are assigned downstream.
#[derive(Debug, Clone)]
pub struct NewKpi {
  pub title:         String,
  pub description:   Option<String>,
  pub category_id:   CategoryId,
  pub target_value:  f64,
  pub actual_value:  f64,
  pub assigned_user: UserId,
  pub start_date:    DateTime<Utc>,
  pub end_date:      DateTime<Utc>,
}

/// A partial edit. `None` leaves the field untouched.
///
/// When `actual_value` is present the tracker recomputes `status` and any
/// `status` supplied here is superseded; a manual status override is only
/// honoured when the value is not changing in the same patch.
#[derive(Debug, Clone, Default)]
pub struct KpiPatch {
  pub title:         Option<String>,
  pub description:   Option<String>,
  pub category_id:   Option<CategoryId>,
  pub target_value:  Option<f64>,
  pub actual_value:  Option<f64>,
  pub status:        Option<Status>,
  pub assigned_user: Option<UserId>,
  pub start_date:    Option<DateTime<Utc>>,
  pub end_date:      Option<DateTime<Utc>>,
}

// ─── KpiUpdate ───────────────────────────────────────────────────────────────

/// An immutable progress event: one record per successful value change.
/// Once written, never mutated; deleted only as a cascade of KPI deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiUpdate {
  pub update_id:     UpdateId,
  pub kpi_id:        KpiId,
  /// The new actual value — an absolute reading, not a delta.
  pub updated_value: f64,
  pub comment:       Option<String>,
  pub updated_by:    UserId,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`KpiStore::insert_update`](crate::store::KpiStore::insert_update).
#[derive(Debug, Clone)]
pub struct NewKpiUpdate {
  pub kpi_id:        KpiId,
  pub updated_value: f64,
  pub comment:       Option<String>,
  pub updated_by:    UserId,
}

// ─── Directory entities ──────────────────────────────────────────────────────

/// A KPI grouping. Managed outside the core; resolved to a display name at
/// read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
  pub category_id: CategoryId,
  pub name:        String,
  pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
  pub name:        String,
  pub description: Option<String>,
}

/// An account that KPIs are assigned to and updates are attributed to.
/// Authentication is a collaborator's concern; the core only needs identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:  UserId,
  pub username: String,
  pub email:    String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
  pub username: String,
  pub email:    String,
}
