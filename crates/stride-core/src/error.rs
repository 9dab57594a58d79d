//! Error types for `stride-core`.

use thiserror::Error;

use crate::kpi::{CategoryId, KpiId, UpdateId, UserId};

/// Boxed backend error carried through tracker failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed input reached the core. The validation collaborator should
  /// have rejected it earlier; the core fails closed rather than coercing.
  #[error("validation failure: {0}")]
  Validation(String),

  #[error("KPI not found: {0}")]
  KpiNotFound(KpiId),

  #[error("update record not found: {0}")]
  UpdateNotFound(UpdateId),

  #[error("user not found: {0}")]
  UserNotFound(UserId),

  #[error("category not found: {0}")]
  CategoryNotFound(CategoryId),

  /// The per-KPI serialization check failed: another writer committed a
  /// newer revision between our read and write. Retry with fresh state.
  #[error("concurrent update of KPI {0}")]
  Conflict(KpiId),

  /// The KPI write committed but the history record did not. The KPI's new
  /// value and status stand; the update log is short one entry.
  #[error("KPI {kpi_id} committed but its update record failed: {source}")]
  PartialWrite { kpi_id: KpiId, source: BoxError },

  #[error("unknown status discriminant: {0:?}")]
  UnknownStatus(String),

  #[error("store error: {0}")]
  Store(#[source] BoxError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
