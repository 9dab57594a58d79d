//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings (always UTC, so lexicographic
//! comparison in SQL matches chronological order). Status is stored as its
//! display string. Numeric values map straight onto REAL/INTEGER columns.

use chrono::{DateTime, Utc};
use stride_core::{
  kpi::{Category, Kpi, KpiUpdate, User},
  status::Status,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Status ──────────────────────────────────────────────────────────────────

pub fn encode_status(s: Status) -> &'static str { s.as_str() }

pub fn decode_status(s: &str) -> Result<Status> {
  s.parse::<Status>().map_err(Error::Core)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw column values read directly from a `kpis` row.
pub struct RawKpi {
  pub kpi_id:        i64,
  pub title:         String,
  pub description:   Option<String>,
  pub category_id:   i64,
  pub target_value:  f64,
  pub actual_value:  f64,
  pub status:        String,
  pub assigned_user: i64,
  pub start_date:    String,
  pub end_date:      String,
  pub revision:      i64,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawKpi {
  /// Column list matching the field order above; keep the two in sync.
  pub const COLUMNS: &'static str = "kpi_id, title, description, category_id, \
     target_value, actual_value, status, assigned_user, start_date, \
     end_date, revision, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      kpi_id:        row.get(0)?,
      title:         row.get(1)?,
      description:   row.get(2)?,
      category_id:   row.get(3)?,
      target_value:  row.get(4)?,
      actual_value:  row.get(5)?,
      status:        row.get(6)?,
      assigned_user: row.get(7)?,
      start_date:    row.get(8)?,
      end_date:      row.get(9)?,
      revision:      row.get(10)?,
      created_at:    row.get(11)?,
      updated_at:    row.get(12)?,
    })
  }

  pub fn into_kpi(self) -> Result<Kpi> {
    Ok(Kpi {
      kpi_id:        self.kpi_id,
      title:         self.title,
      description:   self.description,
      category_id:   self.category_id,
      target_value:  self.target_value,
      actual_value:  self.actual_value,
      status:        decode_status(&self.status)?,
      assigned_user: self.assigned_user,
      start_date:    decode_dt(&self.start_date)?,
      end_date:      decode_dt(&self.end_date)?,
      revision:      self.revision,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw column values read directly from a `kpi_updates` row.
pub struct RawUpdate {
  pub update_id:     i64,
  pub kpi_id:        i64,
  pub updated_value: f64,
  pub comment:       Option<String>,
  pub updated_by:    i64,
  pub created_at:    String,
}

impl RawUpdate {
  pub const COLUMNS: &'static str =
    "update_id, kpi_id, updated_value, comment, updated_by, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      update_id:     row.get(0)?,
      kpi_id:        row.get(1)?,
      updated_value: row.get(2)?,
      comment:       row.get(3)?,
      updated_by:    row.get(4)?,
      created_at:    row.get(5)?,
    })
  }

  pub fn into_update(self) -> Result<KpiUpdate> {
    Ok(KpiUpdate {
      update_id:     self.update_id,
      kpi_id:        self.kpi_id,
      updated_value: self.updated_value,
      comment:       self.comment,
      updated_by:    self.updated_by,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw column values read directly from a `categories` row.
pub struct RawCategory {
  pub category_id: i64,
  pub name:        String,
  pub description: Option<String>,
}

impl RawCategory {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      category_id: row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
    })
  }

  pub fn into_category(self) -> Category {
    Category {
      category_id: self.category_id,
      name:        self.name,
      description: self.description,
    }
  }
}

/// Raw column values read directly from a `users` row.
pub struct RawUser {
  pub user_id:  i64,
  pub username: String,
  pub email:    String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:  row.get(0)?,
      username: row.get(1)?,
      email:    row.get(2)?,
    })
  }

  pub fn into_user(self) -> User {
    User {
      user_id:  self.user_id,
      username: self.username,
      email:    self.email,
    }
  }
}
