//! Status derivation — the pure functions that classify a KPI.
//!
//! Everything here is side-effect-free and deterministic up to the
//! caller-supplied `now`. The wall clock is never read in this module; every
//! function takes the current instant as a parameter so callers (and tests)
//! control time.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Progress may lag the elapsed-time ratio by up to this many points and
/// still count as on track.
const ON_TRACK_TOLERANCE: i64 = 5;

/// Progress lagging by more than [`ON_TRACK_TOLERANCE`] but within this many
/// points is at risk; beyond it, off track.
const AT_RISK_TOLERANCE: i64 = 20;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

// ─── Status ──────────────────────────────────────────────────────────────────

/// The derived health of a KPI, computed by [`classify`].
///
/// Serialises as the display strings the original data model used
/// (`"On Track"` etc.), which are also the values stored in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
  #[serde(rename = "On Track")]
  OnTrack,
  #[serde(rename = "At Risk")]
  AtRisk,
  #[serde(rename = "Off Track")]
  OffTrack,
}

impl Status {
  /// The string stored in the `status` column and rendered to clients.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::OnTrack => "On Track",
      Self::AtRisk => "At Risk",
      Self::OffTrack => "Off Track",
    }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Status {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "On Track" => Ok(Self::OnTrack),
      "At Risk" => Ok(Self::AtRisk),
      "Off Track" => Ok(Self::OffTrack),
      other => Err(Error::UnknownStatus(other.to_owned())),
    }
  }
}

// ─── Derivation ──────────────────────────────────────────────────────────────

/// Actual value as a rounded percentage of target.
///
/// Returns 0 when `target == 0` — a deliberate floor to avoid division by
/// zero, not an error.
pub fn progress_percentage(actual: f64, target: f64) -> i64 {
  if target == 0.0 {
    return 0;
  }
  (actual / target * 100.0).round() as i64
}

/// Elapsed fraction of the KPI's time window, as a percentage clamped to
/// `[0, 100]`.
///
/// Day counts are taken with `ceil`, matching [`days_remaining`]: a window
/// of ten days and one hour counts as eleven days. A malformed range
/// (`end <= start`) yields 0.
pub fn time_ratio(
  start: DateTime<Utc>,
  end: DateTime<Utc>,
  now: DateTime<Utc>,
) -> i64 {
  let total_days = ceil_days(end - start);
  let elapsed_days = ceil_days(now - start);

  if total_days <= 0 {
    return 0;
  }
  if elapsed_days < 0 {
    return 0;
  }
  if elapsed_days > total_days {
    return 100;
  }

  (elapsed_days as f64 / total_days as f64 * 100.0).round() as i64
}

/// Whole days until `end`, rounded up. Negative once the deadline has
/// passed.
pub fn days_remaining(end: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
  ceil_days(end - now)
}

/// Decision ladder, first match wins:
///
/// 1. goal met → On Track, regardless of time
/// 2. deadline passed, goal not met → Off Track
/// 3. progress within 5 points of the time ratio → On Track
/// 4. progress within 20 points → At Risk
/// 5. otherwise → Off Track
pub fn classify(progress: i64, time_ratio: i64) -> Status {
  if progress >= 100 {
    return Status::OnTrack;
  }
  if time_ratio >= 100 {
    return Status::OffTrack;
  }
  if progress >= time_ratio - ON_TRACK_TOLERANCE {
    return Status::OnTrack;
  }
  if progress >= time_ratio - AT_RISK_TOLERANCE {
    return Status::AtRisk;
  }
  Status::OffTrack
}

/// Convenience composition of [`progress_percentage`], [`time_ratio`], and
/// [`classify`] over a KPI snapshot.
pub fn derive(
  actual: f64,
  target: f64,
  start: DateTime<Utc>,
  end: DateTime<Utc>,
  now: DateTime<Utc>,
) -> Status {
  classify(progress_percentage(actual, target), time_ratio(start, end, now))
}

fn ceil_days(d: chrono::Duration) -> i64 {
  (d.num_milliseconds() as f64 / MILLIS_PER_DAY).ceil() as i64
}

// ─── Tests ───────────────────────────────────────────────────────────────────
