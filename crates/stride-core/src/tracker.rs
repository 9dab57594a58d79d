//! `KpiTracker` — the transactional workflow over a [`KpiStore`].
//!
//! The tracker owns every mutation of a KPI's tracked fields. It applies the
//! status derivation on each value change and appends the matching history
//! record, so the stored status and the update log never diverge. Reads go
//! straight to the store; only writes pass through here.

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  kpi::{Kpi, KpiId, KpiPatch, KpiUpdate, NewKpi, NewKpiUpdate, UserId},
  status,
  store::KpiStore,
};

/// Longest accepted KPI title.
pub const TITLE_MAX: usize = 255;

/// Longest accepted update comment.
pub const COMMENT_MAX: usize = 500;

/// The write-side workflow for KPIs, generic over the storage backend.
///
/// Callers are expected to have run authorization and request validation
/// already; the tracker still re-checks the field constraints and fails
/// closed on violations rather than coercing.
#[derive(Debug, Clone)]
pub struct KpiTracker<S> {
  store: S,
}

impl<S: KpiStore> KpiTracker<S> {
  pub fn new(store: S) -> Self { Self { store } }

  /// The underlying store, for read paths that bypass the tracker.
  pub fn store(&self) -> &S { &self.store }

  fn store_err(e: S::Error) -> Error { Error::Store(Box::new(e)) }

  // ── Operations ────────────────────────────────────────────────────────

  /// Validate and persist a new KPI. The initial status is derived with
  /// `now` as the current instant.
  pub async fn create_kpi(&self, new: NewKpi, now: DateTime<Utc>) -> Result<Kpi> {
    validate_title(&new.title)?;
    validate_non_negative("target_value", new.target_value)?;
    validate_non_negative("actual_value", new.actual_value)?;
    validate_window(new.start_date, new.end_date)?;

    if self
      .store
      .get_category(new.category_id)
      .await
      .map_err(Self::store_err)?
      .is_none()
    {
      return Err(Error::CategoryNotFound(new.category_id));
    }
    if self
      .store
      .get_user(new.assigned_user)
      .await
      .map_err(Self::store_err)?
      .is_none()
    {
      return Err(Error::UserNotFound(new.assigned_user));
    }

    let initial = status::derive(
      new.actual_value,
      new.target_value,
      new.start_date,
      new.end_date,
      now,
    );

    self
      .store
      .insert_kpi(new, initial, now)
      .await
      .map_err(Self::store_err)
  }

  /// Set a KPI's actual value and append the matching history record.
  ///
  /// The two writes are ordered: the KPI (with its recomputed status) is
  /// persisted first, then the update record. A failure of the second write
  /// surfaces as [`Error::PartialWrite`] — the KPI state is committed, the
  /// history is short one entry, and operators can reconcile separately.
  /// A failed revision check surfaces as [`Error::Conflict`]; the caller
  /// retries the whole operation with fresh state.
  pub async fn record_value_update(
    &self,
    kpi_id: KpiId,
    new_value: f64,
    comment: Option<String>,
    acting_user: UserId,
    now: DateTime<Utc>,
  ) -> Result<(Kpi, KpiUpdate)> {
    validate_non_negative("updated_value", new_value)?;
    validate_comment(comment.as_deref())?;

    let mut kpi = self
      .store
      .get_kpi(kpi_id)
      .await
      .map_err(Self::store_err)?
      .ok_or(Error::KpiNotFound(kpi_id))?;

    kpi.actual_value = new_value;
    kpi.status = kpi.derive_status(now);

    let kpi = self
      .store
      .update_kpi(kpi, now)
      .await
      .map_err(Self::store_err)?
      .ok_or(Error::Conflict(kpi_id))?;

    // The KPI write is committed past this point. An insert failure here
    // must be reported distinctly, not rolled into a generic store error.
    let record = self
      .store
      .insert_update(
        NewKpiUpdate {
          kpi_id,
          updated_value: new_value,
          comment,
          updated_by: acting_user,
        },
        now,
      )
      .await
      .map_err(|e| Error::PartialWrite {
        kpi_id,
        source: Box::new(e),
      })?;

    Ok((kpi, record))
  }

  /// Apply a partial edit.
  ///
  /// If the patch carries `actual_value`, the status is recomputed exactly
  /// as in [`record_value_update`](Self::record_value_update) and any
  /// `status` in the same patch is superseded. Without a value change, a
  /// supplied `status` is accepted as a manual override. No history record
  /// is appended — that is the value-update path's contract, not this one's.
  pub async fn edit_fields(
    &self,
    kpi_id: KpiId,
    patch: KpiPatch,
    now: DateTime<Utc>,
  ) -> Result<Kpi> {
    let mut kpi = self
      .store
      .get_kpi(kpi_id)
      .await
      .map_err(Self::store_err)?
      .ok_or(Error::KpiNotFound(kpi_id))?;

    if let Some(category_id) = patch.category_id
      && category_id != kpi.category_id
    {
      if self
        .store
        .get_category(category_id)
        .await
        .map_err(Self::store_err)?
        .is_none()
      {
        return Err(Error::CategoryNotFound(category_id));
      }
      kpi.category_id = category_id;
    }

    if let Some(user_id) = patch.assigned_user
      && user_id != kpi.assigned_user
    {
      if self
        .store
        .get_user(user_id)
        .await
        .map_err(Self::store_err)?
        .is_none()
      {
        return Err(Error::UserNotFound(user_id));
      }
      kpi.assigned_user = user_id;
    }

    if let Some(title) = patch.title {
      kpi.title = title;
    }
    if let Some(description) = patch.description {
      kpi.description = Some(description);
    }
    if let Some(target) = patch.target_value {
      kpi.target_value = target;
    }
    if let Some(start) = patch.start_date {
      kpi.start_date = start;
    }
    if let Some(end) = patch.end_date {
      kpi.end_date = end;
    }
    if let Some(status) = patch.status {
      kpi.status = status;
    }
    if let Some(actual) = patch.actual_value {
      kpi.actual_value = actual;
      // A value change always wins over a manual status override.
      kpi.status = kpi.derive_status(now);
    }

    validate_title(&kpi.title)?;
    validate_non_negative("target_value", kpi.target_value)?;
    validate_non_negative("actual_value", kpi.actual_value)?;
    validate_window(kpi.start_date, kpi.end_date)?;

    self
      .store
      .update_kpi(kpi, now)
      .await
      .map_err(Self::store_err)?
      .ok_or(Error::Conflict(kpi_id))
  }

  /// Delete a KPI. The store cascades to its update records, so no orphaned
  /// history survives.
  pub async fn delete_kpi(&self, kpi_id: KpiId) -> Result<()> {
    let deleted = self
      .store
      .delete_kpi(kpi_id)
      .await
      .map_err(Self::store_err)?;
    if !deleted {
      return Err(Error::KpiNotFound(kpi_id));
    }
    Ok(())
  }
}

// ─── Field checks ────────────────────────────────────────────────────────────

fn validate_title(title: &str) -> Result<()> {
  if title.trim().is_empty() {
    return Err(Error::Validation("title must not be empty".into()));
  }
  if title.chars().count() > TITLE_MAX {
    return Err(Error::Validation(format!(
      "title must not exceed {TITLE_MAX} characters"
    )));
  }
  Ok(())
}

fn validate_comment(comment: Option<&str>) -> Result<()> {
  if let Some(c) = comment
    && c.chars().count() > COMMENT_MAX
  {
    return Err(Error::Validation(format!(
      "comment must not exceed {COMMENT_MAX} characters"
    )));
  }
  Ok(())
}

fn validate_non_negative(field: &str, value: f64) -> Result<()> {
  if !value.is_finite() || value < 0.0 {
    return Err(Error::Validation(format!(
      "{field} must be a non-negative number"
    )));
  }
  Ok(())
}

fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
  if end <= start {
    return Err(Error::Validation(
      "end_date must be strictly after start_date".into(),
    ));
  }
  Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
  };

  use chrono::{Duration, TimeZone};
  use thiserror::Error;

  use super::*;
  use crate::{
    kpi::{Category, CategoryId, NewCategory, NewUser, User},
    status::Status,
    store::KpiQuery,
  };

  // ── In-memory store ───────────────────────────────────────────────────

  #[derive(Debug, Error)]
  enum MemError {
    #[error("injected store failure")]
    Injected,
  }

  #[derive(Default)]
  struct MemState {
    kpis:       Vec<Kpi>,
    updates:    Vec<KpiUpdate>,
    categories: Vec<Category>,
    users:      Vec<User>,
    next_id:    i64,
  }

  /// Minimal `KpiStore` over a mutex-guarded vec, with failure injection
  /// for the partial-write and conflict paths.
  #[derive(Default)]
  struct MemStore {
    state:              Mutex<MemState>,
    fail_insert_update: AtomicBool,
    force_conflict:     AtomicBool,
  }

  impl MemStore {
    fn next_id(state: &mut MemState) -> i64 {
      state.next_id += 1;
      state.next_id
    }

    fn kpi(&self, id: KpiId) -> Kpi {
      self
        .state
        .lock()
        .unwrap()
        .kpis
        .iter()
        .find(|k| k.kpi_id == id)
        .cloned()
        .unwrap()
    }

    fn update_count(&self, id: KpiId) -> usize {
      self
        .state
        .lock()
        .unwrap()
        .updates
        .iter()
        .filter(|u| u.kpi_id == id)
        .count()
    }
  }

  impl KpiStore for MemStore {
    type Error = MemError;

    async fn insert_kpi(
      &self,
      new: NewKpi,
      status: Status,
      now: DateTime<Utc>,
    ) -> Result<Kpi, MemError> {
      let mut state = self.state.lock().unwrap();
      let kpi = Kpi {
        kpi_id: Self::next_id(&mut state),
        title: new.title,
        description: new.description,
        category_id: new.category_id,
        target_value: new.target_value,
        actual_value: new.actual_value,
        status,
        assigned_user: new.assigned_user,
        start_date: new.start_date,
        end_date: new.end_date,
        revision: 0,
        created_at: now,
        updated_at: now,
      };
      state.kpis.push(kpi.clone());
      Ok(kpi)
    }

    async fn get_kpi(&self, id: KpiId) -> Result<Option<Kpi>, MemError> {
      let state = self.state.lock().unwrap();
      Ok(state.kpis.iter().find(|k| k.kpi_id == id).cloned())
    }

    async fn list_kpis(&self, _query: &KpiQuery) -> Result<Vec<Kpi>, MemError> {
      Ok(self.state.lock().unwrap().kpis.clone())
    }

    async fn overdue_kpis(&self, now: DateTime<Utc>) -> Result<Vec<Kpi>, MemError> {
      let state = self.state.lock().unwrap();
      Ok(
        state
          .kpis
          .iter()
          .filter(|k| k.end_date < now && k.status != Status::OffTrack)
          .cloned()
          .collect(),
      )
    }

    async fn update_kpi(
      &self,
      mut kpi: Kpi,
      now: DateTime<Utc>,
    ) -> Result<Option<Kpi>, MemError> {
      if self.force_conflict.load(Ordering::SeqCst) {
        return Ok(None);
      }
      let mut state = self.state.lock().unwrap();
      let Some(slot) = state.kpis.iter_mut().find(|k| k.kpi_id == kpi.kpi_id)
      else {
        return Ok(None);
      };
      if slot.revision != kpi.revision {
        return Ok(None);
      }
      kpi.revision += 1;
      kpi.updated_at = now;
      *slot = kpi.clone();
      Ok(Some(kpi))
    }

    async fn delete_kpi(&self, id: KpiId) -> Result<bool, MemError> {
      let mut state = self.state.lock().unwrap();
      let before = state.kpis.len();
      state.kpis.retain(|k| k.kpi_id != id);
      state.updates.retain(|u| u.kpi_id != id);
      Ok(state.kpis.len() < before)
    }

    async fn insert_update(
      &self,
      new: NewKpiUpdate,
      now: DateTime<Utc>,
    ) -> Result<KpiUpdate, MemError> {
      if self.fail_insert_update.load(Ordering::SeqCst) {
        return Err(MemError::Injected);
      }
      let mut state = self.state.lock().unwrap();
      let record = KpiUpdate {
        update_id: Self::next_id(&mut state),
        kpi_id: new.kpi_id,
        updated_value: new.updated_value,
        comment: new.comment,
        updated_by: new.updated_by,
        created_at: now,
      };
      state.updates.push(record.clone());
      Ok(record)
    }

    async fn updates_for_kpi(
      &self,
      kpi_id: KpiId,
      _limit: Option<usize>,
    ) -> Result<Vec<KpiUpdate>, MemError> {
      let state = self.state.lock().unwrap();
      Ok(
        state
          .updates
          .iter()
          .filter(|u| u.kpi_id == kpi_id)
          .cloned()
          .collect(),
      )
    }

    async fn updates_by_user(
      &self,
      user_id: UserId,
    ) -> Result<Vec<KpiUpdate>, MemError> {
      let state = self.state.lock().unwrap();
      Ok(
        state
          .updates
          .iter()
          .filter(|u| u.updated_by == user_id)
          .cloned()
          .collect(),
      )
    }

    async fn recent_updates(&self, limit: usize) -> Result<Vec<KpiUpdate>, MemError> {
      let state = self.state.lock().unwrap();
      Ok(state.updates.iter().rev().take(limit).cloned().collect())
    }

    async fn get_category(
      &self,
      id: CategoryId,
    ) -> Result<Option<Category>, MemError> {
      let state = self.state.lock().unwrap();
      Ok(state.categories.iter().find(|c| c.category_id == id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, MemError> {
      Ok(self.state.lock().unwrap().categories.clone())
    }

    async fn insert_category(&self, new: NewCategory) -> Result<Category, MemError> {
      let mut state = self.state.lock().unwrap();
      let category = Category {
        category_id: Self::next_id(&mut state),
        name:        new.name,
        description: new.description,
      };
      state.categories.push(category.clone());
      Ok(category)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, MemError> {
      let state = self.state.lock().unwrap();
      Ok(state.users.iter().find(|u| u.user_id == id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, MemError> {
      Ok(self.state.lock().unwrap().users.clone())
    }

    async fn insert_user(&self, new: NewUser) -> Result<User, MemError> {
      let mut state = self.state.lock().unwrap();
      let user = User {
        user_id:  Self::next_id(&mut state),
        username: new.username,
        email:    new.email,
      };
      state.users.push(user.clone());
      Ok(user)
    }
  }

  // ── Fixtures ──────────────────────────────────────────────────────────

  fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() }

  async fn tracker() -> (KpiTracker<MemStore>, CategoryId, UserId) {
    let store = MemStore::default();
    let category = store
      .insert_category(NewCategory {
        name:        "Sales".into(),
        description: None,
      })
      .await
      .unwrap();
    let user = store
      .insert_user(NewUser {
        username: "alice".into(),
        email:    "alice@example.com".into(),
      })
      .await
      .unwrap();
    (KpiTracker::new(store), category.category_id, user.user_id)
  }

  fn new_kpi(category: CategoryId, user: UserId) -> NewKpi {
    NewKpi {
      title:         "Quarterly revenue".into(),
      description:   Some("Gross revenue for Q1".into()),
      category_id:   category,
      target_value:  100.0,
      actual_value:  0.0,
      assigned_user: user,
      start_date:    t0(),
      end_date:      t0() + Duration::days(10),
    }
  }

  // ── create_kpi ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_derives_initial_status() {
    let (tracker, category, user) = tracker().await;

    // Created at the very start of the window: progress 0 vs ratio 0.
    let kpi = tracker.create_kpi(new_kpi(category, user), t0()).await.unwrap();
    assert_eq!(kpi.status, Status::OnTrack);
    assert_eq!(kpi.actual_value, 0.0);
    assert_eq!(kpi.created_at, t0());

    // Created with zero progress halfway through: 0 < 50 - 20.
    let late = tracker
      .create_kpi(new_kpi(category, user), t0() + Duration::days(5))
      .await
      .unwrap();
    assert_eq!(late.status, Status::OffTrack);
  }

  #[tokio::test]
  async fn create_rejects_inverted_window() {
    let (tracker, category, user) = tracker().await;
    let mut new = new_kpi(category, user);
    new.end_date = new.start_date;

    let err = tracker.create_kpi(new, t0()).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[tokio::test]
  async fn create_rejects_empty_title_and_negative_target() {
    let (tracker, category, user) = tracker().await;

    let mut blank = new_kpi(category, user);
    blank.title = "   ".into();
    assert!(matches!(
      tracker.create_kpi(blank, t0()).await.unwrap_err(),
      Error::Validation(_)
    ));

    let mut negative = new_kpi(category, user);
    negative.target_value = -1.0;
    assert!(matches!(
      tracker.create_kpi(negative, t0()).await.unwrap_err(),
      Error::Validation(_)
    ));
  }

  #[tokio::test]
  async fn create_checks_referenced_category_and_user() {
    let (tracker, category, user) = tracker().await;

    let mut bad_category = new_kpi(category, user);
    bad_category.category_id = 999;
    assert!(matches!(
      tracker.create_kpi(bad_category, t0()).await.unwrap_err(),
      Error::CategoryNotFound(999)
    ));

    let mut bad_user = new_kpi(category, user);
    bad_user.assigned_user = 999;
    assert!(matches!(
      tracker.create_kpi(bad_user, t0()).await.unwrap_err(),
      Error::UserNotFound(999)
    ));
  }

  // ── record_value_update ───────────────────────────────────────────────

  #[tokio::test]
  async fn value_update_mutates_kpi_and_appends_record() {
    let (tracker, category, user) = tracker().await;
    let kpi = tracker.create_kpi(new_kpi(category, user), t0()).await.unwrap();

    let now = t0() + Duration::days(5);
    let (updated, record) = tracker
      .record_value_update(kpi.kpi_id, 50.0, Some("halfway".into()), user, now)
      .await
      .unwrap();

    assert_eq!(updated.actual_value, 50.0);
    assert_eq!(updated.status, Status::OnTrack);
    assert_eq!(record.kpi_id, kpi.kpi_id);
    assert_eq!(record.updated_value, 50.0);
    assert_eq!(record.comment.as_deref(), Some("halfway"));
    assert_eq!(record.updated_by, user);
    assert_eq!(record.created_at, now);

    // The stored row agrees with the returned one.
    let stored = tracker.store().kpi(kpi.kpi_id);
    assert_eq!(stored.actual_value, 50.0);
    assert_eq!(stored.status, Status::OnTrack);
  }

  #[tokio::test]
  async fn value_update_recomputes_status_downward() {
    let (tracker, category, user) = tracker().await;
    let kpi = tracker.create_kpi(new_kpi(category, user), t0()).await.unwrap();

    let now = t0() + Duration::days(5);
    let (updated, _) = tracker
      .record_value_update(kpi.kpi_id, 10.0, None, user, now)
      .await
      .unwrap();
    assert_eq!(updated.status, Status::OffTrack);

    let (updated, _) = tracker
      .record_value_update(kpi.kpi_id, 30.0, None, user, now)
      .await
      .unwrap();
    assert_eq!(updated.status, Status::AtRisk);
  }

  #[tokio::test]
  async fn repeated_identical_update_is_idempotent_on_the_kpi() {
    let (tracker, category, user) = tracker().await;
    let kpi = tracker.create_kpi(new_kpi(category, user), t0()).await.unwrap();
    let now = t0() + Duration::days(5);

    let (first, _) = tracker
      .record_value_update(kpi.kpi_id, 40.0, None, user, now)
      .await
      .unwrap();
    let (second, _) = tracker
      .record_value_update(kpi.kpi_id, 40.0, None, user, now)
      .await
      .unwrap();

    // Last write wins on the KPI; the history keeps both entries.
    assert_eq!(first.actual_value, second.actual_value);
    assert_eq!(first.status, second.status);
    assert_eq!(tracker.store().update_count(kpi.kpi_id), 2);
  }

  #[tokio::test]
  async fn value_update_on_missing_kpi_is_not_found() {
    let (tracker, _, user) = tracker().await;
    let err = tracker
      .record_value_update(42, 10.0, None, user, t0())
      .await
      .unwrap_err();
    assert!(matches!(err, Error::KpiNotFound(42)));
  }

  #[tokio::test]
  async fn value_update_rejects_negative_and_oversized_comment() {
    let (tracker, category, user) = tracker().await;
    let kpi = tracker.create_kpi(new_kpi(category, user), t0()).await.unwrap();

    let err = tracker
      .record_value_update(kpi.kpi_id, -5.0, None, user, t0())
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let long = "x".repeat(COMMENT_MAX + 1);
    let err = tracker
      .record_value_update(kpi.kpi_id, 5.0, Some(long), user, t0())
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // Neither attempt touched the KPI or the history.
    assert_eq!(tracker.store().kpi(kpi.kpi_id).actual_value, 0.0);
    assert_eq!(tracker.store().update_count(kpi.kpi_id), 0);
  }

  #[tokio::test]
  async fn revision_conflict_surfaces_as_conflict() {
    let (tracker, category, user) = tracker().await;
    let kpi = tracker.create_kpi(new_kpi(category, user), t0()).await.unwrap();

    tracker.store().force_conflict.store(true, Ordering::SeqCst);
    let err = tracker
      .record_value_update(kpi.kpi_id, 10.0, None, user, t0())
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Conflict(id) if id == kpi.kpi_id));

    // No history entry for a write that never committed.
    assert_eq!(tracker.store().update_count(kpi.kpi_id), 0);
  }

  #[tokio::test]
  async fn failed_record_insert_is_a_partial_write() {
    let (tracker, category, user) = tracker().await;
    let kpi = tracker.create_kpi(new_kpi(category, user), t0()).await.unwrap();

    tracker
      .store()
      .fail_insert_update
      .store(true, Ordering::SeqCst);
    let err = tracker
      .record_value_update(kpi.kpi_id, 25.0, None, user, t0() + Duration::days(2))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::PartialWrite { kpi_id, .. } if kpi_id == kpi.kpi_id));

    // The KPI write stands; only the history entry is missing.
    assert_eq!(tracker.store().kpi(kpi.kpi_id).actual_value, 25.0);
    assert_eq!(tracker.store().update_count(kpi.kpi_id), 0);
  }

  // ── edit_fields ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn edit_with_value_supersedes_manual_status() {
    let (tracker, category, user) = tracker().await;
    let kpi = tracker.create_kpi(new_kpi(category, user), t0()).await.unwrap();

    let patch = KpiPatch {
      actual_value: Some(50.0),
      // The override loses to the recomputation.
      status: Some(Status::OffTrack),
      ..Default::default()
    };
    let edited = tracker
      .edit_fields(kpi.kpi_id, patch, t0() + Duration::days(5))
      .await
      .unwrap();
    assert_eq!(edited.status, Status::OnTrack);
  }

  #[tokio::test]
  async fn edit_without_value_accepts_manual_status() {
    let (tracker, category, user) = tracker().await;
    let kpi = tracker.create_kpi(new_kpi(category, user), t0()).await.unwrap();

    let patch = KpiPatch {
      status: Some(Status::AtRisk),
      ..Default::default()
    };
    let edited = tracker.edit_fields(kpi.kpi_id, patch, t0()).await.unwrap();
    assert_eq!(edited.status, Status::AtRisk);
  }

  #[tokio::test]
  async fn edit_appends_no_history_record() {
    let (tracker, category, user) = tracker().await;
    let kpi = tracker.create_kpi(new_kpi(category, user), t0()).await.unwrap();

    let patch = KpiPatch {
      actual_value: Some(10.0),
      ..Default::default()
    };
    tracker.edit_fields(kpi.kpi_id, patch, t0()).await.unwrap();
    assert_eq!(tracker.store().update_count(kpi.kpi_id), 0);
  }

  #[tokio::test]
  async fn edit_revalidates_the_merged_window() {
    let (tracker, category, user) = tracker().await;
    let kpi = tracker.create_kpi(new_kpi(category, user), t0()).await.unwrap();

    let patch = KpiPatch {
      end_date: Some(t0() - Duration::days(1)),
      ..Default::default()
    };
    let err = tracker.edit_fields(kpi.kpi_id, patch, t0()).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[tokio::test]
  async fn edit_checks_new_references() {
    let (tracker, category, user) = tracker().await;
    let kpi = tracker.create_kpi(new_kpi(category, user), t0()).await.unwrap();

    let patch = KpiPatch {
      assigned_user: Some(999),
      ..Default::default()
    };
    let err = tracker.edit_fields(kpi.kpi_id, patch, t0()).await.unwrap_err();
    assert!(matches!(err, Error::UserNotFound(999)));
  }

  // ── delete_kpi ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn delete_cascades_history() {
    let (tracker, category, user) = tracker().await;
    let kpi = tracker.create_kpi(new_kpi(category, user), t0()).await.unwrap();
    tracker
      .record_value_update(kpi.kpi_id, 10.0, None, user, t0())
      .await
      .unwrap();
    tracker
      .record_value_update(kpi.kpi_id, 20.0, None, user, t0())
      .await
      .unwrap();

    tracker.delete_kpi(kpi.kpi_id).await.unwrap();
    assert_eq!(tracker.store().update_count(kpi.kpi_id), 0);

    let err = tracker.delete_kpi(kpi.kpi_id).await.unwrap_err();
    assert!(matches!(err, Error::KpiNotFound(_)));
  }
}
