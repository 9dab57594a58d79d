//! [`SqliteStore`] — the SQLite implementation of [`KpiStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use stride_core::{
  kpi::{
    Category, CategoryId, Kpi, KpiId, KpiUpdate, NewCategory, NewKpi,
    NewKpiUpdate, NewUser, User, UserId,
  },
  status::Status,
  store::{KpiQuery, KpiStore, SortField, SortOrder},
};

use crate::{
  Error, Result,
  encode::{
    RawCategory, RawKpi, RawUpdate, RawUser, encode_dt, encode_status,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Stride KPI store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. Per-KPI
/// write serialization comes from the `revision` check in
/// [`update_kpi`](KpiStore::update_kpi) on top of SQLite's single-writer
/// model.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── KpiStore impl ───────────────────────────────────────────────────────────

impl KpiStore for SqliteStore {
  type Error = Error;

  // ── KPIs ──────────────────────────────────────────────────────────────────

  async fn insert_kpi(
    &self,
    new: NewKpi,
    status: Status,
    now: DateTime<Utc>,
  ) -> Result<Kpi> {
    let title         = new.title.clone();
    let description   = new.description.clone();
    let status_str    = encode_status(status).to_owned();
    let start_str     = encode_dt(new.start_date);
    let end_str       = encode_dt(new.end_date);
    let now_str       = encode_dt(now);
    let category_id   = new.category_id;
    let target_value  = new.target_value;
    let actual_value  = new.actual_value;
    let assigned_user = new.assigned_user;

    let kpi_id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO kpis (
             title, description, category_id, target_value, actual_value,
             status, assigned_user, start_date, end_date,
             revision, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?10)",
          rusqlite::params![
            title,
            description,
            category_id,
            target_value,
            actual_value,
            status_str,
            assigned_user,
            start_str,
            end_str,
            now_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Kpi {
      kpi_id,
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
    })
  }

  async fn get_kpi(&self, id: KpiId) -> Result<Option<Kpi>> {
    let raw: Option<RawKpi> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM kpis WHERE kpi_id = ?1", RawKpi::COLUMNS),
              rusqlite::params![id],
              RawKpi::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawKpi::into_kpi).transpose()
  }

  async fn list_kpis(&self, query: &KpiQuery) -> Result<Vec<Kpi>> {
    let status_str  = query.status.map(encode_status).map(str::to_owned);
    let user_filter = query.assigned_user;
    let cat_filter  = query.category_id;
    let pattern     = query.search.as_deref().map(|s| format!("%{s}%"));

    let order_col = match query.sort_by {
      SortField::CreatedAt => "created_at",
      SortField::Title => "title",
      SortField::EndDate => "end_date",
      SortField::TargetValue => "target_value",
    };
    let order_dir = match query.sort_order {
      SortOrder::Asc => "ASC",
      SortOrder::Desc => "DESC",
    };

    let raws: Vec<RawKpi> = self
      .conn
      .call(move |conn| {
        // Every filter is always bound; NULL params disable their clause.
        // `kpi_id` breaks ties so equal sort keys still order stably.
        let sql = format!(
          "SELECT {} FROM kpis
           WHERE (?1 IS NULL OR status = ?1)
             AND (?2 IS NULL OR assigned_user = ?2)
             AND (?3 IS NULL OR category_id = ?3)
             AND (?4 IS NULL
                  OR title LIKE ?4
                  OR IFNULL(description, '') LIKE ?4)
           ORDER BY {order_col} {order_dir}, kpi_id {order_dir}",
          RawKpi::COLUMNS,
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              status_str.as_deref(),
              user_filter,
              cat_filter,
              pattern.as_deref(),
            ],
            RawKpi::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawKpi::into_kpi).collect()
  }

  async fn overdue_kpis(&self, now: DateTime<Utc>) -> Result<Vec<Kpi>> {
    let now_str = encode_dt(now);

    let raws: Vec<RawKpi> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM kpis
           WHERE end_date < ?1 AND status != ?2
           ORDER BY end_date ASC, kpi_id ASC",
          RawKpi::COLUMNS,
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![now_str, Status::OffTrack.as_str()],
            RawKpi::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawKpi::into_kpi).collect()
  }

  async fn update_kpi(&self, kpi: Kpi, now: DateTime<Utc>) -> Result<Option<Kpi>> {
    let title         = kpi.title.clone();
    let description   = kpi.description.clone();
    let status_str    = encode_status(kpi.status).to_owned();
    let start_str     = encode_dt(kpi.start_date);
    let end_str       = encode_dt(kpi.end_date);
    let now_str       = encode_dt(now);
    let kpi_id        = kpi.kpi_id;
    let category_id   = kpi.category_id;
    let target_value  = kpi.target_value;
    let actual_value  = kpi.actual_value;
    let assigned_user = kpi.assigned_user;
    let revision      = kpi.revision;

    let rows: usize = self
      .conn
      .call(move |conn| {
        // The revision predicate is the optimistic-concurrency check: a
        // concurrent writer bumped it first and this statement matches
        // nothing.
        Ok(conn.execute(
          "UPDATE kpis SET
             title = ?1, description = ?2, category_id = ?3,
             target_value = ?4, actual_value = ?5, status = ?6,
             assigned_user = ?7, start_date = ?8, end_date = ?9,
             revision = revision + 1, updated_at = ?10
           WHERE kpi_id = ?11 AND revision = ?12",
          rusqlite::params![
            title,
            description,
            category_id,
            target_value,
            actual_value,
            status_str,
            assigned_user,
            start_str,
            end_str,
            now_str,
            kpi_id,
            revision,
          ],
        )?)
      })
      .await?;

    if rows == 0 {
      return Ok(None);
    }

    Ok(Some(Kpi {
      revision: kpi.revision + 1,
      updated_at: now,
      ..kpi
    }))
  }

  async fn delete_kpi(&self, id: KpiId) -> Result<bool> {
    let deleted: bool = self
      .conn
      .call(move |conn| {
        // History rows go in the same transaction as the KPI, so a crash
        // mid-delete can never leave orphaned updates.
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM kpi_updates WHERE kpi_id = ?1",
          rusqlite::params![id],
        )?;
        let rows =
          tx.execute("DELETE FROM kpis WHERE kpi_id = ?1", rusqlite::params![id])?;
        tx.commit()?;
        Ok(rows > 0)
      })
      .await?;

    Ok(deleted)
  }

  // ── Update records — append-only ──────────────────────────────────────────

  async fn insert_update(
    &self,
    new: NewKpiUpdate,
    now: DateTime<Utc>,
  ) -> Result<KpiUpdate> {
    let comment  = new.comment.clone();
    let now_str  = encode_dt(now);
    let kpi_id   = new.kpi_id;
    let value    = new.updated_value;
    let actor    = new.updated_by;

    let update_id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO kpi_updates (
             kpi_id, updated_value, comment, updated_by, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![kpi_id, value, comment, actor, now_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(KpiUpdate {
      update_id,
      kpi_id: new.kpi_id,
      updated_value: new.updated_value,
      comment: new.comment,
      updated_by: new.updated_by,
      created_at: now,
    })
  }

  async fn updates_for_kpi(
    &self,
    kpi_id: KpiId,
    limit: Option<usize>,
  ) -> Result<Vec<KpiUpdate>> {
    let limit_val = limit.map(|l| l as i64).unwrap_or(-1);

    let raws: Vec<RawUpdate> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM kpi_updates
           WHERE kpi_id = ?1
           ORDER BY created_at DESC, update_id DESC
           LIMIT ?2",
          RawUpdate::COLUMNS,
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![kpi_id, limit_val], RawUpdate::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUpdate::into_update).collect()
  }

  async fn updates_by_user(&self, user_id: UserId) -> Result<Vec<KpiUpdate>> {
    let raws: Vec<RawUpdate> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM kpi_updates
           WHERE updated_by = ?1
           ORDER BY created_at DESC, update_id DESC",
          RawUpdate::COLUMNS,
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![user_id], RawUpdate::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUpdate::into_update).collect()
  }

  async fn recent_updates(&self, limit: usize) -> Result<Vec<KpiUpdate>> {
    let limit_val = limit as i64;

    let raws: Vec<RawUpdate> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM kpi_updates
           ORDER BY created_at DESC, update_id DESC
           LIMIT ?1",
          RawUpdate::COLUMNS,
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val], RawUpdate::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUpdate::into_update).collect()
  }

  // ── Directory ─────────────────────────────────────────────────────────────

  async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
    let raw: Option<RawCategory> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT category_id, name, description
               FROM categories WHERE category_id = ?1",
              rusqlite::params![id],
              RawCategory::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    Ok(raw.map(RawCategory::into_category))
  }

  async fn list_categories(&self) -> Result<Vec<Category>> {
    let raws: Vec<RawCategory> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT category_id, name, description
           FROM categories ORDER BY category_id ASC",
        )?;
        let rows = stmt
          .query_map([], RawCategory::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawCategory::into_category).collect())
  }

  async fn insert_category(&self, new: NewCategory) -> Result<Category> {
    let name        = new.name.clone();
    let description = new.description.clone();

    let category_id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO categories (name, description) VALUES (?1, ?2)",
          rusqlite::params![name, description],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Category {
      category_id,
      name: new.name,
      description: new.description,
    })
  }

  async fn get_user(&self, id: UserId) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, username, email FROM users WHERE user_id = ?1",
              rusqlite::params![id],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    Ok(raw.map(RawUser::into_user))
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT user_id, username, email FROM users ORDER BY user_id ASC",
        )?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawUser::into_user).collect())
  }

  async fn insert_user(&self, new: NewUser) -> Result<User> {
    let username = new.username.clone();
    let email    = new.email.clone();

    let user_id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (username, email) VALUES (?1, ?2)",
          rusqlite::params![username, email],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(User {
      user_id,
      username: new.username,
      email: new.email,
    })
  }
}
