//! [`SqliteStore`], the SQLite implementation of [`WorkflowStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use civica_core::{
  identity::{Citizen, NewCitizen, Staff},
  message::{Message, NewMessage},
  notification::{Addressee, NewNotification, Notification},
  report::{NewReport, Report, ReportQuery, ReportStatus},
  store::WorkflowStore,
};

use crate::{
  Error, Result,
  encode::{
    CITIZEN_COLUMNS, MESSAGE_COLUMNS, NOTIFICATION_COLUMNS, REPORT_COLUMNS,
    RawCitizen, RawMessage, RawNotification, RawReport, RawStaff,
    decode_dt, encode_addressee, encode_dt, encode_offices, encode_photos, now,
  },
  schema::SCHEMA,
};

const DEFAULT_LIMIT: i64 = 100;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Civica workflow store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::info!(path = %path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
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

fn select_report(
  conn: &rusqlite::Connection,
  report_id: i64,
) -> rusqlite::Result<Option<RawReport>> {
  conn
    .query_row(
      &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE report_id = ?1"),
      rusqlite::params![report_id],
      RawReport::from_row,
    )
    .optional()
}

fn report_exists(conn: &rusqlite::Connection, report_id: i64) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM reports WHERE report_id = ?1",
        rusqlite::params![report_id],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

fn select_notification(
  conn: &rusqlite::Connection,
  notification_id: i64,
) -> rusqlite::Result<Option<RawNotification>> {
  conn
    .query_row(
      &format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE notification_id = ?1"
      ),
      rusqlite::params![notification_id],
      RawNotification::from_row,
    )
    .optional()
}

// ─── WorkflowStore impl ──────────────────────────────────────────────────────

impl WorkflowStore for SqliteStore {
  type Error = Error;

  // ── Identity ──────────────────────────────────────────────────────────────

  async fn add_citizen(&self, input: NewCitizen) -> Result<Option<Citizen>> {
    let created_at = now();
    let at_str = encode_dt(created_at);
    let username = input.username.clone();
    let email = input.email.clone();
    let first_name = input.first_name.clone();
    let last_name = input.last_name.clone();

    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let taken = tx
          .query_row(
            "SELECT 1 FROM citizens WHERE username = ?1",
            rusqlite::params![username],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if taken {
          return Ok(None);
        }
        tx.execute(
          "INSERT INTO citizens (username, email, first_name, last_name, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![username, email, first_name, last_name, at_str],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Some(id))
      })
      .await?;

    Ok(id.map(|citizen_id| Citizen {
      citizen_id,
      username: input.username,
      email: input.email,
      first_name: input.first_name,
      last_name: input.last_name,
      created_at,
    }))
  }

  async fn get_citizen(&self, citizen_id: i64) -> Result<Option<Citizen>> {
    let raw: Option<RawCitizen> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CITIZEN_COLUMNS} FROM citizens WHERE citizen_id = ?1"),
              rusqlite::params![citizen_id],
              RawCitizen::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCitizen::into_citizen).transpose()
  }

  async fn find_citizen(&self, username: &str) -> Result<Option<Citizen>> {
    let username = username.to_owned();
    let raw: Option<RawCitizen> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CITIZEN_COLUMNS} FROM citizens WHERE username = ?1"),
              rusqlite::params![username],
              RawCitizen::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCitizen::into_citizen).transpose()
  }

  async fn remove_citizen(&self, citizen_id: i64) -> Result<bool> {
    // Reports keep their row via ON DELETE SET NULL; the citizen's
    // notifications go with them via ON DELETE CASCADE.
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM citizens WHERE citizen_id = ?1",
          rusqlite::params![citizen_id],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }

  async fn put_staff(&self, staff: Staff) -> Result<()> {
    let offices = encode_offices(&staff.offices)?;
    let role = staff.role.as_str();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO staff (username, role, offices) VALUES (?1, ?2, ?3)
           ON CONFLICT(username) DO UPDATE SET role = excluded.role, offices = excluded.offices",
          rusqlite::params![staff.username, role, offices],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn find_staff(&self, username: &str) -> Result<Option<Staff>> {
    let username = username.to_owned();
    let raw: Option<RawStaff> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT username, role, offices FROM staff WHERE username = ?1",
              rusqlite::params![username],
              |row| {
                Ok(RawStaff {
                  username: row.get(0)?,
                  role:     row.get(1)?,
                  offices:  row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStaff::into_staff).transpose()
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  async fn insert_report(&self, input: NewReport) -> Result<Report> {
    let created_at = now();
    let at_str = encode_dt(created_at);
    let [photo1, photo2, photo3] = encode_photos(&input.photos);
    let photo1 = photo1.ok_or(Error::MissingPhoto)?;
    let category = input.category.as_str();
    let status = ReportStatus::Pending.as_str();
    let title = input.title.clone();
    let description = input.description.clone();
    let citizen_id = input.citizen_id;
    let (latitude, longitude, anonymous) = (input.latitude, input.longitude, input.anonymous);

    let report_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO reports (
             citizen_id, title, description, category, latitude, longitude,
             anonymous, photo1, photo2, photo3, status, created_at, updated_at, version
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12, 0)",
          rusqlite::params![
            citizen_id,
            title,
            description,
            category,
            latitude,
            longitude,
            anonymous,
            photo1,
            photo2,
            photo3,
            status,
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Report {
      report_id,
      citizen_id: Some(input.citizen_id),
      title: input.title,
      description: input.description,
      category: input.category,
      latitude: input.latitude,
      longitude: input.longitude,
      anonymous: input.anonymous,
      photos: input.photos.into_iter().take(3).collect(),
      status: ReportStatus::Pending,
      assigned_staff: None,
      assigned_maintainer: None,
      comment: None,
      created_at,
      updated_at: created_at,
      version: 0,
    })
  }

  async fn get_report(&self, report_id: i64) -> Result<Option<Report>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_report(conn, report_id)?))
      .await?;

    raw.map(RawReport::into_report).transpose()
  }

  async fn swap_report(&self, expected_version: i64, next: Report) -> Result<Option<Report>> {
    let report_id = next.report_id;
    let status = next.status.as_str();
    let category = next.category.as_str();
    let updated_at = encode_dt(next.updated_at);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE reports SET
             status = ?1, category = ?2, assigned_staff = ?3,
             assigned_maintainer = ?4, comment = ?5, updated_at = ?6,
             version = version + 1
           WHERE report_id = ?7 AND version = ?8",
          rusqlite::params![
            status,
            category,
            next.assigned_staff,
            next.assigned_maintainer,
            next.comment,
            updated_at,
            report_id,
            expected_version,
          ],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        let raw = select_report(&tx, report_id)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    if raw.is_none() {
      tracing::debug!(report_id, expected_version, "stale report swap refused");
    }
    raw.map(RawReport::into_report).transpose()
  }

  async fn query_reports(&self, query: &ReportQuery) -> Result<Vec<Report>> {
    let status = query.status.map(|s| s.as_str());
    let category = query.category.map(|c| c.as_str());
    let citizen_id = query.citizen_id;
    let staff = query.assigned_staff.clone();
    let maintainer = query.assigned_maintainer.clone();
    let limit = query.limit.map_or(DEFAULT_LIMIT, |n| n as i64);
    let offset = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawReport> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REPORT_COLUMNS} FROM reports
           WHERE (?1 IS NULL OR status = ?1)
             AND (?2 IS NULL OR category = ?2)
             AND (?3 IS NULL OR citizen_id = ?3)
             AND (?4 IS NULL OR assigned_staff = ?4)
             AND (?5 IS NULL OR assigned_maintainer = ?5)
           ORDER BY report_id
           LIMIT ?6 OFFSET ?7"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![status, category, citizen_id, staff, maintainer, limit, offset],
            RawReport::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReport::into_report).collect()
  }

  // ── Messages, append-only ────────────────────────────────────────────────

  async fn append_message(&self, input: NewMessage) -> Result<Message> {
    let report_id = input.report_id;
    let author_staff = input.author.staff().map(str::to_owned);
    let body = input.body.clone();
    let is_private = input.is_private;

    // The timestamp is taken on the connection thread and clamped to the
    // thread's latest message, so id order agrees with time order even if
    // the wall clock steps back. Fixed-width encoding makes `max` on the
    // strings a chronological max.
    let stored: Option<(i64, String)> = self
      .conn
      .call(move |conn| {
        if !report_exists(conn, report_id)? {
          return Ok(None);
        }
        let latest: Option<String> = conn.query_row(
          "SELECT max(created_at) FROM messages WHERE report_id = ?1",
          rusqlite::params![report_id],
          |row| row.get(0),
        )?;
        let created_at = latest.map_or_else(
          || encode_dt(now()),
          |latest| latest.max(encode_dt(now())),
        );
        conn.execute(
          "INSERT INTO messages (report_id, author_staff, body, is_private, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![report_id, author_staff, body, is_private, created_at],
        )?;
        Ok(Some((conn.last_insert_rowid(), created_at)))
      })
      .await?;

    let (message_id, created_at) = stored.ok_or(Error::ReportNotFound(report_id))?;
    Ok(Message {
      message_id,
      report_id,
      author: input.author,
      body: input.body,
      is_private,
      created_at: decode_dt(&created_at)?,
    })
  }

  async fn list_messages(&self, report_id: i64) -> Result<Vec<Message>> {
    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages
           WHERE report_id = ?1
           ORDER BY created_at, message_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![report_id], RawMessage::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn insert_notification(&self, input: NewNotification) -> Result<Notification> {
    let created_at = now();
    let at_str = encode_dt(created_at);
    let report_id = input.report_id;
    let (citizen_id, staff_username) = encode_addressee(&input.addressee);
    let title = input.title.clone();
    let body = input.body.clone();

    let notification_id: Option<i64> = self
      .conn
      .call(move |conn| {
        if !report_exists(conn, report_id)? {
          return Ok(None);
        }
        conn.execute(
          "INSERT INTO notifications (
             report_id, citizen_id, staff_username, title, body, is_read, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
          rusqlite::params![report_id, citizen_id, staff_username, title, body, at_str],
        )?;
        Ok(Some(conn.last_insert_rowid()))
      })
      .await?;

    Ok(Notification {
      notification_id: notification_id.ok_or(Error::ReportNotFound(report_id))?,
      report_id,
      addressee: input.addressee,
      title: input.title,
      body: input.body,
      is_read: false,
      created_at,
    })
  }

  async fn get_notification(&self, notification_id: i64) -> Result<Option<Notification>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_notification(conn, notification_id)?))
      .await?;

    raw.map(RawNotification::into_notification).transpose()
  }

  async fn mark_notification_read(
    &self,
    notification_id: i64,
  ) -> Result<Option<Notification>> {
    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE notifications SET is_read = 1 WHERE notification_id = ?1",
          rusqlite::params![notification_id],
        )?;
        Ok(select_notification(conn, notification_id)?)
      })
      .await?;

    raw.map(RawNotification::into_notification).transpose()
  }

  async fn list_notifications(&self, addressee: &Addressee) -> Result<Vec<Notification>> {
    let (citizen_id, staff_username) = encode_addressee(addressee);

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications
           WHERE citizen_id IS ?1 AND staff_username IS ?2
           ORDER BY created_at DESC, notification_id DESC"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![citizen_id, staff_username],
            RawNotification::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNotification::into_notification).collect()
  }
}
