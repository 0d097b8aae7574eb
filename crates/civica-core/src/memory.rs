//! In-memory implementation of [`WorkflowStore`].
//!
//! All state lives behind one `RwLock`, so every method is atomic with
//! respect to every other. Nothing survives a restart; used by tests and
//! demos.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::{
  identity::{Citizen, NewCitizen, Staff},
  message::{Message, NewMessage},
  notification::{Addressee, NewNotification, Notification},
  report::{NewReport, Report, ReportQuery, ReportStatus},
  store::WorkflowStore,
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("report not found: {0}")]
  ReportNotFound(i64),
}

#[derive(Default)]
struct Inner {
  next_id:       i64,
  citizens:      BTreeMap<i64, Citizen>,
  staff:         HashMap<String, Staff>,
  reports:       BTreeMap<i64, Report>,
  messages:      Vec<Message>,
  notifications: BTreeMap<i64, Notification>,
}

impl Inner {
  fn next_id(&mut self) -> i64 {
    self.next_id += 1;
    self.next_id
  }
}

#[derive(Default)]
pub struct MemoryStore {
  inner: RwLock<Inner>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }
}

impl WorkflowStore for MemoryStore {
  type Error = MemoryError;

  // ── Identity ──────────────────────────────────────────────────────────────

  async fn add_citizen(&self, input: NewCitizen) -> Result<Option<Citizen>, MemoryError> {
    let mut inner = self.inner.write().await;
    if inner.citizens.values().any(|c| c.username == input.username) {
      return Ok(None);
    }
    let citizen = Citizen {
      citizen_id: inner.next_id(),
      username:   input.username,
      email:      input.email,
      first_name: input.first_name,
      last_name:  input.last_name,
      created_at: Utc::now(),
    };
    inner.citizens.insert(citizen.citizen_id, citizen.clone());
    Ok(Some(citizen))
  }

  async fn get_citizen(&self, citizen_id: i64) -> Result<Option<Citizen>, MemoryError> {
    Ok(self.inner.read().await.citizens.get(&citizen_id).cloned())
  }

  async fn find_citizen(&self, username: &str) -> Result<Option<Citizen>, MemoryError> {
    let inner = self.inner.read().await;
    Ok(inner.citizens.values().find(|c| c.username == username).cloned())
  }

  async fn remove_citizen(&self, citizen_id: i64) -> Result<bool, MemoryError> {
    let mut inner = self.inner.write().await;
    if inner.citizens.remove(&citizen_id).is_none() {
      return Ok(false);
    }
    for report in inner.reports.values_mut() {
      if report.citizen_id == Some(citizen_id) {
        report.citizen_id = None;
      }
    }
    inner
      .notifications
      .retain(|_, n| n.addressee != Addressee::Citizen(citizen_id));
    Ok(true)
  }

  async fn put_staff(&self, staff: Staff) -> Result<(), MemoryError> {
    let mut inner = self.inner.write().await;
    inner.staff.insert(staff.username.clone(), staff);
    Ok(())
  }

  async fn find_staff(&self, username: &str) -> Result<Option<Staff>, MemoryError> {
    Ok(self.inner.read().await.staff.get(username).cloned())
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  async fn insert_report(&self, input: NewReport) -> Result<Report, MemoryError> {
    let mut inner = self.inner.write().await;
    let now = Utc::now();
    let report = Report {
      report_id:           inner.next_id(),
      citizen_id:          Some(input.citizen_id),
      title:               input.title,
      description:         input.description,
      category:            input.category,
      latitude:            input.latitude,
      longitude:           input.longitude,
      anonymous:           input.anonymous,
      photos:              input.photos,
      status:              ReportStatus::Pending,
      assigned_staff:      None,
      assigned_maintainer: None,
      comment:             None,
      created_at:          now,
      updated_at:          now,
      version:             0,
    };
    inner.reports.insert(report.report_id, report.clone());
    Ok(report)
  }

  async fn get_report(&self, report_id: i64) -> Result<Option<Report>, MemoryError> {
    Ok(self.inner.read().await.reports.get(&report_id).cloned())
  }

  async fn swap_report(
    &self,
    expected_version: i64,
    next: Report,
  ) -> Result<Option<Report>, MemoryError> {
    let mut inner = self.inner.write().await;
    let Some(stored) = inner.reports.get_mut(&next.report_id) else {
      return Ok(None);
    };
    if stored.version != expected_version {
      return Ok(None);
    }
    stored.status = next.status;
    stored.category = next.category;
    stored.assigned_staff = next.assigned_staff;
    stored.assigned_maintainer = next.assigned_maintainer;
    stored.comment = next.comment;
    stored.updated_at = next.updated_at;
    stored.version += 1;
    Ok(Some(stored.clone()))
  }

  async fn query_reports(&self, query: &ReportQuery) -> Result<Vec<Report>, MemoryError> {
    let inner = self.inner.read().await;
    Ok(
      inner
        .reports
        .values()
        .filter(|r| query.matches(r))
        .skip(query.offset.unwrap_or(0))
        .take(query.limit.unwrap_or(100))
        .cloned()
        .collect(),
    )
  }

  // ── Messages ──────────────────────────────────────────────────────────────

  async fn append_message(&self, input: NewMessage) -> Result<Message, MemoryError> {
    let mut inner = self.inner.write().await;
    if !inner.reports.contains_key(&input.report_id) {
      return Err(MemoryError::ReportNotFound(input.report_id));
    }
    // Never stamp earlier than the thread's latest message, even if the
    // wall clock stepped back.
    let latest = inner
      .messages
      .iter()
      .filter(|m| m.report_id == input.report_id)
      .map(|m| m.created_at)
      .max();
    let created_at = latest.map_or_else(Utc::now, |t| t.max(Utc::now()));
    let message = Message {
      message_id: inner.next_id(),
      report_id: input.report_id,
      author: input.author,
      body: input.body,
      is_private: input.is_private,
      created_at,
    };
    inner.messages.push(message.clone());
    Ok(message)
  }

  async fn list_messages(&self, report_id: i64) -> Result<Vec<Message>, MemoryError> {
    let inner = self.inner.read().await;
    // Appends happen under the write lock with clamped timestamps, so push
    // order is `(created_at, message_id)` order.
    Ok(
      inner
        .messages
        .iter()
        .filter(|m| m.report_id == report_id)
        .cloned()
        .collect(),
    )
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn insert_notification(
    &self,
    input: NewNotification,
  ) -> Result<Notification, MemoryError> {
    let mut inner = self.inner.write().await;
    if !inner.reports.contains_key(&input.report_id) {
      return Err(MemoryError::ReportNotFound(input.report_id));
    }
    let notification = Notification {
      notification_id: inner.next_id(),
      report_id:       input.report_id,
      addressee:       input.addressee,
      title:           input.title,
      body:            input.body,
      is_read:         false,
      created_at:      Utc::now(),
    };
    inner
      .notifications
      .insert(notification.notification_id, notification.clone());
    Ok(notification)
  }

  async fn get_notification(
    &self,
    notification_id: i64,
  ) -> Result<Option<Notification>, MemoryError> {
    Ok(self.inner.read().await.notifications.get(&notification_id).cloned())
  }

  async fn mark_notification_read(
    &self,
    notification_id: i64,
  ) -> Result<Option<Notification>, MemoryError> {
    let mut inner = self.inner.write().await;
    Ok(inner.notifications.get_mut(&notification_id).map(|n| {
      n.is_read = true;
      n.clone()
    }))
  }

  async fn list_notifications(
    &self,
    addressee: &Addressee,
  ) -> Result<Vec<Notification>, MemoryError> {
    let inner = self.inner.read().await;
    Ok(
      inner
        .notifications
        .values()
        .rev()
        .filter(|n| &n.addressee == addressee)
        .cloned()
        .collect(),
    )
  }
}
