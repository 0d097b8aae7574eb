//! The `WorkflowStore` trait.
//!
//! The trait is implemented by storage backends ([`crate::memory::MemoryStore`]
//! here, `civica-store-sqlite` elsewhere). The workflow service depends on
//! this abstraction, never on a concrete backend.

use std::future::Future;

use crate::{
  identity::{Citizen, NewCitizen, Staff},
  message::{Message, NewMessage},
  notification::{Addressee, NewNotification, Notification},
  report::{NewReport, Report, ReportQuery},
};

/// Persistence for reports, their threads, and notifications, plus read
/// access to the identity directory.
///
/// Messages and notifications are append-only. Reports are written only
/// through [`WorkflowStore::swap_report`], a compare-and-swap on the report's
/// `version`.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait WorkflowStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Identity ──────────────────────────────────────────────────────────

  /// Register a citizen. Usernames are unique: returns `None`, and stores
  /// nothing, if the username is already taken.
  fn add_citizen(
    &self,
    input: NewCitizen,
  ) -> impl Future<Output = Result<Option<Citizen>, Self::Error>> + Send + '_;

  fn get_citizen(
    &self,
    citizen_id: i64,
  ) -> impl Future<Output = Result<Option<Citizen>, Self::Error>> + Send + '_;

  fn find_citizen<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<Citizen>, Self::Error>> + Send + 'a;

  /// Remove a citizen. Their reports survive with `citizen_id` cleared.
  /// Returns `false` if no such citizen existed.
  fn remove_citizen(
    &self,
    citizen_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Insert or replace a staff record, keyed by username.
  fn put_staff(
    &self,
    staff: Staff,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn find_staff<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<Staff>, Self::Error>> + Send + 'a;

  // ── Reports ───────────────────────────────────────────────────────────

  /// Persist a new report in `Pending` status at version 0.
  fn insert_report(
    &self,
    input: NewReport,
  ) -> impl Future<Output = Result<Report, Self::Error>> + Send + '_;

  fn get_report(
    &self,
    report_id: i64,
  ) -> impl Future<Output = Result<Option<Report>, Self::Error>> + Send + '_;

  /// Atomically replace the workflow fields (status, category, assignees,
  /// comment, `updated_at`) of `next.report_id`, provided the stored version
  /// still equals `expected_version`.
  ///
  /// Returns the stored report with its version bumped, or `None` if the
  /// report is missing or another writer got there first.
  fn swap_report(
    &self,
    expected_version: i64,
    next: Report,
  ) -> impl Future<Output = Result<Option<Report>, Self::Error>> + Send + '_;

  /// Reports matching `query`, oldest first.
  fn query_reports<'a>(
    &'a self,
    query: &'a ReportQuery,
  ) -> impl Future<Output = Result<Vec<Report>, Self::Error>> + Send + 'a;

  // ── Messages, append-only ────────────────────────────────────────────

  /// Append to a report's thread. The store assigns the id and the
  /// timestamp, both monotonic per report.
  fn append_message(
    &self,
    input: NewMessage,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;

  /// The whole thread, ordered by `(created_at, message_id)`.
  fn list_messages(
    &self,
    report_id: i64,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  fn insert_notification(
    &self,
    input: NewNotification,
  ) -> impl Future<Output = Result<Notification, Self::Error>> + Send + '_;

  fn get_notification(
    &self,
    notification_id: i64,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  /// Set `is_read`. Returns the notification as stored, or `None` if it does
  /// not exist. Marking an already-read notification is not an error.
  fn mark_notification_read(
    &self,
    notification_id: i64,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  /// Notifications for `addressee`, newest first.
  fn list_notifications<'a>(
    &'a self,
    addressee: &'a Addressee,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + 'a;
}
