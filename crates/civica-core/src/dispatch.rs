//! Notification dispatch.
//!
//! Notifications are side effects of a committed operation. A failed
//! dispatch never unwinds that operation: the workflow service turns it into
//! a [`DispatchWarning`] returned next to the primary result.

use serde::Serialize;

use crate::{
  Error, ErrorKind, Result,
  notification::{Addressee, NewNotification, Notification},
  report::Report,
  store::WorkflowStore,
};

/// A notification that could not be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchWarning {
  pub report_id: i64,
  /// `None` when the addressee itself could not be resolved.
  pub addressee: Option<Addressee>,
  pub kind:      ErrorKind,
  pub message:   String,
}

pub struct NotificationDispatcher<'a, S> {
  store:   &'a S,
  retries: u32,
}

impl<'a, S: WorkflowStore> NotificationDispatcher<'a, S> {
  /// `retries` extra attempts are made when the store fails to record a
  /// notification. Lookup misses are not retried.
  pub fn new(store: &'a S, retries: u32) -> Self { Self { store, retries } }

  /// Notify the citizen who submitted `report`.
  pub async fn notify_citizen(
    &self,
    report: &Report,
    title: &str,
    body: &str,
  ) -> Result<Notification> {
    let citizen_id = report.citizen_id.ok_or_else(|| {
      Error::not_found("citizen", format!("submitter of report {}", report.report_id))
    })?;
    let citizen = self
      .store
      .get_citizen(citizen_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found("citizen", citizen_id))?;

    self
      .deliver(NewNotification {
        report_id: report.report_id,
        addressee: Addressee::Citizen(citizen.citizen_id),
        title:     title.to_owned(),
        body:      body.to_owned(),
      })
      .await
  }

  /// Notify a staff member about `report_id`.
  pub async fn notify_staff(
    &self,
    report_id: i64,
    username: &str,
    title: &str,
    body: &str,
  ) -> Result<Notification> {
    let staff = self
      .store
      .find_staff(username)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found("staff", username))?;

    self
      .deliver(NewNotification {
        report_id,
        addressee: Addressee::Staff(staff.username),
        title: title.to_owned(),
        body: body.to_owned(),
      })
      .await
  }

  /// Mark a notification read. Marking it twice is a no-op.
  pub async fn mark_read(&self, notification_id: i64) -> Result<Notification> {
    self
      .store
      .mark_notification_read(notification_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found("notification", notification_id))
  }

  async fn deliver(&self, input: NewNotification) -> Result<Notification> {
    let mut attempt = 0;
    loop {
      match self.store.insert_notification(input.clone()).await {
        Ok(notification) => return Ok(notification),
        Err(e) if attempt < self.retries => {
          attempt += 1;
          tracing::debug!(
            report_id = input.report_id,
            attempt,
            error = %e,
            "retrying notification"
          );
        }
        Err(e) => return Err(Error::store(e)),
      }
    }
  }
}

/// Record the outcome of a dispatch: failures are logged for follow-up and
/// pushed onto `warnings`.
pub fn settle(
  result: Result<Notification>,
  report_id: i64,
  addressee: Option<Addressee>,
  warnings: &mut Vec<DispatchWarning>,
) {
  match result {
    Ok(notification) => tracing::debug!(
      report_id,
      notification_id = notification.notification_id,
      "notification recorded"
    ),
    Err(e) => {
      tracing::warn!(report_id, error = %e, "notification dropped");
      warnings.push(DispatchWarning {
        report_id,
        addressee,
        kind: e.kind(),
        message: e.to_string(),
      });
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    identity::{NewCitizen, Role, Staff},
    memory::MemoryStore,
    report::{Category, NewReport},
  };

  async fn seeded() -> (MemoryStore, Report) {
    let store = MemoryStore::new();
    let citizen = store
      .add_citizen(NewCitizen {
        username:   "ada".into(),
        email:      "ada@example.org".into(),
        first_name: "Ada".into(),
        last_name:  "Rossi".into(),
      })
      .await
      .unwrap()
      .unwrap();
    let report = store
      .insert_report(NewReport {
        citizen_id:  citizen.citizen_id,
        title:       "Overflowing bin".into(),
        description: "Via Roma corner".into(),
        category:    Category::Waste,
        latitude:    45.07,
        longitude:   7.69,
        anonymous:   true,
        photos:      vec!["bin.jpg".into()],
      })
      .await
      .unwrap();
    (store, report)
  }

  #[tokio::test]
  async fn mark_read_is_idempotent() {
    let (store, report) = seeded().await;
    let dispatcher = NotificationDispatcher::new(&store, 1);
    let n = dispatcher
      .notify_citizen(&report, "Update", "Your report moved")
      .await
      .unwrap();
    assert!(!n.is_read);

    assert!(dispatcher.mark_read(n.notification_id).await.unwrap().is_read);
    assert!(dispatcher.mark_read(n.notification_id).await.unwrap().is_read);
  }

  #[tokio::test]
  async fn missing_notification_is_not_found() {
    let (store, _) = seeded().await;
    let err = NotificationDispatcher::new(&store, 1)
      .mark_read(999)
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  #[tokio::test]
  async fn orphaned_report_cannot_notify_citizen() {
    let (store, report) = seeded().await;
    store.remove_citizen(report.citizen_id.unwrap()).await.unwrap();
    let report = store.get_report(report.report_id).await.unwrap().unwrap();

    let err = NotificationDispatcher::new(&store, 1)
      .notify_citizen(&report, "Update", "body")
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  #[tokio::test]
  async fn staff_notifications_need_a_known_username() {
    let (store, report) = seeded().await;
    store
      .put_staff(Staff::new("t1", Role::Tosm, [Category::Waste]))
      .await
      .unwrap();
    let dispatcher = NotificationDispatcher::new(&store, 0);

    let n = dispatcher
      .notify_staff(report.report_id, "t1", "New message", "hello")
      .await
      .unwrap();
    assert_eq!(n.addressee, Addressee::Staff("t1".into()));

    let err = dispatcher
      .notify_staff(report.report_id, "ghost", "New message", "hello")
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  #[test]
  fn settle_collects_failures() {
    let mut warnings = Vec::new();
    settle(Err(Error::not_found("citizen", 4)), 9, None, &mut warnings);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, ErrorKind::NotFound);
    assert_eq!(warnings[0].report_id, 9);
  }
}
