//! Records left for a citizen or a staff member when something on one of
//! their reports needs attention. Delivery (email, Telegram) happens
//! elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Addressee {
  Citizen(i64),
  Staff(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub notification_id: i64,
  pub report_id:       i64,
  pub addressee:       Addressee,
  pub title:           String,
  pub body:            String,
  pub is_read:         bool,
  pub created_at:      DateTime<Utc>,
}

/// Input to [`crate::store::WorkflowStore::insert_notification`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
  pub report_id: i64,
  pub addressee: Addressee,
  pub title:     String,
  pub body:      String,
}
