//! The append-only message thread attached to each report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who wrote a message. Citizen-authored messages always come from the
/// report's own citizen, so no id is carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "username", rename_all = "snake_case")]
pub enum Author {
  Citizen,
  Staff(String),
}

impl Author {
  /// The staff username, or `None` for the citizen.
  pub fn staff(&self) -> Option<&str> {
    match self {
      Self::Citizen => None,
      Self::Staff(username) => Some(username),
    }
  }
}

/// A message as stored. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub message_id: i64,
  pub report_id:  i64,
  pub author:     Author,
  pub body:       String,
  /// Private messages are visible to staff only.
  pub is_private: bool,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::WorkflowStore::append_message`]. Visibility has
/// already been resolved by [`crate::messaging::authorize_append`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
  pub report_id:  i64,
  pub author:     Author,
  pub body:       String,
  pub is_private: bool,
}
