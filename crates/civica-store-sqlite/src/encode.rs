//! Conversions between domain types and the plain values stored in SQLite
//! columns.
//!
//! Timestamps are fixed-width RFC 3339 strings with microsecond precision, so
//! lexical order in SQL is chronological order. Enums are stored as their
//! snake_case codes. Staff offices are a compact JSON array.

use std::{collections::BTreeSet, str::FromStr};

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use civica_core::{
  identity::{Citizen, Role, Staff},
  message::{Author, Message},
  notification::{Addressee, Notification},
  report::{Category, Report, ReportStatus},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enum codes ──────────────────────────────────────────────────────────────

fn decode_code<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::UnknownValue {
    column,
    value: s.to_owned(),
  })
}

pub fn decode_status(s: &str) -> Result<ReportStatus> { decode_code("status", s) }

pub fn decode_category(s: &str) -> Result<Category> { decode_code("category", s) }

pub fn decode_role(s: &str) -> Result<Role> { decode_code("role", s) }

// ─── Offices ─────────────────────────────────────────────────────────────────

pub fn encode_offices(offices: &BTreeSet<Category>) -> Result<String> {
  Ok(serde_json::to_string(offices)?)
}

pub fn decode_offices(s: &str) -> Result<BTreeSet<Category>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Photos ──────────────────────────────────────────────────────────────────

/// Split the photo list over the three photo columns. Anything past the third
/// is dropped; the workflow caps the list before it gets here.
pub fn encode_photos(photos: &[String]) -> [Option<String>; 3] {
  let mut slots = [None, None, None];
  for (slot, photo) in slots.iter_mut().zip(photos) {
    *slot = Some(photo.clone());
  }
  slots
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const REPORT_COLUMNS: &str = "report_id, citizen_id, title, description, category, \
   latitude, longitude, anonymous, photo1, photo2, photo3, status, \
   assigned_staff, assigned_maintainer, comment, created_at, updated_at, version";

/// Raw values read directly from a `reports` row, in [`REPORT_COLUMNS`] order.
pub struct RawReport {
  pub report_id:           i64,
  pub citizen_id:          Option<i64>,
  pub title:               String,
  pub description:         String,
  pub category:            String,
  pub latitude:            f64,
  pub longitude:           f64,
  pub anonymous:           bool,
  pub photos:              [Option<String>; 3],
  pub status:              String,
  pub assigned_staff:      Option<String>,
  pub assigned_maintainer: Option<String>,
  pub comment:             Option<String>,
  pub created_at:          String,
  pub updated_at:          String,
  pub version:             i64,
}

impl RawReport {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      report_id:           row.get(0)?,
      citizen_id:          row.get(1)?,
      title:               row.get(2)?,
      description:         row.get(3)?,
      category:            row.get(4)?,
      latitude:            row.get(5)?,
      longitude:           row.get(6)?,
      anonymous:           row.get(7)?,
      photos:              [row.get(8)?, row.get(9)?, row.get(10)?],
      status:              row.get(11)?,
      assigned_staff:      row.get(12)?,
      assigned_maintainer: row.get(13)?,
      comment:             row.get(14)?,
      created_at:          row.get(15)?,
      updated_at:          row.get(16)?,
      version:             row.get(17)?,
    })
  }

  pub fn into_report(self) -> Result<Report> {
    let photos: Vec<String> = self.photos.into_iter().flatten().collect();
    if photos.is_empty() {
      return Err(Error::MissingPhoto);
    }

    Ok(Report {
      report_id: self.report_id,
      citizen_id: self.citizen_id,
      title: self.title,
      description: self.description,
      category: decode_category(&self.category)?,
      latitude: self.latitude,
      longitude: self.longitude,
      anonymous: self.anonymous,
      photos,
      status: decode_status(&self.status)?,
      assigned_staff: self.assigned_staff,
      assigned_maintainer: self.assigned_maintainer,
      comment: self.comment,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      version: self.version,
    })
  }
}

pub const CITIZEN_COLUMNS: &str =
  "citizen_id, username, email, first_name, last_name, created_at";

pub struct RawCitizen {
  pub citizen_id: i64,
  pub username:   String,
  pub email:      String,
  pub first_name: String,
  pub last_name:  String,
  pub created_at: String,
}

impl RawCitizen {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      citizen_id: row.get(0)?,
      username:   row.get(1)?,
      email:      row.get(2)?,
      first_name: row.get(3)?,
      last_name:  row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_citizen(self) -> Result<Citizen> {
    Ok(Citizen {
      citizen_id: self.citizen_id,
      username:   self.username,
      email:      self.email,
      first_name: self.first_name,
      last_name:  self.last_name,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawStaff {
  pub username: String,
  pub role:     String,
  pub offices:  String,
}

impl RawStaff {
  pub fn into_staff(self) -> Result<Staff> {
    Ok(Staff {
      username: self.username,
      role:     decode_role(&self.role)?,
      offices:  decode_offices(&self.offices)?,
    })
  }
}

pub const MESSAGE_COLUMNS: &str =
  "message_id, report_id, author_staff, body, is_private, created_at";

pub struct RawMessage {
  pub message_id:   i64,
  pub report_id:    i64,
  pub author_staff: Option<String>,
  pub body:         String,
  pub is_private:   bool,
  pub created_at:   String,
}

impl RawMessage {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      message_id:   row.get(0)?,
      report_id:    row.get(1)?,
      author_staff: row.get(2)?,
      body:         row.get(3)?,
      is_private:   row.get(4)?,
      created_at:   row.get(5)?,
    })
  }

  pub fn into_message(self) -> Result<Message> {
    Ok(Message {
      message_id: self.message_id,
      report_id:  self.report_id,
      author:     self.author_staff.map_or(Author::Citizen, Author::Staff),
      body:       self.body,
      is_private: self.is_private,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const NOTIFICATION_COLUMNS: &str = "notification_id, report_id, citizen_id, \
   staff_username, title, body, is_read, created_at";

pub struct RawNotification {
  pub notification_id: i64,
  pub report_id:       i64,
  pub citizen_id:      Option<i64>,
  pub staff_username:  Option<String>,
  pub title:           String,
  pub body:            String,
  pub is_read:         bool,
  pub created_at:      String,
}

impl RawNotification {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id: row.get(0)?,
      report_id:       row.get(1)?,
      citizen_id:      row.get(2)?,
      staff_username:  row.get(3)?,
      title:           row.get(4)?,
      body:            row.get(5)?,
      is_read:         row.get(6)?,
      created_at:      row.get(7)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    let addressee = match (self.citizen_id, self.staff_username) {
      (Some(id), None) => Addressee::Citizen(id),
      (None, Some(username)) => Addressee::Staff(username),
      _ => {
        return Err(Error::UnknownValue {
          column: "addressee",
          value:  format!("notification {}", self.notification_id),
        });
      }
    };
    Ok(Notification {
      notification_id: self.notification_id,
      report_id: self.report_id,
      addressee,
      title: self.title,
      body: self.body,
      is_read: self.is_read,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Split an addressee over the `(citizen_id, staff_username)` column pair.
pub fn encode_addressee(addressee: &Addressee) -> (Option<i64>, Option<String>) {
  match addressee {
    Addressee::Citizen(id) => (Some(*id), None),
    Addressee::Staff(username) => (None, Some(username.clone())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let early = decode_dt("2026-01-02T03:04:05.000007Z").unwrap();
    let late = decode_dt("2026-01-02T03:04:05.1Z").unwrap();
    assert!(encode_dt(early) < encode_dt(late));
    assert_eq!(encode_dt(early), "2026-01-02T03:04:05.000007Z");
  }

  #[test]
  fn now_survives_a_round_trip() {
    let t = now();
    assert_eq!(decode_dt(&encode_dt(t)).unwrap(), t);
  }

  #[test]
  fn photos_fill_slots_in_order() {
    let slots = encode_photos(&["a.jpg".into(), "b.jpg".into()]);
    assert_eq!(slots, [Some("a.jpg".into()), Some("b.jpg".into()), None]);
  }
}
