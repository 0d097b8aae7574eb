//! Reports, the unit of work routed through the review workflow.
//!
//! A report's identifying fields (title, location, photos, author) never
//! change after creation. Only the workflow fields (status, category,
//! assignees, comment) move, and every such move bumps `version`.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where a report is in its lifecycle.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
  /// Submitted by a citizen, awaiting review.
  Pending,
  /// Accepted by a reviewer and routed to an office.
  Assigned,
  InProgress,
  Suspended,
  /// Terminal: refused by a reviewer, with a mandatory explanation.
  Rejected,
  /// Terminal: the issue has been fixed.
  Resolved,
}

impl ReportStatus {
  pub const ALL: [Self; 6] = [
    Self::Pending,
    Self::Assigned,
    Self::InProgress,
    Self::Suspended,
    Self::Rejected,
    Self::Resolved,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Assigned => "assigned",
      Self::InProgress => "in_progress",
      Self::Suspended => "suspended",
      Self::Rejected => "rejected",
      Self::Resolved => "resolved",
    }
  }

  /// The statuses reachable from `self` in one step, regardless of who asks.
  pub fn successors(self) -> &'static [Self] {
    match self {
      Self::Pending => &[Self::Assigned, Self::Rejected],
      Self::Assigned => &[Self::InProgress],
      Self::InProgress => &[Self::Suspended, Self::Resolved],
      Self::Suspended => &[Self::InProgress],
      Self::Rejected | Self::Resolved => &[],
    }
  }

  pub fn can_move_to(self, target: Self) -> bool {
    self.successors().contains(&target)
  }

  pub fn is_terminal(self) -> bool { self.successors().is_empty() }
}

impl fmt::Display for ReportStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ReportStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| format!("unknown report status: {s:?}"))
  }
}

// ─── Category ────────────────────────────────────────────────────────────────

/// The municipal office responsible for a kind of issue.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
  WaterSupply,
  ArchitecturalBarriers,
  SewerSystem,
  PublicLighting,
  Waste,
  RoadSigns,
  RoadsAndFurnishings,
  PublicGreenAreas,
  Other,
}

impl Category {
  pub const ALL: [Self; 9] = [
    Self::WaterSupply,
    Self::ArchitecturalBarriers,
    Self::SewerSystem,
    Self::PublicLighting,
    Self::Waste,
    Self::RoadSigns,
    Self::RoadsAndFurnishings,
    Self::PublicGreenAreas,
    Self::Other,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::WaterSupply => "water_supply",
      Self::ArchitecturalBarriers => "architectural_barriers",
      Self::SewerSystem => "sewer_system",
      Self::PublicLighting => "public_lighting",
      Self::Waste => "waste",
      Self::RoadSigns => "road_signs",
      Self::RoadsAndFurnishings => "roads_and_furnishings",
      Self::PublicGreenAreas => "public_green_areas",
      Self::Other => "other",
    }
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Category {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|category| category.as_str() == s)
      .ok_or_else(|| format!("unknown category: {s:?}"))
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
  pub report_id:           i64,
  /// `None` once the submitting citizen has been removed.
  pub citizen_id:          Option<i64>,
  pub title:               String,
  pub description:         String,
  pub category:            Category,
  pub latitude:            f64,
  pub longitude:           f64,
  /// Hide the citizen's name from public listings.
  pub anonymous:           bool,
  /// Photo references; the first slot is always populated.
  pub photos:              Vec<String>,
  pub status:              ReportStatus,
  /// Username of the internal technician (TOSM) doing the work.
  pub assigned_staff:      Option<String>,
  /// Username of the external maintainer (EM) engaged by `assigned_staff`.
  pub assigned_maintainer: Option<String>,
  pub comment:             Option<String>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
  /// Optimistic-concurrency token; bumped by the store on every write.
  pub version:             i64,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// What a citizen submits. Validated by
/// [`ReportWorkflowService::create_report`](crate::workflow::ReportWorkflowService::create_report).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDraft {
  pub title:       String,
  pub description: String,
  pub category:    Category,
  pub latitude:    f64,
  pub longitude:   f64,
  #[serde(default)]
  pub anonymous:   bool,
  #[serde(default)]
  pub photos:      Vec<String>,
}

/// Input to [`crate::store::WorkflowStore::insert_report`]. The store assigns
/// the id, timestamps, and the initial `Pending` status.
#[derive(Debug, Clone)]
pub struct NewReport {
  pub citizen_id:  i64,
  pub title:       String,
  pub description: String,
  pub category:    Category,
  pub latitude:    f64,
  pub longitude:   f64,
  pub anonymous:   bool,
  pub photos:      Vec<String>,
}

/// Filters for [`crate::store::WorkflowStore::query_reports`]. All set filters
/// must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
  pub status:              Option<ReportStatus>,
  pub category:            Option<Category>,
  pub citizen_id:          Option<i64>,
  pub assigned_staff:      Option<String>,
  pub assigned_maintainer: Option<String>,
  pub limit:               Option<usize>,
  pub offset:              Option<usize>,
}

impl ReportQuery {
  pub fn matches(&self, report: &Report) -> bool {
    self.status.is_none_or(|s| report.status == s)
      && self.category.is_none_or(|c| report.category == c)
      && self.citizen_id.is_none_or(|id| report.citizen_id == Some(id))
      && self
        .assigned_staff
        .as_deref()
        .is_none_or(|u| report.assigned_staff.as_deref() == Some(u))
      && self
        .assigned_maintainer
        .as_deref()
        .is_none_or(|u| report.assigned_maintainer.as_deref() == Some(u))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn terminal_statuses_have_no_successors() {
    assert!(ReportStatus::Rejected.is_terminal());
    assert!(ReportStatus::Resolved.is_terminal());
    assert!(!ReportStatus::Suspended.is_terminal());
  }

  #[test]
  fn suspended_only_returns_to_in_progress() {
    assert_eq!(ReportStatus::Suspended.successors(), &[
      ReportStatus::InProgress
    ]);
    assert!(!ReportStatus::Suspended.can_move_to(ReportStatus::Resolved));
  }

  #[test]
  fn wire_strings_parse_back() {
    for status in ReportStatus::ALL {
      assert_eq!(status.as_str().parse::<ReportStatus>().unwrap(), status);
      let json = serde_json::to_value(status).unwrap();
      assert_eq!(json, serde_json::json!(status.as_str()));
    }
    for category in Category::ALL {
      assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
    }
    assert!("closed".parse::<ReportStatus>().is_err());
  }
}
