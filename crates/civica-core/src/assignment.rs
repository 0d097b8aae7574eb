//! Two-tier assignment: an internal technician (TOSM) claims an accepted
//! report, and may then engage an external maintainer (EM).
//!
//! Assignment never touches `status`; it only feeds the assignment checks in
//! [`crate::machine`].

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  identity::{Role, Staff},
  report::{Report, ReportStatus},
};

/// Claim `report` for `actor`.
pub fn self_assign(
  report: &Report,
  actor: &Staff,
  now: DateTime<Utc>,
) -> Result<Report> {
  if actor.role != Role::Tosm {
    return Err(Error::Forbidden(format!(
      "role {} may not claim reports",
      actor.role
    )));
  }
  if report.status != ReportStatus::Assigned {
    return Err(Error::InvalidState(format!(
      "report {} is {}, not assigned",
      report.report_id, report.status
    )));
  }
  if let Some(current) = &report.assigned_staff {
    return Err(Error::Conflict(format!(
      "report {} is already claimed by {current}",
      report.report_id
    )));
  }
  if !actor.serves(report.category) {
    return Err(Error::Forbidden(format!(
      "{} does not work for the {} office",
      actor.username, report.category
    )));
  }

  let mut next = report.clone();
  next.assigned_staff = Some(actor.username.clone());
  next.updated_at = now;
  Ok(next)
}

/// Engage `maintainer` on a report claimed by `actor`.
pub fn assign_external_maintainer(
  report: &Report,
  maintainer: &Staff,
  actor: &Staff,
  now: DateTime<Utc>,
) -> Result<Report> {
  let Some(assignee) = report.assigned_staff.as_deref() else {
    return Err(Error::InvalidState(format!(
      "report {} has no assigned staff member",
      report.report_id
    )));
  };
  if assignee != actor.username {
    return Err(Error::Forbidden(format!(
      "only {assignee} may engage a maintainer on report {}",
      report.report_id
    )));
  }
  if report.status.is_terminal() {
    return Err(Error::InvalidState(format!(
      "report {} is already {}",
      report.report_id, report.status
    )));
  }
  if maintainer.role != Role::Em {
    return Err(Error::Forbidden(format!(
      "{} is not an external maintainer",
      maintainer.username
    )));
  }
  if !maintainer.serves(report.category) {
    return Err(Error::Forbidden(format!(
      "{} does not maintain {} issues",
      maintainer.username, report.category
    )));
  }
  if let Some(current) = &report.assigned_maintainer {
    return Err(Error::Conflict(format!(
      "report {} is already handled by {current}",
      report.report_id
    )));
  }

  let mut next = report.clone();
  next.assigned_maintainer = Some(maintainer.username.clone());
  next.updated_at = now;
  Ok(next)
}
