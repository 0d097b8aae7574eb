//! The report state machine.
//!
//! [`apply_transition`] is pure: it takes the current report and a request
//! and returns the next report value. Persisting it (and detecting lost
//! races) is the workflow service's job.

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  identity::{Role, Staff},
  policy,
  report::{Category, Report, ReportStatus},
};

/// A requested status change.
#[derive(Debug, Clone, Copy)]
pub struct TransitionRequest<'a> {
  pub target:   ReportStatus,
  pub comment:  Option<&'a str>,
  /// Re-route the report to another office while accepting it.
  pub category: Option<Category>,
}

impl<'a> TransitionRequest<'a> {
  pub fn to(target: ReportStatus) -> Self {
    Self { target, comment: None, category: None }
  }

  pub fn with_comment(mut self, comment: &'a str) -> Self {
    self.comment = Some(comment);
    self
  }

  pub fn with_category(mut self, category: Category) -> Self {
    self.category = Some(category);
    self
  }
}

/// Ensure `actor` holds the assignment its role needs to work on `report`.
fn check_assignment(report: &Report, actor: &Staff) -> Result<()> {
  let assignee = match actor.role {
    Role::Tosm => report.assigned_staff.as_deref(),
    Role::Em if report.assigned_staff.is_some() => {
      report.assigned_maintainer.as_deref()
    }
    Role::Em => None,
    Role::Mpro | Role::Admin => return Ok(()),
  };
  if assignee == Some(actor.username.as_str()) {
    Ok(())
  } else {
    Err(Error::Forbidden(format!(
      "{} is not assigned to report {}",
      actor.username, report.report_id
    )))
  }
}

/// Validate `request` against `report` and return the transitioned report.
///
/// Checks run in a fixed order: status graph, role grants, assignment,
/// comment policy, then category. The first failure wins and nothing is
/// applied.
pub fn apply_transition(
  report: &Report,
  actor: &Staff,
  request: &TransitionRequest<'_>,
  now: DateTime<Utc>,
) -> Result<Report> {
  let constraints = policy::authorize(actor.role, report.status, request.target)?;
  check_assignment(report, actor)?;
  let comment = constraints.check_comment(request.comment)?;

  if request.category.is_some() && !constraints.category_change {
    return Err(Error::Forbidden(format!(
      "category may not change when moving to {}",
      request.target
    )));
  }

  let mut next = report.clone();
  next.status = request.target;
  next.updated_at = now;
  if let Some(category) = request.category {
    next.category = category;
  }
  if comment.is_some() {
    next.comment = comment;
  }
  Ok(next)
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::ErrorKind;

  pub(crate) fn report(status: ReportStatus) -> Report {
    let now = Utc::now();
    Report {
      report_id: 7,
      citizen_id: Some(1),
      title: "Burst pipe".into(),
      description: "Water on the pavement".into(),
      category: Category::WaterSupply,
      latitude: 45.07,
      longitude: 7.68,
      anonymous: false,
      photos: vec!["photo-1.jpg".into()],
      status,
      assigned_staff: None,
      assigned_maintainer: None,
      comment: None,
      created_at: now,
      updated_at: now,
      version: 0,
    }
  }

  fn staff(username: &str, role: Role) -> Staff {
    Staff::new(username, role, [Category::WaterSupply])
  }

  #[test]
  fn reviewer_accepts_and_recategorises() {
    let r = report(ReportStatus::Pending);
    let req = TransitionRequest::to(ReportStatus::Assigned)
      .with_category(Category::SewerSystem);
    let next = apply_transition(&r, &staff("m1", Role::Mpro), &req, Utc::now())
      .unwrap();
    assert_eq!(next.status, ReportStatus::Assigned);
    assert_eq!(next.category, Category::SewerSystem);
    assert_eq!(next.comment, None);
    // The input is untouched.
    assert_eq!(r.status, ReportStatus::Pending);
  }

  #[test]
  fn rejection_keeps_category_and_comment_verbatim() {
    let r = report(ReportStatus::Pending);
    let req = TransitionRequest::to(ReportStatus::Rejected)
      .with_comment("Duplicate of #3");
    let next = apply_transition(&r, &staff("m1", Role::Mpro), &req, Utc::now())
      .unwrap();
    assert_eq!(next.status, ReportStatus::Rejected);
    assert_eq!(next.comment.as_deref(), Some("Duplicate of #3"));
    assert_eq!(next.category, Category::WaterSupply);
  }

  #[test]
  fn rejection_with_category_is_forbidden() {
    let r = report(ReportStatus::Pending);
    let req = TransitionRequest::to(ReportStatus::Rejected)
      .with_comment("wrong office")
      .with_category(Category::Waste);
    let err = apply_transition(&r, &staff("m1", Role::Mpro), &req, Utc::now())
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
  }

  #[test]
  fn rejection_without_comment_fails() {
    let r = report(ReportStatus::Pending);
    let err = apply_transition(
      &r,
      &staff("m1", Role::Mpro),
      &TransitionRequest::to(ReportStatus::Rejected),
      Utc::now(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingComment);
  }

  #[test]
  fn worker_must_be_the_assignee() {
    let mut r = report(ReportStatus::Assigned);
    r.assigned_staff = Some("t1".into());
    let req = TransitionRequest::to(ReportStatus::InProgress);

    let err = apply_transition(&r, &staff("t2", Role::Tosm), &req, Utc::now())
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let next = apply_transition(&r, &staff("t1", Role::Tosm), &req, Utc::now())
      .unwrap();
    assert_eq!(next.status, ReportStatus::InProgress);
  }

  #[test]
  fn maintainer_needs_both_assignments() {
    let mut r = report(ReportStatus::InProgress);
    r.assigned_maintainer = Some("e1".into());
    let req = TransitionRequest::to(ReportStatus::Suspended);
    let em = staff("e1", Role::Em);

    let err = apply_transition(&r, &em, &req, Utc::now()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    r.assigned_staff = Some("t1".into());
    let next = apply_transition(&r, &em, &req, Utc::now()).unwrap();
    assert_eq!(next.status, ReportStatus::Suspended);
  }

  #[test]
  fn suspended_cannot_resolve_directly() {
    let mut r = report(ReportStatus::Suspended);
    r.assigned_staff = Some("t1".into());
    let err = apply_transition(
      &r,
      &staff("t1", Role::Tosm),
      &TransitionRequest::to(ReportStatus::Resolved),
      Utc::now(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
  }

  #[test]
  fn comment_on_progress_is_invalid() {
    let mut r = report(ReportStatus::Assigned);
    r.assigned_staff = Some("t1".into());
    let req =
      TransitionRequest::to(ReportStatus::InProgress).with_comment("starting");
    let err = apply_transition(&r, &staff("t1", Role::Tosm), &req, Utc::now())
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidComment);
  }

  #[test]
  fn terminal_reports_do_not_move() {
    let mut r = report(ReportStatus::Resolved);
    r.assigned_staff = Some("t1".into());
    for target in ReportStatus::ALL {
      let err = apply_transition(
        &r,
        &staff("t1", Role::Tosm),
        &TransitionRequest::to(target),
        Utc::now(),
      )
      .unwrap_err();
      assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }
  }
}
