//! Role-based authorization for status transitions.
//!
//! The policy is data: [`GRANTS`] lists, per role, the statuses it may act
//! from and the statuses it may move a report to. Anything not listed is
//! forbidden. Assignment relationships (is this TOSM the assignee?) are
//! checked separately by [`crate::machine`].

use crate::{
  Error, Result,
  identity::Role,
  report::ReportStatus::{self, *},
};

/// One row of the authorization table.
#[derive(Debug)]
pub struct Grant {
  pub role: Role,
  pub from: &'static [ReportStatus],
  pub to:   &'static [ReportStatus],
}

const WORK_STATES: &[ReportStatus] = &[Assigned, InProgress, Suspended];
const WORK_TARGETS: &[ReportStatus] = &[InProgress, Suspended, Resolved];

pub const GRANTS: &[Grant] = &[
  Grant { role: Role::Mpro, from: &[Pending], to: &[Assigned, Rejected] },
  Grant { role: Role::Tosm, from: WORK_STATES, to: WORK_TARGETS },
  Grant { role: Role::Em, from: WORK_STATES, to: WORK_TARGETS },
];

/// Target statuses `role` may request while a report is in `current`.
pub fn allowed_targets(role: Role, current: ReportStatus) -> &'static [ReportStatus] {
  GRANTS
    .iter()
    .find(|g| g.role == role && g.from.contains(&current))
    .map_or(&[], |g| g.to)
}

/// Whether a transition carries a justification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentRule {
  Required,
  Optional,
  Forbidden,
}

pub fn comment_rule(target: ReportStatus) -> CommentRule {
  match target {
    ReportStatus::Rejected => CommentRule::Required,
    ReportStatus::Resolved => CommentRule::Optional,
    _ => CommentRule::Forbidden,
  }
}

/// Side constraints attached to a permitted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraints {
  pub target:          ReportStatus,
  pub comment:         CommentRule,
  /// Only a reviewer accepting a report may re-route it to another office.
  pub category_change: bool,
}

impl Constraints {
  /// Apply the comment rule to a supplied comment. A blank comment counts as
  /// no comment; anything else is kept verbatim.
  pub fn check_comment(&self, comment: Option<&str>) -> Result<Option<String>> {
    let comment = comment.filter(|c| !c.trim().is_empty());
    match (self.comment, comment) {
      (CommentRule::Required, None) => Err(Error::MissingComment(self.target)),
      (CommentRule::Forbidden, Some(_)) => Err(Error::InvalidComment(self.target)),
      (_, c) => Ok(c.map(str::to_owned)),
    }
  }
}

/// Decide whether `role` may move a report from `current` to `target`.
///
/// Edges missing from the status graph fail with
/// [`Error::InvalidTransition`]; edges that exist but are not granted to
/// `role` fail with [`Error::Forbidden`].
pub fn authorize(
  role: Role,
  current: ReportStatus,
  target: ReportStatus,
) -> Result<Constraints> {
  if !current.can_move_to(target) {
    return Err(Error::InvalidTransition { from: current, to: target });
  }
  if !allowed_targets(role, current).contains(&target) {
    return Err(Error::Forbidden(format!(
      "role {role} may not move a report from {current} to {target}"
    )));
  }
  Ok(Constraints {
    target,
    comment: comment_rule(target),
    category_change: role == Role::Mpro && target == ReportStatus::Assigned,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ErrorKind;

  #[test]
  fn pending_is_reviewer_only() {
    for role in Role::ALL {
      for target in ReportStatus::ALL {
        let result = authorize(role, Pending, target);
        match (role, target) {
          (Role::Mpro, Assigned | Rejected) => assert!(result.is_ok()),
          (_, Assigned | Rejected) => {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::Forbidden)
          }
          _ => assert_eq!(
            result.unwrap_err().kind(),
            ErrorKind::InvalidTransition
          ),
        }
      }
    }
  }

  #[test]
  fn workers_share_the_same_grants() {
    for current in WORK_STATES {
      assert_eq!(
        allowed_targets(Role::Tosm, *current),
        allowed_targets(Role::Em, *current)
      );
    }
    assert!(allowed_targets(Role::Tosm, Pending).is_empty());
    assert!(allowed_targets(Role::Admin, Assigned).is_empty());
  }

  #[test]
  fn reviewer_cannot_act_after_acceptance() {
    let err = authorize(Role::Mpro, InProgress, Resolved).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
  }

  #[test]
  fn only_acceptance_may_recategorise() {
    assert!(authorize(Role::Mpro, Pending, Assigned).unwrap().category_change);
    assert!(!authorize(Role::Mpro, Pending, Rejected).unwrap().category_change);
    assert!(!authorize(Role::Tosm, InProgress, Resolved).unwrap().category_change);
  }

  #[test]
  fn comment_policy() {
    let reject = authorize(Role::Mpro, Pending, Rejected).unwrap();
    assert_eq!(reject.comment, CommentRule::Required);
    assert_eq!(
      reject.check_comment(None).unwrap_err().kind(),
      ErrorKind::MissingComment
    );
    assert_eq!(
      reject.check_comment(Some("   ")).unwrap_err().kind(),
      ErrorKind::MissingComment
    );
    assert_eq!(
      reject.check_comment(Some(" duplicate ")).unwrap().as_deref(),
      Some(" duplicate ")
    );

    let resolve = authorize(Role::Tosm, InProgress, Resolved).unwrap();
    assert_eq!(resolve.check_comment(None).unwrap(), None);

    let suspend = authorize(Role::Em, InProgress, Suspended).unwrap();
    assert_eq!(
      suspend.check_comment(Some("waiting on parts")).unwrap_err().kind(),
      ErrorKind::InvalidComment
    );
  }
}
