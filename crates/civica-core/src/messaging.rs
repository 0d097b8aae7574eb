//! Who may write to a report's thread, and what each reader gets back.
//!
//! Citizens only ever see public messages. Staff, whatever their role, see
//! the whole thread.

use crate::{
  Error, Result,
  identity::{ActorKind, Citizen, Staff},
  message::{Author, Message, NewMessage},
  report::Report,
};

/// The resolved identity posting a message.
#[derive(Debug, Clone, Copy)]
pub enum Poster<'a> {
  Citizen(&'a Citizen),
  Staff(&'a Staff),
}

/// Validate a post and resolve its visibility.
///
/// - The report's citizen always posts publicly.
/// - The assigned TOSM must choose visibility explicitly.
/// - The assigned EM always posts privately.
/// - Anyone else is forbidden.
pub fn authorize_append(
  report: &Report,
  poster: Poster<'_>,
  body: &str,
  is_private: Option<bool>,
) -> Result<NewMessage> {
  if body.trim().is_empty() {
    return Err(Error::Validation("message body must not be empty".into()));
  }

  let (author, is_private) = match poster {
    Poster::Citizen(citizen) => {
      if report.citizen_id != Some(citizen.citizen_id) {
        return Err(Error::Forbidden(format!(
          "{} did not submit report {}",
          citizen.username, report.report_id
        )));
      }
      (Author::Citizen, false)
    }
    Poster::Staff(staff) => {
      let name = Some(staff.username.as_str());
      if name == report.assigned_staff.as_deref() {
        let is_private = is_private.ok_or_else(|| {
          Error::Validation("staff messages must state their visibility".into())
        })?;
        (Author::Staff(staff.username.clone()), is_private)
      } else if name == report.assigned_maintainer.as_deref() {
        (Author::Staff(staff.username.clone()), true)
      } else {
        return Err(Error::Forbidden(format!(
          "{} is not assigned to report {}",
          staff.username, report.report_id
        )));
      }
    }
  };

  Ok(NewMessage {
    report_id: report.report_id,
    author,
    body: body.to_owned(),
    is_private,
  })
}

pub fn visible_to(message: &Message, viewer: ActorKind) -> bool {
  match viewer {
    ActorKind::Citizen => !message.is_private,
    ActorKind::Staff => true,
  }
}

/// Order a thread by creation time (ties by insertion sequence) and drop
/// whatever `viewer` may not read.
pub fn project(mut thread: Vec<Message>, viewer: ActorKind) -> Vec<Message> {
  thread.retain(|m| visible_to(m, viewer));
  thread.sort_by(|a, b| {
    a.created_at
      .cmp(&b.created_at)
      .then(a.message_id.cmp(&b.message_id))
  });
  thread
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, Utc};

  use super::*;
  use crate::{
    ErrorKind,
    identity::Role,
    machine::tests::report,
    report::{Category, ReportStatus},
  };

  fn citizen(id: i64) -> Citizen {
    Citizen {
      citizen_id: id,
      username:   format!("c{id}"),
      email:      format!("c{id}@example.org"),
      first_name: "Ada".into(),
      last_name:  "Rossi".into(),
      created_at: Utc::now(),
    }
  }

  fn assigned() -> Report {
    let mut r = report(ReportStatus::InProgress);
    r.assigned_staff = Some("t1".into());
    r.assigned_maintainer = Some("e1".into());
    r
  }

  #[test]
  fn citizen_posts_are_public() {
    let msg = authorize_append(
      &assigned(),
      Poster::Citizen(&citizen(1)),
      "Any news?",
      Some(true),
    )
    .unwrap();
    assert_eq!(msg.author, Author::Citizen);
    assert!(!msg.is_private);
  }

  #[test]
  fn other_citizens_are_forbidden() {
    let err = authorize_append(
      &assigned(),
      Poster::Citizen(&citizen(2)),
      "Me too",
      None,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
  }

  #[test]
  fn tosm_must_choose_visibility() {
    let t1 = Staff::new("t1", Role::Tosm, [Category::WaterSupply]);
    let err =
      authorize_append(&assigned(), Poster::Staff(&t1), "On it", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let public =
      authorize_append(&assigned(), Poster::Staff(&t1), "On it", Some(false))
        .unwrap();
    assert!(!public.is_private);
  }

  #[test]
  fn maintainer_posts_are_always_private() {
    let e1 = Staff::new("e1", Role::Em, [Category::WaterSupply]);
    for requested in [None, Some(false), Some(true)] {
      let msg =
        authorize_append(&assigned(), Poster::Staff(&e1), "Valve ordered", requested)
          .unwrap();
      assert!(msg.is_private);
    }
  }

  #[test]
  fn unassigned_staff_cannot_post() {
    for role in Role::ALL {
      let other = Staff::new("x1", role, [Category::WaterSupply]);
      let err = authorize_append(&assigned(), Poster::Staff(&other), "hello", Some(false))
        .unwrap_err();
      assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
  }

  #[test]
  fn blank_body_is_rejected() {
    let err = authorize_append(&assigned(), Poster::Citizen(&citizen(1)), " \n", None)
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
  }

  #[test]
  fn projection_filters_and_orders() {
    let t0 = Utc::now();
    let msg = |id, is_private, offset| Message {
      message_id: id,
      report_id: 7,
      author: Author::Citizen,
      body: format!("m{id}"),
      is_private,
      created_at: t0 + Duration::seconds(offset),
    };
    // Same timestamp for 2 and 3: insertion order breaks the tie.
    let thread = vec![msg(3, false, 5), msg(1, true, 0), msg(2, false, 5)];

    let citizen_view = project(thread.clone(), ActorKind::Citizen);
    let ids: Vec<_> = citizen_view.iter().map(|m| m.message_id).collect();
    assert_eq!(ids, vec![2, 3]);

    let staff_view = project(thread, ActorKind::Staff);
    let ids: Vec<_> = staff_view.iter().map(|m| m.message_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
  }
}
