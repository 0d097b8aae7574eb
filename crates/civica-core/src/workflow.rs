//! [`ReportWorkflowService`], the operation surface of the engine.
//!
//! Each mutating operation reads the report, evaluates a pure transition
//! ([`crate::machine`], [`crate::assignment`]) and persists the result with a
//! single compare-and-swap. A writer that loses the swap re-reads and
//! re-evaluates; if its precondition no longer holds it fails with
//! [`Error::Conflict`] instead of overwriting the winner.
//!
//! Notifications are dispatched after the primary write commits. Their
//! failures come back as [`DispatchWarning`]s inside the [`Outcome`].

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::{
  Error, Result,
  assignment,
  config::WorkflowConfig,
  dispatch::{self, DispatchWarning, NotificationDispatcher},
  identity::{ActorKind, Citizen, Role, Staff},
  machine::{self, TransitionRequest},
  message::Message,
  messaging::{self, Poster},
  notification::{Addressee, Notification},
  report::{Category, NewReport, Report, ReportDraft, ReportQuery, ReportStatus},
  store::WorkflowStore,
};

/// A committed result plus any notifications that could not be recorded.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T> {
  pub value:    T,
  pub warnings: Vec<DispatchWarning>,
}

impl<T> Outcome<T> {
  fn clean(value: T) -> Self { Self { value, warnings: Vec::new() } }
}

/// The result of [`ReportWorkflowService::post_message`].
#[derive(Debug, Clone, Serialize)]
pub struct PostedMessage {
  pub report:  Report,
  pub message: Message,
}

pub struct ReportWorkflowService<S> {
  store:  Arc<S>,
  config: WorkflowConfig,
}

impl<S: WorkflowStore> ReportWorkflowService<S> {
  pub fn new(store: Arc<S>, config: WorkflowConfig) -> Self {
    Self { store, config }
  }

  pub fn store(&self) -> &S { &self.store }

  fn dispatcher(&self) -> NotificationDispatcher<'_, S> {
    NotificationDispatcher::new(&self.store, self.config.dispatch_retries)
  }

  // ── Lookups ───────────────────────────────────────────────────────────────

  async fn load(&self, report_id: i64) -> Result<Report> {
    self
      .store
      .get_report(report_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found("report", report_id))
  }

  async fn staff(&self, username: &str) -> Result<Staff> {
    self
      .store
      .find_staff(username)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found("staff", username))
  }

  async fn citizen(&self, username: &str) -> Result<Citizen> {
    self
      .store
      .find_citizen(username)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found("citizen", username))
  }

  // ── Commit loop ───────────────────────────────────────────────────────────

  /// Evaluate `evaluate` against `snapshot` and swap the result in.
  ///
  /// On a lost swap the current report is re-read and re-evaluated, up to
  /// `cas_attempts` times. An evaluation failure after a lost swap is
  /// reported as [`Error::Conflict`].
  ///
  /// A racing writer whose first read already sees the winner's commit
  /// never loses a swap; it fails with its natural error instead, for
  /// example [`Error::InvalidTransition`]. Callers must not rely on
  /// `Conflict` alone to detect a lost race.
  pub(crate) async fn commit_from<F>(
    &self,
    mut snapshot: Report,
    mut evaluate: F,
  ) -> Result<Report>
  where
    F: FnMut(&Report) -> Result<Report> + Send,
  {
    let report_id = snapshot.report_id;
    let attempts = self.config.cas_attempts.max(1);
    let mut next = evaluate(&snapshot)?;
    let mut attempt = 1;

    loop {
      if let Some(stored) = self
        .store
        .swap_report(snapshot.version, next)
        .await
        .map_err(Error::store)?
      {
        return Ok(stored);
      }
      if attempt == attempts {
        return Err(Error::Conflict(format!(
          "report {report_id} kept changing; gave up after {attempts} attempts"
        )));
      }
      attempt += 1;

      tracing::debug!(report_id, attempt, "lost report update race; retrying");
      snapshot = self.load(report_id).await?;
      next = evaluate(&snapshot).map_err(|e| {
        tracing::warn!(report_id, error = %e, "precondition failed after concurrent update");
        Error::Conflict(format!(
          "report {report_id} was changed concurrently: {e}"
        ))
      })?;
    }
  }

  async fn commit<F>(&self, report_id: i64, evaluate: F) -> Result<Report>
  where
    F: FnMut(&Report) -> Result<Report> + Send,
  {
    let snapshot = self.load(report_id).await?;
    self.commit_from(snapshot, evaluate).await
  }

  // ── Creation ──────────────────────────────────────────────────────────────

  /// Submit a new report on behalf of `citizen`.
  pub async fn create_report(
    &self,
    citizen: &str,
    draft: ReportDraft,
  ) -> Result<Outcome<Report>> {
    let citizen = self.citizen(citizen).await?;

    if draft.title.trim().is_empty() {
      return Err(Error::Validation("title is required".into()));
    }
    if draft.description.trim().is_empty() {
      return Err(Error::Validation("description is required".into()));
    }
    if !(-90.0..=90.0).contains(&draft.latitude) {
      return Err(Error::Validation(format!(
        "latitude {} out of range",
        draft.latitude
      )));
    }
    if !(-180.0..=180.0).contains(&draft.longitude) {
      return Err(Error::Validation(format!(
        "longitude {} out of range",
        draft.longitude
      )));
    }

    let photos: Vec<String> = draft
      .photos
      .into_iter()
      .filter(|p| !p.trim().is_empty())
      .take(self.config.max_photos.max(1))
      .collect();
    if photos.is_empty() {
      return Err(Error::Validation("at least one photo is required".into()));
    }

    let report = self
      .store
      .insert_report(NewReport {
        citizen_id: citizen.citizen_id,
        title: draft.title,
        description: draft.description,
        category: draft.category,
        latitude: draft.latitude,
        longitude: draft.longitude,
        anonymous: draft.anonymous,
        photos,
      })
      .await
      .map_err(Error::store)?;

    tracing::info!(
      report_id = report.report_id,
      citizen = %citizen.username,
      category = %report.category,
      "report submitted"
    );
    Ok(Outcome::clean(report))
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn report(&self, report_id: i64) -> Result<Report> {
    self.load(report_id).await
  }

  pub async fn reports(&self, query: &ReportQuery) -> Result<Vec<Report>> {
    self.store.query_reports(query).await.map_err(Error::store)
  }

  // ── Transitions ───────────────────────────────────────────────────────────

  /// Accept or reject a pending report. `actor` must be a reviewer.
  pub async fn reviewer_update(
    &self,
    report_id: i64,
    actor: &str,
    target: ReportStatus,
    comment: Option<&str>,
    category: Option<Category>,
  ) -> Result<Outcome<Report>> {
    let actor = self.staff(actor).await?;
    if actor.role != Role::Mpro {
      return Err(Error::Forbidden(format!(
        "{} is not a reviewer",
        actor.username
      )));
    }
    let request = TransitionRequest { target, comment, category };
    self.transition(report_id, &actor, &request).await
  }

  /// Move an assigned report along. `actor` must be its TOSM or EM.
  pub async fn worker_update(
    &self,
    report_id: i64,
    actor: &str,
    target: ReportStatus,
    comment: Option<&str>,
  ) -> Result<Outcome<Report>> {
    let actor = self.staff(actor).await?;
    if !matches!(actor.role, Role::Tosm | Role::Em) {
      return Err(Error::Forbidden(format!(
        "{} does not work on reports",
        actor.username
      )));
    }
    let request = TransitionRequest { target, comment, category: None };
    self.transition(report_id, &actor, &request).await
  }

  async fn transition(
    &self,
    report_id: i64,
    actor: &Staff,
    request: &TransitionRequest<'_>,
  ) -> Result<Outcome<Report>> {
    let mut from = None;
    let report = self
      .commit(report_id, |current| {
        from = Some(current.status);
        machine::apply_transition(current, actor, request, Utc::now())
      })
      .await?;

    tracing::info!(
      report_id,
      actor = %actor.username,
      from = ?from,
      to = %report.status,
      "report transitioned"
    );
    Ok(Outcome::clean(report))
  }

  // ── Assignment ────────────────────────────────────────────────────────────

  /// Claim an accepted report for the acting TOSM.
  pub async fn self_assign(
    &self,
    report_id: i64,
    actor: &str,
  ) -> Result<Outcome<Report>> {
    let actor = self.staff(actor).await?;
    let report = self
      .commit(report_id, |current| {
        assignment::self_assign(current, &actor, Utc::now())
      })
      .await?;

    tracing::info!(report_id, staff = %actor.username, "report claimed");
    Ok(Outcome::clean(report))
  }

  /// Engage `maintainer` on a report claimed by `actor`. The maintainer is
  /// notified.
  pub async fn assign_external(
    &self,
    report_id: i64,
    maintainer: &str,
    actor: &str,
  ) -> Result<Outcome<Report>> {
    let actor = self.staff(actor).await?;
    let maintainer = self.staff(maintainer).await?;
    let report = self
      .commit(report_id, |current| {
        assignment::assign_external_maintainer(
          current,
          &maintainer,
          &actor,
          Utc::now(),
        )
      })
      .await?;

    tracing::info!(
      report_id,
      staff = %actor.username,
      maintainer = %maintainer.username,
      "external maintainer engaged"
    );

    let mut warnings = Vec::new();
    let sent = self
      .dispatcher()
      .notify_staff(
        report_id,
        &maintainer.username,
        &format!("Report #{report_id} assigned to you"),
        &format!("{} asked you to take over: {}", actor.username, report.title),
      )
      .await;
    dispatch::settle(
      sent,
      report_id,
      Some(Addressee::Staff(maintainer.username.clone())),
      &mut warnings,
    );
    Ok(Outcome { value: report, warnings })
  }

  // ── Messaging ─────────────────────────────────────────────────────────────

  /// Append to a report's thread.
  ///
  /// Staff posts notify the report's citizen, whatever the visibility of
  /// the message; citizen posts notify the assigned TOSM, if any.
  pub async fn post_message(
    &self,
    report_id: i64,
    actor: &str,
    kind: ActorKind,
    body: &str,
    is_private: Option<bool>,
  ) -> Result<Outcome<PostedMessage>> {
    let report = self.load(report_id).await?;
    let input = match kind {
      ActorKind::Citizen => {
        let citizen = self.citizen(actor).await?;
        messaging::authorize_append(&report, Poster::Citizen(&citizen), body, is_private)?
      }
      ActorKind::Staff => {
        let staff = self.staff(actor).await?;
        messaging::authorize_append(&report, Poster::Staff(&staff), body, is_private)?
      }
    };

    let message = self.store.append_message(input).await.map_err(Error::store)?;
    tracing::info!(
      report_id,
      message_id = message.message_id,
      private = message.is_private,
      "message posted"
    );

    let mut warnings = Vec::new();
    let title = format!("New message on report #{report_id}");
    match message.author.staff() {
      Some(_) => {
        let body = if message.is_private {
          "Staff posted an internal update on your report."
        } else {
          message.body.as_str()
        };
        let sent = self.dispatcher().notify_citizen(&report, &title, body).await;
        let addressee = report.citizen_id.map(Addressee::Citizen);
        dispatch::settle(sent, report_id, addressee, &mut warnings);
      }
      None => {
        if let Some(staff) = report.assigned_staff.as_deref() {
          let sent = self
            .dispatcher()
            .notify_staff(report_id, staff, &title, &message.body)
            .await;
          let addressee = Some(Addressee::Staff(staff.to_owned()));
          dispatch::settle(sent, report_id, addressee, &mut warnings);
        }
      }
    }

    Ok(Outcome { value: PostedMessage { report, message }, warnings })
  }

  /// The thread as `viewer` may see it.
  pub async fn list_messages(
    &self,
    report_id: i64,
    viewer: ActorKind,
  ) -> Result<Vec<Message>> {
    self.load(report_id).await?;
    let thread = self
      .store
      .list_messages(report_id)
      .await
      .map_err(Error::store)?;
    Ok(messaging::project(thread, viewer))
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  pub async fn mark_notification_read(&self, notification_id: i64) -> Result<()> {
    self.dispatcher().mark_read(notification_id).await?;
    Ok(())
  }

  pub async fn notification(&self, notification_id: i64) -> Result<Notification> {
    self
      .store
      .get_notification(notification_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found("notification", notification_id))
  }

  pub async fn notifications(&self, addressee: &Addressee) -> Result<Vec<Notification>> {
    self
      .store
      .list_notifications(addressee)
      .await
      .map_err(Error::store)
  }
}
