//! Handlers for `/reports` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reports` | Optional `status`, `category`, `citizen_id`, `assigned_staff`, `assigned_maintainer`, `limit`, `offset` |
//! | `POST` | `/reports` | Body: [`CreateBody`]; returns 201 |
//! | `GET`  | `/reports/{id}` | 404 if not found |
//! | `POST` | `/reports/{id}/review` | Body: [`ReviewBody`] |
//! | `POST` | `/reports/{id}/work` | Body: [`WorkBody`] |
//! | `POST` | `/reports/{id}/assign` | Body: `{"actor":"t1"}` |
//! | `POST` | `/reports/{id}/assign-external` | Body: `{"actor":"t1","maintainer":"e1"}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use civica_core::{
  report::{Category, Report, ReportDraft, ReportQuery, ReportStatus},
  store::WorkflowStore,
  workflow::Outcome,
};
use serde::Deserialize;

use crate::{Service, error::ApiError};

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /reports[?status=..][&category=..][&citizen_id=..]...`
pub async fn list<S: WorkflowStore>(
  State(service): State<Service<S>>,
  Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<Report>>, ApiError> {
  Ok(Json(service.reports(&query).await?))
}

/// `GET /reports/{id}`
pub async fn get_one<S: WorkflowStore>(
  State(service): State<Service<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Report>, ApiError> {
  Ok(Json(service.report(id).await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /reports`: the submitting citizen's username
/// next to the report fields.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub citizen: String,
  #[serde(flatten)]
  pub draft:   ReportDraft,
}

/// `POST /reports`: returns 201 and the stored report.
pub async fn create<S: WorkflowStore>(
  State(service): State<Service<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let outcome = service.create_report(&body.citizen, body.draft).await?;
  Ok((StatusCode::CREATED, Json(outcome)))
}

// ─── Transitions ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  pub actor:    String,
  pub status:   ReportStatus,
  pub comment:  Option<String>,
  /// Re-route the report on acceptance.
  pub category: Option<Category>,
}

/// `POST /reports/{id}/review`
pub async fn review<S: WorkflowStore>(
  State(service): State<Service<S>>,
  Path(id): Path<i64>,
  Json(body): Json<ReviewBody>,
) -> Result<Json<Outcome<Report>>, ApiError> {
  let outcome = service
    .reviewer_update(
      id,
      &body.actor,
      body.status,
      body.comment.as_deref(),
      body.category,
    )
    .await?;
  Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct WorkBody {
  pub actor:   String,
  pub status:  ReportStatus,
  pub comment: Option<String>,
}

/// `POST /reports/{id}/work`
pub async fn work<S: WorkflowStore>(
  State(service): State<Service<S>>,
  Path(id): Path<i64>,
  Json(body): Json<WorkBody>,
) -> Result<Json<Outcome<Report>>, ApiError> {
  let outcome = service
    .worker_update(id, &body.actor, body.status, body.comment.as_deref())
    .await?;
  Ok(Json(outcome))
}

// ─── Assignment ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AssignBody {
  pub actor: String,
}

/// `POST /reports/{id}/assign`
pub async fn assign<S: WorkflowStore>(
  State(service): State<Service<S>>,
  Path(id): Path<i64>,
  Json(body): Json<AssignBody>,
) -> Result<Json<Outcome<Report>>, ApiError> {
  Ok(Json(service.self_assign(id, &body.actor).await?))
}

#[derive(Debug, Deserialize)]
pub struct AssignExternalBody {
  pub actor:      String,
  pub maintainer: String,
}

/// `POST /reports/{id}/assign-external`
pub async fn assign_external<S: WorkflowStore>(
  State(service): State<Service<S>>,
  Path(id): Path<i64>,
  Json(body): Json<AssignExternalBody>,
) -> Result<Json<Outcome<Report>>, ApiError> {
  let outcome = service
    .assign_external(id, &body.maintainer, &body.actor)
    .await?;
  Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
  use axum::http::StatusCode;
  use serde_json::json;

  use crate::test_support::{app, create_report, send};

  #[tokio::test]
  async fn create_then_fetch() {
    let app = app().await;
    let id = create_report(&app).await;

    let (status, body) = send(&app, "GET", &format!("/reports/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["category"], "water_supply");
  }

  #[tokio::test]
  async fn create_rejects_missing_photo() {
    let app = app().await;
    let (status, body) = send(
      &app,
      "POST",
      "/reports",
      Some(json!({
        "citizen":     "ada",
        "title":       "No water",
        "description": "Tap dry",
        "category":    "water_supply",
        "latitude":    45.0,
        "longitude":   7.0,
        "photos":      ["  "],
      })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
  }

  #[tokio::test]
  async fn unknown_report_is_404() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/reports/404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
  }

  #[tokio::test]
  async fn rejection_without_comment_is_422() {
    let app = app().await;
    let id = create_report(&app).await;
    let (status, body) = send(
      &app,
      "POST",
      &format!("/reports/{id}/review"),
      Some(json!({ "actor": "m1", "status": "rejected" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "missing_comment");
  }

  #[tokio::test]
  async fn worker_cannot_review() {
    let app = app().await;
    let id = create_report(&app).await;
    let (status, _) = send(
      &app,
      "POST",
      &format!("/reports/{id}/review"),
      Some(json!({ "actor": "t1", "status": "assigned" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn second_self_assign_conflicts() {
    let app = app().await;
    let id = create_report(&app).await;
    let (status, _) = send(
      &app,
      "POST",
      &format!("/reports/{id}/review"),
      Some(json!({ "actor": "m1", "status": "assigned" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/reports/{id}/assign");
    let (status, body) = send(&app, "POST", &uri, Some(json!({ "actor": "t1" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"]["assigned_staff"], "t1");

    let (status, body) = send(&app, "POST", &uri, Some(json!({ "actor": "t2" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
  }

  #[tokio::test]
  async fn external_assignment_and_filtering() {
    let app = app().await;
    let id = create_report(&app).await;
    send(
      &app,
      "POST",
      &format!("/reports/{id}/review"),
      Some(json!({ "actor": "m1", "status": "assigned" })),
    )
    .await;

    let uri = format!("/reports/{id}/assign-external");
    let (status, _) = send(
      &app,
      "POST",
      &uri,
      Some(json!({ "actor": "t1", "maintainer": "e1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "no staff assigned yet");

    send(
      &app,
      "POST",
      &format!("/reports/{id}/assign"),
      Some(json!({ "actor": "t1" })),
    )
    .await;
    let (status, body) = send(
      &app,
      "POST",
      &uri,
      Some(json!({ "actor": "t1", "maintainer": "e1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"]["assigned_maintainer"], "e1");
    assert_eq!(body["warnings"], json!([]));

    let (_, listed) = send(&app, "GET", "/reports?assigned_maintainer=e1", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    let (_, listed) = send(&app, "GET", "/reports?status=pending", None).await;
    assert!(listed.as_array().unwrap().is_empty());
  }
}
