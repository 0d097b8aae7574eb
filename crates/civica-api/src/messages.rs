//! Handlers for `/reports/{id}/messages`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reports/{id}/messages` | `?viewer=citizen\|staff` required |
//! | `POST` | `/reports/{id}/messages` | Body: [`PostBody`]; returns 201 |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use civica_core::{identity::ActorKind, message::Message, store::WorkflowStore};
use serde::Deserialize;

use crate::{Service, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub viewer: ActorKind,
}

/// `GET /reports/{id}/messages?viewer=<kind>`
pub async fn list<S: WorkflowStore>(
  State(service): State<Service<S>>,
  Path(id): Path<i64>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Message>>, ApiError> {
  Ok(Json(service.list_messages(id, params.viewer).await?))
}

#[derive(Debug, Deserialize)]
pub struct PostBody {
  pub actor:      String,
  pub actor_kind: ActorKind,
  pub body:       String,
  /// Required from the assigned TOSM; ignored for everyone else.
  pub is_private: Option<bool>,
}

/// `POST /reports/{id}/messages`: returns 201 and the posted message.
pub async fn create<S: WorkflowStore>(
  State(service): State<Service<S>>,
  Path(id): Path<i64>,
  Json(body): Json<PostBody>,
) -> Result<impl IntoResponse, ApiError> {
  let outcome = service
    .post_message(id, &body.actor, body.actor_kind, &body.body, body.is_private)
    .await?;
  Ok((StatusCode::CREATED, Json(outcome)))
}

#[cfg(test)]
mod tests {
  use axum::http::StatusCode;
  use serde_json::{Value, json};

  use crate::test_support::{app, create_report, send};

  async fn claimed(app: &axum::Router) -> i64 {
    let id = create_report(app).await;
    send(
      app,
      "POST",
      &format!("/reports/{id}/review"),
      Some(json!({ "actor": "m1", "status": "assigned" })),
    )
    .await;
    send(
      app,
      "POST",
      &format!("/reports/{id}/assign"),
      Some(json!({ "actor": "t1" })),
    )
    .await;
    id
  }

  #[tokio::test]
  async fn citizen_view_hides_private_messages() {
    let app = app().await;
    let id = claimed(&app).await;
    let uri = format!("/reports/{id}/messages");

    for (text, private) in [("internal note", true), ("on our way", false)] {
      let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(json!({
          "actor": "t1",
          "actor_kind": "staff",
          "body": text,
          "is_private": private,
        })),
      )
      .await;
      assert_eq!(status, StatusCode::CREATED);
    }

    let (_, citizen) = send(&app, "GET", &format!("{uri}?viewer=citizen"), None).await;
    let bodies: Vec<&Value> = citizen.as_array().unwrap().iter().map(|m| &m["body"]).collect();
    assert_eq!(bodies, [&json!("on our way")]);

    let (_, staff) = send(&app, "GET", &format!("{uri}?viewer=staff"), None).await;
    assert_eq!(staff.as_array().unwrap().len(), 2);
    assert_eq!(staff[0]["body"], "internal note");
  }

  #[tokio::test]
  async fn tosm_must_choose_visibility() {
    let app = app().await;
    let id = claimed(&app).await;
    let (status, body) = send(
      &app,
      "POST",
      &format!("/reports/{id}/messages"),
      Some(json!({ "actor": "t1", "actor_kind": "staff", "body": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
  }

  #[tokio::test]
  async fn unassigned_staff_cannot_post() {
    let app = app().await;
    let id = claimed(&app).await;
    let (status, _) = send(
      &app,
      "POST",
      &format!("/reports/{id}/messages"),
      Some(json!({
        "actor": "t2",
        "actor_kind": "staff",
        "body": "hello",
        "is_private": false,
      })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
  }
}
