//! Handlers for `/notifications` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/notifications` | Exactly one of `?citizen_id=` or `?staff=` |
//! | `POST` | `/notifications/{id}/read` | 204; idempotent |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use civica_core::{
  notification::{Addressee, Notification},
  store::WorkflowStore,
};
use serde::Deserialize;

use crate::{Service, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub citizen_id: Option<i64>,
  pub staff:      Option<String>,
}

impl ListParams {
  fn addressee(self) -> Result<Addressee, ApiError> {
    match (self.citizen_id, self.staff) {
      (Some(id), None) => Ok(Addressee::Citizen(id)),
      (None, Some(username)) => Ok(Addressee::Staff(username)),
      _ => Err(ApiError::BadRequest(
        "pass exactly one of citizen_id or staff".into(),
      )),
    }
  }
}

/// `GET /notifications?citizen_id=<id>` or `GET /notifications?staff=<username>`
pub async fn list<S: WorkflowStore>(
  State(service): State<Service<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Notification>>, ApiError> {
  let addressee = params.addressee()?;
  Ok(Json(service.notifications(&addressee).await?))
}

/// `POST /notifications/{id}/read`
pub async fn mark_read<S: WorkflowStore>(
  State(service): State<Service<S>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  service.mark_notification_read(id).await?;
  Ok(StatusCode::NO_CONTENT)
}
