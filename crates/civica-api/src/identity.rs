//! Seeding endpoints for the identity directory.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/citizens` | Body: [`NewCitizen`]; 201, 409 if the username is taken |
//! | `POST` | `/staff` | Body: [`Staff`]; upsert, 204 |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use civica_core::{
  Error,
  identity::{NewCitizen, Staff},
  store::WorkflowStore,
};

use crate::{Service, error::ApiError};

/// `POST /citizens`
pub async fn create_citizen<S: WorkflowStore>(
  State(service): State<Service<S>>,
  Json(body): Json<NewCitizen>,
) -> Result<impl IntoResponse, ApiError> {
  if body.username.trim().is_empty() {
    return Err(ApiError::BadRequest("username must not be blank".into()));
  }
  let username = body.username.clone();
  let citizen = service
    .store()
    .add_citizen(body)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::Conflict(format!("username {username} is taken")))?;
  Ok((StatusCode::CREATED, Json(citizen)))
}

/// `POST /staff`
pub async fn put_staff<S: WorkflowStore>(
  State(service): State<Service<S>>,
  Json(body): Json<Staff>,
) -> Result<StatusCode, ApiError> {
  if body.username.trim().is_empty() {
    return Err(ApiError::BadRequest("username must not be blank".into()));
  }
  service.store().put_staff(body).await.map_err(Error::store)?;
  Ok(StatusCode::NO_CONTENT)
}
