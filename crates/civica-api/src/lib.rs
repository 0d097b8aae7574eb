//! JSON REST API for Civica.
//!
//! Exposes an axum [`Router`] driving a [`ReportWorkflowService`] over any
//! [`WorkflowStore`]. Acting usernames travel in request bodies and query
//! strings; authentication and TLS are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", civica_api::api_router(service.clone()))
//! ```

pub mod error;
pub mod identity;
pub mod messages;
pub mod notifications;
pub mod reports;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use civica_core::{store::WorkflowStore, workflow::ReportWorkflowService};

pub use error::ApiError;

/// Shared handler state.
pub type Service<S> = Arc<ReportWorkflowService<S>>;

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(service: Service<S>) -> Router<()>
where
  S: WorkflowStore + 'static,
{
  Router::new()
    // Reports
    .route("/reports", get(reports::list::<S>).post(reports::create::<S>))
    .route("/reports/{id}", get(reports::get_one::<S>))
    .route("/reports/{id}/review", post(reports::review::<S>))
    .route("/reports/{id}/work", post(reports::work::<S>))
    .route("/reports/{id}/assign", post(reports::assign::<S>))
    .route("/reports/{id}/assign-external", post(reports::assign_external::<S>))
    // Messages
    .route(
      "/reports/{id}/messages",
      get(messages::list::<S>).post(messages::create::<S>),
    )
    // Notifications
    .route("/notifications", get(notifications::list::<S>))
    .route("/notifications/{id}/read", post(notifications::mark_read::<S>))
    // Identity seeding
    .route("/citizens", post(identity::create_citizen::<S>))
    .route("/staff", post(identity::put_staff::<S>))
    .with_state(service)
}
