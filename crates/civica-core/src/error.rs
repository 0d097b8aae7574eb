//! Error types for `civica-core`.

use serde::Serialize;
use thiserror::Error;

use crate::report::ReportStatus;

/// Machine-usable classification of an [`Error`], for callers that map
/// failures to their own responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  NotFound,
  Forbidden,
  InvalidTransition,
  MissingComment,
  InvalidComment,
  Conflict,
  InvalidState,
  Validation,
  Store,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: String },

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("invalid transition from {from} to {to}")]
  InvalidTransition { from: ReportStatus, to: ReportStatus },

  #[error("a comment is required when moving to {0}")]
  MissingComment(ReportStatus),

  #[error("a comment is not accepted when moving to {0}")]
  InvalidComment(ReportStatus),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("invalid state: {0}")]
  InvalidState(String),

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
    Self::NotFound { entity, id: id.to_string() }
  }

  /// Wrap a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::NotFound { .. } => ErrorKind::NotFound,
      Self::Forbidden(_) => ErrorKind::Forbidden,
      Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
      Self::MissingComment(_) => ErrorKind::MissingComment,
      Self::InvalidComment(_) => ErrorKind::InvalidComment,
      Self::Conflict(_) => ErrorKind::Conflict,
      Self::InvalidState(_) => ErrorKind::InvalidState,
      Self::Validation(_) => ErrorKind::Validation,
      Self::Store(_) => ErrorKind::Store,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
