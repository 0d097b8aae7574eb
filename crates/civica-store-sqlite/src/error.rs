//! Error type for `civica-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored enum string that no longer maps to a variant.
  #[error("unknown {column} value: {value:?}")]
  UnknownValue { column: &'static str, value: String },

  #[error("report not found: {0}")]
  ReportNotFound(i64),

  #[error("a report needs at least one photo")]
  MissingPhoto,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
