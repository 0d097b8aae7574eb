//! HTTP server wiring for Civica.
//!
//! Holds the runtime configuration and assembles the application router; the
//! binary in `main.rs` only parses flags, loads settings and serves.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use civica_core::{
  config::WorkflowConfig, store::WorkflowStore, workflow::ReportWorkflowService,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CIVICA_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub workflow:   WorkflowConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".into(),
      port:       8080,
      store_path: PathBuf::from("civica.db"),
      workflow:   WorkflowConfig::default(),
    }
  }
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `CIVICA_*` environment
  /// variables. Nested keys use a double underscore, e.g.
  /// `CIVICA_WORKFLOW__CAS_ATTEMPTS=5`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("CIVICA").separator("__"))
      .build()?
      .try_deserialize()
  }

  /// `store_path` with a leading `~` expanded to the user's home directory.
  pub fn expanded_store_path(&self) -> PathBuf {
    let s = self.store_path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/")
      && let Ok(home) = std::env::var("HOME")
    {
      return PathBuf::from(home).join(rest);
    }
    self.store_path.clone()
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: the JSON API with request tracing.
pub fn app<S>(store: Arc<S>, workflow: WorkflowConfig) -> Router
where
  S: WorkflowStore + 'static,
{
  let service = Arc::new(ReportWorkflowService::new(store, workflow));
  civica_api::api_router(service).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use civica_core::identity::{Role, Staff};
  use civica_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = parse("");
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.workflow.max_photos, 3);
    assert_eq!(cfg.workflow.cas_attempts, 3);
    assert_eq!(cfg.workflow.dispatch_retries, 1);
  }

  #[test]
  fn workflow_section_overrides_defaults() {
    let cfg = parse(
      r#"
        host = "0.0.0.0"
        port = 9000
        store_path = "/var/lib/civica/civica.db"

        [workflow]
        cas_attempts = 5
      "#,
    );
    assert_eq!(cfg.host, "0.0.0.0");
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/civica/civica.db"));
    assert_eq!(cfg.workflow.cas_attempts, 5);
    assert_eq!(cfg.workflow.max_photos, 3);
  }

  #[test]
  fn absolute_store_path_is_untouched() {
    let cfg = ServerConfig {
      store_path: PathBuf::from("/tmp/civica.db"),
      ..Default::default()
    };
    assert_eq!(cfg.expanded_store_path(), PathBuf::from("/tmp/civica.db"));
  }

  #[tokio::test]
  async fn app_serves_over_sqlite() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    store
      .put_staff(Staff::new("m1", Role::Mpro, []))
      .await
      .unwrap();
    let app = app(store, WorkflowConfig::default());

    let response = app
      .clone()
      .oneshot(
        Request::builder()
          .uri("/reports")
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
      .oneshot(
        Request::builder()
          .method("POST")
          .uri("/reports")
          .header("content-type", "application/json")
          .body(Body::from(
            serde_json::json!({
              "citizen": "nobody",
              "title": "t",
              "description": "d",
              "category": "other",
              "latitude": 0.0,
              "longitude": 0.0,
              "photos": ["p.jpg"],
            })
            .to_string(),
          ))
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
  }
}
