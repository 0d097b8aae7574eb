//! Tunables for the workflow service, usually nested in the server's
//! configuration file.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
  /// Photo references kept per report; extras are ignored.
  pub max_photos:       usize,
  /// Compare-and-swap attempts per mutation before giving up with
  /// `Conflict`.
  pub cas_attempts:     u32,
  /// Extra attempts when writing a notification fails in the store.
  pub dispatch_retries: u32,
}

impl Default for WorkflowConfig {
  fn default() -> Self {
    Self {
      max_photos:       3,
      cas_attempts:     3,
      dispatch_retries: 1,
    }
  }
}
