//! Citizens and staff. The directory owning these records lives outside the
//! workflow, which only reads them.

use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::report::Category;

// ─── Staff ───────────────────────────────────────────────────────────────────

/// The closed set of staff roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  /// Municipal public relations officer: triages new reports.
  Mpro,
  /// Technical office staff member: performs the work.
  Tosm,
  /// External maintainer engaged by a TOSM.
  Em,
}

impl Role {
  pub const ALL: [Self; 4] = [Self::Admin, Self::Mpro, Self::Tosm, Self::Em];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Admin => "admin",
      Self::Mpro => "mpro",
      Self::Tosm => "tosm",
      Self::Em => "em",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|role| role.as_str() == s)
      .ok_or_else(|| format!("unknown role: {s:?}"))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
  pub username: String,
  pub role:     Role,
  /// Office categories this staff member works for.
  #[serde(default)]
  pub offices:  BTreeSet<Category>,
}

impl Staff {
  pub fn new(
    username: impl Into<String>,
    role: Role,
    offices: impl IntoIterator<Item = Category>,
  ) -> Self {
    Self {
      username: username.into(),
      role,
      offices: offices.into_iter().collect(),
    }
  }

  pub fn serves(&self, category: Category) -> bool {
    self.offices.contains(&category)
  }
}

// ─── Citizens ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citizen {
  pub citizen_id: i64,
  pub username:   String,
  pub email:      String,
  pub first_name: String,
  pub last_name:  String,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::WorkflowStore::add_citizen`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewCitizen {
  pub username:   String,
  pub email:      String,
  pub first_name: String,
  pub last_name:  String,
}

// ─── Actors ──────────────────────────────────────────────────────────────────

/// Which directory an acting username belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
  Citizen,
  Staff,
}
