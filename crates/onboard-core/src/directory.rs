//! The role directory.
//!
//! Identities (normally an email address vouched for by whatever sits in
//! front of the API) map to a role and, for team members, the employee they
//! log sessions as. The directory is injected; nothing here is hardcoded.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::record::EmployeeId;

/// Which dashboard a user gets.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  /// Sees everything, approves completion requests.
  Admin,
  /// Logs and updates their own sessions.
  Team,
  /// Read-only view of every session, plus spreadsheet sync.
  Sales,
}

/// A resolved user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
  pub identity:      String,
  pub role:          Role,
  pub employee_id:   Option<EmployeeId>,
  pub employee_name: Option<String>,
}

/// Lookup service for user profiles.
pub trait UserDirectory: Send + Sync {
  fn lookup_user(&self, identity: &str) -> Option<UserProfile>;
}

/// A directory fixed at startup, usually from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
  users: HashMap<String, UserProfile>,
}

impl StaticDirectory {
  pub fn new(users: impl IntoIterator<Item = UserProfile>) -> Self {
    let users = users
      .into_iter()
      .map(|u| (identity_key(&u.identity), u))
      .collect();
    Self { users }
  }

  pub fn len(&self) -> usize { self.users.len() }

  pub fn is_empty(&self) -> bool { self.users.is_empty() }
}

impl UserDirectory for StaticDirectory {
  fn lookup_user(&self, identity: &str) -> Option<UserProfile> {
    self.users.get(&identity_key(identity)).cloned()
  }
}

fn identity_key(identity: &str) -> String { identity.trim().to_lowercase() }

#[cfg(test)]
mod tests {
  use super::*;

  fn profile(identity: &str, role: Role) -> UserProfile {
    UserProfile {
      identity: identity.into(),
      role,
      employee_id: None,
      employee_name: None,
    }
  }

  #[test]
  fn lookup_ignores_case_and_whitespace() {
    let dir = StaticDirectory::new([profile("Jim@Example.com", Role::Team)]);
    let found = dir.lookup_user("  jim@example.COM ").unwrap();
    assert_eq!(found.role, Role::Team);
  }

  #[test]
  fn unknown_identity_is_none() {
    let dir = StaticDirectory::new([profile("a@example.com", Role::Admin)]);
    assert!(dir.lookup_user("b@example.com").is_none());
  }

  #[test]
  fn role_parses_from_config_strings() {
    assert_eq!("sales".parse::<Role>().unwrap(), Role::Sales);
    assert_eq!(Role::Admin.to_string(), "admin");
  }
}
