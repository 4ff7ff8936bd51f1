// Actors and the roles they hold

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A role as known to the host platform.
///
/// The workflow only names a handful of roles; anything else the identity
/// provider hands us is carried through as `Other` so it still round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    AssetCustodian,
    TransportAdministrator,
    HodFinance,
    AssetManager,
    Administrator,
    SystemManager,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::AssetCustodian => "Asset Custodian",
            Role::TransportAdministrator => "Transport Administrator",
            Role::HodFinance => "HOD (Finance)",
            Role::AssetManager => "Asset Manager (IT/Furniture)",
            Role::Administrator => "Administrator",
            Role::SystemManager => "System Manager",
            Role::Other(name) => name,
        }
    }

    /// Roles that hold every capability regardless of the configured grants.
    pub fn is_superuser(&self) -> bool {
        matches!(self, Role::Administrator | Role::SystemManager)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.trim() {
            "Asset Custodian" => Role::AssetCustodian,
            "Transport Administrator" => Role::TransportAdministrator,
            "HOD (Finance)" => Role::HodFinance,
            "Asset Manager (IT/Furniture)" => Role::AssetManager,
            "Administrator" => Role::Administrator,
            "System Manager" => Role::SystemManager,
            other => Role::Other(other.to_string()),
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and role set of whoever invokes an operation.
///
/// Threaded explicitly into every call; nothing in the crate reads a
/// "current user" from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    user: String,
    roles: BTreeSet<Role>,
}

impl Actor {
    pub fn new(user: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user: user.into(),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn has_any_role<'a>(&self, roles: impl IntoIterator<Item = &'a Role>) -> bool {
        roles.into_iter().any(|role| self.roles.contains(role))
    }

    pub fn is_administrator(&self) -> bool {
        self.roles.iter().any(Role::is_superuser)
    }
}
