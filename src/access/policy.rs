// Capability checks - one seam for every "may this actor do X to Y" question

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use super::actor::{Actor, Role};
use crate::error::ApiError;

/// Record types the operations guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    #[serde(rename = "Asset Movement")]
    AssetMovement,
    #[serde(rename = "Asset Movement Item")]
    AssetMovementItem,
    #[serde(rename = "Rejection Reason")]
    RejectionReason,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceType::AssetMovement => "Asset Movement",
            ResourceType::AssetMovementItem => "Asset Movement Item",
            ResourceType::RejectionReason => "Rejection Reason",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Create,
    Write,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Write => "write",
        })
    }
}

/// Permission checker interface
pub trait CapabilityChecker: Send + Sync {
    /// Whether `actor` may perform `operation` on records of type `resource`
    fn is_permitted(&self, actor: &Actor, resource: ResourceType, operation: Operation) -> bool;

    /// Same check, as an error the operation boundary can report
    fn ensure(
        &self,
        actor: &Actor,
        resource: ResourceType,
        operation: Operation,
    ) -> Result<(), ApiError> {
        if self.is_permitted(actor, resource, operation) {
            Ok(())
        } else {
            Err(ApiError::PermissionDenied {
                resource,
                operation,
            })
        }
    }
}

/// One configured grant: these roles may perform `operation` on `resource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityGrant {
    pub resource: ResourceType,
    pub operation: Operation,
    pub roles: Vec<Role>,
}

/// Grants-table policy. Superuser roles pass every check.
#[derive(Debug, Clone, Default)]
pub struct RolePolicy {
    grants: HashMap<(ResourceType, Operation), BTreeSet<Role>>,
}

impl RolePolicy {
    pub fn from_grants<'a>(grants: impl IntoIterator<Item = &'a CapabilityGrant>) -> Self {
        let mut table: HashMap<(ResourceType, Operation), BTreeSet<Role>> = HashMap::new();
        for grant in grants {
            table
                .entry((grant.resource, grant.operation))
                .or_default()
                .extend(grant.roles.iter().cloned());
        }
        Self { grants: table }
    }

    /// Grants matching the asset transfer workflow's role layout.
    pub fn default_grants() -> Vec<CapabilityGrant> {
        let workflow_roles = vec![
            Role::AssetCustodian,
            Role::TransportAdministrator,
            Role::HodFinance,
            Role::AssetManager,
        ];
        let approvers = vec![Role::HodFinance, Role::AssetManager];

        vec![
            CapabilityGrant {
                resource: ResourceType::AssetMovement,
                operation: Operation::Read,
                roles: workflow_roles.clone(),
            },
            CapabilityGrant {
                resource: ResourceType::AssetMovement,
                operation: Operation::Create,
                roles: vec![Role::AssetCustodian],
            },
            CapabilityGrant {
                resource: ResourceType::AssetMovement,
                operation: Operation::Write,
                roles: vec![Role::AssetCustodian, Role::TransportAdministrator],
            },
            CapabilityGrant {
                resource: ResourceType::AssetMovementItem,
                operation: Operation::Read,
                roles: workflow_roles,
            },
            CapabilityGrant {
                resource: ResourceType::RejectionReason,
                operation: Operation::Create,
                roles: approvers,
            },
        ]
    }
}

impl CapabilityChecker for RolePolicy {
    fn is_permitted(&self, actor: &Actor, resource: ResourceType, operation: Operation) -> bool {
        if actor.is_administrator() {
            return true;
        }
        self.grants
            .get(&(resource, operation))
            .is_some_and(|roles| actor.has_any_role(roles))
    }
}

/// Decides which movement records an actor may list.
///
/// Restricted actors (e.g. custodians) only see what they own, unless they
/// also hold a privileged role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityScope {
    restricted_roles: BTreeSet<Role>,
    privileged_roles: BTreeSet<Role>,
}

impl VisibilityScope {
    pub fn new(
        restricted_roles: impl IntoIterator<Item = Role>,
        privileged_roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self {
            restricted_roles: restricted_roles.into_iter().collect(),
            privileged_roles: privileged_roles.into_iter().collect(),
        }
    }

    pub fn is_restricted(&self, actor: &Actor) -> bool {
        actor.has_any_role(&self.restricted_roles) && !actor.has_any_role(&self.privileged_roles)
    }

    /// Owner filter to apply to list queries for this actor, if any.
    pub fn owner_filter(&self, actor: &Actor) -> Option<String> {
        self.is_restricted(actor).then(|| actor.user().to_string())
    }
}

impl Default for VisibilityScope {
    fn default() -> Self {
        Self::new(
            [Role::AssetCustodian],
            [Role::Administrator, Role::SystemManager],
        )
    }
}
