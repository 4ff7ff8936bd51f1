// Access control: actors, capability checks, identity resolution

pub mod actor;
pub mod identity;
pub mod policy;

pub use actor::{Actor, Role};
pub use identity::{IdentityProvider, StoreIdentityProvider};
pub use policy::{
    CapabilityChecker, CapabilityGrant, Operation, ResourceType, RolePolicy, VisibilityScope,
};
