// Identity resolution - turns a user id into an explicit Actor at the boundary

use async_trait::async_trait;
use std::sync::Arc;

use super::actor::Actor;
use crate::error::ApiError;
use crate::store::{DocumentStore, UserProfile};

/// Identity/role provider interface
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Profile (name, email, roles) for a user id
    async fn profile(&self, user: &str) -> Result<UserProfile, ApiError>;

    /// Actor context for a user id
    async fn resolve_actor(&self, user: &str) -> Result<Actor, ApiError> {
        let profile = self.profile(user).await?;
        Ok(Actor::new(profile.user, profile.roles))
    }
}

/// Resolves identities from the user table of the document store.
pub struct StoreIdentityProvider {
    store: Arc<dyn DocumentStore>,
}

impl StoreIdentityProvider {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IdentityProvider for StoreIdentityProvider {
    async fn profile(&self, user: &str) -> Result<UserProfile, ApiError> {
        self.store
            .get_user(user)
            .await?
            .ok_or_else(|| ApiError::not_found("User", user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use crate::store::{MemoryStore, SeedData};

    #[tokio::test]
    async fn test_resolves_actor_roles_from_store() {
        let seed = SeedData {
            users: vec![UserProfile {
                user: "hod@example.com".to_string(),
                full_name: "Head Of Finance".to_string(),
                email: Some("hod@example.com".to_string()),
                roles: vec![Role::HodFinance],
            }],
            ..SeedData::default()
        };
        let provider = StoreIdentityProvider::new(Arc::new(MemoryStore::from_seed(seed)));

        let actor = provider.resolve_actor("hod@example.com").await.unwrap();
        assert_eq!(actor.user(), "hod@example.com");
        assert!(actor.has_role(&Role::HodFinance));
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let provider = StoreIdentityProvider::new(Arc::new(MemoryStore::new()));

        let err = provider.resolve_actor("ghost").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
    }
}
