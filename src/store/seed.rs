// Reference data a fresh store starts from

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use super::types::{Asset, AssetCategory, Location, Transporter, UserProfile};
use super::StoreError;

/// Master data the workflow reads but never writes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub assets: Vec<Asset>,
    pub locations: Vec<Location>,
    pub asset_categories: Vec<AssetCategory>,
    pub transporters: Vec<Transporter>,
    pub users: Vec<UserProfile>,
}

impl SeedData {
    /// Read a JSON seed file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let seed: SeedData = serde_json::from_str(&raw)?;
        info!(
            path = %path.display(),
            assets = seed.assets.len(),
            locations = seed.locations.len(),
            users = seed.users.len(),
            "Loaded seed data"
        );
        Ok(seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_partial_seed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        std::fs::write(
            &path,
            r#"{
                "locations": [{"name": "HQ", "location_name": "Head Office"}],
                "users": [{"user": "a@example.com", "full_name": "A", "email": null, "roles": ["Asset Custodian"]}]
            }"#,
        )
        .unwrap();

        let seed = SeedData::load(&path).await.unwrap();
        assert_eq!(seed.locations.len(), 1);
        assert!(!seed.locations[0].disabled);
        assert!(seed.assets.is_empty());
        assert_eq!(seed.users[0].roles, vec![crate::access::Role::AssetCustodian]);
    }

    #[tokio::test]
    async fn test_missing_seed_file_is_io_error() {
        let err = SeedData::load("/nonexistent/seed.json").await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
