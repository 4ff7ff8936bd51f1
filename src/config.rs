use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::access::{CapabilityGrant, Role, RolePolicy, VisibilityScope};
use crate::workflows::{default_rules, TableError, TransitionRule, TransitionTable, DEFAULT_WORKFLOW_NAME};

/// Main configuration structure for MoveItRight
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MoveItRightConfig {
    /// Where records live
    pub store: StoreConfig,
    /// SQLite settings, used by the `sqlite` back-end
    pub database: Option<DatabaseConfig>,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Role grants and record visibility
    pub access: AccessConfig,
    /// Query limits
    pub api: ApiConfig,
    /// Transition table
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// JSON snapshot the memory back-end loads and saves
    pub snapshot_path: Option<PathBuf>,
    /// Reference data loaded into a fresh store
    pub seed_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines
    pub json_logs: bool,
    /// Log operation counters on exit
    pub enable_metrics: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccessConfig {
    /// Roles whose holders only see records they own
    pub restricted_roles: Vec<Role>,
    /// Roles that lift the restriction
    pub privileged_roles: Vec<Role>,
    /// Which roles may read, create or write each record type
    pub capabilities: Vec<CapabilityGrant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Records per `get_asset_movements` page
    pub list_page_length: usize,
    /// Recent requests shown on the dashboard
    pub dashboard_recent_limit: usize,
    /// Maximum `search_assets` results
    pub search_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkflowConfig {
    pub name: String,
    pub transitions: Vec<TransitionRule>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            snapshot_path: Some(PathBuf::from(".moveitright/store.json")),
            seed_path: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://.moveitright/moveitright.db".to_string(),
            max_connections: 10,
            auto_migrate: true,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
            enable_metrics: true,
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            restricted_roles: vec![Role::AssetCustodian],
            privileged_roles: vec![Role::Administrator, Role::SystemManager],
            capabilities: RolePolicy::default_grants(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            list_page_length: 50,
            dashboard_recent_limit: 10,
            search_limit: 10,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_WORKFLOW_NAME.to_string(),
            transitions: default_rules(),
        }
    }
}

impl MoveItRightConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (moveitright.toml, .moveitright-rc)
    /// 3. Environment variables (prefixed with MOVEITRIGHT_, `__` between keys)
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Like [`load`](Self::load), with `path` layered over the standard files
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if Path::new("moveitright.toml").exists() {
            builder = builder.add_source(File::with_name("moveitright"));
        }

        if Path::new(".moveitright-rc").exists() {
            builder = builder.add_source(File::new(".moveitright-rc", config::FileFormat::Toml));
        }

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("MOVEITRIGHT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: MoveItRightConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validated transition table
    pub fn transition_table(&self) -> Result<TransitionTable, TableError> {
        TransitionTable::new(self.workflow.name.clone(), self.workflow.transitions.iter().cloned())
    }

    pub fn role_policy(&self) -> RolePolicy {
        RolePolicy::from_grants(&self.access.capabilities)
    }

    pub fn visibility_scope(&self) -> VisibilityScope {
        VisibilityScope::new(
            self.access.restricted_roles.iter().cloned(),
            self.access.privileged_roles.iter().cloned(),
        )
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<MoveItRightConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = MoveItRightConfig::load_env_file();
        MoveItRightConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static MoveItRightConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::{Action, WorkflowState};
    use std::io::Write;

    #[test]
    fn test_defaults_build_valid_table() {
        let config = MoveItRightConfig::default();
        let table = config.transition_table().unwrap();
        assert_eq!(table.name(), "Asset Movement Workflow");
        assert_eq!(table.len(), 11);
        assert_eq!(config.api.list_page_length, 50);
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[store]
backend = "memory"
snapshot_path = "/tmp/elsewhere.json"

[api]
list_page_length = 5
dashboard_recent_limit = 3
search_limit = 2
"#
        )
        .unwrap();

        let config = MoveItRightConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(config.api.list_page_length, 5);
        assert_eq!(config.store.snapshot_path, Some(PathBuf::from("/tmp/elsewhere.json")));
        // Untouched sections keep their defaults
        assert_eq!(config.workflow.transitions.len(), 11);
        assert_eq!(config.access.restricted_roles, vec![Role::AssetCustodian]);
    }

    #[test]
    fn test_custom_transitions_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[workflow]
name = "Short Workflow"

[[workflow.transitions]]
state = "Draft"
action = "Submit"
next_state = "Closed"
allowed = "Asset Custodian"
triggers_submission = true
"#
        )
        .unwrap();

        let config = MoveItRightConfig::load_from(Some(file.path())).unwrap();
        let table = config.transition_table().unwrap();
        assert_eq!(table.len(), 1);
        let rule = table.lookup(WorkflowState::Draft, Action::Submit).unwrap();
        assert_eq!(rule.next_state, WorkflowState::Closed);
        assert!(rule.triggers_submission);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = MoveItRightConfig::default();
        let text = config.to_toml().unwrap();
        let parsed: MoveItRightConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
