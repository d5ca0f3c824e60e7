use crate::expand::Expand;
use crate::result::CommonResult;
use crate::tier::{TierPolicy, DEFAULT_TIER_NAMESPACE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "dashsync.config.json";

/// Who is looking at the aggregate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
    pub user_id: String,

    /// Teams the user belongs to (for team-owned aggregates)
    #[serde(default)]
    pub team_ids: Vec<String>,
}

/// Dashsync configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    #[serde(default)]
    pub viewer: Viewer,

    /// Reserved namespace of tier tags
    #[serde(default = "default_tier_namespace")]
    pub tier_namespace: String,

    /// Relationship fields inlined on load
    #[serde(default)]
    pub expand: Expand,

    /// Upper bound on the owning-service lookup during load
    #[serde(default = "default_service_lookup_timeout_ms")]
    pub service_lookup_timeout_ms: u64,

    /// Prepend a `test /version` op so stale baselines are rejected
    #[serde(default)]
    pub guard_version: bool,
}

fn default_tier_namespace() -> String {
    DEFAULT_TIER_NAMESPACE.to_string()
}

fn default_service_lookup_timeout_ms() -> u64 {
    5_000
}

impl SyncConfig {
    /// Load config from a directory
    pub fn load(dir: &Path) -> CommonResult<Self> {
        let config_path = Self::path_in(dir);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: SyncConfig = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(SyncConfig::default())
        }
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(DEFAULT_CONFIG_NAME)
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            viewer: Viewer {
                user_id: user_id.into(),
                team_ids: vec![],
            },
            ..Self::default()
        }
    }

    pub fn tier_policy(&self) -> TierPolicy {
        TierPolicy::new(self.tier_namespace.clone())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            viewer: Viewer::default(),
            tier_namespace: default_tier_namespace(),
            expand: Expand::full(),
            service_lookup_timeout_ms: default_service_lookup_timeout_ms(),
            guard_version: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "viewer": {"userId": "u1", "teamIds": ["t1"]},
            "tierNamespace": "PII",
            "expand": {"usage": false},
            "guardVersion": true
        }"#;

        let config: SyncConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.viewer.user_id, "u1");
        assert_eq!(config.viewer.team_ids, vec!["t1"]);
        assert!(config.tier_policy().is_tier("PII.Sensitive"));
        assert!(!config.expand.usage);
        assert!(config.expand.owner);
        assert!(config.guard_version);
        assert_eq!(config.service_lookup_timeout_ms, 5_000);
    }

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.tier_namespace, "Tier");
        assert_eq!(config.expand, Expand::full());
        assert!(!config.guard_version);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SyncConfig::load(dir.path()).unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            SyncConfig::path_in(dir.path()),
            r#"{"viewer": {"userId": "u9"}, "serviceLookupTimeoutMs": 250}"#,
        )
        .unwrap();

        let config = SyncConfig::load(dir.path()).unwrap();
        assert_eq!(config.viewer.user_id, "u9");
        assert_eq!(config.service_lookup_timeout_ms, 250);
    }

    #[test]
    fn test_malformed_config_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(SyncConfig::path_in(dir.path()), "{ not json").unwrap();

        assert!(matches!(
            SyncConfig::load(dir.path()),
            Err(crate::error::CommonError::Json(_))
        ));
    }
}
