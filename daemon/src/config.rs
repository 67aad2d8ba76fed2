//! Daemon configuration with TOML file support.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use conclave_governance::registry::standard_categories;
use conclave_governance::{CategoryConfig, CategoryRegistry, GovernanceParams};
use conclave_utils::LogFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("failed to serialize configuration: {0}")]
    Serialize(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the daemon.
///
/// Every field has a default, so an empty file is a valid configuration.
/// An empty `categories` list means the standard registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Upper bound of the LMDB memory map, in bytes.
    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,

    #[serde(default)]
    pub enable_metrics: bool,

    /// Reverse proxies whose `X-Forwarded-For` header is believed. Requests
    /// from any other peer are attributed to the peer address.
    #[serde(default)]
    pub trusted_proxies: Vec<IpAddr>,

    #[serde(default)]
    pub governance: GovernanceParams,

    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./conclave_data")
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_port() -> u16 {
    8077
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_lmdb_map_size() -> usize {
    1 << 30
}

// ── Impl ───────────────────────────────────────────────────────────────

impl DaemonConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// The configured categories, or the standard set when none are given.
    pub fn effective_categories(&self) -> Vec<CategoryConfig> {
        if self.categories.is_empty() {
            standard_categories(&self.governance)
        } else {
            self.categories.clone()
        }
    }

    /// This configuration with the category list spelled out.
    pub fn effective(&self) -> Self {
        Self {
            categories: self.effective_categories(),
            ..self.clone()
        }
    }

    /// Validate and load the category registry.
    pub fn registry(&self) -> Result<CategoryRegistry, ConfigError> {
        if self.lmdb_map_size == 0 {
            return Err(ConfigError::Invalid("lmdb_map_size must be positive".into()));
        }
        CategoryRegistry::load(&self.effective_categories(), &self.governance)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            bind_address: default_bind_address(),
            rpc_port: default_rpc_port(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            lmdb_map_size: default_lmdb_map_size(),
            enable_metrics: false,
            trusted_proxies: Vec::new(),
            governance: GovernanceParams::default(),
            categories: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_governance::{ConsequenceKind, PassCondition};
    use conclave_types::Rank;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = DaemonConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config, DaemonConfig::default());
        assert_eq!(config.rpc_port, 8077);
        assert_eq!(config.governance.promotion_cooldown_days, 42);
        assert_eq!(config.registry().unwrap().len(), 4);
    }

    #[test]
    fn effective_config_round_trips_through_toml() {
        let config = DaemonConfig::default().effective();
        let text = config.to_toml_string().unwrap();
        let parsed = DaemonConfig::from_toml_str(&text).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_toml_overrides() {
        let config = DaemonConfig::from_toml_str(
            r#"
            rpc_port = 9000
            log_format = "json"
            enable_metrics = true
            trusted_proxies = ["10.0.0.1", "::1"]

            [governance]
            inquisitor_rank = "SILVER"
            default_voting_window_hours = 2

            [[categories]]
            name = "BAN"
            nomination_window_hours = 1
            eligible_voters = "ALL"
            pass_condition = "UNANIMOUS_AGREE"
            inquisitor_can_initiate = true
            "#,
        )
        .expect("should parse");

        assert_eq!(config.rpc_port, 9000);
        assert_eq!(
            config.trusted_proxies,
            vec![
                "10.0.0.1".parse::<IpAddr>().unwrap(),
                "::1".parse::<IpAddr>().unwrap()
            ]
        );
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.enable_metrics);
        assert_eq!(config.governance.inquisitor_rank, Rank::Silver);
        assert_eq!(config.governance.top_rank_tenure_days, 42);

        let registry = config.registry().unwrap();
        let ban = registry.ban_category().unwrap();
        assert_eq!(ban.voting_window_hours, 2);
        assert_eq!(ban.pass_condition, PassCondition::UnanimousAgree);
        assert_eq!(ban.consequence, ConsequenceKind::Ban);
        assert!(registry.promotion_category(Rank::Silver).is_err());
    }

    #[test]
    fn unknown_pass_condition_is_a_parse_error() {
        let err = DaemonConfig::from_toml_str(
            r#"
            [[categories]]
            name = "BAN"
            eligible_voters = "ALL"
            pass_condition = "PLURALITY"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn trusted_proxies_must_be_ip_addresses() {
        let err = DaemonConfig::from_toml_str(r#"trusted_proxies = ["proxy.internal"]"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn invalid_categories_fail_validation() {
        let config = DaemonConfig::from_toml_str(
            r#"
            [[categories]]
            name = "BAN"
            eligible_voters = []
            pass_condition = "MAJORITY"
            "#,
        )
        .unwrap();
        assert!(matches!(config.registry(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_returns_read_error() {
        let err = DaemonConfig::from_toml_file(Path::new("/nonexistent/conclave.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
