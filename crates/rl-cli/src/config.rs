//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use rl_core::PercentagePolicy;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Denominator used by the category and conditional views.
    #[serde(default)]
    pub percentage_policy: PercentagePolicy,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("rl.db"),
            percentage_policy: PercentagePolicy::default(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations, then `config_path` if
    /// given, then `RL_*` environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // RL_DATABASE_PATH, RL_PERCENTAGE_POLICY
        figment = figment.merge(Env::prefixed("RL_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for rl.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("rl"))
}

/// Returns the platform-specific data directory for rl.
///
/// On Linux: `~/.local/share/rl`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("rl"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_rl() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "rl");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("rl.db"));
        assert_eq!(
            config.percentage_policy,
            PercentagePolicy::PercentOfCategoryTotal
        );
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "database_path = \"/tmp/rl-test.db\"\npercentage_policy = \"session_total\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/rl-test.db"));
        assert_eq!(
            config.percentage_policy,
            PercentagePolicy::PercentOfSessionTotal
        );
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "percentage_policy = \"everything\"\n").unwrap();

        assert!(Config::load_from(Some(&path)).is_err());
    }
}
