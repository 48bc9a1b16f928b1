//! Configuration file management
//!
//! Handles finding, loading, and saving configuration files.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::HarnessConfig;

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./tessitura.yaml",
    "./tessitura.yml",
    "./.tessitura.yaml",
    "~/.config/tessitura/config.yaml",
];

impl HarnessConfig {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load configuration from the first standard location, or defaults
    pub fn load_default() -> Result<Self> {
        match Self::find() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from file; YAML or JSON by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        Ok(config)
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::BoostOrder;
    use tempfile::tempdir;

    #[test]
    fn test_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tessitura.yaml");
        std::fs::write(
            &path,
            "workers: 2\ninclude_slow: true\nboost:\n  - pitch::test_scale\nboost_order: listed\nmatching:\n  ellipsis: true\n",
        )
        .unwrap();

        let config = HarnessConfig::load(&path).unwrap();
        assert_eq!(config.workers, 2);
        assert!(config.include_slow);
        assert_eq!(config.boost, ["pitch::test_scale"]);
        assert_eq!(config.boost_order, BoostOrder::Listed);
        assert!(config.matching.ellipsis);
        assert_eq!(config.unit_timeout_secs, 600);
    }

    #[test]
    fn test_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"unit_timeout_secs": 30, "run_timeout_secs": 900}"#).unwrap();

        let config = HarnessConfig::load(&path).unwrap();
        assert_eq!(config.unit_timeout_secs, 30);
        assert_eq!(config.run_timeout_secs, Some(900));
    }

    #[test]
    fn test_unusable_values_load_for_later_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tessitura.yml");
        std::fs::write(&path, "workers: 0\n").unwrap();

        let mut config = HarnessConfig::load(&path).unwrap();
        assert!(config.validate().is_err());
        config.workers = 4;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tessitura.yml");
        std::fs::write(&path, "workers: [1, 2\n").unwrap();

        let err = HarnessConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse YAML config"));
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(expand_path("./tessitura.yaml"), PathBuf::from("./tessitura.yaml"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/a.yaml"), home.join("a.yaml"));
        }
    }
}
