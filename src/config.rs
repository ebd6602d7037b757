//! Client configuration: API location and session scope directory.
//!
//! Layering: built-in defaults, then the user-level file
//! (~/.doados/config.toml), then a project-local override
//! (.doados/config.toml). CLI flags and env vars are applied on top by main.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    /// Overrides the session scope directory (default: ~/.doados).
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default paths.
    /// Priority: project (.doados/config.toml) > user (~/.doados/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".doados").join("config.toml");
            if user_config.exists() {
                config.merge(Self::load_from(&user_config)?);
            }
        }

        let project_config = Path::new(".doados").join("config.toml");
        if project_config.exists() {
            config.merge(Self::load_from(&project_config)?);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority where set)
    fn merge(&mut self, other: Config) {
        if other.api.base_url != default_base_url() {
            self.api.base_url = other.api.base_url;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
    }

    /// Session scope directory: explicit override or ~/.doados.
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        dirs::home_dir()
            .map(|home| home.join(".doados"))
            .unwrap_or_else(|| PathBuf::from(".doados"))
    }

    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let url = self.api.base_url.trim();
        if url.is_empty() {
            errors.push(ValidationError {
                field: "api.base_url".to_string(),
                message: "must not be empty".to_string(),
            });
        } else if !url.starts_with("http://") && !url.starts_with("https://") {
            errors.push(ValidationError {
                field: "api.base_url".to_string(),
                message: format!("must start with http:// or https:// (got {:?})", url),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert!(config.data_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "data_dir = \"/tmp/doados-test\"\n\n[api]\nbase_url = \"https://doados.example.org\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api.base_url, "https://doados.example.org");
        assert_eq!(config.data_dir.as_deref(), Some(Path::new("/tmp/doados-test")));
    }

    #[test]
    fn test_merge_overrides_only_set_fields() {
        let mut base = Config::default();
        base.api.base_url = "https://prod.example.org".to_string();

        base.merge(Config::default());
        assert_eq!(base.api.base_url, "https://prod.example.org");

        let mut override_config = Config::default();
        override_config.data_dir = Some(PathBuf::from("/custom"));
        base.merge(override_config);
        assert_eq!(base.api.base_url, "https://prod.example.org");
        assert_eq!(base.data_dir.as_deref(), Some(Path::new("/custom")));
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.api.base_url = "localhost:8080".to_string();
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].field.contains("base_url"));

        config.api.base_url = "  ".to_string();
        let errors = config.validate().unwrap_err();
        assert!(errors[0].message.contains("empty"));
    }
}
