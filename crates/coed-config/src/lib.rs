use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_MARKER_PREFIX: &str = "id-colink-";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Pattern for references in pasted text; the built-in URL pattern when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,

    #[serde(default = "default_marker_prefix")]
    pub marker_prefix: String,

    /// `error`, `warn`, `info`, `debug` or `trace`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Base directory for relative document paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_dir: Option<PathBuf>,
}

fn default_marker_prefix() -> String {
    DEFAULT_MARKER_PREFIX.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url_pattern: None,
            marker_prefix: default_marker_prefix(),
            log_level: None,
            document_dir: None,
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the document directory
        if let Some(dir) = config.document_dir.take() {
            config.document_dir = Some(Self::expand_path(&dir).unwrap_or(dir));
        }

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/coed");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// `path` as given when absolute or when no document directory is set.
    pub fn document_path(&self, path: &Path) -> PathBuf {
        match &self.document_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/coed/config.toml"));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.marker_prefix, "id-colink-");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let original = Config {
            url_pattern: Some(r"\bftp://\S+".to_string()),
            marker_prefix: "ph-".to_string(),
            log_level: Some("debug".to_string()),
            document_dir: Some(PathBuf::from("/tmp/docs")),
        };

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_unset_fields_are_not_written() {
        let toml_str = toml::to_string(&Config::default()).unwrap();
        assert!(!toml_str.contains("url_pattern"));
        assert!(!toml_str.contains("log_level"));
        assert!(toml_str.contains("marker_prefix"));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("COED_TEST_VAR", "/test/env/path");
        }

        let path = PathBuf::from("$COED_TEST_VAR/subdir");
        let expanded = Config::expand_path(&path).unwrap();
        assert_eq!(expanded, PathBuf::from("/test/env/path/subdir"));

        unsafe {
            env::remove_var("COED_TEST_VAR");
        }
    }

    #[test]
    fn test_document_path_joins_relative_paths_only() {
        let config = Config {
            document_dir: Some(PathBuf::from("/docs")),
            ..Config::default()
        };
        assert_eq!(
            config.document_path(Path::new("a.json")),
            PathBuf::from("/docs/a.json")
        );
        assert_eq!(
            config.document_path(Path::new("/abs/a.json")),
            PathBuf::from("/abs/a.json")
        );
        assert_eq!(
            Config::default().document_path(Path::new("a.json")),
            PathBuf::from("a.json")
        );
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "marker_prefix = [").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let test_config = Config {
            log_level: Some("warn".to_string()),
            ..Config::default()
        };

        test_config.save_to_path(&config_file).unwrap();
        assert!(config_file.exists(), "Config file should exist");

        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();
        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_document_dir_with_env_var_in_toml() {
        unsafe {
            env::set_var("COED_DOCS_ROOT", "/custom/docs");
        }

        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "document_dir = \"$COED_DOCS_ROOT/mine\"\n").unwrap();
        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(config.document_dir, Some(PathBuf::from("/custom/docs/mine")));

        unsafe {
            env::remove_var("COED_DOCS_ROOT");
        }
    }
}
