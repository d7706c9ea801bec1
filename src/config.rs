// File: ./src/config.rs
// Handles configuration loading, saving, and defaults.
use crate::context::AppContext;
use crate::storage::{DEFAULT_DATA_FILENAME, LocalStorage};
use anyhow::Result;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn default_data_file() -> String {
    DEFAULT_DATA_FILENAME.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    /// File name of the event data, inside the data directory.
    #[serde(default = "default_data_file")]
    pub data_file: String,
    /// Directory export files are written to. Defaults to the download folder.
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_to_file: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            export_dir: None,
            log_level: default_log_level(),
            log_to_file: false,
        }
    }
}

impl Config {
    /// Load the configuration from disk using an explicit context.
    /// A missing file yields the defaults; an unreadable one is an error.
    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx.get_config_file_path()?;

        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;

        Ok(config)
    }

    /// Save configuration using an explicit context.
    pub fn save(&self, ctx: &dyn AppContext) -> Result<()> {
        let path = ctx.get_config_file_path()?;
        LocalStorage::with_lock(&path, || {
            let toml_str = toml::to_string_pretty(self)?;
            LocalStorage::atomic_write(&path, toml_str)?;
            Ok(())
        })?;
        Ok(())
    }

    /// Unknown level names fall back to `Info`.
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }

    /// Configured export directory, or the context default.
    pub fn resolve_export_dir(&self, ctx: &dyn AppContext) -> Result<PathBuf> {
        match &self.export_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                Ok(dir.clone())
            }
            None => ctx.get_default_export_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TestContext;

    #[test]
    fn test_missing_config_uses_defaults() {
        let ctx = TestContext::new();
        let config = Config::load(&ctx).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.data_file, "events.json");
        assert_eq!(config.level_filter(), LevelFilter::Info);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let ctx = TestContext::new();
        fs::write(
            ctx.get_config_file_path().unwrap(),
            "log_level = \"debug\"\nlog_to_file = true\n",
        )
        .unwrap();

        let config = Config::load(&ctx).unwrap();
        assert_eq!(config.level_filter(), LevelFilter::Debug);
        assert!(config.log_to_file);
        assert_eq!(config.data_file, "events.json");
        assert!(config.export_dir.is_none());
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let ctx = TestContext::new();
        fs::write(ctx.get_config_file_path().unwrap(), "data_file = [").unwrap();
        let err = Config::load(&ctx).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_save_and_reload() {
        let ctx = TestContext::new();
        let config = Config {
            data_file: "work.json".to_string(),
            export_dir: Some(ctx.root.join("out")),
            log_level: "warn".to_string(),
            log_to_file: false,
        };
        config.save(&ctx).unwrap();
        assert_eq!(Config::load(&ctx).unwrap(), config);
        assert_eq!(
            config.resolve_export_dir(&ctx).unwrap(),
            ctx.root.join("out")
        );
    }

    #[test]
    fn test_unknown_log_level_falls_back() {
        let config = Config {
            log_level: "chatty".to_string(),
            ..Config::default()
        };
        assert_eq!(config.level_filter(), LevelFilter::Info);
    }
}
