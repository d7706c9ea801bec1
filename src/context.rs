// File: ./src/context.rs
/*! Application context abstraction for filesystem paths.

The `AppContext` trait encapsulates how the library determines its
data/config/export directories. Two concrete implementations are provided:

- `StandardContext`: Uses `directories::ProjectDirs` (and `UserDirs` for
  the download folder), optionally under an override root.
- `TestContext`: Creates a temporary directory for isolated tests and
  cleans it up when dropped.

Callers pass a `&dyn AppContext` to anything that touches the filesystem.
*/

use anyhow::{Context, Result};
use directories::{ProjectDirs, UserDirs};
use std::path::PathBuf;

/// Defines the file system context for the application.
///
/// The trait is object-safe so callers can hold `Arc<dyn AppContext>`.
pub trait AppContext: Send + Sync + std::fmt::Debug {
    fn get_data_dir(&self) -> Result<PathBuf>;
    fn get_config_dir(&self) -> Result<PathBuf>;

    /// Where export files land when the configuration does not say otherwise.
    fn get_default_export_dir(&self) -> Result<PathBuf> {
        let p = self.get_data_dir()?.join("exports");
        std::fs::create_dir_all(&p)
            .with_context(|| format!("Failed to create directory: {:?}", p))?;
        Ok(p)
    }

    fn get_config_file_path(&self) -> Result<PathBuf> {
        Ok(self.get_config_dir()?.join("config.toml"))
    }

    fn get_log_file_path(&self) -> Option<PathBuf> {
        self.get_data_dir().ok().map(|p| p.join("daybook.log"))
    }
}

// --- Production Implementation ---

#[derive(Clone, Debug)]
pub struct StandardContext {
    override_root: Option<PathBuf>,
}

impl StandardContext {
    /// When `override_root` is `Some(path)`, all directories are created
    /// under that root using `data`, `config` and `exports` subdirectories.
    pub fn new(override_root: Option<PathBuf>) -> Self {
        Self { override_root }
    }

    fn ensure_exists(path: PathBuf) -> Result<PathBuf> {
        if !path.exists() {
            std::fs::create_dir_all(&path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(path)
    }

    fn get_proj_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("org", "daybook", "daybook")
    }
}

impl AppContext for StandardContext {
    fn get_data_dir(&self) -> Result<PathBuf> {
        if let Some(root) = &self.override_root {
            return Self::ensure_exists(root.join("data"));
        }
        let proj = Self::get_proj_dirs().ok_or_else(|| anyhow::anyhow!("No home directory"))?;
        Self::ensure_exists(proj.data_dir().to_path_buf())
    }

    fn get_config_dir(&self) -> Result<PathBuf> {
        if let Some(root) = &self.override_root {
            return Self::ensure_exists(root.join("config"));
        }
        let proj = Self::get_proj_dirs().ok_or_else(|| anyhow::anyhow!("No home directory"))?;
        Self::ensure_exists(proj.config_dir().to_path_buf())
    }

    fn get_default_export_dir(&self) -> Result<PathBuf> {
        if let Some(root) = &self.override_root {
            return Self::ensure_exists(root.join("exports"));
        }
        // Exports behave like browser downloads: prefer the user's download folder.
        if let Some(dir) = UserDirs::new().and_then(|u| u.download_dir().map(|d| d.to_path_buf()))
        {
            return Self::ensure_exists(dir);
        }
        Self::ensure_exists(self.get_data_dir()?.join("exports"))
    }
}

// --- Test Implementation ---

#[derive(Clone, Debug)]
pub struct TestContext {
    pub root: PathBuf,
}

impl TestContext {
    /// Creates a new TestContext backed by a unique temporary directory.
    ///
    /// The directory is created immediately and removed when the `TestContext`
    /// is dropped.
    pub fn new() -> Self {
        let uuid = uuid::Uuid::new_v4();
        let root = std::env::temp_dir().join(format!("daybook_test_{}", uuid));
        // Best-effort create; tests will fail loudly on first IO if this did not work.
        let _ = std::fs::create_dir_all(&root);
        Self { root }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AppContext for TestContext {
    fn get_data_dir(&self) -> Result<PathBuf> {
        let p = self.root.join("data");
        std::fs::create_dir_all(&p)?;
        Ok(p)
    }

    fn get_config_dir(&self) -> Result<PathBuf> {
        let p = self.root.join("config");
        std::fs::create_dir_all(&p)?;
        Ok(p)
    }

    fn get_default_export_dir(&self) -> Result<PathBuf> {
        let p = self.root.join("exports");
        std::fs::create_dir_all(&p)?;
        Ok(p)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        // Best-effort cleanup; ignore errors.
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_dirs_live_under_root() {
        let ctx = TestContext::new();
        let data = ctx.get_data_dir().unwrap();
        let config = ctx.get_config_file_path().unwrap();
        assert!(data.starts_with(&ctx.root));
        assert!(data.exists());
        assert_eq!(config, ctx.root.join("config").join("config.toml"));
        assert!(ctx.get_default_export_dir().unwrap().ends_with("exports"));
    }

    #[test]
    fn test_context_cleans_up_on_drop() {
        let root = {
            let ctx = TestContext::new();
            ctx.get_data_dir().unwrap();
            ctx.root.clone()
        };
        assert!(!root.exists());
    }

    #[test]
    fn test_standard_context_override_root() {
        let tmp = TestContext::new();
        let ctx = StandardContext::new(Some(tmp.root.join("override")));
        assert_eq!(
            ctx.get_data_dir().unwrap(),
            tmp.root.join("override").join("data")
        );
        assert_eq!(
            ctx.get_default_export_dir().unwrap(),
            tmp.root.join("override").join("exports")
        );
    }
}
