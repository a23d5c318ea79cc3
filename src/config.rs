use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ROOT: &str = "/workspace";
pub const DEFAULT_ENTRY_FILE: &str = "main.py";
pub const DEFAULT_STARTER_CODE: &str = "# Write your Python code here\nprint('Hello, World!')\n";
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Sandbox session and engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Virtual workspace root folder
    pub root: String,
    /// Entry file created under the root at session start
    pub entry_file: String,
    pub starter_code: String,
    pub history_limit: usize,
    /// Interpreter used by the process engine
    pub python: String,
    pub run_timeout_ms: u64,
    pub install_timeout_ms: u64,
    /// Install target for `pip install`; defaults under the user cache dir
    pub package_dir: Option<PathBuf>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root: DEFAULT_ROOT.to_string(),
            entry_file: DEFAULT_ENTRY_FILE.to_string(),
            starter_code: DEFAULT_STARTER_CODE.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            python: "python3".to_string(),
            run_timeout_ms: 10_000,
            install_timeout_ms: 120_000,
            package_dir: None,
        }
    }
}

impl SandboxConfig {
    /// Load a JSON config file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.root.starts_with('/') || self.root.trim_matches('/').is_empty() {
            bail!("root must be an absolute folder path below '/', got '{}'", self.root);
        }
        if self.entry_file.is_empty() || self.entry_file.contains('/') || self.entry_file.starts_with('.') {
            bail!("entry_file must be a plain file name, got '{}'", self.entry_file);
        }
        if self.history_limit == 0 {
            bail!("history_limit must be at least 1");
        }
        if self.run_timeout_ms == 0 || self.install_timeout_ms == 0 {
            bail!("timeouts must be non-zero");
        }
        Ok(())
    }

    /// Absolute virtual path of the entry file
    pub fn entry_path(&self) -> String {
        crate::path::join(&self.root, &self.entry_file)
    }

    /// Where installed packages live on the host
    pub fn resolved_package_dir(&self) -> PathBuf {
        self.package_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("learn_sandbox")
                .join("site-packages")
        })
    }
}
