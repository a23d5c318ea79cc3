use crate::error::EngineError;
use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

/// Host directory mirroring the virtual workspace for the process engine
pub struct Sandbox {
    working_directory: PathBuf,
}

impl Sandbox {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("learn-sandbox-")
            .tempdir()
            .context("Failed to create sandbox directory")?;

        let working_dir = temp_dir.keep();
        Ok(Self {
            working_directory: working_dir,
        })
    }

    /// Create the host folder backing the virtual root
    pub fn setup(&self, root: &str) -> Result<PathBuf> {
        let dir = self
            .host_path(root)
            .map_err(anyhow::Error::new)
            .context("Invalid workspace root")?;
        std::fs::create_dir_all(&dir).context("Failed to create workspace directory")?;
        Ok(dir)
    }

    /// Map an absolute virtual path onto the sandbox directory.
    /// Paths that would climb out of the sandbox are rejected.
    pub fn host_path(&self, virtual_path: &str) -> Result<PathBuf, EngineError> {
        let mut host = self.working_directory.clone();
        for component in Path::new(virtual_path).components() {
            match component {
                Component::RootDir | Component::CurDir => {}
                Component::Normal(part) => host.push(part),
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(EngineError::Sync {
                        path: virtual_path.to_string(),
                        reason: "path leaves the sandbox".to_string(),
                    })
                }
            }
        }
        Ok(host)
    }

    /// Write a virtual file, creating parent folders as needed
    pub async fn write(&self, virtual_path: &str, content: &str) -> Result<(), EngineError> {
        let host = self.host_path(virtual_path)?;
        let sync_error = |e: std::io::Error| EngineError::Sync {
            path: virtual_path.to_string(),
            reason: e.to_string(),
        };
        if let Some(parent) = host.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(sync_error)?;
        }
        tokio::fs::write(&host, content).await.map_err(sync_error)
    }

    /// Get the working directory path
    pub fn working_dir(&self) -> &Path {
        &self.working_directory
    }

    /// Clean up sandbox resources
    pub fn cleanup(&self) -> Result<()> {
        if self.working_directory.exists() {
            std::fs::remove_dir_all(&self.working_directory)
                .context("Failed to cleanup sandbox directory")?;
        }
        Ok(())
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
