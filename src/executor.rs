use crate::bridge::{ExecutionEngine, RawOutput};
use crate::config::SandboxConfig;
use crate::error::EngineError;
use crate::sandbox::Sandbox;
use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tracing::debug;

/// Execution engine backed by a local Python interpreter.
///
/// Virtual files are mirrored into a private [`Sandbox`] directory and code
/// runs with the workspace root as its working directory, so relative
/// `open()` calls and sibling imports see the synced files.
pub struct ProcessEngine {
    python: PathBuf,
    sandbox: Sandbox,
    workdir: PathBuf,
    package_dir: PathBuf,
    run_timeout: Duration,
    install_timeout: Duration,
}

impl ProcessEngine {
    /// Locate the interpreter and prepare the sandbox directory
    pub async fn initialize(config: &SandboxConfig) -> Result<Self, EngineError> {
        Self::check_environment(config)
            .await
            .map_err(|e| EngineError::Load(format!("{e:#}")))?;
        let python = which::which(&config.python).map_err(|e| EngineError::Load(e.to_string()))?;
        let sandbox = Sandbox::new().map_err(|e| EngineError::Load(format!("{e:#}")))?;
        let workdir = sandbox
            .setup(&config.root)
            .map_err(|e| EngineError::Load(format!("{e:#}")))?;
        let package_dir = config.resolved_package_dir();
        tokio::fs::create_dir_all(&package_dir)
            .await
            .map_err(|e| EngineError::Load(format!("cannot create package dir: {e}")))?;

        debug!(python = %python.display(), workdir = %workdir.display(), "process engine prepared");
        Ok(Self {
            python,
            sandbox,
            workdir,
            package_dir,
            run_timeout: Duration::from_millis(config.run_timeout_ms),
            install_timeout: Duration::from_millis(config.install_timeout_ms),
        })
    }

    /// Check that the configured interpreter is available
    pub async fn check_environment(config: &SandboxConfig) -> anyhow::Result<()> {
        let python = which::which(&config.python)
            .with_context(|| format!("{} not found. Please install Python 3", config.python))?;
        let output = TokioCommand::new(&python)
            .arg("--version")
            .output()
            .await
            .with_context(|| format!("Failed to execute {}", python.display()))?;
        anyhow::ensure!(output.status.success(), "{} --version failed", python.display());
        Ok(())
    }

    pub fn working_dir(&self) -> &std::path::Path {
        &self.workdir
    }

    fn command(&self) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.python);
        cmd.current_dir(&self.workdir)
            .env("PYTHONPATH", &self.package_dir)
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Spawn, drain both pipes concurrently and enforce the time limit
    async fn capture(&self, mut cmd: TokioCommand, limit: Duration) -> Result<RawOutput, EngineError> {
        let start_time = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| EngineError::Execution(format!("Failed to start process: {e}")))?;

        let mut stdout_opt = child.stdout.take();
        let mut stderr_opt = child.stderr.take();

        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(s) = stdout_opt.as_mut() {
                let _ = s.read_to_end(&mut buf).await;
            }
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(s) = stderr_opt.as_mut() {
                let _ = s.read_to_end(&mut buf).await;
            }
            buf
        });

        let wait_result = tokio::time::timeout(limit, child.wait()).await;
        let elapsed_ms = start_time.elapsed().as_millis() as u64;

        match wait_result {
            Ok(Ok(status)) => {
                let stdout_buf = stdout_task.await.unwrap_or_default();
                let stderr_buf = stderr_task.await.unwrap_or_default();
                debug!(elapsed_ms, code = ?status.code(), "process exited");
                Ok(RawOutput {
                    stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
                    success: status.success(),
                })
            }
            Ok(Err(e)) => Err(EngineError::Execution(format!("Process error: {e}"))),
            Err(_) => {
                let _ = child.kill().await;
                let _ = child.wait().await;
                let _ = stdout_task.await;
                let _ = stderr_task.await;
                debug!(elapsed_ms, "process killed after time limit");
                Err(EngineError::Timeout)
            }
        }
    }
}

#[async_trait]
impl ExecutionEngine for ProcessEngine {
    async fn run(&self, code: &str) -> Result<RawOutput, EngineError> {
        let mut cmd = self.command();
        cmd.arg("-c").arg(code);
        self.capture(cmd, self.run_timeout).await
    }

    async fn install(&self, package: &str) -> Result<String, EngineError> {
        if package.starts_with('-') || package.chars().any(char::is_whitespace) {
            return Err(EngineError::Install(format!("invalid package name '{package}'")));
        }
        let mut cmd = self.command();
        cmd.args(["-m", "pip", "install", "--quiet", "--disable-pip-version-check", "--target"])
            .arg(&self.package_dir)
            .arg(package);
        let raw = self.capture(cmd, self.install_timeout).await?;
        if raw.success {
            Ok(raw.stdout.trim_end().to_string())
        } else {
            Err(EngineError::Install(raw.stderr.trim_end().to_string()))
        }
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), EngineError> {
        self.sandbox.write(path, content).await
    }
}
