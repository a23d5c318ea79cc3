//! Bridge between the sandbox session and an external execution engine.
//!
//! The engine is a black box that can run code, install packages and accept
//! file writes into its own filesystem. [`EngineHandle`] owns the lazily
//! initialized engine and is shared by every session through an `Arc`;
//! [`ExecutionBridge`] wraps it with operations that never fail outward.

use crate::error::EngineError;
use crate::types::ExecutionResult;
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::RwLock;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Fallback stderr text when a program fails without writing to stderr
pub const EXECUTION_FAULT: &str = "Python execution error";

/// Streams captured from one engine run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// Contract of an execution engine
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Execute code, capturing stdout and stderr
    async fn run(&self, code: &str) -> Result<RawOutput, EngineError>;

    /// Install a named package; returns the installer's report
    async fn install(&self, package: &str) -> Result<String, EngineError>;

    /// Write a file into the engine-visible filesystem
    async fn write_file(&self, path: &str, content: &str) -> Result<(), EngineError>;
}

/// Lifecycle of the shared engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    Uninitialized,
    Loading,
    Ready,
    Failed(String),
}

enum EngineState {
    Uninitialized,
    Loading,
    Ready(Arc<dyn ExecutionEngine>),
    Failed(String),
}

/// Process-wide engine slot, initialized once and shared across sessions
pub struct EngineHandle {
    state: RwLock<EngineState>,
    init: Mutex<()>,
}

impl EngineHandle {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(EngineState::Uninitialized),
            init: Mutex::new(()),
        }
    }

    /// A handle whose engine is already available
    pub fn ready(engine: Arc<dyn ExecutionEngine>) -> Self {
        Self {
            state: RwLock::new(EngineState::Ready(engine)),
            init: Mutex::new(()),
        }
    }

    pub fn status(&self) -> EngineStatus {
        match &*self.state.read() {
            EngineState::Uninitialized => EngineStatus::Uninitialized,
            EngineState::Loading => EngineStatus::Loading,
            EngineState::Ready(_) => EngineStatus::Ready,
            EngineState::Failed(message) => EngineStatus::Failed(message.clone()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(&*self.state.read(), EngineState::Ready(_))
    }

    pub fn engine(&self) -> Option<Arc<dyn ExecutionEngine>> {
        match &*self.state.read() {
            EngineState::Ready(engine) => Some(Arc::clone(engine)),
            _ => None,
        }
    }

    /// Run `factory` unless an engine is already loaded. Concurrent callers
    /// wait for the first one; a failed load can be retried.
    pub async fn initialize<F, Fut, E>(&self, factory: F) -> EngineStatus
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<E, EngineError>>,
        E: ExecutionEngine + 'static,
    {
        let _guard = self.init.lock().await;
        if self.is_ready() {
            return EngineStatus::Ready;
        }

        *self.state.write() = EngineState::Loading;
        let start = Instant::now();
        let next = match factory().await {
            Ok(engine) => {
                info!(elapsed_ms = start.elapsed().as_millis() as u64, "execution engine ready");
                EngineState::Ready(Arc::new(engine))
            }
            Err(e) => {
                warn!(error = %e, "execution engine failed to load");
                EngineState::Failed(e.to_string())
            }
        };
        *self.state.write() = next;
        self.status()
    }
}

impl Default for EngineHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle").field("status", &self.status()).finish()
    }
}

/// Snapshot handed to the engine for one run: every file, then the code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub code: String,
    pub files: Vec<(String, String)>,
}

/// Session-side adapter over the shared engine
#[derive(Debug, Clone)]
pub struct ExecutionBridge {
    engine: Arc<EngineHandle>,
}

impl ExecutionBridge {
    pub fn new(engine: Arc<EngineHandle>) -> Self {
        Self { engine }
    }

    pub fn handle(&self) -> &Arc<EngineHandle> {
        &self.engine
    }

    pub fn status(&self) -> EngineStatus {
        self.engine.status()
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_ready()
    }

    /// Run code. Engine problems are reported through `stderr`.
    pub async fn run(&self, code: &str) -> ExecutionResult {
        let Some(engine) = self.engine.engine() else {
            return ExecutionResult::failed(EngineError::NotReady.to_string());
        };

        let start = Instant::now();
        let result = match engine.run(code).await {
            Ok(raw) => capture(raw),
            Err(e) => ExecutionResult::failed(e.to_string()),
        };
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            success = result.is_success(),
            "run finished"
        );
        result
    }

    /// Install a package. Failures are reported through `stderr`.
    pub async fn install_package(&self, name: &str) -> ExecutionResult {
        let Some(engine) = self.engine.engine() else {
            return ExecutionResult::failed(EngineError::NotReady.to_string());
        };

        info!(package = name, "installing package");
        match engine.install(name).await {
            Ok(report) => ExecutionResult { stdout: report, stderr: None },
            Err(e) => {
                warn!(package = name, error = %e, "package install failed");
                ExecutionResult::failed(e.to_string())
            }
        }
    }

    /// Best-effort write into the engine filesystem
    pub async fn sync_file(&self, path: &str, content: &str) {
        let Some(engine) = self.engine.engine() else {
            return;
        };
        if let Err(e) = engine.write_file(path, content).await {
            warn!(path, error = %e, "file sync failed");
        }
    }

    pub async fn sync_files(&self, files: &[(String, String)]) {
        join_all(files.iter().map(|(path, content)| self.sync_file(path, content))).await;
    }

    /// Sync the request's snapshot, then run its code
    pub async fn execute(&self, request: &RunRequest) -> ExecutionResult {
        if !self.is_ready() {
            return ExecutionResult::failed(EngineError::NotReady.to_string());
        }
        self.sync_files(&request.files).await;
        self.run(&request.code).await
    }
}

fn capture(raw: RawOutput) -> ExecutionResult {
    let stderr = if !raw.stderr.is_empty() {
        Some(raw.stderr)
    } else if !raw.success {
        Some(EXECUTION_FAULT.to_string())
    } else {
        None
    };
    ExecutionResult { stdout: raw.stdout, stderr }
}
