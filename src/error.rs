use thiserror::Error;

/// Failures of the in-memory workspace store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    #[error("no such file or folder '{0}'")]
    NotFound(String),
    #[error("'{0}' is not a folder")]
    NotAFolder(String),
    #[error("'{0}' is not a file")]
    NotAFile(String),
    #[error("invalid name '{0}'")]
    InvalidName(String),
    #[error("'{0}' already exists")]
    AlreadyExists(String),
    #[error("'{0}' cannot be removed or moved")]
    Protected(String),
    #[error("cannot move '{0}' inside itself")]
    MoveIntoSelf(String),
}

/// Failures reported by an execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Python runtime is not ready yet")]
    NotReady,
    #[error("failed to load Python runtime: {0}")]
    Load(String),
    #[error("{0}")]
    Execution(String),
    #[error("time limit exceeded")]
    Timeout,
    #[error("{0}")]
    Install(String),
    #[error("cannot sync '{path}': {reason}")]
    Sync { path: String, reason: String },
}
