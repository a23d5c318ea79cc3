pub mod bridge;
pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod history;
pub mod interpreter;
pub mod path;
pub mod sandbox;
pub mod session;
pub mod types;
pub mod workspace;

pub use bridge::{EngineHandle, EngineStatus, ExecutionBridge, ExecutionEngine, RawOutput, RunRequest};
pub use command::Command;
pub use config::SandboxConfig;
pub use error::{EngineError, WorkspaceError};
pub use executor::ProcessEngine;
pub use session::{Session, SessionStatus, TerminalKey};
pub use types::*;
pub use workspace::Workspace;
