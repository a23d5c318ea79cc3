use async_trait::async_trait;
use learn_sandbox::{
    EngineError, EngineHandle, ExecutionBridge, ExecutionEngine, RawOutput, SandboxConfig, Session,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Tiny line-oriented stand-in for a Python runtime.
///
/// `print('x')` writes `x\n`, `show <path>` prints a synced file, and
/// `raise <msg>` aborts with `<msg>` on stderr.
#[derive(Default)]
pub struct ScriptedEngine {
    pub files: Mutex<HashMap<String, String>>,
    pub runs: AtomicUsize,
    pub installs: Mutex<Vec<String>>,
}

#[async_trait]
impl ExecutionEngine for ScriptedEngine {
    async fn run(&self, code: &str) -> Result<RawOutput, EngineError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let mut stdout = String::new();
        for line in code.lines().map(str::trim) {
            if let Some(message) = line.strip_prefix("raise ") {
                return Ok(RawOutput { stdout, stderr: message.to_string(), success: false });
            }
            if let Some(path) = line.strip_prefix("show ") {
                let content = self.files.lock().get(path).cloned().unwrap_or_default();
                stdout.push_str(&content);
                stdout.push('\n');
                continue;
            }
            let text = line
                .strip_prefix("print('")
                .or_else(|| line.strip_prefix("print(\""))
                .and_then(|rest| rest.strip_suffix("')").or_else(|| rest.strip_suffix("\")")));
            if let Some(text) = text {
                stdout.push_str(text);
                stdout.push('\n');
            }
        }
        Ok(RawOutput { stdout, stderr: String::new(), success: true })
    }

    async fn install(&self, package: &str) -> Result<String, EngineError> {
        self.installs.lock().push(package.to_string());
        if package == "not-a-package" {
            return Err(EngineError::Install("No matching distribution found".into()));
        }
        Ok(String::new())
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), EngineError> {
        self.files.lock().insert(path.to_string(), content.to_string());
        Ok(())
    }
}

pub fn ready_session(starter: &str) -> (Session, Arc<ScriptedEngine>) {
    let engine = Arc::new(ScriptedEngine::default());
    let handle = Arc::new(EngineHandle::ready(engine.clone()));
    let session = Session::with_starter_code(SandboxConfig::default(), ExecutionBridge::new(handle), starter)
        .expect("default config is valid");
    (session, engine)
}
