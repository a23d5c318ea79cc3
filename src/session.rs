use crate::bridge::{EngineStatus, ExecutionBridge, RunRequest};
use crate::config::SandboxConfig;
use crate::error::WorkspaceError;
use crate::history::CommandHistory;
use crate::path;
use crate::types::{ExecutionResult, LineKind, Panel, TranscriptLine, TreeEntry};
use crate::workspace::Workspace;
use anyhow::{Context, Result};
use serde::Serialize;

/// Editor indentation inserted by the Tab key
pub const INDENT: &str = "    ";

/// Keys handled by the terminal input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKey {
    Enter,
    Up,
    Down,
}

/// Toolbar status indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Failed(String),
    Loading,
    Ready,
}

impl SessionStatus {
    pub fn label(&self) -> &str {
        match self {
            SessionStatus::Running => "Running...",
            SessionStatus::Failed(_) => "Failed to load",
            SessionStatus::Loading => "Loading Python...",
            SessionStatus::Ready => "Python ready",
        }
    }
}

/// What the Output panel shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputView<'a> {
    /// Nothing has run yet
    Empty,
    /// The last run finished without printing anything
    Silent,
    Printed { stdout: Option<&'a str>, stderr: Option<&'a str> },
}

/// Serializable view of the whole session for a front-end
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub active_file: String,
    pub current_dir: String,
    pub buffer: String,
    pub tree: Vec<TreeEntry>,
    pub transcript: Vec<TranscriptLine>,
    pub input: String,
    pub panel: Panel,
    pub output: Option<ExecutionResult>,
    pub status: SessionStatus,
    pub file_prompt: Option<String>,
}

/// One sandbox session: workspace, editor, terminal and run state
#[derive(Debug)]
pub struct Session {
    pub(crate) config: SandboxConfig,
    pub(crate) workspace: Workspace,
    pub(crate) bridge: ExecutionBridge,
    pub(crate) active_file: String,
    pub(crate) buffer: String,
    pub(crate) current_dir: String,
    pub(crate) transcript: Vec<TranscriptLine>,
    pub(crate) history: CommandHistory,
    pub(crate) input: String,
    pub(crate) panel: Panel,
    pub(crate) output: Option<ExecutionResult>,
    pub(crate) running: bool,
    pub(crate) file_prompt: Option<String>,
}

impl Session {
    /// Start a session whose entry file holds the configured starter code
    pub fn new(config: SandboxConfig, bridge: ExecutionBridge) -> Result<Self> {
        let starter = config.starter_code.clone();
        Self::with_starter_code(config, bridge, &starter)
    }

    /// Start a session with lesson-provided starter code
    pub fn with_starter_code(config: SandboxConfig, bridge: ExecutionBridge, starter_code: &str) -> Result<Self> {
        config.validate().context("Invalid sandbox config")?;

        let mut workspace = Workspace::new(&config.root);
        let root = workspace.root().to_string();
        let entry = workspace
            .create_file(&root, &config.entry_file)
            .context("Failed to create entry file")?;
        workspace.write_content(&entry, starter_code);

        Ok(Self {
            history: CommandHistory::new(config.history_limit),
            workspace,
            bridge,
            active_file: entry,
            buffer: starter_code.to_string(),
            current_dir: root,
            transcript: welcome_lines(),
            input: String::new(),
            panel: Panel::Terminal,
            output: None,
            running: false,
            file_prompt: None,
            config,
        })
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn bridge(&self) -> &ExecutionBridge {
        &self.bridge
    }

    pub fn active_file(&self) -> &str {
        &self.active_file
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn current_dir(&self) -> &str {
        &self.current_dir
    }

    pub fn transcript(&self) -> &[TranscriptLine] {
        &self.transcript
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn panel(&self) -> Panel {
        self.panel
    }

    pub fn output(&self) -> Option<&ExecutionResult> {
        self.output.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn file_prompt(&self) -> Option<&str> {
        self.file_prompt.as_deref()
    }

    pub fn entry_path(&self) -> String {
        self.config.entry_path()
    }

    /// Resolve a terminal argument against the current directory
    pub fn resolve(&self, token: &str) -> String {
        path::resolve(self.workspace.root(), &self.current_dir, token)
    }

    pub(crate) fn push_line(&mut self, kind: LineKind, text: impl Into<String>) {
        self.transcript.push(TranscriptLine::new(kind, text));
    }

    pub(crate) fn clear_transcript(&mut self) {
        self.transcript = vec![TranscriptLine::new(LineKind::System, "Sandbox terminal cleared")];
    }

    /// Persist the editor buffer into the active file
    pub fn save_buffer(&mut self) {
        self.workspace.write_content(&self.active_file, &self.buffer);
    }

    /// Switch the editor to another file. Folders and unknown paths are ignored.
    pub fn open_file(&mut self, path: &str) -> bool {
        if !self.workspace.is_file(path) {
            return false;
        }
        self.save_buffer();
        self.buffer = self
            .workspace
            .read(path)
            .and_then(|node| node.content())
            .unwrap_or_default()
            .to_string();
        self.active_file = path.to_string();
        true
    }

    pub fn edit_buffer(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
    }

    /// Replace the byte range `start..end` of the buffer with one indent.
    /// Returns the cursor position after the inserted indent.
    pub fn indent_selection(&mut self, start: usize, end: usize) -> usize {
        let start = floor_char_boundary(&self.buffer, start);
        let end = floor_char_boundary(&self.buffer, end.max(start));
        self.buffer.replace_range(start..end, INDENT);
        start + INDENT.len()
    }

    pub fn set_panel(&mut self, panel: Panel) {
        self.panel = panel;
    }

    pub fn toggle_panel(&mut self) {
        self.panel = match self.panel {
            Panel::Terminal => Panel::Output,
            Panel::Output => Panel::Terminal,
        };
    }

    pub fn open_file_prompt(&mut self) {
        self.file_prompt.get_or_insert_with(String::new);
    }

    pub fn set_prompt_text(&mut self, text: impl Into<String>) {
        if let Some(prompt) = self.file_prompt.as_mut() {
            *prompt = text.into();
        }
    }

    pub fn cancel_file_prompt(&mut self) {
        self.file_prompt = None;
    }

    /// Create and open the file named in the prompt. A blank name keeps the
    /// prompt open and does nothing; so does a failed creation.
    pub fn confirm_file_prompt(&mut self) -> Result<Option<String>, WorkspaceError> {
        let Some(name) = self.file_prompt.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(None);
        };
        let name = name.to_string();
        let (path, _) = self.create_and_open(&name)?;
        self.file_prompt = None;
        Ok(Some(path))
    }

    /// Create a file at a terminal-style path and open it in the editor.
    /// Returns the path and whether a new file was created.
    pub(crate) fn create_and_open(&mut self, token: &str) -> Result<(String, bool), WorkspaceError> {
        let target = self.resolve(token);
        if self.workspace.is_folder(&target) {
            return Err(WorkspaceError::NotAFile(target));
        }
        let existed = self.workspace.contains(&target);
        let path = self
            .workspace
            .create_file(&path::dirname(&target), path::basename(&target))?;
        self.open_file(&path);
        Ok((path, !existed))
    }

    /// Delete a file or folder. The entry file and the root are protected;
    /// an active file or current directory inside the removed subtree falls
    /// back to the entry file and the root.
    pub fn delete_path(&mut self, target: &str) -> Result<Vec<String>, WorkspaceError> {
        self.guard_protected(target)?;
        let removed = self.workspace.remove(target)?;

        if path::is_within(&self.active_file, target) {
            let entry = self.entry_path();
            self.buffer = self
                .workspace
                .read(&entry)
                .and_then(|node| node.content())
                .unwrap_or_default()
                .to_string();
            self.active_file = entry;
        }
        if path::is_within(&self.current_dir, target) {
            self.current_dir = self.workspace.root().to_string();
        }
        Ok(removed)
    }

    /// Move or rename a node; the editor and current directory follow it
    pub fn move_path(&mut self, from: &str, to_parent: &str, name: &str) -> Result<String, WorkspaceError> {
        self.guard_protected(from)?;
        self.save_buffer();
        let dest = self.workspace.move_node(from, to_parent, name)?;

        if let Some(active) = path::rebase(&self.active_file, from, &dest) {
            self.active_file = active;
        }
        if let Some(cwd) = path::rebase(&self.current_dir, from, &dest) {
            self.current_dir = cwd;
        }
        Ok(dest)
    }

    fn guard_protected(&self, target: &str) -> Result<(), WorkspaceError> {
        let entry = self.entry_path();
        if target == self.workspace.root() || path::is_within(&entry, target) {
            return Err(WorkspaceError::Protected(target.to_string()));
        }
        Ok(())
    }

    /// Materialize the buffer into the store, mark the session running and
    /// snapshot every file alongside `code`
    pub(crate) fn start_run(&mut self, code: String) -> RunRequest {
        self.save_buffer();
        self.running = true;
        RunRequest { code, files: self.workspace.files() }
    }

    /// Run button: returns the request to execute, or `None` when the engine
    /// is not ready or a run is already outstanding
    pub fn begin_run(&mut self) -> Option<RunRequest> {
        if !self.bridge.is_ready() || self.running {
            return None;
        }
        self.panel = Panel::Output;
        let code = self.buffer.clone();
        Some(self.start_run(code))
    }

    pub fn complete_run(&mut self, result: ExecutionResult) {
        self.running = false;
        self.output = Some(result);
    }

    /// Run the editor buffer through the bridge
    pub async fn run(&mut self) -> Option<ExecutionResult> {
        let request = self.begin_run()?;
        let bridge = self.bridge.clone();
        let result = bridge.execute(&request).await;
        self.complete_run(result.clone());
        Some(result)
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Handle a key on the terminal input line
    pub async fn terminal_key(&mut self, key: TerminalKey) {
        match key {
            TerminalKey::Enter => {
                let line = std::mem::take(&mut self.input);
                self.exec_command(&line).await;
            }
            TerminalKey::Up => self.input = self.history.up(),
            TerminalKey::Down => self.input = self.history.down(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        if self.running {
            return SessionStatus::Running;
        }
        match self.bridge.status() {
            EngineStatus::Failed(message) => SessionStatus::Failed(message),
            EngineStatus::Uninitialized | EngineStatus::Loading => SessionStatus::Loading,
            EngineStatus::Ready => SessionStatus::Ready,
        }
    }

    pub fn output_view(&self) -> OutputView<'_> {
        let Some(result) = &self.output else {
            return OutputView::Empty;
        };
        let stdout = Some(result.stdout.as_str()).filter(|s| !s.is_empty());
        let stderr = result.stderr.as_deref().filter(|s| !s.is_empty());
        if stdout.is_none() && stderr.is_none() {
            return OutputView::Silent;
        }
        OutputView::Printed { stdout, stderr }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            active_file: self.active_file.clone(),
            current_dir: self.current_dir.clone(),
            buffer: self.buffer.clone(),
            tree: self.workspace.tree(),
            transcript: self.transcript.clone(),
            input: self.input.clone(),
            panel: self.panel,
            output: self.output.clone(),
            status: self.status(),
            file_prompt: self.file_prompt.clone(),
        }
    }
}

fn welcome_lines() -> Vec<TranscriptLine> {
    vec![
        TranscriptLine::new(LineKind::System, "Sandbox terminal, type help to list commands"),
        TranscriptLine::new(LineKind::System, "Use \"pip install <package>\" to install a library"),
    ]
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut index = index.min(s.len());
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::EngineHandle;
    use std::sync::Arc;

    fn session() -> Session {
        let bridge = ExecutionBridge::new(Arc::new(EngineHandle::new()));
        Session::with_starter_code(SandboxConfig::default(), bridge, "print('hi')\n").unwrap()
    }

    #[test]
    fn starts_with_entry_file_open() {
        let s = session();
        assert_eq!(s.active_file(), "/workspace/main.py");
        assert_eq!(s.current_dir(), "/workspace");
        assert_eq!(s.buffer(), "print('hi')\n");
        assert_eq!(s.transcript().len(), 2);
        assert_eq!(s.status(), SessionStatus::Loading);
    }

    #[test]
    fn open_file_persists_previous_buffer() {
        let mut s = session();
        let (other, created) = s.create_and_open("other.py").unwrap();
        assert!(created);
        s.edit_buffer("x = 2");
        assert!(s.open_file("/workspace/main.py"));
        assert_eq!(s.workspace().read(&other).unwrap().content(), Some("x = 2"));
        assert_eq!(s.buffer(), "print('hi')\n");
    }

    #[test]
    fn edit_buffer_does_not_touch_store() {
        let mut s = session();
        s.edit_buffer("changed");
        assert_eq!(s.workspace().read("/workspace/main.py").unwrap().content(), Some("print('hi')\n"));
    }

    #[test]
    fn open_file_ignores_folders() {
        let mut s = session();
        assert!(!s.open_file("/workspace"));
        assert_eq!(s.active_file(), "/workspace/main.py");
    }

    #[test]
    fn indent_replaces_selection() {
        let mut s = session();
        s.edit_buffer("ab");
        assert_eq!(s.indent_selection(1, 1), 5);
        assert_eq!(s.buffer(), "a    b");
        assert_eq!(s.indent_selection(0, 5), 4);
        assert_eq!(s.buffer(), "    b");
        s.edit_buffer("é");
        assert_eq!(s.indent_selection(1, 1), 4);
        assert_eq!(s.buffer(), "    é");
    }

    #[test]
    fn file_prompt_flow() {
        let mut s = session();
        s.open_file_prompt();
        s.set_prompt_text("   ");
        assert_eq!(s.confirm_file_prompt(), Ok(None));
        assert_eq!(s.file_prompt(), Some("   "));

        s.set_prompt_text(" notes.py ");
        assert_eq!(s.confirm_file_prompt(), Ok(Some("/workspace/notes.py".into())));
        assert_eq!(s.file_prompt(), None);
        assert_eq!(s.active_file(), "/workspace/notes.py");
        assert_eq!(s.buffer(), "");

        s.open_file_prompt();
        s.cancel_file_prompt();
        assert_eq!(s.file_prompt(), None);
    }

    #[test]
    fn deleting_active_file_falls_back_to_entry() {
        let mut s = session();
        s.create_and_open("tmp.py").unwrap();
        s.delete_path("/workspace/tmp.py").unwrap();
        assert_eq!(s.active_file(), "/workspace/main.py");
        assert!(s.workspace().is_file(s.active_file()));
        assert_eq!(s.buffer(), "print('hi')\n");
    }

    #[test]
    fn deleting_folder_with_cwd_resets_cwd() {
        let mut s = session();
        s.workspace.create_folder("/workspace", "pkg").unwrap();
        s.current_dir = "/workspace/pkg".into();
        s.create_and_open("mod.py").unwrap();
        s.delete_path("/workspace/pkg").unwrap();
        assert_eq!(s.current_dir(), "/workspace");
        assert_eq!(s.active_file(), "/workspace/main.py");
    }

    #[test]
    fn entry_and_root_are_protected() {
        let mut s = session();
        assert!(matches!(s.delete_path("/workspace/main.py"), Err(WorkspaceError::Protected(_))));
        assert!(matches!(s.delete_path("/workspace"), Err(WorkspaceError::Protected(_))));
        assert!(matches!(s.move_path("/workspace/main.py", "/workspace", "x.py"), Err(WorkspaceError::Protected(_))));
    }

    #[test]
    fn move_keeps_active_file_open() {
        let mut s = session();
        s.create_and_open("a.py").unwrap();
        s.edit_buffer("A = 1");
        s.move_path("/workspace/a.py", "/workspace", "b.py").unwrap();
        assert_eq!(s.active_file(), "/workspace/b.py");
        assert_eq!(s.workspace().read("/workspace/b.py").unwrap().content(), Some("A = 1"));
    }

    #[test]
    fn begin_run_requires_ready_engine() {
        let mut s = session();
        assert!(s.begin_run().is_none());
        assert!(!s.is_running());
        assert_eq!(s.output_view(), OutputView::Empty);
    }

    #[test]
    fn panel_toggles() {
        let mut s = session();
        assert_eq!(s.panel(), Panel::Terminal);
        s.toggle_panel();
        assert_eq!(s.panel(), Panel::Output);
        s.set_panel(Panel::Terminal);
        assert_eq!(s.panel(), Panel::Terminal);
    }

    #[test]
    fn output_view_distinguishes_silent_runs() {
        let mut s = session();
        s.complete_run(ExecutionResult::default());
        assert_eq!(s.output_view(), OutputView::Silent);
        s.complete_run(ExecutionResult { stdout: "1\n".into(), stderr: None });
        assert_eq!(s.output_view(), OutputView::Printed { stdout: Some("1\n"), stderr: None });
    }

    #[test]
    fn snapshot_serializes() {
        let s = session();
        let json = serde_json::to_value(s.snapshot()).unwrap();
        assert_eq!(json["active_file"], "/workspace/main.py");
        assert_eq!(json["status"]["state"], "loading");
        assert_eq!(json["tree"][0]["name"], "main.py");
    }
}
