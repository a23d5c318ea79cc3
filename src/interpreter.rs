//! Terminal command interpreter.
//!
//! Each submitted line is echoed as a Command line, recorded in history and
//! then dispatched over the closed [`Command`] set. User mistakes surface as
//! a single Error line; nothing here is fatal to the session.

use crate::command::{Command, USAGE};
use crate::error::WorkspaceError;
use crate::path;
use crate::session::Session;
use crate::types::{LineKind, Panel};
use tracing::debug;

/// Shown by `cat` for a file with no content
pub const EMPTY_FILE: &str = "(empty file)";

/// Shown by `ls` for a folder with no children
pub const EMPTY_FOLDER: &str = "(empty folder)";

impl Session {
    /// Execute one line typed into the terminal. Blank input is ignored.
    pub async fn exec_command(&mut self, raw: &str) {
        let line = raw.trim();
        if line.is_empty() {
            return;
        }

        let echo = format!("{} $ {}", self.current_dir, line);
        self.push_line(LineKind::Command, echo);
        self.history.push(line);

        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => {
                self.push_line(LineKind::Error, e.to_string());
                return;
            }
        };
        debug!(verb = command.verb(), "dispatching command");

        match command {
            Command::Help => self.help(),
            Command::Clear => self.clear_transcript(),
            Command::Ls(dir) => self.ls(dir.as_deref()),
            Command::Mkdir(name) => self.mkdir(&name),
            Command::Touch(name) => self.touch(&name),
            Command::Cat(name) => self.cat(&name),
            Command::Rm(name) => self.rm(&name),
            Command::Cd(dir) => self.cd(dir.as_deref()),
            Command::Mv { from, to } => self.mv(&from, &to),
            Command::Python(file) => self.python(file.as_deref()).await,
            Command::PipInstall(package) => self.pip_install(&package).await,
        }
    }

    fn help(&mut self) {
        self.push_line(LineKind::Info, "Available commands:");
        for line in USAGE {
            self.push_line(LineKind::Output, *line);
        }
    }

    fn ls(&mut self, dir: Option<&str>) {
        let target = dir.map_or_else(|| self.current_dir.clone(), |d| self.resolve(d));
        let listing = self.workspace.list(&target).map(|children| {
            children
                .into_iter()
                .map(|child| {
                    if child.is_folder() {
                        format!("{}/", child.name)
                    } else {
                        child.name.clone()
                    }
                })
                .collect::<Vec<_>>()
        });
        let entries = match listing {
            Ok(entries) => entries,
            Err(_) => {
                self.push_line(LineKind::Error, format!("ls: no such folder '{target}'"));
                return;
            }
        };

        if entries.is_empty() {
            self.push_line(LineKind::Output, EMPTY_FOLDER);
        }
        for entry in entries {
            self.push_line(LineKind::Output, entry);
        }
    }

    fn mkdir(&mut self, name: &str) {
        let target = self.resolve(name);
        if self.workspace.is_file(&target) {
            self.push_line(LineKind::Error, format!("mkdir: '{name}' exists and is a file"));
            return;
        }
        if self.workspace.is_folder(&target) {
            self.push_line(LineKind::Info, format!("mkdir: '{name}' already exists"));
            return;
        }
        match self
            .workspace
            .create_folder(&path::dirname(&target), path::basename(&target))
        {
            Ok(_) => self.push_line(LineKind::Output, format!("Created folder '{name}'")),
            Err(e) => self.push_line(LineKind::Error, format!("mkdir: {e}")),
        }
    }

    fn touch(&mut self, name: &str) {
        match self.create_and_open(name) {
            Ok((_, true)) => self.push_line(LineKind::Output, format!("Created file '{name}'")),
            Ok((_, false)) => self.push_line(LineKind::Info, format!("Opened '{name}'")),
            Err(WorkspaceError::NotAFile(_)) => {
                self.push_line(LineKind::Error, format!("touch: '{name}' is a folder"))
            }
            Err(e) => self.push_line(LineKind::Error, format!("touch: {e}")),
        }
    }

    fn cat(&mut self, name: &str) {
        let target = self.resolve(name);
        // The open file is read from the live buffer, not the stored copy.
        let content = if target == self.active_file {
            Some(self.buffer.clone())
        } else {
            self.workspace
                .read(&target)
                .and_then(|node| node.content())
                .map(str::to_string)
        };

        match content {
            Some(text) if text.is_empty() => self.push_line(LineKind::Output, EMPTY_FILE),
            Some(text) => self.push_line(LineKind::Output, text),
            None => self.push_line(LineKind::Error, format!("cat: no such file '{name}'")),
        }
    }

    fn rm(&mut self, name: &str) {
        let target = self.resolve(name);
        if !self.workspace.contains(&target) {
            self.push_line(LineKind::Error, format!("rm: no such file or folder '{name}'"));
            return;
        }
        match self.delete_path(&target) {
            Ok(_) => self.push_line(LineKind::Output, format!("Removed '{name}'")),
            Err(WorkspaceError::Protected(_)) => {
                self.push_line(LineKind::Error, format!("rm: cannot remove '{name}'"))
            }
            Err(e) => self.push_line(LineKind::Error, format!("rm: {e}")),
        }
    }

    fn cd(&mut self, dir: Option<&str>) {
        let target = match dir {
            Some(d) => self.resolve(d),
            None => self.workspace.root().to_string(),
        };
        if !self.workspace.is_folder(&target) {
            self.push_line(LineKind::Error, format!("cd: no such folder '{}'", dir.unwrap_or("~")));
            return;
        }
        self.push_line(LineKind::System, format!("Changed to {target}"));
        self.current_dir = target;
    }

    fn mv(&mut self, from: &str, to: &str) {
        let source = self.resolve(from);
        let dest = self.resolve(to);
        // Moving onto an existing folder drops the node inside it.
        let (parent, name) = if self.workspace.is_folder(&dest) {
            (dest, path::basename(&source).to_string())
        } else {
            (path::dirname(&dest), path::basename(&dest).to_string())
        };

        match self.move_path(&source, &parent, &name) {
            Ok(moved) => self.push_line(LineKind::Output, format!("Moved '{from}' to {moved}")),
            Err(WorkspaceError::Protected(_)) => {
                self.push_line(LineKind::Error, format!("mv: cannot move '{from}'"))
            }
            Err(e) => self.push_line(LineKind::Error, format!("mv: {e}")),
        }
    }

    async fn python(&mut self, file: Option<&str>) {
        if !self.bridge.is_ready() {
            self.push_line(LineKind::Error, "python: Python runtime is not ready yet, please wait...");
            return;
        }
        if self.running {
            self.push_line(LineKind::Error, "python: a program is already running");
            return;
        }

        self.save_buffer();
        let code = match file {
            None => self.buffer.clone(),
            Some(name) => {
                let target = self.resolve(name);
                let stored = self
                    .workspace
                    .read(&target)
                    .and_then(|node| node.content())
                    .map(str::to_string);
                match stored {
                    Some(content) => content,
                    None => {
                        self.push_line(LineKind::Error, format!("python: no such file '{name}'"));
                        return;
                    }
                }
            }
        };

        let request = self.start_run(code);
        self.push_line(LineKind::System, "Running...");
        let bridge = self.bridge.clone();
        let result = bridge.execute(&request).await;

        if !result.stdout.is_empty() {
            self.push_line(LineKind::Output, result.stdout.trim_end_matches('\n'));
        }
        if let Some(stderr) = &result.stderr {
            self.push_line(LineKind::Error, stderr.trim_end_matches('\n'));
        }
        self.complete_run(result);
        self.panel = Panel::Output;
    }

    async fn pip_install(&mut self, package: &str) {
        if !self.bridge.is_ready() {
            self.push_line(LineKind::Error, "pip: Python runtime is not ready yet");
            return;
        }
        self.push_line(LineKind::System, format!("Installing {package}..."));
        let bridge = self.bridge.clone();
        let result = bridge.install_package(package).await;
        match result.stderr {
            Some(error) => self.push_line(LineKind::Error, format!("pip: install failed: {error}")),
            None if result.stdout.is_empty() => {
                self.push_line(LineKind::Output, format!("Installed {package}"))
            }
            None => self.push_line(LineKind::Output, result.stdout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{EngineHandle, ExecutionBridge};
    use crate::config::SandboxConfig;
    use crate::types::TranscriptLine;
    use std::sync::Arc;

    fn session() -> Session {
        let bridge = ExecutionBridge::new(Arc::new(EngineHandle::new()));
        Session::with_starter_code(SandboxConfig::default(), bridge, "print('hi')\n").unwrap()
    }

    /// Lines appended by the most recent command, echo included
    fn last_command(s: &Session) -> &[TranscriptLine] {
        let start = s
            .transcript()
            .iter()
            .rposition(|l| l.kind == LineKind::Command)
            .expect("no command echoed");
        &s.transcript()[start..]
    }

    fn texts(lines: &[TranscriptLine]) -> Vec<(LineKind, &str)> {
        lines.iter().map(|l| (l.kind, l.text.as_str())).collect()
    }

    #[tokio::test]
    async fn echoes_with_current_dir() {
        let mut s = session();
        s.exec_command("  help ").await;
        let lines = last_command(&s);
        assert_eq!(lines[0], TranscriptLine::new(LineKind::Command, "/workspace $ help"));
        assert_eq!(lines[1].kind, LineKind::Info);
        assert_eq!(lines.len(), 2 + USAGE.len());
        assert_eq!(s.history().entries().next(), Some("help"));
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let mut s = session();
        let before = s.transcript().len();
        s.exec_command("   ").await;
        assert_eq!(s.transcript().len(), before);
        assert!(s.history().is_empty());
    }

    #[tokio::test]
    async fn unknown_command_is_recorded_in_history() {
        let mut s = session();
        s.exec_command("vim main.py").await;
        assert_eq!(
            texts(&last_command(&s)[1..]),
            [(LineKind::Error, "unknown command: 'vim' (type help to list commands)")]
        );
        assert_eq!(s.history().entries().next(), Some("vim main.py"));
    }

    #[tokio::test]
    async fn clear_leaves_single_system_line() {
        let mut s = session();
        s.exec_command("ls").await;
        s.exec_command("clear").await;
        assert_eq!(s.transcript().len(), 1);
        assert_eq!(s.transcript()[0].kind, LineKind::System);
    }

    #[tokio::test]
    async fn mkdir_then_ls_shows_folder() {
        let mut s = session();
        s.exec_command("mkdir utils").await;
        assert_eq!(texts(&last_command(&s)[1..]), [(LineKind::Output, "Created folder 'utils'")]);
        s.exec_command("ls").await;
        assert_eq!(
            texts(&last_command(&s)[1..]),
            [(LineKind::Output, "main.py"), (LineKind::Output, "utils/")]
        );
    }

    #[tokio::test]
    async fn ls_empty_folder_then_touch() {
        let mut s = session();
        s.exec_command("mkdir box").await;
        s.exec_command("ls box").await;
        assert_eq!(texts(&last_command(&s)[1..]), [(LineKind::Output, EMPTY_FOLDER)]);
        assert!(s.workspace().list("/workspace/box").unwrap().is_empty());

        s.exec_command("cd box").await;
        s.exec_command("touch x").await;
        let children = s.workspace().list("/workspace/box").unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "x");
    }

    #[tokio::test]
    async fn ls_errors_on_file_or_missing() {
        let mut s = session();
        s.exec_command("ls main.py").await;
        assert_eq!(
            texts(&last_command(&s)[1..]),
            [(LineKind::Error, "ls: no such folder '/workspace/main.py'")]
        );
        s.exec_command("ls nope").await;
        assert_eq!(last_command(&s)[1].kind, LineKind::Error);
    }

    #[tokio::test]
    async fn touch_cat_rm_cat() {
        let mut s = session();
        s.exec_command("touch a.py").await;
        assert_eq!(s.active_file(), "/workspace/a.py");
        assert_eq!(s.buffer(), "");

        s.exec_command("cat a.py").await;
        assert_eq!(texts(&last_command(&s)[1..]), [(LineKind::Output, EMPTY_FILE)]);

        s.exec_command("rm a.py").await;
        assert_eq!(s.active_file(), "/workspace/main.py");

        s.exec_command("cat a.py").await;
        assert_eq!(texts(&last_command(&s)[1..]), [(LineKind::Error, "cat: no such file 'a.py'")]);
    }

    #[tokio::test]
    async fn cat_reads_live_buffer_for_active_file() {
        let mut s = session();
        s.edit_buffer("unsaved = True");
        s.exec_command("cat main.py").await;
        assert_eq!(texts(&last_command(&s)[1..]), [(LineKind::Output, "unsaved = True")]);
    }

    #[tokio::test]
    async fn cat_rejects_folders_and_missing_args() {
        let mut s = session();
        s.exec_command("mkdir d").await;
        s.exec_command("cat d").await;
        assert_eq!(last_command(&s)[1].kind, LineKind::Error);
        s.exec_command("cat").await;
        assert_eq!(texts(&last_command(&s)[1..]), [(LineKind::Error, "cat: missing file name")]);
    }

    #[tokio::test]
    async fn touch_on_folder_errors() {
        let mut s = session();
        s.exec_command("mkdir d").await;
        s.exec_command("touch d").await;
        assert_eq!(texts(&last_command(&s)[1..]), [(LineKind::Error, "touch: 'd' is a folder")]);
        assert_eq!(s.active_file(), "/workspace/main.py");
    }

    #[tokio::test]
    async fn touch_existing_file_opens_its_content() {
        let mut s = session();
        s.exec_command("touch b.py").await;
        s.edit_buffer("B = 2");
        s.exec_command("touch main.py").await;
        s.exec_command("touch b.py").await;
        assert_eq!(s.buffer(), "B = 2");
        assert_eq!(last_command(&s)[1].kind, LineKind::Info);
    }

    #[tokio::test]
    async fn rm_protects_entry_file() {
        let mut s = session();
        s.exec_command("rm main.py").await;
        assert_eq!(texts(&last_command(&s)[1..]), [(LineKind::Error, "rm: cannot remove 'main.py'")]);
        assert!(s.workspace().is_file("/workspace/main.py"));
        s.exec_command("rm ghost.py").await;
        assert_eq!(
            texts(&last_command(&s)[1..]),
            [(LineKind::Error, "rm: no such file or folder 'ghost.py'")]
        );
    }

    #[tokio::test]
    async fn cd_navigation() {
        let mut s = session();
        s.exec_command("mkdir a").await;
        s.exec_command("cd a").await;
        assert_eq!(s.current_dir(), "/workspace/a");
        assert_eq!(texts(&last_command(&s)[1..]), [(LineKind::System, "Changed to /workspace/a")]);
        assert_eq!(last_command(&s)[0].text, "/workspace $ cd a");

        s.exec_command("cd ..").await;
        assert_eq!(s.current_dir(), "/workspace");
        s.exec_command("cd ..").await;
        assert_eq!(s.current_dir(), "/workspace");

        s.exec_command("cd a").await;
        s.exec_command("cd").await;
        assert_eq!(s.current_dir(), "/workspace");

        s.exec_command("cd main.py").await;
        assert_eq!(texts(&last_command(&s)[1..]), [(LineKind::Error, "cd: no such folder 'main.py'")]);
    }

    #[tokio::test]
    async fn mv_renames_and_moves_into_folders() {
        let mut s = session();
        s.exec_command("touch a.py").await;
        s.exec_command("mv a.py b.py").await;
        assert_eq!(s.active_file(), "/workspace/b.py");
        s.exec_command("mkdir lib").await;
        s.exec_command("mv b.py lib").await;
        assert!(s.workspace().is_file("/workspace/lib/b.py"));
        assert_eq!(s.active_file(), "/workspace/lib/b.py");
        s.exec_command("mv main.py x.py").await;
        assert_eq!(texts(&last_command(&s)[1..]), [(LineKind::Error, "mv: cannot move 'main.py'")]);
    }

    #[tokio::test]
    async fn python_and_pip_need_ready_engine() {
        let mut s = session();
        s.exec_command("python").await;
        assert_eq!(
            texts(&last_command(&s)[1..]),
            [(LineKind::Error, "python: Python runtime is not ready yet, please wait...")]
        );
        s.exec_command("pip install numpy").await;
        assert_eq!(texts(&last_command(&s)[1..]), [(LineKind::Error, "pip: Python runtime is not ready yet")]);
    }

    #[tokio::test]
    async fn pip_without_package_is_usage_error() {
        let mut s = session();
        s.exec_command("pip install").await;
        assert_eq!(
            texts(&last_command(&s)[1..]),
            [(LineKind::Error, "pip: usage: pip install <package>")]
        );
    }
}
