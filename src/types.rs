use serde::{Deserialize, Serialize};

/// One file or folder in the virtual workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualNode {
    pub name: String,
    pub path: String,
    pub kind: NodeKind,
}

/// File content or folder children (child paths, creation order)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    File { content: String },
    Folder { children: Vec<String> },
}

impl VirtualNode {
    pub fn file(path: String, name: String, content: String) -> Self {
        Self { name, path, kind: NodeKind::File { content } }
    }

    pub fn folder(path: String, name: String) -> Self {
        Self { name, path, kind: NodeKind::Folder { children: Vec::new() } }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { content } => Some(content),
            NodeKind::Folder { .. } => None,
        }
    }

    pub fn children(&self) -> &[String] {
        match &self.kind {
            NodeKind::Folder { children } => children,
            NodeKind::File { .. } => &[],
        }
    }
}

/// Terminal line categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Command,
    Output,
    Error,
    Info,
    System,
}

/// One record of the terminal transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub kind: LineKind,
    pub text: String,
}

impl TranscriptLine {
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into() }
    }
}

/// Captured output of one run or install request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: Option<String>,
}

impl ExecutionResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self { stdout: String::new(), stderr: Some(message.into()) }
    }

    pub fn is_success(&self) -> bool {
        self.stderr.is_none()
    }
}

/// Bottom panel focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
    #[default]
    Terminal,
    Output,
}

/// One row of the file tree panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub depth: usize,
    pub name: String,
    pub path: String,
    pub is_folder: bool,
}
