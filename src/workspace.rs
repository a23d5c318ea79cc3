use crate::error::WorkspaceError;
use crate::path;
use crate::types::{NodeKind, TreeEntry, VirtualNode};
use std::collections::HashMap;

/// In-memory file tree owned by a single sandbox session
#[derive(Debug, Clone)]
pub struct Workspace {
    root: String,
    nodes: HashMap<String, VirtualNode>,
}

impl Workspace {
    /// Create a workspace holding only its root folder
    pub fn new(root: &str) -> Self {
        let root = root.trim_end_matches('/').to_string();
        let mut nodes = HashMap::new();
        nodes.insert(
            root.clone(),
            VirtualNode::folder(root.clone(), path::basename(&root).to_string()),
        );
        Self { root, nodes }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn read(&self, path: &str) -> Option<&VirtualNode> {
        self.nodes.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn is_file(&self, path: &str) -> bool {
        self.read(path).is_some_and(VirtualNode::is_file)
    }

    pub fn is_folder(&self, path: &str) -> bool {
        self.read(path).is_some_and(VirtualNode::is_folder)
    }

    /// Create an empty file; an existing path is returned untouched
    pub fn create_file(&mut self, parent: &str, name: &str) -> Result<String, WorkspaceError> {
        self.insert(parent, name, |path, name| VirtualNode::file(path, name, String::new()))
    }

    /// Create an empty folder; an existing path is returned untouched
    pub fn create_folder(&mut self, parent: &str, name: &str) -> Result<String, WorkspaceError> {
        self.insert(parent, name, VirtualNode::folder)
    }

    /// Replace a file's content. Returns false when `path` is not a file.
    pub fn write_content(&mut self, path: &str, text: &str) -> bool {
        match self.nodes.get_mut(path) {
            Some(VirtualNode { kind: NodeKind::File { content }, .. }) => {
                content.clear();
                content.push_str(text);
                true
            }
            _ => false,
        }
    }

    /// Delete a node and everything below it. Returns the erased paths.
    pub fn remove(&mut self, path: &str) -> Result<Vec<String>, WorkspaceError> {
        if path == self.root {
            return Err(WorkspaceError::Protected(path.to_string()));
        }
        if !self.nodes.contains_key(path) {
            return Err(WorkspaceError::NotFound(path.to_string()));
        }

        let removed = self.subtree(path);
        for p in &removed {
            self.nodes.remove(p);
        }
        let parent = path::dirname(path);
        if let Some(VirtualNode { kind: NodeKind::Folder { children }, .. }) = self.nodes.get_mut(&parent) {
            children.retain(|c| c != path);
        }
        Ok(removed)
    }

    /// Children of a folder, in creation order
    pub fn list(&self, path: &str) -> Result<Vec<&VirtualNode>, WorkspaceError> {
        let node = self
            .nodes
            .get(path)
            .ok_or_else(|| WorkspaceError::NotFound(path.to_string()))?;
        match &node.kind {
            NodeKind::Folder { children } => Ok(children.iter().filter_map(|c| self.nodes.get(c)).collect()),
            NodeKind::File { .. } => Err(WorkspaceError::NotAFolder(path.to_string())),
        }
    }

    /// Move a node by deleting it and recreating its subtree under `to_parent/name`
    pub fn move_node(&mut self, from: &str, to_parent: &str, name: &str) -> Result<String, WorkspaceError> {
        if from == self.root {
            return Err(WorkspaceError::Protected(from.to_string()));
        }
        if !self.nodes.contains_key(from) {
            return Err(WorkspaceError::NotFound(from.to_string()));
        }
        validate_name(name)?;
        match self.nodes.get(to_parent) {
            None => return Err(WorkspaceError::NotFound(to_parent.to_string())),
            Some(node) if !node.is_folder() => return Err(WorkspaceError::NotAFolder(to_parent.to_string())),
            Some(_) => {}
        }
        let dest = path::join(to_parent, name);
        if self.nodes.contains_key(&dest) {
            return Err(WorkspaceError::AlreadyExists(dest));
        }
        if path::is_within(to_parent, from) {
            return Err(WorkspaceError::MoveIntoSelf(from.to_string()));
        }

        // Pre-order snapshot: parents are recreated before their children.
        let moved: Vec<VirtualNode> = self
            .subtree(from)
            .iter()
            .filter_map(|p| self.nodes.get(p).cloned())
            .collect();
        self.remove(from)?;

        for node in moved {
            let Some(target) = path::rebase(&node.path, from, &dest) else {
                continue;
            };
            let parent = path::dirname(&target);
            let leaf = path::basename(&target).to_string();
            match node.kind {
                NodeKind::File { content } => {
                    let created = self.create_file(&parent, &leaf)?;
                    self.write_content(&created, &content);
                }
                NodeKind::Folder { .. } => {
                    self.create_folder(&parent, &leaf)?;
                }
            }
        }
        Ok(dest)
    }

    /// Depth-first rows for the file tree panel; the root itself is hidden
    pub fn tree(&self) -> Vec<TreeEntry> {
        let mut rows = Vec::new();
        if let Some(root) = self.nodes.get(&self.root) {
            for child in root.children() {
                self.collect_tree(child, 0, &mut rows);
            }
        }
        rows
    }

    /// Every file with its stored content, in tree order
    pub fn files(&self) -> Vec<(String, String)> {
        self.subtree(&self.root)
            .into_iter()
            .filter_map(|p| {
                let content = self.nodes.get(&p)?.content()?.to_string();
                Some((p, content))
            })
            .collect()
    }

    fn collect_tree(&self, path: &str, depth: usize, rows: &mut Vec<TreeEntry>) {
        let Some(node) = self.nodes.get(path) else {
            return;
        };
        rows.push(TreeEntry {
            depth,
            name: node.name.clone(),
            path: node.path.clone(),
            is_folder: node.is_folder(),
        });
        for child in node.children() {
            self.collect_tree(child, depth + 1, rows);
        }
    }

    fn insert<F>(&mut self, parent: &str, name: &str, make: F) -> Result<String, WorkspaceError>
    where
        F: FnOnce(String, String) -> VirtualNode,
    {
        validate_name(name)?;
        let path = path::join(parent, name);
        if self.nodes.contains_key(&path) {
            return Ok(path);
        }
        match self.nodes.get_mut(parent) {
            Some(VirtualNode { kind: NodeKind::Folder { children }, .. }) => children.push(path.clone()),
            Some(_) => return Err(WorkspaceError::NotAFolder(parent.to_string())),
            None => return Err(WorkspaceError::NotFound(parent.to_string())),
        }
        self.nodes.insert(path.clone(), make(path.clone(), name.to_string()));
        Ok(path)
    }

    fn subtree(&self, path: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack = vec![path.to_string()];
        while let Some(p) = stack.pop() {
            if let Some(node) = self.nodes.get(&p) {
                stack.extend(node.children().iter().rev().cloned());
                out.push(p);
            }
        }
        out
    }
}

fn validate_name(name: &str) -> Result<(), WorkspaceError> {
    if name.is_empty() || name.contains('/') || name == path::CURRENT || name == path::PARENT {
        return Err(WorkspaceError::InvalidName(name.to_string()));
    }
    Ok(())
}
