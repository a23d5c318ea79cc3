//! Slash-delimited virtual path helpers.
//!
//! Virtual paths never touch the host filesystem; they are plain strings
//! keyed into the [`Workspace`](crate::workspace::Workspace).

/// Marker for the parent directory.
pub const PARENT: &str = "..";

/// Marker for the current directory.
pub const CURRENT: &str = ".";

/// Last non-empty segment, or the path itself when it has none.
pub fn basename(path: &str) -> &str {
    path.split('/')
        .filter(|s| !s.is_empty())
        .last()
        .unwrap_or(path)
}

/// Path with its last segment removed, always rooted at `/`.
pub fn dirname(path: &str) -> String {
    let mut parts: Vec<&str> = segments(path).collect();
    parts.pop();
    format!("/{}", parts.join("/"))
}

/// Join `name` onto `base` with exactly one separating slash.
pub fn join(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name)
}

/// Resolve a terminal argument against the current directory.
///
/// Absolute tokens are returned verbatim. Relative tokens are walked segment
/// by segment so `..` can never climb above `root`.
pub fn resolve(root: &str, current_dir: &str, token: &str) -> String {
    if token.is_empty() {
        return current_dir.to_string();
    }
    if token.starts_with('/') {
        return token.to_string();
    }

    let floor = segments(root).count();
    let mut parts: Vec<&str> = segments(current_dir).collect();
    for segment in segments(token) {
        match segment {
            CURRENT => {}
            PARENT => {
                if parts.len() > floor {
                    parts.pop();
                }
            }
            name => parts.push(name),
        }
    }
    format!("/{}", parts.join("/"))
}

/// True when `path` equals `ancestor` or lies below it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    let ancestor = ancestor.trim_end_matches('/');
    path == ancestor
        || path
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Re-home `path` from under `from` to under `to`, if it lies within `from`.
pub fn rebase(path: &str, from: &str, to: &str) -> Option<String> {
    if !is_within(path, from) {
        return None;
    }
    let from = from.trim_end_matches('/');
    Some(format!("{}{}", to.trim_end_matches('/'), &path[from.len()..]))
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
