use std::collections::VecDeque;

/// Bounded terminal command history, most recent first, with an up/down cursor
#[derive(Debug, Clone)]
pub struct CommandHistory {
    entries: VecDeque<String>,
    limit: usize,
    cursor: Option<usize>,
}

impl CommandHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit),
            limit: limit.max(1),
            cursor: None,
        }
    }

    /// Record a submitted line and reset navigation
    pub fn push(&mut self, line: &str) {
        self.entries.push_front(line.to_string());
        self.entries.truncate(self.limit);
        self.cursor = None;
    }

    /// Step toward older entries, clamped at the oldest
    pub fn up(&mut self) -> String {
        if self.entries.is_empty() {
            self.cursor = None;
            return String::new();
        }
        let next = match self.cursor {
            None => 0,
            Some(i) => (i + 1).min(self.entries.len() - 1),
        };
        self.cursor = Some(next);
        self.entries[next].clone()
    }

    /// Step toward newer entries; past the newest the input line is empty
    pub fn down(&mut self) -> String {
        match self.cursor {
            None | Some(0) => {
                self.cursor = None;
                String::new()
            }
            Some(i) => {
                self.cursor = Some(i - 1);
                self.entries[i - 1].clone()
            }
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
