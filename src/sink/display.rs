//! Bounded display history, newest line first.

use std::collections::VecDeque;

/// Default number of lines kept for display.
pub const MAX_DISPLAY_ENTRIES: usize = 1000;

/// An ordered list surface that the monitor pushes lines into.
///
/// The monitor never reads back from the surface.
pub trait DisplaySurface {
    /// Insert a line at the top.
    fn insert_head(&mut self, line: String);

    /// Replace the top line, inserting if the surface is empty.
    fn replace_head(&mut self, line: String);
}

/// In-memory display history that evicts the oldest lines on overflow.
#[derive(Debug, Clone)]
pub struct DisplayHistory {
    entries: VecDeque<String>,
    capacity: usize,
}

impl DisplayHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(MAX_DISPLAY_ENTRIES)),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent line.
    pub fn head(&self) -> Option<&str> {
        self.entries.front().map(String::as_str)
    }

    /// Lines from newest to oldest.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl Default for DisplayHistory {
    fn default() -> Self {
        Self::new(MAX_DISPLAY_ENTRIES)
    }
}

impl DisplaySurface for DisplayHistory {
    fn insert_head(&mut self, line: String) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(line);
    }

    fn replace_head(&mut self, line: String) {
        match self.entries.front_mut() {
            Some(head) => *head = line,
            None => self.entries.push_front(line),
        }
    }
}
