//! Pending lines shared between producers and the background writer.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Ordered queue of finalized lines awaiting persistence.
///
/// Appends and drains each hold the lock only briefly; the writer performs
/// I/O on drained lines without holding it.
#[derive(Debug, Default)]
pub struct LogBuffer {
    lines: Mutex<VecDeque<String>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, line: String) {
        self.lock().push_back(line);
    }

    /// Remove and return every pending line in append order.
    pub fn drain_all(&self) -> Vec<String> {
        self.lock().drain(..).collect()
    }

    /// Put lines back at the front, ahead of anything appended since.
    pub fn requeue_front(&self, lines: Vec<String>) {
        let mut pending = self.lock();
        for line in lines.into_iter().rev() {
            pending.push_front(line);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
