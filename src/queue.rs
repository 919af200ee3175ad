//! Newest-first failure queue with a wrapping cursor.
//!
//! The cursor is 1-based and only meaningful while the queue is non-empty:
//! `1 <= cursor <= len` whenever `len > 0`. Pushing shifts every entry back by
//! one, so the cursor moves with them and keeps pointing at the failure the
//! viewer was looking at.

use crate::failure::CapturedFailure;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct ErrorQueue {
    items: VecDeque<CapturedFailure>,
    /// 0 while the queue is empty
    cursor: usize,
}

impl ErrorQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the front.
    pub fn push(&mut self, failure: CapturedFailure) {
        self.items.push_front(failure);
        self.cursor = if self.cursor == 0 { 1 } else { self.cursor + 1 };
        debug_assert!(self.cursor <= self.items.len());
    }

    /// Failure under the cursor.
    pub fn current(&self) -> Option<&CapturedFailure> {
        self.cursor.checked_sub(1).and_then(|i| self.items.get(i))
    }

    /// 1-based cursor, `None` while empty.
    pub fn cursor(&self) -> Option<usize> {
        (self.cursor > 0).then_some(self.cursor)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Move toward the newest failure, wrapping from 1 to `len`.
    pub fn go_prev(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.cursor = if self.cursor <= 1 {
            self.items.len()
        } else {
            self.cursor - 1
        };
    }

    /// Move toward the oldest failure, wrapping from `len` to 1.
    pub fn go_next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.cursor = if self.cursor >= self.items.len() {
            1
        } else {
            self.cursor + 1
        };
    }

    pub fn reset(&mut self) {
        self.items.clear();
        self.cursor = 0;
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &CapturedFailure> {
        self.items.iter()
    }
}
