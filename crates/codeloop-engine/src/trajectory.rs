use serde::Serialize;
use std::collections::VecDeque;

/// Bounded history of one artifact's generated contents, oldest first.
///
/// A window of 0 keeps every attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trajectory {
    window: usize,
    attempts: VecDeque<String>,
}

impl Trajectory {
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self {
            window,
            attempts: VecDeque::new(),
        }
    }

    /// Append `content`, evicting the oldest attempt once the window is full.
    pub fn push(&mut self, content: impl Into<String>) {
        self.attempts.push_back(content.into());
        while self.window > 0 && self.attempts.len() > self.window {
            self.attempts.pop_front();
        }
    }

    #[must_use]
    pub fn window(&self) -> usize {
        self.window
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.attempts.iter().map(String::as_str)
    }

    /// Attempts as a list, newest last.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.attempts.iter().cloned().collect()
    }
}
