//! Bounded in-game console
//!
//! Rejections and notable actions surface here as short human-readable lines
//! and are mirrored to the `log` facade.

use std::collections::VecDeque;

use serde::Serialize;

use crate::Millis;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsoleLine {
    pub at_ms: Millis,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ConsoleLog {
    max_lines: usize,
    lines: VecDeque<ConsoleLine>,
}

impl ConsoleLog {
    pub fn new(max_lines: usize) -> Self {
        Self {
            max_lines: max_lines.max(1),
            lines: VecDeque::with_capacity(max_lines),
        }
    }

    pub fn push(&mut self, at_ms: Millis, text: impl Into<String>) {
        let text = text.into();
        log::info!("[{:>7}ms] {}", at_ms, text);
        self.lines.push_back(ConsoleLine { at_ms, text });
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &ConsoleLine> {
        self.lines.iter()
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.back().map(|l| l.text.as_str())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
