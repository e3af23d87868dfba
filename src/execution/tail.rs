//! Bounded "last N lines" buffer and its rolling terminal view.

use std::{
    collections::VecDeque,
    io::{self, Write},
};

use crossterm::{
    cursor::MoveToPreviousLine,
    queue,
    style::Print,
    terminal::{self, Clear, ClearType},
};
use owo_colors::OwoColorize;

use crate::utils::unicode::truncate_to_width;

#[derive(Debug, Clone)]
pub struct LiveTail {
    lines: VecDeque<String>,
    capacity: usize,
    total: usize,
}

impl LiveTail {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { lines: VecDeque::with_capacity(capacity), capacity, total: 0 }
    }

    pub fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
        self.total += 1;
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines seen in total, including evicted ones.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.lines.iter()
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

/// Redraws the tail in place below the current step header. Disabled views
/// (no TTY) draw nothing.
#[derive(Debug)]
pub struct TailView {
    enabled: bool,
    rendered: u16,
}

impl TailView {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, rendered: 0 }
    }

    pub fn render(&mut self, tail: &LiveTail) {
        if !self.enabled {
            return;
        }
        if self.draw(tail).is_err() {
            // Terminal went away; stop drawing for this command.
            self.enabled = false;
        }
    }

    fn draw(&mut self, tail: &LiveTail) -> io::Result<()> {
        let width = terminal::size().map(|(w, _)| w as usize).unwrap_or(100);
        let mut out = io::stdout().lock();
        self.erase(&mut out)?;
        for line in tail.iter() {
            let text = truncate_to_width(line, width.saturating_sub(4));
            queue!(out, Print(format!("  {} {}\r\n", "│".dimmed(), text.dimmed())))?;
        }
        self.rendered = tail.len() as u16;
        out.flush()
    }

    fn erase(&mut self, out: &mut impl Write) -> io::Result<()> {
        if self.rendered > 0 {
            queue!(out, MoveToPreviousLine(self.rendered), Clear(ClearType::FromCursorDown))?;
            self.rendered = 0;
        }
        Ok(())
    }

    /// Remove the window from the screen.
    pub fn clear(&mut self) {
        if !self.enabled {
            return;
        }
        let mut out = io::stdout().lock();
        if self.erase(&mut out).is_ok() {
            let _ = out.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_keeps_last_n() {
        let mut tail = LiveTail::new(3);
        for i in 0..5 {
            tail.push(format!("line {i}"));
        }
        assert_eq!(tail.snapshot(), vec!["line 2", "line 3", "line 4"]);
        assert_eq!(tail.total(), 5);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut tail = LiveTail::new(0);
        tail.push("a".into());
        tail.push("b".into());
        assert_eq!(tail.snapshot(), vec!["b"]);
    }

    #[test]
    fn test_disabled_view_is_noop() {
        let mut view = TailView::new(false);
        let mut tail = LiveTail::new(2);
        tail.push("x".into());
        view.render(&tail);
        view.clear();
        assert_eq!(view.rendered, 0);
    }
}
