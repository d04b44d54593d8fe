use std::collections::HashMap;

use super::buffer::{BufferId, Position};
use crate::error::{EditorError, Result};

/// Mark storage.
///
/// Lowercase marks (a-z) are buffer-local, keyed by buffer id and letter.
/// Uppercase marks (A-Z) are global and carry the buffer they point into.
#[derive(Debug, Clone, Default)]
pub struct Marks {
    local: HashMap<(BufferId, char), Position>,
    global: HashMap<char, (BufferId, Position)>,
}

impl Marks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid_name(c: char) -> bool {
        c.is_ascii_alphabetic()
    }

    /// Set a mark. The letter's case decides local vs global.
    pub fn set(&mut self, buffer: BufferId, name: char, pos: Position) -> Result<()> {
        if !Self::is_valid_name(name) {
            return Err(EditorError::InvalidMark(name));
        }
        if name.is_ascii_lowercase() {
            self.local.insert((buffer, name), pos);
        } else {
            self.global.insert(name, (buffer, pos));
        }
        Ok(())
    }

    /// Resolve a mark to (buffer, position). Local marks resolve against the
    /// buffer given as context.
    pub fn get(&self, buffer: BufferId, name: char) -> Result<(BufferId, Position)> {
        if !Self::is_valid_name(name) {
            return Err(EditorError::InvalidMark(name));
        }
        if name.is_ascii_lowercase() {
            self.local
                .get(&(buffer, name))
                .map(|&p| (buffer, p))
                .ok_or(EditorError::MarkNotSet(name))
        } else {
            self.global
                .get(&name)
                .copied()
                .ok_or(EditorError::MarkNotSet(name))
        }
    }

    /// Drop all local marks for a buffer (buffer delete / :edit).
    pub fn forget_buffer(&mut self, buffer: BufferId) {
        self.local.retain(|(b, _), _| *b != buffer);
        self.global.retain(|_, (b, _)| *b != buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_marks_are_per_buffer() {
        let mut m = Marks::new();
        m.set(BufferId(1), 'a', Position::new(3, 1)).unwrap();
        m.set(BufferId(2), 'a', Position::new(7, 0)).unwrap();

        assert_eq!(m.get(BufferId(1), 'a').unwrap().1, Position::new(3, 1));
        assert_eq!(m.get(BufferId(2), 'a').unwrap().1, Position::new(7, 0));
    }

    #[test]
    fn test_global_marks_carry_buffer() {
        let mut m = Marks::new();
        m.set(BufferId(5), 'A', Position::new(1, 2)).unwrap();
        assert_eq!(m.get(BufferId(9), 'A').unwrap(), (BufferId(5), Position::new(1, 2)));
    }

    #[test]
    fn test_invalid_and_unset() {
        let mut m = Marks::new();
        assert_eq!(m.set(BufferId(1), '1', Position::default()), Err(EditorError::InvalidMark('1')));
        assert_eq!(m.get(BufferId(1), 'q'), Err(EditorError::MarkNotSet('q')));
    }

    #[test]
    fn test_forget_buffer() {
        let mut m = Marks::new();
        m.set(BufferId(1), 'a', Position::default()).unwrap();
        m.set(BufferId(1), 'B', Position::default()).unwrap();
        m.forget_buffer(BufferId(1));
        assert!(m.get(BufferId(1), 'a').is_err());
        assert!(m.get(BufferId(1), 'B').is_err());
    }
}
