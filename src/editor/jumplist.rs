use super::buffer::{BufferId, Position};

/// A location remembered in the jumplist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpLocation {
    pub buffer: BufferId,
    pub pos: Position,
}

/// Ordered history of cursor locations, navigable independently of undo.
///
/// The list grows forward; jumping back moves the index without removing
/// entries, and pushing while not at the tail truncates the forward part
/// first. Consecutive identical locations collapse into one entry.
#[derive(Debug, Clone, Default)]
pub struct JumpList {
    entries: Vec<JumpLocation>,
    /// Index of the *next* slot; entries[index-1] is where we came from.
    index: usize,
    max_entries: usize,
}

impl JumpList {
    pub fn new() -> Self {
        Self { entries: Vec::new(), index: 0, max_entries: 100 }
    }

    /// Record a location before a jump away from it.
    pub fn push(&mut self, loc: JumpLocation) {
        if self.index < self.entries.len() {
            self.entries.truncate(self.index);
        }
        if self.entries.last() == Some(&loc) {
            return;
        }
        self.entries.push(loc);
        if self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
        self.index = self.entries.len();
    }

    /// Step back. `current` is saved so a later forward jump can return.
    pub fn back(&mut self, current: JumpLocation) -> Option<JumpLocation> {
        if self.index == 0 {
            return None;
        }
        // First back-jump from the tail records where we were.
        if self.index == self.entries.len() && self.entries.last() != Some(&current) {
            self.entries.push(current);
        }
        self.index -= 1;
        self.entries.get(self.index).copied()
    }

    pub fn forward(&mut self) -> Option<JumpLocation> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index).copied()
    }
}
