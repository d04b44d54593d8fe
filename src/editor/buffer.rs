use ropey::Rope;
use std::path::{Path, PathBuf};

use crate::error::{EditorError, Result};

/// Identity of a buffer within the session. Buffers are addressed by id
/// through the session's lookup tables, never by pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// A (line, col) position in character units (not bytes, not display cells).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// What a buffer holds. Non-file buffers default to read-only content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    File,
    Intro,
    Help,
    Quickfix,
    LocationList,
}

/// A text buffer backed by a rope data structure.
///
/// Undo is snapshot based: rope clones are cheap (structurally shared), so
/// each undo entry is a full pre-mutation copy of the text. Mutations made
/// inside a change group collapse into a single undo entry.
pub struct Buffer {
    pub id: BufferId,
    text: Rope,
    /// File path (None for scratch/intro buffers)
    pub path: Option<PathBuf>,
    pub kind: BufferKind,
    /// Whether the buffer has unsaved changes
    pub modified: bool,
    /// Refuses writes to disk
    pub readonly: bool,
    /// Refuses any mutation
    pub modifiable: bool,
    undo_stack: Vec<Rope>,
    redo_stack: Vec<Rope>,
    /// Nesting depth of open change groups
    group_depth: usize,
    /// Snapshot taken at the first mutation inside the outermost group
    group_snapshot: Option<Rope>,
}

impl Buffer {
    /// Create a new empty buffer
    pub fn new(id: BufferId) -> Self {
        Self {
            id,
            text: Rope::new(),
            path: None,
            kind: BufferKind::File,
            modified: false,
            readonly: false,
            modifiable: true,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            group_depth: 0,
            group_snapshot: None,
        }
    }

    /// Create a scratch buffer of the given kind with fixed content.
    /// Scratch buffers start read-only and not modifiable.
    pub fn scratch(id: BufferId, kind: BufferKind, content: &str) -> Self {
        let mut buf = Self::new(id);
        buf.kind = kind;
        buf.text = Rope::from_str(content);
        buf.readonly = true;
        buf.modifiable = false;
        buf
    }

    /// Create a buffer from a file. Invalid byte sequences are substituted
    /// rather than failing; a missing file yields an empty buffer.
    pub fn from_file(id: BufferId, path: PathBuf) -> anyhow::Result<Self> {
        let text = if path.exists() {
            let bytes = std::fs::read(&path)?;
            Rope::from_str(&String::from_utf8_lossy(&bytes))
        } else {
            Rope::new()
        };

        let mut buf = Self::new(id);
        buf.text = text;
        buf.path = Some(path);
        Ok(buf)
    }

    /// Save buffer to the given path, or its own path if None.
    pub fn write_to(&mut self, path: Option<&Path>) -> Result<()> {
        if self.readonly {
            return Err(EditorError::ReadOnly);
        }
        let target = path
            .map(Path::to_path_buf)
            .or_else(|| self.path.clone())
            .ok_or(EditorError::NoFileName)?;

        let mut out = String::with_capacity(self.text.len_chars());
        for chunk in self.text.chunks() {
            out.push_str(chunk);
        }
        std::fs::write(&target, out).map_err(|e| EditorError::NotFound(e.to_string()))?;
        if self.path.is_none() {
            self.path = Some(target);
        }
        self.modified = false;
        Ok(())
    }

    /// Re-read the buffer's file from disk, discarding edits and history.
    pub fn reload_from_file(&mut self) -> Result<()> {
        let path = self.path.clone().ok_or(EditorError::NoFileName)?;
        let bytes =
            std::fs::read(&path).map_err(|e| EditorError::NotFound(e.to_string()))?;
        self.text = Rope::from_str(&String::from_utf8_lossy(&bytes));
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.group_depth = 0;
        self.group_snapshot = None;
        self.modified = false;
        Ok(())
    }

    pub fn display_name(&self) -> String {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(String::from)
            .unwrap_or_else(|| "[No Name]".to_string())
    }

    // --- read-only access ---

    /// Total number of lines. The rope counts the empty segment after a
    /// trailing newline as a line of its own; that segment is not addressable
    /// text, so it is excluded here. A buffer still never has fewer than one
    /// line.
    pub fn len_lines(&self) -> usize {
        let n = self.text.len_lines();
        if n > 1 && self.text.char(self.text.len_chars() - 1) == '\n' {
            n - 1
        } else {
            n
        }
    }

    pub fn len_chars(&self) -> usize {
        self.text.len_chars()
    }

    pub fn line(&self, idx: usize) -> Option<ropey::RopeSlice<'_>> {
        if idx < self.len_lines() {
            Some(self.text.line(idx))
        } else {
            None
        }
    }

    /// Length of a line in chars, excluding the trailing newline.
    pub fn line_len(&self, idx: usize) -> usize {
        self.line(idx)
            .map(|l| {
                let len = l.len_chars();
                if len > 0 && l.char(len - 1) == '\n' {
                    len - 1
                } else {
                    len
                }
            })
            .unwrap_or(0)
    }

    /// Line content as a String, without the trailing newline.
    pub fn line_text(&self, idx: usize) -> String {
        self.line(idx)
            .map(|l| {
                let mut s = l.to_string();
                if s.ends_with('\n') {
                    s.pop();
                }
                s
            })
            .unwrap_or_default()
    }

    pub fn char_at(&self, pos: Position) -> Option<char> {
        if pos.line >= self.text.len_lines() {
            return None;
        }
        if pos.col >= self.line(pos.line).map(|l| l.len_chars()).unwrap_or(0) {
            return None;
        }
        let idx = self.pos_to_char(pos);
        if idx < self.text.len_chars() {
            Some(self.text.char(idx))
        } else {
            None
        }
    }

    pub fn content(&self) -> String {
        self.text.to_string()
    }

    fn pos_to_char(&self, pos: Position) -> usize {
        let line = pos.line.min(self.text.len_lines().saturating_sub(1));
        self.text.line_to_char(line) + pos.col
    }

    /// Text of the span between two positions, end-exclusive. Reversed spans
    /// are normalized so callers may pass the endpoints in either order.
    pub fn span_text(&self, a: Position, b: Position) -> String {
        let (start, end) = normalize(a, b);
        let s = self.pos_to_char(start).min(self.text.len_chars());
        let e = self.pos_to_char(end).min(self.text.len_chars());
        if s < e {
            self.text.slice(s..e).to_string()
        } else {
            String::new()
        }
    }

    // --- change groups ---

    /// Open a change group. Groups nest; only the outermost close pushes an
    /// undo entry.
    pub fn begin_change_group(&mut self) {
        self.group_depth += 1;
    }

    /// Close one level of change group. Closing the outermost level commits
    /// the accumulated before-snapshot as a single undo entry.
    pub fn end_change_group(&mut self) {
        if self.group_depth == 0 {
            return;
        }
        self.group_depth -= 1;
        if self.group_depth == 0 {
            if let Some(snapshot) = self.group_snapshot.take() {
                self.undo_stack.push(snapshot);
                self.redo_stack.clear();
            }
        }
    }

    fn force_close_groups(&mut self) {
        while self.group_depth > 0 {
            self.end_change_group();
        }
    }

    /// Every mutation funnels through here: asserts modifiability and records
    /// the pre-mutation snapshot (once per open change group).
    fn prepare_edit(&mut self) -> Result<()> {
        if !self.modifiable {
            return Err(EditorError::NotModifiable);
        }
        if self.group_depth > 0 {
            if self.group_snapshot.is_none() {
                self.group_snapshot = Some(self.text.clone());
            }
        } else {
            self.undo_stack.push(self.text.clone());
            self.redo_stack.clear();
        }
        self.modified = true;
        Ok(())
    }

    // --- mutation ---

    pub fn insert_char(&mut self, pos: Position, ch: char) -> Result<()> {
        self.prepare_edit()?;
        let idx = self.pos_to_char(pos);
        self.text.insert_char(idx, ch);
        Ok(())
    }

    pub fn insert_text(&mut self, pos: Position, s: &str) -> Result<()> {
        self.prepare_edit()?;
        let idx = self.pos_to_char(pos);
        self.text.insert(idx, s);
        Ok(())
    }

    pub fn insert_newline(&mut self, pos: Position) -> Result<()> {
        self.insert_char(pos, '\n')
    }

    /// Delete the character before `pos`, joining with the previous line when
    /// at column zero. Returns the resulting cursor position, or None when at
    /// the very start of the buffer.
    pub fn backspace(&mut self, pos: Position) -> Result<Option<Position>> {
        if pos.col == 0 {
            if pos.line == 0 {
                return Ok(None);
            }
            let new_col = self.line_len(pos.line - 1);
            self.prepare_edit()?;
            let idx = self.pos_to_char(Position::new(pos.line, 0));
            self.text.remove(idx - 1..idx);
            Ok(Some(Position::new(pos.line - 1, new_col)))
        } else {
            self.prepare_edit()?;
            let idx = self.pos_to_char(pos);
            self.text.remove(idx - 1..idx);
            Ok(Some(Position::new(pos.line, pos.col - 1)))
        }
    }

    /// Delete the character under `pos`, if any.
    pub fn delete_char(&mut self, pos: Position) -> Result<()> {
        if pos.col >= self.line_len(pos.line) {
            return Ok(());
        }
        self.prepare_edit()?;
        let idx = self.pos_to_char(pos);
        self.text.remove(idx..idx + 1);
        Ok(())
    }

    /// Delete a whole line including its newline. Deleting the last remaining
    /// line leaves one empty line (the buffer never goes away).
    pub fn delete_line(&mut self, line: usize) -> Result<()> {
        if line >= self.len_lines() {
            return Ok(());
        }
        self.prepare_edit()?;
        let mut start = self.text.line_to_char(line);
        let end = if line + 1 < self.text.len_lines() {
            self.text.line_to_char(line + 1)
        } else {
            self.text.len_chars()
        };
        // last line: also eat the newline that terminated the previous one
        if line + 1 >= self.text.len_lines() && start > 0 {
            start -= 1;
        }
        self.text.remove(start..end);
        Ok(())
    }

    /// Delete the span between two positions (end-exclusive, normalized).
    pub fn delete_span(&mut self, a: Position, b: Position) -> Result<()> {
        let (start, end) = normalize(a, b);
        let s = self.pos_to_char(start).min(self.text.len_chars());
        let e = self.pos_to_char(end).min(self.text.len_chars());
        if s >= e {
            return Ok(());
        }
        self.prepare_edit()?;
        self.text.remove(s..e);
        Ok(())
    }

    /// Replace the entire content with the given lines.
    pub fn replace_all_lines(&mut self, lines: Vec<String>) -> Result<()> {
        self.prepare_edit()?;
        let mut joined = lines.join("\n");
        joined.push('\n');
        self.text = Rope::from_str(&joined);
        Ok(())
    }

    // --- undo/redo ---

    /// Swap current content with the top of the undo stack. Any open change
    /// group is force-closed first.
    pub fn undo(&mut self) -> bool {
        self.force_close_groups();
        match self.undo_stack.pop() {
            Some(prev) => {
                self.redo_stack.push(std::mem::replace(&mut self.text, prev));
                self.modified = true;
                true
            }
            None => false,
        }
    }

    /// Swap current content with the top of the redo stack.
    pub fn redo(&mut self) -> bool {
        self.force_close_groups();
        match self.redo_stack.pop() {
            Some(next) => {
                self.undo_stack.push(std::mem::replace(&mut self.text, next));
                self.modified = true;
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() || self.group_snapshot.is_some()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}

/// Order two positions so that start <= end.
pub fn normalize(a: Position, b: Position) -> (Position, Position) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(content: &str) -> Buffer {
        let mut b = Buffer::new(BufferId(1));
        b.text = Rope::from_str(content);
        b
    }

    #[test]
    fn test_trailing_newline_is_not_a_line() {
        assert_eq!(buf("one\ntwo\n").len_lines(), 2);
        assert_eq!(buf("one\ntwo").len_lines(), 2);
        assert_eq!(buf("\n").len_lines(), 1);
        assert_eq!(buf("").len_lines(), 1);
        // the segment past the newline is not addressable
        assert_eq!(buf("one\n").line(1), None);
    }

    #[test]
    fn test_change_group_single_undo() {
        let mut b = buf("hello\nworld\n");
        b.begin_change_group();
        b.delete_char(Position::new(0, 0)).unwrap();
        b.delete_char(Position::new(0, 0)).unwrap();
        b.delete_line(1).unwrap();
        b.end_change_group();
        assert_eq!(b.content(), "llo\n");

        assert!(b.undo());
        assert_eq!(b.content(), "hello\nworld\n");
        // exactly one undo entry for the whole group
        assert!(!b.undo());
    }

    #[test]
    fn test_nested_groups_commit_once() {
        let mut b = buf("abc");
        b.begin_change_group();
        b.insert_char(Position::new(0, 0), 'x').unwrap();
        b.begin_change_group();
        b.insert_char(Position::new(0, 0), 'y').unwrap();
        b.end_change_group();
        // still open: no undo entry committed yet
        b.insert_char(Position::new(0, 0), 'z').unwrap();
        b.end_change_group();

        assert_eq!(b.content(), "zyxabc");
        assert!(b.undo());
        assert_eq!(b.content(), "abc");
        assert!(!b.undo());
    }

    #[test]
    fn test_undo_redo_are_inverses() {
        let mut b = buf("one\ntwo\n");
        b.delete_line(0).unwrap();
        let after = b.content();
        assert!(b.undo());
        assert_eq!(b.content(), "one\ntwo\n");
        assert!(b.redo());
        assert_eq!(b.content(), after);
        assert!(b.undo());
        assert_eq!(b.content(), "one\ntwo\n");
    }

    #[test]
    fn test_redo_cleared_by_new_edit() {
        let mut b = buf("abc");
        b.delete_char(Position::new(0, 0)).unwrap();
        assert!(b.undo());
        assert!(b.can_redo());
        b.insert_char(Position::new(0, 0), 'q').unwrap();
        assert!(!b.can_redo());
    }

    #[test]
    fn test_not_modifiable_rejects_mutation() {
        let mut b = buf("abc");
        b.modifiable = false;
        assert_eq!(
            b.insert_char(Position::new(0, 0), 'x'),
            Err(EditorError::NotModifiable)
        );
        assert_eq!(b.delete_line(0), Err(EditorError::NotModifiable));
        assert_eq!(b.content(), "abc");
    }

    #[test]
    fn test_span_text_normalizes_reversed() {
        let b = buf("hello world");
        let fwd = b.span_text(Position::new(0, 0), Position::new(0, 5));
        let rev = b.span_text(Position::new(0, 5), Position::new(0, 0));
        assert_eq!(fwd, "hello");
        assert_eq!(fwd, rev);
    }

    #[test]
    fn test_delete_span_across_lines() {
        let mut b = buf("one\ntwo\nthree\n");
        b.delete_span(Position::new(0, 2), Position::new(2, 3)).unwrap();
        assert_eq!(b.content(), "onee\n");
    }

    #[test]
    fn test_delete_last_line_keeps_one() {
        let mut b = buf("only");
        b.delete_line(0).unwrap();
        assert_eq!(b.len_lines(), 1);
        assert_eq!(b.line_len(0), 0);
    }

    #[test]
    fn test_backspace_joins_lines() {
        let mut b = buf("ab\ncd\n");
        let pos = b.backspace(Position::new(1, 0)).unwrap();
        assert_eq!(pos, Some(Position::new(0, 2)));
        assert_eq!(b.content(), "abcd\n");
    }

    #[test]
    fn test_write_readonly_fails() {
        let mut b = buf("abc");
        b.readonly = true;
        assert_eq!(b.write_to(None), Err(EditorError::ReadOnly));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.txt");
        std::fs::write(&path, "alpha\nbeta\n").unwrap();

        let mut b = Buffer::from_file(BufferId(1), path.clone()).unwrap();
        assert_eq!(b.line_text(1), "beta");
        b.insert_text(Position::new(0, 0), "x").unwrap();
        b.write_to(None).unwrap();
        assert!(!b.modified);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "xalpha\nbeta\n");
    }

    #[test]
    fn test_invalid_utf8_is_substituted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bin");
        std::fs::write(&path, [b'a', 0xFF, b'b']).unwrap();
        let b = Buffer::from_file(BufferId(1), path).unwrap();
        assert_eq!(b.line_text(0), "a\u{FFFD}b");
    }
}
