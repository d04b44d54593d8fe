//! The editor session: buffers, windows, and every piece of cross-buffer
//! state (registers, marks, jumplist, macros, options).
//!
//! The session owns state and exposes primitives; deciding *when* to call
//! them is the dispatch layer's job. Nothing here reads keys.

pub mod buffer;
pub mod jumplist;
pub mod macros;
pub mod marks;
pub mod options;
pub mod register;
pub mod window;

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{EditorError, Result};
use crate::motion::SearchDirection;

use buffer::{Buffer, BufferId, Position};
use jumplist::{JumpList, JumpLocation};
use macros::MacroState;
use marks::Marks;
use options::OptionStore;
use register::{Clipboard, Registers, SystemClipboard};
use window::{TabPage, Window, WindowId};

/// Editor modes. Operator-pending is a dispatcher sub-state, not a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Normal,
    Insert,
    Visual,
    VisualLine,
    Cmdline,
}

impl Mode {
    pub fn is_visual(self) -> bool {
        matches!(self, Mode::Visual | Mode::VisualLine)
    }
}

/// What the command line is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdlineKind {
    Ex,
    SearchForward,
    SearchBackward,
}

/// Command-line editing state, live while mode is Cmdline.
#[derive(Debug, Clone)]
pub struct Cmdline {
    pub kind: CmdlineKind,
    pub input: String,
}

impl Cmdline {
    pub fn new(kind: CmdlineKind) -> Self {
        Self { kind, input: String::new() }
    }

    pub fn prompt_char(&self) -> char {
        match self.kind {
            CmdlineKind::Ex => ':',
            CmdlineKind::SearchForward => '/',
            CmdlineKind::SearchBackward => '?',
        }
    }
}

/// Anchor of an active visual selection. The selection runs from the anchor
/// to the cursor, in either order.
#[derive(Debug, Clone, Copy)]
pub struct VisualState {
    pub anchor: Position,
}

/// Last search, reusable by n/N.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub pattern: Option<String>,
    pub direction: SearchDirection,
    /// Highlighting on; :nohlsearch turns it off until the next search
    pub hl: bool,
}

impl Default for SearchState {
    fn default() -> Self {
        Self { pattern: None, direction: SearchDirection::Forward, hl: true }
    }
}

/// A status-line message.
#[derive(Debug, Clone)]
pub struct Message {
    pub text: String,
    pub is_error: bool,
}

pub struct Editor {
    buffers: HashMap<BufferId, Buffer>,
    /// Buffer ids in creation order, for :bnext/:bprev cycling
    buffer_order: Vec<BufferId>,
    windows: HashMap<WindowId, Window>,
    pub tab: TabPage,
    next_buffer_id: u64,
    next_window_id: u64,
    pub mode: Mode,
    pub visual: Option<VisualState>,
    pub registers: Registers,
    pub marks: Marks,
    pub jumps: JumpList,
    pub macros: MacroState,
    pub options: OptionStore,
    pub search: SearchState,
    pub cmdline: Option<Cmdline>,
    pub message: Option<Message>,
    /// Rows of buffer text visible, maintained by the render layer; page
    /// motions scale by this.
    pub text_rows: usize,
    pub should_quit: bool,
}

impl Editor {
    pub fn new() -> Self {
        Self::with_clipboard(Box::new(SystemClipboard))
    }

    /// Construct with an explicit clipboard backend (tests use the in-memory
    /// one).
    pub fn with_clipboard(clipboard: Box<dyn Clipboard>) -> Self {
        let buffer_id = BufferId(1);
        let window_id = WindowId(1);
        let mut buffers = HashMap::new();
        buffers.insert(buffer_id, Buffer::new(buffer_id));
        let mut windows = HashMap::new();
        windows.insert(window_id, Window::new(window_id, buffer_id));

        Self {
            buffers,
            buffer_order: vec![buffer_id],
            windows,
            tab: TabPage { window_order: vec![window_id], current: window_id },
            next_buffer_id: 2,
            next_window_id: 2,
            mode: Mode::Normal,
            visual: None,
            registers: Registers::new(clipboard),
            marks: Marks::new(),
            jumps: JumpList::new(),
            macros: MacroState::new(),
            options: OptionStore::new(),
            search: SearchState::default(),
            cmdline: None,
            message: None,
            text_rows: 24,
            should_quit: false,
        }
    }

    // --- focus and lookup ---

    pub fn current_window(&self) -> &Window {
        &self.windows[&self.tab.current]
    }

    pub fn current_window_mut(&mut self) -> &mut Window {
        self.windows.get_mut(&self.tab.current).expect("focused window exists")
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.get_mut(&id)
    }

    pub fn current_buffer_id(&self) -> BufferId {
        self.current_window().buffer
    }

    pub fn current_buffer(&self) -> &Buffer {
        &self.buffers[&self.current_buffer_id()]
    }

    pub fn current_buffer_mut(&mut self) -> &mut Buffer {
        let id = self.current_buffer_id();
        self.buffers.get_mut(&id).expect("window points at live buffer")
    }

    pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.get(&id)
    }

    pub fn buffer_mut(&mut self, id: BufferId) -> Option<&mut Buffer> {
        self.buffers.get_mut(&id)
    }

    pub fn buffer_ids(&self) -> &[BufferId] {
        &self.buffer_order
    }

    pub fn cursor(&self) -> Position {
        self.current_window().cursor
    }

    pub fn set_cursor(&mut self, pos: Position) {
        self.current_window_mut().cursor = pos;
        self.clamp_cursor();
    }

    /// Filetype of the focused buffer, from the option store.
    pub fn filetype(&self) -> String {
        let w = self.tab.current;
        let b = self.current_buffer_id();
        self.options
            .get("filetype", w, b)
            .map(|v| v.as_str().to_string())
            .unwrap_or_default()
    }

    pub fn scroll_off(&self) -> usize {
        let w = self.tab.current;
        let b = self.current_buffer_id();
        self.options
            .get("scrolloff", w, b)
            .map(|v| v.as_int().max(0) as usize)
            .unwrap_or(0)
    }

    // --- modes ---

    pub fn set_mode(&mut self, mode: Mode) {
        if !mode.is_visual() {
            self.visual = None;
        }
        if mode != Mode::Cmdline {
            self.cmdline = None;
        }
        self.mode = mode;
    }

    pub fn enter_visual(&mut self, linewise: bool) {
        self.visual = Some(VisualState { anchor: self.cursor() });
        self.mode = if linewise { Mode::VisualLine } else { Mode::Visual };
    }

    pub fn enter_cmdline(&mut self, kind: CmdlineKind) {
        self.cmdline = Some(Cmdline::new(kind));
        self.mode = Mode::Cmdline;
    }

    // --- messages ---

    pub fn set_message(&mut self, text: impl Into<String>) {
        self.message = Some(Message { text: text.into(), is_error: false });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.message = Some(Message { text: text.into(), is_error: true });
    }

    // --- buffer management ---

    fn alloc_buffer_id(&mut self) -> BufferId {
        let id = BufferId(self.next_buffer_id);
        self.next_buffer_id += 1;
        id
    }

    fn alloc_window_id(&mut self) -> WindowId {
        let id = WindowId(self.next_window_id);
        self.next_window_id += 1;
        id
    }

    /// Open (or revisit) a file in the focused window. An existing buffer for
    /// the same path is reused rather than loaded twice.
    pub fn open_file(&mut self, path: PathBuf) -> Result<BufferId> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
        if let Some(&id) = self
            .buffer_order
            .iter()
            .find(|id| self.buffers[id].path.as_deref() == Some(canonical.as_path()))
        {
            self.show_buffer(id);
            return Ok(id);
        }

        let id = self.alloc_buffer_id();
        let buf = Buffer::from_file(id, canonical)
            .map_err(|e| EditorError::NotFound(e.to_string()))?;
        self.buffers.insert(id, buf);
        self.buffer_order.push(id);
        self.show_buffer(id);
        Ok(id)
    }

    /// Point the focused window at `id`, recording the jump.
    pub fn show_buffer(&mut self, id: BufferId) {
        if !self.buffers.contains_key(&id) {
            return;
        }
        if self.current_buffer_id() != id {
            self.push_jump();
        }
        let w = self.current_window_mut();
        w.buffer = id;
        w.cursor = Position::default();
        w.top_line = 0;
        w.preferred_col = None;
    }

    pub fn next_buffer(&mut self) {
        self.cycle_buffer(1);
    }

    pub fn prev_buffer(&mut self) {
        self.cycle_buffer(-1);
    }

    fn cycle_buffer(&mut self, step: isize) {
        let cur = self.current_buffer_id();
        let Some(idx) = self.buffer_order.iter().position(|&b| b == cur) else {
            return;
        };
        let len = self.buffer_order.len() as isize;
        if len <= 1 {
            return;
        }
        let next = (idx as isize + step).rem_euclid(len) as usize;
        self.show_buffer(self.buffer_order[next]);
    }

    /// Delete a buffer. Refuses when modified unless forced; windows showing
    /// it are retargeted, and a fresh scratch buffer is created if it was the
    /// last one.
    pub fn delete_buffer(&mut self, id: BufferId, force: bool) -> Result<()> {
        let buf = self
            .buffers
            .get(&id)
            .ok_or_else(|| EditorError::NotFound(format!("no buffer {}", id.0)))?;
        if buf.modified && !force {
            return Err(EditorError::UnsavedChanges);
        }

        self.buffer_order.retain(|&b| b != id);
        self.buffers.remove(&id);
        self.marks.forget_buffer(id);
        self.options.forget_buffer(id);

        let fallback = match self.buffer_order.first().copied() {
            Some(b) => b,
            None => {
                let b = self.alloc_buffer_id();
                self.buffers.insert(b, Buffer::new(b));
                self.buffer_order.push(b);
                b
            }
        };
        for w in self.windows.values_mut() {
            if w.buffer == id {
                w.buffer = fallback;
                w.cursor = Position::default();
                w.top_line = 0;
            }
        }
        Ok(())
    }

    /// Whether any buffer has unsaved changes (:qa guard).
    pub fn any_modified(&self) -> bool {
        self.buffers.values().any(|b| b.modified)
    }

    // --- windows ---

    /// Split: a new window onto the current buffer, focused. Geometry is the
    /// renderer's concern; the session only tracks order and focus.
    pub fn split_window(&mut self) -> WindowId {
        let buffer = self.current_buffer_id();
        let cursor = self.cursor();
        let id = self.alloc_window_id();
        let mut w = Window::new(id, buffer);
        w.cursor = cursor;
        self.windows.insert(id, w);
        let at = self
            .tab
            .window_order
            .iter()
            .position(|&w| w == self.tab.current)
            .map(|i| i + 1)
            .unwrap_or(self.tab.window_order.len());
        self.tab.window_order.insert(at, id);
        self.tab.current = id;
        id
    }

    /// Close the focused window. Returns false when it is the last one (the
    /// caller quits instead).
    pub fn close_current_window(&mut self) -> bool {
        if self.tab.window_order.len() <= 1 {
            return false;
        }
        let closing = self.tab.current;
        self.windows.remove(&closing);
        self.options.forget_window(closing);
        let idx = self
            .tab
            .window_order
            .iter()
            .position(|&w| w == closing)
            .unwrap_or(0);
        self.tab.window_order.retain(|&w| w != closing);
        let next = idx.min(self.tab.window_order.len() - 1);
        self.tab.current = self.tab.window_order[next];
        true
    }

    pub fn close_other_windows(&mut self) {
        let keep = self.tab.current;
        let closing: Vec<WindowId> =
            self.tab.window_order.iter().copied().filter(|&w| w != keep).collect();
        for w in closing {
            self.windows.remove(&w);
            self.options.forget_window(w);
        }
        self.tab.window_order.retain(|&w| w == keep);
    }

    pub fn focus_next_window(&mut self) {
        let Some(idx) = self.tab.window_order.iter().position(|&w| w == self.tab.current)
        else {
            return;
        };
        let next = (idx + 1) % self.tab.window_order.len();
        self.tab.current = self.tab.window_order[next];
    }

    // --- jumps ---

    fn here(&self) -> JumpLocation {
        JumpLocation { buffer: self.current_buffer_id(), pos: self.cursor() }
    }

    /// Record the current location before a jump-class motion.
    pub fn push_jump(&mut self) {
        let loc = self.here();
        self.jumps.push(loc);
    }

    pub fn jump_back(&mut self) -> bool {
        let cur = self.here();
        match self.jumps.back(cur) {
            Some(loc) => {
                self.go_to(loc);
                true
            }
            None => false,
        }
    }

    pub fn jump_forward(&mut self) -> bool {
        match self.jumps.forward() {
            Some(loc) => {
                self.go_to(loc);
                true
            }
            None => false,
        }
    }

    fn go_to(&mut self, loc: JumpLocation) {
        if self.buffers.contains_key(&loc.buffer) {
            let w = self.current_window_mut();
            w.buffer = loc.buffer;
            w.cursor = loc.pos;
            self.clamp_cursor();
        }
    }

    // --- cursor sanity ---

    /// Clamp the cursor to the buffer after any edit. In insert mode the
    /// cursor may rest one past the last character; elsewhere it may not.
    pub fn clamp_cursor(&mut self) {
        let insert = self.mode == Mode::Insert;
        let id = self.current_buffer_id();
        let (lines, line_len) = {
            let b = &self.buffers[&id];
            let lines = b.len_lines();
            let w = &self.windows[&self.tab.current];
            let line = w.cursor.line.min(lines.saturating_sub(1));
            (lines, b.line_len(line))
        };
        let w = self.current_window_mut();
        w.cursor.line = w.cursor.line.min(lines.saturating_sub(1));
        let max_col = if insert { line_len } else { line_len.saturating_sub(1) };
        w.cursor.col = w.cursor.col.min(max_col);
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::register::MemoryClipboard;
    use super::*;

    fn ed() -> Editor {
        Editor::with_clipboard(Box::<MemoryClipboard>::default())
    }

    fn ed_with(content: &str) -> Editor {
        let mut e = ed();
        e.current_buffer_mut()
            .replace_all_lines(content.lines().map(String::from).collect())
            .unwrap();
        e
    }

    #[test]
    fn test_starts_with_one_scratch_buffer() {
        let e = ed();
        assert_eq!(e.buffer_ids().len(), 1);
        assert_eq!(e.mode, Mode::Normal);
        assert!(e.current_buffer().path.is_none());
    }

    #[test]
    fn test_open_file_reuses_buffer_for_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello\n").unwrap();

        let mut e = ed();
        let first = e.open_file(path.clone()).unwrap();
        let second = e.open_file(path).unwrap();
        assert_eq!(first, second);
        assert_eq!(e.buffer_ids().len(), 2);
    }

    #[test]
    fn test_buffer_cycling_wraps() {
        let dir = tempfile::tempdir().unwrap();
        let mut e = ed();
        for name in ["a", "b"] {
            let p = dir.path().join(name);
            std::fs::write(&p, "x\n").unwrap();
            e.open_file(p).unwrap();
        }
        let at_b = e.current_buffer_id();
        e.next_buffer();
        assert_ne!(e.current_buffer_id(), at_b);
        e.next_buffer();
        e.next_buffer();
        assert_eq!(e.current_buffer_id(), at_b);
    }

    #[test]
    fn test_delete_modified_buffer_needs_force() {
        let mut e = ed_with("text");
        let id = e.current_buffer_id();
        assert!(e.current_buffer().modified);
        assert_eq!(e.delete_buffer(id, false), Err(EditorError::UnsavedChanges));
        e.delete_buffer(id, true).unwrap();
        // a replacement scratch buffer appears; windows never dangle
        assert_ne!(e.current_buffer_id(), id);
        assert_eq!(e.buffer_ids().len(), 1);
    }

    #[test]
    fn test_split_and_close_windows() {
        let mut e = ed();
        let original = e.tab.current;
        let split = e.split_window();
        assert_eq!(e.tab.current, split);
        assert_eq!(e.tab.window_order.len(), 2);

        e.focus_next_window();
        assert_eq!(e.tab.current, original);

        e.close_other_windows();
        assert_eq!(e.tab.window_order, vec![original]);
        // last window refuses to close
        assert!(!e.close_current_window());
    }

    #[test]
    fn test_visual_mode_tracks_anchor() {
        let mut e = ed_with("hello world");
        e.set_cursor(Position::new(0, 4));
        e.enter_visual(false);
        assert_eq!(e.mode, Mode::Visual);
        assert_eq!(e.visual.unwrap().anchor, Position::new(0, 4));
        e.set_mode(Mode::Normal);
        assert!(e.visual.is_none());
    }

    #[test]
    fn test_jump_back_across_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("other.txt");
        std::fs::write(&p, "second\n").unwrap();

        let mut e = ed_with("first");
        let home = e.current_buffer_id();
        e.open_file(p).unwrap();
        assert_ne!(e.current_buffer_id(), home);

        assert!(e.jump_back());
        assert_eq!(e.current_buffer_id(), home);
        assert!(e.jump_forward());
        assert_ne!(e.current_buffer_id(), home);
    }

    #[test]
    fn test_clamp_cursor_mode_aware() {
        let mut e = ed_with("abc");
        e.current_window_mut().cursor = Position::new(5, 10);
        e.clamp_cursor();
        assert_eq!(e.cursor(), Position::new(0, 2));

        e.set_mode(Mode::Insert);
        e.current_window_mut().cursor = Position::new(0, 10);
        e.clamp_cursor();
        assert_eq!(e.cursor(), Position::new(0, 3));
    }
}
