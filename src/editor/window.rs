use super::buffer::{BufferId, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

/// A viewport onto a buffer. Windows reference buffers by id, never own them.
#[derive(Debug, Clone)]
pub struct Window {
    pub id: WindowId,
    pub buffer: BufferId,
    /// Cursor in character units
    pub cursor: Position,
    /// First visible line
    pub top_line: usize,
    /// First visible column (horizontal scroll)
    pub left_col: usize,
    /// Column the cursor tries to return to during vertical motion, so j/k
    /// stay visually stable across lines of different lengths.
    pub preferred_col: Option<usize>,
}

impl Window {
    pub fn new(id: WindowId, buffer: BufferId) -> Self {
        Self {
            id,
            buffer,
            cursor: Position::default(),
            top_line: 0,
            left_col: 0,
            preferred_col: None,
        }
    }

    /// Remember the current column for subsequent vertical motion.
    pub fn save_preferred_col(&mut self) {
        self.preferred_col = Some(self.cursor.col);
    }

    /// The column vertical motion should land on for a line of `line_len`.
    pub fn target_col(&self, line_len: usize) -> usize {
        let want = self.preferred_col.unwrap_or(self.cursor.col);
        want.min(line_len.saturating_sub(1))
    }

    /// Scroll the viewport so the cursor stays visible in `rows` text rows.
    pub fn scroll_to_cursor(&mut self, rows: usize, scroll_off: usize) {
        if rows == 0 {
            return;
        }
        let off = scroll_off.min(rows.saturating_sub(1) / 2);
        if self.cursor.line < self.top_line + off {
            self.top_line = self.cursor.line.saturating_sub(off);
        }
        let bottom = self.top_line + rows.saturating_sub(1);
        if self.cursor.line + off > bottom {
            self.top_line = (self.cursor.line + off + 1).saturating_sub(rows);
        }
    }
}

/// One saved window arrangement (a tab page): the window order and which of
/// them is focused.
#[derive(Debug, Clone)]
pub struct TabPage {
    pub window_order: Vec<WindowId>,
    pub current: WindowId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferred_col_clamps_to_line() {
        let mut w = Window::new(WindowId(1), BufferId(1));
        w.cursor = Position::new(0, 20);
        w.save_preferred_col();
        assert_eq!(w.target_col(5), 4);
        assert_eq!(w.target_col(40), 20);
        assert_eq!(w.target_col(0), 0);
    }

    #[test]
    fn test_scroll_follows_cursor() {
        let mut w = Window::new(WindowId(1), BufferId(1));
        w.cursor = Position::new(50, 0);
        w.scroll_to_cursor(10, 0);
        assert_eq!(w.top_line, 41);
        w.cursor = Position::new(5, 0);
        w.scroll_to_cursor(10, 0);
        assert_eq!(w.top_line, 5);
    }
}
