//! Terminal handling: raw mode, the render loop, and key input.
//!
//! Windows are stacked vertically, each with its own status line; the bottom
//! row shows the command line or the latest message. Everything above the
//! crossterm boundary works in `Key` tokens and buffer positions.

use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::{
    cursor,
    event::{self, Event, KeyEventKind},
    execute, queue,
    style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{self, ClearType},
};
use unicode_width::UnicodeWidthChar;

use crate::editor::{Editor, Mode};
use crate::input::keys::Key;

/// Terminal handler responsible for rendering and input.
pub struct Terminal {
    stdout: Stdout,
}

impl Terminal {
    pub fn new() -> anyhow::Result<Self> {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)?;
        Ok(Self { stdout })
    }

    pub fn size() -> anyhow::Result<(u16, u16)> {
        Ok(terminal::size()?)
    }

    /// Block up to `timeout` for the next key press. Resize and other events
    /// return None; the caller re-renders every iteration anyway.
    pub fn read_key(&mut self, timeout: Duration) -> anyhow::Result<Option<Key>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(ev) if ev.kind != KeyEventKind::Release => Ok(Some(Key::from(ev))),
            _ => Ok(None),
        }
    }

    /// Draw the full screen: every window in the tab stacked top to bottom,
    /// then the command line or message row.
    pub fn render(&mut self, editor: &mut Editor) -> anyhow::Result<()> {
        let (width, height) = Self::size()?;
        let width = width as usize;
        let height = height as usize;
        if height < 2 || width == 0 {
            return Ok(());
        }

        // Bottom row is the cmdline/message; the rest is split among windows.
        let area = height - 1;
        let order = editor.tab.window_order.clone();
        let share = (area / order.len().max(1)).max(2);
        let focused = editor.tab.current;

        queue!(self.stdout, cursor::Hide)?;
        let mut row = 0usize;
        let mut cursor_at: Option<(u16, u16)> = None;

        for (i, win_id) in order.iter().enumerate() {
            // Last window absorbs the rounding remainder.
            let rows = if i + 1 == order.len() { area - row } else { share };
            if rows < 2 {
                break;
            }
            let text_rows = rows - 1;
            let scroll_off = editor.scroll_off();

            let (number, buf_id) = {
                let win = match editor.window(*win_id) {
                    Some(w) => w,
                    None => continue,
                };
                let num = editor
                    .options
                    .get("number", *win_id, win.buffer)
                    .map(|v| v.as_bool())
                    .unwrap_or(false);
                (num, win.buffer)
            };
            let gutter = if number {
                let lines = editor.buffer(buf_id).map_or(1, |b| b.len_lines());
                digits(lines) + 1
            } else {
                0
            };
            let text_width = width.saturating_sub(gutter);

            if *win_id == focused {
                editor.text_rows = text_rows;
                if let Some(win) = editor.window_mut(*win_id) {
                    win.scroll_to_cursor(text_rows, scroll_off);
                }
            }
            self.scroll_horizontal(editor, *win_id, text_width);

            let win = match editor.window(*win_id) {
                Some(w) => w.clone(),
                None => continue,
            };
            let buffer = match editor.buffer(buf_id) {
                Some(b) => b,
                None => continue,
            };

            for r in 0..text_rows {
                let line_idx = win.top_line + r;
                queue!(
                    self.stdout,
                    cursor::MoveTo(0, (row + r) as u16),
                    terminal::Clear(ClearType::CurrentLine)
                )?;
                if line_idx >= buffer.len_lines() {
                    queue!(self.stdout, SetForegroundColor(Color::DarkGrey))?;
                    write!(self.stdout, "~")?;
                    queue!(self.stdout, ResetColor)?;
                    continue;
                }
                if number {
                    queue!(self.stdout, SetForegroundColor(Color::DarkGrey))?;
                    write!(self.stdout, "{:>w$} ", line_idx + 1, w = gutter - 1)?;
                    queue!(self.stdout, ResetColor)?;
                }
                let text = buffer.line_text(line_idx);
                let visible: String = text.chars().skip(win.left_col).collect();
                write!(self.stdout, "{}", clip_to_width(&visible, text_width))?;
            }

            self.render_status(editor, &win, row + text_rows, width, *win_id == focused)?;

            if *win_id == focused {
                let line_row = win.cursor.line.saturating_sub(win.top_line);
                if line_row < text_rows {
                    let text = editor
                        .buffer(buf_id)
                        .map(|b| b.line_text(win.cursor.line))
                        .unwrap_or_default();
                    let col: usize = text
                        .chars()
                        .skip(win.left_col)
                        .take(win.cursor.col.saturating_sub(win.left_col))
                        .map(|c| c.width().unwrap_or(1))
                        .sum();
                    cursor_at = Some(((gutter + col).min(width - 1) as u16, (row + line_row) as u16));
                }
            }

            row += rows;
        }

        self.render_bottom_row(editor, height - 1, width)?;

        // Command-line entry keeps the terminal cursor on the bottom row.
        if let Some(cmdline) = &editor.cmdline {
            let col = 1 + cmdline.input.chars().count();
            cursor_at = Some((col.min(width - 1) as u16, (height - 1) as u16));
        }
        if let Some((x, y)) = cursor_at {
            queue!(self.stdout, cursor::MoveTo(x, y), cursor::Show)?;
        }
        self.stdout.flush()?;
        Ok(())
    }

    /// Keep the cursor column inside the viewport for long lines.
    fn scroll_horizontal(&self, editor: &mut Editor, win_id: crate::editor::window::WindowId, text_width: usize) {
        if text_width == 0 {
            return;
        }
        if let Some(win) = editor.window_mut(win_id) {
            if win.cursor.col < win.left_col {
                win.left_col = win.cursor.col;
            } else if win.cursor.col >= win.left_col + text_width {
                win.left_col = win.cursor.col + 1 - text_width;
            }
        }
    }

    fn render_status(
        &mut self,
        editor: &Editor,
        win: &crate::editor::window::Window,
        row: usize,
        width: usize,
        focused: bool,
    ) -> anyhow::Result<()> {
        let buffer = editor.buffer(win.buffer);
        let name = buffer.map_or_else(|| "?".to_string(), |b| b.display_name());
        let modified = buffer.is_some_and(|b| b.modified);
        let mode = if focused { mode_label(editor.mode) } else { "" };
        let recording = match (focused, editor.macros.recording_register()) {
            (true, Some(reg)) => format!("  recording @{reg}"),
            _ => String::new(),
        };

        let left = if mode.is_empty() {
            format!(" {}{}", name, if modified { " [+]" } else { "" })
        } else {
            format!(
                " {}  {}{}{}",
                mode,
                name,
                if modified { " [+]" } else { "" },
                recording
            )
        };
        let right = format!("{},{} ", win.cursor.line + 1, win.cursor.col + 1);
        let pad = width.saturating_sub(left.chars().count() + right.chars().count());
        let line = format!("{}{}{}", left, " ".repeat(pad), right);

        queue!(
            self.stdout,
            cursor::MoveTo(0, row as u16),
            terminal::Clear(ClearType::CurrentLine),
            SetAttribute(Attribute::Reverse)
        )?;
        write!(self.stdout, "{}", clip_to_width(&line, width))?;
        queue!(self.stdout, SetAttribute(Attribute::Reset))?;
        Ok(())
    }

    fn render_bottom_row(&mut self, editor: &Editor, row: usize, width: usize) -> anyhow::Result<()> {
        queue!(
            self.stdout,
            cursor::MoveTo(0, row as u16),
            terminal::Clear(ClearType::CurrentLine)
        )?;
        if let Some(cmdline) = &editor.cmdline {
            let text = format!("{}{}", cmdline.prompt_char(), cmdline.input);
            write!(self.stdout, "{}", clip_to_width(&text, width))?;
        } else if let Some(msg) = &editor.message {
            if msg.is_error {
                queue!(self.stdout, SetForegroundColor(Color::Red))?;
            }
            write!(self.stdout, "{}", clip_to_width(&msg.text, width))?;
            if msg.is_error {
                queue!(self.stdout, ResetColor)?;
            }
        }
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let _ = execute!(self.stdout, terminal::LeaveAlternateScreen, cursor::Show);
    }
}

fn mode_label(mode: Mode) -> &'static str {
    match mode {
        Mode::Normal => "NORMAL",
        Mode::Insert => "INSERT",
        Mode::Visual => "VISUAL",
        Mode::VisualLine => "V-LINE",
        Mode::Cmdline => "COMMAND",
    }
}

fn digits(n: usize) -> usize {
    let mut n = n;
    let mut d = 1;
    while n >= 10 {
        n /= 10;
        d += 1;
    }
    d
}

/// Truncate a string to at most `max` terminal columns, respecting wide
/// characters.
fn clip_to_width(s: &str, max: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(1);
        if used + w > max {
            break;
        }
        used += w;
        out.push(c);
    }
    out
}
