//! The dispatch state machine: one key in, editor state out.
//!
//! `App` owns the session plus everything that interprets keys: the command
//! registries, the keymap, and the modal input accumulator. `handle_key` is
//! the single entry point and is re-entrant; macro playback and dot-repeat
//! feed replayed keys back through it, so replay takes exactly the live-key
//! path.

use crate::commands::ex::ExRegistry;
use crate::commands::{
    self, CommandRegistry, Invocation,
};
use crate::editor::buffer::Position;
use crate::editor::register::{is_valid_register, Clipboard};
use crate::editor::{CmdlineKind, Editor, Mode};
use crate::error::{EditorError, Result};
use crate::input::keys::{parse_key_sequence, Key};
use crate::input::{motion_token, FindKind, InputState, LastFind, Operator, Pending};
use crate::keymap::{Binding, Keymap, Resolution};
use crate::motion::{Motion, SearchDirection};

/// Registry commands whose invocations are repeatable with `.`. Operator,
/// replace, and change-insert paths are captured by the dispatcher itself.
const DOT_COMMANDS: &[&str] = &["delete-char", "paste-after", "paste-before"];

pub struct App {
    pub editor: Editor,
    pub commands: CommandRegistry,
    pub ex_commands: ExRegistry,
    pub keymap: Keymap,
    pub input: InputState,
    /// Key sequence of the last buffer-changing command, replayed by `.`
    last_change: Option<Vec<Key>>,
    /// Non-zero while `.` is replaying; suppresses re-capture
    dot_depth: usize,
    /// A change entered insert mode; keep accumulating keys until Esc
    dot_insert_capture: bool,
    /// Exact binding held back because a longer chord might still complete
    ambiguous: Option<Binding>,
}

impl App {
    pub fn new() -> Self {
        Self::from_editor(Editor::new())
    }

    pub fn with_clipboard(clipboard: Box<dyn Clipboard>) -> Self {
        Self::from_editor(Editor::with_clipboard(clipboard))
    }

    fn from_editor(editor: Editor) -> Self {
        Self {
            editor,
            commands: CommandRegistry::with_builtins(),
            ex_commands: ExRegistry::with_builtins(),
            keymap: default_keymap(),
            input: InputState::new(),
            last_change: None,
            dot_depth: 0,
            dot_insert_capture: false,
            ambiguous: None,
        }
    }

    /// Feed one key through the dispatcher. Command failures become status
    /// messages; the editor always stays usable.
    pub fn handle_key(&mut self, key: Key) {
        if let Err(err) = self.dispatch_key(key) {
            self.editor.set_error(err.to_string());
            self.abort_input();
        }
    }

    fn dispatch_key(&mut self, key: Key) -> Result<()> {
        // The q that stops a recording is consumed here, before it could be
        // recorded into the macro itself. Replay never stops a recording.
        if key == Key::Char('q')
            && self.editor.mode == Mode::Normal
            && self.input.pending == Pending::None
            && self.input.count.is_none()
            && self.editor.macros.is_recording()
            && !self.editor.macros.is_playing()
            && self.dot_depth == 0
        {
            self.editor.macros.stop_recording();
            self.input.reset();
            return Ok(());
        }

        self.editor.macros.record_key(key);
        self.input.seq.push(key);

        match self.editor.mode {
            Mode::Insert => self.handle_insert_key(key),
            Mode::Cmdline => self.handle_cmdline_key(key),
            _ => self.handle_modal_key(key),
        }
    }

    fn abort_input(&mut self) {
        self.input.reset();
        self.ambiguous = None;
        self.dot_insert_capture = false;
    }

    /// Command completed. `capture` marks it dot-repeatable; if it left the
    /// editor in insert mode the capture extends until insert exits.
    fn finish(&mut self, capture: bool) {
        if capture && self.editor.mode == Mode::Insert {
            self.dot_insert_capture = self.dot_depth == 0;
            self.input.count = None;
            self.input.register = None;
            self.input.pending = Pending::None;
            self.input.pending_keys.clear();
            return; // seq keeps accumulating through the insert session
        }
        if capture && self.dot_depth == 0 {
            self.last_change = Some(self.input.seq.clone());
        }
        self.input.reset();
    }

    // --- normal / visual ---

    fn handle_modal_key(&mut self, key: Key) -> Result<()> {
        if self.input.pending != Pending::None {
            return self.handle_pending_key(key);
        }

        let mode = self.editor.mode;
        if key == Key::Esc {
            if mode.is_visual() {
                self.editor.set_mode(Mode::Normal);
            }
            self.abort_input();
            return Ok(());
        }
        // mid-chord: every key continues (or aborts) the keymap lookup
        if !self.input.pending_keys.is_empty() {
            return self.handle_keymap_key(key);
        }

        match key {
            Key::Char(c @ '1'..='9') => {
                self.input.push_count_digit(c.to_digit(10).unwrap());
                Ok(())
            }
            Key::Char('0') if self.input.count.is_some() => {
                self.input.push_count_digit(0);
                Ok(())
            }
            Key::Char('"') => {
                self.input.pending = Pending::Register;
                Ok(())
            }
            Key::Char('m') if mode == Mode::Normal => {
                self.input.pending = Pending::MarkSet;
                Ok(())
            }
            Key::Char('\'') => {
                self.input.pending = Pending::MarkJumpLine;
                Ok(())
            }
            Key::Char('`') => {
                self.input.pending = Pending::MarkJumpExact;
                Ok(())
            }
            Key::Char('q') if mode == Mode::Normal => {
                self.input.pending = Pending::Record;
                Ok(())
            }
            Key::Char('@') if mode == Mode::Normal => {
                self.input.pending = Pending::Play;
                Ok(())
            }
            Key::Char('r') if mode == Mode::Normal => {
                self.input.pending = Pending::Replace;
                Ok(())
            }
            Key::Char('f') => {
                self.input.pending = Pending::Find(FindKind::Find);
                Ok(())
            }
            Key::Char('F') => {
                self.input.pending = Pending::Find(FindKind::FindBack);
                Ok(())
            }
            Key::Char('t') => {
                self.input.pending = Pending::Find(FindKind::Till);
                Ok(())
            }
            Key::Char('T') => {
                self.input.pending = Pending::Find(FindKind::TillBack);
                Ok(())
            }
            Key::Char('.') if mode == Mode::Normal => self.repeat_last_change(),
            Key::Char(';') => self.repeat_find(false),
            Key::Char(',') => self.repeat_find(true),
            _ if mode == Mode::Normal && Operator::from_key(key).is_some() => {
                let op = Operator::from_key(key).expect("checked in guard");
                self.input.pending = Pending::Operator(op);
                Ok(())
            }
            _ => self.handle_keymap_key(key),
        }
    }

    fn handle_keymap_key(&mut self, key: Key) -> Result<()> {
        self.input.pending_keys.push(key);
        let mode = self.editor.mode;
        let ft = self.editor.filetype();
        let buffer = self.editor.current_buffer_id();

        match self.keymap.resolve(mode, &ft, buffer, &self.input.pending_keys) {
            Resolution::Match(binding) => {
                self.ambiguous = None;
                self.input.pending_keys.clear();
                self.run_binding(&binding)
            }
            Resolution::Ambiguous(binding) => {
                // hold the exact match back; the next key decides
                self.ambiguous = Some(binding);
                Ok(())
            }
            Resolution::Pending => {
                self.ambiguous = None;
                Ok(())
            }
            Resolution::None => {
                if let Some(binding) = self.ambiguous.take() {
                    // the held-back exact match fires, then this key retries
                    // on its own
                    self.input.pending_keys.clear();
                    self.run_binding(&binding)?;
                    return self.handle_modal_key(key);
                }
                self.input.pending_keys.clear();
                self.input.count = None;
                self.input.register = None;
                Ok(())
            }
        }
    }

    fn run_binding(&mut self, binding: &Binding) -> Result<()> {
        let mut inv = Invocation::new(&binding.command);
        inv.args = binding.args.clone();
        inv.count = self.input.take_count();
        inv.register = self.input.take_register();
        inv.keys = self.input.seq.clone();
        self.commands.execute(&mut self.editor, &inv)?;
        let capture = DOT_COMMANDS.contains(&binding.command.as_str());
        self.finish(capture);
        Ok(())
    }

    // --- pending sub-states ---

    fn handle_pending_key(&mut self, key: Key) -> Result<()> {
        let pending = self.input.pending;
        if key == Key::Esc {
            self.abort_input();
            return Ok(());
        }

        match pending {
            Pending::None => unreachable!("caller checked"),
            Pending::Register => {
                let c = key.printable().ok_or(EditorError::InvalidRegister('\0'))?;
                if !is_valid_register(c) {
                    return Err(EditorError::InvalidRegister(c));
                }
                self.input.register = Some(c);
                self.input.pending = Pending::None;
                Ok(())
            }
            Pending::MarkSet => {
                let c = key.printable().ok_or(EditorError::InvalidMark('\0'))?;
                let buffer = self.editor.current_buffer_id();
                let pos = self.editor.cursor();
                self.editor.marks.set(buffer, c, pos)?;
                self.finish(false);
                Ok(())
            }
            Pending::MarkJumpLine | Pending::MarkJumpExact => {
                let c = key.printable().ok_or(EditorError::InvalidMark('\0'))?;
                self.jump_to_mark(c, pending == Pending::MarkJumpLine)
            }
            Pending::Record => {
                let c = key.printable().ok_or(EditorError::InvalidRegister('\0'))?;
                if !c.is_ascii_alphabetic() {
                    return Err(EditorError::InvalidRegister(c));
                }
                self.editor.macros.start_recording(c);
                self.finish(false);
                Ok(())
            }
            Pending::Play => {
                let c = key.printable().ok_or(EditorError::InvalidRegister('\0'))?;
                let count = self.input.take_count();
                self.input.pending = Pending::None;
                self.play_macro(c, count)
            }
            Pending::Replace => {
                let c = key.printable().ok_or(EditorError::UnknownCommand("r".into()))?;
                let count = self.input.take_count();
                commands::replace_char(&mut self.editor, c, count)?;
                self.finish(true);
                Ok(())
            }
            Pending::Find(kind) => {
                let Some(c) = key.printable() else {
                    self.abort_input();
                    return Ok(());
                };
                self.input.last_find = Some(LastFind { kind, target: c });
                let count = self.input.take_count();
                commands::move_cursor(&mut self.editor, kind.to_motion(c), count)?;
                self.finish(false);
                Ok(())
            }
            Pending::Operator(op) => self.handle_operator_key(op, key),
            Pending::Object { op, around } => {
                let obj = key
                    .printable()
                    .and_then(crate::motion::textobject::TextObjectKind::from_char);
                let Some(kind) = obj else {
                    self.abort_input();
                    return Ok(());
                };
                let register = self.input.take_register();
                commands::operator_object(&mut self.editor, op, kind, around, register)?;
                self.finish(op != Operator::Yank);
                Ok(())
            }
            Pending::OperatorG(op) => {
                if key == Key::Char('g') {
                    let register = self.input.take_register();
                    commands::operator_motion(
                        &mut self.editor,
                        op,
                        Motion::FileStart,
                        1,
                        register,
                    )?;
                    self.finish(op != Operator::Yank);
                } else {
                    self.abort_input();
                }
                Ok(())
            }
            Pending::OperatorFind(op, kind) => {
                let Some(c) = key.printable() else {
                    self.abort_input();
                    return Ok(());
                };
                self.input.last_find = Some(LastFind { kind, target: c });
                let count = self.input.take_count();
                let register = self.input.take_register();
                commands::operator_motion(
                    &mut self.editor,
                    op,
                    kind.to_motion(c),
                    count,
                    register,
                )?;
                self.finish(op != Operator::Yank);
                Ok(())
            }
        }
    }

    fn handle_operator_key(&mut self, op: Operator, key: Key) -> Result<()> {
        match key {
            Key::Char(c) if c == op.key_char() => {
                let count = self.input.take_count();
                let register = self.input.take_register();
                commands::operator_lines(&mut self.editor, op, count, register)?;
                self.finish(op != Operator::Yank);
                Ok(())
            }
            Key::Char('i') => {
                self.input.pending = Pending::Object { op, around: false };
                Ok(())
            }
            Key::Char('a') => {
                self.input.pending = Pending::Object { op, around: true };
                Ok(())
            }
            Key::Char('g') => {
                self.input.pending = Pending::OperatorG(op);
                Ok(())
            }
            Key::Char('f') => {
                self.input.pending = Pending::OperatorFind(op, FindKind::Find);
                Ok(())
            }
            Key::Char('F') => {
                self.input.pending = Pending::OperatorFind(op, FindKind::FindBack);
                Ok(())
            }
            Key::Char('t') => {
                self.input.pending = Pending::OperatorFind(op, FindKind::Till);
                Ok(())
            }
            Key::Char('T') => {
                self.input.pending = Pending::OperatorFind(op, FindKind::TillBack);
                Ok(())
            }
            _ => match motion_token(key) {
                Some(motion) => {
                    let count = self.input.take_count();
                    let register = self.input.take_register();
                    commands::operator_motion(&mut self.editor, op, motion, count, register)?;
                    self.finish(op != Operator::Yank);
                    Ok(())
                }
                None => {
                    self.abort_input();
                    Ok(())
                }
            },
        }
    }

    fn jump_to_mark(&mut self, name: char, to_line: bool) -> Result<()> {
        let current = self.editor.current_buffer_id();
        let (buffer, mut pos) = self.editor.marks.get(current, name)?;
        self.editor.push_jump();
        if buffer != current {
            self.editor.current_window_mut().buffer = buffer;
        }
        if to_line {
            pos.col = crate::motion::first_non_blank(
                self.editor.buffer(buffer).expect("mark buffer exists"),
                pos.line.min(
                    self.editor
                        .buffer(buffer)
                        .expect("mark buffer exists")
                        .len_lines()
                        .saturating_sub(1),
                ),
            );
        }
        self.editor.set_cursor(pos);
        self.finish(false);
        Ok(())
    }

    // --- replay ---

    fn repeat_find(&mut self, reverse: bool) -> Result<()> {
        let Some(last) = self.input.last_find else {
            self.finish(false);
            return Ok(());
        };
        let kind = if reverse { last.kind.reversed() } else { last.kind };
        let count = self.input.take_count();
        commands::move_cursor(&mut self.editor, kind.to_motion(last.target), count)?;
        self.finish(false);
        Ok(())
    }

    fn repeat_last_change(&mut self) -> Result<()> {
        let Some(keys) = self.last_change.clone() else {
            self.input.reset();
            return Ok(());
        };
        self.input.reset();
        self.dot_depth += 1;
        self.editor.macros.suspend_recording();
        for key in keys {
            self.handle_key(key);
        }
        self.editor.macros.resume_recording();
        self.dot_depth -= 1;
        self.input.reset();
        Ok(())
    }

    fn play_macro(&mut self, register: char, count: usize) -> Result<()> {
        let register = if register == '@' {
            self.editor
                .macros
                .last_played()
                .ok_or(EditorError::InvalidRegister('@'))?
        } else if register.is_ascii_alphabetic() {
            register
        } else {
            return Err(EditorError::InvalidRegister(register));
        };

        let Some(keys) = self.editor.macros.get_macro(register).map(<[Key]>::to_vec) else {
            self.finish(false);
            return Ok(()); // empty macro plays as nothing
        };
        if !self.editor.macros.enter_playback(register) {
            return Err(EditorError::MacroRecursion);
        }
        self.editor.macros.set_last_played(register);
        self.editor.macros.suspend_recording();
        self.editor.message = None;

        'outer: for _ in 0..count {
            for &key in &keys {
                self.handle_key(key);
                // a failing step aborts the remaining playback
                if self.editor.message.as_ref().is_some_and(|m| m.is_error) {
                    break 'outer;
                }
            }
        }

        self.editor.macros.resume_recording();
        self.editor.macros.exit_playback();
        self.finish(false);
        Ok(())
    }

    // --- insert mode ---

    fn handle_insert_key(&mut self, key: Key) -> Result<()> {
        match key {
            Key::Esc => {
                self.editor.current_buffer_mut().end_change_group();
                if self.dot_insert_capture && self.dot_depth == 0 {
                    self.last_change = Some(self.input.seq.clone());
                }
                self.dot_insert_capture = false;
                let pos = self.editor.cursor();
                self.editor.set_mode(Mode::Normal);
                self.editor
                    .set_cursor(Position::new(pos.line, pos.col.saturating_sub(1)));
                self.input.reset();
                Ok(())
            }
            Key::Enter => {
                let pos = self.editor.cursor();
                self.editor.current_buffer_mut().insert_newline(pos)?;
                self.editor.set_cursor(Position::new(pos.line + 1, 0));
                Ok(())
            }
            Key::Backspace => {
                let pos = self.editor.cursor();
                if let Some(new_pos) = self.editor.current_buffer_mut().backspace(pos)? {
                    self.editor.set_cursor(new_pos);
                }
                Ok(())
            }
            Key::Delete => {
                let pos = self.editor.cursor();
                self.editor.current_buffer_mut().delete_char(pos)?;
                Ok(())
            }
            Key::Tab => {
                let (w, b) = (self.editor.tab.current, self.editor.current_buffer_id());
                let expand = self.editor.options.get("expandtab", w, b)?.as_bool();
                let tabstop = self.editor.options.get("tabstop", w, b)?.as_int().max(1) as usize;
                let pos = self.editor.cursor();
                if expand {
                    let fill = tabstop - (pos.col % tabstop);
                    let spaces = " ".repeat(fill);
                    self.editor.current_buffer_mut().insert_text(pos, &spaces)?;
                    self.editor.set_cursor(Position::new(pos.line, pos.col + fill));
                } else {
                    self.editor.current_buffer_mut().insert_char(pos, '\t')?;
                    self.editor.set_cursor(Position::new(pos.line, pos.col + 1));
                }
                Ok(())
            }
            Key::Left | Key::Right | Key::Up | Key::Down => {
                let pos = self.editor.cursor();
                let target = match key {
                    Key::Left => Position::new(pos.line, pos.col.saturating_sub(1)),
                    Key::Right => Position::new(pos.line, pos.col + 1),
                    Key::Up => Position::new(pos.line.saturating_sub(1), pos.col),
                    _ => Position::new(pos.line + 1, pos.col),
                };
                self.editor.set_cursor(target);
                Ok(())
            }
            Key::Char(c) => {
                let pos = self.editor.cursor();
                self.editor.current_buffer_mut().insert_char(pos, c)?;
                self.editor.set_cursor(Position::new(pos.line, pos.col + 1));
                Ok(())
            }
            _ => Ok(()),
        }
    }

    // --- command line ---

    fn handle_cmdline_key(&mut self, key: Key) -> Result<()> {
        match key {
            Key::Esc => {
                self.editor.set_mode(Mode::Normal);
                self.input.reset();
                Ok(())
            }
            Key::Enter => {
                let cmdline = self.editor.cmdline.take();
                self.editor.set_mode(Mode::Normal);
                self.input.reset();
                let Some(cmdline) = cmdline else {
                    return Ok(());
                };
                match cmdline.kind {
                    CmdlineKind::Ex => self.ex_commands.execute(&mut self.editor, &cmdline.input),
                    CmdlineKind::SearchForward => commands::execute_search(
                        &mut self.editor,
                        &cmdline.input,
                        SearchDirection::Forward,
                    ),
                    CmdlineKind::SearchBackward => commands::execute_search(
                        &mut self.editor,
                        &cmdline.input,
                        SearchDirection::Backward,
                    ),
                }
            }
            Key::Backspace => {
                let cancel = match self.editor.cmdline.as_mut() {
                    Some(cl) => cl.input.pop().is_none(),
                    None => true,
                };
                // backspacing past the prompt cancels, like vim
                if cancel {
                    self.editor.set_mode(Mode::Normal);
                    self.input.reset();
                }
                Ok(())
            }
            Key::Char(c) => {
                if let Some(cl) = self.editor.cmdline.as_mut() {
                    cl.input.push(c);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// The stock bindings: motions in the mode-independent fallback layer,
/// editing commands per mode.
pub fn default_keymap() -> Keymap {
    let mut km = Keymap::new();
    let seq = |s: &str| parse_key_sequence(s).expect("valid default binding");

    // motions work in every mode that consults the keymap
    let motions: &[(&str, &[&str])] = &[
        ("h", &["move", "left"]),
        ("l", &["move", "right"]),
        ("j", &["move", "down"]),
        ("k", &["move", "up"]),
        ("w", &["move", "word-forward"]),
        ("b", &["move", "word-backward"]),
        ("e", &["move", "word-end"]),
        ("W", &["move", "big-word-forward"]),
        ("B", &["move", "big-word-backward"]),
        ("E", &["move", "big-word-end"]),
        ("0", &["move", "line-start"]),
        ("^", &["move", "first-non-blank"]),
        ("$", &["move", "line-end"]),
        ("{", &["move", "paragraph-backward"]),
        ("}", &["move", "paragraph-forward"]),
        ("%", &["move", "matching-bracket"]),
        ("<C-d>", &["move", "half-page-down"]),
        ("<C-u>", &["move", "half-page-up"]),
        ("<C-f>", &["move", "page-down"]),
        ("<C-b>", &["move", "page-up"]),
        ("<Left>", &["move", "left"]),
        ("<Right>", &["move", "right"]),
        ("<Down>", &["move", "down"]),
        ("<Up>", &["move", "up"]),
        ("<Home>", &["move", "line-start"]),
        ("<End>", &["move", "line-end"]),
        ("<PageDown>", &["move", "page-down"]),
        ("<PageUp>", &["move", "page-up"]),
    ];
    for (keys, spec) in motions {
        km.bind_fallback(seq(keys), Binding::with_args(spec[0], &spec[1..]));
    }
    km.bind_fallback(seq("gg"), Binding::new("goto-first-line"));
    km.bind_fallback(seq("G"), Binding::new("goto-last-line"));

    let normal: &[(&str, &str)] = &[
        ("x", "delete-char"),
        ("X", "delete-char-back"),
        ("p", "paste-after"),
        ("P", "paste-before"),
        ("u", "undo"),
        ("<C-r>", "redo"),
        ("J", "join-lines"),
        ("i", "insert-mode"),
        ("I", "insert-line-start"),
        ("a", "append"),
        ("A", "append-line-end"),
        ("o", "open-below"),
        ("O", "open-above"),
        ("v", "visual-mode"),
        ("V", "visual-line-mode"),
        (":", "cmdline-ex"),
        ("/", "search-forward"),
        ("?", "search-backward"),
        ("n", "search-next"),
        ("N", "search-prev"),
        ("<C-o>", "jump-back"),
        ("<C-i>", "jump-forward"),
        ("<C-w>w", "window-next"),
        ("<C-w><C-w>", "window-next"),
        ("<C-w>s", "window-split"),
        ("<C-w>v", "window-split"),
        ("<C-w>o", "window-only"),
        ("<C-w>q", "window-close"),
    ];
    for (keys, name) in normal {
        km.bind_global(Mode::Normal, seq(keys), Binding::new(name));
    }

    for mode in [Mode::Visual, Mode::VisualLine] {
        km.bind_global(mode, seq("d"), Binding::new("visual-delete"));
        km.bind_global(mode, seq("x"), Binding::new("visual-delete"));
        km.bind_global(mode, seq("y"), Binding::new("visual-yank"));
        km.bind_global(mode, seq("c"), Binding::new("visual-change"));
        km.bind_global(mode, seq("s"), Binding::new("visual-change"));
        km.bind_global(mode, seq(":"), Binding::new("cmdline-ex"));
    }

    km
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::register::MemoryClipboard;

    fn app(content: &str) -> App {
        let mut a = App::with_clipboard(Box::<MemoryClipboard>::default());
        a.editor
            .current_buffer_mut()
            .replace_all_lines(content.lines().map(String::from).collect())
            .unwrap();
        a.editor.current_buffer_mut().modified = false;
        a
    }

    fn feed(a: &mut App, keys: &str) {
        for key in parse_key_sequence(keys).unwrap() {
            a.handle_key(key);
        }
    }

    fn line(a: &App, n: usize) -> String {
        a.editor.current_buffer().line_text(n)
    }

    #[test]
    fn test_delete_line_and_paste() {
        let mut a = app("one\ntwo\nthree");
        feed(&mut a, "dd");
        assert_eq!(line(&a, 0), "two");
        assert_eq!(a.editor.registers.get(None).unwrap().text, "one\n");
        feed(&mut a, "p");
        assert_eq!(line(&a, 0), "two");
        assert_eq!(line(&a, 1), "one");
    }

    #[test]
    fn test_count_prefix_applies_to_operator() {
        let mut a = app("a\nb\nc\nd");
        feed(&mut a, "2dd");
        assert_eq!(line(&a, 0), "c");
        assert_eq!(a.editor.registers.get(None).unwrap().text, "a\nb\n");
    }

    #[test]
    fn test_operator_with_word_motion() {
        let mut a = app("foo bar baz");
        feed(&mut a, "dw");
        assert_eq!(line(&a, 0), "bar baz");
        feed(&mut a, "d$");
        assert_eq!(line(&a, 0), "");
    }

    #[test]
    fn test_operator_with_find_motion() {
        let mut a = app("foo bar");
        feed(&mut a, "dfb");
        assert_eq!(line(&a, 0), "ar");

        let mut a = app("foo bar");
        feed(&mut a, "dta");
        assert_eq!(line(&a, 0), "ar");
    }

    #[test]
    fn test_inner_word_object() {
        let mut a = app("foo bar baz");
        feed(&mut a, "wdiw");
        assert_eq!(line(&a, 0), "foo  baz");
    }

    #[test]
    fn test_change_enters_insert_and_undoes_as_one_step() {
        let mut a = app("foo bar");
        feed(&mut a, "cchello<Esc>");
        assert_eq!(line(&a, 0), "hello");
        assert_eq!(a.editor.mode, Mode::Normal);
        feed(&mut a, "u");
        assert_eq!(line(&a, 0), "foo bar");
    }

    #[test]
    fn test_dot_repeats_change_with_typed_text() {
        let mut a = app("foo bar");
        feed(&mut a, "ciwxyz<Esc>");
        assert_eq!(line(&a, 0), "xyz bar");
        feed(&mut a, "w.");
        assert_eq!(line(&a, 0), "xyz xyz");
    }

    #[test]
    fn test_dot_repeats_delete_char() {
        let mut a = app("abcdef");
        feed(&mut a, "x..");
        assert_eq!(line(&a, 0), "def");
    }

    #[test]
    fn test_join_is_not_dot_repeatable() {
        let mut a = app("a\nb\nc\nd");
        feed(&mut a, "x"); // last change: delete-char
        feed(&mut a, "jJ");
        assert_eq!(line(&a, 1), "b c");
        // . repeats the x, not the join
        feed(&mut a, ".");
        assert_eq!(line(&a, 1), "bc");
        assert_eq!(line(&a, 2), "d");
    }

    #[test]
    fn test_named_register_round_trip() {
        let mut a = app("keep this\nother");
        feed(&mut a, "\"ayy");
        feed(&mut a, "j\"ap");
        assert_eq!(line(&a, 2), "keep this");
        // unnamed was mirrored too
        assert_eq!(a.editor.registers.get(None).unwrap().text, "keep this\n");
    }

    #[test]
    fn test_black_hole_register_preserves_unnamed() {
        let mut a = app("first\nsecond");
        feed(&mut a, "yy");
        feed(&mut a, "\"_dd");
        assert_eq!(a.editor.registers.get(None).unwrap().text, "first\n");
        assert_eq!(line(&a, 0), "second");
    }

    #[test]
    fn test_insert_and_escape() {
        let mut a = app("world");
        feed(&mut a, "ihello <Esc>");
        assert_eq!(line(&a, 0), "hello world");
        // cursor steps back onto the last inserted char
        assert_eq!(a.editor.cursor(), Position::new(0, 5));
    }

    #[test]
    fn test_open_below_and_append() {
        let mut a = app("top");
        feed(&mut a, "onext<Esc>");
        assert_eq!(line(&a, 1), "next");
        feed(&mut a, "A!<Esc>");
        assert_eq!(line(&a, 1), "next!");
    }

    #[test]
    fn test_replace_char() {
        let mut a = app("abc");
        feed(&mut a, "rz");
        assert_eq!(line(&a, 0), "zbc");
        feed(&mut a, "l2rq");
        assert_eq!(line(&a, 0), "zqq");
    }

    #[test]
    fn test_visual_charwise_delete() {
        let mut a = app("abcdef");
        feed(&mut a, "vlld");
        assert_eq!(line(&a, 0), "def");
        assert_eq!(a.editor.mode, Mode::Normal);
    }

    #[test]
    fn test_visual_line_delete() {
        let mut a = app("one\ntwo\nthree");
        feed(&mut a, "Vjd");
        assert_eq!(line(&a, 0), "three");
        assert!(a.editor.registers.get(None).unwrap().is_linewise());
    }

    #[test]
    fn test_visual_escape_keeps_buffer() {
        let mut a = app("text");
        feed(&mut a, "vll<Esc>x");
        // Esc dropped the selection; x deletes the single char under the
        // cursor, which ll left on column 2
        assert_eq!(line(&a, 0), "tet");
    }

    #[test]
    fn test_marks_set_and_jump() {
        let mut a = app("one\ntwo\nthree\nfour");
        feed(&mut a, "jlma");
        feed(&mut a, "gg");
        assert_eq!(a.editor.cursor(), Position::new(0, 0));
        feed(&mut a, "`a");
        assert_eq!(a.editor.cursor(), Position::new(1, 1));
        // 'a jumps to first non-blank of the line instead
        feed(&mut a, "gg'a");
        assert_eq!(a.editor.cursor(), Position::new(1, 0));
    }

    #[test]
    fn test_unset_mark_is_an_error_message() {
        let mut a = app("text");
        feed(&mut a, "`z");
        let msg = a.editor.message.as_ref().unwrap();
        assert!(msg.is_error);
        assert!(msg.text.contains("mark not set"));
    }

    #[test]
    fn test_macro_record_and_play() {
        let mut a = app("abcdef");
        feed(&mut a, "qaxq");
        assert!(!a.editor.macros.is_recording());
        assert_eq!(line(&a, 0), "bcdef");
        feed(&mut a, "@a");
        assert_eq!(line(&a, 0), "cdef");
        feed(&mut a, "2@@");
        assert_eq!(line(&a, 0), "ef");
    }

    #[test]
    fn test_macro_self_reference_is_rejected() {
        let mut a = app("abcdef");
        a.editor.macros.start_recording('a');
        a.editor.macros.record_key(Key::Char('@'));
        a.editor.macros.record_key(Key::Char('a'));
        a.editor.macros.stop_recording();
        feed(&mut a, "@a");
        let msg = a.editor.message.as_ref().unwrap();
        assert!(msg.is_error);
    }

    #[test]
    fn test_macro_replay_not_rerecorded() {
        let mut a = app("abc\nxyz");
        feed(&mut a, "qbxq");
        // playing b while recording c must record "@b", not b's expansion
        feed(&mut a, "qc@bq");
        assert_eq!(
            a.editor.macros.get_macro('c'),
            Some(&[Key::Char('@'), Key::Char('b')][..])
        );
    }

    #[test]
    fn test_search_moves_and_wraps() {
        let mut a = app("alpha\nbeta\nalpha two");
        feed(&mut a, "/alpha<CR>");
        assert_eq!(a.editor.cursor(), Position::new(2, 0));
        feed(&mut a, "n");
        assert_eq!(a.editor.cursor(), Position::new(0, 0));
        feed(&mut a, "N");
        assert_eq!(a.editor.cursor(), Position::new(2, 0));
    }

    #[test]
    fn test_ex_goto_line_and_substitute() {
        let mut a = app("aaa\nbbb\naaa");
        feed(&mut a, ":2<CR>");
        assert_eq!(a.editor.cursor().line, 1);
        feed(&mut a, ":%s/aaa/ccc/g<CR>");
        assert_eq!(line(&a, 0), "ccc");
        assert_eq!(line(&a, 2), "ccc");
    }

    #[test]
    fn test_ex_quit_guard() {
        let mut a = app("text");
        feed(&mut a, "x:q<CR>");
        assert!(!a.editor.should_quit);
        assert!(a.editor.message.as_ref().unwrap().is_error);
        feed(&mut a, ":q!<CR>");
        assert!(a.editor.should_quit);
    }

    #[test]
    fn test_goto_and_jumplist() {
        let mut a = app("0\n1\n2\n3\n4\n5\n6\n7\n8\n9");
        feed(&mut a, "G");
        assert_eq!(a.editor.cursor().line, 9);
        feed(&mut a, "<C-o>");
        assert_eq!(a.editor.cursor().line, 0);
        feed(&mut a, "<C-i>");
        assert_eq!(a.editor.cursor().line, 9);
        feed(&mut a, "3G");
        assert_eq!(a.editor.cursor().line, 2);
    }

    #[test]
    fn test_find_char_and_semicolon_repeat() {
        let mut a = app("foo boo moo");
        feed(&mut a, "fo");
        assert_eq!(a.editor.cursor().col, 1);
        feed(&mut a, ";");
        assert_eq!(a.editor.cursor().col, 2);
        feed(&mut a, "2;");
        assert_eq!(a.editor.cursor().col, 6);
        feed(&mut a, ",");
        assert_eq!(a.editor.cursor().col, 5);
    }

    #[test]
    fn test_zero_is_motion_without_count() {
        let mut a = app("abcdef");
        feed(&mut a, "3l");
        assert_eq!(a.editor.cursor().col, 3);
        feed(&mut a, "0");
        assert_eq!(a.editor.cursor().col, 0);
        feed(&mut a, "10l");
        assert_eq!(a.editor.cursor().col, 5); // clamped
    }

    #[test]
    fn test_ambiguous_binding_fires_on_non_extending_key() {
        let mut a = app("abc");
        a.commands
            .register_user(
                "msg-one",
                Box::new(|e: &mut Editor, _inv: &Invocation| {
                    e.set_message("one");
                    Ok(())
                }),
            )
            .unwrap();
        a.commands
            .register_user(
                "msg-two",
                Box::new(|e: &mut Editor, _inv: &Invocation| {
                    e.set_message("two");
                    Ok(())
                }),
            )
            .unwrap();
        a.keymap.bind_global(
            Mode::Normal,
            parse_key_sequence("Q").unwrap(),
            Binding::new("msg-one"),
        );
        a.keymap.bind_global(
            Mode::Normal,
            parse_key_sequence("QQ").unwrap(),
            Binding::new("msg-two"),
        );

        feed(&mut a, "Q");
        assert!(a.editor.message.is_none()); // held back
        feed(&mut a, "Q");
        assert_eq!(a.editor.message.as_ref().unwrap().text, "two");

        a.editor.message = None;
        feed(&mut a, "Qx");
        // exact Q fired, then x deleted a char
        assert_eq!(line(&a, 0), "bc");
        assert_eq!(a.editor.message.as_ref().unwrap().text, "one");
    }

    #[test]
    fn test_buffer_local_binding_shadows_global() {
        let mut a = app("abc");
        let buf = a.editor.current_buffer_id();
        a.commands
            .register_user(
                "noop",
                Box::new(|_e: &mut Editor, _inv: &Invocation| Ok(())),
            )
            .unwrap();
        a.keymap.bind_buffer(
            buf,
            Mode::Normal,
            parse_key_sequence("x").unwrap(),
            Binding::new("noop"),
        );
        feed(&mut a, "x");
        // the local binding shadowed delete-char
        assert_eq!(line(&a, 0), "abc");
    }

    #[test]
    fn test_error_resets_pending_state() {
        let mut a = app("abc");
        feed(&mut a, "\"!"); // invalid register name
        assert!(a.editor.message.as_ref().unwrap().is_error);
        assert_eq!(a.input.pending, Pending::None);
        feed(&mut a, "x");
        assert_eq!(line(&a, 0), "bc");
    }

    #[test]
    fn test_cmdline_backspace_past_prompt_cancels() {
        let mut a = app("abc");
        feed(&mut a, ":q");
        feed(&mut a, "<BS><BS>");
        assert_eq!(a.editor.mode, Mode::Normal);
        assert!(!a.editor.should_quit);
    }

    #[test]
    fn test_window_chord() {
        let mut a = app("abc");
        feed(&mut a, "<C-w>s");
        assert_eq!(a.editor.tab.window_order.len(), 2);
        feed(&mut a, "<C-w>q");
        assert_eq!(a.editor.tab.window_order.len(), 1);
    }

    #[test]
    fn test_paste_charwise_after() {
        let mut a = app("hello");
        feed(&mut a, "vly"); // yank "he"
        feed(&mut a, "$p");
        assert_eq!(line(&a, 0), "hellohe");
    }
}
