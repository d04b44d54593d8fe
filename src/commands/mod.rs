//! The command registry and the built-in editing commands.
//!
//! Every bindable action is a named command taking the editor session and an
//! invocation (args, count, bang, register). The dispatcher resolves keys to
//! command names through the keymap and executes them here; ex commands live
//! in the `ex` submodule with their own registry.

pub mod ex;

use std::collections::HashMap;

use crate::editor::buffer::{normalize, Buffer, Position};
use crate::editor::register::RegisterContent;
use crate::editor::{CmdlineKind, Editor, Mode};
use crate::error::{EditorError, Result};
use crate::input::keys::Key;
use crate::input::Operator;
use crate::motion::textobject::{resolve as resolve_object, ObjectSpan, TextObjectKind};
use crate::motion::{self, Motion, MotionKind, SearchDirection};

/// One resolved command execution: the command name plus everything the
/// modal prefix collected on the way there.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub name: String,
    pub args: Vec<String>,
    pub kwargs: HashMap<String, String>,
    /// Count prefix, always at least 1
    pub count: usize,
    pub bang: bool,
    /// Register selected with a `"x` prefix
    pub register: Option<char>,
    /// The raw keys that produced this invocation (dot-repeat replays them)
    pub keys: Vec<Key>,
}

impl Invocation {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            args: Vec::new(),
            kwargs: HashMap::new(),
            count: 1,
            bang: false,
            register: None,
            keys: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: &[&str]) -> Self {
        self.args = args.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count.max(1);
        self
    }

    pub fn with_register(mut self, register: Option<char>) -> Self {
        self.register = register;
        self
    }

}

pub type CommandFn = Box<dyn Fn(&mut Editor, &Invocation) -> Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    Builtin,
    User,
}

struct Command {
    run: CommandFn,
    source: CommandSource,
}

/// Name -> handler table for modal commands.
pub struct CommandRegistry {
    commands: HashMap<String, Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self { commands: HashMap::new() }
    }

    /// Registry preloaded with every built-in editing command.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        register_builtins(&mut reg);
        reg
    }

    fn register_builtin(&mut self, name: &str, run: CommandFn) {
        self.commands
            .insert(name.to_string(), Command { run, source: CommandSource::Builtin });
    }

    /// Register a user command. Redefining a user command replaces it;
    /// shadowing a built-in is refused.
    pub fn register_user(&mut self, name: &str, run: CommandFn) -> Result<()> {
        if let Some(existing) = self.commands.get(name) {
            if existing.source == CommandSource::Builtin {
                return Err(EditorError::DuplicateCommand(name.to_string()));
            }
        }
        self.commands
            .insert(name.to_string(), Command { run, source: CommandSource::User });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn execute(&self, editor: &mut Editor, inv: &Invocation) -> Result<()> {
        let cmd = self
            .commands
            .get(&inv.name)
            .ok_or_else(|| EditorError::UnknownCommand(inv.name.clone()))?;
        (cmd.run)(editor, inv)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

// --- motions as commands ---

/// Parse a motion from invocation args: a motion name, plus a target char
/// for the find family or a line number for goto-line.
pub fn parse_motion(args: &[String]) -> Result<Motion> {
    let name = args
        .first()
        .map(String::as_str)
        .ok_or_else(|| EditorError::ArgCount("move".to_string()))?;
    let target = || -> Result<char> {
        args.get(1)
            .and_then(|s| s.chars().next())
            .ok_or_else(|| EditorError::ArgCount(name.to_string()))
    };
    let motion = match name {
        "left" => Motion::Left,
        "right" => Motion::Right,
        "up" => Motion::Up,
        "down" => Motion::Down,
        "word-forward" => Motion::WordForward,
        "word-backward" => Motion::WordBackward,
        "word-end" => Motion::WordEnd,
        "big-word-forward" => Motion::BigWordForward,
        "big-word-backward" => Motion::BigWordBackward,
        "big-word-end" => Motion::BigWordEnd,
        "line-start" => Motion::LineStart,
        "first-non-blank" => Motion::FirstNonBlank,
        "line-end" => Motion::LineEnd,
        "file-start" => Motion::FileStart,
        "file-end" => Motion::FileEnd,
        "goto-line" => {
            let n: usize = args
                .get(1)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| EditorError::ArgCount(name.to_string()))?;
            Motion::GotoLine(n)
        }
        "half-page-down" => Motion::HalfPageDown,
        "half-page-up" => Motion::HalfPageUp,
        "page-down" => Motion::PageDown,
        "page-up" => Motion::PageUp,
        "find-char" => Motion::FindChar(target()?),
        "find-char-back" => Motion::FindCharBack(target()?),
        "till-char" => Motion::TillChar(target()?),
        "till-char-back" => Motion::TillCharBack(target()?),
        "paragraph-forward" => Motion::ParagraphForward,
        "paragraph-backward" => Motion::ParagraphBackward,
        "matching-bracket" => Motion::MatchingBracket,
        other => return Err(EditorError::UnknownCommand(other.to_string())),
    };
    Ok(motion)
}

fn is_jump_motion(motion: Motion) -> bool {
    matches!(
        motion,
        Motion::FileStart
            | Motion::FileEnd
            | Motion::GotoLine(_)
            | Motion::ParagraphForward
            | Motion::ParagraphBackward
            | Motion::MatchingBracket
    )
}

fn is_vertical(motion: Motion) -> bool {
    matches!(
        motion,
        Motion::Up | Motion::Down | Motion::HalfPageDown | Motion::HalfPageUp
            | Motion::PageDown
            | Motion::PageUp
    )
}

/// Move the cursor by a motion. Jump-class motions record the jumplist;
/// vertical motions keep the preferred column.
pub fn move_cursor(editor: &mut Editor, motion: Motion, count: usize) -> Result<()> {
    let pos = editor.cursor();
    let rows = editor.text_rows;
    let target = {
        let buffer = editor.current_buffer();
        motion::apply(buffer, motion, pos, count, rows)
    };
    let Some(mut target) = target else {
        return Ok(()); // failed motion (find-char miss): cursor stays put
    };

    if is_jump_motion(motion) {
        editor.push_jump();
    }

    if is_vertical(motion) {
        let len = editor.current_buffer().line_len(target.line);
        target.col = editor.current_window().target_col(len);
        editor.current_window_mut().cursor = target;
    } else {
        editor.current_window_mut().cursor = target;
        editor.clamp_cursor();
        editor.current_window_mut().save_preferred_col();
    }

    if motion == Motion::FirstNonBlank || matches!(motion, Motion::GotoLine(_)) {
        let line = editor.cursor().line;
        let col = motion::first_non_blank(editor.current_buffer(), line);
        editor.current_window_mut().cursor.col = col;
    }
    let off = editor.scroll_off();
    let rows = editor.text_rows;
    editor.current_window_mut().scroll_to_cursor(rows, off);
    Ok(())
}

// --- operators ---

/// Position one step after `pos` in stream order, for inclusive spans.
fn stream_after(buffer: &Buffer, pos: Position) -> Position {
    if pos.col < buffer.line_len(pos.line) {
        Position::new(pos.line, pos.col + 1)
    } else if pos.line + 1 < buffer.len_lines() {
        Position::new(pos.line + 1, 0)
    } else {
        Position::new(pos.line, buffer.line_len(pos.line))
    }
}

fn lines_text(buffer: &Buffer, start: usize, end: usize) -> String {
    let mut out = String::new();
    for l in start..=end {
        out.push_str(&buffer.line_text(l));
        out.push('\n');
    }
    out
}

fn delete_lines(buffer: &mut Buffer, start: usize, end: usize) -> Result<()> {
    for _ in start..=end.min(buffer.len_lines().saturating_sub(1)) {
        buffer.delete_line(start)?;
    }
    Ok(())
}

fn record_yank(editor: &mut Editor, register: Option<char>, content: RegisterContent) {
    editor.registers.yank(register, content);
}

fn record_delete(editor: &mut Editor, register: Option<char>, content: RegisterContent) {
    let is_small = !content.is_linewise() && !content.text.contains('\n');
    editor.registers.delete(register, content, is_small);
}

/// Apply an operator over a motion (`d2w`, `y$`, `cf)` ...). A failed motion
/// aborts the whole edit without touching the buffer.
pub fn operator_motion(
    editor: &mut Editor,
    op: Operator,
    motion: Motion,
    count: usize,
    register: Option<char>,
) -> Result<()> {
    // cw on a word acts like ce, a quirk old enough to be load-bearing
    let motion = match (op, motion) {
        (Operator::Change, Motion::WordForward) => Motion::WordEnd,
        (Operator::Change, Motion::BigWordForward) => Motion::BigWordEnd,
        (_, m) => m,
    };

    let pos = editor.cursor();
    let rows = editor.text_rows;
    let target = {
        let buffer = editor.current_buffer();
        motion::apply(buffer, motion, pos, count, rows)
    };
    let Some(target) = target else {
        return Ok(());
    };

    match motion.kind() {
        MotionKind::Linewise => {
            let (a, b) = (pos.line.min(target.line), pos.line.max(target.line));
            operator_line_range(editor, op, a, b, register)
        }
        MotionKind::Inclusive => {
            let (start, end) = normalize(pos, target);
            let end = stream_after(editor.current_buffer(), end);
            operator_char_span(editor, op, start, end, register)
        }
        MotionKind::Exclusive => {
            let (start, end) = normalize(pos, target);
            operator_char_span(editor, op, start, end, register)
        }
    }
}

/// Doubled operator: dd, yy, cc over `count` lines.
pub fn operator_lines(
    editor: &mut Editor,
    op: Operator,
    count: usize,
    register: Option<char>,
) -> Result<()> {
    let start = editor.cursor().line;
    let last = editor.current_buffer().len_lines().saturating_sub(1);
    let end = (start + count.max(1) - 1).min(last);
    operator_line_range(editor, op, start, end, register)
}

/// Apply an operator over a text object (`diw`, `ya(` ...).
pub fn operator_object(
    editor: &mut Editor,
    op: Operator,
    kind: TextObjectKind,
    around: bool,
    register: Option<char>,
) -> Result<()> {
    let pos = editor.cursor();
    let span = resolve_object(editor.current_buffer(), pos, kind, around);
    match span {
        Some(ObjectSpan::Chars(start, end)) => {
            operator_char_span(editor, op, start, end, register)
        }
        Some(ObjectSpan::Lines(start, end)) => {
            operator_line_range(editor, op, start, end, register)
        }
        None => Ok(()), // object absent at cursor: silent no-op
    }
}

fn operator_char_span(
    editor: &mut Editor,
    op: Operator,
    start: Position,
    end: Position,
    register: Option<char>,
) -> Result<()> {
    let text = editor.current_buffer().span_text(start, end);
    if text.is_empty() && op != Operator::Change {
        return Ok(());
    }
    let content = RegisterContent::charwise(text);
    match op {
        Operator::Yank => {
            record_yank(editor, register, content);
            editor.set_cursor(start);
        }
        Operator::Delete => {
            record_delete(editor, register, content);
            let buffer = editor.current_buffer_mut();
            buffer.begin_change_group();
            buffer.delete_span(start, end)?;
            buffer.end_change_group();
            editor.set_cursor(start);
        }
        Operator::Change => {
            record_delete(editor, register, content);
            let buffer = editor.current_buffer_mut();
            buffer.begin_change_group();
            buffer.delete_span(start, end)?;
            // group stays open: the insert session that follows belongs to
            // the same undo step, closed when insert mode exits
            editor.set_mode(Mode::Insert);
            editor.set_cursor(start);
        }
    }
    Ok(())
}

fn operator_line_range(
    editor: &mut Editor,
    op: Operator,
    start: usize,
    end: usize,
    register: Option<char>,
) -> Result<()> {
    let last = editor.current_buffer().len_lines().saturating_sub(1);
    let (start, end) = (start.min(last), end.min(last));
    let text = lines_text(editor.current_buffer(), start, end);
    let content = RegisterContent::linewise(text);

    match op {
        Operator::Yank => {
            record_yank(editor, register, content);
            editor.set_cursor(Position::new(start, editor.cursor().col));
        }
        Operator::Delete => {
            record_delete(editor, register, content);
            let buffer = editor.current_buffer_mut();
            buffer.begin_change_group();
            delete_lines(buffer, start, end)?;
            buffer.end_change_group();
            let line = start.min(editor.current_buffer().len_lines().saturating_sub(1));
            let col = motion::first_non_blank(editor.current_buffer(), line);
            editor.set_cursor(Position::new(line, col));
        }
        Operator::Change => {
            record_delete(editor, register, content);
            let buffer = editor.current_buffer_mut();
            buffer.begin_change_group();
            delete_lines(buffer, start, end)?;
            // changing lines leaves an empty line open for typing
            let at = Position::new(start.min(buffer.len_lines().saturating_sub(1)), 0);
            buffer.insert_newline(Position::new(at.line, 0))?;
            editor.set_mode(Mode::Insert);
            editor.set_cursor(Position::new(start, 0));
        }
    }
    Ok(())
}

// --- visual mode ---

/// The active visual selection as a span: char span for v, line range for V.
fn visual_span(editor: &Editor) -> Option<ObjectSpan> {
    let anchor = editor.visual?.anchor;
    let cursor = editor.cursor();
    match editor.mode {
        Mode::Visual => {
            let (start, end) = normalize(anchor, cursor);
            Some(ObjectSpan::Chars(start, stream_after(editor.current_buffer(), end)))
        }
        Mode::VisualLine => {
            let (a, b) = (anchor.line.min(cursor.line), anchor.line.max(cursor.line));
            Some(ObjectSpan::Lines(a, b))
        }
        _ => None,
    }
}

pub fn visual_operator(editor: &mut Editor, op: Operator, register: Option<char>) -> Result<()> {
    let Some(span) = visual_span(editor) else {
        return Ok(());
    };
    editor.set_mode(Mode::Normal);
    match span {
        ObjectSpan::Chars(start, end) => operator_char_span(editor, op, start, end, register),
        ObjectSpan::Lines(start, end) => operator_line_range(editor, op, start, end, register),
    }
}

// --- paste ---

pub fn paste(editor: &mut Editor, after: bool, count: usize, register: Option<char>) -> Result<()> {
    let Some(content) = editor.registers.get(register) else {
        if let Some(r) = register {
            return Err(EditorError::InvalidRegister(r));
        }
        return Ok(()); // nothing ever yanked
    };
    let count = count.max(1);
    let cursor = editor.cursor();

    if content.is_linewise() {
        let body: String = content.text.repeat(count);
        let buffer = editor.current_buffer_mut();
        buffer.begin_change_group();
        let at = if after { cursor.line + 1 } else { cursor.line };
        let landing;
        if after && at >= buffer.len_lines() {
            // pasting below the last line: append, newline first
            let last = buffer.len_lines().saturating_sub(1);
            let end = Position::new(last, buffer.line_len(last));
            let mut text = String::from("\n");
            text.push_str(body.trim_end_matches('\n'));
            buffer.insert_text(end, &text)?;
            landing = last + 1;
        } else {
            buffer.insert_text(Position::new(at, 0), &body)?;
            landing = at;
        }
        buffer.end_change_group();
        let col = motion::first_non_blank(editor.current_buffer(), landing);
        editor.set_cursor(Position::new(landing, col));
    } else {
        let body: String = content.text.repeat(count);
        let line_len = editor.current_buffer().line_len(cursor.line);
        let col = if after && line_len > 0 { cursor.col + 1 } else { cursor.col };
        let at = Position::new(cursor.line, col.min(line_len));
        let buffer = editor.current_buffer_mut();
        buffer.begin_change_group();
        buffer.insert_text(at, &body)?;
        buffer.end_change_group();
        if body.contains('\n') {
            editor.set_cursor(at);
        } else {
            let chars = body.chars().count();
            editor.set_cursor(Position::new(at.line, at.col + chars.saturating_sub(1)));
        }
    }
    Ok(())
}

// --- small edits ---

/// x / X: delete `count` characters under (or before) the cursor into a
/// register.
pub fn delete_chars(
    editor: &mut Editor,
    before: bool,
    count: usize,
    register: Option<char>,
) -> Result<()> {
    let cursor = editor.cursor();
    let line_len = editor.current_buffer().line_len(cursor.line);
    let (start, end) = if before {
        let s = cursor.col.saturating_sub(count);
        (Position::new(cursor.line, s), cursor)
    } else {
        let e = (cursor.col + count).min(line_len);
        (cursor, Position::new(cursor.line, e))
    };
    if start == end {
        return Ok(());
    }
    let text = editor.current_buffer().span_text(start, end);
    record_delete(editor, register, RegisterContent::charwise(text));
    let buffer = editor.current_buffer_mut();
    buffer.begin_change_group();
    buffer.delete_span(start, end)?;
    buffer.end_change_group();
    editor.set_cursor(start);
    Ok(())
}

/// r: replace `count` characters with one character. Fails silently when the
/// line is too short, leaving the buffer untouched.
pub fn replace_char(editor: &mut Editor, ch: char, count: usize) -> Result<()> {
    let cursor = editor.cursor();
    let line_len = editor.current_buffer().line_len(cursor.line);
    if cursor.col + count > line_len {
        return Ok(());
    }
    let end = Position::new(cursor.line, cursor.col + count);
    let replacement: String = std::iter::repeat(ch).take(count).collect();
    let buffer = editor.current_buffer_mut();
    buffer.begin_change_group();
    buffer.delete_span(cursor, end)?;
    buffer.insert_text(cursor, &replacement)?;
    buffer.end_change_group();
    editor.set_cursor(Position::new(cursor.line, cursor.col + count - 1));
    Ok(())
}

/// J: join `count` lines onto the current one with a single space.
pub fn join_lines(editor: &mut Editor, count: usize) -> Result<()> {
    let joins = count.max(2) - 1;
    let line = editor.cursor().line;
    let buffer = editor.current_buffer_mut();
    buffer.begin_change_group();
    let mut seam = 0;
    for _ in 0..joins {
        if line + 1 >= buffer.len_lines() {
            break;
        }
        let upper = buffer.line_text(line);
        let lower = buffer.line_text(line + 1);
        seam = upper.chars().count();
        let trimmed = lower.trim_start();
        let mut joined = upper;
        if !joined.is_empty() && !trimmed.is_empty() {
            joined.push(' ');
        }
        joined.push_str(trimmed);
        buffer.delete_line(line + 1)?;
        let end = Position::new(line, buffer.line_len(line));
        buffer.delete_span(Position::new(line, 0), end)?;
        buffer.insert_text(Position::new(line, 0), &joined)?;
    }
    buffer.end_change_group();
    editor.set_cursor(Position::new(line, seam));
    Ok(())
}

// --- search ---

fn compile_pattern(editor: &Editor, pattern: &str) -> Result<regex::Regex> {
    let ignorecase = editor
        .options
        .get("ignorecase", editor.tab.current, editor.current_buffer_id())
        .map(|v| v.as_bool())
        .unwrap_or(false);
    let source = if ignorecase { format!("(?i){pattern}") } else { pattern.to_string() };
    regex::Regex::new(&source).map_err(|_| EditorError::BadPattern(pattern.to_string()))
}

/// Run a fresh search (the cmdline accept path): store the pattern and jump
/// to the first match.
pub fn execute_search(
    editor: &mut Editor,
    pattern: &str,
    direction: SearchDirection,
) -> Result<()> {
    if pattern.is_empty() {
        return Ok(());
    }
    editor.search.pattern = Some(pattern.to_string());
    editor.search.direction = direction;
    editor.search.hl = true;
    search_step(editor, direction)
}

/// n / N: repeat the last search, optionally reversed.
pub fn search_again(editor: &mut Editor, reverse: bool) -> Result<()> {
    let direction = match (editor.search.direction, reverse) {
        (SearchDirection::Forward, false) | (SearchDirection::Backward, true) => {
            SearchDirection::Forward
        }
        _ => SearchDirection::Backward,
    };
    search_step(editor, direction)
}

fn search_step(editor: &mut Editor, direction: SearchDirection) -> Result<()> {
    let pattern = editor
        .search
        .pattern
        .clone()
        .ok_or_else(|| EditorError::PatternNotFound(String::new()))?;
    let re = compile_pattern(editor, &pattern)?;
    let pos = editor.cursor();
    let hit = motion::find_match(editor.current_buffer(), &re, pos, direction)
        .ok_or(EditorError::PatternNotFound(pattern))?;
    editor.push_jump();
    editor.set_cursor(hit);
    Ok(())
}

// --- insert-mode entries ---

/// All insert entries open a change group; the dispatcher closes it when
/// insert mode exits, so one insert session is one undo step.
fn enter_insert_at(editor: &mut Editor, pos: Position) {
    editor.current_buffer_mut().begin_change_group();
    editor.set_mode(Mode::Insert);
    editor.set_cursor(pos);
}

fn open_line(editor: &mut Editor, below: bool) -> Result<()> {
    let cursor = editor.cursor();
    let buffer = editor.current_buffer_mut();
    buffer.begin_change_group();
    let line = if below {
        let at = Position::new(cursor.line, buffer.line_len(cursor.line));
        buffer.insert_newline(at)?;
        cursor.line + 1
    } else {
        buffer.insert_newline(Position::new(cursor.line, 0))?;
        cursor.line
    };
    editor.set_mode(Mode::Insert);
    editor.set_cursor(Position::new(line, 0));
    Ok(())
}

// --- built-in registration ---

fn register_builtins(reg: &mut CommandRegistry) {
    macro_rules! builtin {
        ($name:expr, $body:expr) => {
            reg.register_builtin($name, Box::new($body));
        };
    }

    builtin!("move", |e: &mut Editor, inv: &Invocation| {
        let motion = parse_motion(&inv.args)?;
        move_cursor(e, motion, inv.count)
    });

    builtin!("goto-first-line", |e: &mut Editor, inv: &Invocation| {
        move_cursor(e, Motion::GotoLine(inv.count), 1)
    });

    builtin!("goto-last-line", |e: &mut Editor, inv: &Invocation| {
        if inv.count > 1 {
            move_cursor(e, Motion::GotoLine(inv.count), 1)
        } else {
            move_cursor(e, Motion::FileEnd, 1)
        }
    });

    builtin!("delete-char", |e: &mut Editor, inv: &Invocation| {
        delete_chars(e, false, inv.count, inv.register)
    });
    builtin!("delete-char-back", |e: &mut Editor, inv: &Invocation| {
        delete_chars(e, true, inv.count, inv.register)
    });

    builtin!("paste-after", |e: &mut Editor, inv: &Invocation| {
        paste(e, true, inv.count, inv.register)
    });
    builtin!("paste-before", |e: &mut Editor, inv: &Invocation| {
        paste(e, false, inv.count, inv.register)
    });

    builtin!("join-lines", |e: &mut Editor, inv: &Invocation| join_lines(e, inv.count));

    builtin!("undo", |e: &mut Editor, inv: &Invocation| {
        for _ in 0..inv.count {
            if !e.current_buffer_mut().undo() {
                e.set_message("Already at oldest change");
                break;
            }
        }
        e.clamp_cursor();
        Ok(())
    });
    builtin!("redo", |e: &mut Editor, inv: &Invocation| {
        for _ in 0..inv.count {
            if !e.current_buffer_mut().redo() {
                e.set_message("Already at newest change");
                break;
            }
        }
        e.clamp_cursor();
        Ok(())
    });

    // insert-mode entries
    builtin!("insert-mode", |e: &mut Editor, _inv: &Invocation| {
        let pos = e.cursor();
        enter_insert_at(e, pos);
        Ok(())
    });
    builtin!("insert-line-start", |e: &mut Editor, _inv: &Invocation| {
        let line = e.cursor().line;
        let col = motion::first_non_blank(e.current_buffer(), line);
        enter_insert_at(e, Position::new(line, col));
        Ok(())
    });
    builtin!("append", |e: &mut Editor, _inv: &Invocation| {
        let c = e.cursor();
        let len = e.current_buffer().line_len(c.line);
        enter_insert_at(e, Position::new(c.line, (c.col + 1).min(len)));
        Ok(())
    });
    builtin!("append-line-end", |e: &mut Editor, _inv: &Invocation| {
        let c = e.cursor();
        let len = e.current_buffer().line_len(c.line);
        enter_insert_at(e, Position::new(c.line, len));
        Ok(())
    });
    builtin!("open-below", |e: &mut Editor, _inv: &Invocation| open_line(e, true));
    builtin!("open-above", |e: &mut Editor, _inv: &Invocation| open_line(e, false));

    // visual mode
    builtin!("visual-mode", |e: &mut Editor, _inv: &Invocation| {
        e.enter_visual(false);
        Ok(())
    });
    builtin!("visual-line-mode", |e: &mut Editor, _inv: &Invocation| {
        e.enter_visual(true);
        Ok(())
    });
    builtin!("visual-delete", |e: &mut Editor, inv: &Invocation| {
        visual_operator(e, Operator::Delete, inv.register)
    });
    builtin!("visual-yank", |e: &mut Editor, inv: &Invocation| {
        visual_operator(e, Operator::Yank, inv.register)
    });
    builtin!("visual-change", |e: &mut Editor, inv: &Invocation| {
        visual_operator(e, Operator::Change, inv.register)
    });

    // command line and search
    builtin!("cmdline-ex", |e: &mut Editor, _inv: &Invocation| {
        e.enter_cmdline(CmdlineKind::Ex);
        Ok(())
    });
    builtin!("search-forward", |e: &mut Editor, _inv: &Invocation| {
        e.enter_cmdline(CmdlineKind::SearchForward);
        Ok(())
    });
    builtin!("search-backward", |e: &mut Editor, _inv: &Invocation| {
        e.enter_cmdline(CmdlineKind::SearchBackward);
        Ok(())
    });
    builtin!("search-next", |e: &mut Editor, _inv: &Invocation| search_again(e, false));
    builtin!("search-prev", |e: &mut Editor, _inv: &Invocation| search_again(e, true));

    // jumps and windows
    builtin!("jump-back", |e: &mut Editor, _inv: &Invocation| {
        e.jump_back();
        Ok(())
    });
    builtin!("jump-forward", |e: &mut Editor, _inv: &Invocation| {
        e.jump_forward();
        Ok(())
    });
    builtin!("window-next", |e: &mut Editor, _inv: &Invocation| {
        e.focus_next_window();
        Ok(())
    });
    builtin!("window-split", |e: &mut Editor, _inv: &Invocation| {
        e.split_window();
        Ok(())
    });
    builtin!("window-close", |e: &mut Editor, _inv: &Invocation| {
        if !e.close_current_window() {
            e.should_quit = true;
        }
        Ok(())
    });
    builtin!("window-only", |e: &mut Editor, _inv: &Invocation| {
        e.close_other_windows();
        Ok(())
    });

    builtin!("buffer-next", |e: &mut Editor, _inv: &Invocation| {
        e.next_buffer();
        Ok(())
    });
    builtin!("buffer-prev", |e: &mut Editor, _inv: &Invocation| {
        e.prev_buffer();
        Ok(())
    });
}
