//! Ex commands: the `:` command line.
//!
//! A registry of named commands with aliases, argument arity checks, and
//! bang handling, plus two forms recognized before dispatch: a bare line
//! number (`:42`) and the whole-file substitute (`:%s/pat/rep/flags`).

use std::collections::HashMap;

use crate::editor::buffer::Position;
use crate::editor::options::SetScope;
use crate::editor::Editor;
use crate::error::{EditorError, Result};
use crate::motion::{self, Motion};

use super::move_cursor;

/// Parsed `:command` input handed to a handler.
#[derive(Debug, Clone)]
pub struct ExInvocation {
    pub args: Vec<String>,
    pub bang: bool,
}

pub type ExFn = Box<dyn Fn(&mut Editor, &ExInvocation) -> Result<()>>;

/// Declared argument arity, validated before the handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nargs {
    Exactly(usize),
    AtMostOne,
    Any,
}

impl Nargs {
    fn accepts(self, n: usize) -> bool {
        match self {
            Nargs::Exactly(want) => n == want,
            Nargs::AtMostOne => n <= 1,
            Nargs::Any => true,
        }
    }
}

struct ExCommand {
    run: ExFn,
    nargs: Nargs,
    bang_allowed: bool,
}

/// Registry of ex commands. Aliases share the command's entry; a name or
/// alias can only be claimed once.
pub struct ExRegistry {
    commands: HashMap<String, ExCommand>,
    aliases: HashMap<String, String>,
}

impl ExRegistry {
    pub fn new() -> Self {
        Self { commands: HashMap::new(), aliases: HashMap::new() }
    }

    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        register_builtins(&mut reg);
        reg
    }

    fn name_taken(&self, name: &str) -> bool {
        self.commands.contains_key(name) || self.aliases.contains_key(name)
    }

    fn insert(
        &mut self,
        name: &str,
        aliases: &[&str],
        nargs: Nargs,
        bang_allowed: bool,
        run: ExFn,
    ) -> Result<()> {
        if self.name_taken(name) {
            return Err(EditorError::DuplicateCommand(name.to_string()));
        }
        for alias in aliases {
            if self.name_taken(alias) {
                return Err(EditorError::DuplicateCommand(alias.to_string()));
            }
        }
        self.commands
            .insert(name.to_string(), ExCommand { run, nargs, bang_allowed });
        for alias in aliases {
            self.aliases.insert(alias.to_string(), name.to_string());
        }
        Ok(())
    }

    fn register_builtin(&mut self, name: &str, aliases: &[&str], nargs: Nargs, bang: bool, run: ExFn) {
        self.insert(name, aliases, nargs, bang, run)
            .expect("builtin ex name collision");
    }

    /// Register a user ex command. Collisions with any existing name or
    /// alias are rejected outright.
    pub fn register_user(
        &mut self,
        name: &str,
        aliases: &[&str],
        nargs: Nargs,
        bang_allowed: bool,
        run: ExFn,
    ) -> Result<()> {
        self.insert(name, aliases, nargs, bang_allowed, run)
    }

    fn resolve(&self, name: &str) -> Option<&ExCommand> {
        if let Some(cmd) = self.commands.get(name) {
            return Some(cmd);
        }
        let canonical = self.aliases.get(name)?;
        self.commands.get(canonical)
    }

    /// Execute one command line, as typed after the `:`.
    pub fn execute(&self, editor: &mut Editor, input: &str) -> Result<()> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }

        // :42 jumps to a line
        if input.chars().all(|c| c.is_ascii_digit()) {
            let n: usize = input
                .parse()
                .map_err(|_| EditorError::BadExSyntax(input.to_string()))?;
            return move_cursor(editor, Motion::GotoLine(n), 1);
        }

        // :%s/pat/rep/flags, recognized ahead of normal dispatch
        if let Some(spec) = SubstituteSpec::parse(input)? {
            return run_substitute(editor, &spec);
        }

        let tokens = tokenize(input)?;
        let (head, args) = tokens.split_first().expect("tokenize never returns empty");
        let (name, bang) = match head.strip_suffix('!') {
            Some(stripped) if !stripped.is_empty() => (stripped, true),
            _ => (head.as_str(), false),
        };

        let cmd = self
            .resolve(name)
            .ok_or_else(|| EditorError::UnknownExCommand(name.to_string()))?;
        if bang && !cmd.bang_allowed {
            return Err(EditorError::BangNotAllowed(name.to_string()));
        }
        if !cmd.nargs.accepts(args.len()) {
            return Err(EditorError::ArgCount(name.to_string()));
        }
        let inv = ExInvocation { args: args.to_vec(), bang };
        (cmd.run)(editor, &inv)
    }
}

impl Default for ExRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Shell-style tokenizer: whitespace separates, quotes group, backslash
/// escapes the next character outside single quotes.
pub fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut cur = String::new();
    let mut in_token = false;
    let mut chars = input.chars();

    #[derive(PartialEq)]
    enum Quote {
        None,
        Single,
        Double,
    }
    let mut quote = Quote::None;

    while let Some(ch) = chars.next() {
        match quote {
            Quote::Single => {
                if ch == '\'' {
                    quote = Quote::None;
                } else {
                    cur.push(ch);
                }
            }
            Quote::Double => match ch {
                '"' => quote = Quote::None,
                '\\' => {
                    let next = chars
                        .next()
                        .ok_or_else(|| EditorError::BadExSyntax("trailing backslash".into()))?;
                    cur.push(next);
                }
                _ => cur.push(ch),
            },
            Quote::None => match ch {
                '\'' => {
                    quote = Quote::Single;
                    in_token = true;
                }
                '"' => {
                    quote = Quote::Double;
                    in_token = true;
                }
                '\\' => {
                    let next = chars
                        .next()
                        .ok_or_else(|| EditorError::BadExSyntax("trailing backslash".into()))?;
                    cur.push(next);
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut cur));
                        in_token = false;
                    }
                }
                c => {
                    cur.push(c);
                    in_token = true;
                }
            },
        }
    }
    if quote != Quote::None {
        return Err(EditorError::BadExSyntax("unterminated quote".into()));
    }
    if in_token {
        tokens.push(cur);
    }
    if tokens.is_empty() {
        return Err(EditorError::BadExSyntax("empty command".into()));
    }
    Ok(tokens)
}

/// A parsed `%s<delim>pattern<delim>replacement<delim>flags`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstituteSpec {
    pub pattern: String,
    pub replacement: String,
    pub global: bool,
}

impl SubstituteSpec {
    /// Returns Ok(None) when `input` is not a substitute at all; Err when it
    /// is one but malformed.
    pub fn parse(input: &str) -> Result<Option<Self>> {
        let rest = match input.strip_prefix("%s") {
            Some(r) => r,
            None => return Ok(None),
        };
        let mut chars = rest.chars();
        let delim = match chars.next() {
            Some(c) if !c.is_alphanumeric() && !c.is_whitespace() && c != '\\' => c,
            _ => return Ok(None),
        };

        // split on unescaped delimiters; \<delim> is a literal
        let mut parts: Vec<String> = vec![String::new()];
        let mut escaped = false;
        for ch in chars {
            if escaped {
                if ch != delim {
                    parts.last_mut().unwrap().push('\\');
                }
                parts.last_mut().unwrap().push(ch);
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == delim {
                parts.push(String::new());
            } else {
                parts.last_mut().unwrap().push(ch);
            }
        }
        if escaped {
            parts.last_mut().unwrap().push('\\');
        }

        if parts.len() > 3 || parts[0].is_empty() {
            return Err(EditorError::BadExSyntax(input.to_string()));
        }
        let pattern = parts[0].clone();
        let replacement = parts.get(1).cloned().unwrap_or_default();
        let flags = parts.get(2).cloned().unwrap_or_default();
        if flags.chars().any(|c| c != 'g') {
            return Err(EditorError::BadExSyntax(format!("unknown flag in {flags}")));
        }
        Ok(Some(Self { pattern, replacement, global: flags.contains('g') }))
    }
}

/// Translate vim-style `\1` group references to the regex crate's `${1}`,
/// protecting literal `$`.
fn regex_replacement(rep: &str) -> String {
    let mut out = String::with_capacity(rep.len());
    let mut chars = rep.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '$' => out.push_str("$$"),
            '\\' => match chars.peek() {
                Some(d) if d.is_ascii_digit() => {
                    out.push_str("${");
                    out.push(chars.next().unwrap());
                    out.push('}');
                }
                Some('\\') => {
                    chars.next();
                    out.push('\\');
                }
                _ => out.push('\\'),
            },
            c => out.push(c),
        }
    }
    out
}

fn run_substitute(editor: &mut Editor, spec: &SubstituteSpec) -> Result<()> {
    let re = regex::Regex::new(&spec.pattern)
        .map_err(|_| EditorError::BadPattern(spec.pattern.clone()))?;
    let rep = regex_replacement(&spec.replacement);

    let total = editor.current_buffer().len_lines();
    let mut new_lines = Vec::with_capacity(total);
    let mut substitutions = 0usize;
    let mut lines_touched = 0usize;
    let mut last_hit = None;

    for idx in 0..total {
        let line = editor.current_buffer().line_text(idx);
        let hits = re.find_iter(&line).count();
        if hits == 0 {
            new_lines.push(line);
            continue;
        }
        let replaced = if spec.global {
            substitutions += hits;
            re.replace_all(&line, rep.as_str()).into_owned()
        } else {
            substitutions += 1;
            re.replace(&line, rep.as_str()).into_owned()
        };
        lines_touched += 1;
        last_hit = Some(idx);
        new_lines.push(replaced);
    }

    if substitutions == 0 {
        return Err(EditorError::PatternNotFound(spec.pattern.clone()));
    }

    let buffer = editor.current_buffer_mut();
    buffer.begin_change_group();
    buffer.replace_all_lines(new_lines)?;
    buffer.end_change_group();

    if let Some(line) = last_hit {
        let col = motion::first_non_blank(editor.current_buffer(), line);
        editor.set_cursor(Position::new(line, col));
    }
    editor.set_message(format!(
        "{substitutions} substitution{} on {lines_touched} line{}",
        if substitutions == 1 { "" } else { "s" },
        if lines_touched == 1 { "" } else { "s" },
    ));
    Ok(())
}

// --- built-in ex commands ---

fn write_current(editor: &mut Editor, path: Option<&str>) -> Result<()> {
    let path = path.map(std::path::Path::new);
    editor.current_buffer_mut().write_to(path)?;
    let name = editor.current_buffer().display_name();
    let lines = editor.current_buffer().len_lines();
    editor.set_message(format!("\"{name}\" {lines}L written"));
    Ok(())
}

fn quit(editor: &mut Editor, force: bool) -> Result<()> {
    if editor.tab.window_order.len() > 1 {
        editor.close_current_window();
        return Ok(());
    }
    if !force && editor.current_buffer().modified {
        return Err(EditorError::UnsavedChanges);
    }
    editor.should_quit = true;
    Ok(())
}

fn edit_file(editor: &mut Editor, path: Option<&str>, force: bool) -> Result<()> {
    match path {
        Some(p) => {
            if editor.current_buffer().modified && !force {
                return Err(EditorError::UnsavedChanges);
            }
            editor.open_file(std::path::PathBuf::from(p))?;
            Ok(())
        }
        None => {
            if editor.current_buffer().modified && !force {
                return Err(EditorError::UnsavedChanges);
            }
            editor.current_buffer_mut().reload_from_file()
        }
    }
}

/// `:set name`, `:set noname`, `:set name=value`, `:set name?`.
fn set_option(editor: &mut Editor, arg: Option<&str>) -> Result<()> {
    let Some(arg) = arg else {
        return Ok(());
    };
    let window = editor.tab.current;
    let buffer = editor.current_buffer_id();

    if let Some(name) = arg.strip_suffix('?') {
        let value = editor.options.get(name, window, buffer)?;
        editor.set_message(format!("{name}={value:?}"));
        return Ok(());
    }
    if let Some((name, value)) = arg.split_once('=') {
        return editor
            .options
            .set_str(name, value, SetScope::Auto, window, buffer);
    }
    if let Some(name) = arg.strip_prefix("no") {
        if editor.options.is_declared(name) {
            return editor
                .options
                .set_str(name, "off", SetScope::Auto, window, buffer);
        }
    }
    editor.options.set_str(arg, "", SetScope::Auto, window, buffer)
}

fn register_builtins(reg: &mut ExRegistry) {
    reg.register_builtin("write", &["w"], Nargs::AtMostOne, true, Box::new(
        |e: &mut Editor, inv: &ExInvocation| write_current(e, inv.args.first().map(String::as_str)),
    ));

    reg.register_builtin("quit", &["q"], Nargs::Exactly(0), true, Box::new(
        |e: &mut Editor, inv: &ExInvocation| quit(e, inv.bang),
    ));

    reg.register_builtin("quitall", &["qa", "qall"], Nargs::Exactly(0), true, Box::new(
        |e: &mut Editor, inv: &ExInvocation| {
            if !inv.bang && e.any_modified() {
                return Err(EditorError::UnsavedChanges);
            }
            e.should_quit = true;
            Ok(())
        },
    ));

    reg.register_builtin("wq", &["x", "xit"], Nargs::AtMostOne, false, Box::new(
        |e: &mut Editor, inv: &ExInvocation| {
            write_current(e, inv.args.first().map(String::as_str))?;
            quit(e, false)
        },
    ));

    reg.register_builtin("edit", &["e"], Nargs::AtMostOne, true, Box::new(
        |e: &mut Editor, inv: &ExInvocation| {
            edit_file(e, inv.args.first().map(String::as_str), inv.bang)
        },
    ));

    reg.register_builtin("bnext", &["bn"], Nargs::Exactly(0), false, Box::new(
        |e: &mut Editor, _inv: &ExInvocation| {
            e.next_buffer();
            Ok(())
        },
    ));

    reg.register_builtin("bprev", &["bp", "bprevious"], Nargs::Exactly(0), false, Box::new(
        |e: &mut Editor, _inv: &ExInvocation| {
            e.prev_buffer();
            Ok(())
        },
    ));

    reg.register_builtin("bdelete", &["bd"], Nargs::Exactly(0), true, Box::new(
        |e: &mut Editor, inv: &ExInvocation| {
            let id = e.current_buffer_id();
            e.delete_buffer(id, inv.bang)
        },
    ));

    reg.register_builtin("set", &["se"], Nargs::AtMostOne, false, Box::new(
        |e: &mut Editor, inv: &ExInvocation| set_option(e, inv.args.first().map(String::as_str)),
    ));

    reg.register_builtin("nohlsearch", &["noh", "nohl"], Nargs::Exactly(0), false, Box::new(
        |e: &mut Editor, _inv: &ExInvocation| {
            e.search.hl = false;
            Ok(())
        },
    ));

    reg.register_builtin("split", &["sp"], Nargs::Exactly(0), false, Box::new(
        |e: &mut Editor, _inv: &ExInvocation| {
            e.split_window();
            Ok(())
        },
    ));

    reg.register_builtin("vsplit", &["vs"], Nargs::Exactly(0), false, Box::new(
        |e: &mut Editor, _inv: &ExInvocation| {
            e.split_window();
            Ok(())
        },
    ));

    reg.register_builtin("only", &["on"], Nargs::Exactly(0), false, Box::new(
        |e: &mut Editor, _inv: &ExInvocation| {
            e.close_other_windows();
            Ok(())
        },
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::register::MemoryClipboard;

    fn ed(content: &str) -> Editor {
        let mut e = Editor::with_clipboard(Box::<MemoryClipboard>::default());
        e.current_buffer_mut()
            .replace_all_lines(content.lines().map(String::from).collect())
            .unwrap();
        e.current_buffer_mut().modified = false;
        e
    }

    #[test]
    fn test_tokenize_quotes_and_escapes() {
        assert_eq!(
            tokenize(r#"edit "my file.txt" plain"#).unwrap(),
            vec!["edit", "my file.txt", "plain"]
        );
        assert_eq!(
            tokenize(r"e file\ with\ spaces").unwrap(),
            vec!["e", "file with spaces"]
        );
        assert_eq!(tokenize("a 'b c' d").unwrap(), vec!["a", "b c", "d"]);
        assert!(tokenize(r#"bad "unterminated"#).is_err());
    }

    #[test]
    fn test_unknown_and_alias() {
        let reg = ExRegistry::with_builtins();
        let mut e = ed("x");
        assert_eq!(
            reg.execute(&mut e, "nonsense"),
            Err(EditorError::UnknownExCommand("nonsense".to_string()))
        );
        // alias resolves to the same command
        reg.execute(&mut e, "noh").unwrap();
        assert!(!e.search.hl);
    }

    #[test]
    fn test_nargs_validation() {
        let reg = ExRegistry::with_builtins();
        let mut e = ed("x");
        assert_eq!(
            reg.execute(&mut e, "q extra args"),
            Err(EditorError::ArgCount("q".to_string()))
        );
    }

    #[test]
    fn test_bang_rejected_where_not_allowed() {
        let reg = ExRegistry::with_builtins();
        let mut e = ed("x");
        assert_eq!(
            reg.execute(&mut e, "set!"),
            Err(EditorError::BangNotAllowed("set".to_string()))
        );
    }

    #[test]
    fn test_user_command_alias_collision() {
        let mut reg = ExRegistry::with_builtins();
        // "w" is taken as an alias of write
        let err = reg.register_user("w", &[], Nargs::Any, false, Box::new(|_, _| Ok(())));
        assert_eq!(err, Err(EditorError::DuplicateCommand("w".to_string())));
        let err =
            reg.register_user("mine", &["bn"], Nargs::Any, false, Box::new(|_, _| Ok(())));
        assert_eq!(err, Err(EditorError::DuplicateCommand("bn".to_string())));
        reg.register_user("mine", &["mn"], Nargs::Any, false, Box::new(|_, _| Ok(())))
            .unwrap();
    }

    #[test]
    fn test_bare_number_goes_to_line() {
        let reg = ExRegistry::with_builtins();
        let mut e = ed("a\nb\nc\nd\ne");
        reg.execute(&mut e, "3").unwrap();
        assert_eq!(e.cursor().line, 2);
        // beyond the end clamps
        reg.execute(&mut e, "99").unwrap();
        assert_eq!(e.cursor().line, 4);
    }

    #[test]
    fn test_substitute_parse() {
        assert_eq!(
            SubstituteSpec::parse("%s/foo/bar/g").unwrap().unwrap(),
            SubstituteSpec { pattern: "foo".into(), replacement: "bar".into(), global: true }
        );
        // alternate delimiter, escaped delim in pattern
        assert_eq!(
            SubstituteSpec::parse(r"%s#a\#b#c#").unwrap().unwrap(),
            SubstituteSpec { pattern: "a#b".into(), replacement: "c".into(), global: false }
        );
        assert_eq!(SubstituteSpec::parse("write").unwrap(), None);
        assert!(SubstituteSpec::parse("%s/a/b/x").is_err());
        assert!(SubstituteSpec::parse("%s//b/").is_err());
    }

    #[test]
    fn test_substitute_first_vs_global() {
        let reg = ExRegistry::with_builtins();
        let mut e = ed("aa bb aa\naa");
        reg.execute(&mut e, "%s/aa/XX/").unwrap();
        assert_eq!(e.current_buffer().line_text(0), "XX bb aa");
        assert_eq!(e.current_buffer().line_text(1), "XX");

        let mut e = ed("aa bb aa\naa");
        reg.execute(&mut e, "%s/aa/XX/g").unwrap();
        assert_eq!(e.current_buffer().line_text(0), "XX bb XX");
        assert_eq!(e.message.as_ref().unwrap().text, "3 substitutions on 2 lines");
    }

    #[test]
    fn test_substitute_is_single_undo_step() {
        let reg = ExRegistry::with_builtins();
        let mut e = ed("x\nx\nx");
        reg.execute(&mut e, "%s/x/y/g").unwrap();
        assert!(e.current_buffer_mut().undo());
        assert_eq!(e.current_buffer().line_text(0), "x");
        assert_eq!(e.current_buffer().line_text(2), "x");
    }

    #[test]
    fn test_substitute_group_reference() {
        let reg = ExRegistry::with_builtins();
        let mut e = ed("name: alice");
        reg.execute(&mut e, r"%s/name: (\w+)/\1/").unwrap();
        assert_eq!(e.current_buffer().line_text(0), "alice");
    }

    #[test]
    fn test_substitute_not_found() {
        let reg = ExRegistry::with_builtins();
        let mut e = ed("hello");
        assert_eq!(
            reg.execute(&mut e, "%s/zzz/y/"),
            Err(EditorError::PatternNotFound("zzz".to_string()))
        );
    }

    #[test]
    fn test_quit_respects_modified() {
        let reg = ExRegistry::with_builtins();
        let mut e = ed("text");
        e.current_buffer_mut().insert_char(Position::new(0, 0), 'x').unwrap();
        assert_eq!(reg.execute(&mut e, "q"), Err(EditorError::UnsavedChanges));
        assert!(!e.should_quit);
        reg.execute(&mut e, "q!").unwrap();
        assert!(e.should_quit);
    }

    #[test]
    fn test_quit_closes_extra_window_first() {
        let reg = ExRegistry::with_builtins();
        let mut e = ed("text");
        e.split_window();
        reg.execute(&mut e, "q").unwrap();
        assert!(!e.should_quit);
        assert_eq!(e.tab.window_order.len(), 1);
    }

    #[test]
    fn test_write_and_wq() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let reg = ExRegistry::with_builtins();
        let mut e = ed("content");
        reg.execute(&mut e, &format!("w {}", path.display())).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "content\n");
        assert!(!e.current_buffer().modified);

        e.current_buffer_mut().insert_char(Position::new(0, 0), '!').unwrap();
        reg.execute(&mut e, "wq").unwrap();
        assert!(e.should_quit);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "!content\n");
    }

    #[test]
    fn test_set_forms() {
        let reg = ExRegistry::with_builtins();
        let mut e = ed("x");
        let (w, b) = (e.tab.current, e.current_buffer_id());

        reg.execute(&mut e, "set number").unwrap();
        assert!(e.options.get("number", w, b).unwrap().as_bool());
        reg.execute(&mut e, "set nonumber").unwrap();
        assert!(!e.options.get("number", w, b).unwrap().as_bool());
        reg.execute(&mut e, "set tabstop=8").unwrap();
        assert_eq!(e.options.get("tabstop", w, b).unwrap().as_int(), 8);
        assert!(reg.execute(&mut e, "set nosuchoption").is_err());
    }

    #[test]
    fn test_bdelete_needs_bang_when_modified() {
        let reg = ExRegistry::with_builtins();
        let mut e = ed("dirty");
        e.current_buffer_mut().insert_char(Position::new(0, 0), 'x').unwrap();
        assert_eq!(reg.execute(&mut e, "bd"), Err(EditorError::UnsavedChanges));
        reg.execute(&mut e, "bd!").unwrap();
    }
}
