//! Text objects: the ranges behind `iw`, `a"`, `i(` and friends.
//!
//! Resolution is pure; operators receive the span and decide what to do with
//! it. Character spans are end-exclusive in stream order, line spans are
//! inclusive line ranges.

use crate::editor::buffer::{Buffer, Position};
use crate::motion::{is_blank_line, scan_bracket_backward, scan_bracket_forward};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextObjectKind {
    Word,
    BigWord,
    DoubleQuote,
    SingleQuote,
    Backtick,
    Paren,
    Brace,
    Bracket,
    Angle,
    Paragraph,
}

impl TextObjectKind {
    /// Map the key typed after `i`/`a` to an object.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'w' => Some(Self::Word),
            'W' => Some(Self::BigWord),
            '"' => Some(Self::DoubleQuote),
            '\'' => Some(Self::SingleQuote),
            '`' => Some(Self::Backtick),
            '(' | ')' | 'b' => Some(Self::Paren),
            '{' | '}' | 'B' => Some(Self::Brace),
            '[' | ']' => Some(Self::Bracket),
            '<' | '>' => Some(Self::Angle),
            'p' => Some(Self::Paragraph),
            _ => None,
        }
    }
}

/// A resolved object range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectSpan {
    /// Character span, end-exclusive
    Chars(Position, Position),
    /// Inclusive line range
    Lines(usize, usize),
}

/// Resolve a text object at the cursor. `around` selects the "a" variant
/// (delimiters / surrounding whitespace included). None means the object does
/// not exist here, which the dispatcher treats as a failed edit.
pub fn resolve(
    buffer: &Buffer,
    pos: Position,
    kind: TextObjectKind,
    around: bool,
) -> Option<ObjectSpan> {
    match kind {
        TextObjectKind::Word => word_object(buffer, pos, around, false),
        TextObjectKind::BigWord => word_object(buffer, pos, around, true),
        TextObjectKind::DoubleQuote => quote_object(buffer, pos, '"', around),
        TextObjectKind::SingleQuote => quote_object(buffer, pos, '\'', around),
        TextObjectKind::Backtick => quote_object(buffer, pos, '`', around),
        TextObjectKind::Paren => bracket_object(buffer, pos, '(', ')', around),
        TextObjectKind::Brace => bracket_object(buffer, pos, '{', '}', around),
        TextObjectKind::Bracket => bracket_object(buffer, pos, '[', ']', around),
        TextObjectKind::Angle => bracket_object(buffer, pos, '<', '>', around),
        TextObjectKind::Paragraph => paragraph_object(buffer, pos, around),
    }
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum Class {
    Space,
    Word,
    Punct,
}

fn class_of(ch: char, big: bool) -> Class {
    if ch.is_whitespace() {
        Class::Space
    } else if big || ch.is_alphanumeric() || ch == '_' {
        Class::Word
    } else {
        Class::Punct
    }
}

/// `iw`/`aw`: the run of same-class characters under the cursor; "around"
/// absorbs trailing whitespace, or leading whitespace when there is none
/// trailing.
fn word_object(buffer: &Buffer, pos: Position, around: bool, big: bool) -> Option<ObjectSpan> {
    let line = buffer.line_text(pos.line);
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return None;
    }
    let col = pos.col.min(chars.len() - 1);
    let class = class_of(chars[col], big);

    let mut start = col;
    while start > 0 && class_of(chars[start - 1], big) == class {
        start -= 1;
    }
    let mut end = col + 1;
    while end < chars.len() && class_of(chars[end], big) == class {
        end += 1;
    }

    if around && class != Class::Space {
        let trail_start = end;
        while end < chars.len() && chars[end].is_whitespace() {
            end += 1;
        }
        if end == trail_start {
            while start > 0 && chars[start - 1].is_whitespace() {
                start -= 1;
            }
        }
    }

    Some(ObjectSpan::Chars(
        Position::new(pos.line, start),
        Position::new(pos.line, end),
    ))
}

/// Quote objects stay on the cursor line. Unescaped quotes pair up left to
/// right; the pair containing the cursor wins, falling back to the first pair
/// opening after it.
fn quote_object(buffer: &Buffer, pos: Position, quote: char, around: bool) -> Option<ObjectSpan> {
    let line = buffer.line_text(pos.line);
    let chars: Vec<char> = line.chars().collect();

    let mut quotes = Vec::new();
    let mut escaped = false;
    for (i, &ch) in chars.iter().enumerate() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            quotes.push(i);
        }
    }

    let mut chosen = None;
    for pair in quotes.chunks_exact(2) {
        let (open, close) = (pair[0], pair[1]);
        if pos.col <= close {
            chosen = Some((open, close));
            break;
        }
    }
    let (open, close) = chosen?;

    if around {
        // include both quotes plus trailing whitespace
        let mut end = close + 1;
        while end < chars.len() && chars[end].is_whitespace() {
            end += 1;
        }
        Some(ObjectSpan::Chars(
            Position::new(pos.line, open),
            Position::new(pos.line, end),
        ))
    } else {
        Some(ObjectSpan::Chars(
            Position::new(pos.line, open + 1),
            Position::new(pos.line, close),
        ))
    }
}

/// Bracket objects search the whole buffer for the innermost enclosing pair.
fn bracket_object(
    buffer: &Buffer,
    pos: Position,
    open: char,
    close: char,
    around: bool,
) -> Option<ObjectSpan> {
    // A cursor sitting on a delimiter counts as inside that pair.
    let (open_pos, close_pos) = match buffer.char_at(pos) {
        Some(ch) if ch == open => (pos, scan_bracket_forward(buffer, pos, open, close)?),
        Some(ch) if ch == close => (scan_bracket_backward(buffer, pos, open, close)?, pos),
        _ => {
            // Seed the depth scans as if standing just inside a pair.
            let open_pos = scan_backward_enclosing(buffer, pos, open, close)?;
            let close_pos = scan_bracket_forward(buffer, open_pos, open, close)?;
            if close_pos < pos {
                return None;
            }
            (open_pos, close_pos)
        }
    };

    if around {
        let end = Position::new(
            close_pos.line,
            close_pos.col + 1,
        );
        Some(ObjectSpan::Chars(open_pos, end))
    } else {
        // exclusive end at the closing delimiter; empty pair yields an
        // empty span, which operators treat as a no-op edit
        let start = next_stream_pos(buffer, open_pos);
        Some(ObjectSpan::Chars(start, close_pos))
    }
}

fn next_stream_pos(buffer: &Buffer, pos: Position) -> Position {
    if pos.col < buffer.line_len(pos.line) {
        Position::new(pos.line, pos.col + 1)
    } else if pos.line + 1 < buffer.len_lines() {
        Position::new(pos.line + 1, 0)
    } else {
        pos
    }
}

/// Walk backward for the unbalanced `open` enclosing `from`.
fn scan_backward_enclosing(
    buffer: &Buffer,
    from: Position,
    open: char,
    close: char,
) -> Option<Position> {
    let mut depth = 1i32;
    let mut p = from;
    loop {
        p = prev_stream_pos(buffer, p)?;
        if let Some(ch) = buffer.char_at(p) {
            if ch == close {
                depth += 1;
            } else if ch == open {
                depth -= 1;
                if depth == 0 {
                    return Some(p);
                }
            }
        }
    }
}

fn prev_stream_pos(buffer: &Buffer, pos: Position) -> Option<Position> {
    if pos.col > 0 {
        Some(Position::new(pos.line, pos.col - 1))
    } else if pos.line > 0 {
        Some(Position::new(pos.line - 1, buffer.line_len(pos.line - 1)))
    } else {
        None
    }
}

/// `ip`/`ap`: the maximal run of lines sharing the cursor line's blankness.
/// "Around" a non-blank paragraph absorbs the following blank run, or the
/// preceding one when the paragraph ends the buffer.
fn paragraph_object(buffer: &Buffer, pos: Position, around: bool) -> Option<ObjectSpan> {
    let total = buffer.len_lines();
    let blank = is_blank_line(buffer, pos.line);

    let mut start = pos.line;
    while start > 0 && is_blank_line(buffer, start - 1) == blank {
        start -= 1;
    }
    let mut end = pos.line;
    while end + 1 < total && is_blank_line(buffer, end + 1) == blank {
        end += 1;
    }

    if around && !blank {
        let trail_start = end;
        while end + 1 < total && is_blank_line(buffer, end + 1) {
            end += 1;
        }
        if end == trail_start {
            while start > 0 && is_blank_line(buffer, start - 1) {
                start -= 1;
            }
        }
    }

    Some(ObjectSpan::Lines(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::buffer::BufferId;

    fn buf(content: &str) -> Buffer {
        let mut b = Buffer::new(BufferId(1));
        b.replace_all_lines(content.lines().map(String::from).collect()).unwrap();
        b
    }

    fn chars(span: ObjectSpan) -> (Position, Position) {
        match span {
            ObjectSpan::Chars(a, b) => (a, b),
            ObjectSpan::Lines(..) => panic!("expected char span"),
        }
    }

    #[test]
    fn test_inner_word() {
        let b = buf("foo bar baz");
        let (s, e) = chars(resolve(&b, Position::new(0, 5), TextObjectKind::Word, false).unwrap());
        assert_eq!((s.col, e.col), (4, 7));
    }

    #[test]
    fn test_around_word_takes_trailing_whitespace() {
        let b = buf("foo bar  baz");
        let (s, e) = chars(resolve(&b, Position::new(0, 5), TextObjectKind::Word, true).unwrap());
        assert_eq!((s.col, e.col), (4, 9));
    }

    #[test]
    fn test_around_word_falls_back_to_leading_whitespace() {
        let b = buf("foo  bar");
        let (s, e) = chars(resolve(&b, Position::new(0, 6), TextObjectKind::Word, true).unwrap());
        assert_eq!((s.col, e.col), (3, 8));
    }

    #[test]
    fn test_inner_quotes_skip_escaped() {
        let b = buf(r#"say "hi \"there\"" now"#);
        let (s, e) =
            chars(resolve(&b, Position::new(0, 8), TextObjectKind::DoubleQuote, false).unwrap());
        assert_eq!((s.col, e.col), (5, 17));
    }

    #[test]
    fn test_quote_ahead_of_cursor() {
        let b = buf("x = 'val'");
        let (s, e) =
            chars(resolve(&b, Position::new(0, 0), TextObjectKind::SingleQuote, false).unwrap());
        assert_eq!((s.col, e.col), (5, 8));
    }

    #[test]
    fn test_inner_brackets_multiline() {
        let b = buf("call(\n  arg,\n)");
        let (s, e) = chars(resolve(&b, Position::new(1, 3), TextObjectKind::Paren, false).unwrap());
        assert_eq!(s, Position::new(0, 5));
        assert_eq!(e, Position::new(2, 0));
    }

    #[test]
    fn test_nested_brackets_pick_innermost() {
        let b = buf("(a (b) c)");
        let (s, e) = chars(resolve(&b, Position::new(0, 4), TextObjectKind::Paren, false).unwrap());
        assert_eq!((s.col, e.col), (4, 5));
        let (s, e) = chars(resolve(&b, Position::new(0, 7), TextObjectKind::Paren, true).unwrap());
        assert_eq!((s.col, e.col), (0, 9));
    }

    #[test]
    fn test_bracket_object_absent() {
        let b = buf("no brackets here");
        assert!(resolve(&b, Position::new(0, 3), TextObjectKind::Paren, false).is_none());
    }

    #[test]
    fn test_paragraph_object() {
        let b = buf("one\ntwo\n\n\nthree");
        assert_eq!(
            resolve(&b, Position::new(0, 0), TextObjectKind::Paragraph, false),
            Some(ObjectSpan::Lines(0, 1))
        );
        assert_eq!(
            resolve(&b, Position::new(0, 0), TextObjectKind::Paragraph, true),
            Some(ObjectSpan::Lines(0, 3))
        );
        // cursor on a blank line selects the blank run
        assert_eq!(
            resolve(&b, Position::new(2, 0), TextObjectKind::Paragraph, false),
            Some(ObjectSpan::Lines(2, 3))
        );
    }
}
