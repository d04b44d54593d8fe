//! Cursor motions as pure functions over a buffer and a position.
//!
//! Nothing in here mutates state; the dispatch layer applies the returned
//! positions. Column math is in character units, but single-step motions move
//! whole grapheme clusters so combining marks and wide glyphs count as one
//! step.

pub mod textobject;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::editor::buffer::{Buffer, Position};

/// A motion that can move the cursor (and give an operator its range).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    // Character motions
    Left,
    Right,
    Up,
    Down,

    // Word motions
    WordForward,
    WordBackward,
    WordEnd,
    BigWordForward,
    BigWordBackward,
    BigWordEnd,

    // Line motions
    LineStart,
    FirstNonBlank,
    LineEnd,

    // File motions
    FileStart,
    FileEnd,
    GotoLine(usize),

    // Screen motions
    HalfPageDown,
    HalfPageUp,
    PageDown,
    PageUp,

    // Find char motions
    FindChar(char),
    FindCharBack(char),
    TillChar(char),
    TillCharBack(char),

    // Paragraph motions
    ParagraphForward,
    ParagraphBackward,

    // Bracket matching
    MatchingBracket,
}

/// How an operator interprets the span covered by a motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionKind {
    /// Span excludes the character at the target position
    Exclusive,
    /// Span includes the character at the target position
    Inclusive,
    /// Operator acts on whole lines
    Linewise,
}

impl Motion {
    pub fn kind(self) -> MotionKind {
        use Motion::*;
        match self {
            Up | Down | GotoLine(_) | FileStart | FileEnd | HalfPageDown | HalfPageUp
            | PageDown | PageUp => MotionKind::Linewise,
            WordEnd | BigWordEnd | FindChar(_) | TillChar(_) | LineEnd | MatchingBracket => {
                MotionKind::Inclusive
            }
            _ => MotionKind::Exclusive,
        }
    }
}

/// Character classification for word motions. The keyword class is the
/// configurable one; `extra_word_chars` widens it (e.g. "-" for lisps).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Whitespace,
    Word,
    Punct,
}

fn classify(ch: char, extra_word_chars: &str) -> CharClass {
    if ch.is_whitespace() {
        CharClass::Whitespace
    } else if ch.is_alphanumeric() || ch == '_' || extra_word_chars.contains(ch) {
        CharClass::Word
    } else {
        CharClass::Punct
    }
}

/// Apply a motion `count` times. Returns None when the motion fails outright
/// (e.g. find-char with too few occurrences); partial progress on word
/// motions is still a success.
pub fn apply(
    buffer: &Buffer,
    motion: Motion,
    pos: Position,
    count: usize,
    text_rows: usize,
) -> Option<Position> {
    let count = count.max(1);
    let last_line = buffer.len_lines().saturating_sub(1);

    match motion {
        Motion::Left => {
            let line = buffer.line_text(pos.line);
            let mut col = pos.col;
            for _ in 0..count {
                col = prev_grapheme(&line, col);
            }
            Some(Position::new(pos.line, col))
        }

        Motion::Right => {
            let line = buffer.line_text(pos.line);
            let max = last_col(buffer, pos.line);
            let mut col = pos.col;
            for _ in 0..count {
                col = next_grapheme(&line, col).min(max);
            }
            Some(Position::new(pos.line, col))
        }

        Motion::Up => Some(Position::new(pos.line.saturating_sub(count), pos.col)),

        Motion::Down => Some(Position::new((pos.line + count).min(last_line), pos.col)),

        Motion::WordForward | Motion::BigWordForward => {
            let big = motion == Motion::BigWordForward;
            let mut p = pos;
            for _ in 0..count {
                p = word_forward_start(buffer, p, big);
            }
            Some(p)
        }

        Motion::WordBackward | Motion::BigWordBackward => {
            let big = motion == Motion::BigWordBackward;
            let mut p = pos;
            for _ in 0..count {
                p = word_backward_start(buffer, p, big);
            }
            Some(p)
        }

        Motion::WordEnd | Motion::BigWordEnd => {
            let big = motion == Motion::BigWordEnd;
            let mut p = pos;
            for _ in 0..count {
                p = word_end(buffer, p, big);
            }
            Some(p)
        }

        Motion::LineStart => Some(Position::new(pos.line, 0)),

        Motion::FirstNonBlank => Some(Position::new(pos.line, first_non_blank(buffer, pos.line))),

        Motion::LineEnd => Some(Position::new(pos.line, last_col(buffer, pos.line))),

        Motion::FileStart => Some(Position::new(0, 0)),

        Motion::FileEnd => Some(Position::new(last_line, 0)),

        Motion::GotoLine(target) => {
            Some(Position::new(target.saturating_sub(1).min(last_line), 0))
        }

        Motion::HalfPageDown => {
            Some(Position::new((pos.line + (text_rows / 2) * count).min(last_line), pos.col))
        }

        Motion::HalfPageUp => {
            Some(Position::new(pos.line.saturating_sub((text_rows / 2) * count), pos.col))
        }

        Motion::PageDown => {
            Some(Position::new((pos.line + text_rows * count).min(last_line), pos.col))
        }

        Motion::PageUp => Some(Position::new(pos.line.saturating_sub(text_rows * count), pos.col)),

        Motion::FindChar(target) => find_char(buffer, pos, target, count, true, false),
        Motion::FindCharBack(target) => find_char(buffer, pos, target, count, false, false),
        Motion::TillChar(target) => find_char(buffer, pos, target, count, true, true),
        Motion::TillCharBack(target) => find_char(buffer, pos, target, count, false, true),

        Motion::ParagraphForward => {
            let mut l = pos.line;
            for _ in 0..count {
                l = next_paragraph_boundary(buffer, l);
            }
            Some(Position::new(l.min(last_line), 0))
        }

        Motion::ParagraphBackward => {
            let mut l = pos.line;
            for _ in 0..count {
                l = prev_paragraph_boundary(buffer, l);
            }
            Some(Position::new(l, 0))
        }

        Motion::MatchingBracket => matching_bracket(buffer, pos),
    }
}

/// Rightmost valid normal-mode column on a line.
pub fn last_col(buffer: &Buffer, line: usize) -> usize {
    buffer.line_len(line).saturating_sub(1)
}

pub fn is_blank_line(buffer: &Buffer, line: usize) -> bool {
    buffer.line_text(line).chars().all(|c| c.is_whitespace())
}

pub fn first_non_blank(buffer: &Buffer, line: usize) -> usize {
    buffer
        .line_text(line)
        .char_indices()
        .enumerate()
        .find(|(_, (_, ch))| !ch.is_whitespace())
        .map(|(char_idx, _)| char_idx)
        .unwrap_or(0)
}

// --- grapheme stepping ---

fn char_to_byte(s: &str, char_col: usize) -> usize {
    s.char_indices()
        .nth(char_col)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}

fn byte_to_char(s: &str, byte: usize) -> usize {
    s[..byte.min(s.len())].chars().count()
}

/// Char index one grapheme cluster to the right; saturates at line length.
pub fn next_grapheme(line: &str, col: usize) -> usize {
    let byte = char_to_byte(line, col);
    for (start, g) in line.grapheme_indices(true) {
        if start <= byte && byte < start + g.len() {
            return byte_to_char(line, start + g.len());
        }
    }
    line.chars().count()
}

/// Char index one grapheme cluster to the left; saturates at zero.
pub fn prev_grapheme(line: &str, col: usize) -> usize {
    let byte = char_to_byte(line, col);
    let mut prev = 0;
    for (start, _) in line.grapheme_indices(true) {
        if start >= byte {
            break;
        }
        prev = start;
    }
    byte_to_char(line, prev)
}

// --- flattened character stream ---
//
// Word motions treat the buffer as one logical stream where the position one
// past the last column of a line is the newline boundary. This keeps the
// cross-line logic in a pair of steppers instead of being re-derived in every
// scan loop.

fn stream_char(buffer: &Buffer, pos: Position) -> Option<char> {
    if pos.col < buffer.line_len(pos.line) {
        buffer.char_at(pos)
    } else {
        None // line boundary
    }
}

fn stream_next(buffer: &Buffer, pos: Position) -> Option<Position> {
    if pos.col < buffer.line_len(pos.line) {
        Some(Position::new(pos.line, pos.col + 1))
    } else if pos.line + 1 < buffer.len_lines() {
        Some(Position::new(pos.line + 1, 0))
    } else {
        None
    }
}

fn stream_prev(buffer: &Buffer, pos: Position) -> Option<Position> {
    if pos.col > 0 {
        Some(Position::new(pos.line, pos.col - 1))
    } else if pos.line > 0 {
        Some(Position::new(pos.line - 1, buffer.line_len(pos.line - 1)))
    } else {
        None
    }
}

fn class_at(buffer: &Buffer, pos: Position, big: bool) -> CharClass {
    match stream_char(buffer, pos) {
        Some(ch) => {
            let c = classify(ch, "");
            if big && c == CharClass::Punct {
                CharClass::Word
            } else {
                c
            }
        }
        None => CharClass::Whitespace,
    }
}

fn word_forward_start(buffer: &Buffer, pos: Position, big: bool) -> Position {
    let start_class = class_at(buffer, pos, big);
    let mut p = pos;

    // move past the current run (unless starting on whitespace)
    if start_class != CharClass::Whitespace {
        while class_at(buffer, p, big) == start_class {
            match stream_next(buffer, p) {
                Some(n) => p = n,
                None => return p,
            }
        }
    }

    // skip whitespace and line boundaries
    while class_at(buffer, p, big) == CharClass::Whitespace {
        match stream_next(buffer, p) {
            Some(n) => p = n,
            None => return p,
        }
    }
    p
}

fn word_backward_start(buffer: &Buffer, pos: Position, big: bool) -> Position {
    let mut p = match stream_prev(buffer, pos) {
        Some(p) => p,
        None => return pos,
    };

    while class_at(buffer, p, big) == CharClass::Whitespace {
        match stream_prev(buffer, p) {
            Some(n) => p = n,
            None => return Position::new(0, 0),
        }
    }

    // walk back to the first character of this run
    let run_class = class_at(buffer, p, big);
    while let Some(prev) = stream_prev(buffer, p) {
        if class_at(buffer, prev, big) == run_class {
            p = prev;
        } else {
            break;
        }
    }
    p
}

/// Backward/end variants have their own boundary math: the end motion lands
/// on the last character of a run, not one past it.
fn word_end(buffer: &Buffer, pos: Position, big: bool) -> Position {
    let mut p = match stream_next(buffer, pos) {
        Some(p) => p,
        None => return pos,
    };

    while class_at(buffer, p, big) == CharClass::Whitespace {
        match stream_next(buffer, p) {
            Some(n) => p = n,
            None => return pos,
        }
    }

    let run_class = class_at(buffer, p, big);
    while let Some(next) = stream_next(buffer, p) {
        if class_at(buffer, next, big) == run_class {
            p = next;
        } else {
            break;
        }
    }
    p
}

// --- find char (line-local) ---

/// f/F/t/T. Fails when fewer than `count` occurrences exist in the direction
/// of travel; "till" clips one grapheme short of the match.
fn find_char(
    buffer: &Buffer,
    pos: Position,
    target: char,
    count: usize,
    forward: bool,
    till: bool,
) -> Option<Position> {
    let line = buffer.line_text(pos.line);
    let chars: Vec<char> = line.chars().collect();
    let mut found = 0;

    if forward {
        for c in (pos.col + 1)..chars.len() {
            if chars[c] == target {
                found += 1;
                if found == count {
                    let result = if till { prev_grapheme(&line, c) } else { c };
                    if till && result <= pos.col {
                        return None;
                    }
                    return Some(Position::new(pos.line, result));
                }
            }
        }
    } else {
        for c in (0..pos.col).rev() {
            if chars[c] == target {
                found += 1;
                if found == count {
                    let result = if till { next_grapheme(&line, c) } else { c };
                    if till && result >= pos.col {
                        return None;
                    }
                    return Some(Position::new(pos.line, result));
                }
            }
        }
    }
    None
}

// --- paragraphs ---

fn next_paragraph_boundary(buffer: &Buffer, line: usize) -> usize {
    let total = buffer.len_lines();
    let mut l = line;
    while l < total && is_blank_line(buffer, l) {
        l += 1;
    }
    while l < total && !is_blank_line(buffer, l) {
        l += 1;
    }
    l.min(total.saturating_sub(1))
}

fn prev_paragraph_boundary(buffer: &Buffer, line: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let mut l = line - 1;
    // starting on a blank line: leave the blank run before looking for the
    // boundary above the previous paragraph
    if is_blank_line(buffer, line) {
        while l > 0 && is_blank_line(buffer, l) {
            l -= 1;
        }
    }
    while l > 0 && !is_blank_line(buffer, l) {
        l -= 1;
    }
    l
}

// --- bracket matching ---

fn bracket_pair(ch: char) -> Option<(char, char, bool)> {
    match ch {
        '(' => Some(('(', ')', true)),
        ')' => Some(('(', ')', false)),
        '[' => Some(('[', ']', true)),
        ']' => Some(('[', ']', false)),
        '{' => Some(('{', '}', true)),
        '}' => Some(('{', '}', false)),
        '<' => Some(('<', '>', true)),
        '>' => Some(('<', '>', false)),
        _ => None,
    }
}

/// `%`: jump to the match of the bracket at or after the cursor on its line.
pub fn matching_bracket(buffer: &Buffer, pos: Position) -> Option<Position> {
    let line_len = buffer.line_len(pos.line);
    let mut start = None;
    for c in pos.col..line_len {
        let p = Position::new(pos.line, c);
        if let Some(ch) = buffer.char_at(p) {
            if bracket_pair(ch).is_some() {
                start = Some((p, ch));
                break;
            }
        }
    }
    let (start, ch) = start?;
    let (open, close, is_open) = bracket_pair(ch)?;
    if is_open {
        scan_bracket_forward(buffer, start, open, close)
    } else {
        scan_bracket_backward(buffer, start, open, close)
    }
}

/// Depth-counted scan across the whole buffer, not just the line. Depth
/// increments on re-opens of the same bracket type; the match is where depth
/// returns to zero.
pub fn scan_bracket_forward(
    buffer: &Buffer,
    from: Position,
    open: char,
    close: char,
) -> Option<Position> {
    let mut depth = 0i32;
    let mut p = from;
    loop {
        if let Some(ch) = stream_char(buffer, p) {
            if ch == open {
                depth += 1;
            } else if ch == close {
                depth -= 1;
                if depth == 0 {
                    return Some(p);
                }
            }
        }
        p = stream_next(buffer, p)?;
    }
}

pub fn scan_bracket_backward(
    buffer: &Buffer,
    from: Position,
    open: char,
    close: char,
) -> Option<Position> {
    let mut depth = 0i32;
    let mut p = from;
    loop {
        if let Some(ch) = stream_char(buffer, p) {
            if ch == close {
                depth += 1;
            } else if ch == open {
                depth -= 1;
                if depth == 0 {
                    return Some(p);
                }
            }
        }
        p = stream_prev(buffer, p)?;
    }
}

// --- search match lookup ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    Forward,
    Backward,
}

/// Find the next regex match after (or before) the cursor, wrapping around
/// the buffer once.
pub fn find_match(
    buffer: &Buffer,
    re: &Regex,
    from: Position,
    dir: SearchDirection,
) -> Option<Position> {
    let total = buffer.len_lines();
    match dir {
        SearchDirection::Forward => {
            for step in 0..=total {
                let line = (from.line + step) % total;
                let text = buffer.line_text(line);
                if step == total {
                    // full wrap: accept a match at or before the cursor
                    return re
                        .find(&text)
                        .map(|m| Position::new(line, byte_to_char(&text, m.start())));
                }
                let min_col = if step == 0 { Some(from.col) } else { None };
                for m in re.find_iter(&text) {
                    let col = byte_to_char(&text, m.start());
                    if min_col.map_or(true, |c| col > c) {
                        return Some(Position::new(line, col));
                    }
                }
            }
            None
        }
        SearchDirection::Backward => {
            for step in 0..=total {
                let line = (from.line + total - (step % total)) % total;
                let text = buffer.line_text(line);
                let max_col = if step == 0 { Some(from.col) } else { None };
                let mut best: Option<usize> = None;
                for m in re.find_iter(&text) {
                    let col = byte_to_char(&text, m.start());
                    if max_col.map_or(true, |c| col < c) {
                        best = Some(col);
                    }
                }
                if let Some(col) = best {
                    return Some(Position::new(line, col));
                }
                if step == total {
                    return None;
                }
            }
            None
        }
    }
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

    fn mv(b: &Buffer, m: Motion, line: usize, col: usize) -> (usize, usize) {
        let p = apply(b, m, Position::new(line, col), 1, 20).unwrap();
        (p.line, p.col)
    }

    #[test]
    fn test_word_forward() {
        let b = buf("foo bar, baz");
        assert_eq!(mv(&b, Motion::WordForward, 0, 0), (0, 4));
        assert_eq!(mv(&b, Motion::WordForward, 0, 4), (0, 7));
        assert_eq!(mv(&b, Motion::WordForward, 0, 7), (0, 9));
    }

    #[test]
    fn test_big_word_forward_skips_punct() {
        let b = buf("foo.bar baz");
        assert_eq!(mv(&b, Motion::BigWordForward, 0, 0), (0, 8));
    }

    #[test]
    fn test_word_forward_crosses_lines() {
        let b = buf("one\n  two");
        assert_eq!(mv(&b, Motion::WordForward, 0, 0), (1, 2));
    }

    #[test]
    fn test_word_backward() {
        let b = buf("foo bar, baz");
        assert_eq!(mv(&b, Motion::WordBackward, 0, 9), (0, 7));
        assert_eq!(mv(&b, Motion::WordBackward, 0, 7), (0, 4));
        assert_eq!(mv(&b, Motion::WordBackward, 0, 4), (0, 0));
    }

    #[test]
    fn test_word_end_lands_on_last_char() {
        let b = buf("foo bar");
        assert_eq!(mv(&b, Motion::WordEnd, 0, 0), (0, 2));
        assert_eq!(mv(&b, Motion::WordEnd, 0, 2), (0, 6));
    }

    #[test]
    fn test_find_char_with_count() {
        let b = buf("abcabcabc");
        let p = apply(&b, Motion::FindChar('c'), Position::new(0, 0), 2, 20);
        assert_eq!(p, Some(Position::new(0, 5)));
        // only three occurrences: count 4 fails
        assert_eq!(apply(&b, Motion::FindChar('c'), Position::new(0, 0), 4, 20), None);
    }

    #[test]
    fn test_till_clips_short() {
        let b = buf("abcd");
        assert_eq!(
            apply(&b, Motion::TillChar('d'), Position::new(0, 0), 1, 20),
            Some(Position::new(0, 2))
        );
        assert_eq!(
            apply(&b, Motion::TillCharBack('a'), Position::new(0, 3), 1, 20),
            Some(Position::new(0, 1))
        );
        // till that would not move fails
        assert_eq!(apply(&b, Motion::TillChar('b'), Position::new(0, 0), 1, 20), None);
    }

    #[test]
    fn test_matching_bracket_across_lines() {
        let b = buf("fn main() {\n  (a (b))\n}");
        assert_eq!(
            matching_bracket(&b, Position::new(0, 10)),
            Some(Position::new(2, 0))
        );
        assert_eq!(
            matching_bracket(&b, Position::new(1, 2)),
            Some(Position::new(1, 8))
        );
        // from a closing bracket, scan backward
        assert_eq!(
            matching_bracket(&b, Position::new(2, 0)),
            Some(Position::new(0, 10))
        );
    }

    #[test]
    fn test_bracket_depth_counting() {
        let b = buf("((a) b)");
        assert_eq!(matching_bracket(&b, Position::new(0, 0)), Some(Position::new(0, 6)));
        assert_eq!(matching_bracket(&b, Position::new(0, 1)), Some(Position::new(0, 3)));
    }

    #[test]
    fn test_grapheme_step_idempotent() {
        // combining acute on 'e', then a wide CJK glyph
        let line = "e\u{301}x\u{4e16}y";
        let mut col = 0;
        let forward: Vec<usize> = std::iter::from_fn(|| {
            let next = next_grapheme(line, col);
            if next == col {
                None
            } else {
                col = next;
                Some(next)
            }
        })
        .collect();
        assert_eq!(forward, vec![2, 3, 4, 5]);
        // stepping left then right returns to the original index
        for &c in &forward {
            assert_eq!(next_grapheme(line, prev_grapheme(line, c)), c);
        }
    }

    #[test]
    fn test_word_forward_never_lands_mid_glyph() {
        let b = buf("a\u{4e16}\u{754c} b");
        let p = apply(&b, Motion::WordForward, Position::new(0, 0), 1, 20).unwrap();
        assert_eq!(p, Position::new(0, 4));
        let line = b.line_text(0);
        assert_eq!(next_grapheme(&line, prev_grapheme(&line, p.col)), p.col);
    }

    #[test]
    fn test_paragraph_motions() {
        let b = buf("one\ntwo\n\nthree\n\n\nfour");
        assert_eq!(mv(&b, Motion::ParagraphForward, 0, 0), (2, 0));
        assert_eq!(mv(&b, Motion::ParagraphForward, 2, 0), (4, 0));
        // lands on the blank line above the paragraph, not its first line
        assert_eq!(mv(&b, Motion::ParagraphBackward, 3, 0), (2, 0));
        assert_eq!(mv(&b, Motion::ParagraphBackward, 6, 0), (5, 0));
        // from a blank line the whole run and the paragraph above are skipped
        assert_eq!(mv(&b, Motion::ParagraphBackward, 2, 0), (0, 0));
    }

    #[test]
    fn test_line_clamps_exclude_trailing_segment() {
        let b = buf("a\nb\nc");
        assert_eq!(mv(&b, Motion::FileEnd, 0, 0), (2, 0));
        assert_eq!(mv(&b, Motion::GotoLine(99), 0, 0), (2, 0));
        assert_eq!(mv(&b, Motion::Down, 2, 0), (2, 0));
    }

    #[test]
    fn test_line_motions() {
        let b = buf("  hello  ");
        assert_eq!(mv(&b, Motion::FirstNonBlank, 0, 8), (0, 2));
        assert_eq!(mv(&b, Motion::LineStart, 0, 5), (0, 0));
        assert_eq!(mv(&b, Motion::LineEnd, 0, 0), (0, 8));
    }

    #[test]
    fn test_search_wraps() {
        let b = buf("alpha\nbeta\ngamma");
        let re = Regex::new("ma").unwrap();
        assert_eq!(
            find_match(&b, &re, Position::new(0, 0), SearchDirection::Forward),
            Some(Position::new(2, 3))
        );
        // wrapping all the way around lands on the same match
        assert_eq!(
            find_match(&b, &re, Position::new(2, 3), SearchDirection::Forward),
            Some(Position::new(2, 3))
        );
        assert_eq!(
            find_match(&b, &re, Position::new(2, 3), SearchDirection::Backward),
            Some(Position::new(2, 3))
        );
        // forward wrap back to the top of the buffer
        let re = Regex::new("al").unwrap();
        assert_eq!(
            find_match(&b, &re, Position::new(2, 0), SearchDirection::Forward),
            Some(Position::new(0, 0))
        );
        let re = Regex::new("zz").unwrap();
        assert_eq!(
            find_match(&b, &re, Position::new(0, 0), SearchDirection::Forward),
            None
        );
    }
}
