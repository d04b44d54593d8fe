//! Modal input state: counts, pending register, operator and other
//! mid-command sub-states, plus the raw key sequence being accumulated.
//!
//! The dispatcher in `app` drives this; the types here just hold the data so
//! a half-typed command survives between keystrokes.

pub mod keys;

use keys::Key;
use crate::motion::Motion;

/// An operator waiting for its motion or text object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Delete,
    Yank,
    Change,
}

impl Operator {
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::Char('d') => Some(Self::Delete),
            Key::Char('y') => Some(Self::Yank),
            Key::Char('c') => Some(Self::Change),
            _ => None,
        }
    }

    /// The key that, doubled, makes the operator linewise (dd, yy, cc).
    pub fn key_char(self) -> char {
        match self {
            Self::Delete => 'd',
            Self::Yank => 'y',
            Self::Change => 'c',
        }
    }
}

/// Direction/kind of an f/F/t/T find, remembered for ; and ,.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindKind {
    Find,
    FindBack,
    Till,
    TillBack,
}

impl FindKind {
    pub fn reversed(self) -> Self {
        match self {
            Self::Find => Self::FindBack,
            Self::FindBack => Self::Find,
            Self::Till => Self::TillBack,
            Self::TillBack => Self::Till,
        }
    }

    pub fn to_motion(self, target: char) -> Motion {
        match self {
            Self::Find => Motion::FindChar(target),
            Self::FindBack => Motion::FindCharBack(target),
            Self::Till => Motion::TillChar(target),
            Self::TillBack => Motion::TillCharBack(target),
        }
    }
}

/// The last find-char command, for ; and , repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastFind {
    pub kind: FindKind,
    pub target: char,
}

/// Dispatcher sub-state: what the next key will be interpreted as. These
/// take priority over keymap lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pending {
    #[default]
    None,
    /// After `"`: next key names a register
    Register,
    /// After `m`: next key names a mark to set
    MarkSet,
    /// After `'`: jump to mark line (first non-blank)
    MarkJumpLine,
    /// After `` ` ``: jump to mark exact position
    MarkJumpExact,
    /// After `q` when not recording: next key picks the record register
    Record,
    /// After `@`: next key picks the macro to play
    Play,
    /// After `r`: next key is the replacement character
    Replace,
    /// After f/F/t/T: next key is the search target
    Find(FindKind),
    /// After d/y/c: collecting the motion
    Operator(Operator),
    /// After i/a while an operator is pending
    Object { op: Operator, around: bool },
    /// After `g` while an operator is pending (dgg and friends)
    OperatorG(Operator),
    /// After f/F/t/T while an operator is pending (df<char>)
    OperatorFind(Operator, FindKind),
}

/// Per-command input accumulator, reset when a command completes or aborts.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Count prefix being accumulated (None until a digit arrives)
    pub count: Option<usize>,
    /// Register selected with `"x`
    pub register: Option<char>,
    pub pending: Pending,
    /// Keys being matched against the keymap (multi-key chords)
    pub pending_keys: Vec<Key>,
    /// Every key consumed since the start of the current command, in order.
    /// The dot-repeat recorder snapshots this when a change completes.
    pub seq: Vec<Key>,
    /// Remembered f/F/t/T for ; and , (survives across commands)
    pub last_find: Option<LastFind>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a digit into the count. `0` with no count pending is not a
    /// digit, it is the line-start motion; callers check that first.
    pub fn push_count_digit(&mut self, d: u32) {
        let cur = self.count.unwrap_or(0);
        self.count = Some(cur.saturating_mul(10).saturating_add(d as usize));
    }

    /// Effective count: accumulated digits, defaulting to 1.
    pub fn take_count(&mut self) -> usize {
        self.count.take().map_or(1, |c| c.max(1))
    }

    pub fn take_register(&mut self) -> Option<char> {
        self.register.take()
    }

    /// Clear everything tied to the in-flight command. `last_find` survives.
    pub fn reset(&mut self) {
        self.count = None;
        self.register = None;
        self.pending = Pending::None;
        self.pending_keys.clear();
        self.seq.clear();
    }
}

/// Map a key to the motion it denotes in operator-pending position. The
/// keymap owns normal-mode motion bindings; operators accept this fixed
/// token set directly so `dw` needs no keymap round trip.
pub fn motion_token(key: Key) -> Option<Motion> {
    match key {
        Key::Char('h') | Key::Left => Some(Motion::Left),
        Key::Char('l') | Key::Right => Some(Motion::Right),
        Key::Char('j') | Key::Down => Some(Motion::Down),
        Key::Char('k') | Key::Up => Some(Motion::Up),
        Key::Char('w') => Some(Motion::WordForward),
        Key::Char('W') => Some(Motion::BigWordForward),
        Key::Char('b') => Some(Motion::WordBackward),
        Key::Char('B') => Some(Motion::BigWordBackward),
        Key::Char('e') => Some(Motion::WordEnd),
        Key::Char('E') => Some(Motion::BigWordEnd),
        Key::Char('0') | Key::Home => Some(Motion::LineStart),
        Key::Char('^') => Some(Motion::FirstNonBlank),
        Key::Char('$') | Key::End => Some(Motion::LineEnd),
        Key::Char('G') => Some(Motion::FileEnd),
        Key::Char('{') => Some(Motion::ParagraphBackward),
        Key::Char('}') => Some(Motion::ParagraphForward),
        Key::Char('%') => Some(Motion::MatchingBracket),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_accumulates_digits() {
        let mut s = InputState::new();
        s.push_count_digit(1);
        s.push_count_digit(2);
        s.push_count_digit(0);
        assert_eq!(s.take_count(), 120);
        // consumed
        assert_eq!(s.take_count(), 1);
    }

    #[test]
    fn test_reset_keeps_last_find() {
        let mut s = InputState::new();
        s.last_find = Some(LastFind { kind: FindKind::Till, target: 'x' });
        s.register = Some('a');
        s.push_count_digit(3);
        s.reset();
        assert_eq!(s.count, None);
        assert_eq!(s.register, None);
        assert!(s.last_find.is_some());
    }

    #[test]
    fn test_find_kind_reversal() {
        assert_eq!(FindKind::Find.reversed(), FindKind::FindBack);
        assert_eq!(FindKind::TillBack.reversed(), FindKind::Till);
        assert_eq!(
            FindKind::Till.to_motion('q'),
            Motion::TillChar('q')
        );
    }

    #[test]
    fn test_motion_tokens() {
        assert_eq!(motion_token(Key::Char('w')), Some(Motion::WordForward));
        assert_eq!(motion_token(Key::Char('$')), Some(Motion::LineEnd));
        assert_eq!(motion_token(Key::Char('x')), None);
        assert_eq!(motion_token(Key::Left), Some(Motion::Left));
    }
}
