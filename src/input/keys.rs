//! Key tokens and the `<C-x>`-style binding notation.
//!
//! Terminal key decoding stays at the edge: crossterm events are converted to
//! engine-owned `Key` tokens at the dispatch boundary, so the engine (and its
//! tests, macros and dot-repeat buffers) never depend on terminal types.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// A single key token as seen by the dispatch state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Ctrl(char),
    Esc,
    Enter,
    Backspace,
    Tab,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
}

impl Key {
    /// The printable character this key would insert, if any.
    pub fn printable(self) -> Option<char> {
        match self {
            Key::Char(c) => Some(c),
            _ => None,
        }
    }
}

impl From<KeyEvent> for Key {
    fn from(ev: KeyEvent) -> Self {
        match ev.code {
            KeyCode::Char(c) if ev.modifiers.contains(KeyModifiers::CONTROL) => {
                Key::Ctrl(c.to_ascii_lowercase())
            }
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Esc => Key::Esc,
            KeyCode::Enter => Key::Enter,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Tab => Key::Tab,
            KeyCode::Delete => Key::Delete,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            KeyCode::PageUp => Key::PageUp,
            KeyCode::PageDown => Key::PageDown,
            _ => Key::Char('\0'),
        }
    }
}

/// Parse a key notation string into a single key token.
///
/// Supported formats:
/// - Single characters: "a", "H", ";", "0"
/// - Control keys: "<C-r>", "<C-s>"
/// - Special keys: "<CR>", "<Esc>", "<Tab>", "<BS>", "<Space>"
pub fn parse_key_notation(s: &str) -> Option<Key> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if s.starts_with('<') && s.ends_with('>') {
        return parse_special_notation(&s[1..s.len() - 1]);
    }

    if s.chars().count() == 1 {
        return Some(Key::Char(s.chars().next()?));
    }

    None
}

/// Parse a whole sequence like "gcc" or "<C-w>v" into key tokens.
pub fn parse_key_sequence(s: &str) -> Option<Vec<Key>> {
    let mut keys = Vec::new();
    let mut remaining = s;

    while !remaining.is_empty() {
        if remaining.starts_with('<') {
            let end = remaining.find('>')?;
            keys.push(parse_key_notation(&remaining[..=end])?);
            remaining = &remaining[end + 1..];
        } else {
            let c = remaining.chars().next().unwrap();
            keys.push(Key::Char(c));
            remaining = &remaining[c.len_utf8()..];
        }
    }

    if keys.is_empty() {
        None
    } else {
        Some(keys)
    }
}

fn parse_special_notation(inner: &str) -> Option<Key> {
    let inner_lower = inner.to_lowercase();

    // Control key: <C-x>
    if inner_lower.starts_with("c-") && inner.len() == 3 {
        let c = inner.chars().nth(2)?;
        return Some(Key::Ctrl(c.to_ascii_lowercase()));
    }

    match inner_lower.as_str() {
        "cr" | "enter" | "return" => Some(Key::Enter),
        "esc" | "escape" => Some(Key::Esc),
        "tab" => Some(Key::Tab),
        "bs" | "backspace" => Some(Key::Backspace),
        "del" | "delete" => Some(Key::Delete),
        "space" => Some(Key::Char(' ')),
        "up" => Some(Key::Up),
        "down" => Some(Key::Down),
        "left" => Some(Key::Left),
        "right" => Some(Key::Right),
        "home" => Some(Key::Home),
        "end" => Some(Key::End),
        "pageup" => Some(Key::PageUp),
        "pagedown" => Some(Key::PageDown),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_char() {
        assert_eq!(parse_key_notation("a"), Some(Key::Char('a')));
        assert_eq!(parse_key_notation("H"), Some(Key::Char('H')));
        assert_eq!(parse_key_notation(";"), Some(Key::Char(';')));
    }

    #[test]
    fn test_parse_control() {
        assert_eq!(parse_key_notation("<C-r>"), Some(Key::Ctrl('r')));
        assert_eq!(parse_key_notation("<C-W>"), Some(Key::Ctrl('w')));
    }

    #[test]
    fn test_parse_special() {
        assert_eq!(parse_key_notation("<CR>"), Some(Key::Enter));
        assert_eq!(parse_key_notation("<Esc>"), Some(Key::Esc));
        assert_eq!(parse_key_notation("<Space>"), Some(Key::Char(' ')));
    }

    #[test]
    fn test_parse_sequence() {
        assert_eq!(
            parse_key_sequence("gg"),
            Some(vec![Key::Char('g'), Key::Char('g')])
        );
        assert_eq!(
            parse_key_sequence("<C-w>v"),
            Some(vec![Key::Ctrl('w'), Key::Char('v')])
        );
        assert_eq!(parse_key_sequence(""), None);
    }

    #[test]
    fn test_ctrl_event_conversion() {
        let ev = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(Key::from(ev), Key::Ctrl('r'));
        let ev = KeyEvent::new(KeyCode::Char('G'), KeyModifiers::SHIFT);
        assert_eq!(Key::from(ev), Key::Char('G'));
    }
}
