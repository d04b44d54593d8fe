//! Layered key bindings.
//!
//! Four layers, consulted most-specific first: filetype, buffer-local,
//! mode-global, and a mode-independent fallback that carries the stock motion
//! bindings. The first layer with any entry for the pending keys (exact or as
//! a prefix of something longer) decides the outcome; lower layers are not
//! consulted, so a buffer-local `g` chord shadows every global `g` binding.

use std::collections::HashMap;

use crate::editor::buffer::BufferId;
use crate::editor::Mode;
use crate::input::keys::Key;

/// What a key sequence is bound to: a registered command plus fixed args.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub command: String,
    pub args: Vec<String>,
}

impl Binding {
    pub fn new(command: &str) -> Self {
        Self { command: command.to_string(), args: Vec::new() }
    }

    pub fn with_args(command: &str, args: &[&str]) -> Self {
        Self {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Outcome of resolving the pending key sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one binding matches and nothing longer could
    Match(Binding),
    /// An exact binding exists but a longer one in the same layer extends it;
    /// the dispatcher fires the exact match if the next key doesn't extend
    Ambiguous(Binding),
    /// No exact match yet, but the keys prefix a longer binding
    Pending,
    /// No layer knows these keys
    None,
}

#[derive(Debug, Clone, Default)]
struct Table {
    entries: HashMap<Vec<Key>, Binding>,
}

impl Table {
    fn exact(&self, keys: &[Key]) -> Option<&Binding> {
        self.entries.get(keys)
    }

    fn has_extension(&self, keys: &[Key]) -> bool {
        self.entries
            .keys()
            .any(|k| k.len() > keys.len() && k.starts_with(keys))
    }
}

/// The full keymap across modes and layers.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    filetype: HashMap<(String, Mode), Table>,
    buffer: HashMap<(BufferId, Mode), Table>,
    global: HashMap<Mode, Table>,
    fallback: Table,
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_global(&mut self, mode: Mode, keys: Vec<Key>, binding: Binding) {
        self.global.entry(mode).or_default().entries.insert(keys, binding);
    }

    pub fn bind_buffer(&mut self, buffer: BufferId, mode: Mode, keys: Vec<Key>, binding: Binding) {
        self.buffer
            .entry((buffer, mode))
            .or_default()
            .entries
            .insert(keys, binding);
    }

    pub fn bind_filetype(&mut self, ft: &str, mode: Mode, keys: Vec<Key>, binding: Binding) {
        self.filetype
            .entry((ft.to_string(), mode))
            .or_default()
            .entries
            .insert(keys, binding);
    }

    /// Bind in the mode-independent fallback layer.
    pub fn bind_fallback(&mut self, keys: Vec<Key>, binding: Binding) {
        self.fallback.entries.insert(keys, binding);
    }

    pub fn unbind_global(&mut self, mode: Mode, keys: &[Key]) {
        if let Some(t) = self.global.get_mut(&mode) {
            t.entries.remove(keys);
        }
    }

    /// Drop buffer-local bindings when a buffer is deleted.
    pub fn forget_buffer(&mut self, buffer: BufferId) {
        self.buffer.retain(|(b, _), _| *b != buffer);
    }

    /// Resolve `keys` against the layers for `mode`, with the filetype and
    /// buffer of the focused window.
    pub fn resolve(
        &self,
        mode: Mode,
        filetype: &str,
        buffer: BufferId,
        keys: &[Key],
    ) -> Resolution {
        if keys.is_empty() {
            return Resolution::None;
        }

        let layers: [Option<&Table>; 4] = [
            if filetype.is_empty() {
                None
            } else {
                self.filetype.get(&(filetype.to_string(), mode))
            },
            self.buffer.get(&(buffer, mode)),
            self.global.get(&mode),
            Some(&self.fallback),
        ];

        for table in layers.into_iter().flatten() {
            let exact = table.exact(keys);
            let extends = table.has_extension(keys);
            match (exact, extends) {
                (Some(b), true) => return Resolution::Ambiguous(b.clone()),
                (Some(b), false) => return Resolution::Match(b.clone()),
                (None, true) => return Resolution::Pending,
                (None, false) => {} // this layer is silent; try the next
            }
        }
        Resolution::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keys::parse_key_sequence;

    fn keys(s: &str) -> Vec<Key> {
        parse_key_sequence(s).unwrap()
    }

    #[test]
    fn test_exact_match() {
        let mut km = Keymap::new();
        km.bind_global(Mode::Normal, keys("x"), Binding::new("delete-char"));
        assert_eq!(
            km.resolve(Mode::Normal, "", BufferId(1), &keys("x")),
            Resolution::Match(Binding::new("delete-char"))
        );
        assert_eq!(
            km.resolve(Mode::Normal, "", BufferId(1), &keys("z")),
            Resolution::None
        );
    }

    #[test]
    fn test_prefix_is_pending() {
        let mut km = Keymap::new();
        km.bind_global(Mode::Normal, keys("gg"), Binding::new("goto-first-line"));
        assert_eq!(
            km.resolve(Mode::Normal, "", BufferId(1), &keys("g")),
            Resolution::Pending
        );
        assert!(matches!(
            km.resolve(Mode::Normal, "", BufferId(1), &keys("gg")),
            Resolution::Match(_)
        ));
    }

    #[test]
    fn test_exact_plus_extension_is_ambiguous() {
        let mut km = Keymap::new();
        km.bind_global(Mode::Normal, keys("g"), Binding::new("g-thing"));
        km.bind_global(Mode::Normal, keys("gg"), Binding::new("goto-first-line"));
        assert_eq!(
            km.resolve(Mode::Normal, "", BufferId(1), &keys("g")),
            Resolution::Ambiguous(Binding::new("g-thing"))
        );
    }

    #[test]
    fn test_buffer_layer_shadows_global() {
        let mut km = Keymap::new();
        km.bind_global(Mode::Normal, keys("x"), Binding::new("global-x"));
        km.bind_buffer(BufferId(1), Mode::Normal, keys("x"), Binding::new("local-x"));
        assert_eq!(
            km.resolve(Mode::Normal, "", BufferId(1), &keys("x")),
            Resolution::Match(Binding::new("local-x"))
        );
        assert_eq!(
            km.resolve(Mode::Normal, "", BufferId(2), &keys("x")),
            Resolution::Match(Binding::new("global-x"))
        );
    }

    #[test]
    fn test_prefix_presence_shadows_lower_exact() {
        // A buffer-local chord starting with "g" hides a global exact "g"
        // binding entirely: the deciding layer is the first with presence.
        let mut km = Keymap::new();
        km.bind_global(Mode::Normal, keys("g"), Binding::new("global-g"));
        km.bind_buffer(BufferId(1), Mode::Normal, keys("gq"), Binding::new("local-gq"));
        assert_eq!(
            km.resolve(Mode::Normal, "", BufferId(1), &keys("g")),
            Resolution::Pending
        );
    }

    #[test]
    fn test_filetype_layer_first() {
        let mut km = Keymap::new();
        km.bind_global(Mode::Normal, keys("K"), Binding::new("global-k"));
        km.bind_filetype("rust", Mode::Normal, keys("K"), Binding::new("rust-k"));
        assert_eq!(
            km.resolve(Mode::Normal, "rust", BufferId(1), &keys("K")),
            Resolution::Match(Binding::new("rust-k"))
        );
        assert_eq!(
            km.resolve(Mode::Normal, "toml", BufferId(1), &keys("K")),
            Resolution::Match(Binding::new("global-k"))
        );
    }

    #[test]
    fn test_fallback_is_mode_independent() {
        let mut km = Keymap::new();
        km.bind_fallback(keys("w"), Binding::new("word-forward"));
        assert!(matches!(
            km.resolve(Mode::Normal, "", BufferId(1), &keys("w")),
            Resolution::Match(_)
        ));
        assert!(matches!(
            km.resolve(Mode::Visual, "", BufferId(1), &keys("w")),
            Resolution::Match(_)
        ));
    }
}
