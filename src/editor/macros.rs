use std::collections::HashMap;

use crate::input::keys::Key;

/// Macro playback aborts once the replay stack is this deep.
pub const MAX_PLAY_DEPTH: usize = 20;

/// Macro recording and playback state.
///
/// Recording appends keys exactly as the dispatch loop consumes them. A
/// suspension counter (not a boolean: playback nests) turns recording off
/// while replayed keys run back through the dispatcher, so a macro records
/// the `@x` keystrokes rather than the keys `x` expands to.
#[derive(Debug, Clone, Default)]
pub struct MacroState {
    /// Stored macros by register (a-z)
    macros: HashMap<char, Vec<Key>>,
    /// Register currently being recorded to (as typed, case preserved)
    recording: Option<char>,
    current_recording: Vec<Key>,
    /// Recording is paused while this is non-zero
    suspend_count: usize,
    /// Registers currently being played, innermost last
    play_stack: Vec<char>,
    /// Last executed macro register (for @@)
    last_played: Option<char>,
}

impl MacroState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid_register(c: char) -> bool {
        c.is_ascii_alphabetic()
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    pub fn recording_register(&self) -> Option<char> {
        self.recording
    }

    pub fn start_recording(&mut self, register: char) {
        self.recording = Some(register);
        self.current_recording.clear();
    }

    /// Stop recording. An uppercase register appends the just-recorded keys
    /// onto the existing lowercase macro instead of replacing it.
    pub fn stop_recording(&mut self) {
        let Some(register) = self.recording.take() else {
            return;
        };
        // The trailing "q" that stopped the recording is never part of it;
        // the dispatcher stops before recording that key.
        if self.current_recording.is_empty() {
            return;
        }
        let lower = register.to_ascii_lowercase();
        if register.is_ascii_uppercase() {
            self.macros
                .entry(lower)
                .or_default()
                .extend(self.current_recording.drain(..));
        } else {
            self.macros.insert(lower, std::mem::take(&mut self.current_recording));
        }
    }

    /// Append a key to the active recording unless suspended.
    pub fn record_key(&mut self, key: Key) {
        if self.recording.is_some() && self.suspend_count == 0 {
            self.current_recording.push(key);
        }
    }

    pub fn get_macro(&self, register: char) -> Option<&[Key]> {
        self.macros.get(&register.to_ascii_lowercase()).map(|v| v.as_slice())
    }

    pub fn last_played(&self) -> Option<char> {
        self.last_played
    }

    pub fn set_last_played(&mut self, register: char) {
        self.last_played = Some(register);
    }

    // --- re-entrancy guards, driven by the dispatcher ---

    pub fn suspend_recording(&mut self) {
        self.suspend_count += 1;
    }

    pub fn resume_recording(&mut self) {
        self.suspend_count = self.suspend_count.saturating_sub(1);
    }

    /// Try to enter playback of `register`. Fails if the register is already
    /// on the stack (direct or mutual recursion) or the stack is too deep.
    pub fn enter_playback(&mut self, register: char) -> bool {
        let lower = register.to_ascii_lowercase();
        if self.play_stack.contains(&lower) || self.play_stack.len() >= MAX_PLAY_DEPTH {
            return false;
        }
        self.play_stack.push(lower);
        true
    }

    pub fn exit_playback(&mut self) {
        self.play_stack.pop();
    }

    pub fn is_playing(&self) -> bool {
        !self.play_stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_replace() {
        let mut m = MacroState::new();
        m.start_recording('a');
        m.record_key(Key::Char('x'));
        m.stop_recording();
        assert_eq!(m.get_macro('a'), Some(&[Key::Char('x')][..]));

        m.start_recording('a');
        m.record_key(Key::Char('y'));
        m.stop_recording();
        assert_eq!(m.get_macro('a'), Some(&[Key::Char('y')][..]));
    }

    #[test]
    fn test_uppercase_stop_appends() {
        let mut m = MacroState::new();
        m.start_recording('a');
        m.record_key(Key::Char('x'));
        m.stop_recording();

        m.start_recording('A');
        m.record_key(Key::Char('y'));
        m.stop_recording();
        assert_eq!(m.get_macro('a'), Some(&[Key::Char('x'), Key::Char('y')][..]));
    }

    #[test]
    fn test_suspension_counter_nests() {
        let mut m = MacroState::new();
        m.start_recording('a');
        m.suspend_recording();
        m.suspend_recording();
        m.record_key(Key::Char('x'));
        m.resume_recording();
        m.record_key(Key::Char('y'));
        m.resume_recording();
        m.record_key(Key::Char('z'));
        m.stop_recording();
        assert_eq!(m.get_macro('a'), Some(&[Key::Char('z')][..]));
    }

    #[test]
    fn test_playback_recursion_guard() {
        let mut m = MacroState::new();
        assert!(m.enter_playback('a'));
        assert!(!m.enter_playback('a'));
        assert!(m.enter_playback('b'));
        m.exit_playback();
        m.exit_playback();
        assert!(!m.is_playing());
    }

    #[test]
    fn test_playback_depth_limit() {
        let mut m = MacroState::new();
        for (i, c) in ('a'..='z').enumerate() {
            let ok = m.enter_playback(c);
            assert_eq!(ok, i < MAX_PLAY_DEPTH, "register {c}");
        }
    }
}
