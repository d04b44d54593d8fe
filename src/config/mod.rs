//! Configuration for kavi
//!
//! Loads settings from ~/.config/kavi/config.toml. A missing or unreadable
//! file falls back to the built-in defaults; a malformed file is reported on
//! the status line rather than aborting startup.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::app::App;
use crate::editor::options::SetScope;
use crate::editor::Mode;
use crate::input::keys::parse_key_sequence;
use crate::keymap::Binding;

/// Main settings structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Option values applied globally at startup, e.g. `tabstop = 8`
    pub options: BTreeMap<String, toml::Value>,
    /// User key bindings, applied on top of the defaults
    pub keymaps: Vec<KeymapEntry>,
}

/// One `[[keymaps]]` entry from config.toml
#[derive(Debug, Clone, Deserialize)]
pub struct KeymapEntry {
    /// "normal", "insert", "visual", "visual-line", or "all"
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Key sequence in angle-bracket notation, e.g. "gq" or "<C-s>"
    pub keys: String,
    /// Command name to run when the sequence matches
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_mode() -> String {
    "normal".to_string()
}

/// Path to the config file: ~/.config/kavi/config.toml
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("kavi").join("config.toml"))
}

/// Load settings from disk. Missing file means defaults; a parse error is
/// returned alongside the defaults so the caller can surface it.
pub fn load_config() -> (Settings, Option<String>) {
    let Some(path) = config_path() else {
        return (Settings::default(), None);
    };
    let Ok(text) = fs::read_to_string(&path) else {
        return (Settings::default(), None);
    };
    match toml::from_str::<Settings>(&text) {
        Ok(settings) => (settings, None),
        Err(e) => (
            Settings::default(),
            Some(format!("config error in {}: {}", path.display(), e)),
        ),
    }
}

impl Settings {
    /// Apply options and keymaps to a running app. Bad entries are skipped;
    /// the first problem is reported on the status line.
    pub fn apply(&self, app: &mut App) {
        let mut first_error: Option<String> = None;
        let mut note = |msg: String, slot: &mut Option<String>| {
            if slot.is_none() {
                *slot = Some(msg);
            }
        };

        let window = app.editor.tab.current;
        let buffer = app.editor.current_window().buffer;
        for (name, value) in &self.options {
            let raw = match value {
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Integer(n) => n.to_string(),
                toml::Value::String(s) => s.clone(),
                other => {
                    note(
                        format!("option {name}: unsupported value {other}"),
                        &mut first_error,
                    );
                    continue;
                }
            };
            if let Err(e) =
                app.editor
                    .options
                    .set_str(name, &raw, SetScope::Global, window, buffer)
            {
                note(format!("option {name}: {e}"), &mut first_error);
            }
        }

        for entry in &self.keymaps {
            let Some(keys) = parse_key_sequence(&entry.keys) else {
                note(
                    format!("keymap: bad key sequence {:?}", entry.keys),
                    &mut first_error,
                );
                continue;
            };
            let args: Vec<&str> = entry.args.iter().map(String::as_str).collect();
            let binding = Binding::with_args(&entry.command, &args);
            match entry.mode.as_str() {
                "normal" => app.keymap.bind_global(Mode::Normal, keys, binding),
                "insert" => app.keymap.bind_global(Mode::Insert, keys, binding),
                "visual" => app.keymap.bind_global(Mode::Visual, keys, binding),
                "visual-line" => app.keymap.bind_global(Mode::VisualLine, keys, binding),
                "all" => app.keymap.bind_fallback(keys, binding),
                other => {
                    note(format!("keymap: unknown mode {other:?}"), &mut first_error);
                }
            }
        }

        if let Some(msg) = first_error {
            app.editor.set_error(msg);
        }
    }
}
