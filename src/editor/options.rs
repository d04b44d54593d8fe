use std::collections::HashMap;

use super::buffer::BufferId;
use super::window::WindowId;
use crate::error::{EditorError, Result};

/// Typed option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl OptionValue {
    pub fn as_bool(&self) -> bool {
        matches!(self, OptionValue::Bool(true))
    }

    pub fn as_int(&self) -> i64 {
        match self {
            OptionValue::Int(n) => *n,
            _ => 0,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OptionValue::Str(s) => s,
            _ => "",
        }
    }
}

/// Where an option lives by default (`:set` with auto scope writes here).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionScope {
    Global,
    Buffer,
    Window,
}

/// Scope selector for a set operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetScope {
    /// Resolve to the option's declared default scope
    Auto,
    Global,
    Buffer(BufferId),
    Window(WindowId),
}

#[derive(Debug, Clone)]
struct OptionDecl {
    default: OptionValue,
    scope: OptionScope,
}

/// Three-tier option store: window-local overrides buffer-local overrides
/// global, with declared defaults underneath.
pub struct OptionStore {
    decls: HashMap<String, OptionDecl>,
    global: HashMap<String, OptionValue>,
    buffer: HashMap<(BufferId, String), OptionValue>,
    window: HashMap<(WindowId, String), OptionValue>,
}

impl OptionStore {
    /// Build the store with the built-in option declarations.
    pub fn new() -> Self {
        let mut store = Self {
            decls: HashMap::new(),
            global: HashMap::new(),
            buffer: HashMap::new(),
            window: HashMap::new(),
        };
        store.declare("number", OptionValue::Bool(false), OptionScope::Window);
        store.declare("wrap", OptionValue::Bool(false), OptionScope::Window);
        store.declare("tabstop", OptionValue::Int(4), OptionScope::Buffer);
        store.declare("expandtab", OptionValue::Bool(true), OptionScope::Buffer);
        store.declare("filetype", OptionValue::Str(String::new()), OptionScope::Buffer);
        store.declare("ignorecase", OptionValue::Bool(false), OptionScope::Global);
        store.declare("scrolloff", OptionValue::Int(0), OptionScope::Global);
        store.declare("hlsearch", OptionValue::Bool(true), OptionScope::Global);
        store
    }

    pub fn declare(&mut self, name: &str, default: OptionValue, scope: OptionScope) {
        self.decls.insert(name.to_string(), OptionDecl { default, scope });
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.decls.contains_key(name)
    }

    /// Effective value: window-local, then buffer-local, then global, then
    /// the declared default.
    pub fn get(&self, name: &str, window: WindowId, buffer: BufferId) -> Result<OptionValue> {
        let decl = self
            .decls
            .get(name)
            .ok_or_else(|| EditorError::UnknownCommand(format!("unknown option: {name}")))?;
        if let Some(v) = self.window.get(&(window, name.to_string())) {
            return Ok(v.clone());
        }
        if let Some(v) = self.buffer.get(&(buffer, name.to_string())) {
            return Ok(v.clone());
        }
        if let Some(v) = self.global.get(name) {
            return Ok(v.clone());
        }
        Ok(decl.default.clone())
    }

    /// Set an option, coercing `raw` to the declared type. `SetScope::Auto`
    /// resolves to the declared default scope.
    pub fn set_str(
        &mut self,
        name: &str,
        raw: &str,
        scope: SetScope,
        window: WindowId,
        buffer: BufferId,
    ) -> Result<()> {
        let value = self.coerce(name, raw)?;
        self.set(name, value, scope, window, buffer)
    }

    pub fn set(
        &mut self,
        name: &str,
        value: OptionValue,
        scope: SetScope,
        window: WindowId,
        buffer: BufferId,
    ) -> Result<()> {
        let decl = self
            .decls
            .get(name)
            .ok_or_else(|| EditorError::UnknownCommand(format!("unknown option: {name}")))?;
        let resolved = match scope {
            SetScope::Auto => match decl.scope {
                OptionScope::Global => SetScope::Global,
                OptionScope::Buffer => SetScope::Buffer(buffer),
                OptionScope::Window => SetScope::Window(window),
            },
            other => other,
        };
        match resolved {
            SetScope::Global => {
                self.global.insert(name.to_string(), value);
            }
            SetScope::Buffer(b) => {
                self.buffer.insert((b, name.to_string()), value);
            }
            SetScope::Window(w) => {
                self.window.insert((w, name.to_string()), value);
            }
            SetScope::Auto => unreachable!(),
        }
        Ok(())
    }

    /// Coerce a textual value to the option's declared type.
    fn coerce(&self, name: &str, raw: &str) -> Result<OptionValue> {
        let decl = self
            .decls
            .get(name)
            .ok_or_else(|| EditorError::UnknownCommand(format!("unknown option: {name}")))?;
        match decl.default {
            OptionValue::Bool(_) => match raw {
                "" | "true" | "on" | "1" => Ok(OptionValue::Bool(true)),
                "false" | "off" | "0" => Ok(OptionValue::Bool(false)),
                _ => Err(EditorError::BadExSyntax(format!("invalid boolean: {raw}"))),
            },
            OptionValue::Int(_) => raw
                .parse::<i64>()
                .map(OptionValue::Int)
                .map_err(|_| EditorError::BadExSyntax(format!("invalid number: {raw}"))),
            OptionValue::Str(_) => Ok(OptionValue::Str(raw.to_string())),
        }
    }

    pub fn forget_buffer(&mut self, buffer: BufferId) {
        self.buffer.retain(|(b, _), _| *b != buffer);
    }

    pub fn forget_window(&mut self, window: WindowId) {
        self.window.retain(|(w, _), _| *w != window);
    }
}

impl Default for OptionStore {
    fn default() -> Self {
        Self::new()
    }
}
