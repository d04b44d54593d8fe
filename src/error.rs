use thiserror::Error;

/// The single recoverable error kind for user-facing command failures.
///
/// Raised deep in the call stack (buffers, registries, ex parsing) and caught
/// at the dispatch boundary, where it becomes a status-line message. Nothing
/// here is fatal; the editor always returns to normal mode.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("E45: 'readonly' option is set")]
    ReadOnly,
    #[error("E21: cannot make changes, buffer is not modifiable")]
    NotModifiable,
    #[error("E354: invalid register name: {0}")]
    InvalidRegister(char),
    #[error("E20: mark not set: {0}")]
    MarkNotSet(char),
    #[error("invalid mark name: {0}")]
    InvalidMark(char),
    #[error("E32: no file name")]
    NoFileName,
    #[error("E492: not an editor command: {0}")]
    UnknownExCommand(String),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("command already registered: {0}")]
    DuplicateCommand(String),
    #[error("E488: {0}")]
    BadExSyntax(String),
    #[error("E383: invalid pattern: {0}")]
    BadPattern(String),
    #[error("wrong number of arguments for {0}")]
    ArgCount(String),
    #[error("E477: no ! allowed: {0}")]
    BangNotAllowed(String),
    #[error("E384: pattern not found: {0}")]
    PatternNotFound(String),
    #[error("{0}")]
    NotFound(String),
    #[error("macro recursion too deep, playback aborted")]
    MacroRecursion,
    #[error("E37: no write since last change (add ! to override)")]
    UnsavedChanges,
}

pub type Result<T> = std::result::Result<T, EditorError>;
