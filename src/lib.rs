pub mod app;
pub mod commands;
pub mod config;
pub mod editor;
pub mod error;
pub mod input;
pub mod keymap;
pub mod motion;
pub mod terminal;

pub use app::App;
pub use config::{load_config, Settings};
pub use editor::{Editor, Mode};
pub use error::{EditorError, Result};
pub use input::keys::Key;
pub use terminal::Terminal;
