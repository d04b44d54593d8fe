use std::env;
use std::path::PathBuf;
use std::time::Duration;

use kavi::{load_config, App, Terminal};

fn main() -> anyhow::Result<()> {
    let (settings, config_err) = load_config();

    let mut app = App::new();
    settings.apply(&mut app);
    if let Some(err) = config_err {
        app.editor.set_error(err);
    }

    // Open files from the command line; the first one gets focus.
    let mut first = None;
    for arg in env::args().skip(1) {
        let id = app.editor.open_file(PathBuf::from(arg))?;
        first.get_or_insert(id);
    }
    if let Some(id) = first {
        app.editor.show_buffer(id);
    }

    let mut terminal = Terminal::new()?;
    loop {
        terminal.render(&mut app.editor)?;
        if let Some(key) = terminal.read_key(Duration::from_millis(250))? {
            app.handle_key(key);
        }
        if app.editor.should_quit {
            break;
        }
    }
    Ok(())
}
