use crossterm::{
    execute,
    terminal::{LeaveAlternateScreen, disable_raw_mode},
};
use std::io::{self, Write};
use std::panic;

use crate::viewer::is_worker_thread;

/// Install better-panic plus a hook that restores the terminal and exits.
///
/// Panics on document worker threads only get logged: the worker catches
/// them and the viewer reports a failed load or render.
pub fn initialize_panic_handler() {
    better_panic::install();

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        if is_worker_thread() {
            log::error!("Document worker panicked: {panic_info}");
            return;
        }

        restore_terminal();
        log::error!("folio panicked: {panic_info}");

        default_hook(panic_info);

        std::process::exit(1);
    }));
}

/// Restore terminal to a clean state
///
/// Disables raw mode, leaves the alternate screen and shows the cursor.
pub fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
    let _ = execute!(io::stderr(), crossterm::cursor::Show);
    let _ = writeln!(io::stderr());
}
