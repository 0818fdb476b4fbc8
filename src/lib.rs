// Export modules for use in tests
pub mod event_source;
pub mod library;
pub mod panic_handler;
pub mod progress;
pub mod settings;
pub mod shell;
pub mod theme;
pub mod viewer;

pub use shell::{ReaderShell, run_shell};
pub use viewer::{DocumentLocator, FormatKind, FormatRegistry, ViewerOptions, ViewerService};
