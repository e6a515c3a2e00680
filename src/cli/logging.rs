// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::sync::atomic::{AtomicBool, Ordering};

/// Global verbosity flag.
static VERBOSE: AtomicBool = AtomicBool::new(true);

/// Set the global verbosity flag.
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

/// Check if verbose output is enabled.
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Macro for `[INFO]` progress messages; silenced by `--quiet`.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{
        use ::colored::Colorize;
        if $crate::cli::logging::is_verbose() {
            println!("{} {}", "[INFO]".green().bold(), format!($($arg)*));
        }
    }};
}

/// Macro for `[WARNING]` messages.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        use ::colored::Colorize;
        eprintln!("{} {}", "[WARNING]".yellow().bold(), format!($($arg)*));
    }};
}

/// Macro for `[ERROR]` messages.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        use ::colored::Colorize;
        eprintln!("{} {}", "[ERROR]".red().bold(), format!($($arg)*));
    }};
}

/// Macro for success messages.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {{
        use ::colored::Colorize;
        if $crate::cli::logging::is_verbose() {
            println!("{} {}", "✅".green(), format!($($arg)*));
        }
    }};
}

/// Macro for untagged verbose output.
#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => {
        if $crate::cli::logging::is_verbose() {
            println!("{}", format!($($arg)*));
        }
    };
}
