// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Command-line interface.
//!
//! This module contains argument parsing, user-facing logging and the detection
//! loop driven by the `yolov8-detect` binary.

use clap::{CommandFactory, Parser};
use clap::error::ErrorKind;

use crate::error;

/// CLI arguments.
pub mod args;

/// Tagged terminal output.
pub mod logging;

/// Prediction logic.
pub mod predict;

use args::{Cli, normalize_args};

/// Parse `argv`, run detection and return the process exit code.
///
/// `0` on success or help/version output, `1` on argument errors, missing
/// inputs or a model that cannot be loaded.
pub fn run<I, T>(argv: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let cli = match Cli::try_parse_from(normalize_args(argv)) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{e}");
            return 0;
        }
        Err(e) => {
            let message = e.to_string();
            let first = message.lines().next().unwrap_or_default();
            error!("{}", first.trim_start_matches("error: "));
            eprintln!("\n{}", Cli::command().render_usage());
            return 1;
        }
    };

    match predict::run_prediction(&cli) {
        Ok(()) => 0,
        Err(e) => {
            error!("{e}");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_for_arguments() {
        assert_eq!(run(["yolov8-detect", "--help"]), 0);
        assert_eq!(run(["yolov8-detect", "--version"]), 0);
        assert_eq!(run(["yolov8-detect", "-img", "x", "--unknown"]), 1);
        assert_eq!(run(["yolov8-detect"]), 1);
    }

    #[test]
    fn test_missing_inputs_exit_one() {
        let code = run([
            "yolov8-detect",
            "-img",
            "/nonexistent/images",
            "--classes",
            "coco",
        ]);
        assert_eq!(code, 1);
    }
}
