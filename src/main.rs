// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! `yolov8-detect` command-line entry point.

use std::process;

fn main() {
    process::exit(yolov8_detect::cli::run(std::env::args()));
}
