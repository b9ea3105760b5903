mod app;
mod scenes;

use std::process::ExitCode;

fn main() -> ExitCode {
    app::run()
}
