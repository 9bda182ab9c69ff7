mod bootstrap;
mod commands;
mod controllers;
mod frontend;
mod loop_runner;

use std::process::ExitCode;

pub(crate) fn run() -> ExitCode {
    match bootstrap::build_app() {
        Ok(app) => loop_runner::run(app),
        Err(err) => {
            tracing::error!(error = %err, "startup_failed");
            eprintln!("npc_demo: {err}");
            ExitCode::FAILURE
        }
    }
}
