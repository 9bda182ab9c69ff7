use std::process::ExitCode;

use npc_engine::run_app;
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    if let Err(err) = run_app(app.config, app.frontend) {
        error!(error = %err, "app_failed");
        return ExitCode::FAILURE;
    }

    info!("=== NPC Demo Shutdown ===");
    ExitCode::SUCCESS
}
