//! Main application entry point.

use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Starting Dragline");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [config, script] = args.as_slice() else {
        eprintln!("usage: dragline <config.json> <script.json>");
        return ExitCode::FAILURE;
    };

    let report = match dragline_app::replay(Path::new(config), Path::new(script)) {
        Ok(report) => report,
        Err(e) => {
            log::error!("Replay failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Failed to serialize report: {e}");
            ExitCode::FAILURE
        }
    }
}
