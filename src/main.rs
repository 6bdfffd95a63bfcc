use std::sync::Arc;

use aibackend::config::{load_config, print_schema};
use aibackend::startup::run;
use aibackend::utils::logger::init_logging;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if std::env::args().any(|arg| arg == "--schema") {
        if let Err(e) = print_schema() {
            eprintln!("Error rendering configuration schema: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let config = load_config();
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    info!("[aibackend] Starting...");
    if let Err(e) = run(Arc::new(config)).await {
        error!("[aibackend] Fatal: {}", e);
        std::process::exit(1);
    }
}
