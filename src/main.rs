use std::path::PathBuf;

use examwatch_lib::config::{ProctorConfig, DEFAULT_CONFIG_FILE};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let Some(assessment) = args.next().map(PathBuf::from) else {
        eprintln!("Usage: examwatch <assessment.json> [config-file]");
        std::process::exit(2);
    };
    let config_file = args.next().unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    let config = match ProctorConfig::load(&config_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = examwatch_lib::run(config, &assessment).await {
        eprintln!("Error running exam: {:#}", e);
        std::process::exit(1);
    }
}
