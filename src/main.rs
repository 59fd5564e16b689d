use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use ripd::cli::Cli;
use ripd::config;
use ripd::instance::Instance;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match config::load(&PathBuf::from(&cli.config)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        "loaded config for router {}: {} input port(s), {} neighbour(s)",
        config.router_id,
        config.input_ports.len(),
        config.outputs.len()
    );

    let instance = match Instance::new(config).await {
        Ok(instance) => instance,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        result = instance.run() => {
            if let Err(err) = result {
                error!("fatal: {err}");
                return ExitCode::FAILURE;
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
    }

    ExitCode::SUCCESS
}
