mod config;
mod gateway;
mod presenter;
mod types;

use env_logger::Env;
use log::{error, info};

#[macro_use]
extern crate failure;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    info!("Starting plate-gateway");

    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    gateway::run(config).await;
    info!("Exiting main");
}
