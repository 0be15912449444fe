use std::net::SocketAddr;

use foodgram_api::{api, config::EnvConfig, context::Context};

#[tokio::main]
async fn main() {
    env_logger::init();
    let config = EnvConfig::from_env();

    let addr: SocketAddr = match config.address().parse() {
        Ok(addr) => addr,
        Err(e) => {
            log::error!("Invalid HOST/PORT {}: {e}", config.address());
            std::process::exit(1);
        }
    };

    let ctx = match Context::from_config(config).await {
        Ok(ctx) => ctx,
        Err(e) => {
            log::error!("Failed to start: {e}");
            std::process::exit(1);
        }
    };

    log::info!("Starting server on {}", addr);
    warp::serve(api::routes(ctx)).run(addr).await;
}
