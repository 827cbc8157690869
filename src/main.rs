mod core;
mod interfaces;
mod logging;

use anyhow::Result;
use tracing::error;

use crate::core::config::Config;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    logging::init();

    if let Err(e) = run().await {
        error!("Fatal: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;
    interfaces::discord::run(config).await
}
