use anyhow::Result;
use inference_server::config::AppConfig;
use inference_server::logger::init_logger;
use inference_server::{InferenceEngine, Server};
use log::info;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logger();

    let config = AppConfig::from_env()?;

    let engine = Arc::new(InferenceEngine::from_config(&config.model));
    info!(
        "🚀Price trend inference service starting (model loaded: {})",
        engine.is_loaded()
    );

    let server = Server::init(engine);
    server.run(&config.server).await?;

    info!("Server has been shut down gracefully");
    Ok(())
}
