use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use dataset_query_agent::api::routes::{create_router, AppState};
use dataset_query_agent::batch::run_batch;
use dataset_query_agent::config::{Config, RunMode};
use dataset_query_agent::services::{ApifyItemStore, OpenAiClientFactory, QueryEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.logging.level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let store = Arc::new(ApifyItemStore::new(&config.item_store)?);
    let engine = Arc::new(QueryEngine::new(&config, store)?);
    let llm_factory = Arc::new(OpenAiClientFactory::new(&config.llm));

    match config.app.mode {
        RunMode::Standby => {
            let app = create_router(AppState::new(engine, llm_factory));

            let addr: SocketAddr = config.server_address().parse()?;
            info!("Server listening on {}", addr);

            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await?;
        }
        RunMode::Batch => {
            let output = run_batch(Path::new(&config.batch.input_path), &engine, llm_factory.as_ref())
                .await
                .map_err(|e| {
                    error!("Batch run failed: {}", e);
                    e
                })?;
            info!("Answer for dataset {}: {}", output.dataset_id, output.answer);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
