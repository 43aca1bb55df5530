//! One-shot mode: answer the single input found at `batch.input_path` and exit.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::api::middleware::AppError;
use crate::models::{QueryInput, ResponseMetadata};
use crate::services::{LlmClientFactory, QueryEngine};

/// Record emitted for one answered input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutput {
    pub dataset_id: String,
    pub query: String,
    pub answer: String,
    pub metadata: ResponseMetadata,
}

/// Read and validate the input document
pub async fn read_input(path: &Path) -> Result<QueryInput, AppError> {
    let raw = tokio::fs::read(path).await.map_err(|e| {
        AppError::Configuration(format!("Failed to read input {}: {}", path.display(), e))
    })?;
    let input: QueryInput = serde_json::from_slice(&raw)
        .map_err(|e| AppError::Validation(format!("Invalid input {}: {}", path.display(), e)))?;
    input.validate()
}

pub async fn run_batch(
    input_path: &Path,
    engine: &QueryEngine,
    llm_factory: &dyn LlmClientFactory,
) -> Result<BatchOutput, AppError> {
    let input = read_input(input_path).await?;
    tracing::info!("Running batch query against dataset {}", input.dataset_id());

    let llm = llm_factory.create(input.model_name, &input.llm_provider_api_key)?;
    let outcome = engine.answer(&input, llm).await?;

    Ok(BatchOutput {
        dataset_id: input.dataset_id().to_string(),
        query: input.query,
        answer: outcome.answer,
        metadata: outcome.metadata,
    })
}
