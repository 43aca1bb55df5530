use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::api::middleware::AppError;
use crate::api::routes::AppState;
use crate::models::{QueryInput, QueryResponse};

/// Header the platform sets on readiness probes
pub const READINESS_PROBE_HEADER: &str = "x-apify-container-server-readiness-probe";

fn is_readiness_probe(headers: &HeaderMap) -> bool {
    headers
        .get(READINESS_PROBE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| !v.trim().is_empty() && v.trim() != "0")
        .unwrap_or(false)
}

/// Answer a query passed as query-string parameters
pub async fn handle_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, AppError> {
    if is_readiness_probe(&headers) {
        tracing::debug!("Readiness probe received");
        return Ok(Json(json!({ "status": "ok" })).into_response());
    }

    if uri.query().map_or(true, str::is_empty) {
        return Ok(Json(json!({ "message": "Hello from Actor" })).into_response());
    }

    let Query(input) = Query::<QueryInput>::try_from_uri(&uri)
        .map_err(|e| AppError::Validation(format!("Invalid query parameters: {}", e.body_text())))?;

    Ok(run_query(&state, input).await?.into_response())
}

/// Answer a query passed as a JSON body
pub async fn handle_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    if is_readiness_probe(&headers) {
        return Ok(Json(json!({ "status": "ok" })).into_response());
    }

    let input: QueryInput = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))?;

    Ok(run_query(&state, input).await?.into_response())
}

async fn run_query(state: &AppState, input: QueryInput) -> Result<Json<QueryResponse>, AppError> {
    let input = input.validate()?;
    tracing::info!(
        "Executing query for dataset {} with model {}",
        input.dataset_id(),
        input.model_name.as_str()
    );

    let llm = state
        .llm_factory
        .create(input.model_name, &input.llm_provider_api_key)?;
    let outcome = state.engine.answer(&input, llm).await?;

    Ok(Json(QueryResponse {
        message: outcome.answer,
    }))
}
