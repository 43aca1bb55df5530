use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Fetching or registering the dataset failed
    #[error("Dataset load error: {0}")]
    DatasetLoad(String),

    /// The engine rejected the statement, or no statement could be extracted
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String, sql: String },

    /// A required collaborator was not configured
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unexpected failure inside an orchestration step
    #[error("Workflow execution error: {0}")]
    WorkflowExecution(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Agent did not reach a final answer within {0} turns")]
    AgentDidNotConverge(usize),

    #[error("LLM service error: {0}")]
    LlmService(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid_query(message: impl Into<String>, sql: impl Into<String>) -> Self {
        AppError::InvalidQuery {
            message: message.into(),
            sql: sql.into(),
        }
    }

    /// Stable error code used in response bodies and logs
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DatasetLoad(_) => "DATASET_LOAD_ERROR",
            AppError::InvalidQuery { .. } => "INVALID_QUERY",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::WorkflowExecution(_) => "WORKFLOW_EXECUTION_ERROR",
            AppError::Timeout(_) => "TIMEOUT",
            AppError::AgentDidNotConverge(_) => "AGENT_DID_NOT_CONVERGE",
            AppError::LlmService(_) => "LLM_SERVICE_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the failure is fatal for an agent run even when raised inside a tool
    pub fn aborts_agent(&self) -> bool {
        matches!(self, AppError::Timeout(_) | AppError::Configuration(_))
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let message = self.to_string();

        let (status, error_detail) = match self {
            AppError::InvalidQuery { sql, .. } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new(code, message).with_details(format!("SQL: {}", sql)),
            ),
            AppError::DatasetLoad(_) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new(code, message).with_details(
                    "Check that the dataset exists and is readable, or set refreshDataset to reload it.",
                ),
            ),
            AppError::LlmService(_) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new(code, message)
                    .with_details("Check the LLM provider API key and the selected model."),
            ),
            AppError::WorkflowExecution(_)
            | AppError::Timeout(_)
            | AppError::AgentDidNotConverge(_)
            | AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorDetail::new(code, message)),
            AppError::Configuration(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(code, message),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_detail,
        });

        (status, body).into_response()
    }
}

/// Convert anyhow::Error to AppError
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::WorkflowExecution(format!("{:#}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}
