use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::middleware::AppError;

/// One result row: column name to value
pub type Row = Map<String, Value>;

/// Language models a caller may pick for SQL generation and synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelName {
    #[default]
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "o1")]
    O1,
    #[serde(rename = "o1-mini")]
    O1Mini,
    #[serde(rename = "o3-mini")]
    O3Mini,
}

impl ModelName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelName::Gpt4oMini => "gpt-4o-mini",
            ModelName::Gpt4o => "gpt-4o",
            ModelName::O1 => "o1",
            ModelName::O1Mini => "o1-mini",
            ModelName::O3Mini => "o3-mini",
        }
    }

    /// Reasoning models reject an explicit sampling temperature
    pub fn supports_temperature(&self) -> bool {
        matches!(self, ModelName::Gpt4oMini | ModelName::Gpt4o)
    }
}

/// Caller input, accepted as query-string parameters or a JSON body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryInput {
    /// Natural-language question or SQL using the table name `dataset`
    pub query: String,
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub model_name: ModelName,
    pub llm_provider_api_key: String,
    #[serde(default)]
    pub refresh_dataset: bool,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    /// Webhook payload from an upstream run; its default dataset wins over `datasetId`
    #[serde(default)]
    pub payload: Option<Value>,
}

impl QueryInput {
    /// Resolve the dataset id and reject empty required fields
    pub fn validate(mut self) -> Result<Self, AppError> {
        let from_payload = self
            .payload
            .as_ref()
            .and_then(|p| p.pointer("/resource/defaultDatasetId"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|id| !id.trim().is_empty());

        let dataset_id = from_payload
            .or_else(|| self.dataset_id.take())
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AppError::Validation(
                    "The `datasetId` is not provided. Pass it directly or through the \
                     `payload.resource.defaultDatasetId` of an upstream run."
                        .to_string(),
                )
            })?;
        self.dataset_id = Some(dataset_id);

        if self.query.trim().is_empty() {
            return Err(AppError::Validation("Query cannot be empty".to_string()));
        }
        if self.llm_provider_api_key.trim().is_empty() {
            return Err(AppError::Validation(
                "LLM provider API key cannot be empty".to_string(),
            ));
        }

        Ok(self)
    }

    /// Dataset id after `validate`; empty before it
    pub fn dataset_id(&self) -> &str {
        self.dataset_id.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub sql_query: String,
    pub table_schema: String,
}

/// Final answer of one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisOutcome {
    pub answer: String,
    pub metadata: ResponseMetadata,
}

/// Body returned to HTTP callers
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(value: Value) -> QueryInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_defaults_apply() {
        let parsed = input(json!({
            "query": "SELECT * FROM dataset",
            "datasetId": "abc",
            "llmProviderApiKey": "sk-test"
        }));
        assert_eq!(parsed.model_name, ModelName::Gpt4oMini);
        assert!(!parsed.refresh_dataset);
        assert_eq!(parsed.limit, None);
    }

    #[test]
    fn test_model_name_wire_format() {
        let parsed = input(json!({
            "query": "q",
            "datasetId": "abc",
            "modelName": "o3-mini",
            "llmProviderApiKey": "sk-test"
        }));
        assert_eq!(parsed.model_name, ModelName::O3Mini);
        assert!(!parsed.model_name.supports_temperature());
        assert_eq!(ModelName::Gpt4o.as_str(), "gpt-4o");
    }

    #[test]
    fn test_payload_dataset_wins() {
        let parsed = input(json!({
            "query": "q",
            "datasetId": "manual",
            "llmProviderApiKey": "sk-test",
            "payload": {"resource": {"defaultDatasetId": "fromRun"}}
        }))
        .validate()
        .unwrap();
        assert_eq!(parsed.dataset_id(), "fromRun");
    }

    #[test]
    fn test_missing_dataset_is_rejected() {
        let result = input(json!({"query": "q", "llmProviderApiKey": "sk"})).validate();
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_blank_query_is_rejected() {
        let result = input(json!({"query": "  ", "datasetId": "d", "llmProviderApiKey": "sk"}))
            .validate();
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_unknown_model_fails_to_parse() {
        let result = serde_json::from_value::<QueryInput>(json!({
            "query": "q",
            "datasetId": "d",
            "modelName": "gpt-2",
            "llmProviderApiKey": "sk"
        }));
        assert!(result.is_err());
    }
}
