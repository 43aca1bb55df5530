use std::time::Duration;
use tokio::time::timeout;

use crate::api::middleware::AppError;
use crate::models::{ResponseMetadata, Row, SynthesisOutcome, TableSchema};
use crate::services::llm::{build_synthesis_prompt, build_text_to_sql_prompt, extract_sql, LlmClient};

/// Prompt-driven steps: natural language to SQL, and SQL results to an answer
///
/// The model client is passed to every call; the service itself holds no
/// per-invocation state.
#[derive(Debug, Clone)]
pub struct LlmService {
    timeout: Duration,
}

impl LlmService {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Translate a question into one SQL statement against `table_name`
    ///
    /// The model is called exactly once. A reply with no recognizable statement
    /// is an `InvalidQuery` error.
    pub async fn translate_to_sql(
        &self,
        llm: &dyn LlmClient,
        question: &str,
        table_name: &str,
        schema: &TableSchema,
    ) -> Result<String, AppError> {
        let prompt = build_text_to_sql_prompt(table_name, schema, question);
        let reply = self.call(llm, &prompt).await?;
        tracing::debug!("Text-to-SQL reply: {}", reply);

        let sql = extract_sql(&reply)?;
        tracing::info!("Translated question into SQL: {}", sql);
        Ok(sql)
    }

    /// Answer the question from the SQL results
    ///
    /// The reply is returned verbatim, including replies saying the answer is
    /// unknown.
    pub async fn synthesize_response(
        &self,
        llm: &dyn LlmClient,
        question: &str,
        sql: &str,
        rows: &[Row],
        schema: &TableSchema,
    ) -> Result<SynthesisOutcome, AppError> {
        let prompt = build_synthesis_prompt(question, sql, rows, schema);
        let answer = self.call(llm, &prompt).await?;

        Ok(SynthesisOutcome {
            answer,
            metadata: ResponseMetadata {
                sql_query: sql.to_string(),
                table_schema: schema.to_string(),
            },
        })
    }

    /// Bound applied to every model call
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn call(&self, llm: &dyn LlmClient, prompt: &str) -> Result<String, AppError> {
        timeout(self.timeout, llm.complete(prompt))
            .await
            .map_err(|_| {
                AppError::Timeout(format!(
                    "Language model {} did not reply within {:?}",
                    llm.model().as_str(),
                    self.timeout
                ))
            })?
    }
}
