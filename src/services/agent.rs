// Tool-Calling Agent
//
// Exposes classify, translate, execute and synthesize as tools and lets the
// model pick the order. Tool calls run one at a time against an
// invocation-scoped context; the loop stops after a fixed number of turns.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;

use crate::api::middleware::AppError;
use crate::config::StrategyKind;
use crate::models::{ResponseMetadata, Row, SynthesisOutcome, TableSchema};
use crate::services::datafusion::{DataFusionQueryExecutor, DatasetCatalog};
use crate::services::item_store::FetchOptions;
use crate::services::llm::{
    build_agent_system_prompt, LlmResponse, Message, ToolCall, ToolDefinition, ToolResult,
};
use crate::services::llm_service::LlmService;
use crate::services::query_service::{QueryResolver, ResolveRequest};
use crate::validation::{is_sql, substitute_placeholder};

pub const DEFAULT_MAX_TURNS: usize = 10;

const IS_QUERY_SQL: &str = "is_query_sql";
const USER_QUERY_TO_SQL: &str = "user_query_to_sql";
const EXECUTE_SQL: &str = "execute_sql";
const SYNTHESIZE_RESULTS: &str = "synthesize_results";

#[derive(Debug, Deserialize)]
struct QueryArgs {
    query: String,
}

#[derive(Debug, Deserialize)]
struct ExecuteSqlArgs {
    sql_query: String,
}

#[derive(Debug, Deserialize)]
struct SynthesizeArgs {
    query: String,
    sql_query: String,
}

/// Tools offered to the model on every turn.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: IS_QUERY_SQL.to_string(),
            description: "Determine whether the given string is a SQL query based on common \
                          SQL keywords."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "String to evaluate" }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: USER_QUERY_TO_SQL.to_string(),
            description: "Convert a user query written in natural language into a SQL query \
                          against the dataset table. If you need a LIKE filter on an array, \
                          unnest it first."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "The natural language question" }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: EXECUTE_SQL.to_string(),
            description: "Execute an SQL query against the dataset table and return the rows."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "sql_query": { "type": "string", "description": "The SQL query to execute" }
                },
                "required": ["sql_query"]
            }),
        },
        ToolDefinition {
            name: SYNTHESIZE_RESULTS.to_string(),
            description: "Synthesize a human-readable answer to the user query from the results \
                          of the executed SQL query."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "The original user query" },
                    "sql_query": { "type": "string", "description": "The executed SQL query" }
                },
                "required": ["query", "sql_query"]
            }),
        },
    ]
}

/// Scratch state for one agent run, never shared across invocations.
struct AgentContext<'a> {
    request: &'a ResolveRequest,
    schema: TableSchema,
    last_sql: Option<String>,
    last_rows: Vec<Row>,
    last_outcome: Option<SynthesisOutcome>,
}

pub struct ToolCallingAgent {
    catalog: Arc<DatasetCatalog>,
    executor: DataFusionQueryExecutor,
    llm_service: LlmService,
    max_turns: usize,
}

impl ToolCallingAgent {
    pub fn new(
        catalog: Arc<DatasetCatalog>,
        executor: DataFusionQueryExecutor,
        llm_service: LlmService,
    ) -> Self {
        Self {
            catalog,
            executor,
            llm_service,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub async fn run(&self, request: &ResolveRequest) -> Result<SynthesisOutcome, AppError> {
        let schema = match &request.schema {
            Some(schema) => schema.clone(),
            None => {
                self.catalog
                    .load(&request.table_name, false, &FetchOptions::default())
                    .await?
                    .schema
            }
        };

        let mut messages = vec![
            Message::system(build_agent_system_prompt(&request.table_name, &schema)),
            Message::user(request.query.clone()),
        ];
        let tools = tool_definitions();
        let mut ctx = AgentContext {
            request,
            schema,
            last_sql: None,
            last_rows: Vec::new(),
            last_outcome: None,
        };

        for turn in 1..=self.max_turns {
            let response = self.next_turn(request, &messages, &tools).await?;
            tracing::debug!(
                turn,
                tool_calls = response.tool_calls.len(),
                "Agent turn complete"
            );

            if !response.has_tool_calls() {
                return Self::finish(response.content, ctx);
            }

            messages.push(Message::assistant_with_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            for tool_call in &response.tool_calls {
                let content = self.execute_tool(tool_call, &mut ctx).await?;
                messages.push(Message::tool(ToolResult {
                    tool_call_id: tool_call.id.clone(),
                    content,
                }));
            }
        }

        tracing::warn!("Agent did not reach a final answer in {} turns", self.max_turns);
        Err(AppError::AgentDidNotConverge(self.max_turns))
    }

    async fn next_turn(
        &self,
        request: &ResolveRequest,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse, AppError> {
        let limit = self.llm_service.timeout();
        timeout(limit, request.llm.complete_with_tools(messages, tools))
            .await
            .map_err(|_| {
                AppError::Timeout(format!("Agent turn did not complete within {:?}", limit))
            })?
    }

    /// Final answer from the model's last message, with metadata from the
    /// last SQL that ran
    fn finish(content: String, ctx: AgentContext<'_>) -> Result<SynthesisOutcome, AppError> {
        let answer = match (content.trim().is_empty(), ctx.last_outcome) {
            (false, _) => content,
            (true, Some(outcome)) => outcome.answer,
            (true, None) => {
                return Err(AppError::WorkflowExecution(
                    "Agent finished without producing an answer".to_string(),
                ))
            }
        };

        Ok(SynthesisOutcome {
            answer,
            metadata: ResponseMetadata {
                sql_query: ctx.last_sql.unwrap_or_default(),
                table_schema: ctx.schema.to_string(),
            },
        })
    }

    /// Execute a tool and return its result as a JSON string
    ///
    /// Failures go back to the model as `{"error": ...}` so it can correct
    /// itself, except those that abort the whole run.
    async fn execute_tool(
        &self,
        tool_call: &ToolCall,
        ctx: &mut AgentContext<'_>,
    ) -> Result<String, AppError> {
        let start = Instant::now();
        tracing::debug!(tool_name = %tool_call.name, "Executing tool");

        let result = match tool_call.name.as_str() {
            IS_QUERY_SQL => parse_args::<QueryArgs>(tool_call)
                .map(|args| json!({ "is_sql": is_sql(&args.query) })),
            USER_QUERY_TO_SQL => match parse_args::<QueryArgs>(tool_call) {
                Ok(args) => self.user_query_to_sql(&args.query, ctx).await,
                Err(e) => Err(e),
            },
            EXECUTE_SQL => match parse_args::<ExecuteSqlArgs>(tool_call) {
                Ok(args) => self.execute_sql(&args.sql_query, ctx).await,
                Err(e) => Err(e),
            },
            SYNTHESIZE_RESULTS => match parse_args::<SynthesizeArgs>(tool_call) {
                Ok(args) => self.synthesize_results(&args.query, &args.sql_query, ctx).await,
                Err(e) => Err(e),
            },
            other => {
                tracing::warn!(tool_name = other, "Unknown tool requested");
                Err(AppError::Validation(format!("Unknown tool: {}", other)))
            }
        };

        tracing::debug!(
            tool_name = %tool_call.name,
            duration_ms = start.elapsed().as_millis(),
            ok = result.is_ok(),
            "Tool execution complete"
        );

        match result {
            Ok(value) => Ok(value.to_string()),
            Err(e) if e.aborts_agent() => Err(e),
            Err(e) => {
                tracing::info!(tool_name = %tool_call.name, "Tool failed: {}", e);
                let mut error = json!({ "error": e.to_string() });
                if let AppError::InvalidQuery { sql, .. } = &e {
                    error["sql_query"] = Value::String(sql.clone());
                }
                Ok(error.to_string())
            }
        }
    }

    async fn user_query_to_sql(
        &self,
        query: &str,
        ctx: &AgentContext<'_>,
    ) -> Result<Value, AppError> {
        let sql = self
            .llm_service
            .translate_to_sql(
                ctx.request.llm.as_ref(),
                query,
                &ctx.request.table_name,
                &ctx.schema,
            )
            .await?;
        Ok(json!({ "sql_query": sql }))
    }

    async fn execute_sql(&self, sql_query: &str, ctx: &mut AgentContext<'_>) -> Result<Value, AppError> {
        let sql = substitute_placeholder(sql_query, &ctx.request.table_name);
        self.run_bound_sql(sql, ctx).await
    }

    /// Execute a statement already bound to the dataset table
    async fn run_bound_sql(&self, sql: String, ctx: &mut AgentContext<'_>) -> Result<Value, AppError> {
        let result = self.executor.execute(&sql).await?;
        tracing::info!("Agent executed SQL ({} rows): {}", result.row_count, sql);

        let response = json!({
            "sql_query": sql,
            "row_count": result.row_count,
            "rows": result.rows,
        });
        ctx.last_sql = Some(sql);
        ctx.last_rows = result.rows;
        Ok(response)
    }

    async fn synthesize_results(
        &self,
        query: &str,
        sql_query: &str,
        ctx: &mut AgentContext<'_>,
    ) -> Result<Value, AppError> {
        let sql = substitute_placeholder(sql_query, &ctx.request.table_name);
        // Results of a different statement than the last one executed are fetched first
        if ctx.last_sql.as_deref() != Some(sql.as_str()) {
            self.run_bound_sql(sql.clone(), ctx).await?;
        }

        let outcome = self
            .llm_service
            .synthesize_response(
                ctx.request.llm.as_ref(),
                query,
                &sql,
                &ctx.last_rows,
                &ctx.schema,
            )
            .await?;
        let response = json!({ "answer": outcome.answer });
        ctx.last_outcome = Some(outcome);
        Ok(response)
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(tool_call: &ToolCall) -> Result<T, AppError> {
    serde_json::from_str(&tool_call.arguments).map_err(|e| {
        AppError::Validation(format!("Invalid arguments for tool {}: {}", tool_call.name, e))
    })
}

#[async_trait]
impl QueryResolver for ToolCallingAgent {
    async fn resolve(&self, request: ResolveRequest) -> Result<SynthesisOutcome, AppError> {
        self.run(&request).await
    }

    fn strategy(&self) -> StrategyKind {
        StrategyKind::Agent
    }
}
