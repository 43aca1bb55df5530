// Query Resolution Workflow
//
// Fixed graph with one branch point:
//
//   START -> CLASSIFY -> EXECUTE_DIRECT -> EXECUTE -> SYNTHESIZE -> DONE
//                    \-> TRANSLATE ------/
//
// Every step either advances or aborts the run; nothing is retried.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::api::middleware::AppError;
use crate::config::StrategyKind;
use crate::models::{Row, SynthesisOutcome, TableSchema};
use crate::services::datafusion::{DataFusionQueryExecutor, DatasetCatalog};
use crate::services::item_store::FetchOptions;
use crate::services::llm_service::LlmService;
use crate::services::query_service::{QueryResolver, ResolveRequest};
use crate::validation::{is_sql, substitute_placeholder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Start,
    Classify,
    ExecuteDirect,
    Translate,
    Execute,
    Synthesize,
    Done,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Start => "START",
            WorkflowState::Classify => "CLASSIFY",
            WorkflowState::ExecuteDirect => "EXECUTE_DIRECT",
            WorkflowState::Translate => "TRANSLATE",
            WorkflowState::Execute => "EXECUTE",
            WorkflowState::Synthesize => "SYNTHESIZE",
            WorkflowState::Done => "DONE",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Each state carries exactly the data produced by the states before it
enum Step {
    Start,
    Classify { schema: TableSchema },
    ExecuteDirect { schema: TableSchema },
    Translate { schema: TableSchema },
    Execute { schema: TableSchema, sql: String },
    Synthesize { schema: TableSchema, sql: String, rows: Vec<Row> },
    Done(SynthesisOutcome),
}

impl Step {
    fn state(&self) -> WorkflowState {
        match self {
            Step::Start => WorkflowState::Start,
            Step::Classify { .. } => WorkflowState::Classify,
            Step::ExecuteDirect { .. } => WorkflowState::ExecuteDirect,
            Step::Translate { .. } => WorkflowState::Translate,
            Step::Execute { .. } => WorkflowState::Execute,
            Step::Synthesize { .. } => WorkflowState::Synthesize,
            Step::Done(_) => WorkflowState::Done,
        }
    }
}

/// Result of one workflow run
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    pub outcome: SynthesisOutcome,
    /// States in the order they were entered, ending with `Done`
    pub visited: Vec<WorkflowState>,
    pub row_count: usize,
}

impl WorkflowRun {
    pub fn took(&self, state: WorkflowState) -> bool {
        self.visited.contains(&state)
    }
}

pub struct QueryWorkflow {
    catalog: Arc<DatasetCatalog>,
    executor: DataFusionQueryExecutor,
    llm_service: LlmService,
}

impl QueryWorkflow {
    pub fn new(
        catalog: Arc<DatasetCatalog>,
        executor: DataFusionQueryExecutor,
        llm_service: LlmService,
    ) -> Self {
        Self {
            catalog,
            executor,
            llm_service,
        }
    }

    /// Drive the request from START to DONE
    pub async fn run(&self, request: &ResolveRequest) -> Result<WorkflowRun, AppError> {
        let mut step = Step::Start;
        let mut visited = Vec::new();
        let mut row_count = 0;

        loop {
            visited.push(step.state());
            tracing::debug!("Workflow entering {}", step.state());

            step = match step {
                Step::Start => {
                    let schema = match &request.schema {
                        Some(schema) => schema.clone(),
                        None => {
                            self.catalog
                                .load(&request.table_name, false, &FetchOptions::default())
                                .await?
                                .schema
                        }
                    };
                    Step::Classify { schema }
                }
                Step::Classify { schema } => {
                    if is_sql(&request.query) {
                        tracing::info!("Query is SQL, executing directly");
                        Step::ExecuteDirect { schema }
                    } else {
                        tracing::info!("Query is natural language, translating to SQL");
                        Step::Translate { schema }
                    }
                }
                Step::ExecuteDirect { schema } => {
                    let sql = substitute_placeholder(&request.query, &request.table_name);
                    Step::Execute { schema, sql }
                }
                Step::Translate { schema } => {
                    let sql = self
                        .llm_service
                        .translate_to_sql(
                            request.llm.as_ref(),
                            &request.query,
                            &request.table_name,
                            &schema,
                        )
                        .await?;
                    Step::Execute { schema, sql }
                }
                Step::Execute { schema, sql } => {
                    tracing::info!("Executing SQL: {}", sql);
                    let result = self.executor.execute(&sql).await?;
                    row_count = result.row_count;
                    Step::Synthesize {
                        schema,
                        sql,
                        rows: result.rows,
                    }
                }
                Step::Synthesize { schema, sql, rows } => {
                    let outcome = self
                        .llm_service
                        .synthesize_response(request.llm.as_ref(), &request.query, &sql, &rows, &schema)
                        .await?;
                    Step::Done(outcome)
                }
                Step::Done(outcome) => {
                    tracing::info!(
                        "Workflow finished via {} with {} rows",
                        visited
                            .iter()
                            .map(WorkflowState::as_str)
                            .collect::<Vec<_>>()
                            .join(" -> "),
                        row_count
                    );
                    return Ok(WorkflowRun {
                        outcome,
                        visited,
                        row_count,
                    });
                }
            };
        }
    }
}

#[async_trait]
impl QueryResolver for QueryWorkflow {
    async fn resolve(&self, request: ResolveRequest) -> Result<SynthesisOutcome, AppError> {
        Ok(self.run(&request).await?.outcome)
    }

    fn strategy(&self) -> StrategyKind {
        StrategyKind::Workflow
    }
}
