use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::api::middleware::AppError;
use crate::config::{Config, StrategyKind};
use crate::models::{QueryInput, SynthesisOutcome, TableSchema};
use crate::services::agent::ToolCallingAgent;
use crate::services::datafusion::{
    DataFusionQueryExecutor, DataFusionSessionManager, DatasetCatalog, SessionConfig,
};
use crate::services::item_store::{FetchOptions, ItemStore};
use crate::services::llm::LlmClient;
use crate::services::llm_service::LlmService;
use crate::services::workflow::QueryWorkflow;

/// Everything one resolution needs, passed explicitly end to end
#[derive(Clone)]
pub struct ResolveRequest {
    pub query: String,
    pub table_name: String,
    /// Loaded at the start of the run when absent
    pub schema: Option<TableSchema>,
    /// Model client scoped to this invocation
    pub llm: Arc<dyn LlmClient>,
}

/// Strategy turning a question into a synthesized answer
#[async_trait]
pub trait QueryResolver: Send + Sync {
    async fn resolve(&self, request: ResolveRequest) -> Result<SynthesisOutcome, AppError>;

    fn strategy(&self) -> StrategyKind;
}

/// Entry point for one invocation: load the dataset, then resolve the query
pub struct QueryEngine {
    catalog: Arc<DatasetCatalog>,
    resolver: Arc<dyn QueryResolver>,
}

impl QueryEngine {
    /// Build the engine and the configured strategy on a fresh session
    pub fn new(config: &Config, store: Arc<dyn ItemStore>) -> Result<Self, AppError> {
        let ctx = DataFusionSessionManager::new(SessionConfig::from(&config.engine))
            .create_session()
            .map_err(|e| AppError::Configuration(format!("Failed to create query session: {:#}", e)))?;

        let catalog = Arc::new(DatasetCatalog::new(
            ctx.clone(),
            store,
            config.item_store_timeout(),
        ));
        let executor = DataFusionQueryExecutor::new(ctx, config.query_timeout())
            .with_read_only(config.engine.read_only);
        let llm_service = LlmService::new(config.llm_timeout());

        let resolver: Arc<dyn QueryResolver> = match config.query.strategy {
            StrategyKind::Workflow => {
                Arc::new(QueryWorkflow::new(catalog.clone(), executor, llm_service))
            }
            StrategyKind::Agent => Arc::new(
                ToolCallingAgent::new(catalog.clone(), executor, llm_service)
                    .with_max_turns(config.query.max_agent_turns),
            ),
        };

        tracing::info!("Query engine ready (strategy: {:?})", resolver.strategy());
        Ok(Self::from_parts(catalog, resolver))
    }

    pub fn from_parts(catalog: Arc<DatasetCatalog>, resolver: Arc<dyn QueryResolver>) -> Self {
        Self { catalog, resolver }
    }

    pub fn strategy(&self) -> StrategyKind {
        self.resolver.strategy()
    }

    /// Answer one validated input with an invocation-scoped model client
    pub async fn answer(
        &self,
        input: &QueryInput,
        llm: Arc<dyn LlmClient>,
    ) -> Result<SynthesisOutcome, AppError> {
        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "invocation",
            id = %invocation_id,
            dataset = %input.dataset_id(),
            model = llm.model().as_str()
        );

        async move {
            let start_time = Instant::now();
            tracing::info!("Received query: {}", input.query);

            let options = FetchOptions {
                limit: input.limit,
                offset: input.offset,
            };
            let handle = self
                .catalog
                .load(input.dataset_id(), input.refresh_dataset, &options)
                .await?;

            let request = ResolveRequest {
                query: input.query.clone(),
                table_name: handle.table_name,
                schema: Some(handle.schema),
                llm,
            };
            let result = self.resolver.resolve(request).await;

            match &result {
                Ok(outcome) => tracing::info!(
                    "Answered in {} ms using SQL: {}",
                    start_time.elapsed().as_millis(),
                    outcome.metadata.sql_query
                ),
                Err(e) => tracing::warn!("Query failed ({}): {}", e.code(), e),
            }
            result
        }
        .instrument(span)
        .await
    }
}
