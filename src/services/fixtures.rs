use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{
    AppConfig, BatchConfig, Config, EngineConfig, ItemStoreConfig, LlmConfig, LoggingConfig,
    QueryConfig, RunMode, ServerConfig, StrategyKind,
};
use crate::models::TableSchema;
use crate::services::datafusion::{DataFusionQueryExecutor, DataFusionSessionManager, DatasetCatalog};
use crate::services::item_store::testing::InMemoryItemStore;
use crate::services::item_store::FetchOptions;

pub const DATASET_ID: &str = "nLlhc8Fz9S5dCTQab";

pub fn restaurants() -> Value {
    json!([
        {
            "title": "Lucia Pizza Of Avenue X",
            "totalScore": 4.5,
            "phone": "(718) 646-7122",
            "categories": ["Pizza restaurant"]
        },
        {
            "title": "Joe's Diner",
            "totalScore": 3.9,
            "phone": "(718) 555-0100",
            "categories": ["Diner"]
        },
        {
            "title": "Taco Place",
            "totalScore": 4.8,
            "phone": null,
            "categories": ["Mexican restaurant"]
        }
    ])
}

/// Catalog and executor sharing one session, backed by an in-memory store
pub struct EngineFixture {
    pub store: Arc<InMemoryItemStore>,
    pub catalog: Arc<DatasetCatalog>,
    pub executor: DataFusionQueryExecutor,
}

impl EngineFixture {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryItemStore::new().with_dataset(DATASET_ID, restaurants()));
        let ctx = DataFusionSessionManager::default_config()
            .create_session()
            .unwrap();
        let catalog = Arc::new(DatasetCatalog::new(
            ctx.clone(),
            store.clone(),
            Duration::from_secs(5),
        ));
        let executor = DataFusionQueryExecutor::new(ctx, Duration::from_secs(5));
        Self {
            store,
            catalog,
            executor,
        }
    }

    /// Fixture with the restaurant dataset already loaded
    pub async fn loaded() -> (Self, TableSchema) {
        let fixture = Self::new();
        let handle = fixture
            .catalog
            .load(DATASET_ID, false, &FetchOptions::default())
            .await
            .unwrap();
        (fixture, handle.schema)
    }
}

/// Configuration with short timeouts and a small agent turn limit
pub fn test_config(strategy: StrategyKind) -> Config {
    Config {
        app: AppConfig {
            mode: RunMode::Standby,
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        },
        item_store: ItemStoreConfig {
            base_url: "http://localhost".to_string(),
            token: None,
            timeout_secs: 5,
        },
        llm: LlmConfig {
            api_base_url: "http://localhost/v1".to_string(),
            timeout_secs: 5,
        },
        engine: EngineConfig {
            batch_size: 8192,
            query_timeout_secs: 5,
            read_only: true,
        },
        query: QueryConfig {
            strategy,
            max_agent_turns: 4,
        },
        batch: BatchConfig {
            input_path: "./input.json".to_string(),
        },
        logging: LoggingConfig {
            level: "info".to_string(),
        },
    }
}
