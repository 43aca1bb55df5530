use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub server: ServerConfig,
    pub item_store: ItemStoreConfig,
    pub llm: LlmConfig,
    pub engine: EngineConfig,
    pub query: QueryConfig,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Long-lived HTTP server answering many queries
    Standby,
    /// Answer a single input and exit
    Batch,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub mode: RunMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemStoreConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub api_base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub batch_size: usize,
    pub query_timeout_secs: u64,
    pub read_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Fixed classify -> translate -> execute -> synthesize graph
    Workflow,
    /// Tool-calling reasoning loop
    Agent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    pub strategy: StrategyKind,
    pub max_agent_turns: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    pub input_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Try to load from .env file before reading overrides
        let _ = dotenv::dotenv();

        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build the configuration, reading overrides through `lookup` instead of the
    /// process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, config::ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = config::Config::builder()
            .set_default("app.mode", "standby")?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("item_store.base_url", "https://api.apify.com")?
            .set_default("item_store.timeout_secs", 120)?
            .set_default("llm.api_base_url", "https://api.openai.com/v1")?
            .set_default("llm.timeout_secs", 60)?
            .set_default("engine.batch_size", 8192)?
            .set_default("engine.query_timeout_secs", 30)?
            .set_default("engine.read_only", true)?
            .set_default("query.strategy", "workflow")?
            .set_default("query.max_agent_turns", 10)?
            .set_default("batch.input_path", "./input.json")?
            .set_default("logging.level", "info")?;

        let overrides = [
            ("APP_MODE", "app.mode"),
            ("HOST", "server.host"),
            ("APIFY_API_BASE_URL", "item_store.base_url"),
            ("APIFY_TOKEN", "item_store.token"),
            ("ITEM_STORE_TIMEOUT_SECS", "item_store.timeout_secs"),
            ("OPENAI_API_BASE_URL", "llm.api_base_url"),
            ("LLM_TIMEOUT_SECS", "llm.timeout_secs"),
            ("QUERY_TIMEOUT_SECS", "engine.query_timeout_secs"),
            ("ENGINE_READ_ONLY", "engine.read_only"),
            ("QUERY_STRATEGY", "query.strategy"),
            ("MAX_AGENT_TURNS", "query.max_agent_turns"),
            ("INPUT_PATH", "batch.input_path"),
            ("RUST_LOG", "logging.level"),
        ];
        for (var, key) in overrides {
            if let Some(value) = lookup(var) {
                // Enum-valued keys are matched case-insensitively
                let value = match key {
                    "app.mode" | "query.strategy" => value.to_lowercase(),
                    _ => value,
                };
                builder = builder.set_override(key, value)?;
            }
        }

        // The platform assigns the standby port; PORT is the local fallback
        if let Some(port) = lookup("ACTOR_STANDBY_PORT").or_else(|| lookup("PORT")) {
            let port = port.trim().parse::<u16>().map_err(|e| {
                config::ConfigError::Message(format!("Invalid server port {:?}: {}", port, e))
            })?;
            builder = builder.set_override("server.port", i64::from(port))?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }

    pub fn item_store_timeout(&self) -> Duration {
        Duration::from_secs(self.item_store.timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.engine.query_timeout_secs)
    }
}
