pub mod agent;
pub mod datafusion; // DataFusion table registry and execution
pub mod item_store;
pub mod llm;
pub mod llm_service;
pub mod query_service;
pub mod workflow;

#[cfg(test)]
pub(crate) mod fixtures;

pub use agent::{ToolCallingAgent, DEFAULT_MAX_TURNS};
pub use item_store::{ApifyItemStore, FetchOptions, ItemStore};
pub use llm::{LlmClient, LlmClientFactory, OpenAiClientFactory};
pub use llm_service::*;
pub use query_service::*;
pub use workflow::{QueryWorkflow, WorkflowRun, WorkflowState};
