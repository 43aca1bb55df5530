// DataFusion SessionManager
//
// Builds the process-wide SessionContext that holds every loaded dataset table.

use datafusion::prelude::*;
use anyhow::Result;

use crate::config::EngineConfig;

/// Configuration for DataFusion sessions
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Batch size for query execution
    pub batch_size: usize,
    /// Number of partitions for parallel execution
    pub target_partitions: usize,
    /// Keep identifier case as written.
    ///
    /// Dataset ids and JSON field names are mixed case (`nLlhc8Fz9S5dCTQab`,
    /// `totalScore`); with normalization on, unquoted references would be lowercased
    /// and miss the registered table and columns.
    pub preserve_identifier_case: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            batch_size: 8192,
            target_partitions: num_cpus::get(),
            preserve_identifier_case: true,
        }
    }
}

impl From<&EngineConfig> for SessionConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            ..Self::default()
        }
    }
}

/// Manages DataFusion SessionContext creation
///
/// # Example
/// ```rust,ignore
/// let manager = DataFusionSessionManager::new(SessionConfig::default());
/// let session = manager.create_session()?;
/// let df = session.sql("SELECT * FROM nLlhc8Fz9S5dCTQab").await?;
/// ```
pub struct DataFusionSessionManager {
    config: SessionConfig,
}

impl DataFusionSessionManager {
    /// Create a new SessionManager with the given configuration
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Create a new SessionManager with default configuration
    pub fn default_config() -> Self {
        Self::new(SessionConfig::default())
    }

    /// Create a new DataFusion SessionContext
    ///
    /// The context is cheap to clone and every clone shares one table registry, so
    /// a single session created at startup serves all invocations.
    pub fn create_session(&self) -> Result<SessionContext> {
        let mut config = datafusion::execution::config::SessionConfig::new()
            .with_batch_size(self.config.batch_size)
            .with_target_partitions(self.config.target_partitions);

        config.options_mut().sql_parser.enable_ident_normalization =
            !self.config.preserve_identifier_case;

        Ok(SessionContext::new_with_config(config))
    }

    /// Get the current configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
