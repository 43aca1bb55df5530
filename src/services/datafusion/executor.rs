// DataFusion QueryExecutor
//
// Runs SQL against the shared session with a timeout and converts the result
// batches into JSON rows.

use datafusion::execution::context::SQLOptions;
use datafusion::prelude::*;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::api::middleware::AppError;
use crate::models::Row;
use super::converter::DataFusionResultConverter;

/// Rows returned by one statement
#[derive(Debug, Clone)]
pub struct QueryExecutionResult {
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub execution_time_ms: u128,
}

impl QueryExecutionResult {
    pub fn from_rows(rows: Vec<Row>, execution_time_ms: u128) -> Self {
        Self {
            row_count: rows.len(),
            rows,
            execution_time_ms,
        }
    }
}

/// Executes SQL statements against the dataset tables
#[derive(Clone)]
pub struct DataFusionQueryExecutor {
    ctx: SessionContext,
    default_timeout: Duration,
    read_only: bool,
}

impl DataFusionQueryExecutor {
    /// Create a new QueryExecutor with a session context
    ///
    /// # Arguments
    /// * `ctx` - DataFusion session context shared with the dataset catalog
    /// * `default_timeout` - Default timeout for query execution
    pub fn new(ctx: SessionContext, default_timeout: Duration) -> Self {
        Self {
            ctx,
            default_timeout,
            read_only: true,
        }
    }

    /// Allow or reject DDL, DML and session statements
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Execute a SQL query with the default timeout
    pub async fn execute(&self, sql: &str) -> Result<QueryExecutionResult, AppError> {
        self.execute_with_timeout(sql, self.default_timeout).await
    }

    /// Execute a SQL query with a custom timeout
    ///
    /// # Errors
    /// Planning or execution failures become `InvalidQuery` carrying the SQL text;
    /// exceeding the timeout becomes `Timeout`.
    pub async fn execute_with_timeout(
        &self,
        sql: &str,
        timeout_duration: Duration,
    ) -> Result<QueryExecutionResult, AppError> {
        let start_time = Instant::now();

        let batches = timeout(timeout_duration, async {
            let df = self
                .ctx
                .sql_with_options(sql, self.sql_options())
                .await
                .map_err(|e| AppError::invalid_query(e.to_string(), sql))?;

            df.collect()
                .await
                .map_err(|e| AppError::invalid_query(e.to_string(), sql))
        })
        .await
        .map_err(|_| {
            AppError::Timeout(format!(
                "Query execution did not complete within {:?}: {}",
                timeout_duration, sql
            ))
        })?
        .map_err(|e| {
            tracing::warn!("Query execution failed: {}", e);
            e
        })?;

        let rows = DataFusionResultConverter::batches_to_rows(&batches)
            .map_err(|e| AppError::Internal(format!("Failed to convert query results: {:#}", e)))?;

        let result = QueryExecutionResult::from_rows(rows, start_time.elapsed().as_millis());
        tracing::debug!(
            "Query returned {} rows in {} ms",
            result.row_count,
            result.execution_time_ms
        );

        Ok(result)
    }

    fn sql_options(&self) -> SQLOptions {
        SQLOptions::new()
            .with_allow_ddl(!self.read_only)
            .with_allow_dml(!self.read_only)
            .with_allow_statements(!self.read_only)
    }

    /// Get current default timeout
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }
}
