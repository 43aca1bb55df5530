// DataFusion DatasetCatalog
//
// Loads datasets from the remote item store and registers each one as an
// in-memory table named exactly after its dataset id. Tables live for the whole
// process and are replaced wholesale on refresh.

use arrow::error::ArrowError;
use arrow::json::reader::{infer_json_schema_from_iterator, ReaderBuilder};
use datafusion::arrow::datatypes::Schema;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::common::TableReference;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;

use crate::api::middleware::AppError;
use crate::models::{ColumnSchema, DatasetHandle, TableSchema};
use crate::services::item_store::{FetchOptions, ItemStore};
use super::type_mapper::map_column_type;

/// Process-wide cache of dataset tables
///
/// ```text
/// DatasetCatalog
///   ├── SessionContext (shared with the query executor)
///   ├── ItemStore      (remote source of dataset items)
///   └── dataset id -> Mutex<version>
/// ```
///
/// Every load of one dataset id runs inside that id's exclusive section, so the
/// check, fetch, drop and register steps of concurrent invocations never
/// interleave. Different ids load in parallel.
pub struct DatasetCatalog {
    ctx: SessionContext,
    store: Arc<dyn ItemStore>,
    fetch_timeout: Duration,
    batch_size: usize,
    /// Reload counter per dataset id; the mutex is the exclusive section
    datasets: RwLock<HashMap<String, Arc<Mutex<u64>>>>,
}

impl DatasetCatalog {
    pub fn new(ctx: SessionContext, store: Arc<dyn ItemStore>, fetch_timeout: Duration) -> Self {
        let batch_size = ctx.copied_config().batch_size();
        Self {
            ctx,
            store,
            fetch_timeout,
            batch_size,
            datasets: RwLock::new(HashMap::new()),
        }
    }

    /// Load a dataset, fetching it only when it is not registered yet or when
    /// `refresh` is set
    ///
    /// # Errors
    /// Remote failures and unparseable items become `DatasetLoad`; a fetch that
    /// exceeds the configured timeout becomes `Timeout`.
    pub async fn load(
        &self,
        dataset_id: &str,
        refresh: bool,
        options: &FetchOptions,
    ) -> Result<DatasetHandle, AppError> {
        let section = self.dataset_section(dataset_id).await;
        let mut version = section.lock().await;

        let result = self.load_locked(dataset_id, refresh, options, &mut *version).await;
        if result.is_err() && *version == 0 {
            self.forget_section(dataset_id, &section).await;
        }
        result
    }

    /// Check, fetch, drop and register while holding the dataset's section
    async fn load_locked(
        &self,
        dataset_id: &str,
        refresh: bool,
        options: &FetchOptions,
        version: &mut u64,
    ) -> Result<DatasetHandle, AppError> {
        let table = TableReference::bare(dataset_id);
        let registered = self
            .ctx
            .table_exist(table.clone())
            .map_err(|e| AppError::DatasetLoad(format!("Failed to look up table {}: {}", dataset_id, e)))?;

        if registered && !refresh {
            tracing::debug!("Dataset {} already loaded (version {})", dataset_id, *version);
            let schema = self.describe(dataset_id).await?;
            return Ok(DatasetHandle::new(dataset_id.to_string(), schema, *version));
        }

        tracing::info!(
            "Fetching dataset {} (refresh: {}, limit: {:?}, offset: {:?})",
            dataset_id,
            refresh,
            options.limit,
            options.offset
        );

        let bytes = timeout(self.fetch_timeout, self.store.fetch_all_items(dataset_id, options))
            .await
            .map_err(|_| {
                AppError::Timeout(format!(
                    "Fetching dataset {} did not complete within {:?}",
                    dataset_id, self.fetch_timeout
                ))
            })??;

        let mem_table = self.build_table(dataset_id, &bytes)?;

        self.ctx.deregister_table(table.clone()).map_err(|e| {
            AppError::DatasetLoad(format!("Failed to drop table {}: {}", dataset_id, e))
        })?;
        self.ctx.register_table(table, Arc::new(mem_table)).map_err(|e| {
            AppError::DatasetLoad(format!("Failed to register table {}: {}", dataset_id, e))
        })?;
        *version += 1;

        let schema = self.describe(dataset_id).await?;
        tracing::info!(
            "Registered dataset {} as table with {} columns (version {})",
            dataset_id,
            schema.len(),
            *version
        );

        Ok(DatasetHandle::new(dataset_id.to_string(), schema, *version))
    }

    /// Whether a table for the dataset is currently registered
    pub fn is_loaded(&self, dataset_id: &str) -> bool {
        self.ctx
            .table_exist(TableReference::bare(dataset_id))
            .unwrap_or(false)
    }

    /// Describe the registered table, mapping every column through the type mapper
    pub async fn describe(&self, dataset_id: &str) -> Result<TableSchema, AppError> {
        let provider = self
            .ctx
            .table_provider(TableReference::bare(dataset_id))
            .await
            .map_err(|e| AppError::DatasetLoad(format!("Failed to describe table {}: {}", dataset_id, e)))?;

        let columns = provider
            .schema()
            .fields()
            .iter()
            .map(|field| ColumnSchema {
                name: field.name().clone(),
                column_type: map_column_type(&field.data_type().to_string()),
            })
            .collect();

        Ok(TableSchema::new(columns))
    }

    /// Get or create the exclusive section for a dataset id
    async fn dataset_section(&self, dataset_id: &str) -> Arc<Mutex<u64>> {
        // Fast path: section already exists (read lock)
        {
            let datasets = self.datasets.read().await;
            if let Some(section) = datasets.get(dataset_id) {
                return section.clone();
            }
        }

        // Slow path: another task may have created it while we waited
        let mut datasets = self.datasets.write().await;
        datasets
            .entry(dataset_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(0)))
            .clone()
    }

    /// Drop the section of a dataset that never loaded, unless another caller
    /// is already waiting on it
    async fn forget_section(&self, dataset_id: &str, section: &Arc<Mutex<u64>>) {
        let mut datasets = self.datasets.write().await;
        // Clones are only handed out under this lock: one in the map, one here
        if Arc::strong_count(section) == 2 {
            datasets.remove(dataset_id);
        }
    }

    /// Decode a JSON array of records into an in-memory table
    fn build_table(&self, dataset_id: &str, bytes: &[u8]) -> Result<MemTable, AppError> {
        let unparseable =
            |reason: String| AppError::DatasetLoad(format!("Dataset {} is unparseable: {}", dataset_id, reason));

        let records = match serde_json::from_slice::<JsonValue>(bytes).map_err(|e| unparseable(e.to_string()))? {
            JsonValue::Array(records) => records,
            other => return Err(unparseable(format!("expected a JSON array, got {}", json_kind(&other)))),
        };

        if let Some(position) = records.iter().position(|record| !record.is_object()) {
            return Err(unparseable(format!(
                "item {} is {}, expected an object",
                position,
                json_kind(&records[position])
            )));
        }

        if records.is_empty() {
            return MemTable::try_new(Arc::new(Schema::empty()), vec![vec![]])
                .map_err(|e| unparseable(e.to_string()));
        }

        let schema = Arc::new(
            infer_json_schema_from_iterator(records.iter().map(Ok::<_, ArrowError>))
                .map_err(|e| unparseable(e.to_string()))?,
        );
        let batches = self
            .decode_records(schema.clone(), &records)
            .map_err(|e| unparseable(e.to_string()))?;

        tracing::debug!(
            "Decoded {} items of dataset {} into {} batches",
            records.len(),
            dataset_id,
            batches.len()
        );

        MemTable::try_new(schema, vec![batches]).map_err(|e| unparseable(e.to_string()))
    }

    fn decode_records(
        &self,
        schema: Arc<Schema>,
        records: &[JsonValue],
    ) -> Result<Vec<RecordBatch>, ArrowError> {
        let mut decoder = ReaderBuilder::new(schema)
            .with_batch_size(self.batch_size)
            .build_decoder()?;

        let mut batches = Vec::with_capacity(records.len() / self.batch_size + 1);
        for chunk in records.chunks(self.batch_size) {
            decoder.serialize(chunk)?;
            if let Some(batch) = decoder.flush()? {
                batches.push(batch);
            }
        }
        Ok(batches)
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
