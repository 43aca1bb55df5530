// DataFusion ResultConverter
//
// Converts DataFusion RecordBatch results into rows of column name -> JSON value.

use arrow::json::writer::{JsonArray, WriterBuilder};
use datafusion::arrow::record_batch::RecordBatch;
use anyhow::{Context, Result};

use crate::models::Row;

/// Converts DataFusion query results to JSON rows
///
/// Nested values (lists, structs, maps) are kept as JSON arrays and objects, and
/// NULLs are written explicitly so every row carries every column.
pub struct DataFusionResultConverter;

impl DataFusionResultConverter {
    /// Convert record batches to rows, preserving batch and row order
    pub fn batches_to_rows(batches: &[RecordBatch]) -> Result<Vec<Row>> {
        let batch_refs: Vec<&RecordBatch> = batches
            .iter()
            .filter(|batch| batch.num_rows() > 0)
            .collect();
        if batch_refs.is_empty() {
            return Ok(Vec::new());
        }

        let mut writer = WriterBuilder::new()
            .with_explicit_nulls(true)
            .build::<_, JsonArray>(Vec::new());
        writer
            .write_batches(&batch_refs)
            .context("Failed to encode record batches as JSON")?;
        writer.finish().context("Failed to finish JSON encoding")?;

        let buffer = writer.into_inner();
        if buffer.is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&buffer).context("Failed to decode encoded rows")
    }
}
