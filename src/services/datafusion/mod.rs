// DataFusion Dataset Engine Module
//
// In-process analytical engine backing every dataset query:
// 1. One shared SessionContext holding a table per loaded dataset
// 2. Dataset loading and caching keyed by dataset id
// 3. Read-only SQL execution with results returned as JSON rows

pub mod session; // DataFusionSessionManager
pub mod type_mapper; // Engine type name -> semantic column type
pub mod catalog; // DatasetCatalog
pub mod executor; // DataFusionQueryExecutor
pub mod converter; // DataFusionResultConverter

// Re-exports for convenient access
pub use session::{DataFusionSessionManager, SessionConfig};
pub use type_mapper::map_column_type;
pub use catalog::DatasetCatalog;
pub use executor::{DataFusionQueryExecutor, QueryExecutionResult};
pub use converter::DataFusionResultConverter;
