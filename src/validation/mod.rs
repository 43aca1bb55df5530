pub mod sql_classifier;

pub use sql_classifier::{is_sql, quote_identifier, substitute_placeholder, PLACEHOLDER_TABLE};
