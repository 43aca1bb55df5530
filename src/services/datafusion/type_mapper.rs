// Type Mapper
//
// Maps engine-native column type names onto the semantic column types shown to
// the language model. Accepts SQL-style names (VARCHAR, TINYINT(1), INTEGER[])
// as well as Arrow display names (Utf8, Int64, List(...), Timestamp(...)).

use crate::models::ColumnType;

/// Map an engine type name to a semantic type. Never fails: unknown names map to
/// [`ColumnType::String`].
pub fn map_column_type(engine_type: &str) -> ColumnType {
    let normalized = engine_type.trim().to_uppercase();

    if normalized.ends_with("[]") {
        return ColumnType::Array;
    }

    // One-bit integers are booleans in disguise
    if normalized.starts_with("TINYINT") && qualifier(&normalized) == Some("1") {
        return ColumnType::Boolean;
    }

    let base = match normalized.find('(') {
        Some(idx) => normalized[..idx].trim_end(),
        None => normalized.as_str(),
    };
    // "TIMESTAMP WITH TIME ZONE" and friends
    let base = base.split_whitespace().next().unwrap_or_default();

    lookup(base).unwrap_or(ColumnType::String)
}

fn qualifier(normalized: &str) -> Option<&str> {
    let start = normalized.find('(')?;
    let end = normalized[start..].find(')')? + start;
    Some(normalized[start + 1..end].trim())
}

fn lookup(base: &str) -> Option<ColumnType> {
    let column_type = match base {
        "VARCHAR" | "CHAR" | "BPCHAR" | "TEXT" | "STRING" | "UUID" | "UTF8" | "LARGEUTF8"
        | "UTF8VIEW" => ColumnType::String,

        "TINYINT" | "SMALLINT" | "INT" | "INTEGER" | "BIGINT" | "HUGEINT" | "UTINYINT"
        | "USMALLINT" | "UINTEGER" | "UBIGINT" | "INT1" | "INT2" | "INT4" | "INT8" | "INT16"
        | "INT32" | "INT64" | "UINT8" | "UINT16" | "UINT32" | "UINT64" => ColumnType::Integer,

        "DOUBLE" | "FLOAT" | "REAL" | "DECIMAL" | "NUMERIC" | "FLOAT16" | "FLOAT32"
        | "FLOAT64" | "DECIMAL32" | "DECIMAL64" | "DECIMAL128" | "DECIMAL256" => {
            ColumnType::Float
        }

        "BOOLEAN" | "BOOL" | "BIT" => ColumnType::Boolean,

        "DATE" | "DATE32" | "DATE64" => ColumnType::Date,
        "DATETIME" | "TIMESTAMP" | "TIMESTAMPTZ" => ColumnType::DateTime,
        "TIME" | "TIME32" | "TIME64" => ColumnType::Time,

        "BLOB" | "BINARY" | "VARBINARY" | "BYTEA" | "LARGEBINARY" | "BINARYVIEW"
        | "FIXEDSIZEBINARY" => ColumnType::Binary,

        "JSON" | "STRUCT" | "MAP" => ColumnType::Json,

        "LIST" | "LARGELIST" | "FIXEDSIZELIST" | "LISTVIEW" | "LARGELISTVIEW" => {
            ColumnType::Array
        }

        _ => return None,
    };
    Some(column_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::arrow::datatypes::{DataType, Field, Fields, TimeUnit};
    use std::sync::Arc;

    #[test]
    fn test_sql_type_names() {
        let cases = [
            ("VARCHAR", ColumnType::String),
            ("char", ColumnType::String),
            ("TEXT", ColumnType::String),
            ("TINYINT", ColumnType::Integer),
            ("SMALLINT", ColumnType::Integer),
            ("BIGINT", ColumnType::Integer),
            ("INT", ColumnType::Integer),
            ("DOUBLE", ColumnType::Float),
            ("FLOAT", ColumnType::Float),
            ("DECIMAL", ColumnType::Float),
            ("NUMERIC", ColumnType::Float),
            ("BOOLEAN", ColumnType::Boolean),
            ("BIT", ColumnType::Boolean),
            ("DATE", ColumnType::Date),
            ("DATETIME", ColumnType::DateTime),
            ("TIMESTAMP", ColumnType::DateTime),
            ("TIME", ColumnType::Time),
            ("BLOB", ColumnType::Binary),
            ("BINARY", ColumnType::Binary),
            ("JSON", ColumnType::Json),
        ];
        for (name, expected) in cases {
            assert_eq!(map_column_type(name), expected, "type {}", name);
        }
    }

    #[test]
    fn test_qualifiers_and_whitespace() {
        assert_eq!(map_column_type("  varchar(255) "), ColumnType::String);
        assert_eq!(map_column_type("DECIMAL(10,2)"), ColumnType::Float);
        assert_eq!(map_column_type("TIMESTAMP WITH TIME ZONE"), ColumnType::DateTime);
    }

    #[test]
    fn test_one_bit_tinyint_is_boolean() {
        assert_eq!(map_column_type("TINYINT(1)"), ColumnType::Boolean);
        assert_eq!(map_column_type("tinyint( 1 )"), ColumnType::Boolean);
        assert_eq!(map_column_type("TINYINT(4)"), ColumnType::Integer);
    }

    #[test]
    fn test_array_suffix_wins() {
        assert_eq!(map_column_type("INTEGER[]"), ColumnType::Array);
        assert_eq!(map_column_type("VARCHAR[]"), ColumnType::Array);
        assert_eq!(map_column_type("SOMETHING_ODD[]"), ColumnType::Array);
        assert_eq!(map_column_type("TINYINT(1)[]"), ColumnType::Array);
    }

    #[test]
    fn test_unknown_types_fall_back_to_string() {
        assert_eq!(map_column_type("GEOMETRY"), ColumnType::String);
        assert_eq!(map_column_type(""), ColumnType::String);
        assert_eq!(map_column_type("Null"), ColumnType::String);
    }

    #[test]
    fn test_arrow_display_names() {
        let list = DataType::List(Arc::new(Field::new("item", DataType::Utf8, true)));
        let strukt = DataType::Struct(Fields::from(vec![Field::new("lat", DataType::Float64, true)]));
        let cases = [
            (DataType::Utf8, ColumnType::String),
            (DataType::Int64, ColumnType::Integer),
            (DataType::UInt32, ColumnType::Integer),
            (DataType::Float64, ColumnType::Float),
            (DataType::Boolean, ColumnType::Boolean),
            (DataType::Date32, ColumnType::Date),
            (DataType::Timestamp(TimeUnit::Nanosecond, None), ColumnType::DateTime),
            (DataType::Time64(TimeUnit::Microsecond), ColumnType::Time),
            (DataType::Binary, ColumnType::Binary),
            (list, ColumnType::Array),
            (strukt, ColumnType::Json),
        ];
        for (data_type, expected) in cases {
            assert_eq!(
                map_column_type(&data_type.to_string()),
                expected,
                "arrow type {}",
                data_type
            );
        }
    }
}
