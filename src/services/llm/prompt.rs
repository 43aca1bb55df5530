//! Prompt templates for SQL generation, response synthesis and the agent.

use crate::models::{Row, TableSchema};

const TEXT_TO_SQL_TEMPLATE: &str = "You are given a table named: '{table_name}' with schema, \
generate only SQL query (no surrounding text) to answer the given question.\n\
Table schema:\n\
{table_schema}\n\
Question: {question}\n\n\
SQLQuery: ";

const RESPONSE_SYNTHESIS_TEMPLATE: &str = "Given a query, synthesize a response based on SQL query results \
to satisfy the query. Only include details that are relevant to the query. \
If you don't know the answer, then say that.\n\
SQL Query: {sql_query}\n\
Table Schema: {table_schema}\n\
SQL Response: {sql_response}\n\
Query: {query_str}\n\
Response: ";

const AGENT_SYSTEM_TEMPLATE: &str = "You answer questions about a single dataset table using the provided tools. \
Table name provided by user: {table_name}. Table schema: {table_schema}\n\n\
Work one tool call at a time. Check whether the question is already SQL with is_query_sql. \
If it is not, turn it into SQL with user_query_to_sql. Run the SQL with execute_sql, then \
produce the answer with synthesize_results. Reply with the final answer text once you have it.";

/// Prompt asking the model to translate a question into one SQL statement.
pub fn build_text_to_sql_prompt(table_name: &str, schema: &TableSchema, question: &str) -> String {
    fill(
        TEXT_TO_SQL_TEMPLATE,
        &[
            ("table_name", table_name),
            ("table_schema", &schema.to_string()),
            ("question", question),
        ],
    )
}

/// Prompt asking the model to answer a question from SQL results.
pub fn build_synthesis_prompt(
    question: &str,
    sql: &str,
    rows: &[Row],
    schema: &TableSchema,
) -> String {
    let sql_response = serde_json::to_string(rows).unwrap_or_else(|_| "[]".to_string());
    fill(
        RESPONSE_SYNTHESIS_TEMPLATE,
        &[
            ("sql_query", sql),
            ("table_schema", &schema.to_string()),
            ("sql_response", &sql_response),
            ("query_str", question),
        ],
    )
}

/// System message giving the agent its table context.
pub fn build_agent_system_prompt(table_name: &str, schema: &TableSchema) -> String {
    fill(
        AGENT_SYSTEM_TEMPLATE,
        &[("table_name", table_name), ("table_schema", &schema.to_string())],
    )
}

/// Substitute `{slot}` markers in one pass; inserted values are never rescanned
fn fill(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            slots
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnType;
    use serde_json::json;

    fn schema() -> TableSchema {
        let mut schema = TableSchema::default();
        schema.push("title", ColumnType::String);
        schema.push("totalScore", ColumnType::Float);
        schema
    }

    #[test]
    fn test_slot_markers_in_values_are_kept_literally() {
        let rows = vec![json!({ "note": "{table_schema} and {query_str}" })
            .as_object()
            .unwrap()
            .clone()];

        let prompt = build_synthesis_prompt(
            "what about {sql_query}?",
            "SELECT note FROM t WHERE note LIKE '%{query_str}%'",
            &rows,
            &schema(),
        );

        assert!(prompt.contains(r#"SQL Response: [{"note":"{table_schema} and {query_str}"}]"#));
        assert!(prompt.contains("SQL Query: SELECT note FROM t WHERE note LIKE '%{query_str}%'\n"));
        assert!(prompt.contains("Table Schema: {title: string, totalScore: float}\n"));
        assert!(prompt.ends_with("Query: what about {sql_query}?\nResponse: "));
    }

    #[test]
    fn test_text_to_sql_prompt() {
        let prompt = build_text_to_sql_prompt("nLlhc8Fz9S5dCTQab", &schema(), "best pizza?");

        assert!(prompt.starts_with("You are given a table named: 'nLlhc8Fz9S5dCTQab' with schema"));
        assert!(prompt.contains("Table schema:\n{title: string, totalScore: float}\n"));
        assert!(prompt.ends_with("Question: best pizza?\n\nSQLQuery: "));
    }

    #[test]
    fn test_synthesis_prompt_embeds_rows() {
        let row = json!({"title": "Lucia Pizza Of Avenue X"});
        let rows = vec![row.as_object().unwrap().clone()];

        let prompt = build_synthesis_prompt("best pizza?", "SELECT title FROM t", &rows, &schema());

        assert!(prompt.contains("SQL Query: SELECT title FROM t\n"));
        assert!(prompt.contains("Table Schema: {title: string, totalScore: float}\n"));
        assert!(prompt.contains(r#"SQL Response: [{"title":"Lucia Pizza Of Avenue X"}]"#));
        assert!(prompt.ends_with("Query: best pizza?\nResponse: "));
    }

    #[test]
    fn test_question_with_braces_is_not_expanded() {
        let prompt = build_text_to_sql_prompt("t", &schema(), "what is {table_name}?");
        assert!(prompt.contains("Question: what is {table_name}?"));
    }

    #[test]
    fn test_agent_prompt_names_table() {
        let prompt = build_agent_system_prompt("abc", &schema());
        assert!(prompt.contains("Table name provided by user: abc."));
        assert!(prompt.contains("execute_sql"));
    }
}
