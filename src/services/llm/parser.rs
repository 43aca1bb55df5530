//! Extracts a single SQL statement from a text-to-SQL model reply.
//!
//! Replies may echo the `SQLQuery:` label, append a hallucinated `SQLResult:`
//! section, or wrap the statement in markdown fences.

use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::api::middleware::AppError;
use crate::validation::is_sql;

const SQL_QUERY_LABEL: &str = "SQLQuery:";
const SQL_RESULT_LABEL: &str = "SQLResult:";

/// Extract the first SQL statement from a model reply.
///
/// A candidate the generic SQL parser cannot read is still returned when it
/// starts with a SQL keyword, so the engine reports the precise error.
pub fn extract_sql(reply: &str) -> Result<String, AppError> {
    let mut text = reply.trim();
    if let Some(idx) = text.find(SQL_QUERY_LABEL) {
        text = &text[idx + SQL_QUERY_LABEL.len()..];
    }
    if let Some(idx) = text.find(SQL_RESULT_LABEL) {
        text = &text[..idx];
    }

    let candidate = extract_code_block(text, "sql")
        .or_else(|| extract_code_block(text, ""))
        .unwrap_or(text)
        .trim();

    if candidate.is_empty() {
        return Err(AppError::invalid_query(
            "The language model reply contains no SQL statement",
            reply,
        ));
    }

    match Parser::parse_sql(&GenericDialect {}, candidate) {
        Ok(statements) => statements
            .into_iter()
            .next()
            .map(|statement| statement.to_string())
            .ok_or_else(|| {
                AppError::invalid_query("The language model reply contains no SQL statement", reply)
            }),
        Err(e) if is_sql(candidate) => {
            tracing::debug!("Passing through SQL the generic parser rejected: {}", e);
            Ok(candidate.trim_end_matches(';').trim_end().to_string())
        }
        Err(e) => Err(AppError::invalid_query(
            format!("Could not extract SQL from the language model reply: {}", e),
            candidate,
        )),
    }
}

/// Content of the first fenced block with the given language tag.
///
/// Pass an empty `lang` to match blocks without a language tag.
fn extract_code_block<'a>(text: &'a str, lang: &str) -> Option<&'a str> {
    let fence = format!("```{}", lang);
    let start = text.find(&fence)?;
    let after_fence = start + fence.len();
    let content_start = after_fence + text[after_fence..].find('\n')? + 1;

    // A generic fence must not carry a language tag
    if lang.is_empty() && !text[after_fence..content_start].trim().is_empty() {
        return None;
    }

    let end = text[content_start..].find("```")?;
    Some(&text[content_start..content_start + end])
}
