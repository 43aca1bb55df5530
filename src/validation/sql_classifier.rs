/// Table name callers use in hand-written SQL before it is bound to a dataset
pub const PLACEHOLDER_TABLE: &str = "dataset";

/// Leading keywords that mark an input as SQL
const SQL_KEYWORDS: [&str; 8] = [
    "SELECT", "INSERT", "UPDATE", "DELETE", "WITH", "CREATE", "DROP", "ALTER",
];

/// Cheap dispatch check: does the text start with a SQL statement keyword?
///
/// Only the first word is inspected. Malformed statements still classify as SQL and
/// are rejected later by the engine.
pub fn is_sql(text: &str) -> bool {
    let first_word: String = text
        .trim_start()
        .chars()
        .take_while(|c| is_ident_char(*c))
        .collect();

    SQL_KEYWORDS
        .iter()
        .any(|keyword| first_word.eq_ignore_ascii_case(keyword))
}

/// Replace the placeholder table token with the real table name.
///
/// A textual replace of whole-word, case-insensitive occurrences of
/// [`PLACEHOLDER_TABLE`]. Single-quoted string literals are copied untouched so
/// data values such as `'dataset'` survive. A double-quoted identifier is replaced
/// only when it is exactly the placeholder, so binding an already bound statement
/// leaves it unchanged.
pub fn substitute_placeholder(sql: &str, table_name: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let placeholder: Vec<char> = PLACEHOLDER_TABLE.chars().collect();
    let mut out = String::with_capacity(sql.len() + table_name.len());
    let mut in_literal = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if in_literal {
            out.push(c);
            if c == '\'' {
                // '' is an escaped quote inside a literal
                if chars.get(i + 1) == Some(&'\'') {
                    out.push('\'');
                    i += 2;
                    continue;
                }
                in_literal = false;
            }
            i += 1;
            continue;
        }

        match c {
            '\'' => {
                in_literal = true;
                out.push(c);
                i += 1;
            }
            '"' => {
                let (name, end) = quoted_identifier_at(&chars, i);
                if name.eq_ignore_ascii_case(PLACEHOLDER_TABLE) && end <= chars.len() {
                    out.push_str(&format!("\"{}\"", table_name.replace('"', "\"\"")));
                } else {
                    out.extend(&chars[i..end.min(chars.len())]);
                }
                i = end;
            }
            _ if matches_word_at(&chars, i, &placeholder) => {
                out.push_str(&quote_identifier(table_name));
                i += placeholder.len();
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Unescaped name of the double-quoted identifier opening at `start`, and the
/// index just past its closing quote. Unterminated identifiers run to the end
/// and report an index past it.
fn quoted_identifier_at(chars: &[char], start: usize) -> (String, usize) {
    let mut name = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == '"' {
            if chars.get(i + 1) == Some(&'"') {
                name.push('"');
                i += 2;
                continue;
            }
            return (name, i + 1);
        }
        name.push(chars[i]);
        i += 1;
    }
    (name, chars.len() + 1)
}

/// Quote an identifier unless it is already a plain `[A-Za-z_][A-Za-z0-9_]*` name
pub fn quote_identifier(name: &str) -> String {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_') && chars.all(is_ident_char)
        }
        None => false,
    };

    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn matches_word_at(chars: &[char], at: usize, word: &[char]) -> bool {
    let end = at + word.len();
    if end > chars.len() {
        return false;
    }
    if at > 0 && is_ident_char(chars[at - 1]) {
        return false;
    }
    if end < chars.len() && is_ident_char(chars[end]) {
        return false;
    }
    chars[at..end]
        .iter()
        .zip(word)
        .all(|(a, b)| a.eq_ignore_ascii_case(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_sql_keywords() {
        assert!(is_sql("  select * from t"));
        assert!(is_sql("SELECT 1"));
        assert!(is_sql("\n\tWITH x AS (SELECT 1) SELECT * FROM x"));
        for keyword in SQL_KEYWORDS {
            assert!(is_sql(&format!("{} something", keyword.to_lowercase())));
        }
    }

    #[test]
    fn test_is_sql_rejects_natural_language() {
        assert!(!is_sql("find restaurants"));
        assert!(!is_sql("please give me restaurants with the best reviews"));
        assert!(!is_sql(""));
        assert!(!is_sql("   "));
        // Keyword must be a whole word
        assert!(!is_sql("selection of the best pizza"));
        assert!(!is_sql("select_all please"));
    }

    #[test]
    fn test_is_sql_accepts_malformed_statements() {
        assert!(is_sql("SELECT FROM WHERE"));
        assert!(is_sql("drop"));
        assert!(is_sql("SELECT*FROM t"));
    }

    #[test]
    fn test_substitute_placeholder() {
        let sql = "SELECT * FROM dataset WHERE title = 'Lucia Pizza Of Avenue X'";
        assert_eq!(
            substitute_placeholder(sql, "nLlhc8Fz9S5dCTQab"),
            "SELECT * FROM nLlhc8Fz9S5dCTQab WHERE title = 'Lucia Pizza Of Avenue X'"
        );
    }

    #[test]
    fn test_substitute_skips_literals_and_longer_words() {
        let sql = "SELECT datasetId FROM Dataset WHERE note = 'my dataset' AND x = 'it''s dataset'";
        assert_eq!(
            substitute_placeholder(sql, "items"),
            "SELECT datasetId FROM items WHERE note = 'my dataset' AND x = 'it''s dataset'"
        );
    }

    #[test]
    fn test_substitute_quotes_unusual_names() {
        assert_eq!(
            substitute_placeholder("SELECT COUNT(*) FROM dataset", "9abc-def"),
            "SELECT COUNT(*) FROM \"9abc-def\""
        );
        assert_eq!(
            substitute_placeholder("SELECT * FROM \"dataset\"", "9abc"),
            "SELECT * FROM \"9abc\""
        );
    }

    #[test]
    fn test_substituted_statement_never_mentions_placeholder() {
        let sql = "SELECT a FROM dataset JOIN dataset d2 ON dataset.a = d2.a";
        let bound = substitute_placeholder(sql, "t1");
        assert!(!bound.to_lowercase().contains("dataset"));
        assert_eq!(bound, "SELECT a FROM t1 JOIN t1 d2 ON t1.a = d2.a");
    }

    #[test]
    fn test_quoted_identifier_must_equal_placeholder() {
        assert_eq!(
            substitute_placeholder(r#"SELECT * FROM "my-dataset""#, "my-dataset"),
            r#"SELECT * FROM "my-dataset""#
        );
        assert_eq!(
            substitute_placeholder(r#"SELECT "dataset id" FROM "Dataset""#, "t1"),
            r#"SELECT "dataset id" FROM "t1""#
        );
        // Unterminated identifiers are copied as they are
        assert_eq!(
            substitute_placeholder(r#"SELECT * FROM "dataset"#, "t1"),
            r#"SELECT * FROM "dataset"#
        );
    }

    #[test]
    fn test_substitution_is_idempotent() {
        for table in ["user~my-dataset", "nLlhc8Fz9S5dCTQab", "9abc-def", "a\"b"] {
            for sql in [
                "SELECT COUNT(*) FROM dataset",
                r#"SELECT title FROM "dataset" WHERE title = 'dataset'"#,
            ] {
                let once = substitute_placeholder(sql, table);
                let twice = substitute_placeholder(&once, table);
                assert_eq!(once, twice, "table {}", table);
            }
        }
        assert_eq!(
            substitute_placeholder("SELECT COUNT(*) FROM dataset", "user~my-dataset"),
            r#"SELECT COUNT(*) FROM "user~my-dataset""#
        );
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("abc_1"), "abc_1");
        assert_eq!(quote_identifier("1abc"), "\"1abc\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_identifier(""), "\"\"");
    }
}
