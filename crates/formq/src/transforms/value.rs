// ai
//! 🧽 Value normalizer — one raw answer in, one clean cell out.
//!
//! 🎬 COLD OPEN — INT. SPREADSHEET — A CELL CONTAINING `['Arabic', 'Somali']`
//!
//! The caseworker squints. "Why are there brackets in my spreadsheet?"
//! Nobody answers. The brackets remain. Until today. 🦆
//!
//! 🧠 Knowledge graph:
//! - JSON arrays → elements' `str()` forms joined with `", "`
//! - strings → newlines become `". "`, then a literal parse; lists get joined,
//!   other literals leave the string untouched, parse failures take the bracket/quote
//!   stripping fallback
//! - everything else (numbers, bools, null, objects) passes through
//!
//! ⚠️ Known data-quality risk, kept on purpose: the fallback strips leading/trailing
//! brackets and EVERY quote character from free text. `Peter's` becomes `Peters`.
//! Changing that needs a requirements decision, not a drive-by fix.

use serde_json::Value;
use tracing::trace;

use super::literal::{self, Literal};

/// 🧽 Clean a single raw field value. Never fails.
pub(crate) fn normalize(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::String(
            items
                .iter()
                .map(display_str)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::String(text) => Value::String(normalize_text(text)),
        passthrough => passthrough.clone(),
    }
}

fn normalize_text(raw: &str) -> String {
    // -- 🧵 CRLF first, or the LF pass would leave stray carriage returns behind
    let text = raw.replace("\r\n", ". ").replace('\n', ". ");

    match literal::parse(&text) {
        Ok(Literal::List(items)) => items
            .iter()
            .map(Literal::to_str)
            .collect::<Vec<_>>()
            .join(", "),
        Ok(_) => text,
        Err(parse_error) => {
            trace!(%parse_error, "🧽 not a literal, falling back to bracket/quote stripping");
            strip_brackets_and_quotes(&text)
        }
    }
}

fn strip_brackets_and_quotes(text: &str) -> String {
    text.trim_matches(|c: char| c == '[' || c == ']')
        .replace(|c: char| c == '\'' || c == '"', "")
        .trim()
        .to_string()
}

/// 🗣️ `str()` of a JSON value, as the joined list output expects it.
fn display_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => repr(other),
    }
}

fn repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .map(literal::float_repr)
            .unwrap_or_else(|| n.to_string()),
        Value::Number(n) => n.to_string(),
        Value::String(s) => literal::quote_repr(s),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(repr).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", literal::quote_repr(k), repr(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn the_one_where_a_stringified_list_becomes_a_sentence() {
        assert_eq!(normalize(&json!("['Arabic', 'Somali']")), json!("Arabic, Somali"));
    }

    #[test]
    fn the_one_where_real_json_arrays_get_joined_with_their_str_forms() {
        assert_eq!(
            normalize(&json!(["Dari", 3, 2.0, true, null])),
            json!("Dari, 3, 2.0, True, None")
        );
        assert_eq!(normalize(&json!([])), json!(""));
    }

    #[test]
    fn the_one_where_newlines_turn_into_full_stops_before_anything_else() {
        assert_eq!(
            normalize(&json!("Line one\r\nLine two\nLine three")),
            json!("Line one. Line two. Line three")
        );
        // 🧵 the newline is replaced first, so a list split over lines no longer parses
        assert_eq!(normalize(&json!("['a',\n'b']")), json!("a,. b"));
    }

    #[test]
    fn the_one_where_scalar_literals_leave_the_string_alone() {
        assert_eq!(normalize(&json!("2")), json!("2"));
        assert_eq!(normalize(&json!("None")), json!("None"));
        assert_eq!(normalize(&json!("'already quoted'")), json!("'already quoted'"));
    }

    #[test]
    fn the_one_where_free_text_loses_its_brackets_and_quotes() {
        assert_eq!(normalize(&json!("['broken")), json!("broken"));
        assert_eq!(normalize(&json!("Hej med dig")), json!("Hej med dig"));
        // ⚠️ the data-quality risk, pinned: bracketed free text gets mangled
        assert_eq!(
            normalize(&json!("[Kommentar] fra 'mor'")),
            json!("Kommentar] fra mor")
        );
        assert_eq!(normalize(&json!("Peter's barn")), json!("Peters barn"));
    }

    #[test]
    fn the_one_where_a_bracket_avalanche_takes_the_fallback_path() {
        assert_eq!(normalize(&json!("[".repeat(20_000))), json!(""));
        assert_eq!(
            normalize(&json!(format!("{}'Dari'", "[".repeat(500)))),
            json!("Dari")
        );
    }

    #[test]
    fn the_one_where_huge_and_tiny_numbers_print_like_str() {
        assert_eq!(normalize(&json!([1e20, 1e-5])), json!("1e+20, 1e-05"));
    }

    #[test]
    fn the_one_where_non_strings_walk_straight_through() {
        assert_eq!(normalize(&json!(7)), json!(7));
        assert_eq!(normalize(&json!(false)), json!(false));
        assert_eq!(normalize(&Value::Null), Value::Null);
        assert_eq!(normalize(&json!({"a": 1})), json!({"a": 1}));
    }
}
