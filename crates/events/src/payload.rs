//! Field access on before/after value snapshots.
//!
//! Producers serialize the persisted row as a JSON object. Decimal columns
//! may arrive as JSON numbers or as numeric strings; both are accepted.

use serde_json::Value as JsonValue;

/// Read a numeric field, accepting numbers and numeric strings.
pub fn number(value: &JsonValue, key: &str) -> Option<f64> {
    match value.get(key)? {
        JsonValue::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        JsonValue::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Read a string field. Empty strings count as absent.
pub fn string<'a>(value: &'a JsonValue, key: &str) -> Option<&'a str> {
    value.get(key)?.as_str().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_accept_numeric_strings() {
        let v = json!({ "a": 12.5, "b": "8000.25", "c": "n/a", "d": null });
        assert_eq!(number(&v, "a"), Some(12.5));
        assert_eq!(number(&v, "b"), Some(8000.25));
        assert_eq!(number(&v, "c"), None);
        assert_eq!(number(&v, "d"), None);
        assert_eq!(number(&v, "missing"), None);
    }

    #[test]
    fn strings_ignore_non_strings_and_blanks() {
        let v = json!({ "name": "House", "blank": "", "n": 3 });
        assert_eq!(string(&v, "name"), Some("House"));
        assert_eq!(string(&v, "blank"), None);
        assert_eq!(string(&v, "n"), None);
    }
}
