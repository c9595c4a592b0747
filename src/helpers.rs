//! Small helpers shared by the operations and configuration layers.

use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::schema::Diagnostic;

/// Unwrap a single-entry search result.
///
/// AWX list endpoints answer with `{"count": n, "results": [...]}`. A payload
/// without `count` is returned unchanged. `count` may arrive as a number or a
/// numeric string.
pub fn extract_data_if_search_result(data: Value) -> Result<Value, ProviderError> {
    let Some(count) = data.get("count") else {
        return Ok(data);
    };

    let count = match count {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| {
        ProviderError::Diagnostics(vec![Diagnostic::error(
            "Failed to convert count number in search result",
        )
        .with_detail(format!("received count {}", count))])
    })?;

    match count {
        1 => match data.get("results").and_then(Value::as_array).and_then(|r| r.first()) {
            Some(first) if first.is_object() => Ok(first.clone()),
            _ => Err(ProviderError::Diagnostics(vec![Diagnostic::error(
                "Unexpected format for the results array",
            )
            .with_detail("expected an array holding one object")])),
        },
        n if n > 1 => Err(ProviderError::Diagnostics(vec![Diagnostic::error(
            "More than one entry present, please refine your query",
        )
        .with_detail(format!("received {} entries, expected 1", n))])),
        n => Err(ProviderError::Diagnostics(vec![Diagnostic::error(
            "No entries found for the data source",
        )
        .with_detail(format!("received {} entries, expected 1", n))])),
    }
}

/// Normalise an API path: leading `/`, no repeated separators, one trailing `/`.
pub fn clean_endpoint(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    format!("/{}/", segments.join("/"))
}

/// Append one path segment to an endpoint.
pub fn join_endpoint(base: &str, segment: impl std::fmt::Display) -> String {
    clean_endpoint(&format!("{}/{}", base, segment))
}

/// Parse a boolean the lenient way environment variables are written.
///
/// `1`, `t` and `true` in any case are true; everything else is false.
pub fn str_to_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "t" | "true")
}

/// Optionally trim surrounding whitespace and then surrounding newlines.
pub fn trim_string(space: bool, newline: bool, input: &str) -> String {
    let mut out = input;
    if space {
        out = out.trim();
    }
    if newline {
        out = out.trim_matches('\n');
    }
    out.to_string()
}

/// Return the first non-empty value among `names`, as seen through `lookup`.
pub fn first_set_env_var<F>(lookup: F, names: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.is_empty())
}

/// True for null, empty strings, empty arrays and empty objects.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Read an integer attribute that may be encoded as a number or a numeric string.
pub fn int_attribute(obj: &Map<String, Value>, name: &str) -> Option<i64> {
    obj.get(name).and_then(value_as_i64)
}

/// Interpret a number or a numeric string as an integer.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_search_result_passthrough() {
        let data = json!({"id": 1, "name": "Default"});
        assert_eq!(extract_data_if_search_result(data.clone()).unwrap(), data);
    }

    #[test]
    fn test_search_result_single() {
        let data = json!({"count": 1, "results": [{"id": 4}]});
        assert_eq!(extract_data_if_search_result(data).unwrap(), json!({"id": 4}));

        let data = json!({"count": "1", "results": [{"id": 5}]});
        assert_eq!(extract_data_if_search_result(data).unwrap(), json!({"id": 5}));
    }

    #[test]
    fn test_search_result_many() {
        let err = extract_data_if_search_result(json!({"count": 2, "results": [{}, {}]}))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "More than one entry present, please refine your query"
        );
        let diagnostics = err.into_diagnostics();
        assert_eq!(
            diagnostics[0].detail.as_deref(),
            Some("received 2 entries, expected 1")
        );
    }

    #[test]
    fn test_search_result_none() {
        let err = extract_data_if_search_result(json!({"count": 0, "results": []})).unwrap_err();
        assert_eq!(err.to_string(), "No entries found for the data source");
    }

    #[test]
    fn test_search_result_bad_shapes() {
        let err = extract_data_if_search_result(json!({"count": "many"})).unwrap_err();
        assert_eq!(err.to_string(), "Failed to convert count number in search result");

        let err = extract_data_if_search_result(json!({"count": 1, "results": {}})).unwrap_err();
        assert_eq!(err.to_string(), "Unexpected format for the results array");
    }

    #[test]
    fn test_clean_and_join_endpoint() {
        assert_eq!(clean_endpoint("/api/v2/organizations/"), "/api/v2/organizations/");
        assert_eq!(clean_endpoint("api//v2/organizations"), "/api/v2/organizations/");
        assert_eq!(clean_endpoint(""), "/");
        assert_eq!(join_endpoint("/api/v2/organizations/", 7), "/api/v2/organizations/7/");
        assert_eq!(join_endpoint("/api/v2/me", ""), "/api/v2/me/");
    }

    #[test]
    fn test_str_to_bool() {
        for truthy in ["1", "t", "T", "true", "TRUE", "True"] {
            assert!(str_to_bool(truthy), "{truthy}");
        }
        for falsy in ["0", "f", "false", "yes", "", "garbage"] {
            assert!(!str_to_bool(falsy), "{falsy}");
        }
    }

    #[test]
    fn test_trim_string() {
        assert_eq!(trim_string(true, true, " \n"), "");
        assert_eq!(trim_string(true, true, " test\ntes\n"), "test\ntes");
        assert_eq!(trim_string(false, true, "\nkey\n"), "key");
        assert_eq!(trim_string(false, false, " keep "), " keep ");
    }

    #[test]
    fn test_first_set_env_var() {
        let env: HashMap<&str, &str> = [("TOWER_HOST", ""), ("AWX_HOST", "https://awx")]
            .into_iter()
            .collect();
        let lookup = |name: &str| env.get(name).map(|v| v.to_string());

        assert_eq!(
            first_set_env_var(lookup, &["TOWER_HOST", "AWX_HOST"]),
            Some("https://awx".to_string())
        );
        assert_eq!(first_set_env_var(lookup, &["TOWER_USERNAME"]), None);
    }

    #[test]
    fn test_is_empty_value() {
        assert!(is_empty_value(&Value::Null));
        assert!(is_empty_value(&json!("")));
        assert!(is_empty_value(&json!({})));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(false)));
    }

    #[test]
    fn test_int_attribute() {
        let obj = json!({"a": 3, "b": "4", "c": 5.0, "d": "x"});
        let obj = obj.as_object().unwrap();
        assert_eq!(int_attribute(obj, "a"), Some(3));
        assert_eq!(int_attribute(obj, "b"), Some(4));
        assert_eq!(int_attribute(obj, "c"), Some(5));
        assert_eq!(int_attribute(obj, "d"), None);
        assert_eq!(int_attribute(obj, "missing"), None);
    }
}
