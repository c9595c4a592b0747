//! Conversion between AWX payloads and provider state.

use serde_json::{Map, Number, Value};

use crate::catalog::{FieldDefinition, FieldKind};
use crate::error::ProviderError;
use crate::helpers::{int_attribute, is_empty_value, value_as_i64};
use crate::schema::Diagnostic;
use crate::validation::value_type_name;

/// Resource or data source state keyed by attribute name.
pub type State = Map<String, Value>;

/// Overlay the API payload `data` onto `state`.
///
/// Every non-write-only field is written; a key missing from the payload
/// becomes null, or an empty list for list fields. All conversion failures
/// are collected before returning.
pub fn state_from_api(
    fields: &[FieldDefinition],
    data: &Value,
    state: &mut State,
) -> Result<(), ProviderError> {
    let Value::Object(data) = data else {
        return Err(ProviderError::Diagnostics(vec![Diagnostic::error(
            "Unexpected response format",
        )
        .with_detail(format!(
            "expected a JSON object, found {}",
            value_type_name(data)
        ))]));
    };

    let mut diagnostics = Vec::new();
    for field in fields.iter().filter(|f| !f.is_write_only()) {
        let raw = data.get(&field.api_name).unwrap_or(&Value::Null);
        match from_api(field.kind, raw) {
            Ok(value) => {
                state.insert(field.name.clone(), value);
            },
            Err(reason) => diagnostics.push(
                Diagnostic::error(format!("Unable to set value for '{}'", field.name))
                    .with_detail(reason)
                    .with_attribute(field.name.clone()),
            ),
        }
    }

    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(ProviderError::Diagnostics(diagnostics))
    }
}

fn from_api(kind: FieldKind, raw: &Value) -> Result<Value, String> {
    if raw.is_null() {
        return Ok(match kind {
            FieldKind::StringList => Value::Array(Vec::new()),
            _ => Value::Null,
        });
    }

    match kind {
        FieldKind::String => match raw {
            Value::String(_) => Ok(raw.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            other => Err(mismatch("string", other)),
        },
        FieldKind::Int64 => value_as_i64(raw)
            .map(Value::from)
            .ok_or_else(|| mismatch("int64", raw)),
        FieldKind::Float64 => {
            let parsed = match raw {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            parsed
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| mismatch("float64", raw))
        },
        FieldKind::Bool => match raw {
            Value::Bool(_) => Ok(raw.clone()),
            other => Err(mismatch("bool", other)),
        },
        FieldKind::Json => match raw {
            Value::String(_) => Ok(raw.clone()),
            other => serde_json::to_string(other)
                .map(Value::String)
                .map_err(|e| e.to_string()),
        },
        FieldKind::StringList => match raw {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(_) => Ok(item.clone()),
                    Value::Number(n) => Ok(Value::String(n.to_string())),
                    other => Err(mismatch("string list element", other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Err(mismatch("list", other)),
        },
    }
}

fn mismatch(expected: &str, found: &Value) -> String {
    format!("expected {}, found {}", expected, value_type_name(found))
}

/// Build the create or update payload from the writable fields of `state`.
pub fn body_request(fields: &[FieldDefinition], state: &State) -> Result<Value, ProviderError> {
    let mut body = Map::new();
    let mut diagnostics = Vec::new();

    for field in fields.iter().filter(|f| f.is_writable()) {
        let value = state.get(&field.name).cloned().unwrap_or(Value::Null);

        if field.kind == FieldKind::Bool {
            body.insert(field.api_name.clone(), Value::Bool(value.as_bool().unwrap_or(false)));
            continue;
        }
        if value.is_null() {
            continue;
        }
        if field.omit_empty && (is_empty_value(&value) || value.as_i64() == Some(0)) {
            continue;
        }

        let value = match (field.kind, value) {
            (FieldKind::Json, Value::String(text)) => {
                if text.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(&text) {
                    Ok(raw) => raw,
                    Err(e) => {
                        diagnostics.push(
                            Diagnostic::error(format!("Invalid JSON for '{}'", field.name))
                                .with_detail(e.to_string())
                                .with_attribute(field.name.clone()),
                        );
                        continue;
                    },
                }
            },
            (_, value) => value,
        };
        body.insert(field.api_name.clone(), value);
    }

    if diagnostics.is_empty() {
        Ok(Value::Object(body))
    } else {
        Err(ProviderError::Diagnostics(diagnostics))
    }
}

/// The server-assigned id held in state.
pub fn state_id(state: &State) -> Option<i64> {
    int_attribute(state, "id")
}

/// Compare two attribute values, treating `Json` fields as documents.
///
/// Two JSON texts that parse to the same value are equal regardless of
/// formatting or key order.
pub fn values_equal(kind: FieldKind, a: &Value, b: &Value) -> bool {
    if kind == FieldKind::Json {
        if let (Value::String(a), Value::String(b)) = (a, b) {
            if let (Ok(a), Ok(b)) = (
                serde_json::from_str::<Value>(a),
                serde_json::from_str::<Value>(b),
            ) {
                return a == b;
            }
        }
    }
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldRole, SecretKind};
    use serde_json::json;

    fn fields() -> Vec<FieldDefinition> {
        vec![
            FieldDefinition::required("name"),
            FieldDefinition::optional("description"),
            FieldDefinition::new("organization", FieldKind::Int64, FieldRole::Optional)
                .omit_empty(),
            FieldDefinition::new("credential_type", FieldKind::Int64, FieldRole::Required),
            FieldDefinition::optional("inputs")
                .kind(FieldKind::Json)
                .secret(SecretKind::Document),
            FieldDefinition::new("enabled", FieldKind::Bool, FieldRole::Optional),
            FieldDefinition::new("tags", FieldKind::StringList, FieldRole::Optional),
            FieldDefinition::read_only("kind"),
            FieldDefinition::new("password", FieldKind::String, FieldRole::WriteOnly),
            FieldDefinition::optional("social_auth_github_key").api_name("SOCIAL_AUTH_GITHUB_KEY"),
        ]
    }

    fn obj(value: Value) -> State {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_state_from_api_converts_fields() {
        let data = json!({
            "id": 3,
            "name": "ssh",
            "description": "",
            "organization": "1",
            "credential_type": 7,
            "inputs": {"username": "root", "password": "$encrypted$"},
            "enabled": true,
            "tags": ["a", 2],
            "kind": "ssh",
            "SOCIAL_AUTH_GITHUB_KEY": 12345,
        });
        let mut state = State::new();
        state_from_api(&fields(), &data, &mut state).unwrap();

        assert_eq!(state["name"], json!("ssh"));
        assert_eq!(state["organization"], json!(1));
        assert_eq!(state["credential_type"], json!(7));
        assert_eq!(
            state["inputs"],
            json!(r#"{"password":"$encrypted$","username":"root"}"#)
        );
        assert_eq!(state["tags"], json!(["a", "2"]));
        assert_eq!(state["kind"], json!("ssh"));
        assert_eq!(state["social_auth_github_key"], json!("12345"));
        assert!(!state.contains_key("password"));
        assert!(!state.contains_key("id"));
    }

    #[test]
    fn test_state_from_api_missing_keys() {
        let mut state = obj(json!({"name": "old", "password": "keep"}));
        state_from_api(&fields(), &json!({}), &mut state).unwrap();

        assert_eq!(state["name"], Value::Null);
        assert_eq!(state["tags"], json!([]));
        assert_eq!(state["password"], json!("keep"));
    }

    #[test]
    fn test_state_from_api_collects_diagnostics() {
        let data = json!({"credential_type": "seven", "enabled": "yes"});
        let mut state = State::new();
        let err = state_from_api(&fields(), &data, &mut state).unwrap_err();

        let diagnostics = err.into_diagnostics();
        let attributes: Vec<_> = diagnostics
            .iter()
            .map(|d| d.attribute.as_deref().unwrap())
            .collect();
        assert_eq!(attributes, vec!["credential_type", "enabled"]);
        assert_eq!(
            diagnostics[0].detail.as_deref(),
            Some("expected int64, found string")
        );
    }

    #[test]
    fn test_state_from_api_rejects_non_object() {
        let err = state_from_api(&fields(), &json!([]), &mut State::new()).unwrap_err();
        assert_eq!(err.to_string(), "Unexpected response format");
    }

    #[test]
    fn test_body_request() {
        let state = obj(json!({
            "name": "ssh",
            "description": null,
            "organization": 0,
            "credential_type": 7,
            "inputs": r#"{"username":"root"}"#,
            "tags": [],
            "kind": "ssh",
            "password": "hunter2",
            "social_auth_github_key": "abc",
        }));
        let body = body_request(&fields(), &state).unwrap();

        assert_eq!(
            body,
            json!({
                "name": "ssh",
                "credential_type": 7,
                "inputs": {"username": "root"},
                "enabled": false,
                "tags": [],
                "password": "hunter2",
                "SOCIAL_AUTH_GITHUB_KEY": "abc",
            })
        );
    }

    #[test]
    fn test_body_request_invalid_json() {
        let state = obj(json!({"name": "ssh", "inputs": "{not json"}));
        let err = body_request(&fields(), &state).unwrap_err();
        let diagnostics = err.into_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("inputs"));
    }

    #[test]
    fn test_state_id() {
        assert_eq!(state_id(&obj(json!({"id": 4}))), Some(4));
        assert_eq!(state_id(&obj(json!({"id": "5"}))), Some(5));
        assert_eq!(state_id(&obj(json!({}))), None);
    }

    #[test]
    fn test_values_equal_json() {
        let a = json!(r#"{"a": 1, "b": [1, 2]}"#);
        let b = json!(r#"{"b":[1,2],"a":1}"#);
        assert!(values_equal(FieldKind::Json, &a, &b));
        assert!(!values_equal(FieldKind::String, &a, &b));
        assert!(!values_equal(FieldKind::Json, &a, &json!(r#"{"a":2}"#)));
    }
}
