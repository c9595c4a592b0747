//! Schema validation helpers.
//!
//! Validates a configuration `serde_json::Value` against a [`Schema`]: presence
//! of required attributes, attribute types, per-attribute [`Validator`]s and
//! schema-level [`Constraint`]s.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_awx::schema::{Attribute, Schema, Validator};
//! use hemmer_provider_awx::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0().with_attribute(
//!     "name",
//!     Attribute::required_string().with_validator(Validator::LengthAtMost(8)),
//! );
//!
//! assert!(validate(&schema, &json!({"name": "ops"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "operations-team"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("name".to_string()));
//! ```

use crate::schema::{
    Attribute, AttributeType, Constraint, Diagnostic, DiagnosticSeverity, Schema, Validator,
};
use serde_json::{Map, Value};

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed-only attributes are skipped (the provider sets these)
/// - Attribute types must match the schema
/// - Validators run on present values of the right type
/// - Constraints are checked once per schema
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return diagnostics,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
            );
            return diagnostics;
        },
    };

    for name in schema.attribute_names() {
        let attr = &schema.attributes[name];
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }

    for constraint in &schema.constraints {
        validate_constraint(constraint, obj, &mut diagnostics);
    }

    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

/// Returns true if `name` is present in `obj` with a non-null value.
pub fn is_set(obj: &Map<String, Value>, name: &str) -> bool {
    obj.get(name).is_some_and(|v| !v.is_null())
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            if diagnostics.len() == before {
                for validator in &attr.validators {
                    validate_value(validator, v, path, diagnostics);
                }
            }
        },
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Float64 => {
            if !value.is_number() {
                diagnostics.push(type_error(path, "float64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "list", value));
            }
        },
        AttributeType::Map(value_type) => {
            if let Some(obj) = value.as_object() {
                for (key, val) in obj {
                    let key_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, val, &key_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "map", value));
            }
        },
    }
}

fn validate_value(
    validator: &Validator,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match validator {
        Validator::LengthAtMost(max) => {
            if let Some(s) = value.as_str() {
                let len = s.chars().count();
                if len > *max {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid length for attribute '{}'", path))
                            .with_detail(format!(
                                "String length must be at most {}, got {}",
                                max, len
                            ))
                            .with_attribute(path),
                    );
                }
            }
        },
        Validator::OneOf(allowed) => {
            if let Some(s) = value.as_str() {
                if !allowed.iter().any(|a| a == s) {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                            .with_detail(format!(
                                "Value must be one of [{}], got \"{}\"",
                                allowed.join(", "),
                                s
                            ))
                            .with_attribute(path),
                    );
                }
            }
        },
        Validator::Between(min, max) => {
            if let Some(n) = value.as_i64() {
                if n < *min || n > *max {
                    diagnostics.push(
                        Diagnostic::error(format!("Value out of range for attribute '{}'", path))
                            .with_detail(format!(
                                "Value must be between {} and {}, got {}",
                                min, max, n
                            ))
                            .with_attribute(path),
                    );
                }
            }
        },
        Validator::JsonObject => {
            if let Some(s) = value.as_str() {
                match serde_json::from_str::<Value>(s) {
                    Ok(Value::Object(_)) => {},
                    Ok(other) => diagnostics.push(
                        Diagnostic::error(format!("Invalid JSON for attribute '{}'", path))
                            .with_detail(format!(
                                "Expected a JSON object, got {}",
                                value_type_name(&other)
                            ))
                            .with_attribute(path),
                    ),
                    Err(e) => diagnostics.push(
                        Diagnostic::error(format!("Invalid JSON for attribute '{}'", path))
                            .with_detail(e.to_string())
                            .with_attribute(path),
                    ),
                }
            }
        },
    }
}

fn validate_constraint(
    constraint: &Constraint,
    obj: &Map<String, Value>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match constraint {
        Constraint::ExactlyOneOf(names) => {
            let set: Vec<&String> = names.iter().filter(|n| is_set(obj, n)).collect();
            if set.len() != 1 {
                let mut diagnostic = Diagnostic::error(format!(
                    "Exactly one of [{}] must be configured",
                    names.join(", ")
                ))
                .with_detail(format!("{} of them are set", set.len()));
                if let Some(first) = set.first() {
                    diagnostic = diagnostic.with_attribute(first.as_str());
                }
                diagnostics.push(diagnostic);
            }
        },
        Constraint::AlsoRequires {
            attribute,
            requires,
        } => {
            if !is_set(obj, attribute) {
                return;
            }
            for required in requires {
                if !is_set(obj, required) {
                    diagnostics.push(
                        Diagnostic::error(format!(
                            "Attribute '{}' must be configured when '{}' is set",
                            required, attribute
                        ))
                        .with_attribute(attribute.as_str()),
                    );
                }
            }
        },
        Constraint::ConflictsWith {
            attribute,
            conflicts,
        } => {
            if !is_set(obj, attribute) {
                return;
            }
            for other in conflicts {
                if is_set(obj, other) {
                    diagnostics.push(
                        Diagnostic::error(format!(
                            "Attribute '{}' cannot be configured together with '{}'",
                            attribute, other
                        ))
                        .with_attribute(attribute.as_str()),
                    );
                }
            }
        },
    }
}

pub(crate) fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if n.is_i64() {
                true
            } else if let Some(f) = n.as_f64() {
                f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
            } else {
                false
            }
        },
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic {
        severity: DiagnosticSeverity::Error,
        summary: format!("Invalid type for attribute '{}'", path),
        detail: Some(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        )),
        attribute: Some(path.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn organization_schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "name",
                Attribute::required_string().with_validator(Validator::LengthAtMost(512)),
            )
            .with_attribute(
                "max_hosts",
                Attribute::new(
                    AttributeType::Int64,
                    crate::schema::AttributeFlags::optional_computed(),
                )
                .with_validator(Validator::Between(0, 2_147_483_647)),
            )
            .with_attribute("id", Attribute::computed_int64())
    }

    #[test]
    fn test_valid_config() {
        let schema = organization_schema();
        assert!(is_valid(&schema, &json!({"name": "Default", "max_hosts": 10})));
        assert!(validate_result(&schema, &json!({"name": "Default"})).is_ok());
    }

    #[test]
    fn test_missing_required() {
        let diagnostics = validate(&organization_schema(), &json!({"max_hosts": 1}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Missing required attribute 'name'");
    }

    #[test]
    fn test_null_value_is_absent() {
        let diagnostics = validate(&organization_schema(), &json!({"name": null}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("name"));
    }

    #[test]
    fn test_computed_attribute_skipped() {
        let config = json!({"name": "Default", "id": "not a number"});
        assert!(is_valid(&organization_schema(), &config));
    }

    #[test]
    fn test_type_error() {
        let diagnostics = validate(&organization_schema(), &json!({"name": 7}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].detail.as_deref(), Some("Expected string, got number"));
    }

    #[test]
    fn test_int64_accepts_integral_float() {
        assert!(is_valid(
            &organization_schema(),
            &json!({"name": "a", "max_hosts": 5.0})
        ));
    }

    #[test]
    fn test_between_validator() {
        let diagnostics = validate(
            &organization_schema(),
            &json!({"name": "a", "max_hosts": -1}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].summary,
            "Value out of range for attribute 'max_hosts'"
        );
    }

    #[test]
    fn test_length_counts_characters() {
        let schema = Schema::v0().with_attribute(
            "name",
            Attribute::required_string().with_validator(Validator::LengthAtMost(3)),
        );
        assert!(is_valid(&schema, &json!({"name": "äöü"})));
        assert!(!is_valid(&schema, &json!({"name": "abcd"})));
    }

    #[test]
    fn test_one_of_validator() {
        let schema = Schema::v0().with_attribute(
            "scm_type",
            Attribute::optional_string().with_validator(Validator::OneOf(vec![
                "".to_string(),
                "git".to_string(),
                "svn".to_string(),
            ])),
        );
        assert!(is_valid(&schema, &json!({"scm_type": "git"})));
        let diagnostics = validate(&schema, &json!({"scm_type": "cvs"}));
        assert_eq!(
            diagnostics[0].detail.as_deref(),
            Some("Value must be one of [, git, svn], got \"cvs\"")
        );
    }

    #[test]
    fn test_json_object_validator() {
        let schema = Schema::v0().with_attribute(
            "inputs",
            Attribute::optional_string().with_validator(Validator::JsonObject),
        );
        assert!(is_valid(&schema, &json!({"inputs": "{\"username\":\"a\"}"})));
        assert!(!is_valid(&schema, &json!({"inputs": "[1]"})));
        assert!(!is_valid(&schema, &json!({"inputs": "{"})));
    }

    #[test]
    fn test_list_and_map_types() {
        let schema = Schema::v0()
            .with_attribute(
                "tags",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    crate::schema::AttributeFlags::optional(),
                ),
            )
            .with_attribute(
                "roles",
                Attribute::new(
                    AttributeType::map(AttributeType::Int64),
                    crate::schema::AttributeFlags::optional(),
                ),
            );

        assert!(is_valid(&schema, &json!({"tags": ["a"], "roles": {"admin": 1}})));
        let diagnostics = validate(&schema, &json!({"tags": ["a", 2], "roles": {"admin": "x"}}));
        let paths: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.clone())
            .collect();
        assert_eq!(paths, vec!["roles.admin".to_string(), "tags.1".to_string()]);
    }

    #[test]
    fn test_exactly_one_of() {
        let lookup = crate::schema::AttributeFlags::optional_computed();
        let schema = Schema::v0()
            .with_attribute("id", Attribute::new(AttributeType::Int64, lookup))
            .with_attribute("name", Attribute::new(AttributeType::String, lookup))
            .with_constraint(Constraint::exactly_one_of(["id", "name"]));

        assert!(is_valid(&schema, &json!({"id": 1})));
        assert!(is_valid(&schema, &json!({"name": "Default", "id": null})));
        assert_eq!(validate(&schema, &json!({})).len(), 1);
        assert_eq!(validate(&schema, &json!({"id": 1, "name": "x"})).len(), 1);
    }

    #[test]
    fn test_also_requires_and_conflicts() {
        let schema = Schema::v0()
            .with_attribute("username", Attribute::optional_string())
            .with_attribute("password", Attribute::optional_string().sensitive())
            .with_attribute("token", Attribute::optional_string().sensitive())
            .with_constraint(Constraint::also_requires("password", ["username"]))
            .with_constraint(Constraint::conflicts_with("token", ["username", "password"]));

        assert!(is_valid(&schema, &json!({"username": "u", "password": "p"})));
        assert!(is_valid(&schema, &json!({"token": "t"})));

        let diagnostics = validate(&schema, &json!({"password": "p"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].summary,
            "Attribute 'username' must be configured when 'password' is set"
        );

        let diagnostics = validate(&schema, &json!({"token": "t", "username": "u"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("token"));
    }

    #[test]
    fn test_non_object_config() {
        let diagnostics = validate(&organization_schema(), &json!([1]));
        assert_eq!(diagnostics[0].summary, "Expected object");
        assert!(validate(&organization_schema(), &Value::Null).is_empty());
    }
}
