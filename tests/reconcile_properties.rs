//! Behavioural properties of placeholder reconciliation.

use hemmer_provider_awx::reconcile::{
    reconcile, reconcile_with_policy, BaselinePolicy, DocumentSide, ReconcileError,
};
use serde_json::{json, Value};

fn parse(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap()
}

#[test]
fn test_documents_without_placeholders_pass_through() {
    let currents = [
        r#"{}"#,
        r#"{"username":"admin"}"#,
        r#"{"port": 22, "become": true, "nested": {"password": "x"}}"#,
        r#"{"host":"awx.example.com","verify":false}"#,
    ];
    let previouses = ["", "{}", r#"{"username":"root","password":"hunter2"}"#, "null"];

    for current in currents {
        for previous in previouses {
            assert_eq!(reconcile(previous, current).unwrap(), current);
        }
    }
}

#[test]
fn test_every_placeholder_is_restored() {
    let merged = reconcile(
        r#"{"a":"secret1","b":"secret2"}"#,
        r#"{"a":"$encrypted$","b":"$encrypted$"}"#,
    )
    .unwrap();
    assert_eq!(parse(&merged), json!({"a": "secret1", "b": "secret2"}));
}

#[test]
fn test_non_secret_values_follow_the_server() {
    let merged = reconcile(
        r#"{"a":"secret1"}"#,
        r#"{"a":"$encrypted$","b":"plainvalue"}"#,
    )
    .unwrap();
    assert_eq!(parse(&merged), json!({"a": "secret1", "b": "plainvalue"}));
}

#[test]
fn test_removed_keys_do_not_come_back() {
    let merged = reconcile(r#"{"a":"secret1","c":"old"}"#, r#"{"a":"$encrypted$"}"#).unwrap();
    assert_eq!(parse(&merged), json!({"a": "secret1"}));
}

#[test]
fn test_missing_baseline_preserves_placeholder() {
    let current = r#"{"a":"$encrypted$"}"#;
    let merged = reconcile("{}", current).unwrap();
    assert_eq!(parse(&merged), json!({"a": "$encrypted$"}));

    assert_eq!(reconcile("", current).unwrap(), current);
    for previous in ["", "{}"] {
        assert_eq!(
            reconcile_with_policy(previous, current, BaselinePolicy::Require),
            Err(ReconcileError::MissingBaseline)
        );
    }
}

#[test]
fn test_truncated_current_is_rejected() {
    for current in [r#"{"a":"$encrypted$""#, r#"{"a":"plain"#, ""] {
        let err = reconcile(r#"{"a":"secret1"}"#, current).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::MalformedDocument {
                side: DocumentSide::Current,
                ..
            }
        ));
    }
}

#[test]
fn test_reconcile_is_idempotent() {
    let previous = r#"{"password":"hunter2","ssh_key_unlock":"k3y","username":"root"}"#;
    let currents = [
        r#"{"password":"$encrypted$","ssh_key_unlock":"$encrypted$","username":"admin"}"#,
        r#"{"password":"$encrypted$","username":"root"}"#,
        r#"{"username":"root"}"#,
    ];

    for current in currents {
        let once = reconcile(previous, current).unwrap();
        let twice = reconcile(previous, &once).unwrap();
        assert_eq!(twice, once);
    }
}
