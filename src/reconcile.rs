//! Placeholder reconciliation for write-only secrets.
//!
//! AWX never returns secret values in plaintext. Wherever a secret was
//! stored, the API echoes the sentinel [`PLACEHOLDER_MARKER`] instead. Writing
//! such a response straight into state would make every subsequent plan see
//! drift against the operator's configuration, so after every read the fresh
//! document is merged with the previously stored one: placeholder-marked
//! values are restored from the baseline, everything else reflects the
//! server.
//!
//! The functions here are pure. They perform no I/O and no logging; callers
//! decide what to do with the result.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_awx::reconcile::reconcile;
//!
//! let previous = r#"{"password":"hunter2","username":"admin"}"#;
//! let current = r#"{"password":"$encrypted$","username":"admin"}"#;
//!
//! let merged = reconcile(previous, current).unwrap();
//! assert_eq!(merged, r#"{"password":"hunter2","username":"admin"}"#);
//! ```

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::validation::value_type_name;

/// Sentinel the server embeds in any value it refuses to return in plaintext.
pub const PLACEHOLDER_MARKER: &str = "$encrypted$";

/// A string-keyed JSON object holding one resource's secret-bearing block.
pub type Document = Map<String, Value>;

/// Which of the two documents failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSide {
    /// The last stored document.
    Previous,
    /// The freshly fetched document.
    Current,
}

impl fmt::Display for DocumentSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSide::Previous => write!(f, "previous"),
            DocumentSide::Current => write!(f, "current"),
        }
    }
}

/// Errors produced while reconciling two documents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// A document that had to be parsed is not a JSON object.
    #[error("malformed {side} document: {reason}")]
    MalformedDocument {
        /// Which input was malformed.
        side: DocumentSide,
        /// Parser message.
        reason: String,
    },

    /// The fetched document carries placeholders but no baseline exists.
    #[error("no previous document to restore redacted values from")]
    MissingBaseline,
}

/// What to do when `current` carries placeholders and there is no baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BaselinePolicy {
    /// Return `current` with its placeholders intact.
    #[default]
    Preserve,
    /// Fail with [`ReconcileError::MissingBaseline`].
    Require,
}

/// Returns true if `value` is a string containing the placeholder marker.
///
/// Non-string values are opaque and never count as redacted.
pub fn is_placeholder(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.contains(PLACEHOLDER_MARKER))
}

/// Returns true if any top-level value of `document` is placeholder-marked.
pub fn has_placeholders(document: &Document) -> bool {
    document.values().any(is_placeholder)
}

/// Reconcile two JSON-encoded documents with the default [`BaselinePolicy`].
pub fn reconcile(previous: &str, current: &str) -> Result<String, ReconcileError> {
    reconcile_with_policy(previous, current, BaselinePolicy::default())
}

/// Reconcile two JSON-encoded documents.
///
/// `current` is always parsed, so a malformed fetch is reported even when it
/// carries no placeholder. Without a placeholder `current` is returned
/// byte-for-byte. An empty, blank, `null` or `{}` `previous` is a missing
/// baseline and is handled according to `policy`.
pub fn reconcile_with_policy(
    previous: &str,
    current: &str,
    policy: BaselinePolicy,
) -> Result<String, ReconcileError> {
    reconcile_document(previous, current, policy).map(|merged| merged.document)
}

/// Outcome of [`reconcile_document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// The JSON-encoded result.
    pub document: String,
    /// Keys whose placeholder was replaced from the baseline.
    pub restored: Vec<String>,
}

/// Like [`reconcile_with_policy`], also reporting which keys were restored.
pub fn reconcile_document(
    previous: &str,
    current: &str,
    policy: BaselinePolicy,
) -> Result<Reconciled, ReconcileError> {
    let unchanged = || Reconciled {
        document: current.to_string(),
        restored: Vec::new(),
    };
    let mut current_doc = parse_document(current, DocumentSide::Current)?;

    if !current.contains(PLACEHOLDER_MARKER) || !has_placeholders(&current_doc) {
        return Ok(unchanged());
    }

    let previous_doc = match parse_baseline(previous)? {
        Some(doc) => doc,
        None => {
            return match policy {
                BaselinePolicy::Preserve => Ok(unchanged()),
                BaselinePolicy::Require => Err(ReconcileError::MissingBaseline),
            };
        }
    };

    let restored = merge_placeholders(&previous_doc, &mut current_doc);

    let document =
        serde_json::to_string(&current_doc).map_err(|e| ReconcileError::MalformedDocument {
            side: DocumentSide::Current,
            reason: e.to_string(),
        })?;
    Ok(Reconciled { document, restored })
}

/// Restore every placeholder-marked value in `current` from `previous`.
///
/// Keys that `previous` lacks keep their placeholder. Keys absent from
/// `current` are never introduced. Returns the names of the restored keys.
pub fn merge_placeholders(previous: &Document, current: &mut Document) -> Vec<String> {
    let mut restored = Vec::new();
    for (key, value) in current.iter_mut() {
        if !is_placeholder(value) {
            continue;
        }
        if let Some(known) = previous.get(key) {
            *value = known.clone();
            restored.push(key.clone());
        }
    }
    restored
}

/// Reconcile a single secret value.
///
/// A placeholder-marked `current` is replaced by `previous` when one is known.
pub fn reconcile_scalar(previous: Option<&str>, current: &str) -> String {
    match previous {
        Some(known) if current.contains(PLACEHOLDER_MARKER) => known.to_string(),
        _ => current.to_string(),
    }
}

fn parse_document(raw: &str, side: DocumentSide) -> Result<Document, ReconcileError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ReconcileError::MalformedDocument {
            side,
            reason: format!("expected a JSON object, found {}", value_type_name(&other)),
        }),
        Err(e) => Err(ReconcileError::MalformedDocument {
            side,
            reason: e.to_string(),
        }),
    }
}

fn parse_baseline(raw: &str) -> Result<Option<Document>, ReconcileError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    let document = parse_document(trimmed, DocumentSide::Previous)?;
    Ok(Some(document).filter(|doc| !doc.is_empty()))
}
