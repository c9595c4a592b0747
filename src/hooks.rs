//! Call context and the secret hooks run after every API round trip.
//!
//! AWX answers reads of secret-bearing attributes with placeholders and never
//! returns write-only attributes at all. The hooks restore those values from
//! the document the operation started from (`orig`) so state keeps what the
//! operator configured.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::catalog::{FieldDefinition, SecretKind};
use crate::error::ProviderError;
use crate::model::State;
use crate::reconcile::{reconcile_document, reconcile_scalar, BaselinePolicy};

/// Which kind of definition the call is serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A read-only data source.
    DataSource,
    /// A managed resource.
    Resource,
}

/// The lifecycle operation in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create.
    Create,
    /// Read or refresh.
    Read,
    /// Update in place.
    Update,
    /// Delete.
    Delete,
    /// Import by id.
    Import,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Import => "import",
        };
        f.write_str(name)
    }
}

/// Origin and operation of one hook invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Resource or data source.
    pub origin: Origin,
    /// Operation in progress.
    pub operation: Operation,
}

impl CallContext {
    /// A resource operation.
    pub fn resource(operation: Operation) -> Self {
        Self {
            origin: Origin::Resource,
            operation,
        }
    }

    /// A data source read.
    pub fn data_source() -> Self {
        Self {
            origin: Origin::DataSource,
            operation: Operation::Read,
        }
    }
}

/// Resource reads and updates need both the starting document and the new state.
pub fn require_state_and_orig(
    ctx: CallContext,
    has_orig: bool,
    has_state: bool,
) -> Result<(), ProviderError> {
    let needs_both = ctx.origin == Origin::Resource
        && matches!(ctx.operation, Operation::Read | Operation::Update);
    if needs_both && !(has_orig && has_state) {
        return Err(ProviderError::Internal(
            "state and orig required for resource".to_string(),
        ));
    }
    Ok(())
}

/// Restore secret and write-only attributes of `state` from `orig`.
///
/// On create `state` takes the planned values. On read, update and import
/// document secrets are reconciled key by key, scalar secrets are replaced
/// when redacted and write-only attributes are copied over. Data sources and
/// deletes are left alone.
pub fn apply_secret_hooks(
    fields: &[FieldDefinition],
    ctx: CallContext,
    orig: Option<&State>,
    state: &mut State,
) -> Result<(), ProviderError> {
    if ctx.origin == Origin::DataSource || ctx.operation == Operation::Delete {
        return Ok(());
    }
    require_state_and_orig(ctx, orig.is_some(), true)?;

    let guarded = fields
        .iter()
        .filter(|f| f.secret.is_some() || f.is_write_only());

    for field in guarded {
        let previous = orig.and_then(|o| o.get(&field.name)).filter(|v| !v.is_null());

        if ctx.operation == Operation::Create || field.is_write_only() {
            if let Some(previous) = previous {
                state.insert(field.name.clone(), previous.clone());
            }
            continue;
        }

        let Some(Value::String(current)) = state.get(&field.name) else {
            continue;
        };

        let (restored, count) = match field.secret {
            Some(SecretKind::Document) => {
                let baseline = previous.and_then(Value::as_str).unwrap_or("");
                let merged = reconcile_document(baseline, current, BaselinePolicy::Preserve)?;
                (merged.document, merged.restored.len())
            },
            Some(SecretKind::Scalar) => {
                let restored = reconcile_scalar(previous.and_then(Value::as_str), current);
                let count = usize::from(&restored != current);
                (restored, count)
            },
            None => continue,
        };

        if count > 0 {
            debug!(
                attribute = %field.name,
                operation = %ctx.operation,
                restored = count,
                "Restored redacted values from previous state"
            );
            state.insert(field.name.clone(), Value::String(restored));
        }
    }

    Ok(())
}
