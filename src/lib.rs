//! Hemmer provider for AWX
//!
//! Manages AWX / Ansible Automation Platform objects (organizations,
//! credentials, inventories, job templates, settings and more) through the
//! AWX REST API, served to Hemmer over the provider gRPC protocol.
//!
//! # Overview
//!
//! - **Catalog**: declarative definitions of every resource and data source
//! - **Operations**: the REST round trips behind create, read, update, delete
//!   and import
//! - **Secret reconciliation**: AWX answers reads of secret inputs with the
//!   `$encrypted$` placeholder; [`reconcile`] puts the configured values back
//!   so plans stay quiet
//! - **Server**: [`serve`] prints the handshake and runs the gRPC service
//!
//! # Handshake Protocol
//!
//! When the provider starts it prints one line to stdout:
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `HEMMER_PROVIDER|<protocol_version>|<address>`. Logs go to stderr.
//!
//! # Configuration
//!
//! The provider block takes `hostname`, either `username`/`password` or
//! `token`, and `verify_ssl`. Unset attributes fall back to the `TOWER_*` and
//! `AWX_*` environment variables; see [`config`].
//!
//! # Example
//!
//! ```no_run
//! use hemmer_provider_awx::{init_logging, serve, AwxProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!     serve(AwxProvider::new()).await
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod helpers;
pub mod hooks;
pub mod logging;
pub mod model;
pub mod operations;
pub mod provider;
pub mod reconcile;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use client::{ApiError, Auth, AwxClient, ClientConfig};
pub use config::{ConfigError, ProviderConfig};
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::AwxProvider;
pub use reconcile::{
    reconcile, reconcile_document, reconcile_scalar, reconcile_with_policy, BaselinePolicy,
    DocumentSide, ReconcileError, Reconciled, PLACEHOLDER_MARKER,
};
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::{is_valid, validate, validate_result};

pub use async_trait::async_trait;
pub use serde_json;
pub use tonic;
pub use tracing;
