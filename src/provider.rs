//! The AWX provider: schema, configuration and lifecycle dispatch.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::catalog::{Catalog, DataSourceDefinition, FieldRole, ResourceDefinition};
use crate::client::AwxClient;
use crate::config::{config_diagnostics, provider_config_schema, ProviderConfig};
use crate::error::ProviderError;
use crate::hooks::{apply_secret_hooks, CallContext, Operation};
use crate::model::{values_equal, State};
use crate::operations;
use crate::schema::{has_errors, Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
};
use crate::validation::{is_set, validate};

/// Shown in plan changes in place of sensitive values.
pub const SENSITIVE_VALUE: &str = "(sensitive value)";

type EnvLookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Provider for the AWX REST API.
pub struct AwxProvider {
    catalog: Catalog,
    client: RwLock<Option<Arc<AwxClient>>>,
    env: Box<EnvLookup>,
}

impl fmt::Debug for AwxProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwxProvider")
            .field("resources", &self.catalog.resources().count())
            .field("data_sources", &self.catalog.data_sources().count())
            .finish_non_exhaustive()
    }
}

impl Default for AwxProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AwxProvider {
    /// A provider reading environment fallbacks from the process environment.
    pub fn new() -> Self {
        Self::with_env(|name| std::env::var(name).ok())
    }

    /// A provider consulting `lookup` for environment fallbacks.
    pub fn with_env<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            catalog: Catalog::awx(),
            client: RwLock::new(None),
            env: Box::new(lookup),
        }
    }

    /// A provider that is already configured with `client`.
    pub fn with_client(client: AwxClient) -> Self {
        let provider = Self::new();
        Self {
            client: RwLock::new(Some(Arc::new(client))),
            ..provider
        }
    }

    /// The resources and data sources served.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    async fn client(&self) -> Result<Arc<AwxClient>, ProviderError> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::FailedPrecondition(
                "Provider has not been configured; call configure first".to_string(),
            )
        })
    }

    fn resource(&self, resource_type: &str) -> Result<&ResourceDefinition, ProviderError> {
        self.catalog
            .resource(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&DataSourceDefinition, ProviderError> {
        self.catalog
            .data_source(data_source_type)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }
}

fn into_state(value: Value, what: &str) -> Result<State, ProviderError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(State::new()),
        other => Err(ProviderError::InvalidRequest(format!(
            "expected {} to be an object, got {}",
            what, other
        ))),
    }
}

fn display_value(sensitive: bool, value: &Value) -> Value {
    if sensitive && !value.is_null() {
        Value::String(SENSITIVE_VALUE.to_string())
    } else {
        value.clone()
    }
}

/// Compute the planned state and the attribute changes against `prior`.
fn plan_resource(
    resource: &ResourceDefinition,
    prior: Option<&State>,
    proposed: State,
    config: &State,
) -> PlanResult {
    let mut planned = proposed;
    let mut changes = Vec::new();
    let mut requires_replace = false;

    if resource.has_id() {
        let id = prior.and_then(|p| p.get("id")).cloned().unwrap_or(Value::Null);
        planned.insert("id".to_string(), id);
    }

    for field in &resource.fields {
        let prior_value = prior.and_then(|p| p.get(&field.name)).filter(|v| !v.is_null());

        if field.role == FieldRole::ReadOnly {
            planned.insert(
                field.name.clone(),
                prior_value.cloned().unwrap_or(Value::Null),
            );
            continue;
        }

        if !is_set(config, &field.name) {
            let fallback = match (&field.default, prior_value) {
                (Some(default), _) if field.role == FieldRole::Optional => default.clone(),
                (None, Some(previous)) if field.role == FieldRole::Optional => previous.clone(),
                _ => Value::Null,
            };
            planned.insert(field.name.clone(), fallback);
        }

        let after = planned.get(&field.name).cloned().unwrap_or(Value::Null);
        let sensitive = field.is_sensitive();
        match prior {
            None => {
                if !after.is_null() {
                    changes.push(AttributeChange::added(
                        field.name.clone(),
                        display_value(sensitive, &after),
                    ));
                }
            },
            Some(_) => {
                let before = prior_value.cloned().unwrap_or(Value::Null);
                if values_equal(field.kind, &before, &after) {
                    planned.insert(field.name.clone(), before);
                    continue;
                }
                if field.force_new {
                    requires_replace = true;
                }
                changes.push(AttributeChange::modified(
                    field.name.clone(),
                    display_value(sensitive, &before),
                    display_value(sensitive, &after),
                ));
            },
        }
    }

    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

/// A plan that removes every attribute of `prior`.
fn plan_destroy(resource: &ResourceDefinition, prior: &State) -> PlanResult {
    let changes = prior
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| {
            let sensitive = resource.field(name).is_some_and(|f| f.is_sensitive());
            AttributeChange::removed(name.clone(), display_value(sensitive, value))
        })
        .collect();
    PlanResult::with_changes(Value::Null, changes, false)
}

#[async_trait::async_trait]
impl ProviderService for AwxProvider {
    fn schema(&self) -> ProviderSchema {
        self.catalog.provider_schema(provider_config_schema())
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            resources: self.catalog.resources().map(|r| r.type_name.clone()).collect(),
            data_sources: self
                .catalog
                .data_sources()
                .map(|d| d.type_name.clone())
                .collect(),
            capabilities: ServerCapabilities { plan_destroy: true },
        }
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&provider_config_schema(), &config))
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        debug!("Provider configuration started");
        let diagnostics = validate(&provider_config_schema(), &config);
        if has_errors(&diagnostics) {
            return Ok(diagnostics);
        }

        let resolved = match ProviderConfig::from_value_with_env(&config, &*self.env) {
            Ok(resolved) => resolved,
            Err(errors) => return Ok(config_diagnostics(&errors)),
        };
        let client = AwxClient::new(resolved.client_config())?;
        info!(
            hostname = %client.hostname(),
            verify_ssl = resolved.verify_ssl,
            "Provider configured"
        );

        *self.client.write().await = Some(Arc::new(client));
        Ok(diagnostics)
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        Ok(validate(&resource.schema(), &config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let prior = prior_state
            .filter(|p| !p.is_null())
            .map(|p| into_state(p, "prior state"))
            .transpose()?;

        if proposed_state.is_null() {
            return Ok(match &prior {
                Some(prior) => plan_destroy(resource, prior),
                None => PlanResult::no_change(Value::Null),
            });
        }

        let proposed = into_state(proposed_state, "proposed state")?;
        let config = into_state(config, "config")?;
        Ok(plan_resource(resource, prior.as_ref(), proposed, &config))
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        let plan = into_state(planned_state, "planned state")?;

        let mut state = operations::create(&client, resource, &plan).await?;
        apply_secret_hooks(
            &resource.fields,
            CallContext::resource(Operation::Create),
            Some(&plan),
            &mut state,
        )?;
        Ok(Value::Object(state))
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        let prior = into_state(current_state, "current state")?;

        let mut state = operations::read(&client, resource, &prior).await?;
        apply_secret_hooks(
            &resource.fields,
            CallContext::resource(Operation::Read),
            Some(&prior),
            &mut state,
        )?;
        Ok(Value::Object(state))
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        let prior = into_state(prior_state, "prior state")?;
        let plan = into_state(planned_state, "planned state")?;

        let mut state = operations::update(&client, resource, &prior, &plan).await?;
        apply_secret_hooks(
            &resource.fields,
            CallContext::resource(Operation::Update),
            Some(&plan),
            &mut state,
        )?;
        Ok(Value::Object(state))
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        let state = into_state(current_state, "current state")?;
        operations::delete(&client, resource, &state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;

        let mut state = operations::import(&client, resource, id).await?;
        apply_secret_hooks(
            &resource.fields,
            CallContext::resource(Operation::Import),
            None,
            &mut state,
        )?;
        Ok(vec![ImportedResource::new(resource_type, Value::Object(state))])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        Ok(validate(&data_source.schema(), &config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        let client = self.client().await?;
        let config = into_state(config, "config")?;

        let mut state = operations::read_data_source(&client, data_source, &config).await?;
        apply_secret_hooks(&data_source.fields, CallContext::data_source(), None, &mut state)?;
        Ok(Value::Object(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Auth, ClientConfig};
    use crate::testing::{
        assert_has_errors, assert_plan_changes_attribute, assert_plan_creates,
        assert_plan_does_not_change_attribute, assert_plan_no_changes, assert_plan_replaces,
        ProviderTester, TestError,
    };
    use serde_json::json;
    use std::collections::HashMap;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn env(vars: &[(&'static str, String)]) -> impl Fn(&str) -> Option<String> + Send + Sync {
        let vars: HashMap<&'static str, String> = vars.iter().cloned().collect();
        move |name| vars.get(name).cloned()
    }

    fn unconfigured() -> AwxProvider {
        AwxProvider::with_env(env(&[]))
    }

    fn configured(server: &MockServer) -> AwxProvider {
        let client =
            AwxClient::new(ClientConfig::new(server.uri(), Auth::Token("t".to_string()))).unwrap();
        AwxProvider::with_client(client)
    }

    #[test]
    fn test_schema_covers_catalog() {
        let tester = ProviderTester::new(unconfigured());
        let schema = tester.schema();
        assert!(schema.provider.attributes.contains_key("hostname"));
        assert!(tester.resource_types().contains(&"awx_credential".to_string()));
        assert!(tester.data_source_types().contains(&"awx_me".to_string()));
    }

    #[tokio::test]
    async fn test_operations_require_configuration() {
        let tester = ProviderTester::new(unconfigured());
        let err = tester
            .create("awx_team", json!({"name": "ops", "organization": 1}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("has not been configured"));
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let provider = unconfigured();
        let err = provider.read("awx_widget", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
        let err = provider.read_data_source("awx_widget", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_configure_reports_missing_settings() {
        let provider = unconfigured();
        let diagnostics = provider.configure(json!({})).await.unwrap();
        assert_has_errors(&diagnostics);
        assert_eq!(diagnostics[0].summary, "Unknown AWX API Host");
    }

    #[tokio::test]
    async fn test_configure_from_environment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/me/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 1,
                "results": [{"id": 1, "username": "admin", "is_superuser": true}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AwxProvider::with_env(env(&[
            ("AWX_HOST", server.uri()),
            ("AWX_AUTH_TOKEN", "token".to_string()),
        ]));
        let tester = ProviderTester::new(provider);
        tester.configure(json!({})).await.unwrap();

        let me = tester.read_data_source("awx_me", json!({})).await.unwrap();
        assert_eq!(me["username"], json!("admin"));
        assert_eq!(me["is_superuser"], json!(true));
        tester.read_data_source("awx_me", json!({})).await.unwrap();
    }

    #[tokio::test]
    async fn test_validate_resource_config() {
        let tester = ProviderTester::new(unconfigured());
        tester
            .validate_resource_config("awx_organization", json!({"name": "Default"}))
            .await
            .unwrap();

        let err = tester
            .validate_resource_config("awx_organization", json!({"name": "x".repeat(513)}))
            .await
            .unwrap_err();
        assert!(matches!(err, TestError::Diagnostics(_)));

        let err = tester
            .validate_resource_config(
                "awx_credential",
                json!({"name": "c", "credential_type": 1, "inputs": "[]"}),
            )
            .await
            .unwrap_err();
        let TestError::Diagnostics(diagnostics) = err else {
            panic!("expected diagnostics");
        };
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("inputs"));
    }

    #[tokio::test]
    async fn test_plan_create_applies_defaults() {
        let tester = ProviderTester::new(unconfigured());
        let config = json!({"name": "Default"});
        let plan = tester
            .plan("awx_organization", None, config.clone(), config)
            .await
            .unwrap();

        assert_plan_creates(&plan);
        assert_eq!(plan.planned_state["description"], json!(""));
        assert_eq!(plan.planned_state["max_hosts"], json!(0));
        assert_eq!(plan.planned_state["id"], Value::Null);
        assert_plan_changes_attribute(&plan, "name");
    }

    #[tokio::test]
    async fn test_plan_no_changes_with_equivalent_json() {
        let tester = ProviderTester::new(unconfigured());
        let prior = json!({
            "id": 3, "name": "ssh", "description": "", "credential_type": 1,
            "organization": null, "inputs": r#"{"password":"hunter2","username":"root"}"#,
            "cloud": false, "kind": "ssh", "kubernetes": false, "managed": false,
        });
        let config = json!({
            "name": "ssh", "credential_type": 1,
            "inputs": "{ \"username\": \"root\", \"password\": \"hunter2\" }",
        });
        let plan = tester
            .plan("awx_credential", Some(prior.clone()), config.clone(), config)
            .await
            .unwrap();

        assert_plan_no_changes(&plan);
        assert_eq!(plan.planned_state["inputs"], prior["inputs"]);
        assert_eq!(plan.planned_state["kind"], json!("ssh"));
    }

    #[tokio::test]
    async fn test_plan_masks_sensitive_changes() {
        let tester = ProviderTester::new(unconfigured());
        let prior = json!({
            "id": 3, "name": "ssh", "description": "", "credential_type": 1,
            "inputs": r#"{"password":"old"}"#,
        });
        let config = json!({
            "name": "ssh",
            "credential_type": 1,
            "inputs": r#"{"password":"new"}"#,
        });
        let plan = tester
            .plan("awx_credential", Some(prior), config.clone(), config)
            .await
            .unwrap();

        assert_plan_changes_attribute(&plan, "inputs");
        assert_plan_does_not_change_attribute(&plan, "name");
        let change = plan.changes.iter().find(|c| c.path == "inputs").unwrap();
        assert_eq!(change.after, Some(json!(SENSITIVE_VALUE)));
        assert!(!plan.requires_replace);
    }

    #[tokio::test]
    async fn test_plan_force_new_replaces() {
        let tester = ProviderTester::new(unconfigured());
        let prior = json!({"host_id": 3, "group_id": 7});
        let config = json!({"host_id": 3, "group_id": 8});
        let plan = tester
            .plan("awx_host_associate_group", Some(prior), config.clone(), config)
            .await
            .unwrap();
        assert_plan_replaces(&plan);
    }

    #[tokio::test]
    async fn test_plan_destroy() {
        let provider = unconfigured();
        let prior = json!({"id": 3, "name": "ssh", "inputs": "{}"});
        let plan = provider
            .plan("awx_credential", Some(prior), Value::Null, Value::Null)
            .await
            .unwrap();
        assert_eq!(plan.planned_state, Value::Null);
        assert_eq!(plan.changes.len(), 3);
        assert!(plan.changes.iter().all(|c| c.after.is_none()));
    }

    #[tokio::test]
    async fn test_import_settings_is_unimplemented() {
        let server = MockServer::start().await;
        let tester = ProviderTester::new(configured(&server));
        let err = tester.import_resource("awx_settings_jobs", "1").await.unwrap_err();
        assert!(err.to_string().contains("Import not supported"));
    }

    #[tokio::test]
    async fn test_metadata_plans_destroy() {
        let provider = unconfigured();
        let metadata = provider.metadata();
        assert!(metadata.capabilities.plan_destroy);
        assert_eq!(metadata.resources.len(), provider.catalog().resources().count());
    }
}
