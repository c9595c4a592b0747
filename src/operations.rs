//! REST round trips for resources and data sources.
//!
//! Each function performs the API calls for one lifecycle step and returns
//! the resulting state. Secret hooks are applied by the caller.

use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::catalog::{
    DataSourceDefinition, DataSourceKind, LookupGroup, ResourceDefinition, ResourceKind,
};
use crate::client::{AwxClient, ME_ENDPOINT};
use crate::error::ProviderError;
use crate::helpers::{extract_data_if_search_result, int_attribute, join_endpoint, value_as_i64};
use crate::model::{body_request, state_from_api, state_id, State};
use crate::validation::is_set;

/// Create the resource described by `plan`.
pub async fn create(
    client: &AwxClient,
    resource: &ResourceDefinition,
    plan: &State,
) -> Result<State, ProviderError> {
    match &resource.kind {
        ResourceKind::Object { endpoint } => {
            let body = body_request(&resource.fields, plan)?;
            debug!(resource_type = %resource.type_name, endpoint = %endpoint, "Creating object");
            let data = client.request(Method::POST, endpoint, Some(&body)).await?;
            let mut state = plan.clone();
            state_from_api(&resource.fields, &data, &mut state)?;
            state.insert("id".to_string(), response_id(resource, &data)?);
            Ok(state)
        },
        ResourceKind::Settings { endpoint } => {
            let body = body_request(&resource.fields, plan)?;
            debug!(resource_type = %resource.type_name, endpoint = %endpoint, "Applying settings");
            let data = client.request(Method::PATCH, endpoint, Some(&body)).await?;
            let mut state = plan.clone();
            state_from_api(&resource.fields, &data, &mut state)?;
            Ok(state)
        },
        ResourceKind::Association {
            endpoint,
            parent,
            child,
        } => {
            let (parent_id, child_id) = association_ids(resource, plan, parent, child)?;
            let endpoint = association_endpoint(endpoint, parent_id);
            debug!(resource_type = %resource.type_name, endpoint = %endpoint, "Associating");
            client
                .request(Method::POST, &endpoint, Some(&json!({ "id": child_id })))
                .await?;
            Ok(plan.clone())
        },
    }
}

/// Refresh `prior` from the API.
pub async fn read(
    client: &AwxClient,
    resource: &ResourceDefinition,
    prior: &State,
) -> Result<State, ProviderError> {
    match &resource.kind {
        ResourceKind::Object { endpoint } => {
            let id = require_id(resource, prior)?;
            let data = client
                .request(Method::GET, &join_endpoint(endpoint, id), None)
                .await?;
            let mut state = prior.clone();
            state_from_api(&resource.fields, &data, &mut state)?;
            Ok(state)
        },
        ResourceKind::Settings { endpoint } => {
            let data = client.request(Method::GET, endpoint, None).await?;
            let mut state = prior.clone();
            state_from_api(&resource.fields, &data, &mut state)?;
            Ok(state)
        },
        ResourceKind::Association { .. } => Ok(prior.clone()),
    }
}

/// Apply `plan` to the existing resource.
pub async fn update(
    client: &AwxClient,
    resource: &ResourceDefinition,
    prior: &State,
    plan: &State,
) -> Result<State, ProviderError> {
    match &resource.kind {
        ResourceKind::Object { endpoint } => {
            let id = state_id(plan)
                .or_else(|| state_id(prior))
                .ok_or_else(|| missing_id(resource))?;
            let body = body_request(&resource.fields, plan)?;
            debug!(resource_type = %resource.type_name, id, "Updating object");
            let data = client
                .request(Method::PATCH, &join_endpoint(endpoint, id), Some(&body))
                .await?;
            let mut state = State::new();
            state.insert("id".to_string(), Value::from(id));
            state_from_api(&resource.fields, &data, &mut state)?;
            Ok(state)
        },
        ResourceKind::Settings { endpoint } => {
            let body = body_request(&resource.fields, plan)?;
            let data = client.request(Method::PATCH, endpoint, Some(&body)).await?;
            let mut state = State::new();
            state_from_api(&resource.fields, &data, &mut state)?;
            Ok(state)
        },
        ResourceKind::Association { .. } => Ok(plan.clone()),
    }
}

/// Delete the resource held in `state`.
///
/// Settings cannot be deleted; the call succeeds without touching the server.
pub async fn delete(
    client: &AwxClient,
    resource: &ResourceDefinition,
    state: &State,
) -> Result<(), ProviderError> {
    match &resource.kind {
        ResourceKind::Object { endpoint } => {
            let id = require_id(resource, state)?;
            debug!(resource_type = %resource.type_name, id, "Deleting object");
            client
                .request(Method::DELETE, &join_endpoint(endpoint, id), None)
                .await?;
            Ok(())
        },
        ResourceKind::Settings { .. } => {
            debug!(resource_type = %resource.type_name, "Settings are left in place on delete");
            Ok(())
        },
        ResourceKind::Association {
            endpoint,
            parent,
            child,
        } => {
            let (parent_id, child_id) = association_ids(resource, state, parent, child)?;
            let endpoint = association_endpoint(endpoint, parent_id);
            debug!(resource_type = %resource.type_name, endpoint = %endpoint, "Disassociating");
            client
                .request(
                    Method::POST,
                    &endpoint,
                    Some(&json!({ "id": child_id, "disassociate": true })),
                )
                .await?;
            Ok(())
        },
    }
}

/// Build state for an existing object identified by `id`.
pub async fn import(
    client: &AwxClient,
    resource: &ResourceDefinition,
    id: &str,
) -> Result<State, ProviderError> {
    match &resource.kind {
        ResourceKind::Object { endpoint } => {
            let id: i64 = id.trim().parse().map_err(|_| {
                ProviderError::InvalidRequest(format!(
                    "Unable to parse '{}' as an int64 number, please provide the ID for the {}.",
                    id, resource.display_name
                ))
            })?;
            let data = client
                .request(Method::GET, &join_endpoint(endpoint, id), None)
                .await?;
            let mut state = State::new();
            state.insert("id".to_string(), Value::from(id));
            state_from_api(&resource.fields, &data, &mut state)?;
            Ok(state)
        },
        ResourceKind::Association { parent, child, .. } => {
            let invalid = || {
                ProviderError::InvalidRequest(format!(
                    "requires the identifier to be set to <{}>/<{}>, currently set to {}",
                    parent, child, id
                ))
            };
            let parts: Vec<&str> = id.split('/').collect();
            let [parent_id, child_id] = parts.as_slice() else {
                return Err(invalid());
            };
            let parent_id: i64 = parent_id.trim().parse().map_err(|_| invalid())?;
            let child_id: i64 = child_id.trim().parse().map_err(|_| invalid())?;

            let mut state = State::new();
            state.insert(parent.clone(), Value::from(parent_id));
            state.insert(child.clone(), Value::from(child_id));
            Ok(state)
        },
        ResourceKind::Settings { .. } => Err(ProviderError::Unimplemented(format!(
            "Import not supported for resource type: {}",
            resource.type_name
        ))),
    }
}

/// Read a data source configured by `config`.
pub async fn read_data_source(
    client: &AwxClient,
    data_source: &DataSourceDefinition,
    config: &State,
) -> Result<State, ProviderError> {
    match &data_source.kind {
        DataSourceKind::Lookup { endpoint, groups } => {
            let group = groups
                .iter()
                .find(|g| g.attributes().iter().all(|a| is_set(config, a)))
                .ok_or_else(|| {
                    ProviderError::InvalidRequest(
                        "missing configuration for one of the predefined search groups"
                            .to_string(),
                    )
                })?;
            debug!(
                data_source_type = %data_source.type_name,
                group = group.name(),
                "Looking up object"
            );

            let data = match group {
                LookupGroup::Path { attribute, .. } => {
                    let segment = query_value(config, attribute);
                    client
                        .request(Method::GET, &join_endpoint(endpoint, segment), None)
                        .await?
                },
                LookupGroup::Query { params, .. } => {
                    let values: Vec<(&str, String)> = params
                        .iter()
                        .map(|(param, attribute)| (param.as_str(), query_value(config, attribute)))
                        .collect();
                    let query: Vec<(&str, &str)> =
                        values.iter().map(|(p, v)| (*p, v.as_str())).collect();
                    client
                        .request_with_query(Method::GET, endpoint, &query, None)
                        .await?
                },
            };
            let data = extract_data_if_search_result(data)?;

            let mut state = config.clone();
            state_from_api(&data_source.fields, &data, &mut state)?;
            Ok(state)
        },
        DataSourceKind::Singleton { endpoint } => {
            let data = if endpoint == ME_ENDPOINT {
                client.current_user().await?
            } else {
                let data = client.request(Method::GET, endpoint, None).await?;
                extract_data_if_search_result(data)?
            };
            let mut state = State::new();
            state_from_api(&data_source.fields, &data, &mut state)?;
            Ok(state)
        },
        DataSourceKind::ObjectRoles { endpoint } => {
            let id = int_attribute(config, "id").ok_or_else(|| {
                ProviderError::InvalidRequest(format!(
                    "Missing required attribute 'id' for {}",
                    data_source.type_name
                ))
            })?;
            let data = client
                .request(Method::GET, &association_endpoint(endpoint, id), None)
                .await?;
            let search: ObjectRoleSearch = serde_json::from_value(data)?;

            let roles: Map<String, Value> = search
                .results
                .into_iter()
                .map(|role| (role.name, Value::from(role.id)))
                .collect();
            let mut state = State::new();
            state.insert("id".to_string(), Value::from(id));
            state.insert("roles".to_string(), Value::Object(roles));
            Ok(state)
        },
    }
}

#[derive(Debug, Deserialize)]
struct ObjectRoleSearch {
    #[serde(default)]
    results: Vec<ObjectRole>,
}

#[derive(Debug, Deserialize)]
struct ObjectRole {
    id: i64,
    name: String,
}

fn association_endpoint(endpoint: &str, parent_id: i64) -> String {
    endpoint.replacen("{}", &parent_id.to_string(), 1)
}

fn association_ids(
    resource: &ResourceDefinition,
    state: &State,
    parent: &str,
    child: &str,
) -> Result<(i64, i64), ProviderError> {
    let get = |name: &str| {
        int_attribute(state, name).ok_or_else(|| {
            ProviderError::InvalidRequest(format!(
                "{} requires '{}' to be set",
                resource.type_name, name
            ))
        })
    };
    Ok((get(parent)?, get(child)?))
}

fn require_id(resource: &ResourceDefinition, state: &State) -> Result<i64, ProviderError> {
    state_id(state).ok_or_else(|| missing_id(resource))
}

fn missing_id(resource: &ResourceDefinition) -> ProviderError {
    ProviderError::InvalidRequest(format!(
        "{} state has no id",
        resource.display_name
    ))
}

fn response_id(resource: &ResourceDefinition, data: &Value) -> Result<Value, ProviderError> {
    data.get("id")
        .and_then(value_as_i64)
        .map(Value::from)
        .ok_or_else(|| {
            ProviderError::Internal(format!(
                "create response for {} carries no id",
                resource.display_name
            ))
        })
}

fn query_value(config: &State, attribute: &str) -> String {
    match config.get(attribute) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::client::{Auth, ClientConfig};
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AwxClient {
        AwxClient::new(ClientConfig::new(server.uri(), Auth::Token("t".to_string()))).unwrap()
    }

    fn obj(value: Value) -> State {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn test_object_create_and_delete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/teams/"))
            .and(body_json(json!({"name": "ops", "description": "", "organization": 1})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 9, "name": "ops", "description": "", "organization": 1
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/v2/teams/9/"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let catalog = Catalog::awx();
        let team = catalog.resource("awx_team").unwrap();
        let client = client_for(&server);

        let plan = obj(json!({"name": "ops", "description": "", "organization": 1}));
        let state = create(&client, team, &plan).await.unwrap();
        assert_eq!(state["id"], json!(9));
        assert_eq!(state["name"], json!("ops"));

        delete(&client, team, &state).await.unwrap();
    }

    #[tokio::test]
    async fn test_object_delete_propagates_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v2/labels/4/"))
            .respond_with(ResponseTemplate::new(404).set_body_string("{}"))
            .mount(&server)
            .await;

        let catalog = Catalog::awx();
        let label = catalog.resource("awx_label").unwrap();
        let err = delete(&client_for(&server), label, &obj(json!({"id": 4})))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_object_update_builds_fresh_state() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/v2/teams/9/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 9, "name": "renamed", "description": "", "organization": 1
            })))
            .mount(&server)
            .await;

        let catalog = Catalog::awx();
        let team = catalog.resource("awx_team").unwrap();
        let prior = obj(json!({"id": 9, "name": "ops", "description": "", "organization": 1}));
        let plan = obj(json!({"id": 9, "name": "renamed", "description": "", "organization": 1}));

        let state = update(&client_for(&server), team, &prior, &plan).await.unwrap();
        assert_eq!(state, plan);
    }

    #[tokio::test]
    async fn test_import_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/organizations/1/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1, "name": "Default", "description": "", "max_hosts": 0,
                "default_environment": null
            })))
            .mount(&server)
            .await;

        let catalog = Catalog::awx();
        let organization = catalog.resource("awx_organization").unwrap();
        let client = client_for(&server);

        let state = import(&client, organization, "1").await.unwrap();
        assert_eq!(state["id"], json!(1));
        assert_eq!(state["name"], json!("Default"));
        assert_eq!(state["default_environment"], Value::Null);

        let err = import(&client, organization, "Default").await.unwrap_err();
        assert_eq!(
            err.message(),
            "Unable to parse 'Default' as an int64 number, please provide the ID for the Organization."
        );
    }

    #[tokio::test]
    async fn test_import_association() {
        let server = MockServer::start().await;
        let catalog = Catalog::awx();
        let resource = catalog.resource("awx_host_associate_group").unwrap();
        let client = client_for(&server);

        let state = import(&client, resource, "3/7").await.unwrap();
        assert_eq!(state, obj(json!({"host_id": 3, "group_id": 7})));

        let err = import(&client, resource, "3").await.unwrap_err();
        assert_eq!(
            err.message(),
            "requires the identifier to be set to <host_id>/<group_id>, currently set to 3"
        );
        assert!(import(&client, resource, "3/7/1").await.is_err());
        assert!(import(&client, resource, "a/7").await.is_err());
    }

    #[tokio::test]
    async fn test_settings_import_unimplemented() {
        let server = MockServer::start().await;
        let catalog = Catalog::awx();
        let resource = catalog.resource("awx_settings_jobs").unwrap();
        let err = import(&client_for(&server), resource, "1").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unimplemented(_)));
    }

    #[tokio::test]
    async fn test_association_lifecycle() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/hosts/3/groups/"))
            .and(body_json(json!({"id": 7})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v2/hosts/3/groups/"))
            .and(body_json(json!({"id": 7, "disassociate": true})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let catalog = Catalog::awx();
        let resource = catalog.resource("awx_host_associate_group").unwrap();
        let client = client_for(&server);
        let plan = obj(json!({"host_id": 3, "group_id": 7}));

        let state = create(&client, resource, &plan).await.unwrap();
        assert_eq!(state, plan);
        assert_eq!(read(&client, resource, &state).await.unwrap(), plan);
        delete(&client, resource, &state).await.unwrap();
    }

    #[tokio::test]
    async fn test_settings_delete_is_noop() {
        let server = MockServer::start().await;
        let catalog = Catalog::awx();
        let resource = catalog.resource("awx_settings_jobs").unwrap();
        delete(&client_for(&server), resource, &State::new())
            .await
            .unwrap();
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_by_name_organization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/labels/"))
            .and(query_param("name__exact", "prod"))
            .and(query_param("organization", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 1,
                "results": [{"id": 5, "name": "prod", "organization": 2}]
            })))
            .mount(&server)
            .await;

        let catalog = Catalog::awx();
        let label = catalog.data_source("awx_label").unwrap();
        let config = obj(json!({"name": "prod", "organization": 2}));
        let state = read_data_source(&client_for(&server), label, &config)
            .await
            .unwrap();
        assert_eq!(state["id"], json!(5));
    }

    #[tokio::test]
    async fn test_lookup_requires_a_group() {
        let server = MockServer::start().await;
        let catalog = Catalog::awx();
        let label = catalog.data_source("awx_label").unwrap();
        let err = read_data_source(&client_for(&server), label, &obj(json!({"name": "prod"})))
            .await
            .unwrap_err();
        assert_eq!(
            err.message(),
            "missing configuration for one of the predefined search groups"
        );
    }

    #[tokio::test]
    async fn test_object_roles() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/organizations/1/object_roles/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 2,
                "results": [
                    {"id": 10, "name": "Admin", "description": "Can manage all aspects"},
                    {"id": 11, "name": "Member", "description": "User is a member"}
                ]
            })))
            .mount(&server)
            .await;

        let catalog = Catalog::awx();
        let roles = catalog.data_source("awx_organization_object_roles").unwrap();
        let state = read_data_source(&client_for(&server), roles, &obj(json!({"id": 1})))
            .await
            .unwrap();
        assert_eq!(state["roles"], json!({"Admin": 10, "Member": 11}));
    }
}
