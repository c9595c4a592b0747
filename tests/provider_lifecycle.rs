//! End-to-end lifecycles against a mocked AWX API.

use hemmer_provider_awx::testing::{
    assert_plan_changes_attribute, assert_plan_no_changes, ProviderTester,
};
use hemmer_provider_awx::{Auth, AwxClient, AwxProvider, ClientConfig, ProviderError};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONFIGURED_INPUTS: &str = r#"{ "username": "root", "password": "hunter2" }"#;

fn tester(server: &MockServer) -> ProviderTester<AwxProvider> {
    let auth = Auth::Basic {
        username: "admin".to_string(),
        password: "password".to_string(),
    };
    let client = AwxClient::new(ClientConfig::new(server.uri(), auth)).unwrap();
    ProviderTester::new(AwxProvider::with_client(client))
}

fn credential(username: &str) -> Value {
    json!({
        "id": 42,
        "type": "credential",
        "name": "ssh",
        "description": "",
        "credential_type": 1,
        "organization": null,
        "inputs": {"username": username, "password": "$encrypted$"},
        "cloud": false,
        "kind": "ssh",
        "kubernetes": false,
        "managed": false,
    })
}

fn inputs(state: &Value) -> Value {
    serde_json::from_str(state["inputs"].as_str().unwrap()).unwrap()
}

fn config() -> Value {
    json!({"name": "ssh", "credential_type": 1, "inputs": CONFIGURED_INPUTS})
}

#[tokio::test]
async fn test_credential_secrets_survive_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/credentials/"))
        .and(body_partial_json(json!({
            "name": "ssh",
            "credential_type": 1,
            "inputs": {"username": "root", "password": "hunter2"},
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(credential("root")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/credentials/42/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(credential("root")))
        .mount(&server)
        .await;

    let tester = tester(&server);
    let state = tester.lifecycle_create("awx_credential", config()).await.unwrap();

    assert_eq!(state["id"], json!(42));
    assert_eq!(state["kind"], json!("ssh"));
    assert_eq!(inputs(&state), json!({"username": "root", "password": "hunter2"}));

    let plan = tester
        .plan("awx_credential", Some(state), config(), config())
        .await
        .unwrap();
    assert_plan_no_changes(&plan);
}

#[tokio::test]
async fn test_credential_refresh_picks_up_server_changes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/credentials/42/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(credential("admin")))
        .mount(&server)
        .await;

    let tester = tester(&server);
    let prior = json!({
        "id": 42, "name": "ssh", "description": "", "credential_type": 1,
        "organization": null, "inputs": r#"{"password":"hunter2","username":"root"}"#,
    });
    let state = tester.read("awx_credential", prior).await.unwrap();
    assert_eq!(inputs(&state), json!({"username": "admin", "password": "hunter2"}));

    let plan = tester
        .plan("awx_credential", Some(state), config(), config())
        .await
        .unwrap();
    assert_plan_changes_attribute(&plan, "inputs");
}

#[tokio::test]
async fn test_credential_update_keeps_new_secret() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v2/credentials/42/"))
        .and(body_partial_json(json!({"inputs": {"password": "rotated"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(credential("root")))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server);
    let prior = json!({
        "id": 42, "name": "ssh", "description": "", "credential_type": 1,
        "organization": null, "inputs": r#"{"password":"hunter2","username":"root"}"#,
    });
    let planned = json!({
        "id": 42, "name": "ssh", "description": "", "credential_type": 1,
        "organization": null, "inputs": r#"{"password":"rotated","username":"root"}"#,
    });
    let state = tester.update("awx_credential", prior, planned).await.unwrap();

    assert_eq!(inputs(&state), json!({"username": "root", "password": "rotated"}));
    assert_eq!(state["managed"], json!(false));
}

#[tokio::test]
async fn test_credential_import_keeps_placeholders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/credentials/42/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(credential("root")))
        .mount(&server)
        .await;

    let tester = tester(&server);
    let state = tester.import_single("awx_credential", "42").await.unwrap();
    assert_eq!(inputs(&state), json!({"username": "root", "password": "$encrypted$"}));

    let err = tester.import_single("awx_credential", "ssh").await.unwrap_err();
    assert!(err
        .to_string()
        .contains("please provide the ID for the Credential"));
}

#[tokio::test]
async fn test_credential_delete_and_missing_object() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v2/credentials/42/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/credentials/43/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
        .mount(&server)
        .await;

    let tester = tester(&server);
    tester
        .lifecycle_delete("awx_credential", json!({"id": 42, "name": "ssh"}))
        .await
        .unwrap();

    let err = tester
        .read("awx_credential", json!({"id": 43, "name": "gone"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::NotFound(_)));
}

#[tokio::test]
async fn test_settings_secret_is_restored() {
    let server = MockServer::start().await;
    let response = json!({
        "SOCIAL_AUTH_GITHUB_CALLBACK_URL": "https://awx.example.com/sso/complete/github/",
        "SOCIAL_AUTH_GITHUB_KEY": "client-id",
        "SOCIAL_AUTH_GITHUB_SECRET": "$encrypted$",
        "SOCIAL_AUTH_GITHUB_ORGANIZATION_MAP": null,
        "SOCIAL_AUTH_GITHUB_TEAM_MAP": null,
    });
    Mock::given(method("PATCH"))
        .and(path("/api/v2/settings/github/"))
        .and(body_partial_json(json!({"SOCIAL_AUTH_GITHUB_SECRET": "s3cr3t"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(response.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/settings/github/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(&server)
        .await;

    let tester = tester(&server);
    let state = tester
        .lifecycle_create(
            "awx_settings_auth_github",
            json!({
                "social_auth_github_key": "client-id",
                "social_auth_github_secret": "s3cr3t",
            }),
        )
        .await
        .unwrap();

    assert_eq!(state["social_auth_github_secret"], json!("s3cr3t"));
    assert_eq!(
        state["social_auth_github_callback_url"],
        json!("https://awx.example.com/sso/complete/github/")
    );
    tester
        .lifecycle_delete("awx_settings_auth_github", state)
        .await
        .unwrap();
}

fn application(client_secret: &str) -> Value {
    json!({
        "id": 7,
        "type": "o_auth2_application",
        "name": "ci",
        "description": "",
        "organization": 1,
        "authorization_grant_type": "password",
        "client_type": "confidential",
        "redirect_uris": "",
        "skip_authorization": false,
        "client_id": "AbCdEf",
        "client_secret": client_secret,
    })
}

fn application_config() -> Value {
    json!({
        "name": "ci",
        "organization": 1,
        "authorization_grant_type": "password",
        "client_type": "confidential",
    })
}

#[tokio::test]
async fn test_application_client_secret_is_kept_after_create() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/applications/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(application("generated-secret")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/applications/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(application("$encrypted$")))
        .mount(&server)
        .await;

    let tester = tester(&server);
    let state = tester
        .lifecycle_create("awx_application", application_config())
        .await
        .unwrap();

    assert_eq!(state["client_id"], json!("AbCdEf"));
    assert_eq!(state["client_secret"], json!("generated-secret"));

    let refreshed = tester.read("awx_application", state).await.unwrap();
    assert_eq!(refreshed["client_secret"], json!("generated-secret"));

    let plan = tester
        .plan(
            "awx_application",
            Some(refreshed),
            application_config(),
            application_config(),
        )
        .await
        .unwrap();
    assert_plan_no_changes(&plan);
}

#[tokio::test]
async fn test_application_update_keeps_client_secret() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v2/applications/7/"))
        .and(body_partial_json(json!({"name": "deploy"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(application("$encrypted$")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/applications/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(application("$encrypted$")))
        .mount(&server)
        .await;

    let tester = tester(&server);
    let mut prior = application("generated-secret");
    prior.as_object_mut().unwrap().remove("type");
    let mut proposed = application_config();
    proposed["name"] = json!("deploy");

    let state = tester
        .lifecycle_update("awx_application", prior, proposed)
        .await
        .unwrap();
    assert_eq!(state["client_secret"], json!("generated-secret"));
}
