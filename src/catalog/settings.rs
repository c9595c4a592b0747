//! Settings singletons and the current-user data source.
//!
//! The settings API keys every value in upper case; state uses the lower-case form.

use serde_json::json;

use super::{
    DataSourceDefinition, FieldDefinition, FieldKind, FieldRole, ResourceDefinition, SecretKind,
};
use crate::client::ME_ENDPOINT;

fn setting(name: &str, kind: FieldKind) -> FieldDefinition {
    FieldDefinition::new(name, kind, FieldRole::Optional).api_name(name.to_ascii_uppercase())
}

fn read_only_setting(name: &str) -> FieldDefinition {
    FieldDefinition::read_only(name).api_name(name.to_ascii_uppercase())
}

pub(super) fn resources() -> Vec<ResourceDefinition> {
    vec![
        auth_azuread_oauth2(),
        auth_github(),
        auth_github_variant("org", "Org", &["name"]),
        auth_github_variant("team", "Team", &["id"]),
        auth_github_variant("enterprise", "Enterprise", &["url", "api_url"]),
        auth_github_variant("enterprise_org", "EnterpriseOrg", &["url", "api_url", "name"]),
        auth_github_variant("enterprise_team", "EnterpriseTeam", &["url", "api_url", "id"]),
        auth_google_oauth2(),
        auth_ldap(),
        auth_saml(),
        jobs(),
    ]
}

pub(super) fn data_sources() -> Vec<DataSourceDefinition> {
    vec![me()]
}

fn auth_github() -> ResourceDefinition {
    ResourceDefinition::settings(
        "settings_auth_github",
        "SettingsAuthGithub",
        "/api/v2/settings/github/",
        vec![
            read_only_setting("social_auth_github_callback_url").describe(
                "Provide this URL as the callback URL for your application as part of your registration process.",
            ),
            setting("social_auth_github_key", FieldKind::String)
                .describe("The OAuth2 key (Client ID) from your GitHub developer application."),
            setting("social_auth_github_secret", FieldKind::String)
                .secret(SecretKind::Scalar)
                .describe(
                    "The OAuth2 secret (Client Secret) from your GitHub developer application.",
                ),
            setting("social_auth_github_organization_map", FieldKind::Json)
                .describe("Mapping to organization admins/users from social auth accounts."),
            setting("social_auth_github_team_map", FieldKind::Json)
                .describe("Mapping of team members (users) from social auth accounts."),
        ],
    )
}

/// The OAuth2 client settings shared by every social login backend.
fn social_oauth2(prefix: &str) -> Vec<FieldDefinition> {
    vec![
        read_only_setting(&format!("{}_callback_url", prefix)).describe(
            "Provide this URL as the callback URL for your application as part of your registration process.",
        ),
        setting(&format!("{}_key", prefix), FieldKind::String)
            .describe("The OAuth2 key (Client ID) from your application."),
        setting(&format!("{}_secret", prefix), FieldKind::String)
            .secret(SecretKind::Scalar)
            .describe("The OAuth2 secret (Client Secret) from your application."),
        setting(&format!("{}_organization_map", prefix), FieldKind::Json)
            .describe("Mapping to organization admins/users from social auth accounts."),
        setting(&format!("{}_team_map", prefix), FieldKind::Json)
            .describe("Mapping of team members (users) from social auth accounts."),
    ]
}

/// GitHub organization, team and enterprise logins, e.g. `/api/v2/settings/github-org/`.
fn auth_github_variant(variant: &str, display_suffix: &str, extra: &[&str]) -> ResourceDefinition {
    let prefix = format!("social_auth_github_{}", variant);
    let mut fields = social_oauth2(&prefix);
    for name in extra {
        fields.push(setting(&format!("{}_{}", prefix, name), FieldKind::String));
    }
    ResourceDefinition::settings(
        &format!("settings_auth_github_{}", variant),
        format!("SettingsAuthGithub{}", display_suffix),
        &format!("/api/v2/settings/github-{}/", variant.replace('_', "-")),
        fields,
    )
}

fn auth_azuread_oauth2() -> ResourceDefinition {
    ResourceDefinition::settings(
        "settings_auth_azuread_oauth2",
        "SettingsAuthAzureADOauth2",
        "/api/v2/settings/azuread-oauth2/",
        social_oauth2("social_auth_azuread_oauth2"),
    )
}

/// LDAP settings for the default server and the five numbered extra servers.
fn auth_ldap() -> ResourceDefinition {
    let prefixes = std::iter::once("auth_ldap".to_string())
        .chain((1..=5).map(|n| format!("auth_ldap_{}", n)));
    let mut fields = Vec::new();
    for prefix in prefixes {
        fields.extend([
            setting(&format!("{}_server_uri", prefix), FieldKind::String).describe(
                "URI to connect to LDAP server, such as \"ldap://ldap.example.com:389\".",
            ),
            setting(&format!("{}_bind_dn", prefix), FieldKind::String)
                .describe("DN (Distinguished Name) of user to bind for all search queries."),
            setting(&format!("{}_bind_password", prefix), FieldKind::String)
                .secret(SecretKind::Scalar)
                .describe("Password used to bind LDAP user account."),
            setting(&format!("{}_start_tls", prefix), FieldKind::Bool)
                .describe("Whether to enable TLS when the LDAP connection is not using SSL."),
            setting(&format!("{}_connection_options", prefix), FieldKind::Json),
            setting(&format!("{}_user_search", prefix), FieldKind::StringList),
            setting(&format!("{}_user_dn_template", prefix), FieldKind::String),
            setting(&format!("{}_user_attr_map", prefix), FieldKind::Json),
            setting(&format!("{}_group_search", prefix), FieldKind::StringList),
            setting(&format!("{}_group_type", prefix), FieldKind::String),
            setting(&format!("{}_group_type_params", prefix), FieldKind::Json),
            setting(&format!("{}_require_group", prefix), FieldKind::String),
            setting(&format!("{}_deny_group", prefix), FieldKind::String),
            setting(&format!("{}_user_flags_by_group", prefix), FieldKind::Json),
            setting(&format!("{}_organization_map", prefix), FieldKind::Json),
            setting(&format!("{}_team_map", prefix), FieldKind::Json),
        ]);
    }
    ResourceDefinition::settings(
        "settings_auth_ldap",
        "SettingsAuthLDAP",
        "/api/v2/settings/ldap/",
        fields,
    )
}

fn auth_saml() -> ResourceDefinition {
    ResourceDefinition::settings(
        "settings_auth_saml",
        "SettingsAuthSAML",
        "/api/v2/settings/saml/",
        vec![
            setting("saml_auto_create_objects", FieldKind::Bool).describe(
                "When enabled (the default), mapped Organizations and Teams will be created automatically on successful SAML login.",
            ),
            read_only_setting("social_auth_saml_callback_url"),
            read_only_setting("social_auth_saml_metadata_url"),
            setting("social_auth_saml_sp_entity_id", FieldKind::String),
            setting("social_auth_saml_sp_public_cert", FieldKind::String),
            setting("social_auth_saml_sp_private_key", FieldKind::String)
                .secret(SecretKind::Scalar)
                .describe(
                    "Create a keypair to use as a service provider (SP) and include the private key content here.",
                ),
            setting("social_auth_saml_org_info", FieldKind::Json),
            setting("social_auth_saml_technical_contact", FieldKind::Json),
            setting("social_auth_saml_support_contact", FieldKind::Json),
            setting("social_auth_saml_enabled_idps", FieldKind::Json),
            setting("social_auth_saml_security_config", FieldKind::Json),
            setting("social_auth_saml_sp_extra", FieldKind::Json),
            setting("social_auth_saml_extra_data", FieldKind::StringList),
            setting("social_auth_saml_organization_map", FieldKind::Json),
            setting("social_auth_saml_team_map", FieldKind::Json),
            setting("social_auth_saml_organization_attr", FieldKind::Json),
            setting("social_auth_saml_team_attr", FieldKind::Json),
            setting("social_auth_saml_user_flags_by_attr", FieldKind::Json),
        ],
    )
}

fn auth_google_oauth2() -> ResourceDefinition {
    ResourceDefinition::settings(
        "settings_auth_google_oauth2",
        "SettingsAuthGoogleOauth2",
        "/api/v2/settings/google-oauth2/",
        vec![
            setting("social_auth_google_oauth2_auth_extra_arguments", FieldKind::Json)
                .default_value(json!("{}"))
                .describe("Extra arguments for Google OAuth2 login."),
            read_only_setting("social_auth_google_oauth2_callback_url"),
            setting("social_auth_google_oauth2_key", FieldKind::String)
                .describe("The OAuth2 key from your web application."),
            setting("social_auth_google_oauth2_secret", FieldKind::String)
                .secret(SecretKind::Scalar)
                .describe("The OAuth2 secret from your web application."),
            setting("social_auth_google_oauth2_organization_map", FieldKind::Json),
            setting("social_auth_google_oauth2_team_map", FieldKind::Json),
            setting("social_auth_google_oauth2_whitelisted_domains", FieldKind::StringList)
                .describe(
                    "Update this setting to restrict the domains who are allowed to login using Google OAuth2.",
                ),
        ],
    )
}

fn jobs() -> ResourceDefinition {
    ResourceDefinition::settings(
        "settings_jobs",
        "SettingsJobs",
        "/api/v2/settings/jobs/",
        vec![
            setting("ad_hoc_commands", FieldKind::StringList)
                .describe("List of modules allowed to be used by ad-hoc jobs."),
            setting("allow_jinja_in_extra_vars", FieldKind::String)
                .one_of(["always", "never", "template"]),
            setting("ansible_fact_cache_timeout", FieldKind::Int64),
            setting("awx_ansible_callback_plugins", FieldKind::StringList),
            setting("awx_collections_enabled", FieldKind::Bool),
            setting("awx_isolation_base_path", FieldKind::String),
            setting("awx_isolation_show_paths", FieldKind::StringList),
            setting("awx_mount_isolated_paths_on_k8s", FieldKind::Bool),
            setting("awx_roles_enabled", FieldKind::Bool),
            setting("awx_show_playbook_links", FieldKind::Bool),
            setting("awx_task_env", FieldKind::Json).describe(
                "Additional environment variables set for playbook runs, inventory updates, project updates, and notification sending.",
            ),
            setting("default_inventory_update_timeout", FieldKind::Int64),
            setting("default_job_idle_timeout", FieldKind::Int64),
            setting("default_job_timeout", FieldKind::Int64).describe(
                "Maximum time in seconds to allow jobs to run. Use value of 0 to indicate that no timeout should be imposed.",
            ),
            setting("default_project_update_timeout", FieldKind::Int64),
            setting("event_stdout_max_bytes_display", FieldKind::Int64),
            setting("galaxy_ignore_certs", FieldKind::Bool),
            setting("galaxy_task_env", FieldKind::Json),
            setting("max_forks", FieldKind::Int64),
            setting("max_websocket_event_rate", FieldKind::Int64),
            setting("project_update_vvv", FieldKind::Bool),
            setting("schedule_max_jobs", FieldKind::Int64),
            setting("stdout_max_bytes_display", FieldKind::Int64),
        ],
    )
}

fn me() -> DataSourceDefinition {
    DataSourceDefinition::singleton(
        "me",
        "Me",
        ME_ENDPOINT,
        vec![
            FieldDefinition::read_only("id")
                .kind(FieldKind::Int64)
                .describe("Database ID for this user."),
            FieldDefinition::read_only("username"),
            FieldDefinition::read_only("first_name"),
            FieldDefinition::read_only("last_name"),
            FieldDefinition::read_only("email"),
            FieldDefinition::read_only("is_superuser").kind(FieldKind::Bool),
            FieldDefinition::read_only("is_system_auditor").kind(FieldKind::Bool),
            FieldDefinition::read_only("ldap_dn"),
            FieldDefinition::read_only("last_login"),
            FieldDefinition::read_only("external_account"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DataSourceKind, ResourceKind};

    #[test]
    fn test_settings_keys_are_upper_case() {
        for resource in resources() {
            assert!(matches!(resource.kind, ResourceKind::Settings { .. }));
            for field in &resource.fields {
                assert_eq!(field.api_name, field.name.to_ascii_uppercase());
            }
        }
    }

    #[test]
    fn test_google_secret_is_scalar() {
        let google = auth_google_oauth2();
        let secret = google.field("social_auth_google_oauth2_secret").unwrap();
        assert_eq!(secret.secret, Some(SecretKind::Scalar));
        let callback = google.field("social_auth_google_oauth2_callback_url").unwrap();
        assert!(!callback.is_writable());
    }

    #[test]
    fn test_ldap_bind_passwords_are_scalar_secrets() {
        let ldap = auth_ldap();
        for name in [
            "auth_ldap_bind_password",
            "auth_ldap_1_bind_password",
            "auth_ldap_3_bind_password",
            "auth_ldap_5_bind_password",
        ] {
            let field = ldap.field(name).unwrap();
            assert_eq!(field.secret, Some(SecretKind::Scalar), "{name}");
        }
        assert!(ldap.field("auth_ldap_6_bind_password").is_none());
        assert_eq!(ldap.fields.len(), 6 * 16);
    }

    #[test]
    fn test_github_variants() {
        let enterprise_team = auth_github_variant("enterprise_team", "EnterpriseTeam", &["id"]);
        assert_eq!(enterprise_team.type_name, "awx_settings_auth_github_enterprise_team");
        assert_eq!(
            enterprise_team.kind,
            ResourceKind::Settings {
                endpoint: "/api/v2/settings/github-enterprise-team/".to_string()
            }
        );
        let secret = enterprise_team.field("social_auth_github_enterprise_team_secret").unwrap();
        assert_eq!(secret.api_name, "SOCIAL_AUTH_GITHUB_ENTERPRISE_TEAM_SECRET");
        assert_eq!(secret.secret, Some(SecretKind::Scalar));
        assert!(enterprise_team.field("social_auth_github_enterprise_team_id").is_some());
    }

    #[test]
    fn test_saml_private_key_is_secret() {
        let saml = auth_saml();
        let key = saml.field("social_auth_saml_sp_private_key").unwrap();
        assert_eq!(key.secret, Some(SecretKind::Scalar));
        assert_eq!(key.api_name, "SOCIAL_AUTH_SAML_SP_PRIVATE_KEY");
        assert!(!saml.field("social_auth_saml_callback_url").unwrap().is_writable());
    }

    #[test]
    fn test_me_reads_fixed_endpoint() {
        let me = me();
        assert_eq!(me.type_name, "awx_me");
        assert_eq!(
            me.kind,
            DataSourceKind::Singleton {
                endpoint: "/api/v2/me/".to_string()
            }
        );
    }
}
