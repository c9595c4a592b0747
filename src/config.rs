//! Provider configuration: schema, environment fallbacks and validation.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::client::{Auth, ClientConfig};
use crate::helpers::{first_set_env_var, str_to_bool};
use crate::logging::mask;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Constraint, Diagnostic, Schema};

/// Environment variables consulted for `hostname`, in order.
pub const HOST_ENV_VARS: &[&str] = &["TOWER_HOST", "AWX_HOST"];
/// Environment variables consulted for `username`, in order.
pub const USERNAME_ENV_VARS: &[&str] = &["TOWER_USERNAME", "AWX_USERNAME"];
/// Environment variables consulted for `password`, in order.
pub const PASSWORD_ENV_VARS: &[&str] = &["TOWER_PASSWORD", "AWX_PASSWORD"];
/// Environment variables consulted for `token`, in order.
pub const TOKEN_ENV_VARS: &[&str] = &["TOWER_AUTH_TOKEN", "AWX_AUTH_TOKEN"];
/// Environment variables consulted for `verify_ssl`, in order.
pub const VERIFY_SSL_ENV_VARS: &[&str] = &["TOWER_VERIFY_SSL", "AWX_VERIFY_SSL"];

/// Problems with the provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No host was configured or found in the environment.
    #[error("Unknown AWX API Host")]
    MissingHostname,

    /// Neither or both of basic auth and token auth were supplied.
    #[error("must provide one of [\"username\", \"password\"] or \"token\".")]
    AuthMethod,

    /// Basic auth without a username.
    #[error("Unknown AWX API Username")]
    MissingUsername,

    /// Basic auth without a password.
    #[error("Unknown AWX API Password")]
    MissingPassword,

    /// An attribute holds a value of the wrong type.
    #[error("Invalid type for '{attribute}'")]
    InvalidType {
        /// Attribute name.
        attribute: String,
        /// Expected type.
        expected: &'static str,
    },
}

impl ConfigError {
    /// The attribute the error points at, if any.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            ConfigError::MissingHostname => Some("hostname"),
            ConfigError::AuthMethod => None,
            ConfigError::MissingUsername => Some("username"),
            ConfigError::MissingPassword => Some("password"),
            ConfigError::InvalidType { attribute, .. } => Some(attribute),
        }
    }

    fn detail(&self) -> String {
        let unknown = |what: &str, attr: &str, vars: &[&str]| {
            format!(
                "The provider cannot create the AWX API client as there is an unknown configuration value for the AWX API {}. \
                 Set the {} value in the configuration or use the {} environment variable. \
                 If either is already set, ensure the value is not empty.",
                what,
                attr,
                vars.join(" or ")
            )
        };
        match self {
            ConfigError::MissingHostname => unknown("host", "hostname", HOST_ENV_VARS),
            ConfigError::MissingUsername => unknown("username", "username", USERNAME_ENV_VARS),
            ConfigError::MissingPassword => unknown("password", "password", PASSWORD_ENV_VARS),
            ConfigError::AuthMethod => self.to_string(),
            ConfigError::InvalidType { expected, .. } => format!("expected {}", expected),
        }
    }

    /// Convert into an error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.to_string()).with_detail(self.detail());
        match self.attribute() {
            Some(attribute) => diagnostic.with_attribute(attribute),
            None => diagnostic,
        }
    }
}

/// Convert configuration errors into diagnostics.
pub fn config_diagnostics(errors: &[ConfigError]) -> Vec<Diagnostic> {
    errors.iter().map(ConfigError::to_diagnostic).collect()
}

/// The provider configuration block.
pub fn provider_config_schema() -> Schema {
    Schema::v0()
        .with_description("Interact with AWX / Ansible Automation Platform.")
        .with_attribute(
            "hostname",
            Attribute::optional_string().with_description(
                "The AWX Host that we connect to. (defaults to TOWER_HOST/AWX_HOST env variable if set)",
            ),
        )
        .with_attribute(
            "username",
            Attribute::optional_string().with_description(
                "The username to connect to the AWX host. (defaults to TOWER_USERNAME/AWX_USERNAME env variable if set) [must be used with password]",
            ),
        )
        .with_attribute(
            "password",
            Attribute::optional_string().sensitive().with_description(
                "The password to connect to the AWX host. (defaults to TOWER_PASSWORD/AWX_PASSWORD env variable if set) [must be used with username]",
            ),
        )
        .with_attribute(
            "token",
            Attribute::optional_string().sensitive().with_description(
                "The token to use to connect to the AWX host. (defaults to TOWER_AUTH_TOKEN/AWX_AUTH_TOKEN env variable if set) [conflicts with username/password]",
            ),
        )
        .with_attribute(
            "verify_ssl",
            Attribute::new(AttributeType::Bool, AttributeFlags::optional()).with_description(
                "If you are using a self signed certificate this should be set to false (defaults to TOWER_VERIFY_SSL/AWX_VERIFY_SSL env variable if set) [default is true]",
            ),
        )
        .with_constraint(Constraint::also_requires("password", ["username"]))
        .with_constraint(Constraint::conflicts_with("token", ["username", "password"]))
}

/// Resolved provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Base URL of the AWX host.
    pub hostname: String,
    /// Credentials.
    pub auth: Auth,
    /// Verify TLS certificates.
    pub verify_ssl: bool,
}

#[derive(Debug, Default)]
struct RawConfig {
    hostname: Option<String>,
    username: Option<String>,
    password: Option<String>,
    token: Option<String>,
    verify_ssl: Option<bool>,
}

impl ProviderConfig {
    /// Resolve the configuration block, falling back to the process environment.
    pub fn from_value(config: &Value) -> Result<Self, Vec<ConfigError>> {
        Self::from_value_with_env(config, |name| std::env::var(name).ok())
    }

    /// Resolve the configuration block, consulting `lookup` for unset attributes.
    pub fn from_value_with_env<F>(config: &Value, lookup: F) -> Result<Self, Vec<ConfigError>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let empty = Map::new();
        let obj = config.as_object().unwrap_or(&empty);
        let mut errors = Vec::new();

        let mut raw = RawConfig {
            hostname: string_attr(obj, "hostname", &mut errors),
            username: string_attr(obj, "username", &mut errors),
            password: string_attr(obj, "password", &mut errors),
            token: string_attr(obj, "token", &mut errors),
            verify_ssl: bool_attr(obj, "verify_ssl", &mut errors),
        };
        if !errors.is_empty() {
            return Err(errors);
        }

        apply_environment(&mut raw, &lookup);
        if raw.verify_ssl.is_none() {
            raw.verify_ssl = Some(true);
            debug!(verify_ssl = true, "Defaults configured for provider");
        }

        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        let has_hostname = filled(&raw.hostname);
        let has_token = filled(&raw.token);
        let has_username = filled(&raw.username);
        let has_password = filled(&raw.password);
        let has_basic = has_username || has_password;

        if !has_hostname {
            errors.push(ConfigError::MissingHostname);
        }
        if has_token == has_basic {
            errors.push(ConfigError::AuthMethod);
        } else if has_basic {
            if !has_username {
                errors.push(ConfigError::MissingUsername);
            }
            if !has_password {
                errors.push(ConfigError::MissingPassword);
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let auth = match (raw.username, raw.password, raw.token) {
            (Some(username), Some(password), _) if has_basic => Auth::Basic { username, password },
            (_, _, Some(token)) => Auth::Token(token),
            _ => return Err(vec![ConfigError::AuthMethod]),
        };

        Ok(Self {
            hostname: raw.hostname.unwrap_or_default(),
            auth,
            verify_ssl: raw.verify_ssl.unwrap_or(true),
        })
    }

    /// Settings for the REST client.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.hostname.clone(), self.auth.clone()).with_verify_ssl(self.verify_ssl)
    }
}

fn string_attr(
    obj: &Map<String, Value>,
    name: &str,
    errors: &mut Vec<ConfigError>,
) -> Option<String> {
    match obj.get(name) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(ConfigError::InvalidType {
                attribute: name.to_string(),
                expected: "string",
            });
            None
        },
    }
}

fn bool_attr(obj: &Map<String, Value>, name: &str, errors: &mut Vec<ConfigError>) -> Option<bool> {
    match obj.get(name) {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => {
            errors.push(ConfigError::InvalidType {
                attribute: name.to_string(),
                expected: "bool",
            });
            None
        },
    }
}

fn apply_environment<F>(raw: &mut RawConfig, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    if raw.hostname.is_none() {
        if let Some(val) = first_set_env_var(lookup, HOST_ENV_VARS) {
            debug!(hostname = %val, "Provider configuration from the environment");
            raw.hostname = Some(val);
        }
    }
    if raw.username.is_none() {
        if let Some(val) = first_set_env_var(lookup, USERNAME_ENV_VARS) {
            debug!(username = %val, "Provider configuration from the environment");
            raw.username = Some(val);
        }
    }
    if raw.password.is_none() {
        if let Some(val) = first_set_env_var(lookup, PASSWORD_ENV_VARS) {
            debug!(password = %mask(&val), "Provider configuration from the environment");
            raw.password = Some(val);
        }
    }
    if raw.token.is_none() {
        if let Some(val) = first_set_env_var(lookup, TOKEN_ENV_VARS) {
            debug!(token = %mask(&val), "Provider configuration from the environment");
            raw.token = Some(val);
        }
    }
    if raw.verify_ssl.is_none() {
        if let Some(val) = first_set_env_var(lookup, VERIFY_SSL_ENV_VARS) {
            debug!(verify_ssl = %val, "Provider configuration from the environment");
            raw.verify_ssl = Some(str_to_bool(&val));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;
    use std::collections::HashMap;

    fn env(vars: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<&'static str, &'static str> = vars.iter().copied().collect();
        move |name| vars.get(name).map(|v| v.to_string())
    }

    #[test]
    fn test_basic_auth_from_config() {
        let config = json!({
            "hostname": "https://awx.example.com",
            "username": "admin",
            "password": "password",
        });
        let resolved = ProviderConfig::from_value_with_env(&config, env(&[])).unwrap();
        assert_eq!(resolved.hostname, "https://awx.example.com");
        assert_eq!(
            resolved.auth,
            Auth::Basic {
                username: "admin".to_string(),
                password: "password".to_string()
            }
        );
        assert!(resolved.verify_ssl);
    }

    #[test]
    fn test_environment_fills_unset_attributes_only() {
        let config = json!({"hostname": "https://config", "verify_ssl": true});
        let lookup = env(&[
            ("TOWER_HOST", "https://tower"),
            ("AWX_HOST", "https://awx"),
            ("AWX_AUTH_TOKEN", "token"),
            ("TOWER_VERIFY_SSL", "false"),
        ]);
        let resolved = ProviderConfig::from_value_with_env(&config, lookup).unwrap();
        assert_eq!(resolved.hostname, "https://config");
        assert_eq!(resolved.auth, Auth::Token("token".to_string()));
        assert!(resolved.verify_ssl);
    }

    #[test]
    fn test_environment_first_set_wins() {
        let lookup = env(&[
            ("TOWER_HOST", ""),
            ("AWX_HOST", "https://awx"),
            ("TOWER_USERNAME", "tower"),
            ("AWX_USERNAME", "awx"),
            ("AWX_PASSWORD", "pw"),
            ("AWX_VERIFY_SSL", "0"),
        ]);
        let resolved = ProviderConfig::from_value_with_env(&json!({}), lookup).unwrap();
        assert_eq!(resolved.hostname, "https://awx");
        assert_eq!(
            resolved.auth,
            Auth::Basic {
                username: "tower".to_string(),
                password: "pw".to_string()
            }
        );
        assert!(!resolved.verify_ssl);
    }

    #[test]
    fn test_missing_everything() {
        let errors = ProviderConfig::from_value_with_env(&json!({}), env(&[])).unwrap_err();
        assert_eq!(errors, vec![ConfigError::MissingHostname, ConfigError::AuthMethod]);

        let diagnostics = config_diagnostics(&errors);
        assert_eq!(diagnostics[0].summary, "Unknown AWX API Host");
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("hostname"));
        assert!(diagnostics[0].detail.as_deref().unwrap().contains("TOWER_HOST or AWX_HOST"));
        assert_eq!(
            diagnostics[1].summary,
            r#"must provide one of ["username", "password"] or "token"."#
        );
        assert!(diagnostics[1].attribute.is_none());
    }

    #[test]
    fn test_both_auth_methods() {
        let config = json!({
            "hostname": "https://awx",
            "username": "admin",
            "password": "pw",
            "token": "t",
        });
        let errors = ProviderConfig::from_value_with_env(&config, env(&[])).unwrap_err();
        assert_eq!(errors, vec![ConfigError::AuthMethod]);
    }

    #[test]
    fn test_partial_basic_auth() {
        let config = json!({"hostname": "https://awx", "username": "admin"});
        let errors = ProviderConfig::from_value_with_env(&config, env(&[])).unwrap_err();
        assert_eq!(errors, vec![ConfigError::MissingPassword]);

        let config = json!({"hostname": "https://awx", "password": "pw"});
        let errors = ProviderConfig::from_value_with_env(&config, env(&[])).unwrap_err();
        assert_eq!(errors, vec![ConfigError::MissingUsername]);
    }

    #[test]
    fn test_wrong_types() {
        let config = json!({"hostname": 1, "verify_ssl": "yes"});
        let errors = ProviderConfig::from_value_with_env(&config, env(&[])).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].attribute(), Some("hostname"));
        assert_eq!(errors[1].attribute(), Some("verify_ssl"));
    }

    #[test]
    fn test_schema_constraints() {
        let schema = provider_config_schema();
        assert!(schema.attributes["password"].flags.sensitive);
        assert!(schema.attributes["token"].flags.sensitive);

        let diagnostics = validate(&schema, &json!({"password": "pw"}));
        assert!(diagnostics.iter().any(|d| d.attribute.as_deref() == Some("password")));

        let diagnostics = validate(&schema, &json!({"token": "t", "username": "admin"}));
        assert!(!diagnostics.is_empty());

        assert!(validate(&schema, &json!({"hostname": "https://awx", "token": "t"})).is_empty());
    }

    #[test]
    fn test_client_config() {
        let config = ProviderConfig {
            hostname: "https://awx".to_string(),
            auth: Auth::Token("t".to_string()),
            verify_ssl: false,
        };
        let client = config.client_config();
        assert!(!client.verify_ssl);
        assert_eq!(client.hostname, "https://awx");
    }
}
