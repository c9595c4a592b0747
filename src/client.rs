//! HTTP client for the AWX REST API.
//!
//! A thin wrapper over `reqwest`: every call sends and receives JSON, joins the
//! endpoint onto the configured host and turns non-2xx answers into
//! [`ApiError::Status`] carrying the status code, request URI and payload.

use std::fmt;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Url};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::ProviderError;
use crate::helpers::extract_data_if_search_result;
use crate::logging::MASK;

/// Endpoint returning the authenticated user.
pub const ME_ENDPOINT: &str = "/api/v2/me/";

/// Default `User-Agent` sent with every request.
pub fn default_user_agent() -> String {
    format!("hemmer-provider-awx/{}", env!("CARGO_PKG_VERSION"))
}

/// Errors returned by [`AwxClient`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("invalid status code: {status}, on {uri} with {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request path and query.
        uri: String,
        /// Raw response payload.
        body: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("failed to do request: {0}")]
    Request(#[from] reqwest::Error),

    /// A 2xx response carried a body that is not JSON.
    #[error("failed to decode data from {uri}: {source}")]
    Decode {
        /// Request path and query.
        uri: String,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The host or endpoint does not form a valid URL.
    #[error("invalid url: {0}")]
    Url(String),
}

/// How requests authenticate.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// HTTP basic authentication.
    Basic {
        /// Account name.
        username: String,
        /// Account password.
        password: String,
    },
    /// OAuth2 bearer token.
    Token(String),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &MASK)
                .finish(),
            Auth::Token(_) => f.debug_tuple("Token").field(&MASK).finish(),
        }
    }
}

/// Settings used to build an [`AwxClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the AWX host, e.g. `https://awx.example.com`.
    pub hostname: String,
    /// Credentials.
    pub auth: Auth,
    /// Reject invalid TLS certificates when true.
    pub verify_ssl: bool,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Per-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    /// Create a config with certificate verification on and the default user agent.
    pub fn new(hostname: impl Into<String>, auth: Auth) -> Self {
        Self {
            hostname: hostname.into(),
            auth,
            verify_ssl: true,
            user_agent: default_user_agent(),
            timeout: None,
        }
    }

    /// Set whether TLS certificates are verified.
    pub fn with_verify_ssl(mut self, verify_ssl: bool) -> Self {
        self.verify_ssl = verify_ssl;
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Client for one AWX host.
#[derive(Debug)]
pub struct AwxClient {
    http: reqwest::Client,
    hostname: String,
    auth: Auth,
    current_user: OnceCell<Value>,
}

impl AwxClient {
    /// Build a client from `config`.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let hostname = config.hostname.trim_end_matches('/').to_string();
        Url::parse(&hostname).map_err(|e| ApiError::Url(format!("{}: {}", hostname, e)))?;

        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .danger_accept_invalid_certs(!config.verify_ssl);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            hostname,
            auth: config.auth,
            current_user: OnceCell::new(),
        })
    }

    /// The host this client talks to.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Send a request and decode the JSON answer.
    ///
    /// An empty response body decodes to `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        self.request_with_query(method, endpoint, &[], body).await
    }

    /// Like [`AwxClient::request`], appending `query` to the URL.
    pub async fn request_with_query(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self.url(endpoint, query)?;
        let uri = match url.query() {
            Some(q) => format!("{}?{}", url.path(), q),
            None => url.path().to_string(),
        };

        debug!(method = %method, uri = %uri, has_body = body.is_some(), "Making a request");

        let mut request = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");
        request = match &self.auth {
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
            Auth::Token(token) => request.bearer_auth(token),
        };
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let payload = response.bytes().await?;

        if !status.is_success() {
            debug!(status = status.as_u16(), uri = %uri, "Request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                uri,
                body: String::from_utf8_lossy(&payload).into_owned(),
            });
        }

        if payload.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&payload).map_err(|source| ApiError::Decode { uri, source })
    }

    /// The authenticated user, fetched once and cached.
    pub async fn current_user(&self) -> Result<Value, ProviderError> {
        let user = self
            .current_user
            .get_or_try_init(|| async {
                let data = self.request(Method::GET, ME_ENDPOINT, None).await?;
                extract_data_if_search_result(data)
            })
            .await?;
        Ok(user.clone())
    }

    fn url(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let raw = format!("{}/{}", self.hostname, endpoint.trim_start_matches('/'));
        let mut url = Url::parse(&raw).map_err(|e| ApiError::Url(format!("{}: {}", raw, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        Ok(url)
    }
}
