//! Identity (Keystone v3) Authentication
//!
//! Produces the authenticated provider handle shared by every service client
//! built for one set of credentials.

use crate::client::catalog::ServiceCatalog;
use crate::config::OpenStackConfig;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Header carrying the issued token
pub const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Header carrying the token on service requests
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

// =============================================================================
// Provider Client
// =============================================================================

/// Authenticated session shared by all service clients
pub struct ProviderClient {
    http: reqwest::Client,
    identity_endpoint: String,
    token: String,
    expires_at: Option<DateTime<Utc>>,
    project_id: Option<String>,
    catalog: ServiceCatalog,
}

impl ProviderClient {
    pub fn new(
        http: reqwest::Client,
        identity_endpoint: impl Into<String>,
        token: impl Into<String>,
        catalog: ServiceCatalog,
    ) -> Self {
        Self {
            http,
            identity_endpoint: identity_endpoint.into(),
            token: token.into(),
            expires_at: None,
            project_id: None,
            catalog,
        }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn identity_endpoint(&self) -> &str {
        &self.identity_endpoint
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token has passed its expiry
    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|t| t <= Utc::now()).unwrap_or(false)
    }
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("identity_endpoint", &self.identity_endpoint)
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("project_id", &self.project_id)
            .field("catalog_entries", &self.catalog.entries().len())
            .finish()
    }
}

// =============================================================================
// Token Response
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenEnvelope {
    token: TokenBody,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(default)]
    catalog: ServiceCatalog,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    project: Option<ProjectRef>,
}

#[derive(Debug, Deserialize)]
struct ProjectRef {
    id: String,
}

// =============================================================================
// Authentication
// =============================================================================

/// Authenticate once against Keystone and return the shared provider handle
pub async fn authenticate(config: &OpenStackConfig, user_agent: &str) -> Result<Arc<ProviderClient>> {
    let http = build_http_client(config, user_agent)?;
    let url = token_url(&config.auth_url);
    let body = auth_request_body(config);

    info!("Authenticating against identity service at {}", url);

    let auth_error = |reason: String| Error::Authentication {
        auth_url: config.auth_url.clone(),
        reason,
    };

    let response = http
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|e| auth_error(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(auth_error(format!("{}: {}", status, detail.trim())));
    }

    let token = response
        .headers()
        .get(SUBJECT_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| auth_error(format!("response has no {} header", SUBJECT_TOKEN_HEADER)))?;

    let envelope: TokenEnvelope = response
        .json()
        .await
        .map_err(|e| auth_error(format!("undecodable token body: {}", e)))?;

    debug!(
        "Token issued, expires at {:?}, {} catalog entries",
        envelope.token.expires_at,
        envelope.token.catalog.entries().len()
    );

    let mut client = ProviderClient::new(http, url, token, envelope.token.catalog);
    client.expires_at = envelope.token.expires_at;
    client.project_id = envelope.token.project.map(|p| p.id);

    Ok(Arc::new(client))
}

fn build_http_client(config: &OpenStackConfig, user_agent: &str) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .danger_accept_invalid_certs(config.tls_insecure);

    if let Some(path) = &config.ca_file {
        let pem = std::fs::read(path).map_err(|e| {
            Error::Configuration(format!("cannot read ca-file {}: {}", path.display(), e))
        })?;
        let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
            Error::Configuration(format!("invalid ca-file {}: {}", path.display(), e))
        })?;
        builder = builder.add_root_certificate(cert);
    }

    Ok(builder.build()?)
}

/// Token issue URL for an auth URL with or without the `/v3` suffix
pub fn token_url(auth_url: &str) -> String {
    let base = auth_url.trim_end_matches('/');
    if base.ends_with("/v3") {
        format!("{}/auth/tokens", base)
    } else {
        format!("{}/v3/auth/tokens", base)
    }
}

fn domain_ref(name: Option<&str>, id: Option<&str>) -> Option<Value> {
    match (name, id) {
        (Some(name), _) => Some(json!({ "name": name })),
        (None, Some(id)) => Some(json!({ "id": id })),
        (None, None) => None,
    }
}

/// Keystone v3 token request body
pub fn auth_request_body(config: &OpenStackConfig) -> Value {
    if let (Some(id), Some(secret)) = (
        &config.application_credential_id,
        &config.application_credential_secret,
    ) {
        return json!({
            "auth": {
                "identity": {
                    "methods": ["application_credential"],
                    "application_credential": { "id": id, "secret": secret }
                }
            }
        });
    }

    let password = config.password.clone().unwrap_or_default();
    let user = match &config.user_id {
        Some(user_id) => json!({ "id": user_id, "password": password }),
        None => {
            let mut user = json!({
                "name": config.username.clone().unwrap_or_default(),
                "password": password,
            });
            if let Some(domain) = domain_ref(
                config.effective_user_domain_name(),
                config.domain_id.as_deref(),
            ) {
                user["domain"] = domain;
            }
            user
        }
    };

    let mut body = json!({
        "auth": {
            "identity": {
                "methods": ["password"],
                "password": { "user": user }
            }
        }
    });

    let scope = match (&config.project_id, &config.project_name) {
        (Some(project_id), _) => Some(json!({ "project": { "id": project_id } })),
        (None, Some(project_name)) => {
            let mut project = json!({ "name": project_name });
            if let Some(domain) = domain_ref(
                config.effective_project_domain_name(),
                config.domain_id.as_deref(),
            ) {
                project["domain"] = domain;
            }
            Some(json!({ "project": project }))
        }
        (None, None) => None,
    };

    if let Some(scope) = scope {
        body["auth"]["scope"] = scope;
    }
    body
}
