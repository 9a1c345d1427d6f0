//! Auto-healer Configuration
//!
//! YAML configuration consumed read-only by the cloud provider bootstrap.
//! The `openstack` section carries the identity credentials and the
//! endpoint selection (region, endpoint type) used for every service client.

use crate::client::Availability;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

// =============================================================================
// Top-level Configuration
// =============================================================================

/// Configuration for the auto-healer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Name of the cloud backend to instantiate
    pub cloud_provider: String,
    /// Cluster the healer is responsible for
    pub cluster_name: String,
    /// Log remediation decisions without acting on them
    pub dry_run: bool,
    /// Path to a kubeconfig, in-cluster config is used when empty
    pub kubeconfig: Option<PathBuf>,
    /// Monitor control plane nodes
    pub master_monitor_enabled: bool,
    /// Monitor worker nodes
    pub worker_monitor_enabled: bool,
    /// Seconds between health check passes
    pub monitor_interval_secs: u64,
    /// OpenStack credentials and endpoint selection
    pub openstack: OpenStackConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cloud_provider: "openstack".to_string(),
            cluster_name: String::new(),
            dry_run: false,
            kubeconfig: None,
            master_monitor_enabled: true,
            worker_monitor_enabled: true,
            monitor_interval_secs: 60,
            openstack: OpenStackConfig::default(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());

        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&raw)?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML document
    pub fn from_yaml(raw: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.cloud_provider.trim().is_empty() {
            return Err(Error::Configuration("cloud-provider must not be empty".into()));
        }
        if self.monitor_interval_secs == 0 {
            return Err(Error::Configuration(
                "monitor-interval-secs must be greater than zero".into(),
            ));
        }
        self.openstack.validate()
    }
}

// =============================================================================
// OpenStack Configuration
// =============================================================================

/// OpenStack section of the configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OpenStackConfig {
    /// Keystone auth URL
    pub auth_url: String,
    /// User ID, takes precedence over username
    pub user_id: Option<String>,
    /// Username
    pub username: Option<String>,
    /// Password
    pub password: Option<String>,
    /// Project ID, takes precedence over project name
    #[serde(alias = "tenant-id")]
    pub project_id: Option<String>,
    /// Project name
    #[serde(alias = "tenant-name")]
    pub project_name: Option<String>,
    /// Domain ID applied to both user and project when not set separately
    pub domain_id: Option<String>,
    /// Domain name applied to both user and project when not set separately
    pub domain_name: Option<String>,
    /// User domain name
    pub user_domain_name: Option<String>,
    /// Project domain name
    #[serde(alias = "tenant-domain-name")]
    pub project_domain_name: Option<String>,
    /// Application credential ID
    pub application_credential_id: Option<String>,
    /// Application credential secret
    pub application_credential_secret: Option<String>,
    /// Region name
    pub region: String,
    /// Endpoint interface: public, internal or admin
    pub endpoint_type: String,
    /// CA bundle for the identity and service endpoints
    pub ca_file: Option<PathBuf>,
    /// Skip TLS verification
    pub tls_insecure: bool,
    /// Per-request timeout for the underlying transport
    pub http_timeout_secs: u64,
}

impl Default for OpenStackConfig {
    fn default() -> Self {
        Self {
            auth_url: String::new(),
            user_id: None,
            username: None,
            password: None,
            project_id: None,
            project_name: None,
            domain_id: None,
            domain_name: None,
            user_domain_name: None,
            project_domain_name: None,
            application_credential_id: None,
            application_credential_secret: None,
            region: String::new(),
            endpoint_type: "public".to_string(),
            ca_file: None,
            tls_insecure: false,
            http_timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for OpenStackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenStackConfig")
            .field("auth_url", &self.auth_url)
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("project_id", &self.project_id)
            .field("project_name", &self.project_name)
            .field("application_credential_id", &self.application_credential_id)
            .field(
                "application_credential_secret",
                &self.application_credential_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("region", &self.region)
            .field("endpoint_type", &self.endpoint_type)
            .finish_non_exhaustive()
    }
}

impl OpenStackConfig {
    /// Whether application credentials are configured
    pub fn uses_application_credential(&self) -> bool {
        self.application_credential_id.is_some() && self.application_credential_secret.is_some()
    }

    /// Endpoint interface parsed from `endpoint-type`
    pub fn availability(&self) -> Result<Availability> {
        self.endpoint_type.parse()
    }

    /// Domain name that scopes the user
    pub fn effective_user_domain_name(&self) -> Option<&str> {
        self.user_domain_name
            .as_deref()
            .or(self.domain_name.as_deref())
    }

    /// Domain name that scopes the project
    pub fn effective_project_domain_name(&self) -> Option<&str> {
        self.project_domain_name
            .as_deref()
            .or(self.domain_name.as_deref())
    }

    /// Validate the OpenStack section
    pub fn validate(&self) -> Result<()> {
        if self.auth_url.trim().is_empty() {
            return Err(Error::Configuration("openstack.auth-url is required".into()));
        }
        if self.region.trim().is_empty() {
            return Err(Error::Configuration("openstack.region is required".into()));
        }
        self.availability()?;

        if self.uses_application_credential() {
            return Ok(());
        }

        if self.user_id.is_none() && self.username.is_none() {
            return Err(Error::Configuration(
                "openstack requires user-id, username or application credentials".into(),
            ));
        }
        if self.password.is_none() {
            return Err(Error::Configuration(
                "openstack.password is required for password authentication".into(),
            ));
        }
        if self.user_id.is_none() && self.effective_user_domain_name().is_none() && self.domain_id.is_none() {
            return Err(Error::Configuration(
                "openstack username requires user-domain-name, domain-name or domain-id".into(),
            ));
        }
        Ok(())
    }
}
