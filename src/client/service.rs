//! Service Client Factories
//!
//! One factory per API family. Each resolves the family's endpoint from the
//! provider's catalog and binds a [`ServiceClient`] to it. Factories never
//! retry; a lookup failure is reported with the family, version and region
//! that were attempted.

use crate::client::catalog::EndpointOptions;
use crate::client::identity::{ProviderClient, AUTH_TOKEN_HEADER};
use crate::error::{Error, Result};
use reqwest::Method;
use std::sync::Arc;
use tracing::debug;

/// Microversion pinned on container-infra clients
pub const CONTAINER_INFRA_MICROVERSION: &str = "latest";

// =============================================================================
// API Families
// =============================================================================

/// OpenStack API families the auto-healer talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiFamily {
    Network,
    Compute,
    Orchestration,
    ContainerInfra,
    BlockStorage,
    LoadBalancer,
    KeyManager,
}

impl ApiFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiFamily::Network => "network",
            ApiFamily::Compute => "compute",
            ApiFamily::Orchestration => "orchestration",
            ApiFamily::ContainerInfra => "container-infra",
            ApiFamily::BlockStorage => "block-storage",
            ApiFamily::LoadBalancer => "load-balancer",
            ApiFamily::KeyManager => "key-manager",
        }
    }

    /// OpenStack project implementing the family
    pub fn project(&self) -> &'static str {
        match self {
            ApiFamily::Network => "neutron",
            ApiFamily::Compute => "nova",
            ApiFamily::Orchestration => "heat",
            ApiFamily::ContainerInfra => "magnum",
            ApiFamily::BlockStorage => "cinder",
            ApiFamily::LoadBalancer => "octavia",
            ApiFamily::KeyManager => "barbican",
        }
    }
}

impl std::fmt::Display for ApiFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog coordinates of one family/version pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSpec {
    pub family: ApiFamily,
    pub version: &'static str,
    /// Catalog service type
    pub service_type: &'static str,
    /// Path appended to the endpoint to form the resource base
    pub resource_path: Option<&'static str>,
}

pub const NETWORK_V2: ServiceSpec = ServiceSpec {
    family: ApiFamily::Network,
    version: "v2",
    service_type: "network",
    resource_path: Some("v2.0/"),
};

pub const COMPUTE_V2: ServiceSpec = ServiceSpec {
    family: ApiFamily::Compute,
    version: "v2",
    service_type: "compute",
    resource_path: None,
};

pub const ORCHESTRATION_V1: ServiceSpec = ServiceSpec {
    family: ApiFamily::Orchestration,
    version: "v1",
    service_type: "orchestration",
    resource_path: None,
};

pub const CONTAINER_INFRA_V1: ServiceSpec = ServiceSpec {
    family: ApiFamily::ContainerInfra,
    version: "v1",
    service_type: "container-infra",
    resource_path: None,
};

pub const BLOCK_STORAGE_V1: ServiceSpec = ServiceSpec {
    family: ApiFamily::BlockStorage,
    version: "v1",
    service_type: "volume",
    resource_path: None,
};

pub const BLOCK_STORAGE_V3: ServiceSpec = ServiceSpec {
    family: ApiFamily::BlockStorage,
    version: "v3",
    service_type: "volumev3",
    resource_path: None,
};

pub const LOAD_BALANCER_V2: ServiceSpec = ServiceSpec {
    family: ApiFamily::LoadBalancer,
    version: "v2",
    service_type: "load-balancer",
    resource_path: Some("v2.0/"),
};

pub const KEY_MANAGER_V1: ServiceSpec = ServiceSpec {
    family: ApiFamily::KeyManager,
    version: "v1",
    service_type: "key-manager",
    resource_path: Some("v1/"),
};

// =============================================================================
// Service Client
// =============================================================================

/// Client bound to one resolved endpoint of one API family
#[derive(Debug, Clone)]
pub struct ServiceClient {
    provider: Arc<ProviderClient>,
    spec: ServiceSpec,
    endpoint: String,
    microversion: Option<String>,
}

impl ServiceClient {
    pub fn new(provider: Arc<ProviderClient>, spec: ServiceSpec, endpoint: impl Into<String>) -> Self {
        Self {
            provider,
            spec,
            endpoint: endpoint.into(),
            microversion: None,
        }
    }

    pub fn provider(&self) -> &Arc<ProviderClient> {
        &self.provider
    }

    pub fn family(&self) -> ApiFamily {
        self.spec.family
    }

    pub fn version(&self) -> &'static str {
        self.spec.version
    }

    pub fn service_type(&self) -> &'static str {
        self.spec.service_type
    }

    /// Endpoint URL as resolved from the catalog, with trailing slash
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(crate) fn set_endpoint(&mut self, endpoint: String) {
        self.endpoint = endpoint;
    }

    /// Base URL that resource paths are joined onto
    pub fn resource_base(&self) -> String {
        match self.spec.resource_path {
            Some(path) => format!("{}{}", self.endpoint, path),
            None => self.endpoint.clone(),
        }
    }

    pub fn microversion(&self) -> Option<&str> {
        self.microversion.as_deref()
    }

    pub fn set_microversion(&mut self, microversion: impl Into<String>) {
        self.microversion = Some(microversion.into());
    }

    /// Full URL for a resource path
    pub fn service_url(&self, path: &str) -> String {
        format!("{}{}", self.resource_base(), path.trim_start_matches('/'))
    }

    /// Microversion headers for the pinned version, empty when unpinned
    pub fn microversion_headers(&self) -> Vec<(&'static str, String)> {
        let Some(version) = &self.microversion else {
            return Vec::new();
        };

        match self.spec.service_type {
            "compute" => vec![
                ("X-OpenStack-Nova-API-Version", version.clone()),
                ("OpenStack-API-Version", format!("compute {}", version)),
            ],
            "volume" | "volumev3" => vec![("OpenStack-API-Version", format!("volume {}", version))],
            other => vec![("OpenStack-API-Version", format!("{} {}", other, version))],
        }
    }

    /// Authenticated request against this service
    pub fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .provider
            .http()
            .request(method, self.service_url(path))
            .header(AUTH_TOKEN_HEADER, self.provider.token());

        for (name, value) in self.microversion_headers() {
            builder = builder.header(name, value);
        }
        builder
    }
}

// =============================================================================
// Factories
// =============================================================================

/// Resolve `spec` in the provider's catalog and bind a client to it
pub fn new_service_client(
    provider: &Arc<ProviderClient>,
    spec: ServiceSpec,
    eo: &EndpointOptions,
) -> Result<ServiceClient> {
    let endpoint = provider
        .catalog()
        .locate(spec.service_type, eo)
        .map_err(|e| Error::EndpointNotFound {
            family: spec.family.to_string(),
            version: spec.version.to_string(),
            availability: eo.availability.to_string(),
            region: eo.region.clone(),
            reason: e.to_string(),
        })?;

    debug!(
        "Resolved {} {} ({}) endpoint in region {}: {}",
        spec.family,
        spec.version,
        spec.family.project(),
        eo.region,
        endpoint
    );

    Ok(ServiceClient::new(provider.clone(), spec, endpoint))
}

/// Client for the Neutron v2 API
pub fn new_network_v2(provider: &Arc<ProviderClient>, eo: &EndpointOptions) -> Result<ServiceClient> {
    new_service_client(provider, NETWORK_V2, eo)
}

/// Client for the Nova v2 API
pub fn new_compute_v2(provider: &Arc<ProviderClient>, eo: &EndpointOptions) -> Result<ServiceClient> {
    new_service_client(provider, COMPUTE_V2, eo)
}

/// Client for the Heat v1 API
pub fn new_orchestration_v1(provider: &Arc<ProviderClient>, eo: &EndpointOptions) -> Result<ServiceClient> {
    new_service_client(provider, ORCHESTRATION_V1, eo)
}

/// Client for the Magnum v1 API, pinned to the latest microversion
pub fn new_container_infra_v1(provider: &Arc<ProviderClient>, eo: &EndpointOptions) -> Result<ServiceClient> {
    let mut client = new_service_client(provider, CONTAINER_INFRA_V1, eo)?;
    client.set_microversion(CONTAINER_INFRA_MICROVERSION);
    Ok(client)
}

/// Client for the Cinder v1 API
pub fn new_block_storage_v1(provider: &Arc<ProviderClient>, eo: &EndpointOptions) -> Result<ServiceClient> {
    new_service_client(provider, BLOCK_STORAGE_V1, eo)
}

/// Client for the Cinder v3 API
pub fn new_block_storage_v3(provider: &Arc<ProviderClient>, eo: &EndpointOptions) -> Result<ServiceClient> {
    new_service_client(provider, BLOCK_STORAGE_V3, eo)
}

/// Client for the Octavia v2 API
pub fn new_load_balancer_v2(provider: &Arc<ProviderClient>, eo: &EndpointOptions) -> Result<ServiceClient> {
    new_service_client(provider, LOAD_BALANCER_V2, eo)
}

/// Client for the Barbican v1 API
pub fn new_key_manager_v1(provider: &Arc<ProviderClient>, eo: &EndpointOptions) -> Result<ServiceClient> {
    new_service_client(provider, KEY_MANAGER_V1, eo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::catalog::Availability;
    use crate::client::testing::{CatalogFixture, REGION};
    use assert_matches::assert_matches;

    const BASE: &str = "https://cloud.example.com";

    fn eo() -> EndpointOptions {
        EndpointOptions::new(REGION, Availability::Public)
    }

    #[test]
    fn test_resolves_every_family() {
        let provider = CatalogFixture::standard(BASE).provider();

        let compute = new_compute_v2(&provider, &eo()).unwrap();
        assert_eq!(compute.endpoint(), "https://cloud.example.com/compute/v2.1/");
        assert_eq!(compute.family(), ApiFamily::Compute);

        let heat = new_orchestration_v1(&provider, &eo()).unwrap();
        assert_eq!(heat.service_type(), "orchestration");

        let cinder = new_block_storage_v3(&provider, &eo()).unwrap();
        assert_eq!(cinder.version(), "v3");
        assert_eq!(cinder.endpoint(), "https://cloud.example.com/volume/v3/project-id/");

        let legacy = new_block_storage_v1(&provider, &eo()).unwrap();
        assert_eq!(legacy.endpoint(), "https://cloud.example.com/volume/v1/project-id/");

        let barbican = new_key_manager_v1(&provider, &eo()).unwrap();
        assert_eq!(barbican.resource_base(), "https://cloud.example.com/key-manager/v1/");
    }

    #[test]
    fn test_network_and_load_balancer_resource_base() {
        let provider = CatalogFixture::standard(BASE).provider();

        let network = new_network_v2(&provider, &eo()).unwrap();
        assert_eq!(network.endpoint(), "https://cloud.example.com/network/");
        assert_eq!(network.resource_base(), "https://cloud.example.com/network/v2.0/");
        assert_eq!(
            network.service_url("/ports"),
            "https://cloud.example.com/network/v2.0/ports"
        );

        let lb = new_load_balancer_v2(&provider, &eo()).unwrap();
        assert_eq!(lb.resource_base(), "https://cloud.example.com/load-balancer/v2.0/");
    }

    #[test]
    fn test_container_infra_pinned_to_latest() {
        let provider = CatalogFixture::standard(BASE).provider();

        let magnum = new_container_infra_v1(&provider, &eo()).unwrap();
        assert_eq!(magnum.microversion(), Some("latest"));
        assert_eq!(
            magnum.microversion_headers(),
            vec![("OpenStack-API-Version", "container-infra latest".to_string())]
        );
    }

    #[test]
    fn test_missing_endpoint_names_family_version_region() {
        let provider = CatalogFixture::standard(BASE).without("load-balancer").provider();

        let err = new_load_balancer_v2(&provider, &eo()).unwrap_err();
        assert_matches!(
            err,
            Error::EndpointNotFound { ref family, ref version, ref region, ref availability, .. }
                if family == "load-balancer" && version == "v2" && region == REGION && availability == "public"
        );
    }

    #[test]
    fn test_wrong_interface_not_found() {
        let provider = CatalogFixture::standard(BASE).provider();
        let internal = EndpointOptions::new(REGION, Availability::Internal);

        let err = new_compute_v2(&provider, &internal).unwrap_err();
        assert!(err.to_string().contains("internal"));
    }

    #[test]
    fn test_clients_share_provider() {
        let provider = CatalogFixture::standard(BASE).provider();

        let nova = new_compute_v2(&provider, &eo()).unwrap();
        let heat = new_orchestration_v1(&provider, &eo()).unwrap();

        assert!(Arc::ptr_eq(nova.provider(), heat.provider()));
        assert_eq!(Arc::strong_count(&provider), 3);
    }

    #[test]
    fn test_request_carries_token_and_microversion() {
        let provider = CatalogFixture::standard(BASE).provider();
        let mut nova = new_compute_v2(&provider, &eo()).unwrap();
        nova.set_microversion("2.53");

        let request = nova.request(Method::GET, "servers/detail").build().unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://cloud.example.com/compute/v2.1/servers/detail"
        );
        assert_eq!(request.headers()[AUTH_TOKEN_HEADER], "test-token");
        assert_eq!(request.headers()["X-OpenStack-Nova-API-Version"], "2.53");
        assert_eq!(request.headers()["OpenStack-API-Version"], "compute 2.53");
    }

    #[test]
    fn test_unpinned_client_sends_no_microversion() {
        let provider = CatalogFixture::standard(BASE).provider();
        let heat = new_orchestration_v1(&provider, &eo()).unwrap();

        let request = heat.request(Method::GET, "stacks").build().unwrap();
        assert!(request.headers().get("OpenStack-API-Version").is_none());
    }
}
