//! OpenStack Cloud Provider
//!
//! Authenticates once, then resolves the Nova, Heat, Magnum and Cinder
//! clients in a fixed order. The first failure aborts construction, so a
//! provider is either fully populated or not returned at all.

use crate::client::{
    authenticate, new_block_storage_based_on_cloud_type, new_block_storage_for_cloud_type,
    new_compute_v2, new_container_infra_v1, new_network_v2, new_orchestration_v1,
    EndpointOptions, ProviderClient, ServiceClient,
};
use crate::cloud_type::{CloudType, CLOUD_TYPE_ENV};
use crate::cloudprovider::registry::CloudProviderRegistry;
use crate::config::Config;
use crate::domain::ports::{CloudProvider, CloudProviderFactory, CloudProviderRef};
use crate::error::Result;
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Name operators put in `cloud-provider` to select this backend
pub const PROVIDER_NAME: &str = "openstack";

/// User agent sent to every OpenStack API
pub const USER_AGENT: &str = "magnum-auto-healer";

// =============================================================================
// Provider Handle
// =============================================================================

/// Resolved OpenStack service clients for one cluster
pub struct OpenStackCloudProvider {
    kube_client: Option<kube::Client>,
    network: Option<ServiceClient>,
    nova: ServiceClient,
    heat: ServiceClient,
    magnum: ServiceClient,
    cinder: ServiceClient,
    config: Config,
}

impl OpenStackCloudProvider {
    /// Nova v2
    pub fn compute(&self) -> &ServiceClient {
        &self.nova
    }

    /// Heat v1
    pub fn orchestration(&self) -> &ServiceClient {
        &self.heat
    }

    /// Magnum v1, microversion pinned to `latest`
    pub fn container_infra(&self) -> &ServiceClient {
        &self.magnum
    }

    /// Cinder v3, or the rewritten v1 endpoint on OSPC clouds
    pub fn block_storage(&self) -> &ServiceClient {
        &self.cinder
    }

    /// Neutron v2 when the catalog publishes it
    pub fn network(&self) -> Option<&ServiceClient> {
        self.network.as_ref()
    }

    /// Authenticated session shared by every client
    pub fn provider_client(&self) -> &Arc<ProviderClient> {
        self.nova.provider()
    }
}

impl CloudProvider for OpenStackCloudProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn kube_client(&self) -> Option<&kube::Client> {
        self.kube_client.as_ref()
    }

    fn endpoints(&self) -> Vec<(String, String)> {
        let mut endpoints: Vec<(String, String)> = [&self.nova, &self.heat, &self.magnum, &self.cinder]
            .into_iter()
            .map(|c| (c.family().to_string(), c.endpoint().to_string()))
            .collect();

        if let Some(network) = &self.network {
            endpoints.push((network.family().to_string(), network.endpoint().to_string()));
        }
        endpoints
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for OpenStackCloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenStackCloudProvider")
            .field("kube_client", &self.kube_client.is_some())
            .field("endpoints", &self.endpoints())
            .finish()
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Constructor registered under [`PROVIDER_NAME`]
#[derive(Debug, Clone)]
pub struct OpenStackFactory {
    user_agent: String,
    /// Fixed flavor, detected from the environment when unset
    cloud_type: Option<CloudType>,
}

impl Default for OpenStackFactory {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
            cloud_type: None,
        }
    }
}

impl OpenStackFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip environment detection and use `cloud_type`
    pub fn with_cloud_type(mut self, cloud_type: CloudType) -> Self {
        self.cloud_type = Some(cloud_type);
        self
    }

    /// Authenticate and resolve every service client
    pub async fn create(
        &self,
        config: Config,
        kube_client: Option<kube::Client>,
    ) -> Result<OpenStackCloudProvider> {
        let os = &config.openstack;
        let eo = EndpointOptions::new(os.region.clone(), os.availability()?);
        let cloud_type = self
            .cloud_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| format!("from {}", CLOUD_TYPE_ENV));

        info!(
            "Creating OpenStack cloud provider (region: {}, endpoint type: {}, cloud type: {})",
            eo.region, eo.availability, cloud_type
        );

        let provider = authenticate(os, &self.user_agent).await?;

        let nova = resolved("compute", &eo, new_compute_v2(&provider, &eo))?;
        let heat = resolved("orchestration", &eo, new_orchestration_v1(&provider, &eo))?;
        let magnum = resolved("container-infra", &eo, new_container_infra_v1(&provider, &eo))?;
        let cinder = match self.cloud_type {
            Some(cloud_type) => new_block_storage_for_cloud_type(&provider, &eo, cloud_type),
            None => new_block_storage_based_on_cloud_type(&provider, &eo),
        };
        let cinder = resolved("block-storage", &eo, cinder)?;

        let network = match new_network_v2(&provider, &eo) {
            Ok(client) => Some(client),
            Err(e) => {
                debug!("Network service not available: {}", e);
                None
            }
        };

        Ok(OpenStackCloudProvider {
            kube_client,
            network,
            nova,
            heat,
            magnum,
            cinder,
            config,
        })
    }
}

fn resolved(service: &str, eo: &EndpointOptions, result: Result<ServiceClient>) -> Result<ServiceClient> {
    match result {
        Ok(client) => {
            info!("Using {} endpoint {}", service, client.endpoint());
            Ok(client)
        }
        Err(e) => {
            error!(
                "Failed to find {} service endpoint in the region {}: {}",
                service, eo.region, e
            );
            Err(e)
        }
    }
}

#[async_trait]
impl CloudProviderFactory for OpenStackFactory {
    async fn build(&self, config: Config, kube_client: Option<kube::Client>) -> Result<CloudProviderRef> {
        let provider = self.create(config, kube_client).await?;
        Ok(Arc::new(provider))
    }
}

/// Register the OpenStack backend with the dispatcher's registry
pub fn register(registry: &mut CloudProviderRegistry) {
    registry.register(PROVIDER_NAME, OpenStackFactory::default());
}
