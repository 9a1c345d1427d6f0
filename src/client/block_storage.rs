//! Flavor-aware Block Storage Resolution
//!
//! Standard clouds publish Cinder v3. OSPC clouds only publish a v1 entry,
//! while the service on that host answers on the v2 path, so the resolved
//! v1 endpoint is rewritten to v2.

use crate::client::catalog::EndpointOptions;
use crate::client::identity::ProviderClient;
use crate::client::service::{new_block_storage_v1, new_block_storage_v3, ServiceClient};
use crate::cloud_type::CloudType;
use crate::error::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Block storage client for the flavor detected from the environment
pub fn new_block_storage_based_on_cloud_type(
    provider: &Arc<ProviderClient>,
    eo: &EndpointOptions,
) -> Result<ServiceClient> {
    new_block_storage_for_cloud_type(provider, eo, CloudType::detect())
}

/// Block storage client for an explicit flavor
pub fn new_block_storage_for_cloud_type(
    provider: &Arc<ProviderClient>,
    eo: &EndpointOptions,
    cloud_type: CloudType,
) -> Result<ServiceClient> {
    match cloud_type {
        CloudType::RestrictedFlavor => {
            info!("Creating blockstorage client v1 for OSPC cloud");
            let mut client = new_block_storage_v1(provider, eo)?;

            match rewrite_v1_endpoint(client.endpoint()) {
                Some(endpoint) => {
                    info!(
                        "Rewriting blockstorage endpoint {} -> {}",
                        client.endpoint(),
                        endpoint
                    );
                    client.set_endpoint(endpoint);
                }
                None => warn!(
                    "Blockstorage endpoint {} has no v1 path segment, using it unchanged",
                    client.endpoint()
                ),
            }
            Ok(client)
        }
        CloudType::Standard => new_block_storage_v3(provider, eo),
    }
}

/// Replace the first `v1` path segment of `endpoint` with `v2`.
///
/// Only path segments are considered, so hosts and tenant IDs that happen to
/// contain `v1` are never rewritten. A segment such as `v1.0` becomes `v2.0`.
/// The result is the parsed URL serialized again, so it is normalized: the
/// host is lowercased and a port equal to the scheme default is dropped.
/// Returns `None` when the endpoint is not a URL or has no such segment.
pub fn rewrite_v1_endpoint(endpoint: &str) -> Option<String> {
    let mut url = reqwest::Url::parse(endpoint).ok()?;
    let mut segments: Vec<String> = url.path_segments()?.map(str::to_string).collect();

    let idx = segments
        .iter()
        .position(|s| s == "v1" || s.starts_with("v1."))?;
    segments[idx] = format!("v2{}", &segments[idx][2..]);

    url.set_path(&segments.join("/"));
    Some(url.to_string())
}
