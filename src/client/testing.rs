//! Shared fixtures for catalog and identity tests

use crate::client::catalog::{CatalogEndpoint, CatalogEntry, ServiceCatalog};
use crate::client::identity::ProviderClient;
use serde_json::json;
use std::sync::Arc;

pub const REGION: &str = "RegionOne";

/// Catalog content served by a fake identity service
#[derive(Debug, Clone)]
pub struct CatalogFixture {
    pub entries: Vec<CatalogEntry>,
}

fn entry(service_type: &str, name: &str, url: String) -> CatalogEntry {
    CatalogEntry {
        service_type: service_type.into(),
        name: name.into(),
        endpoints: vec![CatalogEndpoint {
            id: format!("{}-public", name),
            interface: "public".into(),
            region: Some(REGION.into()),
            region_id: Some(REGION.into()),
            url,
        }],
    }
}

impl CatalogFixture {
    /// Every service family the auto-healer knows about, public in RegionOne
    pub fn standard(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            entries: vec![
                entry("compute", "nova", format!("{}/compute/v2.1", base)),
                entry("orchestration", "heat", format!("{}/heat-api/v1/project-id", base)),
                entry("container-infra", "magnum", format!("{}/container-infra/v1", base)),
                entry("volume", "cinder", format!("{}/volume/v1/project-id", base)),
                entry("volumev3", "cinderv3", format!("{}/volume/v3/project-id", base)),
                entry("network", "neutron", format!("{}/network", base)),
                entry("load-balancer", "octavia", format!("{}/load-balancer", base)),
                entry("key-manager", "barbican", format!("{}/key-manager", base)),
            ],
        }
    }

    /// Drop a service type from the catalog
    pub fn without(mut self, service_type: &str) -> Self {
        self.entries.retain(|e| e.service_type != service_type);
        self
    }

    /// Replace the URL of a service type
    pub fn with_url(mut self, service_type: &str, url: &str) -> Self {
        for e in self.entries.iter_mut().filter(|e| e.service_type == service_type) {
            for endpoint in e.endpoints.iter_mut() {
                endpoint.url = url.to_string();
            }
        }
        self
    }

    pub fn catalog(&self) -> ServiceCatalog {
        ServiceCatalog::new(self.entries.clone())
    }

    /// Provider handle that skips authentication
    pub fn provider(&self) -> Arc<ProviderClient> {
        Arc::new(ProviderClient::new(
            reqwest::Client::new(),
            "http://keystone.test/v3/auth/tokens",
            "test-token",
            self.catalog(),
        ))
    }
}

/// Keystone v3 token response body embedding the fixture's catalog
pub fn token_body(fixture: &CatalogFixture) -> String {
    json!({
        "token": {
            "methods": ["password"],
            "expires_at": "2099-01-01T00:00:00.000000Z",
            "issued_at": "2026-10-19T00:00:00.000000Z",
            "project": { "id": "project-id", "name": "k8s" },
            "catalog": fixture.entries,
        }
    })
    .to_string()
}
