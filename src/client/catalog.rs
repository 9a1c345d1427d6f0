//! Service Catalog Discovery
//!
//! Keystone returns the service catalog alongside every issued token.
//! Endpoints are selected by service type, interface (availability) and
//! region.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

// =============================================================================
// Endpoint Selection
// =============================================================================

/// Endpoint interface published in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    #[default]
    Public,
    Internal,
    Admin,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Public => "public",
            Availability::Internal => "internal",
            Availability::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Availability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "public" | "publicurl" => Ok(Availability::Public),
            "internal" | "internalurl" => Ok(Availability::Internal),
            "admin" | "adminurl" => Ok(Availability::Admin),
            other => Err(Error::Configuration(format!(
                "unknown endpoint type '{}', expected public, internal or admin",
                other
            ))),
        }
    }
}

/// Options used to pick one endpoint out of the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointOptions {
    /// Region name or ID, any region matches when empty
    pub region: String,
    pub availability: Availability,
}

impl EndpointOptions {
    pub fn new(region: impl Into<String>, availability: Availability) -> Self {
        Self {
            region: region.into(),
            availability,
        }
    }
}

// =============================================================================
// Catalog Types
// =============================================================================

/// A single published endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEndpoint {
    #[serde(default)]
    pub id: String,
    pub interface: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_id: Option<String>,
    pub url: String,
}

/// A service and its endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

/// Why a catalog lookup produced no single endpoint
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CatalogLookupError {
    #[error("no '{service_type}' endpoint published in the catalog")]
    NotFound { service_type: String },

    #[error("multiple '{service_type}' endpoints match: {}", .urls.join(", "))]
    Ambiguous {
        service_type: String,
        urls: Vec<String>,
    },
}

/// Service catalog attached to an issued token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceCatalog {
    entries: Vec<CatalogEntry>,
}

impl ServiceCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Locate the single endpoint for `service_type` matching `opts`.
    ///
    /// The returned URL always ends with `/`.
    pub fn locate(
        &self,
        service_type: &str,
        opts: &EndpointOptions,
    ) -> std::result::Result<String, CatalogLookupError> {
        let interface = opts.availability.as_str();
        let mut urls: Vec<String> = Vec::new();

        let endpoints = self
            .entries
            .iter()
            .filter(|entry| entry.service_type == service_type)
            .flat_map(|entry| entry.endpoints.iter());

        for endpoint in endpoints {
            if !endpoint.interface.eq_ignore_ascii_case(interface) {
                continue;
            }
            if !opts.region.is_empty() && !region_matches(endpoint, &opts.region) {
                continue;
            }
            let url = normalize_url(&endpoint.url);
            if !urls.contains(&url) {
                urls.push(url);
            }
        }

        match urls.len() {
            0 => Err(CatalogLookupError::NotFound {
                service_type: service_type.to_string(),
            }),
            1 => Ok(urls.remove(0)),
            _ => Err(CatalogLookupError::Ambiguous {
                service_type: service_type.to_string(),
                urls,
            }),
        }
    }
}

fn region_matches(endpoint: &CatalogEndpoint, region: &str) -> bool {
    endpoint.region_id.as_deref() == Some(region) || endpoint.region.as_deref() == Some(region)
}

/// Ensure a trailing slash so relative paths join under the endpoint
pub fn normalize_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}
