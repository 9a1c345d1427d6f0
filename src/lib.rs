//! Node Auto-Healer - Cloud Provider Bootstrap
//!
//! Selects the cloud backend named in the configuration and assembles the
//! per-API service clients the remediation logic works with.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Dispatcher (main)                           │
//! │        registry.construct(config.cloud_provider, config, kube)      │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                     CloudProviderRegistry                           │
//! │              "openstack" ──► OpenStackFactory                       │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                     OpenStackFactory::create                        │
//! │  authenticate ─► compute ─► orchestration ─► container-infra ─►     │
//! │  block-storage (v3, or v1 rewritten to v2 on OSPC) ─► network?      │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │   Keystone v3 token + service catalog      CLOUD_TYPE environment   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cloudprovider`]: Provider registry and the OpenStack backend
//! - [`client`]: Identity, catalog lookup and service client factories
//! - [`cloud_type`]: Deployment flavor detection
//! - [`config`]: YAML configuration
//! - [`domain`]: Port traits implemented by backends
//! - [`error`]: Error types and handling

pub mod client;
pub mod cloud_type;
pub mod cloudprovider;
pub mod config;
pub mod domain;
pub mod error;

// Re-export commonly used types
pub use client::{
    ApiFamily, Availability, EndpointOptions, ProviderClient, ServiceCatalog, ServiceClient,
};

pub use cloud_type::CloudType;

pub use cloudprovider::{
    default_registry, CloudProviderRegistry, OpenStackCloudProvider, OpenStackFactory,
};

pub use config::{Config, OpenStackConfig};

pub use domain::ports::{
    CloudProvider, CloudProviderFactory, CloudProviderFactoryRef, CloudProviderRef, FnFactory,
};

pub use error::{Error, Result, StartupAction};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
