//! Cloud Providers
//!
//! Provides the provider registry and the backends that register with it:
//! - OpenStack (Nova, Heat, Magnum, Cinder)

pub mod openstack;
pub mod registry;

pub use openstack::{OpenStackCloudProvider, OpenStackFactory};
pub use registry::CloudProviderRegistry;

/// Registry with every built-in backend registered
pub fn default_registry() -> CloudProviderRegistry {
    let mut registry = CloudProviderRegistry::new();
    openstack::register(&mut registry);
    registry
}
