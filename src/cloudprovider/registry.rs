//! Cloud Provider Registry
//!
//! Maps provider names to backend constructors. The registry is an owned
//! value: the dispatcher creates it, each backend registers itself through an
//! explicit initialization call, and only then is it shared for lookups.
//! Registration needs `&mut self`, so no lookup can observe a half-populated
//! registry.

use crate::config::Config;
use crate::domain::ports::{CloudProviderFactory, CloudProviderFactoryRef, CloudProviderRef};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Provider name to constructor mapping
#[derive(Default)]
pub struct CloudProviderRegistry {
    factories: BTreeMap<String, CloudProviderFactoryRef>,
}

impl CloudProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `factory` under `name`. A later registration under the same
    /// name replaces the earlier one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: CloudProviderFactory + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Arc::new(factory)).is_some() {
            warn!("Cloud provider {} registered again, replacing earlier registration", name);
        } else {
            debug!("Registered cloud provider {}", name);
        }
    }

    /// Constructor registered under `name`
    pub fn lookup(&self, name: &str) -> Option<CloudProviderFactoryRef> {
        self.factories.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered provider names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Look up `name` and invoke its constructor, propagating its result
    pub async fn construct(
        &self,
        name: &str,
        config: Config,
        kube_client: Option<kube::Client>,
    ) -> Result<CloudProviderRef> {
        let factory = self.lookup(name).ok_or_else(|| Error::UnknownProvider {
            name: name.to_string(),
        })?;

        info!("Constructing cloud provider {}", name);
        factory.build(config, kube_client).await
    }
}

impl std::fmt::Debug for CloudProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{CloudProvider, FnFactory};
    use assert_matches::assert_matches;

    struct StubProvider {
        name: String,
        config: Config,
    }

    impl CloudProvider for StubProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn config(&self) -> &Config {
            &self.config
        }

        fn kube_client(&self) -> Option<&kube::Client> {
            None
        }

        fn endpoints(&self) -> Vec<(String, String)> {
            Vec::new()
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    fn stub(label: &'static str) -> impl CloudProviderFactory {
        FnFactory(move |config: Config, _kube: Option<kube::Client>| async move {
            Ok(Arc::new(StubProvider {
                name: label.to_string(),
                config,
            }) as CloudProviderRef)
        })
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let mut registry = CloudProviderRegistry::new();
        registry.register("openstack", stub("first"));
        registry.register("openstack", stub("second"));

        assert_eq!(registry.len(), 1);

        let provider = registry
            .construct("openstack", Config::default(), None)
            .await
            .unwrap();
        assert_eq!(provider.name(), "second");
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let mut registry = CloudProviderRegistry::new();
        registry.register("openstack", stub("openstack"));

        assert!(registry.lookup("aws").is_none());
        assert_eq!(registry.names(), vec!["openstack"]);

        let err = registry
            .construct("aws", Config::default(), None)
            .await
            .err()
            .unwrap();
        assert_matches!(err, Error::UnknownProvider { ref name } if name == "aws");
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_constructor_error_propagates_unchanged() {
        let mut registry = CloudProviderRegistry::new();
        registry.register(
            "broken",
            FnFactory(|_config: Config, _kube: Option<kube::Client>| async {
                Err::<CloudProviderRef, _>(Error::Authentication {
                    auth_url: "https://keystone.example.com/v3".into(),
                    reason: "401 Unauthorized".into(),
                })
            }),
        );

        let err = registry
            .construct("broken", Config::default(), None)
            .await
            .err()
            .unwrap();
        assert_matches!(err, Error::Authentication { .. });
    }

    #[tokio::test]
    async fn test_constructed_handle_downcasts_to_backend() {
        let mut registry = CloudProviderRegistry::new();
        registry.register("stub", stub("stub"));

        let provider = registry.construct("stub", Config::default(), None).await.unwrap();

        let stub = provider.downcast_ref::<StubProvider>().unwrap();
        assert_eq!(stub.name, "stub");
        assert!(provider
            .downcast_ref::<crate::cloudprovider::OpenStackCloudProvider>()
            .is_none());
    }

    #[test]
    fn test_empty_registry() {
        let registry = CloudProviderRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.contains("openstack"));
    }
}
