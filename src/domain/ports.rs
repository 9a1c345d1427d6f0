//! Domain Ports - Core trait definitions for the auto-healer bootstrap
//!
//! A cloud backend implements [`CloudProviderFactory`] and registers it under
//! its provider name. The dispatcher only ever sees the resulting
//! [`CloudProvider`], so it never depends on a concrete backend.

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;

// =============================================================================
// Cloud Provider Port
// =============================================================================

/// Assembled backend handle consumed by the remediation logic
pub trait CloudProvider: Send + Sync {
    /// Provider name the handle was constructed under
    fn name(&self) -> &str;

    /// Configuration the handle was built from
    fn config(&self) -> &Config;

    /// Kubernetes client, absent in standalone mode
    fn kube_client(&self) -> Option<&kube::Client>;

    /// `(service, endpoint)` pairs of every resolved service client
    fn endpoints(&self) -> Vec<(String, String)>;

    /// Concrete handle, for callers that need backend-specific clients
    fn as_any(&self) -> &dyn Any;
}

impl dyn CloudProvider {
    /// Borrow the concrete backend handle, `None` if it is another backend
    pub fn downcast_ref<T: CloudProvider + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

// =============================================================================
// Cloud Provider Factory Port
// =============================================================================

/// Constructor capability registered by each cloud backend
#[async_trait]
pub trait CloudProviderFactory: Send + Sync {
    /// Build a fully populated provider, or fail without returning one
    async fn build(&self, config: Config, kube_client: Option<kube::Client>) -> Result<CloudProviderRef>;
}

/// Adapts a plain async constructor function into a [`CloudProviderFactory`]
pub struct FnFactory<F>(pub F);

#[async_trait]
impl<F, Fut> CloudProviderFactory for FnFactory<F>
where
    F: Fn(Config, Option<kube::Client>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<CloudProviderRef>> + Send,
{
    async fn build(&self, config: Config, kube_client: Option<kube::Client>) -> Result<CloudProviderRef> {
        (self.0)(config, kube_client).await
    }
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type CloudProviderRef = Arc<dyn CloudProvider>;
pub type CloudProviderFactoryRef = Arc<dyn CloudProviderFactory>;
