//! Deployment flavor detection
//!
//! Some OpenStack installations (OSPC) only advertise legacy API versions in
//! their service catalog. The flavor is selected through the environment.

use serde::{Deserialize, Serialize};

/// Environment variable that selects the deployment flavor
pub const CLOUD_TYPE_ENV: &str = "CLOUD_TYPE";

/// Token that selects the restricted flavor
pub const CLOUD_TYPE_OSPC: &str = "OSPC";

/// Deployment flavor of the target cloud
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudType {
    Standard,
    /// OSPC: catalog only lists legacy versions, needs compatibility shims
    RestrictedFlavor,
}

impl CloudType {
    /// Classify a raw environment value. Never fails.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case(CLOUD_TYPE_OSPC) => CloudType::RestrictedFlavor,
            _ => CloudType::Standard,
        }
    }

    /// Read the process environment
    pub fn detect() -> Self {
        Self::from_env_value(std::env::var(CLOUD_TYPE_ENV).ok().as_deref())
    }
}

impl std::fmt::Display for CloudType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudType::Standard => write!(f, "standard"),
            CloudType::RestrictedFlavor => write!(f, "ospc"),
        }
    }
}

/// Serializes tests that mutate `CLOUD_TYPE` and restores it on drop
#[cfg(test)]
pub(crate) struct CloudTypeEnvGuard {
    previous: Option<String>,
    _lock: std::sync::MutexGuard<'static, ()>,
}

#[cfg(test)]
static CLOUD_TYPE_ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
impl CloudTypeEnvGuard {
    pub(crate) fn set(value: Option<&str>) -> Self {
        let lock = CLOUD_TYPE_ENV_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = std::env::var(CLOUD_TYPE_ENV).ok();
        match value {
            Some(v) => std::env::set_var(CLOUD_TYPE_ENV, v),
            None => std::env::remove_var(CLOUD_TYPE_ENV),
        }
        Self {
            previous,
            _lock: lock,
        }
    }
}

#[cfg(test)]
impl Drop for CloudTypeEnvGuard {
    fn drop(&mut self) {
        match &self.previous {
            Some(v) => std::env::set_var(CLOUD_TYPE_ENV, v),
            None => std::env::remove_var(CLOUD_TYPE_ENV),
        }
    }
}
