//! OpenStack Client Layer
//!
//! - [`identity`]: Keystone authentication and the shared provider handle
//! - [`catalog`]: Service catalog lookup by type, interface and region
//! - [`service`]: Per-family service client factories
//! - [`block_storage`]: Flavor-aware Cinder resolution

pub mod block_storage;
pub mod catalog;
pub mod identity;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use block_storage::*;
pub use catalog::*;
pub use identity::*;
pub use service::*;
