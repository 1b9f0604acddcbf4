//! Remote configuration source
//!
//! The [`ConfigSource`] trait is the seam between the refresh loop and the
//! stores that actually hold the values; [`AzureSource`] is the production
//! implementation backed by Key Vault and App Configuration.

mod azure;
mod error;

use async_trait::async_trait;

use crate::snapshot::Snapshot;

pub use azure::AzureSource;
pub use error::FetchError;

/// Key Vault holding the secret-backed fields
pub const KEY_VAULT_NAME: &str = "kv-lab-sc-azcfg";

/// App Configuration store holding the setting-backed fields
pub const APP_CONFIG_NAME: &str = "ac-lab-sc-azcfg";

/// Produces a fully populated configuration snapshot
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Fetch a brand-new snapshot with every field populated
    ///
    /// Either all fields resolve and a complete snapshot is returned, or the
    /// fetch fails as a whole; callers never see a partial snapshot.
    async fn fetch(&self) -> Result<Snapshot, FetchError>;
}
