//! Read-only catalogue listings.

use crate::backend::{ImageScope, ProviderApi};
use crate::error::LifecycleError;
use crate::inventory::Inventory;
use crate::types::{Droplet, Resource, SshKey};

use super::Lifecycle;

impl<A, I> Lifecycle<A, I>
where
    A: ProviderApi,
    I: Inventory,
{
    /// Every droplet on the account.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Provider`] when the listing fails.
    pub async fn instances(&self) -> Result<Vec<Droplet>, LifecycleError> {
        Ok(self.api.list_droplets().await?)
    }

    /// Public and private images.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Provider`] when the listing fails.
    pub async fn images(&self) -> Result<Vec<Resource>, LifecycleError> {
        Ok(self.api.list_images(ImageScope::All).await?)
    }

    /// Droplet sizes.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Provider`] when the listing fails.
    pub async fn sizes(&self) -> Result<Vec<Resource>, LifecycleError> {
        Ok(self.api.list_sizes().await?)
    }

    /// Regions.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Provider`] when the listing fails.
    pub async fn regions(&self) -> Result<Vec<Resource>, LifecycleError> {
        Ok(self.api.list_regions().await?)
    }

    /// Private images owned by the account.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Provider`] when the listing fails.
    pub async fn snapshots(&self) -> Result<Vec<Resource>, LifecycleError> {
        Ok(self.api.list_images(ImageScope::Private).await?)
    }

    /// Registered SSH keys.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Provider`] when the listing fails.
    pub async fn keys(&self) -> Result<Vec<SshKey>, LifecycleError> {
        Ok(self.api.list_keys().await?)
    }
}
