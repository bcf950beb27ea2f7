//! Disruptive actions that require the droplet to be powered off.

use crate::backend::{DropletAction, ProviderApi};
use crate::error::LifecycleError;
use crate::inventory::{Instance, Inventory};
use crate::types::Droplet;

use super::Lifecycle;
use super::size::is_disk_increase;

impl<A, I> Lifecycle<A, I>
where
    A: ProviderApi,
    I: Inventory,
{
    /// Reinstalls the droplet from `image` after powering it off.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Lifecycle::ensure_powered_off`] and of the
    /// rebuild action.
    pub async fn rebuild(&self, instance: &Instance, image: &str) -> Result<Droplet, LifecycleError> {
        self.ensure_powered_off(instance).await?;
        self.run_action(
            instance,
            &DropletAction::Rebuild {
                image: image.to_owned(),
            },
        )
        .await
    }

    /// Grows the droplet, disk included, to `size` after powering it off.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] before any provider call when
    /// `size` is not a strict disk increase over the cached size, and the
    /// errors of [`Lifecycle::ensure_powered_off`] and of the resize action
    /// otherwise.
    pub async fn resize(&self, instance: &Instance, size: &str) -> Result<Droplet, LifecycleError> {
        let current = instance
            .digitalocean
            .as_ref()
            .and_then(Droplet::current_size_slug)
            .ok_or_else(|| {
                LifecycleError::Validation(format!(
                    "instance {} has no recorded size",
                    instance.name
                ))
            })?;
        if !is_disk_increase(current, size) {
            return Err(LifecycleError::Validation(format!(
                "you can only increase the size of the disk image ({current})"
            )));
        }

        self.ensure_powered_off(instance).await?;
        self.run_action(
            instance,
            &DropletAction::Resize {
                disk: true,
                size: size.to_owned(),
            },
        )
        .await
    }

    /// Takes a snapshot called `name` after powering the droplet off.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Lifecycle::ensure_powered_off`] and of the
    /// snapshot action.
    pub async fn snapshot(&self, instance: &Instance, name: &str) -> Result<Droplet, LifecycleError> {
        self.ensure_powered_off(instance).await?;
        self.run_action(
            instance,
            &DropletAction::Snapshot {
                name: name.to_owned(),
            },
        )
        .await
    }
}
