//! Power actions and the powered-off precondition.

use tracing::{debug, info};

use crate::backend::{DropletAction, ProviderApi};
use crate::error::LifecycleError;
use crate::inventory::{Instance, Inventory};
use crate::metadata;
use crate::poll::{await_action, await_power_off};
use crate::types::Droplet;

use super::{Lifecycle, managed_droplet};

impl<A, I> Lifecycle<A, I>
where
    A: ProviderApi,
    I: Inventory,
{
    /// Requests `action`, waits for it to complete, and refreshes the
    /// instance's cached metadata.
    pub(super) async fn run_action(
        &self,
        instance: &Instance,
        action: &DropletAction,
    ) -> Result<Droplet, LifecycleError> {
        let droplet_id = managed_droplet(instance)?;
        info!(instance = %instance.name, droplet_id = %droplet_id, action = %action, "requesting action");
        let record = self.api.request_action(droplet_id, action).await?;
        await_action(&self.api, record.id, &self.settings.action_poll).await?;
        metadata::refresh(&self.api, &self.inventory, instance).await
    }

    /// Powers the droplet on.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] for unmanaged instances and
    /// the errors of the action request, wait and refresh otherwise.
    pub async fn boot(&self, instance: &Instance) -> Result<Droplet, LifecycleError> {
        self.run_action(instance, &DropletAction::PowerOn).await
    }

    /// Shuts the droplet down gracefully.
    ///
    /// # Errors
    ///
    /// As for [`Lifecycle::boot`].
    pub async fn shutdown(&self, instance: &Instance) -> Result<Droplet, LifecycleError> {
        self.run_action(instance, &DropletAction::Shutdown).await
    }

    /// Reboots the droplet gracefully.
    ///
    /// # Errors
    ///
    /// As for [`Lifecycle::boot`].
    pub async fn reboot(&self, instance: &Instance) -> Result<Droplet, LifecycleError> {
        self.run_action(instance, &DropletAction::Reboot).await
    }

    /// Makes sure the droplet is off before a disruptive action.
    ///
    /// A droplet that already reads `off` is left alone. Otherwise a full
    /// [`Lifecycle::shutdown`] runs and the droplet is then polled until its
    /// live status reads `off`.
    ///
    /// # Errors
    ///
    /// Returns the errors of the status read, the shutdown, or the power-off
    /// wait.
    pub async fn ensure_powered_off(&self, instance: &Instance) -> Result<(), LifecycleError> {
        let droplet_id = managed_droplet(instance)?;
        let droplet = self.api.get_droplet(droplet_id).await?;
        if droplet.is_off() {
            debug!(droplet_id = %droplet_id, "droplet already off");
            return Ok(());
        }

        info!(instance = %instance.name, status = %droplet.status, "shutting down before continuing");
        self.shutdown(instance).await?;
        await_power_off(&self.api, droplet_id, &self.settings.power_poll).await?;
        Ok(())
    }
}
