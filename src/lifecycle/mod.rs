//! Droplet lifecycle operations.
//!
//! Each public method on [`Lifecycle`] is one self-contained execution:
//! it issues provider requests in a fixed order, waits for the resulting
//! action to complete, and refreshes the cached metadata of the instance
//! it touched. Nothing is retried except "not yet complete" poll answers.

mod catalog;
mod create;
mod maintenance;
mod power;
mod size;

use camino::Utf8PathBuf;
use tracing::info;

use crate::backend::ProviderApi;
use crate::config::DigitalOceanConfig;
use crate::error::LifecycleError;
use crate::inventory::{DEFAULT_SSH_PORT, DEFAULT_USER, Instance, Inventory};
use crate::metadata;
use crate::poll::{DEFAULT_ACTION_INTERVAL, DEFAULT_POWER_INTERVAL, PollPolicy};
use crate::types::{Droplet, DropletId};

pub use create::CreateRequest;
pub use size::{is_disk_increase, normalize_size};

/// Private key name recorded on new instances when the caller names none.
pub const DEFAULT_SSH_KEY: &str = "skiff.key";

/// Values applied to create requests that leave a field unset.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreateDefaults {
    /// Image id, name or slug.
    pub image: String,
    /// Size slug.
    pub size: String,
    /// Region id, name or slug.
    pub region: String,
    /// Directory that relative public key paths live under.
    pub keys_dir: Utf8PathBuf,
    /// Private key name recorded on the instance.
    pub ssh_key: String,
    /// SSH port recorded on the instance.
    pub ssh_port: u16,
    /// Login user recorded on the instance.
    pub user: String,
}

impl Default for CreateDefaults {
    fn default() -> Self {
        Self {
            image: String::from("ubuntu-14-04-x64"),
            size: String::from("512mb"),
            region: String::from("nyc3"),
            keys_dir: Utf8PathBuf::from(".skiff/keys"),
            ssh_key: String::from(DEFAULT_SSH_KEY),
            ssh_port: DEFAULT_SSH_PORT,
            user: String::from(DEFAULT_USER),
        }
    }
}

/// Poll policies and create defaults used by every operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LifecycleSettings {
    /// Policy for action completion waits.
    pub action_poll: PollPolicy,
    /// Policy for power-off waits.
    pub power_poll: PollPolicy,
    /// Defaults for create requests.
    pub defaults: CreateDefaults,
}

impl LifecycleSettings {
    /// Derives settings from loaded configuration.
    #[must_use]
    pub fn from_config(config: &DigitalOceanConfig) -> Self {
        Self {
            action_poll: config.action_poll_policy(),
            power_poll: config.power_poll_policy(),
            defaults: CreateDefaults {
                image: config.default_image.clone(),
                size: config.default_size.clone(),
                region: config.default_region.clone(),
                keys_dir: config.keys_dir(),
                ..CreateDefaults::default()
            },
        }
    }
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            action_poll: PollPolicy::new(DEFAULT_ACTION_INTERVAL),
            power_poll: PollPolicy::new(DEFAULT_POWER_INTERVAL),
            defaults: CreateDefaults::default(),
        }
    }
}

/// Orchestrates droplet operations over a provider and an inventory.
#[derive(Clone, Debug)]
pub struct Lifecycle<A, I> {
    api: A,
    inventory: I,
    settings: LifecycleSettings,
}

impl<A, I> Lifecycle<A, I>
where
    A: ProviderApi,
    I: Inventory,
{
    /// Wires a lifecycle from its collaborators.
    #[must_use]
    pub const fn new(api: A, inventory: I, settings: LifecycleSettings) -> Self {
        Self {
            api,
            inventory,
            settings,
        }
    }

    /// Provider used for every call.
    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Inventory refreshed after state changes.
    #[must_use]
    pub const fn inventory(&self) -> &I {
        &self.inventory
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    /// Deletes the droplet behind `instance`. Returns once the provider
    /// accepts the request; the teardown itself is not awaited.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] for unmanaged instances and
    /// [`LifecycleError::Provider`] when the request fails.
    pub async fn destroy(&self, instance: &Instance) -> Result<(), LifecycleError> {
        let droplet_id = managed_droplet(instance)?;
        info!(instance = %instance.name, droplet_id = %droplet_id, "destroying droplet");
        self.api.delete_droplet(droplet_id).await?;
        Ok(())
    }

    /// Refreshes the cached address and provider record of `instance`.
    ///
    /// # Errors
    ///
    /// Propagates the failures of [`metadata::refresh`].
    pub async fn sync(&self, instance: &Instance) -> Result<Droplet, LifecycleError> {
        metadata::refresh(&self.api, &self.inventory, instance).await
    }
}

/// Returns the droplet id of an instance managed by this provider.
fn managed_droplet(instance: &Instance) -> Result<DropletId, LifecycleError> {
    instance.droplet_id().ok_or_else(|| {
        LifecycleError::Validation(format!(
            "instance {} has no DigitalOcean record",
            instance.name
        ))
    })
}

#[cfg(test)]
mod tests;
