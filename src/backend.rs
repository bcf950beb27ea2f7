//! Provider API abstraction used by the orchestration core.
//!
//! Every call the lifecycle makes against DigitalOcean goes through
//! [`ProviderApi`], so the HTTP client and the scripted test double are
//! interchangeable.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use thiserror::Error;

use crate::types::{ActionId, ActionRecord, Droplet, DropletId, KeyId, Resource, SshKey};

/// Fully normalised parameters for droplet creation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CreateSpec {
    /// Whether provider-side backups are enabled.
    pub backups: bool,
    /// Droplet name.
    pub name: String,
    /// Whether private networking is enabled.
    pub private_networking: bool,
    /// SSH keys installed for the root user.
    pub ssh_keys: Vec<KeyId>,
    /// Resolved image slug.
    pub image: String,
    /// Resolved size slug.
    pub size: String,
    /// Resolved region slug.
    pub region: String,
}

/// Response to a create request: the new droplet and the actions it spawned.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreatedDroplet {
    /// Droplet record as returned by the create call.
    pub droplet: Droplet,
    /// Action handles listed under `links.actions`.
    pub action_ids: Vec<ActionId>,
}

/// Droplet actions the lifecycle issues.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DropletAction {
    /// Power the droplet on.
    PowerOn,
    /// Graceful shutdown.
    Shutdown,
    /// Graceful reboot.
    Reboot,
    /// Reinstall from an image.
    Rebuild {
        /// Target image id or slug.
        image: String,
    },
    /// Change the droplet size.
    Resize {
        /// Whether the disk grows as well as CPU and memory.
        disk: bool,
        /// Target size slug.
        size: String,
    },
    /// Take a snapshot image.
    Snapshot {
        /// Snapshot name.
        name: String,
    },
}

impl DropletAction {
    /// Returns the provider's name for the action.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PowerOn => "power_on",
            Self::Shutdown => "shutdown",
            Self::Reboot => "reboot",
            Self::Rebuild { .. } => "rebuild",
            Self::Resize { .. } => "resize",
            Self::Snapshot { .. } => "snapshot",
        }
    }
}

impl fmt::Display for DropletAction {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Payload for registering a new SSH key.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct NewKey {
    /// Label used for idempotent lookup.
    pub name: String,
    /// Raw public key content.
    pub public_key: String,
}

/// Which images to list.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ImageScope {
    /// Public distribution and application images plus private ones.
    All,
    /// Only images owned by the account (snapshots and backups).
    Private,
}

/// Errors raised by provider calls.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProviderError {
    /// The request never produced a response.
    #[error("request to {endpoint} failed: {message}")]
    Transport {
        /// Endpoint that was called.
        endpoint: String,
        /// Transport error message.
        message: String,
    },
    /// The provider answered with an error status or error message.
    #[error("DigitalOcean API error from {endpoint} (status {status}): {message}")]
    Api {
        /// Endpoint that was called.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Message returned by the provider.
        message: String,
    },
    /// The response could not be interpreted.
    #[error("unexpected response from {endpoint}: {message}")]
    Decode {
        /// Endpoint that was called.
        endpoint: String,
        /// Parser or shape error.
        message: String,
    },
}

/// Future returned by provider calls.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Black-box RPC surface of the provider.
pub trait ProviderApi: Send + Sync {
    /// Creates a droplet.
    fn create_droplet<'a>(&'a self, spec: &'a CreateSpec) -> ApiFuture<'a, CreatedDroplet>;

    /// Deletes a droplet.
    fn delete_droplet(&self, id: DropletId) -> ApiFuture<'_, ()>;

    /// Requests an action on a droplet and returns the in-flight record.
    fn request_action<'a>(
        &'a self,
        id: DropletId,
        action: &'a DropletAction,
    ) -> ApiFuture<'a, ActionRecord>;

    /// Fetches the current state of an action.
    fn get_action(&self, id: ActionId) -> ApiFuture<'_, ActionRecord>;

    /// Fetches the canonical droplet record.
    fn get_droplet(&self, id: DropletId) -> ApiFuture<'_, Droplet>;

    /// Lists every droplet on the account.
    fn list_droplets(&self) -> ApiFuture<'_, Vec<Droplet>>;

    /// Lists images in the given scope.
    fn list_images(&self, scope: ImageScope) -> ApiFuture<'_, Vec<Resource>>;

    /// Lists droplet sizes.
    fn list_sizes(&self) -> ApiFuture<'_, Vec<Resource>>;

    /// Lists regions.
    fn list_regions(&self) -> ApiFuture<'_, Vec<Resource>>;

    /// Lists registered SSH keys.
    fn list_keys(&self) -> ApiFuture<'_, Vec<SshKey>>;

    /// Registers a new SSH key.
    fn add_key<'a>(&'a self, key: &'a NewKey) -> ApiFuture<'a, SshKey>;
}
