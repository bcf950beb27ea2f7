//! Core library for the skiff DigitalOcean droplet tool.
//!
//! The crate drives droplets through create, power, rebuild, resize,
//! snapshot and destroy operations. Every state change is followed by a
//! wait on the provider's asynchronous action and a refresh of the locally
//! cached instance record. Provider access sits behind [`ProviderApi`], with
//! [`DigitalOceanClient`] as the HTTP implementation.

pub mod backend;
pub mod config;
pub mod digitalocean;
pub mod error;
pub mod inventory;
pub mod keys;
pub mod lifecycle;
pub mod metadata;
pub mod poll;
pub mod resolve;
pub mod test_support;
pub mod types;

pub use backend::{
    ApiFuture, CreateSpec, CreatedDroplet, DropletAction, ImageScope, NewKey, ProviderApi,
    ProviderError,
};
pub use config::{ConfigError, DigitalOceanConfig};
pub use digitalocean::DigitalOceanClient;
pub use error::LifecycleError;
pub use inventory::{FileInventory, Instance, InstancePatch, Inventory, InventoryError};
pub use lifecycle::{CreateDefaults, CreateRequest, Lifecycle, LifecycleSettings};
pub use poll::PollPolicy;
pub use resolve::{ResourceKind, resolve};
pub use types::{
    ActionId, ActionRecord, ActionStatus, Droplet, DropletId, KeyId, Resource, ResourceId, SshKey,
};
