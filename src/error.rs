//! Error taxonomy for lifecycle operations.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::backend::ProviderError;
use crate::config::ConfigError;
use crate::inventory::InventoryError;
use crate::resolve::ResourceKind;
use crate::types::{ActionId, DropletId};

/// Errors raised by lifecycle operations. Every variant is terminal for the
/// operation that produced it.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum LifecycleError {
    /// Raised when configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Raised when a provider call fails.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    /// Raised when an identifier does not match any catalogue entry.
    #[error("no {kind} found that matches \"{candidate}\"")]
    NoMatch {
        /// Collection that was searched.
        kind: ResourceKind,
        /// Identifier supplied by the caller.
        candidate: String,
    },
    /// Raised when a request violates policy before anything is sent.
    #[error("invalid request: {0}")]
    Validation(String),
    /// Raised when a bounded poll gives up.
    #[error("timeout waiting for {action} on {target}")]
    Timeout {
        /// What was being waited for.
        action: String,
        /// Action or droplet being polled.
        target: String,
    },
    /// Raised when the provider reports an action as errored.
    #[error("action {action_id} failed on the provider side")]
    ActionFailed {
        /// Failed action handle.
        action_id: ActionId,
    },
    /// Raised when a droplet exposes no IPv4 network.
    #[error("droplet {droplet_id} has no IPv4 network")]
    MissingIpv4 {
        /// Droplet identifier.
        droplet_id: DropletId,
    },
    /// Raised when the local public key cannot be read.
    #[error("failed to read public key {path}: {message}")]
    KeyFile {
        /// Path that was read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        message: String,
    },
    /// Raised when the inventory cannot be read or updated.
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}
