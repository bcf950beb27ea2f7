//! Command-line interface definitions for the `skiff` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Args, Parser};

/// Top-level CLI for the `skiff` binary.
#[derive(Debug, Parser)]
#[command(
    name = "skiff",
    version,
    about = "Create, resize, snapshot and destroy DigitalOcean droplets",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Create a droplet and add it to the inventory.
    #[command(name = "create", about = "Create a droplet and add it to the inventory")]
    Create(CreateCommand),
    /// Destroy a droplet and remove it from the inventory.
    #[command(name = "destroy", about = "Destroy a droplet and remove it from the inventory")]
    Destroy(InstanceArg),
    /// Power a droplet on.
    #[command(name = "boot", about = "Power a droplet on")]
    Boot(InstanceArg),
    /// Shut a droplet down gracefully.
    #[command(name = "shutdown", about = "Shut a droplet down gracefully")]
    Shutdown(InstanceArg),
    /// Reboot a droplet gracefully.
    #[command(name = "reboot", about = "Reboot a droplet gracefully")]
    Reboot(InstanceArg),
    /// Reinstall a droplet from an image, powering it off first.
    #[command(name = "rebuild", about = "Reinstall a droplet from an image")]
    Rebuild(RebuildCommand),
    /// Grow a droplet and its disk, powering it off first.
    #[command(name = "resize", about = "Grow a droplet and its disk")]
    Resize(ResizeCommand),
    /// Snapshot a droplet, powering it off first.
    #[command(name = "snapshot", about = "Snapshot a droplet")]
    Snapshot(SnapshotCommand),
    /// Refresh the cached address and provider record of an instance.
    #[command(name = "sync", about = "Refresh cached instance metadata")]
    Sync(InstanceArg),
    /// List every droplet on the account.
    #[command(name = "instances", about = "List droplets on the account")]
    Instances,
    /// List available images.
    #[command(name = "images", about = "List available images")]
    Images,
    /// List droplet sizes.
    #[command(name = "sizes", about = "List droplet sizes")]
    Sizes,
    /// List regions.
    #[command(name = "regions", about = "List regions")]
    Regions,
    /// List private snapshot images.
    #[command(name = "snapshots", about = "List private snapshot images")]
    Snapshots,
    /// List registered SSH keys.
    #[command(name = "keys", about = "List registered SSH keys")]
    Keys,
}

/// Names the inventory entry an operation acts on.
#[derive(Debug, Args)]
pub(crate) struct InstanceArg {
    /// Inventory name of the instance.
    #[arg(value_name = "NAME")]
    pub(crate) name: String,
}

/// Arguments for the `skiff create` subcommand.
#[derive(Debug, Args)]
pub(crate) struct CreateCommand {
    /// Droplet and inventory name.
    #[arg(value_name = "NAME")]
    pub(crate) name: String,
    /// Image id, name or slug. Defaults to the configured image.
    #[arg(
        long,
        value_name = "IMAGE",
        visible_aliases = ["image-id", "image-slug", "image-name"]
    )]
    pub(crate) image: Option<String>,
    /// Size id, name or slug. Defaults to the configured size.
    #[arg(
        long,
        value_name = "SIZE",
        visible_aliases = ["size-id", "size-slug", "size-name"]
    )]
    pub(crate) size: Option<String>,
    /// Region id, name or slug. Defaults to the configured region.
    #[arg(
        long,
        value_name = "REGION",
        visible_aliases = ["region-id", "region-slug", "region-name"]
    )]
    pub(crate) region: Option<String>,
    /// Public key to install, absolute or relative to the keys directory.
    #[arg(long, value_name = "PATH")]
    pub(crate) ssh_pub_key: Option<String>,
    /// Private key name recorded in the inventory.
    #[arg(long, value_name = "KEY")]
    pub(crate) ssh_key: Option<String>,
    /// SSH port recorded in the inventory.
    #[arg(long, value_name = "PORT")]
    pub(crate) ssh_port: Option<u16>,
    /// Enable provider-side backups.
    #[arg(long)]
    pub(crate) backups_enabled: bool,
    /// Enable private networking.
    #[arg(long)]
    pub(crate) private_networking: bool,
}

/// Arguments for the `skiff rebuild` subcommand.
#[derive(Debug, Args)]
pub(crate) struct RebuildCommand {
    /// Inventory name of the instance.
    #[arg(value_name = "NAME")]
    pub(crate) name: String,
    /// Image id or slug to reinstall from.
    #[arg(value_name = "IMAGE")]
    pub(crate) image: String,
}

/// Arguments for the `skiff resize` subcommand.
#[derive(Debug, Args)]
pub(crate) struct ResizeCommand {
    /// Inventory name of the instance.
    #[arg(value_name = "NAME")]
    pub(crate) name: String,
    /// Target size slug; must be larger than the current one.
    #[arg(value_name = "SIZE")]
    pub(crate) size: String,
}

/// Arguments for the `skiff snapshot` subcommand.
#[derive(Debug, Args)]
pub(crate) struct SnapshotCommand {
    /// Inventory name of the instance.
    #[arg(value_name = "NAME")]
    pub(crate) name: String,
    /// Name of the snapshot image.
    #[arg(value_name = "SNAPSHOT")]
    pub(crate) snapshot_name: String,
}
