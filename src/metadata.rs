//! Refreshes cached instance metadata from the provider's canonical record.

use tracing::debug;

use crate::backend::ProviderApi;
use crate::error::LifecycleError;
use crate::inventory::{Instance, InstancePatch, Inventory};
use crate::types::Droplet;

/// Re-reads the droplet behind `instance` and overwrites the cached `ip`
/// and provider record in the inventory. Returns the fresh record.
///
/// # Errors
///
/// Returns [`LifecycleError::Validation`] when the instance has no provider
/// record, [`LifecycleError::Provider`] when the read fails,
/// [`LifecycleError::MissingIpv4`] when the droplet has no IPv4 network, and
/// [`LifecycleError::Inventory`] when the update is rejected.
pub async fn refresh<A, I>(
    api: &A,
    inventory: &I,
    instance: &Instance,
) -> Result<Droplet, LifecycleError>
where
    A: ProviderApi + ?Sized,
    I: Inventory + ?Sized,
{
    let droplet_id = instance.droplet_id().ok_or_else(|| {
        LifecycleError::Validation(format!(
            "instance {} has no DigitalOcean record",
            instance.name
        ))
    })?;

    let droplet = api.get_droplet(droplet_id).await?;
    let ip = droplet
        .first_ipv4()
        .ok_or(LifecycleError::MissingIpv4 { droplet_id })?
        .to_owned();

    debug!(instance = %instance.name, ip = %ip, status = %droplet.status, "refreshing metadata");
    inventory.update(
        &instance.name,
        InstancePatch {
            ip: Some(ip),
            digitalocean: Some(droplet.clone()),
        },
    )?;
    Ok(droplet)
}
