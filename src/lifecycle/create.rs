//! Droplet creation.

use camino::Utf8PathBuf;
use tracing::info;

use crate::backend::{CreateSpec, ImageScope, ProviderApi, ProviderError};
use crate::error::LifecycleError;
use crate::inventory::{Instance, Inventory};
use crate::keys::{ensure_key, normalize_key_path};
use crate::poll::await_action;
use crate::resolve::{ResourceKind, resolve};
use crate::types::Resource;

use super::Lifecycle;

/// Caller-supplied parameters for a new droplet. Unset fields fall back to
/// the lifecycle's [`CreateDefaults`](super::CreateDefaults).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CreateRequest {
    /// Droplet and inventory name.
    pub name: String,
    /// Image id, name or slug.
    pub image: Option<String>,
    /// Size id, name or slug.
    pub size: Option<String>,
    /// Region id, name or slug.
    pub region: Option<String>,
    /// Public key to install, absolute or relative to the keys directory.
    pub public_key: Option<Utf8PathBuf>,
    /// Private key name recorded on the instance.
    pub ssh_key: Option<String>,
    /// SSH port recorded on the instance.
    pub ssh_port: Option<u16>,
    /// Enables provider-side backups.
    pub backups: bool,
    /// Enables private networking.
    pub private_networking: bool,
}

impl CreateRequest {
    /// Starts a request for a droplet called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the image.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Sets the size.
    #[must_use]
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    /// Sets the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the public key path.
    #[must_use]
    pub fn with_public_key(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.public_key = Some(path.into());
        self
    }
}

/// Resolves `candidate` and returns the value the provider expects for it.
fn slug_for(
    collection: &[Resource],
    candidate: &str,
    kind: ResourceKind,
) -> Result<String, LifecycleError> {
    resolve(collection, candidate, kind)?
        .canonical_slug()
        .ok_or_else(|| {
            LifecycleError::Validation(format!("{kind} \"{candidate}\" has neither slug nor id"))
        })
}

impl<A, I> Lifecycle<A, I>
where
    A: ProviderApi,
    I: Inventory,
{
    /// Creates a droplet and returns the inventory record describing it.
    ///
    /// Image, size and region are resolved in that order, each against a
    /// fresh listing, and the first that cannot be matched stops the call
    /// before anything is created. The SSH key is then provisioned, the
    /// droplet created, and its first action awaited before the final
    /// record is read back. The returned instance is not stored; adding it
    /// to the inventory is up to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] for an empty name,
    /// [`LifecycleError::NoMatch`] for unresolvable identifiers,
    /// [`LifecycleError::KeyFile`] when the public key cannot be read, and
    /// the errors of the provider calls and the action wait otherwise.
    pub async fn create(&self, request: &CreateRequest) -> Result<Instance, LifecycleError> {
        if request.name.trim().is_empty() {
            return Err(LifecycleError::Validation(String::from(
                "a droplet name is required",
            )));
        }
        let defaults = &self.settings.defaults;

        let image_candidate = request.image.as_deref().unwrap_or(&defaults.image);
        let images = self.api.list_images(ImageScope::All).await?;
        let image = slug_for(&images, image_candidate, ResourceKind::Image)?;

        let size_candidate = request.size.as_deref().unwrap_or(&defaults.size);
        let sizes = self.api.list_sizes().await?;
        let size = slug_for(&sizes, size_candidate, ResourceKind::Size)?;

        let region_candidate = request.region.as_deref().unwrap_or(&defaults.region);
        let regions = self.api.list_regions().await?;
        let region = slug_for(&regions, region_candidate, ResourceKind::Region)?;

        let key_path = normalize_key_path(request.public_key.as_deref(), &defaults.keys_dir);
        let key_id = ensure_key(&self.api, &key_path).await?;

        let spec = CreateSpec {
            backups: request.backups,
            name: request.name.clone(),
            private_networking: request.private_networking,
            ssh_keys: vec![key_id],
            image,
            size,
            region,
        };
        info!(
            name = %spec.name,
            image = %spec.image,
            size = %spec.size,
            region = %spec.region,
            "creating droplet"
        );
        let created = self.api.create_droplet(&spec).await?;
        let action_id =
            created
                .action_ids
                .first()
                .copied()
                .ok_or_else(|| ProviderError::Decode {
                    endpoint: String::from("droplets"),
                    message: String::from("create response listed no actions"),
                })?;

        info!(droplet_id = %created.droplet.id, action_id = %action_id, "waiting for droplet");
        await_action(&self.api, action_id, &self.settings.action_poll).await?;

        let droplet = self.api.get_droplet(created.droplet.id).await?;
        let ip = droplet
            .first_ipv4()
            .ok_or(LifecycleError::MissingIpv4 {
                droplet_id: droplet.id,
            })?
            .to_owned();

        Ok(Instance {
            name: droplet.name.clone(),
            ip,
            ssh_key: request
                .ssh_key
                .clone()
                .unwrap_or_else(|| defaults.ssh_key.clone()),
            ssh_port: request.ssh_port.unwrap_or(defaults.ssh_port),
            user: defaults.user.clone(),
            digitalocean: Some(droplet),
        })
    }
}
