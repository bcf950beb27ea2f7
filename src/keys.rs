//! SSH key provisioning.
//!
//! Keys are registered under a name derived from a SHA-256 digest of their
//! content, so provisioning the same key twice finds the first upload
//! instead of registering a duplicate.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::backend::{NewKey, ProviderApi};
use crate::error::LifecycleError;
use crate::types::KeyId;

/// Prefix of every key name this tool registers.
pub const KEY_NAME_PREFIX: &str = "skiff-";
/// Public key used when the caller names none.
pub const DEFAULT_PUBLIC_KEY: &str = "skiff.key.pub";

/// Derives the provider-side label for a public key.
#[must_use]
pub fn hashed_key_name(key_data: &str) -> String {
    let digest = Sha256::digest(key_data.as_bytes());
    format!("{KEY_NAME_PREFIX}{digest:x}")
}

/// Resolves the public key path: absolute paths are used as given, relative
/// ones live under `keys_dir`, and no path means [`DEFAULT_PUBLIC_KEY`].
#[must_use]
pub fn normalize_key_path(path: Option<&Utf8Path>, keys_dir: &Utf8Path) -> Utf8PathBuf {
    match path {
        Some(given) if given.is_absolute() => given.to_path_buf(),
        Some(given) => keys_dir.join(given),
        None => keys_dir.join(DEFAULT_PUBLIC_KEY),
    }
}

/// Reads the raw content of a public key file.
///
/// # Errors
///
/// Returns [`LifecycleError::KeyFile`] when the file cannot be read.
pub fn read_public_key(path: &Utf8Path) -> Result<String, LifecycleError> {
    let key_error = |message: String| LifecycleError::KeyFile {
        path: path.to_path_buf(),
        message,
    };
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| key_error(String::from("path is missing a filename")))?;

    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|err| key_error(err.to_string()))?;
    dir.read_to_string(file_name)
        .map_err(|err| key_error(err.to_string()))
}

/// Returns the provider id of the key stored at `path`, uploading it first
/// when no registered key carries its hashed name.
///
/// # Errors
///
/// Returns [`LifecycleError::KeyFile`] when the key cannot be read and
/// [`LifecycleError::Provider`] when listing or uploading fails.
pub async fn ensure_key<A>(api: &A, path: &Utf8Path) -> Result<KeyId, LifecycleError>
where
    A: ProviderApi + ?Sized,
{
    let key_data = read_public_key(path)?;
    let name = hashed_key_name(&key_data);

    let keys = api.list_keys().await?;
    if let Some(existing) = keys.iter().find(|key| key.name == name) {
        info!(path = %path, key_id = %existing.id, "using SSH key");
        return Ok(existing.id);
    }

    info!(path = %path, "uploading new SSH key");
    let created = api
        .add_key(&NewKey {
            name,
            public_key: key_data,
        })
        .await?;
    Ok(created.id)
}
