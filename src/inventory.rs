//! Local instance inventory.
//!
//! The lifecycle only ever reads an [`Instance`] and merges refreshed
//! metadata into it through [`Inventory::update`]. Adding and removing
//! entries is the caller's business; [`FileInventory`] offers those for
//! the CLI.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Droplet, DropletId};

/// Default SSH port recorded for new instances.
pub const DEFAULT_SSH_PORT: u16 = 22;
/// Default login user recorded for new instances.
pub const DEFAULT_USER: &str = "root";

/// Locally persisted instance record.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Instance {
    /// Unique inventory key.
    pub name: String,
    /// Cached public address.
    pub ip: String,
    /// Private key used to connect.
    pub ssh_key: String,
    /// SSH port.
    pub ssh_port: u16,
    /// Login user.
    pub user: String,
    /// Cached provider record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digitalocean: Option<Droplet>,
}

impl Instance {
    /// Provider identifier of the backing droplet, when the instance is
    /// managed by this provider.
    #[must_use]
    pub fn droplet_id(&self) -> Option<DropletId> {
        self.digitalocean.as_ref().map(|droplet| droplet.id)
    }
}

/// Fields merged into an existing record. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstancePatch {
    /// Replacement address.
    pub ip: Option<String>,
    /// Replacement provider record.
    pub digitalocean: Option<Droplet>,
}

impl InstancePatch {
    /// Applies the patch in place.
    pub fn apply(self, instance: &mut Instance) {
        if let Some(ip) = self.ip {
            instance.ip = ip;
        }
        if let Some(droplet) = self.digitalocean {
            instance.digitalocean = Some(droplet);
        }
    }
}

/// Errors raised by inventory stores.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum InventoryError {
    /// Raised when an update targets a name that is not stored.
    #[error("instance {name} is not in the inventory")]
    UnknownInstance {
        /// Requested name.
        name: String,
    },
    /// Raised when an insert would overwrite an existing entry.
    #[error("instance {name} already exists in the inventory")]
    DuplicateInstance {
        /// Conflicting name.
        name: String,
    },
    /// Raised when file system operations fail.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when stored content cannot be parsed or rendered.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path of the inventory file.
        path: Utf8PathBuf,
        /// Parser error message.
        message: String,
    },
}

/// Read and merge access to the instance inventory.
pub trait Inventory: Send + Sync {
    /// Returns the record stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError`] when the store cannot be read.
    fn get(&self, name: &str) -> Result<Option<Instance>, InventoryError>;

    /// Merges `patch` into the record stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::UnknownInstance`] when no such record
    /// exists, or another [`InventoryError`] when the store cannot be
    /// written.
    fn update(&self, name: &str, patch: InstancePatch) -> Result<(), InventoryError>;
}

type Records = BTreeMap<String, Instance>;

/// Inventory persisted as a JSON object keyed by instance name.
///
/// Clones share one lock, so read-modify-write cycles issued through any
/// clone are serialised. Each write lands in a sibling temporary file that
/// is then renamed over the inventory, so readers never see a partial file.
#[derive(Clone, Debug)]
pub struct FileInventory {
    path: Utf8PathBuf,
    lock: Arc<Mutex<WriteLock>>,
}

/// Zero-sized token guarded by the inventory lock.
#[derive(Debug)]
struct WriteLock;

impl FileInventory {
    /// Creates a store backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(WriteLock)),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns every stored record ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError`] when the file cannot be read or parsed.
    pub fn list(&self) -> Result<Vec<Instance>, InventoryError> {
        let _guard = self.exclusive();
        Ok(self.load()?.into_values().collect())
    }

    /// Adds a new record.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::DuplicateInstance`] when the name is taken.
    pub fn insert(&self, instance: Instance) -> Result<(), InventoryError> {
        let _guard = self.exclusive();
        let mut records = self.load()?;
        if records.contains_key(&instance.name) {
            return Err(InventoryError::DuplicateInstance {
                name: instance.name,
            });
        }
        records.insert(instance.name.clone(), instance);
        self.store(&records)
    }

    /// Removes a record, returning it when present.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError`] when the file cannot be read or written.
    pub fn remove(&self, name: &str) -> Result<Option<Instance>, InventoryError> {
        let _guard = self.exclusive();
        let mut records = self.load()?;
        let removed = records.remove(name);
        if removed.is_some() {
            self.store(&records)?;
        }
        Ok(removed)
    }

    fn exclusive(&self) -> MutexGuard<'_, WriteLock> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn file_name(&self) -> Result<&str, InventoryError> {
        self.path.file_name().ok_or_else(|| InventoryError::Io {
            path: self.path.clone(),
            message: String::from("inventory path is missing a filename"),
        })
    }

    fn parent(&self) -> &Utf8Path {
        match self.path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        }
    }

    fn io_error(&self, err: &io::Error) -> InventoryError {
        InventoryError::Io {
            path: self.path.clone(),
            message: err.to_string(),
        }
    }

    fn load(&self) -> Result<Records, InventoryError> {
        let file_name = self.file_name()?;
        let dir = match Dir::open_ambient_dir(self.parent(), ambient_authority()) {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Records::new()),
            Err(err) => return Err(self.io_error(&err)),
        };

        let contents = match dir.read_to_string(file_name) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Records::new()),
            Err(err) => return Err(self.io_error(&err)),
        };

        if contents.trim().is_empty() {
            return Ok(Records::new());
        }

        serde_json::from_str(&contents).map_err(|err| InventoryError::Parse {
            path: self.path.clone(),
            message: err.to_string(),
        })
    }

    fn store(&self, records: &Records) -> Result<(), InventoryError> {
        let file_name = self.file_name()?;
        let parent = self.parent();
        Dir::create_ambient_dir_all(parent, ambient_authority())
            .map_err(|err| self.io_error(&err))?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority())
            .map_err(|err| self.io_error(&err))?;

        let rendered =
            serde_json::to_string_pretty(records).map_err(|err| InventoryError::Parse {
                path: self.path.clone(),
                message: err.to_string(),
            })?;

        let staging = format!(".{file_name}.tmp");
        dir.write(&staging, rendered)
            .map_err(|err| self.io_error(&err))?;
        dir.rename(&staging, &dir, file_name)
            .map_err(|err| self.io_error(&err))
    }
}

impl Inventory for FileInventory {
    fn get(&self, name: &str) -> Result<Option<Instance>, InventoryError> {
        let _guard = self.exclusive();
        Ok(self.load()?.remove(name))
    }

    fn update(&self, name: &str, patch: InstancePatch) -> Result<(), InventoryError> {
        let _guard = self.exclusive();
        let mut records = self.load()?;
        let record = records
            .get_mut(name)
            .ok_or_else(|| InventoryError::UnknownInstance {
                name: name.to_owned(),
            })?;
        patch.apply(record);
        self.store(&records)
    }
}
