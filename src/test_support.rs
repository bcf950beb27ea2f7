//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::ready;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::{
    ApiFuture, CreateSpec, CreatedDroplet, DropletAction, ImageScope, NewKey, ProviderApi,
    ProviderError,
};
use crate::inventory::{
    DEFAULT_SSH_PORT, DEFAULT_USER, Instance, InstancePatch, Inventory, InventoryError,
};
use crate::types::{
    ActionId, ActionRecord, ActionStatus, Droplet, DropletId, KeyId, Resource, ResourceId, SshKey,
};

/// Builds a catalogue resource.
#[must_use]
pub fn resource(id: Option<u64>, name: Option<&str>, slug: Option<&str>) -> Resource {
    Resource {
        id: id.map(ResourceId::Number),
        name: name.map(str::to_owned),
        slug: slug.map(str::to_owned),
    }
}

/// Builds an inventory record backed by `droplet`, using the first IPv4
/// address when there is one.
#[must_use]
pub fn instance(name: &str, droplet: Droplet) -> Instance {
    Instance {
        name: name.to_owned(),
        ip: droplet.first_ipv4().unwrap_or_default().to_owned(),
        ssh_key: String::from("skiff.key"),
        ssh_port: DEFAULT_SSH_PORT,
        user: String::from(DEFAULT_USER),
        digitalocean: Some(droplet),
    }
}

/// A single call recorded by [`ScriptedApi`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApiCall {
    /// `create_droplet`.
    CreateDroplet(CreateSpec),
    /// `delete_droplet`.
    DeleteDroplet(DropletId),
    /// `request_action`.
    RequestAction(DropletId, DropletAction),
    /// `get_action`.
    GetAction(ActionId),
    /// `get_droplet`.
    GetDroplet(DropletId),
    /// `list_droplets`.
    ListDroplets,
    /// `list_images`.
    ListImages(ImageScope),
    /// `list_sizes`.
    ListSizes,
    /// `list_regions`.
    ListRegions,
    /// `list_keys`.
    ListKeys,
    /// `add_key`.
    AddKey(NewKey),
}

impl ApiCall {
    /// Returns true for calls that change provider state.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::CreateDroplet(_) | Self::DeleteDroplet(_) | Self::RequestAction(..) | Self::AddKey(_)
        )
    }
}

/// Provider calls that can be scripted to fail.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FailurePoint {
    /// `create_droplet`.
    CreateDroplet,
    /// `delete_droplet`.
    DeleteDroplet,
    /// `request_action`.
    RequestAction,
    /// `get_action`.
    GetAction,
    /// `get_droplet`.
    GetDroplet,
    /// Any list call.
    List,
    /// `add_key`.
    AddKey,
}

#[derive(Debug, Default)]
struct ScriptState {
    images: Vec<Resource>,
    snapshots: Vec<Resource>,
    sizes: Vec<Resource>,
    regions: Vec<Resource>,
    keys: Vec<SshKey>,
    droplets: Vec<Droplet>,
    droplet_reads: VecDeque<Droplet>,
    last_droplet: Option<Droplet>,
    served_statuses: Vec<String>,
    created: Option<Droplet>,
    action_statuses: VecDeque<ActionStatus>,
    failures: HashMap<FailurePoint, ProviderError>,
    next_id: u64,
    calls: Vec<ApiCall>,
}

impl ScriptState {
    const fn fresh_id(&mut self) -> u64 {
        self.next_id += 1;
        1000 + self.next_id
    }
}

/// Scripted provider that answers from pre-seeded state and records every
/// call in order.
///
/// `get_droplet` answers from a FIFO queue and repeats its last answer
/// once the queue is drained;
/// `get_action` answers from a FIFO queue of statuses and reports
/// `completed` once it is empty. Uploaded keys are appended to the listed
/// keys. Scripted failures apply to every call at that point.
#[derive(Clone, Debug, Default)]
pub struct ScriptedApi {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedApi {
    /// Creates a provider with empty catalogues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the listed public and private images.
    pub fn set_images(&self, images: Vec<Resource>) {
        self.lock().images = images;
    }

    /// Replaces the listed private images.
    pub fn set_snapshots(&self, snapshots: Vec<Resource>) {
        self.lock().snapshots = snapshots;
    }

    /// Replaces the listed sizes.
    pub fn set_sizes(&self, sizes: Vec<Resource>) {
        self.lock().sizes = sizes;
    }

    /// Replaces the listed regions.
    pub fn set_regions(&self, regions: Vec<Resource>) {
        self.lock().regions = regions;
    }

    /// Replaces the registered keys.
    pub fn set_keys(&self, keys: Vec<SshKey>) {
        self.lock().keys = keys;
    }

    /// Replaces the listed droplets.
    pub fn set_droplets(&self, droplets: Vec<Droplet>) {
        self.lock().droplets = droplets;
    }

    /// Sets the droplet returned by `create_droplet`.
    pub fn set_created_droplet(&self, droplet: Droplet) {
        self.lock().created = Some(droplet);
    }

    /// Queues a `get_droplet` answer.
    pub fn push_droplet(&self, droplet: Droplet) {
        self.lock().droplet_reads.push_back(droplet);
    }

    /// Queues `get_action` answers.
    pub fn push_action_statuses(&self, statuses: impl IntoIterator<Item = ActionStatus>) {
        self.lock().action_statuses.extend(statuses);
    }

    /// Makes every call at `point` fail with `error`.
    pub fn fail(&self, point: FailurePoint, error: ProviderError) {
        self.lock().failures.insert(point, error);
    }

    /// Returns every call recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    /// Returns the live status of every droplet served by `get_droplet`, in
    /// call order.
    #[must_use]
    pub fn served_statuses(&self) -> Vec<String> {
        self.lock().served_statuses.clone()
    }

    /// Returns the actions requested so far, in order.
    #[must_use]
    pub fn requested_actions(&self) -> Vec<DropletAction> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ApiCall::RequestAction(_, action) => Some(action.clone()),
                _ => None,
            })
            .collect()
    }

    fn respond<T, F>(&self, call: ApiCall, point: FailurePoint, compute: F) -> ApiFuture<'static, T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ScriptState) -> Result<T, ProviderError>,
    {
        let mut state = self.lock();
        state.calls.push(call);
        let failure = state.failures.get(&point).cloned();
        let result = failure.map_or_else(|| compute(&mut *state), Err);
        Box::pin(ready(result))
    }
}

fn unscripted(endpoint: &str, message: &str) -> ProviderError {
    ProviderError::Decode {
        endpoint: endpoint.to_owned(),
        message: message.to_owned(),
    }
}

impl ProviderApi for ScriptedApi {
    fn create_droplet<'a>(&'a self, spec: &'a CreateSpec) -> ApiFuture<'a, CreatedDroplet> {
        let name = spec.name.clone();
        self.respond(
            ApiCall::CreateDroplet(spec.clone()),
            FailurePoint::CreateDroplet,
            move |state| {
                let droplet = state
                    .created
                    .clone()
                    .unwrap_or_else(|| Droplet::new(DropletId::new(state.fresh_id()), name, "new"));
                let action_id = ActionId::new(state.fresh_id());
                Ok(CreatedDroplet {
                    droplet,
                    action_ids: vec![action_id],
                })
            },
        )
    }

    fn delete_droplet(&self, id: DropletId) -> ApiFuture<'_, ()> {
        self.respond(ApiCall::DeleteDroplet(id), FailurePoint::DeleteDroplet, |_| {
            Ok(())
        })
    }

    fn request_action<'a>(
        &'a self,
        id: DropletId,
        action: &'a DropletAction,
    ) -> ApiFuture<'a, ActionRecord> {
        let kind = action.as_str().to_owned();
        self.respond(
            ApiCall::RequestAction(id, action.clone()),
            FailurePoint::RequestAction,
            move |state| {
                Ok(ActionRecord {
                    id: ActionId::new(state.fresh_id()),
                    status: ActionStatus::InProgress,
                    kind,
                })
            },
        )
    }

    fn get_action(&self, id: ActionId) -> ApiFuture<'_, ActionRecord> {
        self.respond(ApiCall::GetAction(id), FailurePoint::GetAction, move |state| {
            Ok(ActionRecord {
                id,
                status: state
                    .action_statuses
                    .pop_front()
                    .unwrap_or(ActionStatus::Completed),
                kind: String::new(),
            })
        })
    }

    fn get_droplet(&self, id: DropletId) -> ApiFuture<'_, Droplet> {
        self.respond(ApiCall::GetDroplet(id), FailurePoint::GetDroplet, |state| {
            let next = state
                .droplet_reads
                .pop_front()
                .or_else(|| state.last_droplet.clone());
            state.last_droplet.clone_from(&next);
            if let Some(droplet) = &next {
                state.served_statuses.push(droplet.status.clone());
            }
            next.ok_or_else(|| unscripted("droplets", "no droplet scripted"))
        })
    }

    fn list_droplets(&self) -> ApiFuture<'_, Vec<Droplet>> {
        self.respond(ApiCall::ListDroplets, FailurePoint::List, |state| {
            Ok(state.droplets.clone())
        })
    }

    fn list_images(&self, scope: ImageScope) -> ApiFuture<'_, Vec<Resource>> {
        self.respond(ApiCall::ListImages(scope), FailurePoint::List, move |state| {
            Ok(match scope {
                ImageScope::All => state.images.clone(),
                ImageScope::Private => state.snapshots.clone(),
            })
        })
    }

    fn list_sizes(&self) -> ApiFuture<'_, Vec<Resource>> {
        self.respond(ApiCall::ListSizes, FailurePoint::List, |state| {
            Ok(state.sizes.clone())
        })
    }

    fn list_regions(&self) -> ApiFuture<'_, Vec<Resource>> {
        self.respond(ApiCall::ListRegions, FailurePoint::List, |state| {
            Ok(state.regions.clone())
        })
    }

    fn list_keys(&self) -> ApiFuture<'_, Vec<SshKey>> {
        self.respond(ApiCall::ListKeys, FailurePoint::List, |state| {
            Ok(state.keys.clone())
        })
    }

    fn add_key<'a>(&'a self, key: &'a NewKey) -> ApiFuture<'a, SshKey> {
        let new_key = key.clone();
        self.respond(ApiCall::AddKey(key.clone()), FailurePoint::AddKey, move |state| {
            let created = SshKey {
                id: KeyId::new(state.fresh_id()),
                name: new_key.name,
                fingerprint: None,
                public_key: Some(new_key.public_key),
            };
            state.keys.push(created.clone());
            Ok(created)
        })
    }
}

/// Inventory held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryInventory {
    records: Arc<Mutex<BTreeMap<String, Instance>>>,
}

impl MemoryInventory {
    /// Creates an inventory seeded with `instances`.
    #[must_use]
    pub fn with_instances(instances: impl IntoIterator<Item = Instance>) -> Self {
        let records = instances
            .into_iter()
            .map(|inst| (inst.name.clone(), inst))
            .collect();
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Instance>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of the record stored under `name`.
    #[must_use]
    pub fn snapshot(&self, name: &str) -> Option<Instance> {
        self.lock().get(name).cloned()
    }
}

impl Inventory for MemoryInventory {
    fn get(&self, name: &str) -> Result<Option<Instance>, InventoryError> {
        Ok(self.snapshot(name))
    }

    fn update(&self, name: &str, patch: InstancePatch) -> Result<(), InventoryError> {
        let mut records = self.lock();
        let record = records
            .get_mut(name)
            .ok_or_else(|| InventoryError::UnknownInstance {
                name: name.to_owned(),
            })?;
        patch.apply(record);
        Ok(())
    }
}
