//! Shared fixtures for lifecycle BDD scenarios.

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use rstest::fixture;
use skiff::test_support::{ScriptedApi, resource};
use skiff::{
    CreateDefaults, Droplet, DropletId, FileInventory, Lifecycle, LifecycleError,
    LifecycleSettings, PollPolicy,
};
use tempfile::TempDir;

pub const PUBLIC_KEY: &str = "ssh-rsa AAAAB3NzaC1yc2E behaviour@test\n";
pub const DROPLET_ID: u64 = 42;

#[derive(Clone, Debug)]
pub enum Outcome {
    Droplet(Droplet),
    Listing { sizes: usize, snapshots: usize },
    Failure(LifecycleError),
}

#[derive(Clone, Debug)]
pub struct LifecycleContext {
    pub api: ScriptedApi,
    pub inventory: FileInventory,
    pub settings: LifecycleSettings,
    /// Size the stored droplet was created at.
    pub size: String,
    /// Provider calls made before the step under test.
    pub calls_before: usize,
    /// Droplet reads served before the step under test.
    pub reads_before: usize,
    pub outcome: Option<Outcome>,
    _tmp: Arc<TempDir>,
}

impl LifecycleContext {
    pub fn lifecycle(&self) -> Lifecycle<ScriptedApi, FileInventory> {
        Lifecycle::new(
            self.api.clone(),
            self.inventory.clone(),
            self.settings.clone(),
        )
    }

    /// Marks the point after which provider traffic is inspected.
    pub fn mark(mut self) -> Self {
        self.calls_before = self.api.calls().len();
        self.reads_before = self.api.served_statuses().len();
        self
    }
}

pub fn droplet(status: &str, size: &str, ip: &str) -> Droplet {
    Droplet::new(DropletId::new(DROPLET_ID), "web", status)
        .with_size(size)
        .with_ipv4(ip)
}

#[fixture]
pub fn lifecycle_context() -> LifecycleContext {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
        .unwrap_or_else(|err| panic!("temp path should be utf8: {}", err.display()));
    let keys_dir = root.join("keys");
    std::fs::create_dir_all(&keys_dir).unwrap_or_else(|err| panic!("keys dir: {err}"));
    std::fs::write(keys_dir.join("skiff.key.pub"), PUBLIC_KEY)
        .unwrap_or_else(|err| panic!("write key: {err}"));

    let api = ScriptedApi::new();
    api.set_images(vec![resource(
        Some(6_918_990),
        Some("14.04 x64"),
        Some("ubuntu-14-04-x64"),
    )]);
    api.set_sizes(vec![
        resource(None, None, Some("512mb")),
        resource(None, None, Some("2gb")),
    ]);
    api.set_regions(vec![resource(None, Some("New York 3"), Some("nyc3"))]);

    let fast = PollPolicy::new(Duration::from_millis(1));
    LifecycleContext {
        api,
        inventory: FileInventory::new(root.join("state").join("instances.json")),
        settings: LifecycleSettings {
            action_poll: fast,
            power_poll: fast,
            defaults: CreateDefaults {
                keys_dir,
                ..CreateDefaults::default()
            },
        },
        size: String::from("512mb"),
        calls_before: 0,
        reads_before: 0,
        outcome: None,
        _tmp: Arc::new(tmp),
    }
}
