//! Unit tests for lifecycle sequencing.

use std::time::Duration;

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::backend::{CreateSpec, DropletAction, ImageScope};
use crate::keys::hashed_key_name;
use crate::resolve::ResourceKind;
use crate::test_support::{ApiCall, MemoryInventory, ScriptedApi, instance, resource};
use crate::types::{ActionId, ActionStatus, KeyId};

const PUBLIC_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIB skiff@test\n";

struct Harness {
    _tmp: TempDir,
    api: ScriptedApi,
    inventory: MemoryInventory,
    lifecycle: Lifecycle<ScriptedApi, MemoryInventory>,
}

fn fast_settings(keys_dir: Utf8PathBuf) -> LifecycleSettings {
    let fast = PollPolicy::new(Duration::from_millis(1));
    LifecycleSettings {
        action_poll: fast,
        power_poll: fast,
        defaults: CreateDefaults {
            keys_dir,
            ..CreateDefaults::default()
        },
    }
}

fn build(instances: Vec<Instance>) -> Harness {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let keys_dir = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
        .unwrap_or_else(|err| panic!("temp path should be utf8: {}", err.display()));
    std::fs::write(keys_dir.join("skiff.key.pub"), PUBLIC_KEY)
        .unwrap_or_else(|err| panic!("write key: {err}"));

    let api = ScriptedApi::new();
    api.set_images(vec![
        resource(Some(6_918_990), Some("14.04 x64"), Some("ubuntu-14-04-x64")),
        resource(Some(7_000_001), Some("nightly"), None),
    ]);
    api.set_sizes(vec![
        resource(None, None, Some("512mb")),
        resource(None, None, Some("1gb")),
    ]);
    api.set_regions(vec![
        resource(None, Some("New York 3"), Some("nyc3")),
        resource(None, Some("Amsterdam 2"), Some("ams2")),
    ]);
    let inventory = MemoryInventory::with_instances(instances);
    let lifecycle = Lifecycle::new(api.clone(), inventory.clone(), fast_settings(keys_dir));
    Harness {
        _tmp: tmp,
        api,
        inventory,
        lifecycle,
    }
}

#[fixture]
fn harness() -> Harness {
    build(Vec::new())
}

fn running(id: u64) -> Droplet {
    Droplet::new(DropletId::new(id), "web", "active")
        .with_size("512mb")
        .with_ipv4("203.0.113.5")
}

fn powered_off(id: u64) -> Droplet {
    Droplet::new(DropletId::new(id), "web", "off")
        .with_size("512mb")
        .with_ipv4("203.0.113.5")
}

#[rstest]
#[tokio::test]
async fn create_resolves_provisions_creates_then_waits(harness: Harness) {
    harness
        .api
        .set_created_droplet(Droplet::new(DropletId::new(42), "web", "new"));
    harness.api.push_droplet(running(42));

    let created = harness
        .lifecycle
        .create(&CreateRequest::new("web").with_region("Amsterdam 2"))
        .await
        .unwrap_or_else(|err| panic!("create: {err}"));

    assert_eq!(created.name, "web");
    assert_eq!(created.ip, "203.0.113.5");
    assert_eq!(created.ssh_key, DEFAULT_SSH_KEY);
    assert_eq!(created.ssh_port, DEFAULT_SSH_PORT);
    assert_eq!(created.user, DEFAULT_USER);
    assert_eq!(created.digitalocean, Some(running(42)));

    let calls = harness.api.calls();
    let Some(ApiCall::AddKey(uploaded)) = calls.get(4).cloned() else {
        panic!("expected the key upload fifth, got {calls:?}");
    };
    assert_eq!(uploaded.name, hashed_key_name(PUBLIC_KEY));
    let Some(ApiCall::CreateDroplet(spec)) = calls.get(5).cloned() else {
        panic!("expected the create call sixth, got {calls:?}");
    };
    assert_eq!(
        spec,
        CreateSpec {
            backups: false,
            name: String::from("web"),
            private_networking: false,
            ssh_keys: vec![KeyId::new(1001)],
            image: String::from("ubuntu-14-04-x64"),
            size: String::from("512mb"),
            region: String::from("ams2"),
        }
    );
    assert_eq!(
        calls.iter().take(4).cloned().collect::<Vec<_>>(),
        vec![
            ApiCall::ListImages(ImageScope::All),
            ApiCall::ListSizes,
            ApiCall::ListRegions,
            ApiCall::ListKeys,
        ]
    );
    assert_eq!(
        calls.iter().skip(6).cloned().collect::<Vec<_>>(),
        vec![
            ApiCall::GetAction(ActionId::new(1002)),
            ApiCall::GetDroplet(DropletId::new(42)),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn create_sends_id_for_slugless_images(harness: Harness) {
    harness.api.push_droplet(running(42));

    harness
        .lifecycle
        .create(&CreateRequest::new("web").with_image("nightly"))
        .await
        .unwrap_or_else(|err| panic!("create: {err}"));

    let spec = harness.api.calls().into_iter().find_map(|call| match call {
        ApiCall::CreateDroplet(spec) => Some(spec),
        _ => None,
    });
    assert_eq!(spec.map(|sent| sent.image), Some(String::from("7000001")));
}

#[rstest]
#[tokio::test]
async fn unresolvable_image_fails_before_any_mutation(harness: Harness) {
    let err = harness
        .lifecycle
        .create(&CreateRequest::new("web").with_image("centos-5"))
        .await
        .expect_err("image does not exist");

    assert_eq!(
        err,
        LifecycleError::NoMatch {
            kind: ResourceKind::Image,
            candidate: String::from("centos-5"),
        }
    );
    assert_eq!(harness.api.calls(), vec![ApiCall::ListImages(ImageScope::All)]);
}

#[rstest]
#[tokio::test]
async fn unresolvable_region_stops_after_three_listings(harness: Harness) {
    let err = harness
        .lifecycle
        .create(&CreateRequest::new("web").with_region("mars1"))
        .await
        .expect_err("region does not exist");

    assert!(
        matches!(err, LifecycleError::NoMatch { kind: ResourceKind::Region, .. }),
        "{err:?}"
    );
    assert!(harness.api.calls().iter().all(|call| !call.is_mutating()));
    assert_eq!(harness.api.calls().len(), 3);
}

#[rstest]
#[tokio::test]
async fn create_requires_a_name(harness: Harness) {
    let err = harness
        .lifecycle
        .create(&CreateRequest::new("  "))
        .await
        .expect_err("blank name");

    assert!(matches!(err, LifecycleError::Validation(_)), "{err:?}");
    assert!(harness.api.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn destroy_deletes_without_waiting() {
    let web = instance("web", running(7));
    let harness = build(vec![web.clone()]);

    harness
        .lifecycle
        .destroy(&web)
        .await
        .unwrap_or_else(|err| panic!("destroy: {err}"));

    assert_eq!(
        harness.api.calls(),
        vec![ApiCall::DeleteDroplet(DropletId::new(7))]
    );
}

#[rstest]
#[tokio::test]
async fn boot_waits_then_refreshes_metadata() {
    let web = instance("web", powered_off(7));
    let harness = build(vec![web.clone()]);
    harness.api.push_action_statuses([ActionStatus::InProgress, ActionStatus::Completed]);
    harness.api.push_droplet(
        Droplet::new(DropletId::new(7), "web", "active")
            .with_size("512mb")
            .with_ipv4("198.51.100.20"),
    );

    let droplet = harness
        .lifecycle
        .boot(&web)
        .await
        .unwrap_or_else(|err| panic!("boot: {err}"));

    assert_eq!(droplet.status, "active");
    assert_eq!(harness.api.requested_actions(), vec![DropletAction::PowerOn]);
    let stored = harness
        .inventory
        .snapshot("web")
        .unwrap_or_else(|| panic!("web should remain"));
    assert_eq!(stored.ip, "198.51.100.20");
    assert_eq!(stored.digitalocean, Some(droplet));
}

#[derive(Clone, Copy, Debug)]
enum Disruptive {
    Rebuild,
    Resize,
    Snapshot,
}

impl Disruptive {
    fn action(self) -> DropletAction {
        match self {
            Self::Rebuild => DropletAction::Rebuild {
                image: String::from("ubuntu-14-04-x64"),
            },
            Self::Resize => DropletAction::Resize {
                disk: true,
                size: String::from("1gb"),
            },
            Self::Snapshot => DropletAction::Snapshot {
                name: String::from("before-upgrade"),
            },
        }
    }

    async fn run(
        self,
        lifecycle: &Lifecycle<ScriptedApi, MemoryInventory>,
        web: &Instance,
    ) -> Result<Droplet, LifecycleError> {
        match self {
            Self::Rebuild => lifecycle.rebuild(web, "ubuntu-14-04-x64").await,
            Self::Resize => lifecycle.resize(web, "1gb").await,
            Self::Snapshot => lifecycle.snapshot(web, "before-upgrade").await,
        }
    }
}

#[rstest]
#[case(Disruptive::Rebuild)]
#[case(Disruptive::Resize)]
#[case(Disruptive::Snapshot)]
#[tokio::test]
async fn running_droplet_must_read_off_before_the_action(#[case] operation: Disruptive) {
    let web = instance("web", running(7));
    let harness = build(vec![web.clone()]);
    // precondition read, shutdown refresh, then one more running answer
    // before the power-off wait sees `off`
    for _ in 0..3 {
        harness.api.push_droplet(running(7));
    }
    harness.api.push_droplet(powered_off(7));

    operation
        .run(&harness.lifecycle, &web)
        .await
        .unwrap_or_else(|err| panic!("{operation:?}: {err}"));

    let id = DropletId::new(7);
    assert_eq!(
        harness.api.calls(),
        vec![
            ApiCall::GetDroplet(id),
            ApiCall::RequestAction(id, DropletAction::Shutdown),
            ApiCall::GetAction(ActionId::new(1001)),
            ApiCall::GetDroplet(id),
            ApiCall::GetDroplet(id),
            ApiCall::GetDroplet(id),
            ApiCall::RequestAction(id, operation.action()),
            ApiCall::GetAction(ActionId::new(1002)),
            ApiCall::GetDroplet(id),
        ]
    );
    assert_eq!(
        harness.api.served_statuses(),
        vec!["active", "active", "active", "off", "off"]
    );
}

#[rstest]
#[tokio::test]
async fn power_off_wait_timeout_blocks_the_action() {
    let web = instance("web", running(7));
    let mut harness = build(vec![web.clone()]);
    harness.api.push_droplet(running(7));
    let mut settings = harness.lifecycle.settings().clone();
    settings.power_poll = settings.power_poll.with_max_attempts(3);
    harness.lifecycle = Lifecycle::new(harness.api.clone(), harness.inventory.clone(), settings);

    let err = harness
        .lifecycle
        .snapshot(&web, "never")
        .await
        .expect_err("droplet never powers off");

    assert!(matches!(err, LifecycleError::Timeout { .. }), "{err:?}");
    assert_eq!(harness.api.requested_actions(), vec![DropletAction::Shutdown]);
}

#[rstest]
#[case("512mb")]
#[case("256mb")]
#[case("tiny")]
#[tokio::test]
async fn resize_rejects_non_increases_without_calls(#[case] target: &str) {
    let web = instance("web", running(7));
    let harness = build(vec![web.clone()]);

    let err = harness
        .lifecycle
        .resize(&web, target)
        .await
        .expect_err("not an increase");

    assert!(matches!(err, LifecycleError::Validation(_)), "{err:?}");
    assert!(harness.api.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn snapshot_of_an_off_droplet_skips_shutdown() {
    let web = instance("web", powered_off(7));
    let harness = build(vec![web.clone()]);
    harness.api.push_droplet(powered_off(7));

    harness
        .lifecycle
        .snapshot(&web, "before-upgrade")
        .await
        .unwrap_or_else(|err| panic!("snapshot: {err}"));

    assert_eq!(
        harness.api.requested_actions(),
        vec![DropletAction::Snapshot {
            name: String::from("before-upgrade"),
        }]
    );
}

#[rstest]
#[tokio::test]
async fn failed_shutdown_blocks_the_rebuild() {
    let web = instance("web", running(7));
    let harness = build(vec![web.clone()]);
    harness.api.push_droplet(running(7));
    harness.api.push_action_statuses([ActionStatus::Errored]);

    let err = harness
        .lifecycle
        .rebuild(&web, "ubuntu-14-04-x64")
        .await
        .expect_err("shutdown errored");

    assert!(matches!(err, LifecycleError::ActionFailed { .. }), "{err:?}");
    assert_eq!(harness.api.requested_actions(), vec![DropletAction::Shutdown]);
}

#[rstest]
#[tokio::test]
async fn unmanaged_instances_are_rejected(harness: Harness) {
    let bare = Instance {
        digitalocean: None,
        ..instance("bare", running(1))
    };

    let err = harness.lifecycle.reboot(&bare).await.expect_err("unmanaged");

    assert!(matches!(err, LifecycleError::Validation(_)), "{err:?}");
    assert!(harness.api.calls().is_empty());
}

#[rstest]
fn settings_follow_configuration() {
    let config = crate::config::DigitalOceanConfig {
        api_token: Some(String::from("token")),
        api_base_url: String::from("http://localhost"),
        default_image: String::from("debian-12-x64"),
        default_size: String::from("1gb"),
        default_region: String::from("ams3"),
        keys_dir: String::from("/srv/keys"),
        inventory_path: String::from("/srv/instances.json"),
        action_poll_interval_ms: 250,
        power_poll_interval_ms: 100,
        max_poll_attempts: Some(12),
    };

    let settings = LifecycleSettings::from_config(&config);

    assert_eq!(settings.defaults.image, "debian-12-x64");
    assert_eq!(settings.defaults.keys_dir, Utf8PathBuf::from("/srv/keys"));
    assert_eq!(settings.defaults.ssh_key, DEFAULT_SSH_KEY);
    assert_eq!(settings.action_poll.interval(), Duration::from_millis(250));
    assert_eq!(settings.power_poll.max_attempts(), Some(12));
}
