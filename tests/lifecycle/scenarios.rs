//! BDD scenarios for the droplet lifecycle.

use rstest_bdd_macros::scenario;

use super::test_helpers::{LifecycleContext, lifecycle_context};

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Resize a running droplet once it reads off"
)]
fn scenario_resize_running(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Snapshot a running droplet once it reads off"
)]
fn scenario_snapshot_running(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Rebuild a running droplet once it reads off"
)]
fn scenario_rebuild_running(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Sync refreshes the stored address"
)]
fn scenario_sync_refresh(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Shrinking is refused before any provider call"
)]
fn scenario_shrink_refused(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Listings pass through the catalogue"
)]
fn scenario_listings(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}
