//! BDD step definitions for droplet lifecycle behaviour.

use std::future::Future;

use rstest_bdd_macros::{given, then, when};
use skiff::test_support::{ApiCall, resource};
use skiff::{CreateRequest, Droplet, Inventory, LifecycleError};
use tokio::runtime::Runtime;

use super::test_helpers::{LifecycleContext, Outcome, droplet};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("runtime: {0}")]
    Runtime(String),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn block_on<F: Future>(future: F) -> Result<F::Output, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Runtime(err.to_string()))?;
    Ok(runtime.block_on(future))
}

fn record(
    mut lifecycle_context: LifecycleContext,
    result: Result<Droplet, LifecycleError>,
) -> LifecycleContext {
    lifecycle_context.outcome = Some(match result {
        Ok(droplet) => Outcome::Droplet(droplet),
        Err(err) => Outcome::Failure(err),
    });
    lifecycle_context
}

#[given("a stored droplet \"{name}\" running at size \"{size}\"")]
fn stored_droplet(
    mut lifecycle_context: LifecycleContext,
    name: String,
    size: String,
) -> Result<LifecycleContext, StepError> {
    lifecycle_context
        .api
        .push_droplet(droplet("active", &size, "203.0.113.5"));
    let lifecycle = lifecycle_context.lifecycle();
    let request = CreateRequest::new(name.as_str()).with_size(size.as_str());
    let created = block_on(async move { lifecycle.create(&request).await })?
        .map_err(|err| StepError::Assertion(format!("create {name}: {err}")))?;
    lifecycle_context
        .inventory
        .insert(created)
        .map_err(|err| StepError::Assertion(format!("insert {name}: {err}")))?;
    lifecycle_context.size = size;
    Ok(lifecycle_context.mark())
}

#[given("the droplet keeps running through the shutdown")]
fn keeps_running(lifecycle_context: LifecycleContext) -> LifecycleContext {
    let size = lifecycle_context.size.clone();
    // precondition read, shutdown refresh and the first power-off poll
    for _ in 0..3 {
        lifecycle_context
            .api
            .push_droplet(droplet("active", &size, "203.0.113.5"));
    }
    lifecycle_context
        .api
        .push_droplet(droplet("off", &size, "203.0.113.5"));
    lifecycle_context
}

#[given("the provider now reports address \"{ip}\"")]
fn provider_reports_address(lifecycle_context: LifecycleContext, ip: String) -> LifecycleContext {
    let size = lifecycle_context.size.clone();
    lifecycle_context
        .api
        .push_droplet(droplet("active", &size, &ip));
    lifecycle_context
}

#[given("a catalogue with sizes \"{first}\" and \"{second}\"")]
fn catalogue_with_sizes(
    lifecycle_context: LifecycleContext,
    first: String,
    second: String,
) -> LifecycleContext {
    lifecycle_context.api.set_sizes(vec![
        resource(None, None, Some(first.as_str())),
        resource(None, None, Some(second.as_str())),
    ]);
    lifecycle_context.mark()
}

fn stored(lifecycle_context: &LifecycleContext, name: &str) -> Result<skiff::Instance, StepError> {
    lifecycle_context
        .inventory
        .get(name)
        .map_err(|err| StepError::Assertion(format!("get {name}: {err}")))?
        .ok_or_else(|| StepError::Assertion(format!("{name} should be stored")))
}

#[when("I resize \"{name}\" to \"{size}\"")]
fn resize(
    lifecycle_context: LifecycleContext,
    name: String,
    size: String,
) -> Result<LifecycleContext, StepError> {
    let instance = stored(&lifecycle_context, &name)?;
    lifecycle_context
        .api
        .push_droplet(droplet("off", &size, "203.0.113.9"));
    let lifecycle = lifecycle_context.lifecycle();
    let result = block_on(async move { lifecycle.resize(&instance, &size).await })?;
    Ok(record(lifecycle_context, result))
}

#[when("I snapshot \"{name}\" as \"{snapshot}\"")]
fn snapshot_droplet(
    lifecycle_context: LifecycleContext,
    name: String,
    snapshot: String,
) -> Result<LifecycleContext, StepError> {
    let instance = stored(&lifecycle_context, &name)?;
    let lifecycle = lifecycle_context.lifecycle();
    let result = block_on(async move { lifecycle.snapshot(&instance, &snapshot).await })?;
    Ok(record(lifecycle_context, result))
}

#[when("I rebuild \"{name}\" from \"{image}\"")]
fn rebuild(
    lifecycle_context: LifecycleContext,
    name: String,
    image: String,
) -> Result<LifecycleContext, StepError> {
    let instance = stored(&lifecycle_context, &name)?;
    let lifecycle = lifecycle_context.lifecycle();
    let result = block_on(async move { lifecycle.rebuild(&instance, &image).await })?;
    Ok(record(lifecycle_context, result))
}

#[when("I sync \"{name}\"")]
fn sync(lifecycle_context: LifecycleContext, name: String) -> Result<LifecycleContext, StepError> {
    let instance = stored(&lifecycle_context, &name)?;
    let lifecycle = lifecycle_context.lifecycle();
    let result = block_on(async move { lifecycle.sync(&instance).await })?;
    Ok(record(lifecycle_context, result))
}

#[when("I list sizes and snapshots")]
fn list_catalogue(
    mut lifecycle_context: LifecycleContext,
) -> Result<LifecycleContext, StepError> {
    let lifecycle = lifecycle_context.lifecycle();
    let listed = block_on(async move {
        let sizes = lifecycle.sizes().await?;
        let snapshots = lifecycle.snapshots().await?;
        Ok::<_, LifecycleError>((sizes.len(), snapshots.len()))
    })?;
    lifecycle_context.outcome = Some(match listed {
        Ok((sizes, snapshots)) => Outcome::Listing { sizes, snapshots },
        Err(err) => Outcome::Failure(err),
    });
    Ok(lifecycle_context)
}

#[then("the operation succeeds")]
fn operation_succeeds(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    match &lifecycle_context.outcome {
        Some(Outcome::Droplet(_) | Outcome::Listing { .. }) => Ok(()),
        Some(Outcome::Failure(err)) => Err(StepError::Assertion(format!(
            "expected success, got failure: {err}"
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

#[then("the operation fails validation")]
fn operation_fails_validation(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    match &lifecycle_context.outcome {
        Some(Outcome::Failure(LifecycleError::Validation(_))) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected a validation failure, got {other:?}"
        ))),
    }
}

#[then("the droplet read off before the \"{action}\" request")]
fn read_off_before(lifecycle_context: &LifecycleContext, action: String) -> Result<(), StepError> {
    let calls: Vec<ApiCall> = lifecycle_context
        .api
        .calls()
        .into_iter()
        .skip(lifecycle_context.calls_before)
        .collect();
    let requested = |call: &ApiCall, kind: &str| {
        matches!(call, ApiCall::RequestAction(_, sent) if sent.as_str() == kind)
    };

    let target = calls
        .iter()
        .position(|call| requested(call, &action))
        .ok_or_else(|| StepError::Assertion(format!("no {action} request in {calls:?}")))?;
    let before_target = calls.iter().take(target);
    let shutdown_first = before_target.clone().any(|call| requested(call, "shutdown"));
    if !shutdown_first {
        return Err(StepError::Assertion(format!(
            "expected a shutdown before {action}, got {calls:?}"
        )));
    }

    let reads = before_target
        .filter(|call| matches!(call, ApiCall::GetDroplet(_)))
        .count();
    let statuses: Vec<String> = lifecycle_context
        .api
        .served_statuses()
        .into_iter()
        .skip(lifecycle_context.reads_before)
        .take(reads)
        .collect();
    if statuses.last().map(String::as_str) == Some("off") {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "last status read before {action} should be off, got {statuses:?}"
        )))
    }
}

#[then("\"{name}\" is stored at size \"{size}\" with address \"{ip}\"")]
fn stored_record(
    lifecycle_context: &LifecycleContext,
    name: String,
    size: String,
    ip: String,
) -> Result<(), StepError> {
    let instance = stored(lifecycle_context, &name)?;
    if let Some(Outcome::Droplet(returned)) = &lifecycle_context.outcome {
        if returned.first_ipv4() != Some(ip.as_str()) {
            return Err(StepError::Assertion(format!(
                "operation returned {:?}, expected address {ip}",
                returned.first_ipv4()
            )));
        }
    }
    let stored_size = instance
        .digitalocean
        .as_ref()
        .and_then(Droplet::current_size_slug);
    if instance.ip == ip && stored_size == Some(size.as_str()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {name} at {size} / {ip}, got {stored_size:?} / {}",
            instance.ip
        )))
    }
}

#[then("no further provider calls were made")]
fn no_further_calls(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let made = lifecycle_context.api.calls().len();
    if made == lifecycle_context.calls_before {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {} calls, got {made}",
            lifecycle_context.calls_before
        )))
    }
}

#[then("{sizes:u32} sizes and {snapshots:u32} snapshots are listed")]
fn listed_counts(
    lifecycle_context: &LifecycleContext,
    sizes: u32,
    snapshots: u32,
) -> Result<(), StepError> {
    match &lifecycle_context.outcome {
        Some(Outcome::Listing {
            sizes: listed_sizes,
            snapshots: listed_snapshots,
        }) if *listed_sizes == sizes as usize && *listed_snapshots == snapshots as usize => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected {sizes} sizes and {snapshots} snapshots, got {other:?}"
        ))),
    }
}
