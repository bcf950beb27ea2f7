//! Fixed-interval polling of provider actions and droplet power state.
//!
//! Both waits share one discipline: query, stop on a terminal answer, abort
//! on any provider error, otherwise sleep for the configured interval and
//! try again. Unbounded by default; a [`PollPolicy`] may cap the number of
//! queries or the elapsed time, in which case exhaustion surfaces as
//! [`LifecycleError::Timeout`].

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::backend::ProviderApi;
use crate::error::LifecycleError;
use crate::types::{ActionId, ActionRecord, ActionStatus, Droplet, DropletId};

/// Default interval between action status queries.
pub const DEFAULT_ACTION_INTERVAL: Duration = Duration::from_secs(5);
/// Default interval between power state queries.
pub const DEFAULT_POWER_INTERVAL: Duration = Duration::from_secs(3);

/// Retry discipline for a polling wait.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    interval: Duration,
    deadline: Option<Duration>,
    max_attempts: Option<u32>,
}

impl PollPolicy {
    /// Creates an unbounded policy with the given fixed interval.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
            max_attempts: None,
        }
    }

    /// Gives up once `deadline` has elapsed since the first query.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Gives up after `max_attempts` queries.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Interval slept between queries.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Elapsed-time bound, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Query-count bound, if any.
    #[must_use]
    pub const fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    fn exhausted(&self, started: Instant, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
            || self
                .deadline
                .is_some_and(|deadline| started.elapsed() >= deadline)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ACTION_INTERVAL)
    }
}

/// Runs `probe` until it yields a value, sleeping between attempts.
async fn poll_until<T, F, Fut>(
    policy: &PollPolicy,
    action: &str,
    target: &str,
    mut probe: F,
) -> Result<T, LifecycleError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, LifecycleError>>,
{
    let started = Instant::now();
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        if let Some(done) = probe().await? {
            return Ok(done);
        }
        if policy.exhausted(started, attempts) {
            return Err(LifecycleError::Timeout {
                action: action.to_owned(),
                target: target.to_owned(),
            });
        }
        sleep(policy.interval).await;
    }
}

/// Waits until the provider reports `action_id` as completed.
///
/// # Errors
///
/// Returns [`LifecycleError::Provider`] on the first failed query,
/// [`LifecycleError::ActionFailed`] when the action errors, and
/// [`LifecycleError::Timeout`] when the policy is exhausted.
pub async fn await_action<A>(
    api: &A,
    action_id: ActionId,
    policy: &PollPolicy,
) -> Result<ActionRecord, LifecycleError>
where
    A: ProviderApi + ?Sized,
{
    let target = format!("action {action_id}");
    poll_until(policy, "action completion", &target, move || async move {
        let record = api.get_action(action_id).await?;
        match record.status {
            ActionStatus::Completed => Ok(Some(record)),
            ActionStatus::Errored => Err(LifecycleError::ActionFailed { action_id }),
            ActionStatus::InProgress | ActionStatus::Pending => {
                debug!(action_id = %action_id, status = ?record.status, "action not complete");
                Ok(None)
            }
        }
    })
    .await
}

/// Waits until the droplet's live status reads `off`.
///
/// # Errors
///
/// Returns [`LifecycleError::Provider`] on the first failed query and
/// [`LifecycleError::Timeout`] when the policy is exhausted.
pub async fn await_power_off<A>(
    api: &A,
    droplet_id: DropletId,
    policy: &PollPolicy,
) -> Result<Droplet, LifecycleError>
where
    A: ProviderApi + ?Sized,
{
    let target = format!("droplet {droplet_id}");
    poll_until(policy, "power off", &target, move || async move {
        let droplet = api.get_droplet(droplet_id).await?;
        if droplet.is_off() {
            Ok(Some(droplet))
        } else {
            debug!(droplet_id = %droplet_id, status = %droplet.status, "droplet still powered");
            Ok(None)
        }
    })
    .await
}
