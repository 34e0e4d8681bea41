//! Bounded polling for resources that are still provisioning.

use std::time::Duration;

use tracing::debug;

use crate::adapter::{RemoteResource, ResourceAdapter};
use crate::error::Result;
use crate::lifecycle::LifecycleClass;

/// Delay schedule between poll attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential { initial: Duration, max: Duration },
}

impl Backoff {
    /// Delay to wait after the given (1-based) attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(d) => d,
            Backoff::Exponential { initial, max } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                initial.saturating_mul(factor).min(max)
            }
        }
    }
}

/// Declarative poll policy: keep fetching while `retry_while` holds for the
/// resource's lifecycle class, up to `max_attempts` fetches.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub retry_while: fn(LifecycleClass) -> bool,
}

impl RetryPolicy {
    /// 30 attempts, one minute apart, while the resource is transient.
    pub fn provisioning() -> Self {
        Self {
            max_attempts: 30,
            backoff: Backoff::Fixed(Duration::from_secs(60)),
            retry_while: LifecycleClass::is_transient,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::provisioning()
    }
}

/// Fetch `id` until the policy predicate no longer holds or the attempt
/// budget is spent, sleeping on the calling task between attempts.
///
/// Returns the last snapshot either way; adapter errors end the poll.
pub async fn poll_until_settled<A>(
    adapter: &A,
    id: &str,
    policy: &RetryPolicy,
) -> Result<RemoteResource>
where
    A: ResourceAdapter + ?Sized,
{
    let mut attempt = 1u32;
    loop {
        let resource = adapter.get(id).await?;
        let class = adapter.classify(&resource);

        if !(policy.retry_while)(class) || attempt >= policy.max_attempts {
            return Ok(resource);
        }

        let delay = policy.backoff.delay(attempt);
        debug!(
            kind = adapter.kind(),
            id,
            state = %resource.lifecycle_state,
            attempt,
            "Resource still {}, polling again in {:?}",
            class,
            delay
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
