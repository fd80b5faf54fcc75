use std::fmt::Display;
use std::future::Future;

use backoff::ExponentialBackoffBuilder;

use crate::config::RetryPolicy;
use crate::error::IsTransient;

/// Runs `op` until it succeeds, fails permanently, or the policy's retries are spent.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsTransient + Display,
{
    let schedule = ExponentialBackoffBuilder::new()
        .with_initial_interval(policy.initial_interval)
        .with_max_interval(policy.max_interval)
        .with_multiplier(2.0)
        .with_max_elapsed_time(None)
        .build();

    let max_retries = policy.max_retries;
    let mut attempt: u32 = 0;

    backoff::future::retry(schedule, || {
        attempt += 1;
        let current = attempt;
        let call = op();
        async move {
            call.await.map_err(|err| {
                if err.is_transient() && current <= max_retries {
                    log::warn!("{label}: attempt {current} failed, retrying: {err}");
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })
        }
    })
    .await
}
