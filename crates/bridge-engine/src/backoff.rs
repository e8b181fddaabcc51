//! Retry executor.
//!
//! Runs a fallible closure under a [`RetryPolicy`] until it succeeds, the
//! budget runs out, the failure classifies as fatal, or cancellation is
//! requested. Delays are slept in short slices so cancellation lands within
//! roughly 100 ms even mid-backoff.

use core_types::{CancelFlag, Recoverable, RetryPolicy, SleepOutcome};
use thiserror::Error;

/// Terminal outcomes of a retried operation.
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error,
{
    /// Cancellation observed before an attempt or during a delay.
    #[error("cancelled while retrying")]
    Cancelled,

    /// The failure classified as fatal; it was not retried.
    #[error(transparent)]
    Fatal(E),

    /// Bounded budget exhausted; carries the last failure unchanged.
    #[error("retries exhausted: {0}")]
    Exhausted(E),
}

/// Execute `op` under `policy`.
///
/// The retry counter starts at 0 and counts retries after the initial
/// attempt: a bounded policy of `n` permits `n` retries (n+1 attempts), with
/// the delay before retry *i* being `initial_delay * multiplier^i`. Before
/// each retry wait a progress notification is printed with the failure and
/// the computed delay.
pub fn execute<T, E, F>(
    label: &str,
    policy: &RetryPolicy,
    cancel: &CancelFlag,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: std::error::Error + Recoverable,
    F: FnMut() -> Result<T, E>,
{
    let mut retries: u32 = 0;
    loop {
        if cancel.is_requested() {
            return Err(RetryError::Cancelled);
        }

        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_fatal() => return Err(RetryError::Fatal(err)),
            Err(err) => {
                if !policy.allows_retry(retries) {
                    return Err(RetryError::Exhausted(err));
                }
                if cancel.is_requested() {
                    return Err(RetryError::Cancelled);
                }

                let delay = policy.delay_before_retry(retries);
                println!("{label} failed ({err}); retrying in {} ms", delay.as_millis());
                log::warn!("{label}: attempt {} failed: {err}", retries + 1);

                if cancel.sleep(delay) == SleepOutcome::Interrupted {
                    return Err(RetryError::Cancelled);
                }
                retries += 1;
            }
        }
    }
}
