//! Connection manager.
//!
//! Owns the endpoint targets and wraps the drivers' single-shot opens in the
//! retry executor. Two policies exist on purpose: startup is bounded with
//! exponential growth so an absent device fails fast; mid-session
//! reconnection is unbounded with a constant delay so a transient outage is
//! tolerated indefinitely.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use core_types::{CancelFlag, EndpointError, RetryPolicy, SleepOutcome};
use transport_pipe::PipeEndpoint;
use transport_serial::SerialEndpoint;

use crate::backoff::{self, RetryError};
use crate::bridge::EndpointFactory;
use crate::constants::{pipe as pipe_cfg, retry as retry_cfg};

/// Serial side target.
#[derive(Debug, Clone)]
pub struct SerialTarget {
    pub path: String,
    pub baud_rate: u32,
}

/// Pipe side target.
#[derive(Debug, Clone)]
pub struct PipeTarget {
    pub path: PathBuf,
}

/// Bounded policy for first-time establishment.
pub fn startup_policy() -> RetryPolicy {
    RetryPolicy::bounded(
        retry_cfg::STARTUP_MAX_RETRIES,
        Duration::from_millis(retry_cfg::STARTUP_DELAY_MS),
    )
}

/// Unbounded constant-delay policy for mid-session reconnection.
pub fn reconnect_policy() -> RetryPolicy {
    RetryPolicy::unbounded(Duration::from_millis(retry_cfg::RECONNECT_DELAY_MS))
}

/// Opens endpoints on demand for the bridge loop.
pub struct Connector {
    pub serial: SerialTarget,
    pub pipe: PipeTarget,
}

impl Connector {
    /// One pipe-open attempt, with the bounded busy-availability wait nested
    /// inside: a busy channel is polled until it frees up or the wait
    /// lapses, and only then reported back to the retry loop.
    fn open_pipe_once(&self, cancel: &CancelFlag) -> Result<PipeEndpoint, EndpointError> {
        let deadline = Instant::now() + Duration::from_millis(pipe_cfg::BUSY_WAIT_MS);
        loop {
            match PipeEndpoint::open(&self.pipe.path) {
                Err(EndpointError::Busy(reason)) => {
                    if Instant::now() >= deadline {
                        return Err(EndpointError::Busy(reason));
                    }
                    log::debug!("pipe busy ({reason}); waiting for a free instance");
                    if cancel.sleep(Duration::from_millis(pipe_cfg::BUSY_POLL_MS))
                        == SleepOutcome::Interrupted
                    {
                        return Err(EndpointError::Busy(reason));
                    }
                }
                other => return other,
            }
        }
    }
}

impl EndpointFactory for Connector {
    type Serial = SerialEndpoint;
    type Pipe = PipeEndpoint;

    fn open_serial(
        &mut self,
        policy: &RetryPolicy,
        cancel: &CancelFlag,
    ) -> Result<SerialEndpoint, RetryError<EndpointError>> {
        backoff::execute("serial open", policy, cancel, || {
            SerialEndpoint::open(&self.serial.path, self.serial.baud_rate)
        })
    }

    fn open_pipe(
        &mut self,
        policy: &RetryPolicy,
        cancel: &CancelFlag,
    ) -> Result<PipeEndpoint, RetryError<EndpointError>> {
        backoff::execute("pipe open", policy, cancel, || self.open_pipe_once(cancel))
    }
}
