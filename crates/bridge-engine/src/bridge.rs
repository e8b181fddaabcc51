//! The top-level forwarding loop.
//!
//! The bridge owns both endpoint handles for its whole lifetime and drives
//! the state machine defined in [`core_types::state`]. Each `Bridging`
//! iteration: check cancellation, pull from serial and push to the pipe,
//! pull from the pipe and push to serial. A serial fault or a pipe
//! disconnect sends the loop through the matching reconnect state with the
//! other endpoint untouched; forwarding-direction write failures end the
//! relay (a half-forwarded chunk cannot be replayed without duplicating or
//! dropping bytes).

use std::time::Duration;

use core_types::{BridgeState, ByteEndpoint, CancelFlag, EndpointError, RetryPolicy, SleepOutcome};
use thiserror::Error;

use crate::backoff::RetryError;
use crate::connect::{reconnect_policy, startup_policy};
use crate::constants::{pipe as pipe_cfg, retry as retry_cfg, serial as serial_cfg};

/// Seam through which the loop establishes and re-establishes endpoints.
///
/// Implementations return fresh handles and retain nothing; the bridge is
/// the only owner of live endpoints.
pub trait EndpointFactory {
    type Serial: ByteEndpoint;
    type Pipe: ByteEndpoint;

    fn open_serial(
        &mut self,
        policy: &RetryPolicy,
        cancel: &CancelFlag,
    ) -> Result<Self::Serial, RetryError<EndpointError>>;

    fn open_pipe(
        &mut self,
        policy: &RetryPolicy,
        cancel: &CancelFlag,
    ) -> Result<Self::Pipe, RetryError<EndpointError>>;
}

/// Failures that end the relay.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("could not open serial port: {0}")]
    SerialConnect(RetryError<EndpointError>),

    #[error("could not open pipe: {0}")]
    PipeConnect(RetryError<EndpointError>),

    #[error("error writing to pipe: {0}")]
    PipeWrite(EndpointError),

    #[error("error reading from pipe: {0}")]
    PipeRead(EndpointError),

    #[error("error writing to serial port: {0}")]
    SerialWrite(EndpointError),
}

/// The relay: both endpoint handles plus the state machine driving them.
pub struct Bridge<F: EndpointFactory> {
    factory: F,
    cancel: CancelFlag,
    state: BridgeState,
    serial: Option<F::Serial>,
    pipe: Option<F::Pipe>,
}

impl<F: EndpointFactory> Bridge<F> {
    pub fn new(factory: F, cancel: CancelFlag) -> Self {
        Self {
            factory,
            cancel,
            state: BridgeState::Connecting,
            serial: None,
            pipe: None,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Run until cancellation (`Ok`) or a fatal failure (`Err`). Both
    /// endpoints are closed on the way out either way.
    pub fn run(&mut self) -> Result<(), FatalError> {
        let result = self.drive();
        self.shutdown();
        result
    }

    fn drive(&mut self) -> Result<(), FatalError> {
        loop {
            match self.state {
                BridgeState::Connecting => self.establish_both()?,
                BridgeState::Bridging => self.step()?,
                BridgeState::ReconnectingSerial => self.reclaim_serial()?,
                BridgeState::ReconnectingPipe => self.reclaim_pipe()?,
                BridgeState::ShuttingDown | BridgeState::Stopped => return Ok(()),
            }
        }
    }

    fn transition(&mut self, next: BridgeState) {
        if !self.state.can_transition_to(next) {
            log::warn!("unexpected bridge transition {:?} -> {next:?}", self.state);
        }
        log::debug!("bridge: {:?} -> {next:?}", self.state);
        if matches!(
            next,
            BridgeState::ReconnectingSerial | BridgeState::ReconnectingPipe
        ) {
            println!("{}", next.status_text());
        }
        self.state = next;
    }

    /// First-time establishment of both endpoints under the bounded policy.
    fn establish_both(&mut self) -> Result<(), FatalError> {
        match self.factory.open_serial(&startup_policy(), &self.cancel) {
            Ok(endpoint) => {
                println!("Serial port opened.");
                self.serial = Some(endpoint);
            }
            Err(RetryError::Cancelled) => {
                self.transition(BridgeState::ShuttingDown);
                return Ok(());
            }
            Err(err) => return Err(FatalError::SerialConnect(err)),
        }

        match self.factory.open_pipe(&startup_policy(), &self.cancel) {
            Ok(endpoint) => {
                println!("Pipe opened.");
                self.pipe = Some(endpoint);
            }
            Err(RetryError::Cancelled) => {
                self.transition(BridgeState::ShuttingDown);
                return Ok(());
            }
            Err(err) => return Err(FatalError::PipeConnect(err)),
        }

        self.transition(BridgeState::Bridging);
        Ok(())
    }

    /// One `Bridging` iteration.
    fn step(&mut self) -> Result<(), FatalError> {
        if self.cancel.is_requested() {
            println!("Quitting...");
            self.transition(BridgeState::ShuttingDown);
            return Ok(());
        }

        // Both handles are live while bridging; a missing one means the
        // previous reconnect never completed, so run it again.
        if self.serial.is_none() {
            self.transition(BridgeState::ReconnectingSerial);
            return Ok(());
        }
        if self.pipe.is_none() {
            self.transition(BridgeState::ReconnectingPipe);
            return Ok(());
        }

        // Serial -> pipe. An empty chunk is a quiet line, not a fault.
        let outbound = match self.serial.as_mut() {
            Some(serial) => serial.read_chunk(serial_cfg::READ_CHUNK),
            None => Ok(Vec::new()),
        };
        match outbound {
            Ok(chunk) if !chunk.is_empty() => {
                if let Some(pipe) = self.pipe.as_mut() {
                    if let Err(err) = pipe.write(&chunk) {
                        return Err(FatalError::PipeWrite(err));
                    }
                }
            }
            Ok(_) => {}
            Err(err) => {
                log::warn!("serial read failed: {err}");
                self.transition(BridgeState::ReconnectingSerial);
                return Ok(());
            }
        }

        // Pipe -> serial.
        let inbound = match self.pipe.as_mut() {
            Some(pipe) => pipe.read_chunk(pipe_cfg::READ_BUFFER),
            None => Ok(Vec::new()),
        };
        match inbound {
            Ok(chunk) if !chunk.is_empty() => {
                if let Some(serial) = self.serial.as_mut() {
                    if let Err(err) = serial.write(&chunk) {
                        return Err(FatalError::SerialWrite(err));
                    }
                }
            }
            Ok(_) => {}
            Err(EndpointError::Disconnected) => {
                log::warn!("pipe peer disconnected");
                self.transition(BridgeState::ReconnectingPipe);
                return Ok(());
            }
            Err(err) => return Err(FatalError::PipeRead(err)),
        }

        Ok(())
    }

    /// Close the stale serial handle and re-establish it under the
    /// unbounded policy. The pipe endpoint is untouched throughout.
    fn reclaim_serial(&mut self) -> Result<(), FatalError> {
        if let Some(mut endpoint) = self.serial.take() {
            endpoint.close();
        }
        if self.cooldown() == SleepOutcome::Interrupted {
            self.transition(BridgeState::ShuttingDown);
            return Ok(());
        }

        match self.factory.open_serial(&reconnect_policy(), &self.cancel) {
            Ok(endpoint) => {
                println!("Serial port reopened.");
                self.serial = Some(endpoint);
                self.transition(BridgeState::Bridging);
            }
            Err(RetryError::Cancelled) => self.transition(BridgeState::ShuttingDown),
            Err(err) => return Err(FatalError::SerialConnect(err)),
        }
        Ok(())
    }

    /// Symmetric to [`Self::reclaim_serial`] for the pipe side.
    fn reclaim_pipe(&mut self) -> Result<(), FatalError> {
        if let Some(mut endpoint) = self.pipe.take() {
            endpoint.close();
        }
        if self.cooldown() == SleepOutcome::Interrupted {
            self.transition(BridgeState::ShuttingDown);
            return Ok(());
        }

        match self.factory.open_pipe(&reconnect_policy(), &self.cancel) {
            Ok(endpoint) => {
                println!("Pipe reopened.");
                self.pipe = Some(endpoint);
                self.transition(BridgeState::Bridging);
            }
            Err(RetryError::Cancelled) => self.transition(BridgeState::ShuttingDown),
            Err(err) => return Err(FatalError::PipeConnect(err)),
        }
        Ok(())
    }

    fn cooldown(&self) -> SleepOutcome {
        self.cancel
            .sleep(Duration::from_millis(retry_cfg::RECLAIM_COOLDOWN_MS))
    }

    /// Tear down both endpoints. Closing is idempotent, so this is safe no
    /// matter which handles are live, including none.
    fn shutdown(&mut self) {
        if self.state != BridgeState::ShuttingDown {
            self.transition(BridgeState::ShuttingDown);
        }
        if let Some(mut endpoint) = self.pipe.take() {
            endpoint.close();
        }
        if let Some(mut endpoint) = self.serial.take() {
            endpoint.close();
        }
        // Drain any cancellation request that arrived during teardown.
        self.cancel.clear();
        self.transition(BridgeState::Stopped);
    }
}
