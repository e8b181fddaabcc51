//! Connection management and the bidirectional forwarding loop.
//!
//! ## Modules
//!
//! - **backoff**: retry executor over a fallible closure
//! - **connect**: connection manager — targets, retry policies, the
//!   busy-availability wait for the pipe
//! - **bridge**: the state-machine loop that owns both endpoint handles
//! - **constants**: tuning values

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod backoff;
pub mod bridge;
pub mod connect;
pub mod constants;

pub use backoff::RetryError;
pub use bridge::{Bridge, EndpointFactory, FatalError};
pub use connect::{Connector, PipeTarget, SerialTarget};
