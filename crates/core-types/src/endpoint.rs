//! The byte-stream seam between the forwarding loop and its drivers.

use std::time::Duration;

use crate::error::EndpointError;

/// Base portion of the per-write deadline.
pub const WRITE_BUDGET_BASE: Duration = Duration::from_millis(50);

/// Additional write deadline granted per byte in the chunk.
pub const WRITE_BUDGET_PER_BYTE: Duration = Duration::from_millis(10);

/// Deadline for writing a chunk of `len` bytes.
pub fn write_budget(len: usize) -> Duration {
    WRITE_BUDGET_BASE + WRITE_BUDGET_PER_BYTE * u32::try_from(len).unwrap_or(u32::MAX)
}

/// A byte-stream endpoint the bridge can pull from and push to.
///
/// Implementations must make `read_chunk` return promptly: an empty chunk is
/// the normal "nothing available yet" outcome, not an error. The loop relies
/// on this to stay single-threaded without ever stalling on one side.
pub trait ByteEndpoint {
    /// Read up to `max` bytes.
    fn read_chunk(&mut self, max: usize) -> Result<Vec<u8>, EndpointError>;

    /// Write the whole chunk or fail.
    fn write(&mut self, chunk: &[u8]) -> Result<(), EndpointError>;

    /// Release the underlying handle. Safe to call repeatedly, or on a
    /// handle that was already lost.
    fn close(&mut self);
}
