//! Tuning constants for the relay.
//!
//! The values carry over the original relay's field-tested tuning. Read the
//! note on a constant before changing it.

/// Serial side.
pub mod serial {
    /// Per-step read cap in bytes.
    ///
    /// Small on purpose: one serial read may block for up to the driver's
    /// read timeout, so the cap bounds how long a single loop iteration can
    /// spend on the serial side.
    pub const READ_CHUNK: usize = 32;
}

/// Pipe side.
pub mod pipe {
    /// Receive buffer for pipe reads, in bytes.
    ///
    /// The pipe is non-blocking, so a large read costs nothing when the
    /// channel is quiet.
    pub const READ_BUFFER: usize = 512;

    /// Upper bound on waiting for a busy channel, per open attempt.
    ///
    /// A channel that reports busy is polled until it frees up or this
    /// window lapses; only then does the attempt report Busy to the retry
    /// loop around it.
    pub const BUSY_WAIT_MS: u64 = 20_000;

    /// Poll interval while waiting out a busy channel.
    pub const BUSY_POLL_MS: u64 = 250;
}

/// Retry pacing.
pub mod retry {
    /// Startup open retries, counted after the initial attempt.
    ///
    /// With the 2000 ms initial delay doubling per retry, a dead endpoint
    /// costs 2+4+8+16+32 s of waiting before the process gives up.
    pub const STARTUP_MAX_RETRIES: u32 = 5;

    /// Delay before the first startup retry; doubles per retry.
    pub const STARTUP_DELAY_MS: u64 = 2_000;

    /// Constant delay between mid-session reconnect attempts.
    ///
    /// Reconnection retries forever, so this never grows: a USB device that
    /// stays unplugged for an hour is probed every five seconds, not once a
    /// day.
    pub const RECONNECT_DELAY_MS: u64 = 5_000;

    /// Pause between closing a stale handle and reopening it.
    ///
    /// Drivers need a moment to release the descriptor before the same
    /// device can be opened again.
    pub const RECLAIM_COOLDOWN_MS: u64 = 50;
}
