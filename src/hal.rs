//! The byte-transfer abstraction SHTP is built on.
//!
//! A `Hal` implementation knows nothing about channels, fragmentation, or
//! sequence numbers — it only moves whole transfers across a physical bus.
//! SHTP is the layer that turns a sequence of these transfers into
//! channel-multiplexed messages (see [`crate::shtp`]).

/// Largest single bus transaction and largest logical payload, in each
/// direction, that a [`Hal`] implementation supports.
///
/// These are compile-time facts about the physical link (I2C/SPI/UART
/// transfer limits, DMA buffer sizes, ...), not something SHTP negotiates at
/// runtime.
pub trait HalLimits {
    /// Largest transfer (header + body) the HAL can receive in one `read`.
    const MAX_TRANSFER_IN: usize;
    /// Largest transfer (header + body) the HAL can send in one `write`.
    const MAX_TRANSFER_OUT: usize;
    /// Largest logical payload (across all its fragments) the HAL's receive
    /// path can buffer.
    const MAX_PAYLOAD_IN: usize;
    /// Largest logical payload (across all its fragments) a caller may hand
    /// to `send`.
    const MAX_PAYLOAD_OUT: usize;
}

/// A hardware abstraction layer: open/close a link and move whole transfers
/// across it.
///
/// Implementations are expected to be non-blocking: `write` returns `Ok(0)`
/// rather than blocking when the bus isn't ready, and `read` returns `Ok(0)`
/// rather than blocking when nothing has arrived. [`crate::shtp::Session`]
/// relies on this to implement its cooperative back-pressure loop (spec
/// §4.3) without ever spinning inside the HAL itself.
pub trait Hal: HalLimits {
    /// HAL-specific error type, returned on negative status from the
    /// underlying driver.
    type Error: core::fmt::Debug;

    /// Open the underlying link. Called exactly once, from
    /// [`crate::shtp::Session::open`].
    fn open(&mut self) -> Result<(), Self::Error>;

    /// Close the underlying link. Called exactly once, from
    /// [`crate::shtp::Session::close`].
    fn close(&mut self);

    /// Write one transfer of `len` bytes from `buf[..len]`.
    ///
    /// Returns `Ok(0)` if the bus is busy and the caller should retry,
    /// `Ok(n)` with `n > 0` on success, `Err(_)` on a hard failure.
    fn write(&mut self, buf: &[u8], len: usize) -> Result<usize, Self::Error>;

    /// Read at most one transfer into `buf[..cap]`.
    ///
    /// Returns `Ok((0, _))` if nothing is available. On `Ok((n, t_us))` with
    /// `n > 0`, `buf[..n]` holds one complete transfer and `t_us` is a
    /// monotonic microsecond timestamp captured when that transfer began
    /// arriving.
    fn read(&mut self, buf: &mut [u8], cap: usize) -> Result<(usize, u64), Self::Error>;
}
