use thiserror::Error;

/// Crate-wide error for fallible SHTP/sh2 operations.
///
/// `E` is the calling HAL's own error type (see [`crate::hal::Hal::Error`]);
/// it is threaded through rather than boxed so the crate stays allocation-free.
#[derive(Debug, Error)]
pub enum Error<E> {
    /// Invalid channel id, or a payload larger than the HAL's max outbound
    /// payload, was passed to `send`; or an invalid channel was passed to
    /// `listen`.
    #[error("bad parameter")]
    BadParam,
    /// The session pool has no free slot for `open`.
    #[error("no capacity")]
    NoCapacity,
    /// A re-entrant `send` on the same channel was attempted from within a
    /// listener callback invoked during another `send`'s back-pressure loop.
    #[error("session busy")]
    Busy,
    /// The HAL reported a negative status from `open`, `write`, or `read`.
    #[error("HAL error: {0:?}")]
    Hal(E),
}

pub type Result<T, E> = core::result::Result<T, Error<E>>;
