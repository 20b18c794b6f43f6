/// Asynchronous framing anomalies reported through the session's event
/// callback (see [`super::Session::set_event_callback`]).
///
/// These mirror `shtp_Event_t` in the CEVA reference implementation. One
/// value from that C enum, `BAD_TX_CHAN`, is intentionally not reproduced
/// here: the reference `shtp_send` only ever increments its `badTxChan`
/// counter and returns an error code for that condition, it never invokes
/// the event callback, so an `ShtpEvent` variant for it would never fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShtpEvent {
    /// A transfer shorter than the 4-byte header, or a header whose length
    /// field was itself below 4, was received.
    ShortFragment,
    /// An inbound header advertised a payload larger than the assembly
    /// buffer.
    TooLargePayloads,
    /// An inbound transfer named a channel id ≥ 8.
    BadRxChan,
    /// An inbound fragment was inconsistent with the assembly already in
    /// progress (wrong channel, wrong sequence, missing continuation bit, or
    /// mismatched remaining length).
    BadFragment,
    /// An inbound fragment's sequence number did not match the channel's
    /// expected next sequence number. Diagnostic only: the fragment is still
    /// processed and the observed sequence becomes the new expectation.
    BadSn,
    /// An assembly in progress was abandoned because of a [`Self::BadFragment`]
    /// condition.
    InterruptedPayload,
}

/// Cookie + function pointer pair used to report [`ShtpEvent`]s.
///
/// The cookie is an opaque pointer supplied by the caller at
/// [`super::Session::set_event_callback`] time and handed back unchanged on
/// every invocation; interpreting it is the caller's responsibility (see the
/// "Callback + cookie" design note in the crate's top-level docs).
pub type EventCallback = fn(cookie: *mut (), event: ShtpEvent);
