use super::channel::{ChannelRecord, MAX_CHANS};
use super::counters::Counters;
use super::event::{EventCallback, ShtpEvent};

/// Reassembly state for one session's inbound direction.
///
/// Holds at most one in-progress payload at a time; SHTP has no notion of
/// interleaving fragments of different messages on different channels, so a
/// single buffer plus a "which channel, how much left" tag is sufficient
/// (mirrors `shtp_Instance_t`'s `inBuffer`/`inRemaining`/`inChan` fields).
pub(crate) struct Assembly<const PAYLOAD_IN: usize> {
    buffer: [u8; PAYLOAD_IN],
    cursor: usize,
    remaining: usize,
    chan: u8,
    timestamp_us: u64,
}

impl<const PAYLOAD_IN: usize> Default for Assembly<PAYLOAD_IN> {
    fn default() -> Self {
        Assembly {
            buffer: [0u8; PAYLOAD_IN],
            cursor: 0,
            remaining: 0,
            chan: 0,
            timestamp_us: 0,
        }
    }
}

fn emit(event_cb: Option<(EventCallback, *mut ())>, event: ShtpEvent) {
    if let Some((cb, cookie)) = event_cb {
        cb(cookie, event);
    }
}

impl<const PAYLOAD_IN: usize> Assembly<PAYLOAD_IN> {
    /// Feeds one raw transfer through the inbound reassembly state machine.
    ///
    /// `event_cb` is the session's async-event sink, already unpacked to a
    /// plain `(fn, cookie)` pair by the caller so this function stays
    /// free of any dependency on `Session`'s own layout.
    pub(crate) fn rx_assemble(
        &mut self,
        transfer: &[u8],
        t_us: u64,
        channels: &mut [ChannelRecord; MAX_CHANS],
        counters: &mut Counters,
        event_cb: Option<(EventCallback, *mut ())>,
    ) {
        log::trace!("rx_assemble: {} byte transfer at t={}", transfer.len(), t_us);

        // Gate 1: runt transfer.
        if transfer.len() < 4 {
            counters.inc_rx_short_fragments();
            log::warn!("rx_assemble: runt transfer ({} bytes)", transfer.len());
            emit(event_cb, ShtpEvent::ShortFragment);
            return;
        }

        // Gate 2: parse header.
        let payload_len = (transfer[0] as usize | ((transfer[1] as usize) << 8)) & 0x7FFF;
        let continuation = (transfer[1] & 0x80) != 0;
        let chan = transfer[2];
        let seq = transfer[3];

        // Gate 3: sequence check, diagnostic only.
        if chan as usize >= MAX_CHANS {
            // Sequence expectation for an out-of-range channel can't be
            // consulted; defer to gate 5 below.
        } else if seq != channels[chan as usize].next_in_seq {
            log::debug!(
                "rx_assemble: chan {} seq {} != expected {}",
                chan,
                seq,
                channels[chan as usize].next_in_seq
            );
            emit(event_cb, ShtpEvent::BadSn);
        }

        // Gate 4: runt payload length field.
        if payload_len < 4 {
            counters.inc_rx_short_fragments();
            log::warn!("rx_assemble: runt payload_len field ({})", payload_len);
            emit(event_cb, ShtpEvent::ShortFragment);
            return;
        }

        // Gate 5: bad channel.
        if chan as usize >= MAX_CHANS {
            counters.inc_rx_bad_chan();
            log::warn!("rx_assemble: chan {} out of range", chan);
            emit(event_cb, ShtpEvent::BadRxChan);
            return;
        }

        // Gate 6: in-progress assembly reconciliation.
        if self.remaining > 0 {
            let consistent = continuation
                && chan == self.chan
                && seq == channels[chan as usize].next_in_seq
                && payload_len - 4 == self.remaining;
            if !consistent {
                log::warn!(
                    "rx_assemble: fragment inconsistent with in-progress assembly on chan {}, {} bytes dropped",
                    self.chan,
                    self.remaining
                );
                emit(event_cb, ShtpEvent::BadFragment);
                self.remaining = 0;
                counters.inc_rx_interrupted_payloads();
                emit(event_cb, ShtpEvent::InterruptedPayload);
                // Fall through: the current fragment may start a new assembly.
            }
        }

        // Gate 7: update expected sequence, unconditionally.
        channels[chan as usize].next_in_seq = seq.wrapping_add(1);

        // Gate 8: start-of-payload path.
        if self.remaining == 0 {
            if payload_len > PAYLOAD_IN {
                counters.inc_rx_too_large_payloads();
                log::warn!(
                    "rx_assemble: payload_len {} exceeds assembly buffer ({})",
                    payload_len,
                    PAYLOAD_IN
                );
                emit(event_cb, ShtpEvent::TooLargePayloads);
                return;
            }
            self.timestamp_us = t_us;
            self.cursor = 0;
            self.chan = chan;
        }

        // Gate 9: append body. `use` is assigned fresh from this fragment's
        // own header field each time, not derived from the previous
        // `remaining` (which was only consulted for the gate 6 consistency
        // check above).
        let used = transfer.len().min(payload_len);
        let body = &transfer[4..used];
        let end = self.cursor + body.len();
        self.buffer[self.cursor..end].copy_from_slice(body);
        self.cursor = end;
        self.remaining = payload_len - used;

        // Gate 10: delivery.
        if self.remaining == 0 {
            channels[chan as usize].deliver(&self.buffer[..self.cursor], self.timestamp_us);
            self.cursor = 0;
        }
    }
}
