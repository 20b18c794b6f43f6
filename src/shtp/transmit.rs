use super::channel::{ChannelRecord, MAX_CHANS};

/// Stamps one fragment's 4-byte SHTP header into `staging[0..4]` and
/// advances `chan`'s outbound sequence counter.
///
/// Pulled out of [`super::Session::send`] as a pure, independently testable
/// step; the surrounding fragmentation loop and HAL retry live on `Session`
/// itself since they need to call back into `Session::service` for
/// back-pressure draining, which a free function can't do without aliasing
/// `Session`'s own fields.
pub(crate) fn stamp_header(
    staging: &mut [u8],
    chunk: usize,
    continuation: bool,
    chan: u8,
    channels: &mut [ChannelRecord; MAX_CHANS],
) -> usize {
    let length_field = chunk + 4;
    staging[0] = (length_field & 0xFF) as u8;
    staging[1] = ((length_field >> 8) & 0x7F) as u8 | if continuation { 0x80 } else { 0 };
    staging[2] = chan;
    let record = &mut channels[chan as usize];
    staging[3] = record.next_out_seq;
    record.next_out_seq = record.next_out_seq.wrapping_add(1);
    length_field
}
