/// Diagnostic counters for anomalies seen by a [`super::Session`].
///
/// Every counter here corresponds to one row of the error taxonomy in the
/// crate's top-level docs: a condition that is recoverable, never panics,
/// and never drops the session, but is worth tallying for a host
/// application that wants visibility into link health.
#[derive(Default, Debug, Clone, Copy)]
pub struct Counters {
    rx_bad_chan: u32,
    rx_short_fragments: u32,
    rx_too_large_payloads: u32,
    rx_interrupted_payloads: u32,

    bad_tx_chan: u32,
    tx_discards: u32,
    tx_too_large_payloads: u32,
}

impl Counters {
    pub(crate) fn inc_rx_bad_chan(&mut self) {
        self.rx_bad_chan += 1;
    }
    pub fn rx_bad_chan(&self) -> u32 {
        self.rx_bad_chan
    }

    pub(crate) fn inc_rx_short_fragments(&mut self) {
        self.rx_short_fragments += 1;
    }
    pub fn rx_short_fragments(&self) -> u32 {
        self.rx_short_fragments
    }

    pub(crate) fn inc_rx_too_large_payloads(&mut self) {
        self.rx_too_large_payloads += 1;
    }
    pub fn rx_too_large_payloads(&self) -> u32 {
        self.rx_too_large_payloads
    }

    pub(crate) fn inc_rx_interrupted_payloads(&mut self) {
        self.rx_interrupted_payloads += 1;
    }
    pub fn rx_interrupted_payloads(&self) -> u32 {
        self.rx_interrupted_payloads
    }

    pub(crate) fn inc_bad_tx_chan(&mut self) {
        self.bad_tx_chan += 1;
    }
    pub fn bad_tx_chan(&self) -> u32 {
        self.bad_tx_chan
    }

    pub(crate) fn inc_tx_discards(&mut self) {
        self.tx_discards += 1;
    }
    pub fn tx_discards(&self) -> u32 {
        self.tx_discards
    }

    pub(crate) fn inc_tx_too_large_payloads(&mut self) {
        self.tx_too_large_payloads += 1;
    }
    pub fn tx_too_large_payloads(&self) -> u32 {
        self.tx_too_large_payloads
    }

    /// Reset every counter to zero.
    pub fn reset(&mut self) {
        *self = Counters::default();
    }
}
