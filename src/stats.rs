//! Per-link traffic counters.
//!
//! Grounded on the counter-struct pattern used by this crate's link-layer responder for recording
//! simple running totals (see `rubble::link::responder`'s `pub struct` fields incremented inline
//! as packets are handled), generalized here into its own type so `Transmitter` and `Receiver`
//! can each expose a `stats()` accessor.

/// Running counters for one direction of an RLE link.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// ALPDUs handed to the engine (`encap` calls that succeeded, or SDUs fully reassembled).
    pub sent: u64,
    /// SDU bytes behind `sent`.
    pub bytes_sent: u64,
    /// PPDUs successfully packed (TX) or consumed (RX).
    pub ok: u64,
    /// Bytes behind `ok`.
    pub bytes_ok: u64,
    /// ALPDUs or PPDUs dropped due to a detected error (CRC mismatch, overflow, malformed
    /// header, orphan fragment, exhausted context table).
    pub dropped: u64,
    /// Bytes behind `dropped`.
    pub bytes_dropped: u64,
    /// Fragments inferred lost due to a sequence-number gap or a sender restart.
    pub lost: u64,
}

impl Stats {
    /// A zeroed counter set.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn note_sent(&mut self, bytes: usize) {
        self.sent += 1;
        self.bytes_sent += bytes as u64;
    }

    pub(crate) fn note_ok(&mut self, bytes: usize) {
        self.ok += 1;
        self.bytes_ok += bytes as u64;
    }

    pub(crate) fn note_dropped(&mut self, bytes: usize) {
        self.dropped += 1;
        self.bytes_dropped += bytes as u64;
    }

    pub(crate) fn note_lost(&mut self, count: u64) {
        self.lost += count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let mut s = Stats::new();
        s.note_sent(100);
        s.note_ok(50);
        s.note_ok(50);
        s.note_dropped(20);
        s.note_lost(3);
        assert_eq!(s.sent, 1);
        assert_eq!(s.bytes_sent, 100);
        assert_eq!(s.ok, 2);
        assert_eq!(s.bytes_ok, 100);
        assert_eq!(s.dropped, 1);
        assert_eq!(s.bytes_dropped, 20);
        assert_eq!(s.lost, 3);
    }
}
