//! The encapsulation/fragmentation engine.
//!
//! Grounded on `rubble::link::responder::Responder`'s dispatch-by-packet-kind-and-state pattern,
//! adapted from link-layer control PDUs to the `(S, E)`-selected PPDU shapes: `pack` is the
//! `Responder`-equivalent "what do we send next" decision point, driven off the context's state
//! instead of an incoming request.

use crate::buffer::FragBuffer;
use crate::codec::{Header, LabelType, Ppdu};
use crate::config::Config;
use crate::context::{ContextPool, NUM_CONTEXTS};
use crate::crc::crc32;
use crate::error::{EncapError, PackError};
use crate::proto_type::{self, RESERVED_VLAN_COMPRESSED_NO_PTYPE};
use crate::stats::Stats;

use crate::RLE_MAX_PDU_SIZE;

/// Minimum burst budget `pack` can work with (a CONT/END header alone).
const MIN_BURST_BUDGET: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    /// ALPDU built, no PPDU emitted yet. Corresponds to the state diagram's `UNINIT` prior to
    /// the first `pack` call — the context itself is already busy (removed from the free pool).
    Queued,
    /// START emitted; zero or more CONT emitted. Corresponds to the state diagram's `CONT`.
    Cont,
}

struct TxContext {
    /// Meaningless while the context is free; only read once `ContextPool::is_free` is false.
    /// The pool's free bitmap is the sole source of truth for busy/free, this field only
    /// disambiguates *which* busy sub-state a context is in.
    state: TxState,
    buffer: FragBuffer,
    sdu_len: usize,
    total_alpdu: usize,
    remaining_alpdu: usize,
    use_crc: bool,
    label_type: LabelType,
    proto_type: u16,
    next_seq: u8,
}

impl Default for TxContext {
    fn default() -> Self {
        Self {
            state: TxState::Queued,
            buffer: FragBuffer::default(),
            sdu_len: 0,
            total_alpdu: 0,
            remaining_alpdu: 0,
            use_crc: false,
            label_type: LabelType::NoSuppression,
            proto_type: 0,
            next_seq: 0,
        }
    }
}

/// Builds ALPDUs from SDUs and slices them into PPDUs sized to caller-supplied burst budgets.
///
/// Not thread-safe: the caller owns one `Transmitter` exclusively, or serializes access to it
/// externally. Each `encap`/`pack` call runs to completion and touches only the context it names.
pub struct Transmitter {
    config: Config,
    contexts: ContextPool<TxContext>,
    stats: [Stats; NUM_CONTEXTS],
}

impl Transmitter {
    /// Creates a transmitter with all 8 fragment-ID contexts free.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            contexts: ContextPool::new(),
            stats: [Stats::new(); NUM_CONTEXTS],
        }
    }

    /// Builds the ALPDU for `sdu` and queues it on `frag_id`, ready for `pack`.
    ///
    /// `frag_id` must be in `0..8`; passing an out-of-range value is a caller contract violation
    /// and panics rather than returning an error, since it is a caller contract violation rather
    /// than a wire- or protocol-level failure.
    pub fn encap(&mut self, frag_id: u8, sdu: &[u8], proto_type: u16) -> Result<(), EncapError> {
        assert!(usize::from(frag_id) < NUM_CONTEXTS, "frag_id out of range");

        if sdu.len() > RLE_MAX_PDU_SIZE as usize {
            self.stats[usize::from(frag_id)].note_dropped(sdu.len());
            return Err(EncapError::SduTooLarge);
        }

        let config = self.config;
        let ctx = self
            .contexts
            .acquire(frag_id)
            .map_err(|_| EncapError::ContextBusy)?;

        let (label_type, ptype_prefix, ptype_prefix_len) = build_ptype_prefix(&config, proto_type);
        let crc = if config.use_alpdu_crc() {
            Some(crc32(sdu))
        } else {
            None
        };

        ctx.buffer
            .append_alpdu(&ptype_prefix[..ptype_prefix_len], sdu, crc);
        ctx.sdu_len = sdu.len();
        ctx.total_alpdu = ctx.buffer.total_len();
        ctx.remaining_alpdu = ctx.total_alpdu;
        ctx.use_crc = config.use_alpdu_crc();
        ctx.label_type = label_type;
        ctx.proto_type = proto_type;
        ctx.next_seq = 0;
        ctx.state = TxState::Queued;

        Ok(())
    }

    /// Emits the next PPDU for `frag_id`, sized to fit within `burst_budget` bytes.
    pub fn pack(&mut self, frag_id: u8, burst_budget: usize) -> Result<Ppdu, PackError> {
        assert!(usize::from(frag_id) < NUM_CONTEXTS, "frag_id out of range");

        if burst_budget < MIN_BURST_BUDGET {
            return Err(PackError::BurstTooSmall);
        }
        if self.contexts.is_free(frag_id) {
            return Err(PackError::ContextNotInUse);
        }

        let ctx = self.contexts.get_mut(frag_id);
        let state = ctx.state;
        let seq_overhead = if ctx.use_crc { 0 } else { 1 };

        // A START header alone is 4 bytes; if the ALPDU doesn't fit as a COMPLETE and the budget
        // can't even carry a START header plus one body byte, there is no PPDU this call can
        // produce.
        if state == TxState::Queued && ctx.remaining_alpdu > burst_budget - 2 && burst_budget < 5 {
            return Err(PackError::BurstTooSmall);
        }
        // In SeqNo-trailer mode a CONT/END header (2 bytes) is followed by a 1-byte seq number,
        // so a budget of 3 leaves no room for any body byte once a context is already in `Cont` —
        // the context can only still be in `Queued` with MIN_BURST_BUDGET's bare 3-byte floor.
        if state == TxState::Cont && seq_overhead == 1 && burst_budget < 4 {
            return Err(PackError::BurstTooSmall);
        }

        let ppdu = match state {
            TxState::Queued => {
                if ctx.remaining_alpdu <= burst_budget - 2 {
                    let body = ctx.buffer.peek_next(ctx.remaining_alpdu);
                    let mut ppdu = Ppdu::new();
                    ppdu.push_header(Header::Complete {
                        frag_id,
                        total_len: ctx.total_alpdu as u16,
                        label_type: ctx.label_type,
                    });
                    ppdu.push_body(body);
                    let len = body.len();
                    ctx.buffer.commit(len);
                    ctx.remaining_alpdu -= len;
                    self.stats[usize::from(frag_id)].note_sent(ctx.sdu_len);
                    self.contexts.release(frag_id);
                    ppdu
                } else {
                    let body_budget = burst_budget - 4;
                    let body = ctx.buffer.peek_next(body_budget);
                    let mut ppdu = Ppdu::new();
                    ppdu.push_header(Header::Start {
                        frag_id,
                        total_len: ctx.total_alpdu as u16,
                        use_crc: ctx.use_crc,
                        label_type: ctx.label_type,
                    });
                    ppdu.push_body(body);
                    let len = body.len();
                    ctx.buffer.commit(len);
                    ctx.remaining_alpdu -= len;
                    ctx.next_seq = 0;
                    ctx.state = TxState::Cont;
                    ppdu
                }
            }
            TxState::Cont => {
                if ctx.remaining_alpdu + seq_overhead <= burst_budget - 2 {
                    let body = ctx.buffer.peek_next(ctx.remaining_alpdu);
                    let mut ppdu = Ppdu::new();
                    ppdu.push_header(Header::End {
                        frag_id,
                        body_len: (body.len() + seq_overhead) as u16,
                    });
                    ppdu.push_body(body);
                    if !ctx.use_crc {
                        ppdu.push_body(&[ctx.next_seq]);
                    }
                    let len = body.len();
                    ctx.buffer.commit(len);
                    ctx.remaining_alpdu -= len;
                    self.stats[usize::from(frag_id)].note_sent(ctx.sdu_len);
                    self.contexts.release(frag_id);
                    ppdu
                } else {
                    let body_budget = burst_budget - 2 - seq_overhead;
                    let body = ctx.buffer.peek_next(body_budget);
                    let mut ppdu = Ppdu::new();
                    ppdu.push_header(Header::Cont {
                        frag_id,
                        body_len: (body.len() + seq_overhead) as u16,
                    });
                    ppdu.push_body(body);
                    let seq = ctx.next_seq;
                    if !ctx.use_crc {
                        ppdu.push_body(&[seq]);
                    }
                    let len = body.len();
                    ctx.buffer.commit(len);
                    ctx.remaining_alpdu -= len;
                    ctx.next_seq = ctx.next_seq.wrapping_add(1);
                    ppdu
                }
            }
        };

        Ok(ppdu)
    }

    /// Force-releases `frag_id`'s context, as if the host had aborted the in-flight ALPDU.
    pub fn free(&mut self, frag_id: u8) {
        assert!(usize::from(frag_id) < NUM_CONTEXTS, "frag_id out of range");
        if !self.contexts.is_free(frag_id) {
            let sdu_len = self.contexts.get(frag_id).sdu_len;
            self.stats[usize::from(frag_id)].note_dropped(sdu_len);
            self.contexts.release(frag_id);
        }
    }

    /// Returns whether `frag_id`'s context is free.
    pub fn is_free(&self, frag_id: u8) -> bool {
        self.contexts.is_free(frag_id)
    }

    /// Running counters for `frag_id`.
    pub fn stats(&self, frag_id: u8) -> Stats {
        self.stats[usize::from(frag_id)]
    }
}

/// Decides the `label_type` and ptype prefix bytes for an outgoing ALPDU.
///
/// Returns the prefix bytes in a fixed 3-byte scratch array along with how many of them are
/// valid (0, 1, 2, or 3 — see [`proto_type::compress_ptype`]'s escape encoding).
fn build_ptype_prefix(config: &Config, proto_type: u16) -> (LabelType, [u8; 3], usize) {
    let is_signal = proto_type == crate::proto_type::RLE_PROTO_TYPE_SIGNAL_UNCOMP;

    if !is_signal
        && config.use_ptype_omission()
        && proto_type == config.implicit_proto_type()
    {
        return (LabelType::ImplicitProtoType, [0; 3], 0);
    }

    let label_type = if is_signal {
        LabelType::ProtoSignal
    } else {
        LabelType::NoSuppression
    };

    if config.use_compressed_ptype() {
        if let Some(code) = proto_type::compress_ptype(proto_type) {
            debug_assert_ne!(code, RESERVED_VLAN_COMPRESSED_NO_PTYPE);
            return (label_type, [code, 0, 0], 1);
        }
        let [hi, lo] = proto_type.to_be_bytes();
        return (label_type, [0xFF, hi, lo], 3);
    }

    let [hi, lo] = proto_type.to_be_bytes();
    (label_type, [hi, lo, 0], 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crc_config() -> Config {
        Config::new(0x0000, true, true, false).unwrap()
    }

    #[test]
    fn encap_rejects_oversized_sdu() {
        let mut tx = Transmitter::new(crc_config());
        let sdu = [0u8; RLE_MAX_PDU_SIZE as usize + 1];
        assert_eq!(tx.encap(0, &sdu, 0x0800), Err(EncapError::SduTooLarge));
        assert_eq!(tx.stats(0).dropped, 1);
    }

    #[test]
    fn encap_rejects_busy_context() {
        let mut tx = Transmitter::new(crc_config());
        tx.encap(0, &[1, 2, 3], 0x0800).unwrap();
        assert_eq!(tx.encap(0, &[4, 5], 0x0800), Err(EncapError::ContextBusy));
    }

    #[test]
    fn pack_complete_when_small() {
        let mut tx = Transmitter::new(crc_config());
        let sdu = [0xAAu8; 100];
        tx.encap(0, &sdu, 0x0800).unwrap();
        let ppdu = tx.pack(0, 200).unwrap();
        // header(2) + ptype(2, uncompressed since 0x0800 not implicit default) ... but
        // compression is on, so ptype compresses to 1 byte: 2 + 1 + 100 + 4 = 107.
        assert_eq!(ppdu.len(), 107);
        assert!(tx.is_free(0));
        assert_eq!(tx.stats(0).sent, 1);
    }

    #[test]
    fn pack_fragments_across_three_bursts() {
        let mut tx = Transmitter::new(crc_config());
        let sdu = [0x55u8; 1000];
        tx.encap(0, &sdu, 0x86DD).unwrap();
        let start = tx.pack(0, 400).unwrap();
        let cont = tx.pack(0, 400).unwrap();
        let end = tx.pack(0, 300).unwrap();
        assert!(tx.is_free(0));
        assert_eq!(start.len(), 4 + 396);
        assert_eq!(cont.len(), 2 + 398);
        assert_eq!(end.len(), 2 + 211);
        let total_body = (start.len() - 4) + (cont.len() - 2) + (end.len() - 2);
        assert_eq!(total_body, 1005);
    }

    #[test]
    fn pack_rejects_tiny_budget() {
        let mut tx = Transmitter::new(crc_config());
        tx.encap(0, &[1, 2, 3], 0x0800).unwrap();
        assert_eq!(tx.pack(0, 2), Err(PackError::BurstTooSmall));
    }

    #[test]
    fn pack_rejects_budget_too_small_for_a_start_header() {
        let mut tx = Transmitter::new(crc_config());
        // Large enough to not fit as COMPLETE in a 4-byte budget, too small to carry a 4-byte
        // START header plus any body.
        tx.encap(0, &[0u8; 1000], 0x0800).unwrap();
        assert_eq!(tx.pack(0, 4), Err(PackError::BurstTooSmall));
        assert!(!tx.is_free(0)); // context stays queued, nothing was consumed
    }

    #[test]
    fn pack_rejects_tiny_budget_in_seqno_cont_state() {
        let config = Config::new(0x0000, false, true, false).unwrap();
        let mut tx = Transmitter::new(config);
        tx.encap(0, &[0u8; 1000], 0x0800).unwrap();
        tx.pack(0, 400).unwrap(); // START, context now in Cont state
        assert_eq!(tx.pack(0, 3), Err(PackError::BurstTooSmall));
    }

    #[test]
    fn pack_rejects_idle_context() {
        let mut tx = Transmitter::new(crc_config());
        assert_eq!(tx.pack(0, 100), Err(PackError::ContextNotInUse));
    }

    #[test]
    fn free_releases_and_counts_drop() {
        let mut tx = Transmitter::new(crc_config());
        tx.encap(0, &[1, 2, 3], 0x0800).unwrap();
        tx.free(0);
        assert!(tx.is_free(0));
        assert_eq!(tx.stats(0).dropped, 1);
    }
}
