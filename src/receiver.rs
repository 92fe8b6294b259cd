//! The deencapsulation/reassembly engine.
//!
//! Grounded on the same `rubble::link::responder::Responder` dispatch pattern as
//! `transmitter::Transmitter::pack`, mirrored: here the dispatch key is the incoming PPDU's
//! `(S, E)` shape instead of an outgoing state, routing each header kind to its own handler.

use crate::buffer::ReasmBuffer;
use crate::bytes::{ByteReader, FromBytes};
use crate::codec::{Header, LabelType};
use crate::config::Config;
use crate::context::{ContextPool, NUM_CONTEXTS};
use crate::crc::crc32;
use crate::error::DeencapError;
use crate::proto_type;
use crate::stats::Stats;
use crate::Sdu;

struct RxContext {
    buffer: ReasmBuffer,
    use_crc: bool,
    label_type: LabelType,
    next_seq: u8,
}

impl Default for RxContext {
    fn default() -> Self {
        Self {
            buffer: ReasmBuffer::default(),
            use_crc: false,
            label_type: LabelType::NoSuppression,
            next_seq: 0,
        }
    }
}

/// Routes incoming PPDUs by fragment ID, reassembles ALPDUs, and delivers completed SDUs.
///
/// Not thread-safe, same caveat as [`crate::Transmitter`].
pub struct Receiver {
    config: Config,
    contexts: ContextPool<RxContext>,
    stats: [Stats; NUM_CONTEXTS],
}

impl Receiver {
    /// Creates a receiver with all 8 fragment-ID contexts free.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            contexts: ContextPool::new(),
            stats: [Stats::new(); NUM_CONTEXTS],
        }
    }

    /// Running counters for `frag_id`.
    pub fn stats(&self, frag_id: u8) -> Stats {
        self.stats[usize::from(frag_id)]
    }

    /// Returns whether `frag_id`'s context is free.
    pub fn is_free(&self, frag_id: u8) -> bool {
        self.contexts.is_free(frag_id)
    }

    /// Processes one PPDU. Returns `Ok(Some((frag_id, sdu, proto_type)))` when it completes an
    /// ALPDU, `Ok(None)` when it advances an in-progress one, and `Err` on a protocol violation.
    pub fn deencap(&mut self, ppdu_bytes: &[u8]) -> Result<Option<(u8, Sdu, u16)>, DeencapError> {
        let mut reader = ByteReader::new(ppdu_bytes);
        let header = Header::from_bytes(&mut reader)?;
        let body = reader.read_rest();

        match header {
            Header::Complete { frag_id, label_type, .. } => {
                self.handle_complete(frag_id, label_type, body)
            }
            Header::Start {
                frag_id,
                total_len,
                use_crc,
                label_type,
            } => self.handle_start(frag_id, total_len, use_crc, label_type, body),
            Header::Cont { frag_id, body_len } => {
                if body.len() != usize::from(body_len) {
                    return Err(DeencapError::MalformedHeader);
                }
                self.handle_fragment(frag_id, body, false)
            }
            Header::End { frag_id, body_len } => {
                if body.len() != usize::from(body_len) {
                    return Err(DeencapError::MalformedHeader);
                }
                self.handle_fragment(frag_id, body, true)
            }
        }
    }

    fn handle_complete(
        &mut self,
        frag_id: u8,
        label_type: LabelType,
        body: &[u8],
    ) -> Result<Option<(u8, Sdu, u16)>, DeencapError> {
        match self.contexts.acquire_any_free() {
            Ok((slot, _)) => self.contexts.release(slot),
            Err(_) => {
                self.stats[usize::from(frag_id)].note_dropped(body.len());
                return Err(DeencapError::TableExhausted);
            }
        }

        let (ptype, rest) = parse_ptype_prefix(&self.config, label_type, body)?;
        let sdu_bytes = if self.config.use_alpdu_crc() {
            if rest.len() < 4 {
                self.stats[usize::from(frag_id)].note_dropped(body.len());
                return Err(DeencapError::MalformedHeader);
            }
            let (sdu, crc_bytes) = rest.split_at(rest.len() - 4);
            let expected = u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
            if crc32(sdu) != expected {
                self.stats[usize::from(frag_id)].note_dropped(sdu.len());
                return Err(DeencapError::CrcMismatch);
            }
            sdu
        } else {
            rest
        };

        let mut sdu = Sdu::new();
        sdu.extend_from_slice(sdu_bytes)
            .map_err(|_| DeencapError::Overflow)?;
        self.stats[usize::from(frag_id)].note_ok(sdu.len());
        Ok(Some((frag_id, sdu, ptype)))
    }

    fn handle_start(
        &mut self,
        frag_id: u8,
        total_len: u16,
        use_crc: bool,
        label_type: LabelType,
        body: &[u8],
    ) -> Result<Option<(u8, Sdu, u16)>, DeencapError> {
        if use_crc != self.config.use_alpdu_crc() {
            return Err(DeencapError::MalformedHeader);
        }

        if !self.contexts.is_free(frag_id) {
            // The sender restarted mid-ALPDU: count the abandoned one as lost, then proceed with
            // the new START as if the fragment ID had been idle.
            warn!("START on busy context, frag_id={}: dropping abandoned ALPDU", frag_id);
            let abandoned = self.contexts.get(frag_id).buffer.received();
            self.stats[usize::from(frag_id)].note_dropped(abandoned);
            self.contexts.release(frag_id);
        }

        let ctx = self
            .contexts
            .acquire(frag_id)
            .expect("context was just freed");
        ctx.buffer.reset(usize::from(total_len));
        ctx.use_crc = use_crc;
        ctx.label_type = label_type;
        ctx.next_seq = 0;

        if ctx.buffer.append(body).is_err() {
            let received = ctx.buffer.received();
            self.stats[usize::from(frag_id)].note_dropped(received);
            self.contexts.release(frag_id);
            return Err(DeencapError::Overflow);
        }

        Ok(None)
    }

    fn handle_fragment(
        &mut self,
        frag_id: u8,
        body: &[u8],
        is_end: bool,
    ) -> Result<Option<(u8, Sdu, u16)>, DeencapError> {
        if self.contexts.is_free(frag_id) {
            debug!("orphan CONT/END for frag_id={}, no preceding START", frag_id);
            self.stats[usize::from(frag_id)].note_lost(1);
            return Err(DeencapError::OrphanFragment);
        }

        let ctx = self.contexts.get_mut(frag_id);
        if ctx.use_crc {
            if ctx.buffer.append(body).is_err() {
                let received = ctx.buffer.received();
                self.stats[usize::from(frag_id)].note_dropped(received);
                self.contexts.release(frag_id);
                return Err(DeencapError::Overflow);
            }
        } else {
            if body.is_empty() {
                let received = ctx.buffer.received();
                self.stats[usize::from(frag_id)].note_dropped(received);
                self.contexts.release(frag_id);
                return Err(DeencapError::MalformedHeader);
            }
            let (payload, seq_byte) = body.split_at(body.len() - 1);
            if seq_byte[0] != ctx.next_seq {
                let received = ctx.buffer.received();
                self.stats[usize::from(frag_id)].note_dropped(received);
                self.contexts.release(frag_id);
                return Err(DeencapError::SeqMismatch);
            }
            if ctx.buffer.append(payload).is_err() {
                let received = ctx.buffer.received();
                self.stats[usize::from(frag_id)].note_dropped(received);
                self.contexts.release(frag_id);
                return Err(DeencapError::Overflow);
            }
            ctx.next_seq = ctx.next_seq.wrapping_add(1);
        }

        if !is_end {
            return Ok(None);
        }

        let label_type = ctx.label_type;
        let mut alpdu = Sdu::new();
        if alpdu.extend_from_slice(ctx.buffer.as_slice()).is_err() {
            let received = ctx.buffer.received();
            self.stats[usize::from(frag_id)].note_dropped(received);
            self.contexts.release(frag_id);
            return Err(DeencapError::Overflow);
        }

        let (ptype, rest) = match parse_ptype_prefix(&self.config, label_type, &alpdu) {
            Ok(v) => v,
            Err(e) => {
                let received = alpdu.len();
                self.stats[usize::from(frag_id)].note_dropped(received);
                self.contexts.release(frag_id);
                return Err(e);
            }
        };

        let sdu_bytes = if self.config.use_alpdu_crc() {
            if rest.len() < 4 {
                self.stats[usize::from(frag_id)].note_dropped(alpdu.len());
                self.contexts.release(frag_id);
                return Err(DeencapError::MalformedHeader);
            }
            let (sdu, crc_bytes) = rest.split_at(rest.len() - 4);
            let expected = u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
            if crc32(sdu) != expected {
                warn!("CRC mismatch on frag_id={}, dropping reassembled ALPDU", frag_id);
                self.stats[usize::from(frag_id)].note_dropped(sdu.len());
                self.contexts.release(frag_id);
                return Err(DeencapError::CrcMismatch);
            }
            sdu
        } else {
            rest
        };

        let mut sdu = Sdu::new();
        if sdu.extend_from_slice(sdu_bytes).is_err() {
            self.contexts.release(frag_id);
            return Err(DeencapError::Overflow);
        }
        self.stats[usize::from(frag_id)].note_ok(sdu.len());
        self.contexts.release(frag_id);
        Ok(Some((frag_id, sdu, ptype)))
    }
}

/// Strips the ptype prefix from the front of an ALPDU (or COMPLETE PPDU body), returning the
/// protocol type and the remaining bytes (SDU, plus a CRC trailer in CRC mode).
fn parse_ptype_prefix<'a>(
    config: &Config,
    label_type: LabelType,
    body: &'a [u8],
) -> Result<(u16, &'a [u8]), DeencapError> {
    match label_type {
        LabelType::ImplicitProtoType => Ok((config.implicit_proto_type(), body)),
        LabelType::NoSuppression | LabelType::ProtoSignal => {
            let (ptype, rest) = if config.use_compressed_ptype() {
                let (&code, rest) = body.split_first().ok_or(DeencapError::MalformedHeader)?;
                if code == 0xFF {
                    if rest.len() < 2 {
                        return Err(DeencapError::MalformedHeader);
                    }
                    let ptype = u16::from_be_bytes([rest[0], rest[1]]);
                    (ptype, &rest[2..])
                } else {
                    let ptype = proto_type::decompress_ptype(code)
                        .ok_or(DeencapError::MalformedHeader)?;
                    (ptype, rest)
                }
            } else {
                if body.len() < 2 {
                    return Err(DeencapError::MalformedHeader);
                }
                let ptype = u16::from_be_bytes([body[0], body[1]]);
                (ptype, &body[2..])
            };

            // label_type = PROTO_SIGNAL asserts the field is present *and* carries the
            // signalling ptype; any other value in that position is malformed.
            if label_type == LabelType::ProtoSignal
                && ptype != proto_type::RLE_PROTO_TYPE_SIGNAL_UNCOMP
            {
                return Err(DeencapError::MalformedHeader);
            }

            Ok((ptype, rest))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transmitter::Transmitter;

    fn crc_config() -> Config {
        Config::new(0x0000, true, true, false).unwrap()
    }

    fn seqno_config() -> Config {
        Config::new(0x0000, false, true, false).unwrap()
    }

    #[test]
    fn round_trips_a_complete_ppdu() {
        let config = crc_config();
        let mut tx = Transmitter::new(config);
        let mut rx = Receiver::new(config);
        let sdu = [0xAAu8; 100];
        tx.encap(0, &sdu, 0x0800).unwrap();
        let ppdu = tx.pack(0, 200).unwrap();
        let (frag_id, out, ptype) = rx.deencap(ppdu.as_bytes()).unwrap().unwrap();
        assert_eq!(frag_id, 0);
        assert_eq!(&out[..], &sdu[..]);
        assert_eq!(ptype, 0x0800);
        assert_eq!(rx.stats(0).ok, 1);
    }

    #[test]
    fn round_trips_a_fragmented_ppdu_sequence() {
        let config = crc_config();
        let mut tx = Transmitter::new(config);
        let mut rx = Receiver::new(config);
        let sdu = [0x55u8; 1000];
        tx.encap(0, &sdu, 0x86DD).unwrap();
        for budget in [400, 400, 300] {
            let ppdu = tx.pack(0, budget).unwrap();
            let result = rx.deencap(ppdu.as_bytes()).unwrap();
            if let Some((frag_id, out, ptype)) = result {
                assert_eq!(frag_id, 0);
                assert_eq!(&out[..], &sdu[..]);
                assert_eq!(ptype, 0x86DD);
            }
        }
        assert!(rx.is_free(0));
    }

    #[test]
    fn seqno_mode_fragmented_round_trips() {
        // No CRC: the 1-byte trailing sequence number is the only fragment-ordering check, so
        // this exercises the CONT/END seq byte path end to end instead of just the CRC path.
        let config = seqno_config();
        let mut tx = Transmitter::new(config);
        let mut rx = Receiver::new(config);
        let sdu = [0x77u8; 1000];
        tx.encap(0, &sdu, 0x86DD).unwrap();
        let mut result = None;
        for budget in [400, 400, 300] {
            let ppdu = tx.pack(0, budget).unwrap();
            result = rx.deencap(ppdu.as_bytes()).unwrap();
        }
        let (frag_id, out, ptype) = result.unwrap();
        assert_eq!(frag_id, 0);
        assert_eq!(&out[..], &sdu[..]);
        assert_eq!(ptype, 0x86DD);
        assert!(rx.is_free(0));
    }

    #[test]
    fn ptype_omission_round_trips() {
        let config = Config::new(0x0800, true, true, true).unwrap();
        let mut tx = Transmitter::new(config);
        let mut rx = Receiver::new(config);
        tx.encap(0, &[0u8; 50], 0x0800).unwrap();
        let ppdu = tx.pack(0, 200).unwrap();
        let (_, out, ptype) = rx.deencap(ppdu.as_bytes()).unwrap().unwrap();
        assert_eq!(out.len(), 50);
        assert_eq!(ptype, 0x0800);
    }

    #[test]
    fn corrupted_crc_is_rejected() {
        let config = crc_config();
        let mut tx = Transmitter::new(config);
        let mut rx = Receiver::new(config);
        let sdu = [0x55u8; 1000];
        tx.encap(0, &sdu, 0x86DD).unwrap();
        let start = tx.pack(0, 400).unwrap();
        let cont = tx.pack(0, 400).unwrap();
        let mut end_bytes = tx.pack(0, 300).unwrap().as_bytes().to_vec();
        end_bytes[5] ^= 0xFF;

        assert!(rx.deencap(start.as_bytes()).unwrap().is_none());
        assert!(rx.deencap(cont.as_bytes()).unwrap().is_none());
        assert_eq!(rx.deencap(&end_bytes), Err(DeencapError::CrcMismatch));
        assert!(rx.is_free(0));
        assert_eq!(rx.stats(0).dropped, 1);
    }

    #[test]
    fn seq_mismatch_only_counts_dropped() {
        // The error table has CrcMismatch/SeqMismatch share one row (`dropped`+=1 only); this
        // guards against also bumping `lost`, which belongs to OrphanFragment/sender-restart.
        let config = seqno_config();
        let mut tx = Transmitter::new(config);
        let mut rx = Receiver::new(config);
        let sdu = [0x33u8; 1000];
        tx.encap(0, &sdu, 0x86DD).unwrap();
        let start = tx.pack(0, 400).unwrap();
        let mut cont_bytes = tx.pack(0, 400).unwrap().as_bytes().to_vec();
        *cont_bytes.last_mut().unwrap() ^= 0xFF; // corrupt the trailing seq byte

        assert!(rx.deencap(start.as_bytes()).unwrap().is_none());
        assert_eq!(rx.deencap(&cont_bytes), Err(DeencapError::SeqMismatch));
        assert!(rx.is_free(0));
        assert_eq!(rx.stats(0).dropped, 1);
        assert_eq!(rx.stats(0).lost, 0);
    }

    #[test]
    fn orphan_cont_is_rejected() {
        let config = crc_config();
        let mut rx = Receiver::new(config);
        let cont = crate::codec::Header::Cont {
            frag_id: 3,
            body_len: 10,
        };
        let mut buf = [0u8; 12];
        let mut w = crate::bytes::ByteWriter::new(&mut buf);
        crate::codec::encode_header(&mut w, cont).unwrap();
        let used = 12 - w.into_rest().len();
        assert_eq!(
            rx.deencap(&buf[..used + 10]),
            Err(DeencapError::OrphanFragment)
        );
        assert!(rx.is_free(3));
        assert_eq!(rx.stats(3).lost, 1);
    }

    #[test]
    fn sender_restart_drops_then_proceeds() {
        let config = seqno_config();
        let mut tx = Transmitter::new(config);
        let mut rx = Receiver::new(config);

        tx.encap(0, &[1u8; 20], 0x0800).unwrap();
        let start1 = tx.pack(0, 10).unwrap();
        rx.deencap(start1.as_bytes()).unwrap();
        assert!(!rx.is_free(0));

        tx.free(0);
        tx.encap(0, &[2u8; 20], 0x0800).unwrap();
        let start2 = tx.pack(0, 10).unwrap();
        assert!(rx.deencap(start2.as_bytes()).unwrap().is_none());
        assert_eq!(rx.stats(0).dropped, 1);
    }
}
