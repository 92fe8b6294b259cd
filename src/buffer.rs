//! Per-ALPDU byte arenas for fragmentation (TX) and reassembly (RX).
//!
//! Grounded on `rubble::link::queue::SimpleQueue`'s pattern of a fixed backing array with cursors
//! into it, adapted from a byte *queue* shared across many PDUs to a single-ALPDU *arena* owned by
//! one context: `FragBuffer` tracks how much of the arena has been emitted so far, `ReasmBuffer`
//! tracks how much has been received so far.
//!
//! These replace a dual-purpose pointer distinguished at runtime by a direction tag with two
//! distinct types, one per direction.

use heapless::consts::U4096;
use heapless::Vec;

use crate::RLE_MAX_ALPDU_SIZE;

/// A fragmentation buffer: holds one ALPDU being sliced into PPDUs at the transmitter.
pub struct FragBuffer {
    data: Vec<u8, U4096>,
    /// Byte offset of the next slice `peek_next` will return.
    emit_cursor: usize,
}

impl FragBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            emit_cursor: 0,
        }
    }

    /// Empties the buffer and resets cursors.
    pub fn reset(&mut self) {
        self.data.clear();
        self.emit_cursor = 0;
    }

    /// Appends the ALPDU content (`ptype` prefix, `sdu`, and optional CRC suffix) to the buffer.
    ///
    /// Panics if the combined length would exceed `RLE_MAX_ALPDU_SIZE`; callers must validate SDU
    /// size before calling this (see `Transmitter::encap`).
    pub fn append_alpdu(&mut self, ptype_bytes: &[u8], sdu: &[u8], crc: Option<u32>) {
        self.reset();
        self.data.extend_from_slice(ptype_bytes).unwrap();
        self.data.extend_from_slice(sdu).unwrap();
        if let Some(crc) = crc {
            self.data.extend_from_slice(&crc.to_be_bytes()).unwrap();
        }
        assert!(self.data.len() <= RLE_MAX_ALPDU_SIZE as usize);
    }

    /// The total length of the ALPDU currently held.
    pub fn total_len(&self) -> usize {
        self.data.len()
    }

    /// Bytes not yet emitted by `peek_next`.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.emit_cursor
    }

    /// Returns the next slice to emit, of at most `max_bytes`, without advancing the cursor.
    ///
    /// The caller must call `commit` with the number of bytes it actually used once it has copied
    /// them into the outgoing PPDU.
    pub fn peek_next(&self, max_bytes: usize) -> &[u8] {
        let end = (self.emit_cursor + max_bytes).min(self.data.len());
        &self.data[self.emit_cursor..end]
    }

    /// Advances the emit cursor by `len` bytes, as returned by a prior `peek_next`.
    pub fn commit(&mut self, len: usize) {
        self.emit_cursor = (self.emit_cursor + len).min(self.data.len());
    }
}

impl Default for FragBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// A reassembly buffer: holds one ALPDU being reconstructed at the receiver.
pub struct ReasmBuffer {
    data: Vec<u8, U4096>,
    expected_len: usize,
}

/// Error returned by `ReasmBuffer::append` when the write would exceed `expected_len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow;

impl ReasmBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            expected_len: 0,
        }
    }

    /// Empties the buffer and sets the expected total ALPDU length (from the START header).
    pub fn reset(&mut self, total_len: usize) {
        self.data.clear();
        self.expected_len = total_len;
    }

    /// Appends `bytes` to the buffer.
    ///
    /// Fails with `Overflow` (without modifying the buffer) if doing so would exceed the expected
    /// total length set by `reset`.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), Overflow> {
        if self.data.len() + bytes.len() > self.expected_len {
            return Err(Overflow);
        }
        self.data.extend_from_slice(bytes).map_err(|_| Overflow)
    }

    /// Bytes received so far.
    pub fn received(&self) -> usize {
        self.data.len()
    }

    /// The total length this ALPDU was declared to have.
    pub fn expected_len(&self) -> usize {
        self.expected_len
    }

    /// Whether every expected byte has been written.
    pub fn is_complete(&self) -> bool {
        self.data.len() == self.expected_len
    }

    /// The reassembled bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl Default for ReasmBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frag_buffer_slices_in_order() {
        let mut buf = FragBuffer::new();
        buf.append_alpdu(&[0xAB], &[1, 2, 3, 4, 5], None);
        assert_eq!(buf.total_len(), 6);
        let first = buf.peek_next(3).to_vec();
        buf.commit(first.len());
        assert_eq!(first, [0xAB, 1, 2]);
        assert_eq!(buf.remaining(), 3);
        let rest = buf.peek_next(100).to_vec();
        buf.commit(rest.len());
        assert_eq!(rest, [3, 4, 5]);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn reasm_buffer_overflow() {
        let mut buf = ReasmBuffer::new();
        buf.reset(4);
        buf.append(&[1, 2]).unwrap();
        assert_eq!(buf.append(&[3, 4, 5]), Err(Overflow));
        buf.append(&[3, 4]).unwrap();
        assert!(buf.is_complete());
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4]);
    }
}
