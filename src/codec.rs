//! Encoding and decoding of RLE PPDU headers.
//!
//! This module exposes pure functions only, no state: see `rubble::link::data::Header` for the
//! pattern this is adapted from (a small bit-accessor wrapper instead of casting a byte buffer to
//! a `#[repr(C)]` struct, which would make endianness and alignment hazards).
//!
//! # Header shapes
//!
//! The `(S, E)` bits of byte 0 select one of four shapes:
//!
//! ```notrust
//! COMPLETE (S=1,E=1), 2 bytes:
//!   byte0: S E | total_len[11:8] (6 bits, top 2 always 0)
//!   byte1: 0 0 | label_type(2) | rsvd(1) | frag_id(3)
//!
//! START (S=1,E=0), 4 bytes:
//!   byte0: S E | total_len[11:8]
//!   byte1: total_len[7:0]
//!   byte2: frag_id(3) | use_crc(1) | label_type(2) | rsvd(1) | rsvd(1)
//!   byte3: reserved
//!
//! CONT (S=0,E=0) / END (S=0,E=1), 2 bytes:
//!   byte0: S E | body_len[10:5]
//!   byte1: body_len[4:0] | frag_id(3)
//! ```

use heapless::consts::U4096;
use heapless::Vec;

use crate::bytes::{ByteReader, ByteWriter, FromBytes, ToBytes};
use crate::error::Error;

/// Maximum PPDU body length representable in the 11-bit CONT/END length field.
pub const MAX_BODY_LEN: u16 = 2047;

/// Maximum ALPDU length representable in the 12-bit START total-length field.
pub const MAX_TOTAL_LEN: u16 = 4095;

/// The `label_type` field carried by COMPLETE and START headers.
///
/// This is the wire-level tag for how the protocol-type prefix (if any) is represented in the
/// ALPDU, distinct from the per-link `use_compressed_ptype`/`use_ptype_omission` configuration
/// (which both ends already share and is not re-signalled per packet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelType {
    /// The ptype field is present, and the SDU's ptype differs from the link's implicit default
    /// (or omission is disabled).
    NoSuppression,
    /// The ptype field has been elided; the receiver must use its own configured implicit
    /// default.
    ImplicitProtoType,
    /// The ptype field is present and equals `RLE_PROTO_TYPE_SIGNAL_UNCOMP` (0x0082).
    ProtoSignal,
}

impl LabelType {
    fn to_bits(self) -> u8 {
        match self {
            LabelType::NoSuppression => 0b00,
            LabelType::ImplicitProtoType => 0b01,
            LabelType::ProtoSignal => 0b10,
        }
    }

    fn from_bits(bits: u8) -> Result<Self, Error> {
        match bits {
            0b00 => Ok(LabelType::NoSuppression),
            0b01 => Ok(LabelType::ImplicitProtoType),
            0b10 => Ok(LabelType::ProtoSignal),
            _ => Err(Error::InvalidValue),
        }
    }
}

/// A decoded (or to-be-encoded) PPDU header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    /// `S=1, E=1`: the PPDU body is the entire ALPDU.
    Complete {
        frag_id: u8,
        total_len: u16,
        label_type: LabelType,
    },
    /// `S=1, E=0`: the first PPDU of a fragmented ALPDU.
    Start {
        frag_id: u8,
        total_len: u16,
        use_crc: bool,
        label_type: LabelType,
    },
    /// `S=0, E=0`: a continuation fragment.
    Cont { frag_id: u8, body_len: u16 },
    /// `S=0, E=1`: the final fragment.
    End { frag_id: u8, body_len: u16 },
}

impl Header {
    /// Size in bytes of this header shape on the wire.
    pub fn size(&self) -> usize {
        match self {
            Header::Complete { .. } => 2,
            Header::Start { .. } => 4,
            Header::Cont { .. } | Header::End { .. } => 2,
        }
    }

    /// The fragment ID carried by this header.
    pub fn frag_id(&self) -> u8 {
        match *self {
            Header::Complete { frag_id, .. }
            | Header::Start { frag_id, .. }
            | Header::Cont { frag_id, .. }
            | Header::End { frag_id, .. } => frag_id,
        }
    }
}

impl ToBytes for Header {
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        encode_header(writer, *self)
    }
}

impl<'a> FromBytes<'a> for Header {
    fn from_bytes(bytes: &mut ByteReader<'a>) -> Result<Self, Error> {
        decode_header(bytes)
    }
}

/// One encoded PPDU, header and body together, as returned by `Transmitter::pack`.
#[derive(Debug, PartialEq)]
pub struct Ppdu {
    data: Vec<u8, U4096>,
}

impl Ppdu {
    pub(crate) fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub(crate) fn push_header(&mut self, header: Header) {
        let mut hdr_buf = [0u8; 4];
        let mut w = ByteWriter::new(&mut hdr_buf);
        header
            .to_bytes(&mut w)
            .expect("PPDU header always fits in 4 bytes");
        self.data
            .extend_from_slice(&hdr_buf[..header.size()])
            .expect("PPDU capacity covers header + max ALPDU size");
    }

    pub(crate) fn push_body(&mut self, body: &[u8]) {
        self.data
            .extend_from_slice(body)
            .expect("PPDU capacity covers header + max ALPDU size");
    }

    /// The encoded PPDU bytes, ready to place into a burst.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Total encoded length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether this PPDU is empty (never true for a `Ppdu` returned by `pack`).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Encodes `header` into `writer`.
///
/// `frag_id` must be in `0..8` and lengths must respect `MAX_TOTAL_LEN`/`MAX_BODY_LEN`; this is a
/// contract violation (caller bug), not a wire-format error, so it is asserted rather than
/// returned as `Result`. The engines that call this are responsible for enforcing those bounds
/// before encoding.
pub fn encode_header(writer: &mut ByteWriter<'_>, header: Header) -> Result<(), Error> {
    assert!(header.frag_id() < 8, "frag_id out of range");

    match header {
        Header::Complete {
            frag_id,
            total_len,
            label_type,
        } => {
            assert!(total_len <= MAX_TOTAL_LEN);
            let byte0 = 0b1100_0000 | (((total_len >> 8) & 0x3F) as u8);
            let byte1 = (label_type.to_bits() << 4) | frag_id;
            writer.write_u8(byte0)?;
            writer.write_u8(byte1)?;
        }
        Header::Start {
            frag_id,
            total_len,
            use_crc,
            label_type,
        } => {
            assert!(total_len <= MAX_TOTAL_LEN);
            let byte0 = 0b1000_0000 | (((total_len >> 8) & 0x3F) as u8);
            let byte1 = (total_len & 0xFF) as u8;
            let byte2 = (frag_id << 5) | ((use_crc as u8) << 4) | (label_type.to_bits() << 2);
            writer.write_u8(byte0)?;
            writer.write_u8(byte1)?;
            writer.write_u8(byte2)?;
            writer.write_u8(0)?;
        }
        Header::Cont { frag_id, body_len } | Header::End { frag_id, body_len } => {
            assert!(body_len <= MAX_BODY_LEN);
            let is_end = matches!(header, Header::End { .. });
            let byte0 = (if is_end { 0b0100_0000 } else { 0 }) | (((body_len >> 5) & 0x3F) as u8);
            let byte1 = (((body_len & 0x1F) as u8) << 3) | frag_id;
            writer.write_u8(byte0)?;
            writer.write_u8(byte1)?;
        }
    }
    Ok(())
}

/// Decodes a PPDU header from the front of `reader`.
///
/// Fails with `Error::InvalidValue` if reserved bits are set where the format requires zero, and
/// with `Error::Eof` if the buffer is shorter than the header shape it claims to be.
pub fn decode_header(reader: &mut ByteReader<'_>) -> Result<Header, Error> {
    let byte0 = reader.read_u8()?;
    let s = byte0 & 0b1000_0000 != 0;
    let e = byte0 & 0b0100_0000 != 0;
    let len_high = byte0 & 0x3F;

    match (s, e) {
        (true, true) => {
            let byte1 = reader.read_u8()?;
            let label_type = LabelType::from_bits((byte1 >> 4) & 0b11)?;
            let frag_id = byte1 & 0b111;
            if byte1 & 0b0000_1000 != 0 {
                return Err(Error::InvalidValue);
            }
            Ok(Header::Complete {
                frag_id,
                total_len: u16::from(len_high) << 8,
                label_type,
            })
        }
        (true, false) => {
            let byte1 = reader.read_u8()?;
            let byte2 = reader.read_u8()?;
            let _byte3 = reader.read_u8()?;
            let total_len = (u16::from(len_high) << 8) | u16::from(byte1);
            let frag_id = byte2 >> 5;
            let use_crc = byte2 & 0b0001_0000 != 0;
            let label_type = LabelType::from_bits((byte2 >> 2) & 0b11)?;
            Ok(Header::Start {
                frag_id,
                total_len,
                use_crc,
                label_type,
            })
        }
        (false, is_end) => {
            let byte1 = reader.read_u8()?;
            let body_len = (u16::from(len_high) << 5) | u16::from(byte1 >> 3);
            let frag_id = byte1 & 0b111;
            if is_end {
                Ok(Header::End { frag_id, body_len })
            } else {
                Ok(Header::Cont { frag_id, body_len })
            }
        }
    }
}
