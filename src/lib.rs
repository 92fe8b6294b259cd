//! Return Link Encapsulation (RLE) for DVB-RCS2 satellite return links.
//!
//! RLE packs variable-length upper-layer packets (SDUs) into the fixed-capacity bursts carried
//! by a satellite return link, fragmenting an SDU across several bursts when it doesn't fit in
//! one, and reassembling fragments on the other end. Up to 8 SDUs can be interleaved on one link,
//! each named by a 3-bit fragment ID.
//!
//! # Using this crate
//!
//! This crate is runtime and hardware-agnostic: it performs no I/O and does not assume an
//! allocator. The caller owns a [`Transmitter`] or [`Receiver`], feeds it SDUs or PPDU bytes, and
//! is responsible for actually putting bytes on the wire and deciding burst sizes.
//!
//! * [`Transmitter::encap`] + repeated [`Transmitter::pack`] turn one SDU into a stream of PPDUs.
//! * [`Receiver::deencap`], called once per received PPDU, yields a reassembled SDU when an
//!   ALPDU completes.

#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod utils;
#[macro_use]
mod log;

pub mod buffer;
pub mod bytes;
pub mod codec;
pub mod config;
pub mod context;
mod crc;
mod error;
pub mod proto_type;
pub mod receiver;
pub mod stats;
pub mod transmitter;

pub use self::config::{Config, ConfigBuilder};
pub use self::error::{ConfigError, DeencapError, EncapError, Error, PackError};
pub use self::receiver::Receiver;
pub use self::transmitter::Transmitter;

/// Largest SDU a [`Transmitter::encap`] call accepts.
pub const RLE_MAX_PDU_SIZE: u16 = 4088;

/// Largest ALPDU (SDU plus ptype prefix and CRC suffix) this crate can build or reassemble.
///
/// Sized for the worst case: a full [`RLE_MAX_PDU_SIZE`] SDU, a 3-byte escaped ptype prefix, and
/// a 4-byte CRC trailer (`4088 + 3 + 4`). Also fits within the 12-bit START total-length field
/// (max 4095).
pub const RLE_MAX_ALPDU_SIZE: u16 = 4095;

/// A reassembled SDU, as delivered by [`Receiver::deencap`].
pub type Sdu = heapless::Vec<u8, heapless::consts::U4096>;
