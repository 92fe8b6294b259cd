use core::fmt;

/// Low-level errors raised by the wire codec.
///
/// These are wrapped into the operation-specific error enums (`ConfigError`, `EncapError`,
/// `PackError`, `DeencapError`) rather than surfaced directly, except where the codec error
/// *is* the whole story (a malformed header).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum Error {
    /// Reached the end of the buffer while reading or writing.
    Eof,
    /// A field held a value that is not valid for its position (reserved bits set, length out of
    /// range, ...).
    InvalidValue,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Error::Eof => "end of buffer",
            Error::InvalidValue => "invalid value for field",
        })
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Errors raised by [`crate::config::Config::new`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum ConfigError {
    /// `implicit_proto_type` was set to the reserved VLAN-compressed-without-ptype code
    /// (`0x31`), which cannot be represented unambiguously on the wire.
    UnsupportedImplicitPtype,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigError::UnsupportedImplicitPtype => {
                "implicit_proto_type conflicts with the reserved VLAN-compressed-without-ptype code"
            }
        })
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

/// Errors raised by [`crate::Transmitter::encap`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum EncapError {
    /// The SDU is longer than `RLE_MAX_PDU_SIZE` (4088 bytes).
    SduTooLarge,
    /// The context for the requested fragment ID already holds an SDU in flight.
    ContextBusy,
}

impl fmt::Display for EncapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EncapError::SduTooLarge => "SDU exceeds RLE_MAX_PDU_SIZE",
            EncapError::ContextBusy => "fragment ID context is already in use",
        })
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncapError {}

/// Errors raised by [`crate::Transmitter::pack`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum PackError {
    /// `burst_budget` was smaller than the minimum PPDU size (3 bytes).
    BurstTooSmall,
    /// The context for the requested fragment ID is not in use (nothing queued to pack).
    ContextNotInUse,
}

impl fmt::Display for PackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PackError::BurstTooSmall => "burst budget is smaller than the minimum PPDU size",
            PackError::ContextNotInUse => "no ALPDU queued for this fragment ID",
        })
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PackError {}

/// Errors raised by [`crate::Receiver::deencap`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum DeencapError {
    /// The PPDU header violated the wire format (reserved bits set, length out of range, buffer
    /// too short).
    MalformedHeader,
    /// A CONT or END PPDU arrived for a fragment ID with no context in use (no preceding START).
    OrphanFragment,
    /// Writing the PPDU body would overflow the ALPDU's declared total length.
    Overflow,
    /// The END PPDU's CRC-32 trailer did not match the reassembled SDU.
    CrcMismatch,
    /// The sequence-number trailer did not match the next expected value.
    SeqMismatch,
    /// A COMPLETE PPDU arrived but all 8 contexts are busy.
    TableExhausted,
}

impl fmt::Display for DeencapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeencapError::MalformedHeader => "malformed PPDU header",
            DeencapError::OrphanFragment => "CONT/END PPDU with no matching START",
            DeencapError::Overflow => "PPDU body would overflow the declared ALPDU length",
            DeencapError::CrcMismatch => "CRC-32 trailer mismatch",
            DeencapError::SeqMismatch => "sequence number trailer mismatch",
            DeencapError::TableExhausted => "all fragment ID contexts are busy",
        })
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DeencapError {}

impl From<Error> for DeencapError {
    fn from(_: Error) -> Self {
        DeencapError::MalformedHeader
    }
}
