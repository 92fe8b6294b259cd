//! Link-wide RLE configuration.
//!
//! A [`Config`] is immutable once built and shared (by value, it's small and `Copy`) between a
//! [`crate::Transmitter`] and a [`crate::Receiver`] operating on the same link. The two directions
//! must agree on a `Config` out of band; this crate does not negotiate it.

use crate::error::ConfigError;

/// The reserved compressed protocol-type code for "VLAN-compressed, no ptype field present".
///
/// An `implicit_proto_type` that collides with this code cannot be represented unambiguously on
/// the wire and is rejected by [`Config::new`].
const RESERVED_VLAN_COMPRESSED_NO_PTYPE: u16 = 0x31;

/// Link-wide RLE knobs, validated and frozen at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    implicit_proto_type: u16,
    use_alpdu_crc: bool,
    use_compressed_ptype: bool,
    use_ptype_omission: bool,
}

impl Config {
    /// Builds and validates a `Config`.
    ///
    /// Fails with [`ConfigError::UnsupportedImplicitPtype`] if `implicit_proto_type` collides
    /// with the reserved VLAN-compressed-without-ptype code.
    pub fn new(
        implicit_proto_type: u16,
        use_alpdu_crc: bool,
        use_compressed_ptype: bool,
        use_ptype_omission: bool,
    ) -> Result<Self, ConfigError> {
        if implicit_proto_type == RESERVED_VLAN_COMPRESSED_NO_PTYPE {
            return Err(ConfigError::UnsupportedImplicitPtype);
        }

        Ok(Self {
            implicit_proto_type,
            use_alpdu_crc,
            use_compressed_ptype,
            use_ptype_omission,
        })
    }

    /// Starts a [`ConfigBuilder`] with the link defaults (CRC trailer, compression on, omission
    /// off, implicit proto-type `0x0000`).
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// The default Ethertype assumed when `use_ptype_omission` elides the ptype field.
    pub fn implicit_proto_type(&self) -> u16 {
        self.implicit_proto_type
    }

    /// `true` selects the CRC-32 trailer mode, `false` selects the sequence-number trailer mode.
    pub fn use_alpdu_crc(&self) -> bool {
        self.use_alpdu_crc
    }

    /// Whether known protocol types are encoded in their 1-byte compressed form.
    pub fn use_compressed_ptype(&self) -> bool {
        self.use_compressed_ptype
    }

    /// Whether an SDU whose type matches `implicit_proto_type` may omit the ptype field.
    pub fn use_ptype_omission(&self) -> bool {
        self.use_ptype_omission
    }
}

/// Chainable builder for [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigBuilder {
    implicit_proto_type: u16,
    use_alpdu_crc: bool,
    use_compressed_ptype: bool,
    use_ptype_omission: bool,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            implicit_proto_type: 0x0000,
            use_alpdu_crc: true,
            use_compressed_ptype: true,
            use_ptype_omission: false,
        }
    }
}

impl ConfigBuilder {
    /// Sets the link's default Ethertype.
    pub fn implicit_proto_type(mut self, value: u16) -> Self {
        self.implicit_proto_type = value;
        self
    }

    /// Selects the trailer mode: `true` for CRC-32, `false` for the sequence-number trailer.
    pub fn use_alpdu_crc(mut self, value: bool) -> Self {
        self.use_alpdu_crc = value;
        self
    }

    /// Enables or disables compressed protocol-type encoding.
    pub fn use_compressed_ptype(mut self, value: bool) -> Self {
        self.use_compressed_ptype = value;
        self
    }

    /// Enables or disables ptype omission for SDUs matching the implicit default.
    pub fn use_ptype_omission(mut self, value: bool) -> Self {
        self.use_ptype_omission = value;
        self
    }

    /// Validates the accumulated settings and builds a [`Config`].
    pub fn build(self) -> Result<Config, ConfigError> {
        Config::new(
            self.implicit_proto_type,
            self.use_alpdu_crc,
            self.use_compressed_ptype,
            self.use_ptype_omission,
        )
    }
}
