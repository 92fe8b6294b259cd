//! The protocol-type table: mapping between 16-bit Ethertype/LLC values and the 7-bit compressed
//! RLE proto-type codes, and classification of the signalling/VLAN special cases.
//!
//! Grounded on the closed, `enum_with_unknown!`-based enumerations used throughout this crate's
//! model implementation (see e.g. its `uuid` module) for protocol identifiers with a bounded
//! well-known set plus an escape for anything else.

/// The uncompressed protocol type used for RLE signalling packets.
pub const RLE_PROTO_TYPE_SIGNAL_UNCOMP: u16 = 0x0082;

/// The reserved compressed code for "VLAN-compressed, no ptype field present" (rejected at
/// transmitter construction, see [`crate::config::Config::new`]).
pub const RESERVED_VLAN_COMPRESSED_NO_PTYPE: u8 = 0x31;

enum_with_unknown! {
    /// A well-known protocol type (Ethertype or LLC value) carried in an ALPDU's ptype prefix.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ProtoType(u16) {
        Ipv4 = 0x0800,
        Arp = 0x0806,
        Ipv6 = 0x86DD,
        VlanQ = 0x8100,
        VlanQinQ = 0x88A8,
        MplsUnicast = 0x8847,
        MplsMulticast = 0x8848,
        Ipv4Crtp = 0x0060,
        Rarp = 0x8035,
        AppleTalk = 0x809B,
        AppleTalkArp = 0x80F3,
        Ipx = 0x8137,
        Lacp = 0x8809,
        Cobranet = 0x8819,
        Ppp = 0x880B,
        PppoeDiscovery = 0x8863,
        PppoeSession = 0x8864,
        JumboFrames = 0x8870,
        Eapol = 0x888E,
        Profinet = 0x8892,
        HyperScsi = 0x889A,
        AtaOverEthernet = 0x88A2,
        EtherCat = 0x88A4,
        EthernetPowerlink = 0x88AB,
        Lldp = 0x88CC,
        HomePlugAv = 0x88E1,
        Macsec = 0x88E5,
        Ptp = 0x88F7,
        Fcoe = 0x8906,
        Signal = 0x0082,
    }
}

impl ProtoType {
    /// Returns whether this type carries a second (inner) VLAN tag on the wire.
    pub fn vlan_has_secondary(&self) -> bool {
        matches!(self, ProtoType::VlanQinQ)
    }

    /// Returns whether this is the RLE signalling type.
    pub fn is_signal(&self) -> bool {
        matches!(self, ProtoType::Signal)
    }
}

/// One entry of the static protocol-type table.
struct Entry {
    uncompressed: u16,
    compressed: u8,
}

/// The closed enumeration of compressible protocol types.
///
/// Compressed codes are arbitrary small values assigned by this table; `0x31` is reserved (see
/// [`RESERVED_VLAN_COMPRESSED_NO_PTYPE`]) and never assigned to a real entry.
const TABLE: &[Entry] = &[
    Entry { uncompressed: 0x0800, compressed: 0x01 }, // IPv4
    Entry { uncompressed: 0x0806, compressed: 0x02 }, // ARP
    Entry { uncompressed: 0x86DD, compressed: 0x03 }, // IPv6
    Entry { uncompressed: 0x8100, compressed: 0x04 }, // VLAN, no secondary header
    Entry { uncompressed: 0x88A8, compressed: 0x05 }, // VLAN, secondary header (QinQ)
    Entry { uncompressed: 0x8847, compressed: 0x06 }, // MPLS unicast
    Entry { uncompressed: 0x8848, compressed: 0x07 }, // MPLS multicast
    Entry { uncompressed: 0x0060, compressed: 0x08 }, // IPv4 with compressed RTP/UDP/IP header
    Entry { uncompressed: 0x8035, compressed: 0x09 }, // RARP
    Entry { uncompressed: 0x809B, compressed: 0x0A }, // AppleTalk
    Entry { uncompressed: 0x80F3, compressed: 0x0B }, // AppleTalk ARP
    Entry { uncompressed: 0x8137, compressed: 0x0C }, // IPX
    Entry { uncompressed: 0x8809, compressed: 0x0D }, // Slow Protocols (LACP)
    Entry { uncompressed: 0x8819, compressed: 0x0E }, // CobraNet
    Entry { uncompressed: 0x880B, compressed: 0x0F }, // PPP
    Entry { uncompressed: 0x8863, compressed: 0x10 }, // PPPoE discovery
    Entry { uncompressed: 0x8864, compressed: 0x11 }, // PPPoE session
    Entry { uncompressed: 0x8870, compressed: 0x12 }, // Jumbo frames
    Entry { uncompressed: 0x888E, compressed: 0x13 }, // EAPOL (802.1X)
    Entry { uncompressed: 0x8892, compressed: 0x14 }, // PROFINET
    Entry { uncompressed: 0x889A, compressed: 0x15 }, // HyperSCSI
    Entry { uncompressed: 0x88A2, compressed: 0x16 }, // ATA over Ethernet
    Entry { uncompressed: 0x88A4, compressed: 0x17 }, // EtherCAT
    Entry { uncompressed: 0x88AB, compressed: 0x18 }, // Ethernet Powerlink
    Entry { uncompressed: 0x88CC, compressed: 0x19 }, // LLDP
    Entry { uncompressed: 0x88E1, compressed: 0x1A }, // HomePlug AV
    Entry { uncompressed: 0x88E5, compressed: 0x1B }, // MACsec (802.1AE)
    Entry { uncompressed: 0x88F7, compressed: 0x1C }, // PTP (1588)
    Entry { uncompressed: 0x8906, compressed: 0x1D }, // FCoE
    Entry {
        uncompressed: RLE_PROTO_TYPE_SIGNAL_UNCOMP,
        compressed: 0x42,
    },
];

/// Looks up the 7-bit compressed code for `ptype`, if it is in the compressible set.
///
/// Returns `None` when `ptype` must be encoded in its uncompressed (escaped) form.
pub fn compress_ptype(ptype: u16) -> Option<u8> {
    TABLE
        .iter()
        .find(|e| e.uncompressed == ptype)
        .map(|e| e.compressed)
}

/// Looks up the uncompressed 16-bit value for a compressed code.
///
/// Returns `None` for codes not present in the table (including the reserved `0x31`), which a
/// well-formed sender never emits.
pub fn decompress_ptype(code: u8) -> Option<u16> {
    TABLE
        .iter()
        .find(|e| e.compressed == code)
        .map(|e| e.uncompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressible_round_trips() {
        for entry in TABLE {
            let code = compress_ptype(entry.uncompressed).unwrap();
            assert_eq!(code, entry.compressed);
            assert_eq!(decompress_ptype(code), Some(entry.uncompressed));
        }
    }

    #[test]
    fn non_compressible_type_has_no_code() {
        assert_eq!(compress_ptype(0xDEAD), None);
    }

    #[test]
    fn reserved_code_is_never_assigned() {
        assert!(TABLE
            .iter()
            .all(|e| e.compressed != RESERVED_VLAN_COMPRESSED_NO_PTYPE));
    }

    #[test]
    fn proto_type_from_raw() {
        assert_eq!(ProtoType::from(0x0800), ProtoType::Ipv4);
        assert_eq!(ProtoType::from(0x1234), ProtoType::Unknown(0x1234));
        assert!(ProtoType::from(RLE_PROTO_TYPE_SIGNAL_UNCOMP).is_signal());
    }
}
