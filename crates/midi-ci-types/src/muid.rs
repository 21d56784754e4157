use crate::error::CiError;
use crate::sevenbit::{pack_u28, unpack_u28};

/// A 28-bit Manufacturer-Unique-Identifier, MIDI-CI's per-endpoint identity.
///
/// Valid values occupy `[1, 0x0FFF_FFFE]`; `0x0FFF_FFFF` is the broadcast
/// address and `0x7F7F_7F7F` is accepted on decode as a legacy broadcast form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Muid(pub u32);

impl Muid {
    pub const BROADCAST: Muid = Muid(0x0FFF_FFFF);
    const LEGACY_BROADCAST: u32 = 0x7F7F_7F7F;

    pub fn is_broadcast(self) -> bool {
        self.0 == Self::BROADCAST.0 || self.0 == Self::LEGACY_BROADCAST
    }

    pub fn to_bytes(self) -> [u8; 4] {
        pack_u28(self.0)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Muid, CiError> {
        unpack_u28(bytes).map(Muid)
    }

    /// A MUID is addressed to us if it names us directly or is broadcast.
    pub fn addresses(self, local: Muid) -> bool {
        self == local || self.is_broadcast()
    }
}

impl From<u32> for Muid {
    fn from(v: u32) -> Self {
        Muid(v)
    }
}

impl std::fmt::Display for Muid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_wire_bytes() {
        let m = Muid(0x0012_3456);
        assert_eq!(Muid::from_bytes(&m.to_bytes()).unwrap(), m);
    }

    #[test]
    fn broadcast_addresses_everyone() {
        let local = Muid(0x0076_5432);
        assert!(Muid::BROADCAST.addresses(local));
        assert!(local.addresses(local));
        assert!(!Muid(0x1111_1111).addresses(local));
    }
}
