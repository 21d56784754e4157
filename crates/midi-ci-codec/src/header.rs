use bytes::{Buf, BufMut};
use midi_ci_types::error::CiError;
use midi_ci_types::status::{CI_VERSION, MIDI_CI_SUB_ID1};
use midi_ci_types::{Address, Muid};

/// The 13-byte prefix every MIDI-CI SysEx body carries (spec §3):
/// `7E addr 0D subId2 ver srcMuid(4) dstMuid(4)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonHeader {
    pub addr: Address,
    pub sub_id2: u8,
    pub version: u8,
    pub source: Muid,
    pub destination: Muid,
}

pub const HEADER_LEN: usize = 13;
const UNIVERSAL_SYSEX_ID: u8 = 0x7E;

impl CommonHeader {
    pub fn new(addr: Address, sub_id2: u8, source: Muid, destination: Muid) -> Self {
        CommonHeader { addr, sub_id2, version: CI_VERSION, source, destination }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.put_u8(UNIVERSAL_SYSEX_ID);
        out.put_u8(self.addr.to_byte());
        out.put_u8(MIDI_CI_SUB_ID1);
        out.put_u8(self.sub_id2);
        out.put_u8(self.version);
        out.put_slice(&self.source.to_bytes());
        out.put_slice(&self.destination.to_bytes());
    }

    /// Parses the header prefix, returning it along with the byte offset the
    /// payload starts at (always [`HEADER_LEN`], kept for symmetry with the
    /// rest of the decode API).
    pub fn decode(bytes: &[u8]) -> Result<(CommonHeader, usize), CiError> {
        if bytes.len() < HEADER_LEN {
            return Err(CiError::BufferOverrun { need: HEADER_LEN, have: bytes.len() });
        }
        let mut cursor = bytes;
        let universal_id = cursor.get_u8();
        let addr = Address::from_byte(cursor.get_u8());
        let sub_id1 = cursor.get_u8();
        if universal_id != UNIVERSAL_SYSEX_ID || sub_id1 != MIDI_CI_SUB_ID1 {
            return Err(CiError::MalformedHeader);
        }
        let sub_id2 = cursor.get_u8();
        let version = cursor.get_u8();
        let mut source_bytes = [0u8; 4];
        cursor.copy_to_slice(&mut source_bytes);
        let mut destination_bytes = [0u8; 4];
        cursor.copy_to_slice(&mut destination_bytes);
        let source = Muid::from_bytes(&source_bytes)?;
        let destination = Muid::from_bytes(&destination_bytes)?;
        Ok((CommonHeader { addr, sub_id2, version, source, destination }, HEADER_LEN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let h = CommonHeader::new(
            Address::FunctionBlock,
            0x70,
            Muid(0x0012_3456),
            Muid::BROADCAST,
        );
        let mut buf = Vec::new();
        h.encode(&mut buf);
        assert_eq!(buf.len(), HEADER_LEN);
        let (decoded, len) = CommonHeader::decode(&buf).unwrap();
        assert_eq!(len, HEADER_LEN);
        assert_eq!(decoded, h);
    }

    #[test]
    fn rejects_wrong_universal_id() {
        let mut buf = vec![0x7F, 0x7F, 0x0D, 0x70, 0x02];
        buf.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(CommonHeader::decode(&buf), Err(CiError::MalformedHeader));
    }
}
