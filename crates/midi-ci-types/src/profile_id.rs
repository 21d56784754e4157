use crate::error::CiError;

/// A 5-byte profile name. Equality is bytewise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProfileId(pub [u8; 5]);

impl ProfileId {
    pub const WIRE_LEN: usize = 5;

    pub fn from_bytes(bytes: &[u8]) -> Result<ProfileId, CiError> {
        if bytes.len() < Self::WIRE_LEN {
            return Err(CiError::BufferOverrun { need: Self::WIRE_LEN, have: bytes.len() });
        }
        let mut arr = [0u8; 5];
        arr.copy_from_slice(&bytes[..5]);
        Ok(ProfileId(arr))
    }

    pub fn to_bytes(self) -> [u8; 5] {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let id = ProfileId([0x7E, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(ProfileId::from_bytes(&id.to_bytes()).unwrap(), id);
    }
}
