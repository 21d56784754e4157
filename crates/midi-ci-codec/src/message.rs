use crate::header::{CommonHeader, HEADER_LEN};
use bytes::{Buf, BufMut};
use midi_ci_types::error::CiError;
use midi_ci_types::sevenbit::{check_seven_bit, pack_u14, unpack_u14};
use midi_ci_types::status::sub_id2::*;
use midi_ci_types::{Address, DeviceDetails, Muid, ProfileId};

/// The envelope shared by every Property Exchange message (Get/Set/Subscribe
/// and their replies, plus Notify): spec §4.1, "Property envelope".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyEnvelope {
    pub request_id: u8,
    /// Raw UTF-8 JSON object bytes; parsed by the property layer, not here.
    pub header: Vec<u8>,
    pub total_chunks: u16,
    pub chunk_index: u16,
    pub chunk_body: Vec<u8>,
}

impl PropertyEnvelope {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), CiError> {
        out.put_u8(self.request_id);
        encode_u14_len(self.header.len(), out)?;
        out.put_slice(&self.header);
        out.put_slice(&pack_u14(self.total_chunks));
        out.put_slice(&pack_u14(self.chunk_index));
        encode_u14_len(self.chunk_body.len(), out)?;
        out.put_slice(&self.chunk_body);
        Ok(())
    }

    fn decode(cursor: &mut &[u8]) -> Result<PropertyEnvelope, CiError> {
        let request_id = take_u8(cursor)?;
        let header_len = take_u14(cursor)? as usize;
        let header = take_slice(cursor, header_len)?.to_vec();
        let total_chunks = take_u14(cursor)?;
        let chunk_index = take_u14(cursor)?;
        let body_len = take_u14(cursor)? as usize;
        let chunk_body = take_slice(cursor, body_len)?.to_vec();
        Ok(PropertyEnvelope { request_id, header, total_chunks, chunk_index, chunk_body })
    }
}

/// One decoded MIDI-CI message: common header plus the sub-ID-2-specific
/// payload (spec §4.1 table).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CiMessage {
    DiscoveryInquiry {
        header: CommonHeader,
        device: DeviceDetails,
        categories: u8,
        rx_max_sysex_size: u32,
        output_path_id: u8,
    },
    DiscoveryReply {
        header: CommonHeader,
        device: DeviceDetails,
        categories: u8,
        rx_max_sysex_size: u32,
        output_path_id: u8,
        function_block: u8,
    },
    InvalidateMuid {
        header: CommonHeader,
        target_muid: Muid,
    },
    Ack(AckNak),
    Nak(AckNak),
    ProfileInquiry {
        header: CommonHeader,
    },
    ProfileInquiryReply {
        header: CommonHeader,
        enabled: Vec<ProfileId>,
        disabled: Vec<ProfileId>,
    },
    ProfileSetOn {
        header: CommonHeader,
        profile: ProfileId,
        channels: u16,
    },
    ProfileSetOff {
        header: CommonHeader,
        profile: ProfileId,
        channels: u16,
    },
    ProfileEnabledReport {
        header: CommonHeader,
        profile: ProfileId,
        channels: u16,
    },
    ProfileDisabledReport {
        header: CommonHeader,
        profile: ProfileId,
        channels: u16,
    },
    ProfileAddedReport {
        header: CommonHeader,
        profile: ProfileId,
    },
    ProfileRemovedReport {
        header: CommonHeader,
        profile: ProfileId,
    },
    ProfileDetailsInquiry {
        header: CommonHeader,
        profile: ProfileId,
        target: u8,
    },
    ProfileDetailsReply {
        header: CommonHeader,
        profile: ProfileId,
        target: u8,
        data: Vec<u8>,
    },
    ProfileSpecificData {
        header: CommonHeader,
        profile: ProfileId,
        data: Vec<u8>,
    },
    PeCapabilitiesInquiry {
        header: CommonHeader,
        max_requests: u8,
        pe_major: u8,
        pe_minor: u8,
    },
    PeCapabilitiesReply {
        header: CommonHeader,
        max_requests: u8,
        pe_major: u8,
        pe_minor: u8,
    },
    /// Any of the 0x34..0x39, 0x3F Property Exchange messages; `header.sub_id2`
    /// tells the caller which one.
    PropertyExchange {
        header: CommonHeader,
        envelope: PropertyEnvelope,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckNak {
    pub header: CommonHeader,
    pub original_sub_id2: u8,
    pub status_code: u8,
    pub status_data: u8,
    pub details: [u8; 5],
    pub message: Vec<u8>,
}

impl CiMessage {
    pub fn header(&self) -> &CommonHeader {
        match self {
            CiMessage::DiscoveryInquiry { header, .. }
            | CiMessage::DiscoveryReply { header, .. }
            | CiMessage::InvalidateMuid { header, .. }
            | CiMessage::ProfileInquiry { header }
            | CiMessage::ProfileInquiryReply { header, .. }
            | CiMessage::ProfileSetOn { header, .. }
            | CiMessage::ProfileSetOff { header, .. }
            | CiMessage::ProfileEnabledReport { header, .. }
            | CiMessage::ProfileDisabledReport { header, .. }
            | CiMessage::ProfileAddedReport { header, .. }
            | CiMessage::ProfileRemovedReport { header, .. }
            | CiMessage::ProfileDetailsInquiry { header, .. }
            | CiMessage::ProfileDetailsReply { header, .. }
            | CiMessage::ProfileSpecificData { header, .. }
            | CiMessage::PeCapabilitiesInquiry { header, .. }
            | CiMessage::PeCapabilitiesReply { header, .. }
            | CiMessage::PropertyExchange { header, .. } => header,
            CiMessage::Ack(a) | CiMessage::Nak(a) => &a.header,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CiError> {
        let mut out = Vec::new();
        self.header().encode(&mut out);
        match self {
            CiMessage::DiscoveryInquiry { device, categories, rx_max_sysex_size, output_path_id, .. } => {
                out.put_slice(&device.to_bytes());
                out.put_u8(*categories);
                encode_u28_field(*rx_max_sysex_size, &mut out)?;
                out.put_u8(*output_path_id);
            }
            CiMessage::DiscoveryReply {
                device,
                categories,
                rx_max_sysex_size,
                output_path_id,
                function_block,
                ..
            } => {
                out.put_slice(&device.to_bytes());
                out.put_u8(*categories);
                encode_u28_field(*rx_max_sysex_size, &mut out)?;
                out.put_u8(*output_path_id);
                out.put_u8(*function_block);
            }
            CiMessage::InvalidateMuid { target_muid, .. } => {
                out.put_slice(&target_muid.to_bytes());
            }
            CiMessage::Ack(a) | CiMessage::Nak(a) => {
                out.put_u8(a.original_sub_id2);
                out.put_u8(a.status_code);
                out.put_u8(a.status_data);
                out.put_slice(&a.details);
                encode_u14_len(a.message.len(), &mut out)?;
                out.put_slice(&a.message);
            }
            CiMessage::ProfileInquiry { .. } => {}
            CiMessage::ProfileInquiryReply { enabled, disabled, .. } => {
                encode_u14_len(enabled.len(), &mut out)?;
                for p in enabled {
                    out.put_slice(&p.to_bytes());
                }
                encode_u14_len(disabled.len(), &mut out)?;
                for p in disabled {
                    out.put_slice(&p.to_bytes());
                }
            }
            CiMessage::ProfileSetOn { profile, channels, .. }
            | CiMessage::ProfileSetOff { profile, channels, .. }
            | CiMessage::ProfileEnabledReport { profile, channels, .. }
            | CiMessage::ProfileDisabledReport { profile, channels, .. } => {
                out.put_slice(&profile.to_bytes());
                out.put_slice(&pack_u14(*channels));
            }
            CiMessage::ProfileAddedReport { profile, .. }
            | CiMessage::ProfileRemovedReport { profile, .. } => {
                out.put_slice(&profile.to_bytes());
            }
            CiMessage::ProfileDetailsInquiry { profile, target, .. } => {
                out.put_slice(&profile.to_bytes());
                out.put_u8(*target);
            }
            CiMessage::ProfileDetailsReply { profile, target, data, .. } => {
                out.put_slice(&profile.to_bytes());
                out.put_u8(*target);
                encode_u14_len(data.len(), &mut out)?;
                out.put_slice(data);
            }
            CiMessage::ProfileSpecificData { profile, data, .. } => {
                out.put_slice(&profile.to_bytes());
                encode_u14_len(data.len(), &mut out)?;
                out.put_slice(data);
            }
            CiMessage::PeCapabilitiesInquiry { max_requests, pe_major, pe_minor, .. }
            | CiMessage::PeCapabilitiesReply { max_requests, pe_major, pe_minor, .. } => {
                out.put_u8(*max_requests);
                out.put_u8(*pe_major);
                out.put_u8(*pe_minor);
            }
            CiMessage::PropertyExchange { envelope, .. } => {
                envelope.encode(&mut out)?;
            }
        }
        for &b in &out[HEADER_LEN..] {
            check_seven_bit(b)?;
        }
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<(CiMessage, usize), CiError> {
        let (header, header_len) = CommonHeader::decode(bytes)?;
        let mut cursor: &[u8] = &bytes[header_len..];
        let msg = match header.sub_id2 {
            DISCOVERY_INQUIRY | DISCOVERY_REPLY => {
                let device = DeviceDetails::from_bytes(take_slice(&mut cursor, DeviceDetails::WIRE_LEN)?)?;
                let categories = take_u8(&mut cursor)?;
                let rx_max_sysex_size = take_u28_field(&mut cursor)?;
                let output_path_id = take_u8(&mut cursor)?;
                if header.sub_id2 == DISCOVERY_INQUIRY {
                    CiMessage::DiscoveryInquiry { header, device, categories, rx_max_sysex_size, output_path_id }
                } else {
                    let function_block = take_u8(&mut cursor)?;
                    CiMessage::DiscoveryReply {
                        header,
                        device,
                        categories,
                        rx_max_sysex_size,
                        output_path_id,
                        function_block,
                    }
                }
            }
            INVALIDATE_MUID => {
                let target_muid = Muid::from_bytes(take_slice(&mut cursor, 4)?)?;
                CiMessage::InvalidateMuid { header, target_muid }
            }
            ACK | NAK => {
                let original_sub_id2 = take_u8(&mut cursor)?;
                let status_code = take_u8(&mut cursor)?;
                let status_data = take_u8(&mut cursor)?;
                let mut details = [0u8; 5];
                details.copy_from_slice(take_slice(&mut cursor, 5)?);
                let msg_len = take_u14(&mut cursor)? as usize;
                let message = take_slice(&mut cursor, msg_len)?.to_vec();
                let a = AckNak { header, original_sub_id2, status_code, status_data, details, message };
                if header.sub_id2 == ACK {
                    CiMessage::Ack(a)
                } else {
                    CiMessage::Nak(a)
                }
            }
            PROFILE_INQUIRY => CiMessage::ProfileInquiry { header },
            PROFILE_INQUIRY_REPLY => {
                let enabled_count = take_u14(&mut cursor)? as usize;
                let enabled = take_profile_ids(&mut cursor, enabled_count)?;
                let disabled_count = take_u14(&mut cursor)? as usize;
                let disabled = take_profile_ids(&mut cursor, disabled_count)?;
                CiMessage::ProfileInquiryReply { header, enabled, disabled }
            }
            PROFILE_SET_ON | PROFILE_SET_OFF | PROFILE_ENABLED_REPORT | PROFILE_DISABLED_REPORT => {
                let profile = ProfileId::from_bytes(take_slice(&mut cursor, 5)?)?;
                let channels = take_u14(&mut cursor)?;
                match header.sub_id2 {
                    PROFILE_SET_ON => CiMessage::ProfileSetOn { header, profile, channels },
                    PROFILE_SET_OFF => CiMessage::ProfileSetOff { header, profile, channels },
                    PROFILE_ENABLED_REPORT => CiMessage::ProfileEnabledReport { header, profile, channels },
                    _ => CiMessage::ProfileDisabledReport { header, profile, channels },
                }
            }
            PROFILE_ADDED_REPORT | PROFILE_REMOVED_REPORT => {
                let profile = ProfileId::from_bytes(take_slice(&mut cursor, 5)?)?;
                if header.sub_id2 == PROFILE_ADDED_REPORT {
                    CiMessage::ProfileAddedReport { header, profile }
                } else {
                    CiMessage::ProfileRemovedReport { header, profile }
                }
            }
            PROFILE_DETAILS_INQUIRY => {
                let profile = ProfileId::from_bytes(take_slice(&mut cursor, 5)?)?;
                let target = take_u8(&mut cursor)?;
                CiMessage::ProfileDetailsInquiry { header, profile, target }
            }
            PROFILE_DETAILS_REPLY => {
                let profile = ProfileId::from_bytes(take_slice(&mut cursor, 5)?)?;
                let target = take_u8(&mut cursor)?;
                let data_len = take_u14(&mut cursor)? as usize;
                let data = take_slice(&mut cursor, data_len)?.to_vec();
                CiMessage::ProfileDetailsReply { header, profile, target, data }
            }
            PROFILE_SPECIFIC_DATA => {
                let profile = ProfileId::from_bytes(take_slice(&mut cursor, 5)?)?;
                let data_len = take_u14(&mut cursor)? as usize;
                let data = take_slice(&mut cursor, data_len)?.to_vec();
                CiMessage::ProfileSpecificData { header, profile, data }
            }
            PE_CAPABILITIES_INQUIRY | PE_CAPABILITIES_REPLY => {
                let max_requests = take_u8(&mut cursor)?;
                let pe_major = take_u8(&mut cursor)?;
                let pe_minor = take_u8(&mut cursor)?;
                if header.sub_id2 == PE_CAPABILITIES_INQUIRY {
                    CiMessage::PeCapabilitiesInquiry { header, max_requests, pe_major, pe_minor }
                } else {
                    CiMessage::PeCapabilitiesReply { header, max_requests, pe_major, pe_minor }
                }
            }
            PE_GET_PROPERTY_DATA
            | PE_GET_PROPERTY_DATA_REPLY
            | PE_SET_PROPERTY_DATA
            | PE_SET_PROPERTY_DATA_REPLY
            | PE_SUBSCRIBE_PROPERTY
            | PE_SUBSCRIBE_PROPERTY_REPLY
            | PE_NOTIFY => {
                let envelope = PropertyEnvelope::decode(&mut cursor)?;
                CiMessage::PropertyExchange { header, envelope }
            }
            other => return Err(CiError::UnknownSubId2(other)),
        };
        let consumed = bytes.len() - cursor.remaining();
        Ok((msg, consumed))
    }
}

fn take_u8(cursor: &mut &[u8]) -> Result<u8, CiError> {
    if !cursor.has_remaining() {
        return Err(CiError::BufferOverrun { need: 1, have: 0 });
    }
    let b = cursor.get_u8();
    check_seven_bit(b)?;
    Ok(b)
}

fn take_slice<'a>(cursor: &mut &'a [u8], len: usize) -> Result<&'a [u8], CiError> {
    if cursor.remaining() < len {
        return Err(CiError::BufferOverrun { need: len, have: cursor.remaining() });
    }
    let slice = &(*cursor)[..len];
    for &b in slice {
        check_seven_bit(b)?;
    }
    cursor.advance(len);
    Ok(slice)
}

fn take_u14(cursor: &mut &[u8]) -> Result<u16, CiError> {
    let slice = take_slice(cursor, 2)?;
    unpack_u14(slice)
}

/// `rxMaxSysexSize`/similar 28-bit fields packed across 4 bytes (spec §4.1).
fn take_u28_field(cursor: &mut &[u8]) -> Result<u32, CiError> {
    let slice = take_slice(cursor, 4)?;
    midi_ci_types::sevenbit::unpack_u28(slice)
}

fn encode_u28_field(v: u32, out: &mut Vec<u8>) -> Result<(), CiError> {
    out.put_slice(&midi_ci_types::sevenbit::pack_u28(v));
    Ok(())
}

fn take_profile_ids(cursor: &mut &[u8], count: usize) -> Result<Vec<ProfileId>, CiError> {
    let mut v = Vec::with_capacity(count);
    for _ in 0..count {
        v.push(ProfileId::from_bytes(take_slice(cursor, 5)?)?);
    }
    Ok(v)
}

fn encode_u14_len(len: usize, out: &mut Vec<u8>) -> Result<(), CiError> {
    if len > 0x3FFF {
        return Err(CiError::BufferOverrun { need: len, have: 0x3FFF });
    }
    out.put_slice(&pack_u14(len as u16));
    Ok(())
}
