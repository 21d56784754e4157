/// Sub-ID 2 values that select a MIDI-CI message kind (spec §4.1 table).
pub mod sub_id2 {
    pub const DISCOVERY_INQUIRY: u8 = 0x70;
    pub const DISCOVERY_REPLY: u8 = 0x71;
    pub const INVALIDATE_MUID: u8 = 0x7E;
    pub const ACK: u8 = 0x7D;
    pub const NAK: u8 = 0x7F;
    pub const PROFILE_INQUIRY: u8 = 0x20;
    pub const PROFILE_INQUIRY_REPLY: u8 = 0x21;
    pub const PROFILE_SET_ON: u8 = 0x22;
    pub const PROFILE_SET_OFF: u8 = 0x23;
    pub const PROFILE_ENABLED_REPORT: u8 = 0x24;
    pub const PROFILE_DISABLED_REPORT: u8 = 0x25;
    pub const PROFILE_ADDED_REPORT: u8 = 0x26;
    pub const PROFILE_REMOVED_REPORT: u8 = 0x27;
    pub const PROFILE_DETAILS_INQUIRY: u8 = 0x28;
    pub const PROFILE_DETAILS_REPLY: u8 = 0x29;
    pub const PROFILE_SPECIFIC_DATA: u8 = 0x2F;
    pub const PE_CAPABILITIES_INQUIRY: u8 = 0x30;
    pub const PE_CAPABILITIES_REPLY: u8 = 0x31;
    pub const PE_GET_PROPERTY_DATA: u8 = 0x34;
    pub const PE_GET_PROPERTY_DATA_REPLY: u8 = 0x35;
    pub const PE_SET_PROPERTY_DATA: u8 = 0x36;
    pub const PE_SET_PROPERTY_DATA_REPLY: u8 = 0x37;
    pub const PE_SUBSCRIBE_PROPERTY: u8 = 0x38;
    pub const PE_SUBSCRIBE_PROPERTY_REPLY: u8 = 0x39;
    pub const PE_NOTIFY: u8 = 0x3F;
}

/// CI-level 1-byte NAK status codes (as distinct from property HTTP-like codes).
pub mod ci_status {
    pub const MALFORMED_MESSAGE: u8 = 0x41;
    pub const CHUNKS_OUT_OF_SEQUENCE: u8 = 0x21;
}

/// MIDI-CI sub-ID 1, the byte following the universal SysEx ID `0x7E`.
pub const MIDI_CI_SUB_ID1: u8 = 0x0D;
/// Current MIDI-CI protocol version transmitted in the common header.
pub const CI_VERSION: u8 = 0x02;
