use thiserror::Error;

/// Decode/protocol-level errors surfaced by the codec and translator.
///
/// These map onto the error taxonomy's framing/protocol classes; anything
/// above the wire-decoding layer is reported through `anyhow` instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CiError {
    #[error("malformed common header")]
    MalformedHeader,

    #[error("7-bit byte {0:#04x} has bit 7 set")]
    BadSevenBitByte(u8),

    #[error("length field overruns buffer (need {need}, have {have})")]
    BufferOverrun { need: usize, have: usize },

    #[error("unknown sub-ID 2 {0:#04x}")]
    UnknownSubId2(u8),

    #[error("chunks out of sequence for requestId={request_id}")]
    ChunksOutOfSequence { request_id: u8 },

    #[error("CI version mismatch: expected {expected:#04x}, got {got:#04x}")]
    VersionMismatch { expected: u8, got: u8 },

    #[error("unknown mutualEncoding {0:?}")]
    UnknownEncoding(String),

    #[error("zlib decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("invalid SysEx framing")]
    InvalidSysex,

    #[error("DTE sequence received out of order")]
    InvalidDteSequence,

    #[error("invalid UMP message status")]
    InvalidStatus,

    #[error("incomplete SysEx7 payload")]
    IncompleteSysex7,

    #[error("request-ID table full for this connection")]
    RequestIdTableFull,
}

impl CiError {
    /// Returns the 1-byte CI-level NAK status this error should carry, when it
    /// maps onto one at all (taxonomy classes 1-2; see spec §7). Property-level
    /// status codes such as 415 UnsupportedMediaType are separate HTTP-like
    /// integers carried in a property reply header, not in this NAK byte.
    pub fn nak_status(&self) -> Option<u8> {
        match self {
            CiError::MalformedHeader
            | CiError::BadSevenBitByte(_)
            | CiError::BufferOverrun { .. } => Some(0x41),
            CiError::ChunksOutOfSequence { .. } => Some(0x21),
            _ => None,
        }
    }
}

/// HTTP-like status codes used in property reply headers (spec §6).
pub mod property_status {
    pub const OK: u32 = 200;
    pub const ACCEPTED: u32 = 202;
    pub const RESOURCE_UNAVAILABLE: u32 = 341;
    pub const BAD_DATA: u32 = 342;
    pub const TOO_MANY_REQUESTS: u32 = 343;
    pub const BAD_REQUEST: u32 = 400;
    pub const UNAUTHORIZED: u32 = 403;
    pub const NOT_FOUND: u32 = 404;
    pub const NOT_ALLOWED: u32 = 405;
    pub const PAYLOAD_TOO_LARGE: u32 = 413;
    pub const UNSUPPORTED_MEDIA_TYPE: u32 = 415;
    pub const INVALID_DATA_VERSION: u32 = 445;
    pub const INTERNAL_ERROR: u32 = 500;
}
