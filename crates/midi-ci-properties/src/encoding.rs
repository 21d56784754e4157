use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use midi_ci_types::error::CiError;
use std::io::{Read, Write};

/// `mutualEncoding` header values (spec §6, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Ascii,
    Mcoded7,
    ZlibMcoded7,
}

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Ascii => "ASCII",
            Encoding::Mcoded7 => "Mcoded7",
            Encoding::ZlibMcoded7 => "zlib+Mcoded7",
        }
    }

    pub fn parse(s: &str) -> Result<Encoding, CiError> {
        match s {
            "ASCII" => Ok(Encoding::Ascii),
            "Mcoded7" => Ok(Encoding::Mcoded7),
            "zlib+Mcoded7" => Ok(Encoding::ZlibMcoded7),
            other => Err(CiError::UnknownEncoding(other.to_string())),
        }
    }

    pub fn encode(self, body: &[u8]) -> Vec<u8> {
        match self {
            Encoding::Ascii => body.to_vec(),
            Encoding::Mcoded7 => mcoded7_encode(body),
            Encoding::ZlibMcoded7 => mcoded7_encode(&zlib_deflate(body)),
        }
    }

    pub fn decode(self, wire: &[u8]) -> Result<Vec<u8>, CiError> {
        match self {
            Encoding::Ascii => Ok(wire.to_vec()),
            Encoding::Mcoded7 => Ok(mcoded7_decode(wire)),
            Encoding::ZlibMcoded7 => zlib_inflate(&mcoded7_decode(wire)),
        }
    }
}

/// Packs every 7 input bytes into 8 output bytes: one MSB byte whose bit `i`
/// is the high bit of input byte `i`, followed by the 7 bytes with their high
/// bit cleared (spec §4.7). Size expansion is exactly `ceil(len/7)*8` (P5).
pub fn mcoded7_encode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len().div_ceil(7) * 8);
    for group in input.chunks(7) {
        let mut msb_byte = 0u8;
        for (i, &b) in group.iter().enumerate() {
            if b & 0x80 != 0 {
                msb_byte |= 1 << i;
            }
        }
        out.push(msb_byte);
        for &b in group {
            out.push(b & 0x7F);
        }
    }
    out
}

/// Inverse of [`mcoded7_encode`].
pub fn mcoded7_decode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for group in input.chunks(8) {
        if group.is_empty() {
            continue;
        }
        let msb_byte = group[0];
        for (i, &b) in group[1..].iter().enumerate() {
            let high = if msb_byte & (1 << i) != 0 { 0x80 } else { 0 };
            out.push(b | high);
        }
    }
    out
}

fn zlib_deflate(input: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(input).expect("in-memory writer cannot fail");
    encoder.finish().expect("in-memory writer cannot fail")
}

fn zlib_inflate(input: &[u8]) -> Result<Vec<u8>, CiError> {
    let mut decoder = ZlibDecoder::new(input);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(|e| CiError::DecompressionFailed(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcoded7_is_identity_for_arbitrary_bytes() {
        let input: Vec<u8> = (0..=255u8).collect();
        let encoded = mcoded7_encode(&input);
        assert_eq!(encoded.len(), input.len().div_ceil(7) * 8);
        assert!(encoded.iter().all(|b| b & 0x80 == 0));
        assert_eq!(mcoded7_decode(&encoded), input);
    }

    #[test]
    fn mcoded7_empty_input_round_trips() {
        assert_eq!(mcoded7_decode(&mcoded7_encode(&[])), Vec::<u8>::new());
    }

    #[test]
    fn zlib_mcoded7_round_trips() {
        let body = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let wire = Encoding::ZlibMcoded7.encode(&body);
        assert!(wire.iter().all(|b| b & 0x80 == 0));
        assert_eq!(Encoding::ZlibMcoded7.decode(&wire).unwrap(), body);
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        assert!(Encoding::parse("bogus").is_err());
    }

    #[test]
    fn truncated_zlib_mcoded7_wire_bytes_are_rejected() {
        let body = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let mut wire = Encoding::ZlibMcoded7.encode(&body);
        wire.truncate(wire.len() / 2);
        assert!(matches!(Encoding::ZlibMcoded7.decode(&wire), Err(CiError::DecompressionFailed(_))));
    }
}
