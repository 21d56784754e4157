use midi_ci_codec::header::CommonHeader;
use midi_ci_codec::message::{AckNak, CiMessage};
use midi_ci_types::status::{ci_status, sub_id2};
use midi_ci_types::{Address, Muid};

/// `destMuid` must be us or the broadcast MUID; anything else is dropped
/// silently, no NAK (spec §4.2 step 2, §7 class 3).
pub fn accepts_destination(header: &CommonHeader, local: Muid) -> bool {
    header.destination == local || header.destination.is_broadcast()
}

pub fn build_nak(local: Muid, to: &CommonHeader, status: u8) -> CiMessage {
    CiMessage::Nak(AckNak {
        header: CommonHeader::new(to.addr, sub_id2::NAK, local, to.source),
        original_sub_id2: to.sub_id2,
        status_code: status,
        status_data: 0,
        details: [0; 5],
        message: Vec::new(),
    })
}

pub fn build_ack(local: Muid, to: &CommonHeader) -> CiMessage {
    CiMessage::Ack(AckNak {
        header: CommonHeader::new(to.addr, sub_id2::ACK, local, to.source),
        original_sub_id2: to.sub_id2,
        status_code: 0,
        status_data: 0,
        details: [0; 5],
        message: Vec::new(),
    })
}

/// The malformed-header case: we couldn't even decode a `CommonHeader`, so
/// there is no `to` header to reply through. Still worth a best-effort NAK
/// if the first 13 bytes at least carried a recognizable source (spec §7
/// class 1: "Action: drop, log, NAK MalformedMessage to source").
pub fn build_malformed_nak(local: Muid, source: Muid, addr: Address, original_sub_id2: u8) -> CiMessage {
    CiMessage::Nak(AckNak {
        header: CommonHeader::new(addr, sub_id2::NAK, local, source),
        original_sub_id2,
        status_code: ci_status::MALFORMED_MESSAGE,
        status_data: 0,
        details: [0; 5],
        message: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_local_and_broadcast_destinations() {
        let local = Muid(1);
        let to_us = CommonHeader::new(Address::FunctionBlock, 0x70, Muid(2), local);
        let to_broadcast = CommonHeader::new(Address::FunctionBlock, 0x70, Muid(2), Muid::BROADCAST);
        let to_other = CommonHeader::new(Address::FunctionBlock, 0x70, Muid(2), Muid(3));
        assert!(accepts_destination(&to_us, local));
        assert!(accepts_destination(&to_broadcast, local));
        assert!(!accepts_destination(&to_other, local));
    }
}
