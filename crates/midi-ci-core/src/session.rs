use crate::device::MidiCIDevice;
use midi_ci_ump::{Defragmenter, Sysex7Packet};
use parking_lot::Mutex;
use std::sync::Arc;

/// Bridges raw transport bytes/words to a [`MidiCIDevice`] (spec §4.9).
/// Recognizes the `F0 7E ... 0D ...` / UMP-SysEx7-with-`7E..0D` prefix and
/// routes MIDI-CI traffic to the device; anything else is handed to an
/// optional pass-through callback instead of being dropped.
pub struct SessionShim {
    device: Arc<MidiCIDevice>,
    defragmenter: Mutex<Defragmenter>,
    on_unrecognized_sysex: Mutex<Option<Box<dyn FnMut(u8, &[u8]) + Send>>>,
}

impl SessionShim {
    pub fn new(device: Arc<MidiCIDevice>) -> Self {
        SessionShim { device, defragmenter: Mutex::new(Defragmenter::new()), on_unrecognized_sysex: Mutex::new(None) }
    }

    /// Registers a callback for SysEx that isn't MIDI-CI (spec §4.9's
    /// `MidiMachineMessageReporter` pass-through).
    pub fn on_unrecognized_sysex(&self, callback: impl FnMut(u8, &[u8]) + Send + 'static) {
        *self.on_unrecognized_sysex.lock() = Some(Box::new(callback));
    }

    /// Feeds one complete MIDI 1.0 SysEx message, `F0 .. F7` inclusive.
    pub fn receive_midi1_sysex(&self, group: u8, framed: &[u8]) {
        match strip_framing(framed) {
            Some(body) => self.route(group, &body),
            None => log::warn!("dropping SysEx with missing F0/F7 framing"),
        }
    }

    /// Feeds one UMP SysEx7 packet (message type 3, two 32-bit words).
    pub fn receive_ump_sysex7(&self, words: [u32; 2]) {
        let packet = match Sysex7Packet::from_words(words) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("dropping malformed UMP SysEx7 packet: {e}");
                return;
            }
        };
        let group = packet.group;
        if let Some(body) = self.defragmenter.lock().feed(packet) {
            self.route(group, &body);
        }
    }

    fn route(&self, group: u8, body: &[u8]) {
        if is_midi_ci(body) {
            self.device.on_sysex(group, body);
        } else if let Some(cb) = self.on_unrecognized_sysex.lock().as_mut() {
            cb(group, body);
        } else {
            log::debug!("dropping non-MIDI-CI SysEx with no pass-through registered");
        }
    }
}

fn is_midi_ci(body: &[u8]) -> bool {
    body.len() >= 3 && body[0] == 0x7E && body[2] == 0x0D
}

fn strip_framing(framed: &[u8]) -> Option<Vec<u8>> {
    if framed.len() >= 2 && framed.first() == Some(&0xF0) && framed.last() == Some(&0xF7) {
        Some(framed[1..framed.len() - 1].to_vec())
    } else {
        None
    }
}

/// Wraps a bare SysEx body (as produced by [`crate::transport::OutboundFrame::Sysex`])
/// in `F0`/`F7` for a MIDI 1.0 transport.
pub fn frame_midi1_sysex(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 2);
    out.push(0xF0);
    out.extend_from_slice(body);
    out.push(0xF7);
    out
}

/// Packetizes a bare SysEx body into UMP SysEx7 words for a UMP transport.
pub fn frame_ump_sysex7(group: u8, body: &[u8]) -> Vec<[u32; 2]> {
    midi_ci_ump::sysex7::packetize(group, body).into_iter().map(|p| p.to_words()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;
    use crate::transport::ChannelTransport;
    use midi_ci_types::{DeviceDetails, Muid};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn device() -> Arc<MidiCIDevice> {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let config = DeviceConfig::new(Muid(1), DeviceDetails { manufacturer: 1, family: 2, model: 3, revision: 4 }, "unit-1");
        Arc::new(MidiCIDevice::new(config, Arc::new(ChannelTransport::new(tx))))
    }

    #[test]
    fn midi1_sysex_round_trips_through_framing() {
        let body = vec![0x7E, 0x7F, 0x0D, 0x70];
        let framed = frame_midi1_sysex(&body);
        assert_eq!(framed, vec![0xF0, 0x7E, 0x7F, 0x0D, 0x70, 0xF7]);
        assert_eq!(strip_framing(&framed).unwrap(), body);
    }

    #[test]
    fn non_midi_ci_sysex_reaches_pass_through() {
        let shim = SessionShim::new(device());
        let seen = Arc::new(AtomicBool::new(false));
        let seen2 = seen.clone();
        shim.on_unrecognized_sysex(move |_group, _body| seen2.store(true, Ordering::SeqCst));
        shim.receive_midi1_sysex(0, &[0xF0, 0x43, 0x10, 0x01, 0xF7]);
        assert!(seen.load(Ordering::SeqCst));
    }

    #[test]
    fn fragmented_ump_sysex7_reassembles_before_routing() {
        let shim = SessionShim::new(device());
        let seen = Arc::new(AtomicBool::new(false));
        let seen2 = seen.clone();
        shim.on_unrecognized_sysex(move |_group, _body| seen2.store(true, Ordering::SeqCst));

        let body = vec![0x41, 0x10, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        for packet in frame_ump_sysex7(0, &body) {
            shim.receive_ump_sysex7(packet);
        }
        assert!(seen.load(Ordering::SeqCst));
    }
}
