/// One outbound frame the core hands to the transport (spec §6, "External
/// Interfaces" / "Transport interface (outbound)").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// `sendSysex(group, bytes[])` — body without `F0`/`F7` framing; the
    /// caller adds it for MIDI 1.0 transports.
    Sysex { group: u8, body: Vec<u8> },
    /// `sendUmp(words[], timestampNs)`.
    Ump { words: Vec<u32>, timestamp_ns: u64 },
}

/// Where the core sends outbound frames. A blanket closure impl covers the
/// "callbacks, not classes" requirement (spec §4.9); [`ChannelTransport`]
/// is the test double used by the demo binary and integration tests.
pub trait Transport: Send + Sync {
    fn send(&self, frame: OutboundFrame);
}

impl<F> Transport for F
where
    F: Fn(OutboundFrame) + Send + Sync,
{
    fn send(&self, frame: OutboundFrame) {
        self(frame)
    }
}

/// Hands every outbound frame to a `crossbeam_channel::Sender`, grounded on
/// the teacher's `MockSender` dependency-injection pattern (`core/src/lib.rs`).
pub struct ChannelTransport {
    sender: crossbeam_channel::Sender<OutboundFrame>,
}

impl ChannelTransport {
    pub fn new(sender: crossbeam_channel::Sender<OutboundFrame>) -> Self {
        ChannelTransport { sender }
    }
}

impl Transport for ChannelTransport {
    fn send(&self, frame: OutboundFrame) {
        let _ = self.sender.send(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_transport_forwards_frames() {
        let seen = std::sync::Mutex::new(Vec::new());
        let transport = |frame: OutboundFrame| seen.lock().unwrap().push(frame);
        transport.send(OutboundFrame::Sysex { group: 0, body: vec![1, 2, 3] });
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn channel_transport_delivers_in_order() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let transport = ChannelTransport::new(tx);
        transport.send(OutboundFrame::Sysex { group: 0, body: vec![1] });
        transport.send(OutboundFrame::Sysex { group: 0, body: vec![2] });
        assert_eq!(rx.recv().unwrap(), OutboundFrame::Sysex { group: 0, body: vec![1] });
        assert_eq!(rx.recv().unwrap(), OutboundFrame::Sysex { group: 0, body: vec![2] });
    }
}
