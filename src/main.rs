//! Demo: two in-process `MidiCIDevice`s wired together over
//! `crossbeam-channel`, running discovery, a profile toggle, and a
//! Property Exchange Get round trip end to end.

use midi_ci::{
    CanSet, ChannelTransport, DeviceConfig, DeviceDetails, MidiCIDevice, Muid, Originator, PropertyMetadata,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn pump(rx: crossbeam_channel::Receiver<midi_ci::OutboundFrame>, target: Arc<MidiCIDevice>) {
    thread::spawn(move || {
        for frame in rx {
            match frame {
                midi_ci::OutboundFrame::Sysex { group, body } => target.on_sysex(group, &body),
                midi_ci::OutboundFrame::Ump { .. } => log::debug!("demo transport only carries SysEx frames"),
            }
        }
    });
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let (a_tx, a_rx) = crossbeam_channel::unbounded();
    let (b_tx, b_rx) = crossbeam_channel::unbounded();

    let config_a = DeviceConfig::new(Muid(0x0010_0001), DeviceDetails { manufacturer: 0x00_1234, family: 1, model: 1, revision: 1 }, "host-unit");
    let config_b = DeviceConfig::new(Muid(0x0010_0002), DeviceDetails { manufacturer: 0x00_1234, family: 1, model: 2, revision: 1 }, "client-unit");

    let device_a = Arc::new(MidiCIDevice::new(config_a, Arc::new(ChannelTransport::new(a_tx))));
    let device_b = Arc::new(MidiCIDevice::new(config_b, Arc::new(ChannelTransport::new(b_tx))));

    device_a.register_user_property(
        PropertyMetadata {
            resource: "X-Greeting".to_string(),
            can_get: true,
            can_set: CanSet::Full,
            can_subscribe: false,
            require_res_id: false,
            media_types: vec!["application/json".to_string()],
            encodings: vec!["ASCII".to_string()],
            schema: String::new(),
            can_paginate: false,
            originator: Originator::User,
        },
        br#""hello from the host""#.to_vec(),
    );

    pump(a_rx, device_b.clone());
    pump(b_rx, device_a.clone());

    let b_for_cb = device_b.clone();
    device_b.on_connection_established(move |remote| {
        log::info!("client: connection established with {remote}");
        let _ = b_for_cb.get_property(remote, "X-Greeting", "", None);
    });
    device_a.on_connection_established(|remote| log::info!("host: connection established with {remote}"));

    device_b.send_discovery_inquiry()?;
    thread::sleep(Duration::from_millis(50));

    if let Some(body) = device_b.cached_property(Muid(0x0010_0001), "X-Greeting", "") {
        log::info!("client read back property: {}", String::from_utf8_lossy(&body));
    }

    Ok(())
}
