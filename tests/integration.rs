//! End-to-end scenarios driven through two in-process `MidiCIDevice`s
//! wired by hand, one frame at a time, so each step is deterministic.

use midi_ci::{
    CanSet, ChannelTransport, DeviceConfig, DeviceDetails, MidiCIDevice, Muid, Originator, OutboundFrame,
    PropertyMetadata, SessionShim,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn make_device(muid: Muid, product_instance_id: &str) -> (Arc<MidiCIDevice>, crossbeam_channel::Receiver<OutboundFrame>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let config = DeviceConfig::new(muid, DeviceDetails { manufacturer: 0x00_1234, family: 1, model: 1, revision: 1 }, product_instance_id);
    (Arc::new(MidiCIDevice::new(config, Arc::new(ChannelTransport::new(tx)))), rx)
}

fn drain_and_deliver(rx: &crossbeam_channel::Receiver<OutboundFrame>, target: &MidiCIDevice) {
    while let Ok(frame) = rx.try_recv() {
        if let OutboundFrame::Sysex { group, body } = frame {
            target.on_sysex(group, &body);
        }
    }
}

fn user_property(resource: &str, can_set: CanSet, can_subscribe: bool) -> PropertyMetadata {
    PropertyMetadata {
        resource: resource.to_string(),
        can_get: true,
        can_set,
        can_subscribe,
        require_res_id: false,
        media_types: vec!["application/json".to_string()],
        encodings: vec!["ASCII".to_string()],
        schema: String::new(),
        can_paginate: false,
        originator: Originator::User,
    }
}

#[test]
fn scenario_a_discovery_round_trip_establishes_connection() {
    let (dev_a, rx_a) = make_device(Muid(1), "a");
    let (dev_b, rx_b) = make_device(Muid(2), "b");

    let established = Arc::new(AtomicBool::new(false));
    let established2 = established.clone();
    dev_b.on_connection_established(move |remote| {
        assert_eq!(remote, Muid(1));
        established2.store(true, Ordering::SeqCst);
    });

    dev_b.send_discovery_inquiry().unwrap();
    drain_and_deliver(&rx_b, &dev_a);
    drain_and_deliver(&rx_a, &dev_b);

    assert!(established.load(Ordering::SeqCst));
    assert_eq!(dev_b.remote_device_details(Muid(1)).unwrap().model, 1);
}

#[test]
fn scenario_b_get_device_info_round_trip() {
    let (dev_a, rx_a) = make_device(Muid(1), "a");
    let (dev_b, rx_b) = make_device(Muid(2), "b");

    dev_b.get_property(Muid(1), "DeviceInfo", "", None).unwrap();
    drain_and_deliver(&rx_b, &dev_a);
    drain_and_deliver(&rx_a, &dev_b);

    let body = dev_b.cached_property(Muid(1), "DeviceInfo", "").unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["manufacturer"], 0x00_1234);
    assert_eq!(json["productInstanceId"], "a");
}

#[test]
fn scenario_c_chunked_get_reassembles_across_multiple_frames() {
    let (dev_a, rx_a) = make_device(Muid(1), "a");
    let (dev_b, rx_b) = make_device(Muid(2), "b");

    let big = vec![0xABu8; 10_000];
    dev_a.register_user_property(user_property("X-Big", CanSet::None, false), big.clone());

    dev_b.get_property(Muid(1), "X-Big", "", None).unwrap();
    drain_and_deliver(&rx_b, &dev_a);
    assert!(rx_a.len() > 1, "a large property should split across several reply frames");
    drain_and_deliver(&rx_a, &dev_b);

    assert_eq!(dev_b.cached_property(Muid(1), "X-Big", ""), Some(big));
}

#[test]
fn scenario_d_subscribe_then_partial_set_notifies() {
    let (dev_a, rx_a) = make_device(Muid(1), "a");
    let (dev_b, rx_b) = make_device(Muid(2), "b");

    dev_a.register_user_property(user_property("Mix", CanSet::Partial, true), br#"{"a":1,"b":{"c":2}}"#.to_vec());

    dev_b.get_property(Muid(1), "Mix", "", None).unwrap();
    drain_and_deliver(&rx_b, &dev_a);
    drain_and_deliver(&rx_a, &dev_b);
    assert_eq!(dev_b.cached_property(Muid(1), "Mix", ""), Some(br#"{"a":1,"b":{"c":2}}"#.to_vec()));

    dev_b.subscribe_property(Muid(1), "Mix", "").unwrap();
    drain_and_deliver(&rx_b, &dev_a);
    drain_and_deliver(&rx_a, &dev_b);

    dev_b.set_property(Muid(1), "Mix", "", br#"{"/b/c":5}"#.to_vec(), None, true).unwrap();
    drain_and_deliver(&rx_b, &dev_a);
    drain_and_deliver(&rx_a, &dev_b);

    let updated: serde_json::Value = serde_json::from_slice(&dev_b.cached_property(Muid(1), "Mix", "").unwrap()).unwrap();
    assert_eq!(updated, serde_json::json!({"a": 1, "b": {"c": 5}}));
}

#[test]
fn scenario_e_spurious_reply_is_ignored_without_panic() {
    let (_dev_a, _rx_a) = make_device(Muid(1), "a");
    let (dev_b, _rx_b) = make_device(Muid(2), "b");

    let msg = midi_ci::message::CiMessage::PropertyExchange {
        header: midi_ci::header::CommonHeader::new(
            midi_ci::Address::FunctionBlock,
            midi_ci_types::status::sub_id2::PE_GET_PROPERTY_DATA_REPLY,
            Muid(1),
            Muid(2),
        ),
        envelope: midi_ci::message::PropertyEnvelope {
            request_id: 99,
            header: br#"{"status":200}"#.to_vec(),
            total_chunks: 1,
            chunk_index: 1,
            chunk_body: b"nobody asked for this".to_vec(),
        },
    };
    let bytes = midi_ci::message::CiMessage::encode(&msg).unwrap();
    dev_b.on_sysex(0, &bytes);

    assert!(dev_b.cached_property(Muid(1), "anything", "").is_none());
}

#[test]
fn scenario_f_discovery_fragmented_over_ump_sysex7() {
    let (dev_a, rx_a) = make_device(Muid(1), "a");
    let (dev_b, rx_b) = make_device(Muid(2), "b");
    let shim_a = SessionShim::new(dev_a.clone());

    dev_b.send_discovery_inquiry().unwrap();
    let frame = rx_b.try_recv().expect("discovery inquiry was sent");
    let body = match frame {
        OutboundFrame::Sysex { body, .. } => body,
        OutboundFrame::Ump { .. } => panic!("expected a SysEx frame"),
    };
    assert!(body.len() > 6, "discovery inquiry should need more than one SysEx7 packet");

    for packet in midi_ci::frame_ump_sysex7(0, &body) {
        shim_a.receive_ump_sysex7(packet);
    }
    drain_and_deliver(&rx_a, &dev_b);

    assert!(dev_b.remote_device_details(Muid(1)).is_some());
}
