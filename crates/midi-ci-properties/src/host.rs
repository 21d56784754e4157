use crate::encoding::Encoding;
use crate::metadata::{CanSet, Originator, PropertyMetadata, SubscriptionEntry};
use midi_ci_codec::chunk::split_property_body;
use midi_ci_codec::header::CommonHeader;
use midi_ci_codec::message::{CiMessage, PropertyEnvelope};
use midi_ci_types::error::property_status;
use midi_ci_types::status::sub_id2;
use midi_ci_types::{Address, Muid};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

/// Feeds the host facade the live data behind the four system properties
/// (spec §4.4). Implemented by `midi_ci_core::config::DeviceConfig`.
pub trait SystemPropertySource: Send + Sync {
    fn device_info_json(&self) -> serde_json::Value;
    fn channel_list_json(&self) -> serde_json::Value;
    fn json_schema(&self) -> String;
}

const SYSTEM_PROPERTIES: [&str; 4] = ["DeviceInfo", "ChannelList", "JSONSchema", "ResourceList"];

/// Server-side property catalog and subscription table (spec §4.4).
pub struct PropertyHostFacade {
    local_muid: Muid,
    source: Arc<dyn SystemPropertySource>,
    user_properties: Mutex<HashMap<String, (PropertyMetadata, Vec<u8>)>>,
    subscriptions: Mutex<Vec<SubscriptionEntry>>,
    pub mtu: usize,
    pub chunk_overhead: usize,
}

impl PropertyHostFacade {
    pub fn new(local_muid: Muid, source: Arc<dyn SystemPropertySource>) -> Self {
        PropertyHostFacade {
            local_muid,
            source,
            user_properties: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(Vec::new()),
            mtu: 2048,
            chunk_overhead: 256,
        }
    }

    pub fn add_metadata(&self, meta: PropertyMetadata, initial_body: Vec<u8>) {
        self.user_properties.lock().insert(meta.resource.clone(), (meta, initial_body));
    }

    /// Removing an unknown property is a no-op (spec §4.4).
    pub fn remove_metadata(&self, resource: &str) {
        self.user_properties.lock().remove(resource);
    }

    fn resource_list_json(&self) -> serde_json::Value {
        let mut list: Vec<serde_json::Value> = SYSTEM_PROPERTIES
            .iter()
            .map(|name| {
                PropertyMetadata {
                    resource: name.to_string(),
                    can_get: true,
                    can_set: CanSet::None,
                    can_subscribe: false,
                    require_res_id: false,
                    media_types: vec!["application/json".to_string()],
                    encodings: vec!["ASCII".to_string()],
                    schema: String::new(),
                    can_paginate: false,
                    originator: Originator::System,
                }
                .to_json()
            })
            .collect();
        for (meta, _) in self.user_properties.lock().values() {
            list.push(meta.to_json());
        }
        serde_json::Value::Array(list)
    }

    fn system_body(&self, resource: &str) -> Option<Vec<u8>> {
        let value = match resource {
            "DeviceInfo" => self.source.device_info_json(),
            "ChannelList" => self.source.channel_list_json(),
            "JSONSchema" => {
                let schema = self.source.json_schema();
                if schema.is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str(&schema).unwrap_or(serde_json::json!({}))
                }
            }
            "ResourceList" => self.resource_list_json(),
            _ => return None,
        };
        Some(serde_json::to_vec(&value).expect("Value serialization cannot fail"))
    }

    fn reply_header(request_id: u8, status: u32, extra: serde_json::Value) -> Vec<u8> {
        let mut obj = serde_json::json!({ "status": status });
        if let (Some(obj_map), Some(extra_map)) = (obj.as_object_mut(), extra.as_object()) {
            for (k, v) in extra_map {
                obj_map.insert(k.clone(), v.clone());
            }
        }
        let _ = request_id;
        serde_json::to_vec(&obj).expect("Value serialization cannot fail")
    }

    /// Builds the (possibly chunked) reply to an inbound `GetPropertyData`.
    pub fn handle_get(&self, requester: Muid, envelope: &PropertyEnvelope) -> Vec<CiMessage> {
        let header: serde_json::Value = match serde_json::from_slice(&envelope.header) {
            Ok(v) => v,
            Err(_) => return self.error_reply(requester, envelope.request_id, property_status::BAD_REQUEST),
        };
        let resource = header.get("resource").and_then(|v| v.as_str()).unwrap_or("");
        let body = if SYSTEM_PROPERTIES.contains(&resource) {
            self.system_body(resource)
        } else {
            self.user_properties.lock().get(resource).map(|(_, body)| body.clone())
        };
        match body {
            Some(body) => {
                let reply_header = Self::reply_header(
                    envelope.request_id,
                    property_status::OK,
                    serde_json::json!({ "mediaType": "application/json" }),
                );
                let chunks =
                    split_property_body(envelope.request_id, reply_header, &body, self.mtu, self.chunk_overhead);
                chunks
                    .into_iter()
                    .map(|env| CiMessage::PropertyExchange {
                        header: CommonHeader::new(
                            Address::FunctionBlock,
                            sub_id2::PE_GET_PROPERTY_DATA_REPLY,
                            self.local_muid,
                            requester,
                        ),
                        envelope: env,
                    })
                    .collect()
            }
            None => self.error_reply(requester, envelope.request_id, property_status::RESOURCE_UNAVAILABLE),
        }
    }

    fn error_reply(&self, requester: Muid, request_id: u8, status: u32) -> Vec<CiMessage> {
        vec![CiMessage::PropertyExchange {
            header: CommonHeader::new(
                Address::FunctionBlock,
                sub_id2::PE_GET_PROPERTY_DATA_REPLY,
                self.local_muid,
                requester,
            ),
            envelope: PropertyEnvelope {
                request_id,
                header: Self::reply_header(request_id, status, serde_json::json!({})),
                total_chunks: 1,
                chunk_index: 1,
                chunk_body: Vec::new(),
            },
        }]
    }

    /// Applies an inbound `SetPropertyData`; on success, notifies every
    /// subscriber of the property and returns `(ack, notifications)` (spec
    /// §4.4).
    pub fn handle_set(&self, requester: Muid, envelope: &PropertyEnvelope) -> Vec<CiMessage> {
        let header: serde_json::Value = match serde_json::from_slice(&envelope.header) {
            Ok(v) => v,
            Err(_) => return self.error_reply(requester, envelope.request_id, property_status::BAD_DATA),
        };
        let resource = header.get("resource").and_then(|v| v.as_str()).unwrap_or("").to_string();
        let set_partial = header.get("setPartial").and_then(|v| v.as_bool()).unwrap_or(false);

        let can_set = match self.user_properties.lock().get(&resource) {
            Some((meta, _)) => meta.can_set,
            None => {
                return vec![CiMessage::PropertyExchange {
                    header: CommonHeader::new(
                        Address::FunctionBlock,
                        sub_id2::PE_SET_PROPERTY_DATA_REPLY,
                        self.local_muid,
                        requester,
                    ),
                    envelope: PropertyEnvelope {
                        request_id: envelope.request_id,
                        header: Self::reply_header(
                            envelope.request_id,
                            property_status::RESOURCE_UNAVAILABLE,
                            serde_json::json!({}),
                        ),
                        total_chunks: 1,
                        chunk_index: 1,
                        chunk_body: Vec::new(),
                    },
                }]
            }
        };

        let allowed = match (can_set, set_partial) {
            (CanSet::None, _) => false,
            (CanSet::Full, true) => false,
            (CanSet::Partial, false) => true, // a full replace still satisfies "partial" allowance in this engine
            _ => true,
        };
        if !allowed {
            return vec![self.ack_set(requester, envelope.request_id, property_status::NOT_ALLOWED)];
        }

        {
            let mut props = self.user_properties.lock();
            let (_, body) = props.get_mut(&resource).expect("existence checked above");
            if set_partial {
                let doc: serde_json::Value = serde_json::from_slice(body).unwrap_or(serde_json::json!({}));
                let spec: serde_json::Value = serde_json::from_slice(&envelope.chunk_body).unwrap_or(serde_json::json!({}));
                let updated = crate::partial::apply_partial_update(&doc, &spec);
                *body = serde_json::to_vec(&updated).expect("Value serialization cannot fail");
            } else {
                *body = envelope.chunk_body.clone();
            }
        }

        let mut out = vec![self.ack_set(requester, envelope.request_id, property_status::OK)];
        out.extend(self.notify_subscribers(&resource, set_partial, &envelope.chunk_body));
        out
    }

    fn ack_set(&self, requester: Muid, request_id: u8, status: u32) -> CiMessage {
        CiMessage::PropertyExchange {
            header: CommonHeader::new(
                Address::FunctionBlock,
                sub_id2::PE_SET_PROPERTY_DATA_REPLY,
                self.local_muid,
                requester,
            ),
            envelope: PropertyEnvelope {
                request_id,
                header: Self::reply_header(request_id, status, serde_json::json!({})),
                total_chunks: 1,
                chunk_index: 1,
                chunk_body: Vec::new(),
            },
        }
    }

    fn notify_subscribers(&self, resource: &str, set_partial: bool, body: &[u8]) -> Vec<CiMessage> {
        let subs: Vec<SubscriptionEntry> =
            self.subscriptions.lock().iter().filter(|s| s.resource == resource).cloned().collect();
        subs.into_iter()
            .map(|sub| {
                let header = serde_json::json!({
                    "command": if set_partial { "partial" } else { "full" },
                    "subscribeId": sub.subscribe_id,
                });
                CiMessage::PropertyExchange {
                    header: CommonHeader::new(
                        Address::FunctionBlock,
                        sub_id2::PE_NOTIFY,
                        self.local_muid,
                        sub.subscriber_muid,
                    ),
                    envelope: PropertyEnvelope {
                        request_id: 0,
                        header: serde_json::to_vec(&header).expect("Value serialization cannot fail"),
                        total_chunks: 1,
                        chunk_index: 1,
                        chunk_body: body.to_vec(),
                    },
                }
            })
            .collect()
    }

    /// Handles an inbound `SubscribeProperty` (`command` = `start`/`end`).
    pub fn handle_subscribe(&self, requester: Muid, envelope: &PropertyEnvelope) -> CiMessage {
        let header: serde_json::Value = serde_json::from_slice(&envelope.header).unwrap_or(serde_json::json!({}));
        let command = header.get("command").and_then(|v| v.as_str()).unwrap_or("start");
        let resource = header.get("resource").and_then(|v| v.as_str()).unwrap_or("").to_string();
        let res_id = header.get("resId").and_then(|v| v.as_str()).unwrap_or("").to_string();
        let encoding =
            header.get("mutualEncoding").and_then(|v| v.as_str()).unwrap_or(Encoding::Ascii.as_str()).to_string();

        let (status, extra) = match command {
            "start" => {
                let can_subscribe = self
                    .user_properties
                    .lock()
                    .get(&resource)
                    .map(|(meta, _)| meta.can_subscribe)
                    .unwrap_or(false);
                if !can_subscribe {
                    (property_status::NOT_ALLOWED, serde_json::json!({}))
                } else {
                    let subscribe_id = Self::mint_subscribe_id();
                    let mut subs = self.subscriptions.lock();
                    subs.retain(|s| {
                        !(s.subscriber_muid == requester && s.resource == resource && s.res_id == res_id)
                    });
                    subs.push(SubscriptionEntry {
                        subscriber_muid: requester,
                        resource: resource.clone(),
                        res_id: res_id.clone(),
                        subscribe_id: subscribe_id.clone(),
                        encoding,
                    });
                    (property_status::OK, serde_json::json!({ "subscribeId": subscribe_id }))
                }
            }
            "end" => {
                let subscribe_id = header.get("subscribeId").and_then(|v| v.as_str()).unwrap_or("");
                let mut subs = self.subscriptions.lock();
                let pos = subs.iter().position(|s| s.subscribe_id == subscribe_id && s.subscriber_muid == requester);
                match pos {
                    Some(i) => {
                        subs.remove(i);
                        (property_status::OK, serde_json::json!({}))
                    }
                    None => (property_status::NOT_FOUND, serde_json::json!({})),
                }
            }
            _ => (property_status::BAD_REQUEST, serde_json::json!({})),
        };

        CiMessage::PropertyExchange {
            header: CommonHeader::new(
                Address::FunctionBlock,
                sub_id2::PE_SUBSCRIBE_PROPERTY_REPLY,
                self.local_muid,
                requester,
            ),
            envelope: PropertyEnvelope {
                request_id: envelope.request_id,
                header: Self::reply_header(envelope.request_id, status, extra),
                total_chunks: 1,
                chunk_index: 1,
                chunk_body: Vec::new(),
            },
        }
    }

    fn mint_subscribe_id() -> String {
        let mut rng = rand::thread_rng();
        (0..8).map(|_| format!("{:x}", rng.gen_range(0u8..16u8))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSource;
    impl SystemPropertySource for FakeSource {
        fn device_info_json(&self) -> serde_json::Value {
            serde_json::json!({"manufacturer": "Example"})
        }
        fn channel_list_json(&self) -> serde_json::Value {
            serde_json::json!([])
        }
        fn json_schema(&self) -> String {
            String::new()
        }
    }

    fn facade() -> PropertyHostFacade {
        PropertyHostFacade::new(Muid(0x0076_5432), Arc::new(FakeSource))
    }

    #[test]
    fn scenario_b_get_device_info() {
        let host = facade();
        let env = PropertyEnvelope {
            request_id: 1,
            header: br#"{"resource":"DeviceInfo"}"#.to_vec(),
            total_chunks: 1,
            chunk_index: 1,
            chunk_body: Vec::new(),
        };
        let replies = host.handle_get(Muid(0x0012_3456), &env);
        assert_eq!(replies.len(), 1);
        match &replies[0] {
            CiMessage::PropertyExchange { envelope, .. } => {
                let header: serde_json::Value = serde_json::from_slice(&envelope.header).unwrap();
                assert_eq!(header["status"], 200);
                let body: serde_json::Value = serde_json::from_slice(&envelope.chunk_body).unwrap();
                assert_eq!(body["manufacturer"], "Example");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn scenario_c_chunked_get() {
        let host = facade();
        host.add_metadata(PropertyMetadata::user("X-1234"), vec![0xAB; 10_000]);
        let env = PropertyEnvelope {
            request_id: 2,
            header: br#"{"resource":"X-1234"}"#.to_vec(),
            total_chunks: 1,
            chunk_index: 1,
            chunk_body: Vec::new(),
        };
        let replies = host.handle_get(Muid(0x0012_3456), &env);
        assert_eq!(replies.len(), 6);
        let reassembled: Vec<u8> = replies
            .iter()
            .flat_map(|m| match m {
                CiMessage::PropertyExchange { envelope, .. } => envelope.chunk_body.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(reassembled, vec![0xABu8; 10_000]);
    }

    #[test]
    fn unknown_resource_is_rejected() {
        let host = facade();
        let env = PropertyEnvelope {
            request_id: 3,
            header: br#"{"resource":"Nope"}"#.to_vec(),
            total_chunks: 1,
            chunk_index: 1,
            chunk_body: Vec::new(),
        };
        let replies = host.handle_get(Muid(1), &env);
        match &replies[0] {
            CiMessage::PropertyExchange { envelope, .. } => {
                let header: serde_json::Value = serde_json::from_slice(&envelope.header).unwrap();
                assert_eq!(header["status"], property_status::RESOURCE_UNAVAILABLE);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn scenario_d_subscribe_then_partial_set_notifies() {
        let host = facade();
        host.add_metadata(PropertyMetadata::user("Mix"), br#"{"a":1,"b":{"c":2}}"#.to_vec());
        let sub_env = PropertyEnvelope {
            request_id: 4,
            header: br#"{"resource":"Mix","command":"start"}"#.to_vec(),
            total_chunks: 1,
            chunk_index: 1,
            chunk_body: Vec::new(),
        };
        let reply = host.handle_subscribe(Muid(0x0012_3456), &sub_env);
        let subscribe_id = match &reply {
            CiMessage::PropertyExchange { envelope, .. } => {
                let header: serde_json::Value = serde_json::from_slice(&envelope.header).unwrap();
                assert_eq!(header["status"], 200);
                header["subscribeId"].as_str().unwrap().to_string()
            }
            _ => panic!("wrong variant"),
        };
        assert_eq!(subscribe_id.len(), 8);

        let set_env = PropertyEnvelope {
            request_id: 5,
            header: br#"{"resource":"Mix","setPartial":true}"#.to_vec(),
            total_chunks: 1,
            chunk_index: 1,
            chunk_body: br#"{"/b/c":5}"#.to_vec(),
        };
        let replies = host.handle_set(Muid(0x0012_3456), &set_env);
        assert_eq!(replies.len(), 2);
        match &replies[1] {
            CiMessage::PropertyExchange { envelope, .. } => {
                assert_eq!(envelope.chunk_body, br#"{"/b/c":5}"#.to_vec());
            }
            _ => panic!("wrong variant"),
        }
    }
}
