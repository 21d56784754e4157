use crate::encoding::Encoding;
use crate::metadata::{ClientSubscription, ClientSubscriptionState, PropertyMetadata};
use midi_ci_codec::header::CommonHeader;
use midi_ci_codec::message::{CiMessage, PropertyEnvelope};
use midi_ci_types::status::sub_id2;
use midi_ci_types::{Address, Muid};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    PropertyUpdated { property_id: String },
    CatalogUpdated,
    SubscriptionError { property_id: String, status: u32 },
}

#[derive(Debug, Clone)]
enum PendingKind {
    Get { property_id: String, res_id: String, encoding: Encoding },
    Set { property_id: String },
}

/// Mirrors a remote device's advertised property catalog and owns this
/// connection's active subscriptions (spec §4.5).
pub struct PropertyClientFacade {
    local_muid: Muid,
    remote_muid: Muid,
    catalog: Mutex<Vec<PropertyMetadata>>,
    cache: Mutex<HashMap<(String, String), Vec<u8>>>,
    pending: Mutex<HashMap<u8, PendingKind>>,
    subscriptions: Mutex<Vec<ClientSubscription>>,
}

impl PropertyClientFacade {
    pub fn new(local_muid: Muid, remote_muid: Muid) -> Self {
        PropertyClientFacade {
            local_muid,
            remote_muid,
            catalog: Mutex::new(Vec::new()),
            cache: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Called once the connection is established; requests `ResourceList`.
    pub fn discover_catalog(&self, request_id: u8) -> CiMessage {
        self.send_get_property_data(request_id, "ResourceList", "", None, -1, -1)
    }

    pub fn send_get_property_data(
        &self,
        request_id: u8,
        property_id: &str,
        res_id: &str,
        encoding: Option<Encoding>,
        offset: i64,
        limit: i64,
    ) -> CiMessage {
        let mut header = serde_json::json!({ "resource": property_id });
        if !res_id.is_empty() {
            header["resId"] = serde_json::Value::String(res_id.to_string());
        }
        if let Some(enc) = encoding {
            header["mutualEncoding"] = serde_json::Value::String(enc.as_str().to_string());
        }
        if offset >= 0 {
            header["offset"] = serde_json::Value::from(offset);
        }
        if limit >= 0 {
            header["limit"] = serde_json::Value::from(limit);
        }
        self.pending.lock().insert(
            request_id,
            PendingKind::Get {
                property_id: property_id.to_string(),
                res_id: res_id.to_string(),
                encoding: encoding.unwrap_or(Encoding::Ascii),
            },
        );
        CiMessage::PropertyExchange {
            header: CommonHeader::new(
                Address::FunctionBlock,
                sub_id2::PE_GET_PROPERTY_DATA,
                self.local_muid,
                self.remote_muid,
            ),
            envelope: PropertyEnvelope {
                request_id,
                header: serde_json::to_vec(&header).expect("Value serialization cannot fail"),
                total_chunks: 1,
                chunk_index: 1,
                chunk_body: Vec::new(),
            },
        }
    }

    /// `partial=true` treats `data` as the JSON-pointer update document; no
    /// cache update happens until a subscription notifies or a re-Get lands
    /// (spec §4.5).
    pub fn send_set_property_data(
        &self,
        request_id: u8,
        property_id: &str,
        res_id: &str,
        data: Vec<u8>,
        encoding: Option<Encoding>,
        partial: bool,
    ) -> CiMessage {
        let mut header = serde_json::json!({ "resource": property_id, "setPartial": partial });
        if !res_id.is_empty() {
            header["resId"] = serde_json::Value::String(res_id.to_string());
        }
        if let Some(enc) = encoding {
            header["mutualEncoding"] = serde_json::Value::String(enc.as_str().to_string());
        }
        self.pending.lock().insert(request_id, PendingKind::Set { property_id: property_id.to_string() });
        CiMessage::PropertyExchange {
            header: CommonHeader::new(
                Address::FunctionBlock,
                sub_id2::PE_SET_PROPERTY_DATA,
                self.local_muid,
                self.remote_muid,
            ),
            envelope: PropertyEnvelope {
                request_id,
                header: serde_json::to_vec(&header).expect("Value serialization cannot fail"),
                total_chunks: 1,
                chunk_index: 1,
                chunk_body: data,
            },
        }
    }

    /// Processes a reassembled reply (chunk manager has already joined the
    /// body). Returns the event to raise, if any.
    pub fn handle_reply(&self, request_id: u8, header: &serde_json::Value, body: &[u8]) -> Option<ClientEvent> {
        let pending = self.pending.lock().remove(&request_id)?;
        match pending {
            PendingKind::Get { property_id, res_id, encoding } => {
                let status = header.get("status").and_then(|v| v.as_u64()).unwrap_or(500);
                if status != 200 {
                    return Some(ClientEvent::SubscriptionError { property_id, status: status as u32 });
                }
                let decoded = encoding.decode(body).ok()?;
                if property_id == "ResourceList" {
                    self.apply_catalog(&decoded);
                    return Some(ClientEvent::CatalogUpdated);
                }
                self.cache.lock().insert((property_id.clone(), res_id), decoded);
                Some(ClientEvent::PropertyUpdated { property_id })
            }
            PendingKind::Set { property_id } => {
                let status = header.get("status").and_then(|v| v.as_u64()).unwrap_or(500);
                if status != 200 {
                    Some(ClientEvent::SubscriptionError { property_id, status: status as u32 })
                } else {
                    None
                }
            }
        }
    }

    fn apply_catalog(&self, body: &[u8]) {
        let Ok(serde_json::Value::Array(items)) = serde_json::from_slice::<serde_json::Value>(body) else {
            return;
        };
        let new_ids: Vec<String> =
            items.iter().filter_map(|v| v.get("resource").and_then(|r| r.as_str()).map(str::to_string)).collect();
        self.cache.lock().retain(|(id, _), _| new_ids.contains(id));
        *self.catalog.lock() = items
            .into_iter()
            .filter_map(|v| {
                Some(PropertyMetadata {
                    resource: v.get("resource")?.as_str()?.to_string(),
                    can_get: v.get("canGet").and_then(|b| b.as_bool()).unwrap_or(true),
                    can_set: crate::metadata::CanSet::None,
                    can_subscribe: v.get("canSubscribe").and_then(|b| b.as_bool()).unwrap_or(false),
                    require_res_id: v.get("requireResId").and_then(|b| b.as_bool()).unwrap_or(false),
                    media_types: Vec::new(),
                    encodings: Vec::new(),
                    schema: String::new(),
                    can_paginate: false,
                    originator: crate::metadata::Originator::System,
                })
            })
            .collect();
    }

    pub fn catalog(&self) -> Vec<String> {
        self.catalog.lock().iter().map(|m| m.resource.clone()).collect()
    }

    pub fn cached_value(&self, property_id: &str, res_id: &str) -> Option<Vec<u8>> {
        self.cache.lock().get(&(property_id.to_string(), res_id.to_string())).cloned()
    }

    /// Starts a subscription: `Unsubscribed -> Subscribing` (spec §4.5 table).
    pub fn subscribe(&self, request_id: u8, property_id: &str, res_id: &str) -> CiMessage {
        let mut subs = self.subscriptions.lock();
        subs.retain(|s| !(s.property_id == property_id && s.res_id == res_id));
        let mut sub = ClientSubscription::new(property_id, res_id);
        sub.pending_request_id = Some(request_id);
        sub.state = ClientSubscriptionState::Subscribing;
        subs.push(sub);
        drop(subs);

        let header = serde_json::json!({ "resource": property_id, "command": "start" });
        CiMessage::PropertyExchange {
            header: CommonHeader::new(
                Address::FunctionBlock,
                sub_id2::PE_SUBSCRIBE_PROPERTY,
                self.local_muid,
                self.remote_muid,
            ),
            envelope: PropertyEnvelope {
                request_id,
                header: serde_json::to_vec(&header).expect("Value serialization cannot fail"),
                total_chunks: 1,
                chunk_index: 1,
                chunk_body: Vec::new(),
            },
        }
    }

    /// `Subscribed -> Unsubscribing`; `None` if not currently subscribed.
    pub fn unsubscribe(&self, request_id: u8, property_id: &str, res_id: &str) -> Option<CiMessage> {
        let mut subs = self.subscriptions.lock();
        let sub = subs
            .iter_mut()
            .find(|s| s.property_id == property_id && s.res_id == res_id && s.state == ClientSubscriptionState::Subscribed)?;
        let subscribe_id = sub.subscribe_id.clone()?;
        sub.state = ClientSubscriptionState::Unsubscribing;
        sub.pending_request_id = Some(request_id);
        drop(subs);

        let header = serde_json::json!({ "resource": property_id, "command": "end", "subscribeId": subscribe_id });
        Some(CiMessage::PropertyExchange {
            header: CommonHeader::new(
                Address::FunctionBlock,
                sub_id2::PE_SUBSCRIBE_PROPERTY,
                self.local_muid,
                self.remote_muid,
            ),
            envelope: PropertyEnvelope {
                request_id,
                header: serde_json::to_vec(&header).expect("Value serialization cannot fail"),
                total_chunks: 1,
                chunk_index: 1,
                chunk_body: Vec::new(),
            },
        })
    }

    pub fn handle_subscribe_reply(&self, request_id: u8, status: u32, header: &serde_json::Value) {
        let mut subs = self.subscriptions.lock();
        let Some(sub) = subs.iter_mut().find(|s| s.pending_request_id == Some(request_id)) else { return };
        match sub.state {
            ClientSubscriptionState::Subscribing => {
                if status == 200 {
                    sub.subscribe_id = header.get("subscribeId").and_then(|v| v.as_str()).map(str::to_string);
                    sub.state = ClientSubscriptionState::Subscribed;
                } else {
                    sub.state = ClientSubscriptionState::Unsubscribed;
                    sub.pending_request_id = None;
                }
            }
            ClientSubscriptionState::Unsubscribing => {
                if status == 200 {
                    let property_id = sub.property_id.clone();
                    let res_id = sub.res_id.clone();
                    drop(subs);
                    self.subscriptions
                        .lock()
                        .retain(|s| !(s.property_id == property_id && s.res_id == res_id));
                } else {
                    sub.state = ClientSubscriptionState::Subscribed;
                }
            }
            _ => {}
        }
    }

    /// Applies a server-initiated notification (full or partial body).
    pub fn handle_notification(&self, header: &serde_json::Value, body: &[u8]) -> Option<ClientEvent> {
        let subscribe_id = header.get("subscribeId").and_then(|v| v.as_str())?;
        let command = header.get("command").and_then(|v| v.as_str()).unwrap_or("full");
        let (property_id, res_id) = {
            let subs = self.subscriptions.lock();
            let sub = subs.iter().find(|s| s.subscribe_id.as_deref() == Some(subscribe_id))?;
            (sub.property_id.clone(), sub.res_id.clone())
        };
        let key = (property_id.clone(), res_id);
        if command == "partial" {
            let spec: serde_json::Value = serde_json::from_slice(body).ok()?;
            let mut cache = self.cache.lock();
            let current = cache.get(&key).cloned().unwrap_or_default();
            let doc: serde_json::Value = serde_json::from_slice(&current).unwrap_or(serde_json::json!({}));
            let updated = crate::partial::apply_partial_update(&doc, &spec);
            cache.insert(key, serde_json::to_vec(&updated).expect("Value serialization cannot fail"));
        } else {
            self.cache.lock().insert(key, body.to_vec());
        }
        Some(ClientEvent::PropertyUpdated { property_id })
    }

    /// `InvalidateMUID` purges all subscriptions and pending state silently
    /// (spec §4.5 table, last row).
    pub fn purge(&self) {
        self.subscriptions.lock().clear();
        self.pending.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_b_get_reply_populates_cache() {
        let client = PropertyClientFacade::new(Muid(1), Muid(2));
        let _msg = client.send_get_property_data(1, "DeviceInfo", "", None, -1, -1);
        let header = serde_json::json!({"status": 200, "mediaType": "application/json"});
        let event = client.handle_reply(1, &header, br#"{"x":1}"#).unwrap();
        assert_eq!(event, ClientEvent::PropertyUpdated { property_id: "DeviceInfo".to_string() });
        assert_eq!(client.cached_value("DeviceInfo", ""), Some(br#"{"x":1}"#.to_vec()));
    }

    #[test]
    fn scenario_d_subscribe_then_partial_notify() {
        let client = PropertyClientFacade::new(Muid(1), Muid(2));
        client.cache.lock().insert(("Mix".to_string(), String::new()), br#"{"a":1,"b":{"c":2}}"#.to_vec());
        client.subscribe(1, "Mix", "");
        client.handle_subscribe_reply(1, 200, &serde_json::json!({"subscribeId": "s1"}));

        let notify_header = serde_json::json!({"command":"partial","subscribeId":"s1"});
        let event = client.handle_notification(&notify_header, br#"{"/b/c":5}"#).unwrap();
        assert_eq!(event, ClientEvent::PropertyUpdated { property_id: "Mix".to_string() });
        let cached = client.cached_value("Mix", "").unwrap();
        let value: serde_json::Value = serde_json::from_slice(&cached).unwrap();
        assert_eq!(value, serde_json::json!({"a":1,"b":{"c":5}}));
    }

    #[test]
    fn catalog_discovery_preserves_surviving_cache_entries() {
        let client = PropertyClientFacade::new(Muid(1), Muid(2));
        client.cache.lock().insert(("Keep".to_string(), String::new()), b"1".to_vec());
        client.cache.lock().insert(("Drop".to_string(), String::new()), b"2".to_vec());
        client.apply_catalog(br#"[{"resource":"Keep"}]"#);
        assert_eq!(client.cached_value("Keep", ""), Some(b"1".to_vec()));
        assert_eq!(client.cached_value("Drop", ""), None);
    }

    #[test]
    fn subscribe_rejected_moves_back_to_unsubscribed() {
        let client = PropertyClientFacade::new(Muid(1), Muid(2));
        client.subscribe(1, "Mix", "");
        client.handle_subscribe_reply(1, 405, &serde_json::json!({}));
        assert!(client.unsubscribe(2, "Mix", "").is_none());
    }
}
