use midi_ci_types::Muid;

/// What a Set operation is allowed to do to a property (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanSet {
    None,
    Partial,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Originator {
    System,
    User,
}

/// `(resource, canGet, canSet, canSubscribe, requireResId, mediaTypes,
/// encodings, schema, canPaginate, originator)` (spec §3). Resource name is
/// the property ID; uniqueness scope is the host device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMetadata {
    pub resource: String,
    pub can_get: bool,
    pub can_set: CanSet,
    pub can_subscribe: bool,
    pub require_res_id: bool,
    pub media_types: Vec<String>,
    pub encodings: Vec<String>,
    pub schema: String,
    pub can_paginate: bool,
    pub originator: Originator,
}

impl PropertyMetadata {
    /// A user property with sensible read/write/subscribe defaults.
    pub fn user(resource: impl Into<String>) -> Self {
        PropertyMetadata {
            resource: resource.into(),
            can_get: true,
            can_set: CanSet::Full,
            can_subscribe: true,
            require_res_id: false,
            media_types: vec!["application/json".to_string()],
            encodings: vec!["ASCII".to_string()],
            schema: String::new(),
            can_paginate: false,
            originator: Originator::User,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "resource": self.resource,
            "canGet": self.can_get,
            "canSet": match self.can_set { CanSet::None => "none", CanSet::Partial => "partial", CanSet::Full => "full" },
            "canSubscribe": self.can_subscribe,
            "requireResId": self.require_res_id,
            "mediaTypes": self.media_types,
            "encodings": self.encodings,
            "schema": self.schema,
            "canPaginate": self.can_paginate,
            "originator": match self.originator { Originator::System => "system", Originator::User => "user" },
        })
    }
}

/// `(id, resId, mediaType, body)` (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValue {
    pub id: String,
    pub res_id: String,
    pub media_type: String,
    pub body: Vec<u8>,
}

/// Host-side active subscription (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionEntry {
    pub subscriber_muid: Muid,
    pub resource: String,
    pub res_id: String,
    pub subscribe_id: String,
    pub encoding: String,
}

/// Client-side subscription state machine instance, one per `(propertyId,
/// resId)` (spec §4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientSubscriptionState {
    Unsubscribed,
    Subscribing,
    Subscribed,
    Unsubscribing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSubscription {
    pub pending_request_id: Option<u8>,
    pub subscribe_id: Option<String>,
    pub property_id: String,
    pub res_id: String,
    pub state: ClientSubscriptionState,
}

impl ClientSubscription {
    pub fn new(property_id: impl Into<String>, res_id: impl Into<String>) -> Self {
        ClientSubscription {
            pending_request_id: None,
            subscribe_id: None,
            property_id: property_id.into(),
            res_id: res_id.into(),
            state: ClientSubscriptionState::Unsubscribed,
        }
    }
}
