use midi_ci_properties::{CanSet, Originator, PropertyHostFacade, PropertyMetadata, SystemPropertySource};
use midi_ci_types::{DeviceDetails, Muid};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A registered user property as persisted to disk (spec §6: "Persisted
/// state layout"). Bodies are arbitrary bytes, base64-encoded for JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedProperty {
    pub resource: String,
    pub can_get: bool,
    pub can_set: String,
    pub can_subscribe: bool,
    pub require_res_id: bool,
    pub media_types: Vec<String>,
    pub encodings: Vec<String>,
    pub schema: String,
    pub can_paginate: bool,
    #[serde(with = "base64_bytes")]
    pub body: Vec<u8>,
}

impl PersistedProperty {
    pub fn metadata(&self) -> PropertyMetadata {
        PropertyMetadata {
            resource: self.resource.clone(),
            can_get: self.can_get,
            can_set: match self.can_set.as_str() {
                "full" => CanSet::Full,
                "partial" => CanSet::Partial,
                _ => CanSet::None,
            },
            can_subscribe: self.can_subscribe,
            require_res_id: self.require_res_id,
            media_types: self.media_types.clone(),
            encodings: self.encodings.clone(),
            schema: self.schema.clone(),
            can_paginate: self.can_paginate,
            originator: Originator::User,
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        base64::engine::general_purpose::STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Everything a `MidiCIDevice` persists between runs (spec §6). The file
/// layout/name is a CLI concern out of scope here; this only defines the
/// JSON shape and the load/save mechanics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub muid: u32,
    pub manufacturer: u32,
    pub family: u16,
    pub model: u16,
    pub revision: u32,
    pub product_instance_id: String,
    pub device_info: serde_json::Value,
    pub channel_list: serde_json::Value,
    pub json_schema: String,
    pub user_properties: Vec<PersistedProperty>,
}

impl DeviceConfig {
    pub fn new(muid: Muid, device: DeviceDetails, product_instance_id: impl Into<String>) -> Self {
        DeviceConfig {
            muid: muid.0,
            manufacturer: device.manufacturer,
            family: device.family,
            model: device.model,
            revision: device.revision,
            product_instance_id: product_instance_id.into(),
            device_info: serde_json::json!({}),
            channel_list: serde_json::json!([]),
            json_schema: String::new(),
            user_properties: Vec::new(),
        }
    }

    pub fn muid(&self) -> Muid {
        Muid(self.muid)
    }

    pub fn device_details(&self) -> DeviceDetails {
        DeviceDetails { manufacturer: self.manufacturer, family: self.family, model: self.model, revision: self.revision }
    }

    pub fn load_from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn save_to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Installs every persisted user property into a freshly-built host
    /// facade; call once while wiring up a `MidiCIDevice`.
    pub fn install_into(&self, host: &PropertyHostFacade) {
        for prop in &self.user_properties {
            host.add_metadata(prop.metadata(), prop.body.clone());
        }
    }
}

impl SystemPropertySource for DeviceConfig {
    fn device_info_json(&self) -> serde_json::Value {
        let mut info = self.device_info.clone();
        if let Some(obj) = info.as_object_mut() {
            obj.entry("manufacturer").or_insert(serde_json::json!(self.manufacturer));
            obj.entry("family").or_insert(serde_json::json!(self.family));
            obj.entry("model").or_insert(serde_json::json!(self.model));
            obj.entry("revision").or_insert(serde_json::json!(self.revision));
            obj.entry("productInstanceId").or_insert(serde_json::json!(self.product_instance_id));
        }
        info
    }

    fn channel_list_json(&self) -> serde_json::Value {
        self.channel_list.clone()
    }

    fn json_schema(&self) -> String {
        self.json_schema.clone()
    }
}

/// Builds the `Arc<dyn SystemPropertySource>` a `PropertyHostFacade` needs.
pub fn as_property_source(config: DeviceConfig) -> Arc<DeviceConfig> {
    Arc::new(config)
}
