use crate::config::DeviceConfig;
use crate::messenger;
use crate::pending::PendingTable;
use crate::transport::{OutboundFrame, Transport};
use midi_ci_codec::header::CommonHeader;
use midi_ci_codec::message::{CiMessage, PropertyEnvelope};
use midi_ci_profiles::{ProfileClientFacade, ProfileHostFacade};
use midi_ci_properties::{ChunkManager, Encoding, PropertyClientFacade, PropertyHostFacade, PropertyMetadata, SystemPropertySource};
use midi_ci_types::status::sub_id2;
use midi_ci_types::{Address, DeviceDetails, Muid, ProfileId};
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Per-remote-MUID state owned by the local device (spec §3,
/// `ClientConnection`).
pub struct ClientConnection {
    pub remote_muid: Muid,
    pub device_details: Mutex<Option<DeviceDetails>>,
    pub profile_client: ProfileClientFacade,
    pub property_client: PropertyClientFacade,
    pub pending: PendingTable,
    profile_detail_callbacks: Mutex<HashMap<(ProfileId, u8), Box<dyn FnOnce(Vec<u8>) + Send>>>,
}

impl ClientConnection {
    fn new(local: Muid, remote: Muid) -> Self {
        ClientConnection {
            remote_muid: remote,
            device_details: Mutex::new(None),
            profile_client: ProfileClientFacade::new(local, remote),
            property_client: PropertyClientFacade::new(local, remote),
            pending: PendingTable::new(),
            profile_detail_callbacks: Mutex::new(HashMap::new()),
        }
    }
}

/// Per-local-endpoint aggregate (spec §3, `MidiCIDevice`; §5 concurrency
/// model). Every public method acquires `lock`, a recursive mutex, before
/// touching state, so a callback that re-enters the device from inside
/// another call does not deadlock.
pub struct MidiCIDevice {
    local_muid: Muid,
    config: Arc<DeviceConfig>,
    transport: Arc<dyn Transport>,
    profile_host: ProfileHostFacade,
    property_host: PropertyHostFacade,
    connections: Mutex<HashMap<u32, ClientConnection>>,
    chunks: ChunkManager,
    lock: ReentrantMutex<()>,
    categories: u8,
    rx_max_sysex_size: u32,
    connection_listeners: Mutex<Vec<Arc<dyn Fn(Muid) + Send + Sync>>>,
}

impl MidiCIDevice {
    pub fn new(config: DeviceConfig, transport: Arc<dyn Transport>) -> Self {
        let local_muid = config.muid();
        let config = Arc::new(config);
        let property_host = PropertyHostFacade::new(local_muid, config.clone() as Arc<dyn SystemPropertySource>);
        config.install_into(&property_host);
        MidiCIDevice {
            local_muid,
            config,
            transport,
            profile_host: ProfileHostFacade::new(local_muid),
            property_host,
            connections: Mutex::new(HashMap::new()),
            chunks: ChunkManager::new(),
            lock: ReentrantMutex::new(()),
            categories: 0x7F,
            rx_max_sysex_size: 4096,
            connection_listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn local_muid(&self) -> Muid {
        self.local_muid
    }

    pub fn profiles(&self) -> &ProfileHostFacade {
        &self.profile_host
    }

    pub fn properties(&self) -> &PropertyHostFacade {
        &self.property_host
    }

    pub fn register_user_property(&self, meta: PropertyMetadata, body: Vec<u8>) {
        self.property_host.add_metadata(meta, body);
    }

    /// Registers a callback fired the first time a Discovery Reply from a
    /// previously-unknown MUID is processed (spec §4.2 step 4).
    pub fn on_connection_established(&self, callback: impl Fn(Muid) + Send + Sync + 'static) {
        self.connection_listeners.lock().push(Arc::new(callback));
    }

    fn notify_connection_established(&self, remote: Muid) {
        let listeners: Vec<_> = self.connection_listeners.lock().clone();
        for listener in listeners {
            listener(remote);
        }
    }

    fn with_connection<R>(&self, remote: Muid, f: impl FnOnce(&ClientConnection) -> R) -> R {
        let mut connections = self.connections.lock();
        let conn = connections.entry(remote.0).or_insert_with(|| ClientConnection::new(self.local_muid, remote));
        f(conn)
    }

    fn send(&self, msg: CiMessage) -> anyhow::Result<()> {
        let header = *msg.header();
        let bytes = msg.encode()?;
        log::debug!("outbound sub_id2={:#04x} src={} dst={}", header.sub_id2, header.source, header.destination);
        self.transport.send(OutboundFrame::Sysex { group: 0, body: bytes });
        Ok(())
    }

    pub fn send_discovery_inquiry(&self) -> anyhow::Result<()> {
        let _guard = self.lock.lock();
        let header = CommonHeader::new(Address::FunctionBlock, sub_id2::DISCOVERY_INQUIRY, self.local_muid, Muid::BROADCAST);
        let msg = CiMessage::DiscoveryInquiry {
            header,
            device: self.config.device_details(),
            categories: self.categories,
            rx_max_sysex_size: self.rx_max_sysex_size,
            output_path_id: 0,
        };
        self.send(msg)
    }

    /// Entry point for inbound SysEx bytes already stripped of `F0`/`F7`
    /// (spec §4.9, C9 hands this the MIDI-CI-recognized body).
    pub fn on_sysex(&self, group: u8, body: &[u8]) {
        let _guard = self.lock.lock();
        match CiMessage::decode(body) {
            Ok((msg, _)) => self.dispatch(group, msg),
            Err(e) => {
                log::warn!("dropping malformed MIDI-CI message: {e}");
                if let (Some(status), Ok((header, _))) = (e.nak_status(), CommonHeader::decode(body)) {
                    if messenger::accepts_destination(&header, self.local_muid) {
                        let _ = self.send(messenger::build_nak(self.local_muid, &header, status));
                    }
                }
            }
        }
    }

    fn dispatch(&self, group: u8, msg: CiMessage) {
        let header = *msg.header();
        if !messenger::accepts_destination(&header, self.local_muid) {
            log::debug!("dropping message not addressed to us (dest={})", header.destination);
            return;
        }
        log::debug!("inbound sub_id2={:#04x} src={} dst={}", header.sub_id2, header.source, header.destination);

        match &msg {
            CiMessage::DiscoveryInquiry { device, .. } => self.handle_discovery_inquiry(header, *device),
            CiMessage::DiscoveryReply { device, .. } => self.handle_discovery_reply(header, *device),
            CiMessage::InvalidateMuid { target_muid, .. } => self.handle_invalidate(*target_muid),
            CiMessage::Ack(a) => {
                log::debug!("received ACK for sub_id2={:#04x} from {}", a.original_sub_id2, a.header.source);
            }
            CiMessage::Nak(a) => {
                log::warn!("received NAK status={:#04x} for sub_id2={:#04x} from {}", a.status_code, a.original_sub_id2, a.header.source);
            }
            CiMessage::ProfileInquiry { .. } => {
                let _ = self.send(self.profile_host.handle_inquiry(header.source));
            }
            CiMessage::ProfileSetOn { .. } | CiMessage::ProfileSetOff { .. } => {
                if let Some(report) = self.profile_host.handle_set(&msg) {
                    let _ = self.send(report);
                }
            }
            CiMessage::ProfileInquiryReply { .. }
            | CiMessage::ProfileEnabledReport { .. }
            | CiMessage::ProfileDisabledReport { .. }
            | CiMessage::ProfileAddedReport { .. }
            | CiMessage::ProfileRemovedReport { .. } => {
                self.with_connection(header.source, |conn| conn.profile_client.apply_inbound(&msg));
            }
            CiMessage::ProfileDetailsReply { profile, target, data, .. } => {
                let (profile, target, data) = (*profile, *target, data.clone());
                self.with_connection(header.source, move |conn| {
                    match conn.profile_detail_callbacks.lock().remove(&(profile, target)) {
                        Some(cb) => cb(data),
                        None => log::debug!("no matching ProfileDetailsInquiry for {profile:?}/{target}"),
                    }
                });
            }
            CiMessage::ProfileDetailsInquiry { .. } | CiMessage::ProfileSpecificData { .. } => {
                log::debug!("ignoring profile message kind not implemented by this engine");
            }
            CiMessage::PeCapabilitiesInquiry { .. } => {
                let reply = CiMessage::PeCapabilitiesReply {
                    header: CommonHeader::new(header.addr, sub_id2::PE_CAPABILITIES_REPLY, self.local_muid, header.source),
                    max_requests: 127,
                    pe_major: 2,
                    pe_minor: 0,
                };
                let _ = self.send(reply);
            }
            CiMessage::PeCapabilitiesReply { .. } => {}
            CiMessage::PropertyExchange { .. } => {
                if let CiMessage::PropertyExchange { header, envelope } = msg {
                    self.handle_property_exchange(group, header, envelope);
                }
            }
        }
    }

    fn handle_discovery_inquiry(&self, header: CommonHeader, device: DeviceDetails) {
        let _ = device;
        let reply = CiMessage::DiscoveryReply {
            header: CommonHeader::new(Address::FunctionBlock, sub_id2::DISCOVERY_REPLY, self.local_muid, header.source),
            device: self.config.device_details(),
            categories: self.categories,
            rx_max_sysex_size: self.rx_max_sysex_size,
            output_path_id: 0,
            function_block: 0,
        };
        let _ = self.send(reply);
    }

    fn handle_discovery_reply(&self, header: CommonHeader, device: DeviceDetails) {
        let is_new = {
            let connections = self.connections.lock();
            !connections.contains_key(&header.source.0)
        };
        self.with_connection(header.source, |conn| {
            *conn.device_details.lock() = Some(device);
        });
        if is_new {
            self.notify_connection_established(header.source);
        }
    }

    fn handle_invalidate(&self, target: Muid) {
        self.connections.lock().remove(&target.0);
    }

    fn handle_property_exchange(&self, _group: u8, header: CommonHeader, envelope: PropertyEnvelope) {
        let total_chunks = envelope.total_chunks.max(1);
        if envelope.chunk_index < total_chunks {
            if let Err(e) =
                self.chunks.add_pending_chunk(Instant::now(), header.source, envelope.request_id, &envelope.header, &envelope.chunk_body, envelope.chunk_index)
            {
                log::warn!("property chunk reassembly error: {e}");
                if let Some(status) = e.nak_status() {
                    let _ = self.send(messenger::build_nak(self.local_muid, &header, status));
                }
            }
            return;
        }
        let (full_header, full_body) =
            self.chunks.finish_pending_chunk(header.source, envelope.request_id, &envelope.header, &envelope.chunk_body);

        match header.sub_id2 {
            sub_id2::PE_GET_PROPERTY_DATA | sub_id2::PE_SUBSCRIBE_PROPERTY | sub_id2::PE_SET_PROPERTY_DATA => {
                let full_envelope =
                    PropertyEnvelope { request_id: envelope.request_id, header: full_header, total_chunks: 1, chunk_index: 1, chunk_body: full_body };
                let replies = match header.sub_id2 {
                    sub_id2::PE_GET_PROPERTY_DATA => self.property_host.handle_get(header.source, &full_envelope),
                    sub_id2::PE_SET_PROPERTY_DATA => self.property_host.handle_set(header.source, &full_envelope),
                    _ => vec![self.property_host.handle_subscribe(header.source, &full_envelope)],
                };
                for reply in replies {
                    let _ = self.send(reply);
                }
            }
            sub_id2::PE_GET_PROPERTY_DATA_REPLY | sub_id2::PE_SET_PROPERTY_DATA_REPLY => {
                let header_json: serde_json::Value = serde_json::from_slice(&full_header).unwrap_or_default();
                self.with_connection(header.source, |conn| {
                    conn.property_client.handle_reply(envelope.request_id, &header_json, &full_body);
                });
            }
            sub_id2::PE_SUBSCRIBE_PROPERTY_REPLY => {
                let header_json: serde_json::Value = serde_json::from_slice(&full_header).unwrap_or_default();
                let status = header_json.get("status").and_then(|v| v.as_u64()).unwrap_or(500) as u32;
                self.with_connection(header.source, |conn| conn.property_client.handle_subscribe_reply(envelope.request_id, status, &header_json));
            }
            sub_id2::PE_NOTIFY => {
                let header_json: serde_json::Value = serde_json::from_slice(&full_header).unwrap_or_default();
                self.with_connection(header.source, |conn| {
                    conn.property_client.handle_notification(&header_json, &full_body);
                });
            }
            other => log::warn!("unhandled property sub-ID 2 {other:#04x}"),
        }
    }

    // --- Outbound client-initiated operations -------------------------------

    pub fn add_profile(&self, profile: ProfileId, group: u8, addr: Address) -> anyhow::Result<()> {
        let _guard = self.lock.lock();
        self.send(self.profile_host.add_profile(profile, group, addr))
    }

    pub fn enable_profile(&self, group: u8, addr: Address, profile: ProfileId, channels: u16) -> anyhow::Result<()> {
        let _guard = self.lock.lock();
        self.send(self.profile_host.enable_profile(group, addr, profile, channels))
    }

    pub fn set_remote_profile(&self, remote: Muid, addr: Address, profile: ProfileId, enabled: bool, channels: u16) -> anyhow::Result<()> {
        let _guard = self.lock.lock();
        let msg = self.with_connection(remote, |conn| conn.profile_client.set_profile(addr, profile, enabled, channels));
        self.send(msg)
    }

    pub fn request_profile_details(
        &self,
        remote: Muid,
        addr: Address,
        profile: ProfileId,
        target: u8,
        on_reply: impl FnOnce(Vec<u8>) + Send + 'static,
    ) -> anyhow::Result<()> {
        let _guard = self.lock.lock();
        let msg = self.with_connection(remote, |conn| {
            conn.profile_detail_callbacks.lock().insert((profile, target), Box::new(on_reply));
            conn.profile_client.request_profile_details(addr, profile, target)
        });
        self.send(msg)
    }

    pub fn get_property(&self, remote: Muid, property_id: &str, res_id: &str, encoding: Option<Encoding>) -> anyhow::Result<()> {
        let _guard = self.lock.lock();
        let msg = self.with_connection(remote, |conn| {
            let request_id = conn.pending.allocate(None, |_| {}).unwrap_or(0);
            conn.property_client.send_get_property_data(request_id, property_id, res_id, encoding, -1, -1)
        });
        self.send(msg)
    }

    pub fn set_property(
        &self,
        remote: Muid,
        property_id: &str,
        res_id: &str,
        data: Vec<u8>,
        encoding: Option<Encoding>,
        partial: bool,
    ) -> anyhow::Result<()> {
        let _guard = self.lock.lock();
        let msg = self.with_connection(remote, |conn| {
            let request_id = conn.pending.allocate(None, |_| {}).unwrap_or(0);
            conn.property_client.send_set_property_data(request_id, property_id, res_id, data, encoding, partial)
        });
        self.send(msg)
    }

    /// Reads back a property value cached from an earlier Get reply or
    /// subscription notification, for application code sitting above the
    /// device (spec §6).
    pub fn cached_property(&self, remote: Muid, property_id: &str, res_id: &str) -> Option<Vec<u8>> {
        self.connections.lock().get(&remote.0)?.property_client.cached_value(property_id, res_id)
    }

    pub fn remote_device_details(&self, remote: Muid) -> Option<DeviceDetails> {
        *self.connections.lock().get(&remote.0)?.device_details.lock()
    }

    pub fn subscribe_property(&self, remote: Muid, property_id: &str, res_id: &str) -> anyhow::Result<()> {
        let _guard = self.lock.lock();
        let msg = self.with_connection(remote, |conn| {
            let request_id = conn.pending.allocate(None, |_| {}).unwrap_or(0);
            conn.property_client.subscribe(request_id, property_id, res_id)
        });
        self.send(msg)
    }
}
