//! MIDI Capability Inquiry (MIDI-CI): discovery, profile configuration and
//! Property Exchange over SysEx or UMP SysEx7, independent of any one MIDI
//! transport.

pub use midi_ci_codec::{chunk, header, message};
pub use midi_ci_core::{
    config::{DeviceConfig, PersistedProperty},
    device::{ClientConnection, MidiCIDevice},
    messenger,
    pending::{PendingRequest, PendingTable},
    session::{frame_midi1_sysex, frame_ump_sysex7, SessionShim},
    transport::{ChannelTransport, OutboundFrame, Transport},
};
pub use midi_ci_profiles::{CallbackHandle, ObservableProfileList, ProfileClientFacade, ProfileEntry, ProfileEvent, ProfileHostFacade};
pub use midi_ci_properties::{
    CanSet, ChunkManager, ClientEvent, ClientSubscription, ClientSubscriptionState, Encoding, Originator,
    PropertyClientFacade, PropertyHostFacade, PropertyMetadata, PropertyValue, SubscriptionEntry,
};
pub use midi_ci_types::{error::CiError, Address, DeviceDetails, Muid, ProfileId};
pub use midi_ci_ump::{Defragmenter, Midi1ChannelMessage, Sysex7Packet, Sysex7Status, Translator, Ump2RpnMessage};
