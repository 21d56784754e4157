//! The device-level engine: wires the codec, profile and property crates
//! into a `MidiCIDevice` that a transport can drive directly.

pub mod config;
pub mod device;
pub mod messenger;
pub mod pending;
pub mod session;
pub mod transport;

pub use config::DeviceConfig;
pub use device::{ClientConnection, MidiCIDevice};
pub use pending::{PendingRequest, PendingTable};
pub use session::SessionShim;
pub use transport::{ChannelTransport, OutboundFrame, Transport};
