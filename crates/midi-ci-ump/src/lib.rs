//! UMP SysEx7 packetization/defragmentation and MIDI 1.0 <-> UMP translation.

pub mod sysex7;
pub mod translator;

pub use sysex7::{Defragmenter, Sysex7Packet, Sysex7Status};
pub use translator::{Midi1ChannelMessage, Translator, Ump2RpnMessage};
