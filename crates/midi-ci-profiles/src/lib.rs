//! The MIDI-CI profile subsystem: observable profile lists plus host/client
//! facades that wrap them in protocol behavior (spec §4.3).

pub mod client;
pub mod host;
pub mod observable;

pub use client::ProfileClientFacade;
pub use host::ProfileHostFacade;
pub use observable::{CallbackHandle, ObservableProfileList, ProfileEntry, ProfileEvent};
