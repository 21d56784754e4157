//! Shared wire types for the MIDI-CI protocol stack: MUIDs, addressing,
//! device details, profile identifiers, status codes and 7-bit packing.

pub mod address;
pub mod device_details;
pub mod error;
pub mod muid;
pub mod profile_id;
pub mod sevenbit;
pub mod status;

pub use address::Address;
pub use device_details::DeviceDetails;
pub use error::CiError;
pub use muid::Muid;
pub use profile_id::ProfileId;
