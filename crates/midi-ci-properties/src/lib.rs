pub mod chunk_manager;
pub mod client;
pub mod encoding;
pub mod host;
pub mod metadata;
pub mod partial;

pub use chunk_manager::{ChunkManager, DEFAULT_IDLE_TIMEOUT};
pub use client::{ClientEvent, PropertyClientFacade};
pub use encoding::Encoding;
pub use host::{PropertyHostFacade, SystemPropertySource};
pub use metadata::{CanSet, ClientSubscription, ClientSubscriptionState, Originator, PropertyMetadata, PropertyValue, SubscriptionEntry};
pub use partial::apply_partial_update;
