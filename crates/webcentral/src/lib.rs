//! webcentral - a GATT central-role client core over a foreign platform
//! Bluetooth stack.
//!
//! The platform binding (device chooser, connect, discovery, read/write,
//! notification primitives) is abstracted behind the traits in [`platform`];
//! this crate implements the session layer on top: stable peripheral and
//! attribute identities decoupled from foreign handle lifetimes, a handle
//! cache reset on every scan, deterministic batch discovery that tolerates
//! missing UUIDs, connection-state enforcement before every operation, and a
//! bridge from push-callback notifications to cancellable streams.

pub mod central;
pub mod error;
pub mod platform;
pub mod store;
pub mod uuid;

// Re-export common types for convenience
pub use central::{
    Advertisement, AttributeId, Central, Characteristic, CharacteristicProperties, Descriptor,
    NotificationStream, Peripheral, ScanData, Service, DEFAULT_MTU,
};
pub use error::CentralError;
pub use platform::{
    CharacteristicHandle, DeviceHandle, HandleProperties, ListenerToken, PlatformError,
    PlatformStack, ServiceHandle, ValueListener,
};
pub use store::{AttributeValue, Store, ValueHistory, ValueOrigin, VALUE_HISTORY_CAPACITY};
pub use uuid::{PlatformUuid, Uuid, UuidParseError};
