//! The foreign platform binding contract.
//!
//! The session layer never talks Bluetooth itself; it drives an opaque
//! platform stack (a Web-Bluetooth-style binding) through the traits in this
//! module. Handles are cheap, clonable references to live platform objects
//! and are only valid for the current requesting session.

use async_trait::async_trait;
use thiserror::Error;

use crate::uuid::PlatformUuid;

/// Failure surfaced by the platform binding.
///
/// `NotFound` is the one condition the session layer interprets: a requested
/// UUID absent from the device during batch discovery is skippable. Anything
/// else is carried verbatim (name/message) to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("not found")]
    NotFound,

    #[error("{name}: {message}")]
    Other { name: String, message: String },
}

impl PlatformError {
    pub fn other(name: impl Into<String>, message: impl Into<String>) -> Self {
        PlatformError::Other {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound)
    }
}

/// Callback invoked with the raw payload of each value-change event.
pub type ValueListener = Box<dyn Fn(&[u8]) + Send + Sync>;

/// Identifies a registered [`ValueListener`] so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(pub u64);

/// The foreign characteristic's boolean property accessors, mirrored as a
/// plain struct. The session layer decodes these into a bitmask exactly once,
/// at discovery time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandleProperties {
    pub broadcast: bool,
    pub read: bool,
    pub write_without_response: bool,
    pub write: bool,
    pub notify: bool,
    pub indicate: bool,
    pub authenticated_signed_writes: bool,
}

/// Entry point of the platform stack: the device chooser.
#[async_trait]
pub trait PlatformStack: Send + Sync + 'static {
    type Device: DeviceHandle;

    /// Invokes device selection for the given service UUIDs. Fails if the
    /// selection is cancelled or denied.
    async fn request_device(
        &self,
        services: &[PlatformUuid],
    ) -> Result<Self::Device, PlatformError>;
}

/// A live reference to a selected remote device.
#[async_trait]
pub trait DeviceHandle: Clone + Send + Sync + 'static {
    type Service: ServiceHandle<Characteristic = Self::Characteristic>;
    type Characteristic: CharacteristicHandle;

    /// Platform-assigned device identifier, stable for the lifetime of the
    /// requesting session.
    fn id(&self) -> String;

    /// Advertised local name, if the chooser exposed one.
    fn name(&self) -> Option<String>;

    async fn connect(&self) -> Result<(), PlatformError>;

    async fn disconnect(&self) -> Result<(), PlatformError>;

    async fn is_connected(&self) -> bool;

    /// Looks up a primary service by UUID. Fails with
    /// [`PlatformError::NotFound`] when the device does not expose it.
    async fn primary_service(&self, uuid: &PlatformUuid)
        -> Result<Self::Service, PlatformError>;
}

/// A live reference to a discovered GATT service.
#[async_trait]
pub trait ServiceHandle: Clone + Send + Sync + 'static {
    type Characteristic: CharacteristicHandle;

    fn uuid(&self) -> PlatformUuid;

    fn is_primary(&self) -> bool;

    /// Looks up a characteristic by UUID. Fails with
    /// [`PlatformError::NotFound`] when the service does not contain it.
    async fn characteristic(
        &self,
        uuid: &PlatformUuid,
    ) -> Result<Self::Characteristic, PlatformError>;
}

/// A live reference to a discovered GATT characteristic.
#[async_trait]
pub trait CharacteristicHandle: Clone + Send + Sync + 'static {
    fn uuid(&self) -> PlatformUuid;

    fn properties(&self) -> HandleProperties;

    async fn read_value(&self) -> Result<Vec<u8>, PlatformError>;

    async fn write_value(&self, data: &[u8], with_response: bool) -> Result<(), PlatformError>;

    async fn start_notifications(&self) -> Result<(), PlatformError>;

    async fn stop_notifications(&self) -> Result<(), PlatformError>;

    /// Registers a push-callback for value-change events. Delivery can begin
    /// on any thread once notifications are started.
    fn add_value_listener(&self, listener: ValueListener) -> ListenerToken;

    fn remove_value_listener(&self, token: ListenerToken);
}

/// The device handle type of a platform stack.
pub type DeviceOf<P> = <P as PlatformStack>::Device;

/// The service handle type of a platform stack.
pub type ServiceOf<P> = <<P as PlatformStack>::Device as DeviceHandle>::Service;

/// The characteristic handle type of a platform stack.
pub type CharacteristicOf<P> = <<P as PlatformStack>::Device as DeviceHandle>::Characteristic;
