//! Common value types for the central session layer.
//!
//! Attribute records are plain values: they hold identifiers, never live
//! platform handles, so they stay hashable and comparable independently of
//! handle lifetimes. The handle cache is the only place an identity meets its
//! foreign object.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::platform::HandleProperties;
use crate::uuid::Uuid;

/// Application-facing identity of a remote device.
///
/// The `id` is platform-assigned and stable for the lifetime of a requesting
/// session. Equality and hashing are by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Peripheral {
    pub id: String,
}

impl fmt::Display for Peripheral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Stable per-peripheral attribute identifier, minted by the allocator.
///
/// Monotonically increasing for each peripheral; wraps to zero on overflow
/// (practically unreachable, tolerated rather than prevented).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeId(pub u64);

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags::bitflags! {
    /// Characteristic capability flags as defined in the Bluetooth
    /// specification, decoded once at discovery time from the platform's
    /// boolean property accessors.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CharacteristicProperties: u8 {
        const BROADCAST = 0x01;
        const READ = 0x02;
        const WRITE_WITHOUT_RESPONSE = 0x04;
        const WRITE = 0x08;
        const NOTIFY = 0x10;
        const INDICATE = 0x20;
        const AUTHENTICATED_SIGNED_WRITES = 0x40;
    }
}

impl CharacteristicProperties {
    pub fn can_read(&self) -> bool {
        self.contains(Self::READ)
    }

    pub fn can_write(&self) -> bool {
        self.contains(Self::WRITE)
    }

    pub fn can_write_without_response(&self) -> bool {
        self.contains(Self::WRITE_WITHOUT_RESPONSE)
    }

    pub fn can_notify(&self) -> bool {
        self.contains(Self::NOTIFY)
    }

    pub fn can_indicate(&self) -> bool {
        self.contains(Self::INDICATE)
    }
}

impl From<HandleProperties> for CharacteristicProperties {
    fn from(accessors: HandleProperties) -> Self {
        let mut flags = CharacteristicProperties::empty();
        if accessors.broadcast {
            flags |= Self::BROADCAST;
        }
        if accessors.read {
            flags |= Self::READ;
        }
        if accessors.write_without_response {
            flags |= Self::WRITE_WITHOUT_RESPONSE;
        }
        if accessors.write {
            flags |= Self::WRITE;
        }
        if accessors.notify {
            flags |= Self::NOTIFY;
        }
        if accessors.indicate {
            flags |= Self::INDICATE;
        }
        if accessors.authenticated_signed_writes {
            flags |= Self::AUTHENTICATED_SIGNED_WRITES;
        }
        flags
    }
}

/// A discovered GATT service.
///
/// Equality and hashing are by `(peripheral, id)`, not by UUID: two distinct
/// foreign handles could in theory expose the same literal UUID.
#[derive(Debug, Clone, Eq)]
pub struct Service {
    pub id: AttributeId,
    pub uuid: Uuid,
    pub peripheral: Peripheral,
    pub is_primary: bool,
}

impl PartialEq for Service {
    fn eq(&self, other: &Self) -> bool {
        self.peripheral == other.peripheral && self.id == other.id
    }
}

impl Hash for Service {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.peripheral.hash(state);
        self.id.hash(state);
    }
}

/// A discovered GATT characteristic.
///
/// Stores its peripheral rather than a back-reference to the owning service,
/// keeping equality simple. Equality and hashing are by `(peripheral, id)`.
#[derive(Debug, Clone, Eq)]
pub struct Characteristic {
    pub id: AttributeId,
    pub uuid: Uuid,
    pub peripheral: Peripheral,
    pub properties: CharacteristicProperties,
}

impl PartialEq for Characteristic {
    fn eq(&self, other: &Self) -> bool {
        self.peripheral == other.peripheral && self.id == other.id
    }
}

impl Hash for Characteristic {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.peripheral.hash(state);
        self.id.hash(state);
    }
}

/// A discovered GATT descriptor.
///
/// The parent characteristic is referenced by its identifier, never by a
/// live handle. Equality and hashing are by `(peripheral, id)`.
#[derive(Debug, Clone, Eq)]
pub struct Descriptor {
    pub id: AttributeId,
    pub uuid: Uuid,
    pub peripheral: Peripheral,
    pub characteristic: AttributeId,
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        self.peripheral == other.peripheral && self.id == other.id
    }
}

impl Hash for Descriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.peripheral.hash(state);
        self.id.hash(state);
    }
}

/// Advertisement snapshot taken when the device was selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Advertisement {
    pub local_name: Option<String>,
}

/// The result of a scan: the chosen peripheral and what was known about it
/// at selection time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanData {
    pub peripheral: Peripheral,
    pub advertisement: Advertisement,
    pub rssi: Option<i16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_records_compare_by_peripheral_and_id() {
        let peripheral = Peripheral { id: "AA:BB".into() };
        let a = Service {
            id: AttributeId(0),
            uuid: Uuid::from_u16(0x180f),
            peripheral: peripheral.clone(),
            is_primary: true,
        };
        // Same id, different UUID: still the same identity.
        let b = Service {
            uuid: Uuid::from_u16(0x1800),
            ..a.clone()
        };
        assert_eq!(a, b);

        let c = Service {
            peripheral: Peripheral { id: "CC:DD".into() },
            ..a.clone()
        };
        assert_ne!(a, c);
    }

    #[test]
    fn properties_decode_from_boolean_accessors() {
        let accessors = HandleProperties {
            read: true,
            notify: true,
            ..Default::default()
        };
        let properties = CharacteristicProperties::from(accessors);
        assert!(properties.can_read());
        assert!(properties.can_notify());
        assert!(!properties.can_write());
        assert!(!properties.can_indicate());
    }
}
