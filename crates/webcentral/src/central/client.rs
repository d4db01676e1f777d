//! The central session facade.
//!
//! [`Central`] is the public operation surface of the client: scan, connect,
//! disconnect, discovery, read/write, and notifications. It sequences calls
//! across the handle cache, the identifier allocator, and the notification
//! bridge, and enforces connection-state preconditions before every
//! peripheral-scoped operation.

use std::collections::BTreeSet;
use std::sync::Mutex;

use log::{debug, info, warn};

use super::bridge::{NotificationBridge, NotificationStream};
use super::cache::HandleCache;
use super::types::{
    Advertisement, Characteristic, CharacteristicProperties, Descriptor, Peripheral, ScanData,
    Service,
};
use crate::error::CentralError;
use crate::platform::{
    CharacteristicHandle, CharacteristicOf, DeviceHandle, DeviceOf, PlatformError, PlatformStack,
    ServiceHandle,
};
use crate::uuid::Uuid;

/// Default ATT MTU. The platform binding exposes no MTU negotiation.
pub const DEFAULT_MTU: u16 = 23;

/// GATT central-role client over a foreign platform stack.
///
/// One logical session at a time: every [`Central::scan`] invalidates all
/// identities issued before it. Construct one per process at the composition
/// root and share it by reference.
pub struct Central<P: PlatformStack> {
    stack: P,
    cache: Mutex<HandleCache<P>>,
    bridge: NotificationBridge<CharacteristicOf<P>>,
}

impl<P: PlatformStack> Central<P> {
    pub fn new(stack: P) -> Self {
        Central {
            stack,
            cache: Mutex::new(HandleCache::new()),
            bridge: NotificationBridge::new(),
        }
    }

    /// Invokes device selection for the given service UUIDs, resets the
    /// handle cache, and seeds it with the chosen peripheral.
    ///
    /// A cancelled or denied selection propagates as a platform error.
    pub async fn scan(&self, services: &[Uuid]) -> Result<ScanData, CentralError> {
        let wire: Vec<_> = services.iter().map(|uuid| uuid.to_platform()).collect();
        let device = self.stack.request_device(&wire).await?;

        let peripheral = Peripheral { id: device.id() };
        let advertisement = Advertisement {
            local_name: device.name(),
        };
        {
            let mut cache = self.cache.lock().unwrap();
            cache.reset();
            cache.insert_device(peripheral.clone(), device);
        }
        info!("selected peripheral {}", peripheral);
        Ok(ScanData {
            peripheral,
            advertisement,
            rssi: None,
        })
    }

    /// Opens the connection to a previously scanned peripheral.
    pub async fn connect(&self, peripheral: &Peripheral) -> Result<(), CentralError> {
        let device = self.device(peripheral)?;
        device.connect().await?;
        info!("connected to {}", peripheral);
        Ok(())
    }

    /// Closes the connection, best effort. Idempotent: an unknown or already
    /// disconnected peripheral is a no-op. Cache entries are kept; only a new
    /// scan invalidates them.
    pub async fn disconnect(&self, peripheral: &Peripheral) {
        let device = { self.cache.lock().unwrap().device(peripheral).cloned() };
        if let Some(device) = device {
            if let Err(err) = device.disconnect().await {
                debug!("disconnect of {} reported {}", peripheral, err);
            }
        }
    }

    /// Whether the peripheral is currently connected. Unknown peripherals
    /// are reported as disconnected.
    pub async fn is_connected(&self, peripheral: &Peripheral) -> bool {
        let device = { self.cache.lock().unwrap().device(peripheral).cloned() };
        match device {
            Some(device) => device.is_connected().await,
            None => false,
        }
    }

    /// Discovers primary services by UUID set.
    ///
    /// The requested UUIDs are visited in ascending canonical order and
    /// deduplicated, so repeated calls are reproducible regardless of how the
    /// set was passed in. A UUID the device does not expose is skipped; any
    /// other platform failure aborts the whole call. Results carry fresh
    /// attribute identifiers and are returned in ascending identifier order.
    pub async fn discover_services(
        &self,
        uuids: &[Uuid],
        peripheral: &Peripheral,
    ) -> Result<Vec<Service>, CentralError> {
        if uuids.is_empty() {
            warn!("service discovery requested with an empty UUID set");
            return Ok(Vec::new());
        }
        let device = self.connected_device(peripheral).await?;

        let requested: BTreeSet<Uuid> = uuids.iter().copied().collect();
        let mut services = Vec::new();
        for requested_uuid in requested {
            let handle = match device.primary_service(&requested_uuid.to_platform()).await {
                Ok(handle) => handle,
                Err(PlatformError::NotFound) => {
                    debug!("service {} not present on {}", requested_uuid, peripheral);
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let uuid = Uuid::from_platform(&handle.uuid())?;
            let is_primary = handle.is_primary();
            let service = {
                let mut cache = self.cache.lock().unwrap();
                let service = Service {
                    id: cache.next_id(peripheral),
                    uuid,
                    peripheral: peripheral.clone(),
                    is_primary,
                };
                cache.insert_service(service.clone(), handle);
                service
            };
            services.push(service);
        }
        Ok(services)
    }

    /// Discovers characteristics by UUID set, scoped to an already discovered
    /// service. Same shape as [`Central::discover_services`]; capability
    /// flags are decoded from the foreign boolean accessors here, exactly
    /// once, so later reads of `properties` never touch the platform.
    pub async fn discover_characteristics(
        &self,
        uuids: &[Uuid],
        service: &Service,
    ) -> Result<Vec<Characteristic>, CentralError> {
        if uuids.is_empty() {
            warn!("characteristic discovery requested with an empty UUID set");
            return Ok(Vec::new());
        }
        self.connected_device(&service.peripheral).await?;
        let service_handle = self
            .cache
            .lock()
            .unwrap()
            .service(service)
            .cloned()
            .ok_or(CentralError::UnknownService(service.id))?;

        let requested: BTreeSet<Uuid> = uuids.iter().copied().collect();
        let mut characteristics = Vec::new();
        for requested_uuid in requested {
            let handle = match service_handle
                .characteristic(&requested_uuid.to_platform())
                .await
            {
                Ok(handle) => handle,
                Err(PlatformError::NotFound) => {
                    debug!(
                        "characteristic {} not present in service {}",
                        requested_uuid, service.uuid
                    );
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let uuid = Uuid::from_platform(&handle.uuid())?;
            let properties = CharacteristicProperties::from(handle.properties());
            let characteristic = {
                let mut cache = self.cache.lock().unwrap();
                let characteristic = Characteristic {
                    id: cache.next_id(&service.peripheral),
                    uuid,
                    peripheral: service.peripheral.clone(),
                    properties,
                };
                cache.insert_characteristic(characteristic.clone(), handle);
                characteristic
            };
            characteristics.push(characteristic);
        }
        Ok(characteristics)
    }

    /// Discovers descriptors for a characteristic.
    ///
    /// The platform binding exposes no descriptor enumeration yet, so the
    /// result is always empty. Preconditions are still enforced so callers
    /// see the same sequencing errors as the other discovery calls.
    pub async fn discover_descriptors(
        &self,
        characteristic: &Characteristic,
    ) -> Result<Vec<Descriptor>, CentralError> {
        self.connected_device(&characteristic.peripheral).await?;
        self.characteristic_handle(characteristic)?;
        Ok(Vec::new())
    }

    /// Reads the current characteristic value.
    ///
    /// Reads are not gated on the `READ` property; the transport decides
    /// whether the operation is allowed.
    pub async fn read_value(&self, characteristic: &Characteristic) -> Result<Vec<u8>, CentralError> {
        self.connected_device(&characteristic.peripheral).await?;
        let handle = self.characteristic_handle(characteristic)?;
        Ok(handle.read_value().await?)
    }

    /// Writes a characteristic value, with or without response. The write is
    /// gated on the matching capability flag.
    pub async fn write_value(
        &self,
        data: &[u8],
        characteristic: &Characteristic,
        with_response: bool,
    ) -> Result<(), CentralError> {
        self.connected_device(&characteristic.peripheral).await?;
        let handle = self.characteristic_handle(characteristic)?;
        let permitted = if with_response {
            characteristic.properties.can_write()
        } else {
            characteristic.properties.can_write_without_response()
        };
        if !permitted {
            return Err(CentralError::NotPermitted);
        }
        Ok(handle.write_value(data, with_response).await?)
    }

    /// Starts notifications and returns the stream of incoming values.
    ///
    /// The characteristic must support notify or indicate. At most one live
    /// stream per characteristic; a second `notify` before
    /// [`Central::stop_notifications`] fails.
    pub async fn notify(
        &self,
        characteristic: &Characteristic,
    ) -> Result<NotificationStream<CharacteristicOf<P>>, CentralError> {
        self.connected_device(&characteristic.peripheral).await?;
        let handle = self.characteristic_handle(characteristic)?;
        if !characteristic.properties.can_notify() && !characteristic.properties.can_indicate() {
            return Err(CentralError::NotPermitted);
        }
        self.bridge.start(characteristic.clone(), handle).await
    }

    /// Stops notifications and closes the stream returned by
    /// [`Central::notify`]. Calling this without an active registration is a
    /// caller-sequencing bug and fails with
    /// [`CentralError::NoActiveNotification`].
    pub async fn stop_notifications(
        &self,
        characteristic: &Characteristic,
    ) -> Result<(), CentralError> {
        self.connected_device(&characteristic.peripheral).await?;
        self.characteristic_handle(characteristic)?;
        self.bridge.stop(characteristic).await
    }

    /// Whether a notification registration is currently live for the
    /// characteristic.
    pub fn is_notifying(&self, characteristic: &Characteristic) -> bool {
        self.bridge.is_notifying(characteristic)
    }

    /// Reads a descriptor value. No descriptor is ever cached today (see
    /// [`Central::discover_descriptors`]), so this surfaces the unknown-
    /// descriptor error after the usual precondition checks.
    pub async fn read_descriptor_value(
        &self,
        descriptor: &Descriptor,
    ) -> Result<Vec<u8>, CentralError> {
        self.connected_device(&descriptor.peripheral).await?;
        Err(CentralError::UnknownDescriptor(descriptor.id))
    }

    /// Writes a descriptor value. Same gap as
    /// [`Central::read_descriptor_value`].
    pub async fn write_descriptor_value(
        &self,
        _data: &[u8],
        descriptor: &Descriptor,
    ) -> Result<(), CentralError> {
        self.connected_device(&descriptor.peripheral).await?;
        Err(CentralError::UnknownDescriptor(descriptor.id))
    }

    /// The negotiated MTU for the peripheral. The binding has no negotiation,
    /// so this is the ATT default.
    pub fn maximum_transmission_unit(&self, _peripheral: &Peripheral) -> u16 {
        DEFAULT_MTU
    }

    fn device(&self, peripheral: &Peripheral) -> Result<DeviceOf<P>, CentralError> {
        self.cache
            .lock()
            .unwrap()
            .device(peripheral)
            .cloned()
            .ok_or_else(|| CentralError::UnknownPeripheral(peripheral.clone()))
    }

    /// Re-validates the connection at call time; connections can drop
    /// asynchronously between two otherwise sequential calls, so the state is
    /// never cached.
    async fn connected_device(&self, peripheral: &Peripheral) -> Result<DeviceOf<P>, CentralError> {
        let device = self.device(peripheral)?;
        if !device.is_connected().await {
            return Err(CentralError::NotConnected(peripheral.clone()));
        }
        Ok(device)
    }

    fn characteristic_handle(
        &self,
        characteristic: &Characteristic,
    ) -> Result<CharacteristicOf<P>, CentralError> {
        self.cache
            .lock()
            .unwrap()
            .characteristic(characteristic)
            .cloned()
            .ok_or(CentralError::UnknownCharacteristic(characteristic.id))
    }
}
