//! The handle cache: the single source of truth for which application-facing
//! identities are known to the current session and which foreign handles back
//! them.

use std::collections::HashMap;

use super::allocator::AttributeIdAllocator;
use super::types::{AttributeId, Characteristic, Peripheral, Service};
use crate::platform::{CharacteristicOf, DeviceOf, PlatformStack, ServiceOf};

pub(crate) struct HandleCache<P: PlatformStack> {
    devices: HashMap<Peripheral, DeviceOf<P>>,
    services: HashMap<Service, ServiceOf<P>>,
    characteristics: HashMap<Characteristic, CharacteristicOf<P>>,
    allocator: AttributeIdAllocator,
}

impl<P: PlatformStack> HandleCache<P> {
    pub fn new() -> Self {
        HandleCache {
            devices: HashMap::new(),
            services: HashMap::new(),
            characteristics: HashMap::new(),
            allocator: AttributeIdAllocator::new(),
        }
    }

    /// Drops every cached handle. Called at the start of every scan: the
    /// session moves on to a new selection and identities issued before this
    /// point must stop resolving.
    ///
    /// The allocator counters are deliberately kept: identifiers stay unique
    /// across rescans, so a record issued before the reset can never alias an
    /// entry inserted after it.
    pub fn reset(&mut self) {
        self.devices.clear();
        self.services.clear();
        self.characteristics.clear();
    }

    /// Mints a fresh attribute identifier for the peripheral.
    pub fn next_id(&mut self, peripheral: &Peripheral) -> AttributeId {
        self.allocator.next(peripheral)
    }

    pub fn insert_device(&mut self, peripheral: Peripheral, device: DeviceOf<P>) {
        self.devices.insert(peripheral, device);
    }

    pub fn device(&self, peripheral: &Peripheral) -> Option<&DeviceOf<P>> {
        self.devices.get(peripheral)
    }

    pub fn insert_service(&mut self, service: Service, handle: ServiceOf<P>) {
        self.services.insert(service, handle);
    }

    pub fn service(&self, service: &Service) -> Option<&ServiceOf<P>> {
        self.services.get(service)
    }

    pub fn insert_characteristic(
        &mut self,
        characteristic: Characteristic,
        handle: CharacteristicOf<P>,
    ) {
        self.characteristics.insert(characteristic, handle);
    }

    pub fn characteristic(&self, characteristic: &Characteristic) -> Option<&CharacteristicOf<P>> {
        self.characteristics.get(characteristic)
    }
}
