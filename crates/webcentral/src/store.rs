//! Observable-state projections over the central client.
//!
//! [`Store`] is what a UI collaborator reads: per-peripheral busy flags, the
//! connected set, discovered topology keyed by parent, a capped recent-value
//! history per attribute, and per-characteristic notification flags. It
//! issues commands by delegating to [`Central`] and only ever exposes clones
//! of its projections.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use log::warn;
use tokio_stream::StreamExt;

use crate::central::client::Central;
use crate::central::types::{Characteristic, Descriptor, Peripheral, ScanData, Service};
use crate::error::CentralError;
use crate::platform::PlatformStack;
use crate::uuid::Uuid;

/// How many recent values are kept per attribute; oldest evicted first.
pub const VALUE_HISTORY_CAPACITY: usize = 5;

/// How a value entered the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueOrigin {
    Read,
    Write,
    Notification,
}

/// A timestamped attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    pub received_at: SystemTime,
    pub origin: ValueOrigin,
    pub data: Vec<u8>,
}

impl AttributeValue {
    fn now(origin: ValueOrigin, data: Vec<u8>) -> Self {
        AttributeValue {
            received_at: SystemTime::now(),
            origin,
            data,
        }
    }

    /// Hex rendering of the payload, e.g. `0x01A4`.
    pub fn hex(&self) -> String {
        format!("0x{}", hex::encode_upper(&self.data))
    }
}

/// Capped FIFO of recent attribute values.
#[derive(Debug, Clone, Default)]
pub struct ValueHistory {
    values: Vec<AttributeValue>,
}

impl ValueHistory {
    fn append(&mut self, value: AttributeValue) {
        self.values.push(value);
        if self.values.len() > VALUE_HISTORY_CAPACITY {
            self.values.remove(0);
        }
    }

    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }
}

#[derive(Default)]
struct State {
    activity: HashMap<Peripheral, bool>,
    scan_results: HashMap<Peripheral, ScanData>,
    connected: HashSet<Peripheral>,
    services: HashMap<Peripheral, Vec<Service>>,
    characteristics: HashMap<Service, Vec<Characteristic>>,
    descriptors: HashMap<Characteristic, Vec<Descriptor>>,
    characteristic_values: HashMap<Characteristic, ValueHistory>,
    descriptor_values: HashMap<Descriptor, ValueHistory>,
    is_notifying: HashMap<Characteristic, bool>,
}

impl State {
    fn append_characteristic_value(&mut self, characteristic: &Characteristic, value: AttributeValue) {
        self.characteristic_values
            .entry(characteristic.clone())
            .or_default()
            .append(value);
    }
}

/// Read-model over a shared [`Central`].
pub struct Store<P: PlatformStack> {
    central: Arc<Central<P>>,
    state: Arc<Mutex<State>>,
}

impl<P: PlatformStack> Store<P> {
    pub fn new(central: Arc<Central<P>>) -> Self {
        Store {
            central,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Starts a new session: previous scan results are dropped and the
    /// chosen peripheral recorded.
    pub async fn scan(&self, services: &[Uuid]) -> Result<Peripheral, CentralError> {
        self.state.lock().unwrap().scan_results.clear();
        let scan_data = self.central.scan(services).await?;
        let peripheral = scan_data.peripheral.clone();
        self.state
            .lock()
            .unwrap()
            .scan_results
            .insert(peripheral.clone(), scan_data);
        Ok(peripheral)
    }

    pub async fn connect(&self, peripheral: &Peripheral) -> Result<(), CentralError> {
        self.set_activity(peripheral, true);
        let result = self.central.connect(peripheral).await;
        self.set_activity(peripheral, false);
        if result.is_ok() {
            self.state.lock().unwrap().connected.insert(peripheral.clone());
        }
        result
    }

    pub async fn disconnect(&self, peripheral: &Peripheral) {
        self.central.disconnect(peripheral).await;
        self.state.lock().unwrap().connected.remove(peripheral);
    }

    pub async fn discover_services(
        &self,
        uuids: &[Uuid],
        peripheral: &Peripheral,
    ) -> Result<Vec<Service>, CentralError> {
        self.set_activity(peripheral, true);
        let result = self.central.discover_services(uuids, peripheral).await;
        self.set_activity(peripheral, false);
        let services = result?;
        self.state
            .lock()
            .unwrap()
            .services
            .insert(peripheral.clone(), services.clone());
        Ok(services)
    }

    pub async fn discover_characteristics(
        &self,
        uuids: &[Uuid],
        service: &Service,
    ) -> Result<Vec<Characteristic>, CentralError> {
        self.set_activity(&service.peripheral, true);
        let result = self.central.discover_characteristics(uuids, service).await;
        self.set_activity(&service.peripheral, false);
        let characteristics = result?;
        self.state
            .lock()
            .unwrap()
            .characteristics
            .insert(service.clone(), characteristics.clone());
        Ok(characteristics)
    }

    pub async fn discover_descriptors(
        &self,
        characteristic: &Characteristic,
    ) -> Result<Vec<Descriptor>, CentralError> {
        self.set_activity(&characteristic.peripheral, true);
        let result = self.central.discover_descriptors(characteristic).await;
        self.set_activity(&characteristic.peripheral, false);
        let descriptors = result?;
        self.state
            .lock()
            .unwrap()
            .descriptors
            .insert(characteristic.clone(), descriptors.clone());
        Ok(descriptors)
    }

    pub async fn read_value(
        &self,
        characteristic: &Characteristic,
    ) -> Result<AttributeValue, CentralError> {
        self.set_activity(&characteristic.peripheral, true);
        let result = self.central.read_value(characteristic).await;
        self.set_activity(&characteristic.peripheral, false);
        let value = AttributeValue::now(ValueOrigin::Read, result?);
        self.state
            .lock()
            .unwrap()
            .append_characteristic_value(characteristic, value.clone());
        Ok(value)
    }

    pub async fn write_value(
        &self,
        data: &[u8],
        characteristic: &Characteristic,
        with_response: bool,
    ) -> Result<(), CentralError> {
        self.set_activity(&characteristic.peripheral, true);
        let result = self
            .central
            .write_value(data, characteristic, with_response)
            .await;
        self.set_activity(&characteristic.peripheral, false);
        result?;
        self.state.lock().unwrap().append_characteristic_value(
            characteristic,
            AttributeValue::now(ValueOrigin::Write, data.to_vec()),
        );
        Ok(())
    }

    /// Enables or disables notifications. While enabled, a background task
    /// appends every incoming value to the characteristic's history until the
    /// stream terminates.
    pub async fn notify(
        &self,
        enabled: bool,
        characteristic: &Characteristic,
    ) -> Result<(), CentralError> {
        if enabled {
            let mut stream = self.central.notify(characteristic).await?;
            self.state
                .lock()
                .unwrap()
                .is_notifying
                .insert(characteristic.clone(), true);

            let state = Arc::clone(&self.state);
            let characteristic = characteristic.clone();
            tokio::spawn(async move {
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(data) => {
                            state.lock().unwrap().append_characteristic_value(
                                &characteristic,
                                AttributeValue::now(ValueOrigin::Notification, data),
                            );
                        }
                        Err(err) => {
                            warn!(
                                "notification stream for {} ended with {}",
                                characteristic.uuid, err
                            );
                            break;
                        }
                    }
                }
                state
                    .lock()
                    .unwrap()
                    .is_notifying
                    .insert(characteristic, false);
            });
            Ok(())
        } else {
            let result = self.central.stop_notifications(characteristic).await;
            self.state
                .lock()
                .unwrap()
                .is_notifying
                .insert(characteristic.clone(), false);
            result
        }
    }

    pub async fn read_descriptor_value(
        &self,
        descriptor: &Descriptor,
    ) -> Result<AttributeValue, CentralError> {
        self.set_activity(&descriptor.peripheral, true);
        let result = self.central.read_descriptor_value(descriptor).await;
        self.set_activity(&descriptor.peripheral, false);
        let value = AttributeValue::now(ValueOrigin::Read, result?);
        self.state
            .lock()
            .unwrap()
            .descriptor_values
            .entry(descriptor.clone())
            .or_default()
            .append(value.clone());
        Ok(value)
    }

    pub async fn write_descriptor_value(
        &self,
        data: &[u8],
        descriptor: &Descriptor,
    ) -> Result<(), CentralError> {
        self.set_activity(&descriptor.peripheral, true);
        let result = self.central.write_descriptor_value(data, descriptor).await;
        self.set_activity(&descriptor.peripheral, false);
        result?;
        self.state
            .lock()
            .unwrap()
            .descriptor_values
            .entry(descriptor.clone())
            .or_default()
            .append(AttributeValue::now(ValueOrigin::Write, data.to_vec()));
        Ok(())
    }

    /// Discovers everything under the peripheral and reads each readable
    /// characteristic once.
    pub async fn read_all_characteristics(
        &self,
        uuids: &[Uuid],
        peripheral: &Peripheral,
    ) -> Result<(), CentralError> {
        let services = self.discover_services(uuids, peripheral).await?;
        for service in services {
            let characteristics = self.discover_characteristics(uuids, &service).await?;
            for characteristic in characteristics {
                if !characteristic.properties.can_read() {
                    continue;
                }
                self.read_value(&characteristic).await?;
            }
        }
        Ok(())
    }

    // Read-only projections.

    pub fn activity(&self, peripheral: &Peripheral) -> bool {
        self.state
            .lock()
            .unwrap()
            .activity
            .get(peripheral)
            .copied()
            .unwrap_or(false)
    }

    pub fn scan_results(&self) -> HashMap<Peripheral, ScanData> {
        self.state.lock().unwrap().scan_results.clone()
    }

    pub fn connected(&self) -> HashSet<Peripheral> {
        self.state.lock().unwrap().connected.clone()
    }

    pub fn services(&self, peripheral: &Peripheral) -> Vec<Service> {
        self.state
            .lock()
            .unwrap()
            .services
            .get(peripheral)
            .cloned()
            .unwrap_or_default()
    }

    pub fn characteristics(&self, service: &Service) -> Vec<Characteristic> {
        self.state
            .lock()
            .unwrap()
            .characteristics
            .get(service)
            .cloned()
            .unwrap_or_default()
    }

    pub fn descriptors(&self, characteristic: &Characteristic) -> Vec<Descriptor> {
        self.state
            .lock()
            .unwrap()
            .descriptors
            .get(characteristic)
            .cloned()
            .unwrap_or_default()
    }

    pub fn characteristic_values(&self, characteristic: &Characteristic) -> Vec<AttributeValue> {
        self.state
            .lock()
            .unwrap()
            .characteristic_values
            .get(characteristic)
            .map(|history| history.values().to_vec())
            .unwrap_or_default()
    }

    pub fn descriptor_values(&self, descriptor: &Descriptor) -> Vec<AttributeValue> {
        self.state
            .lock()
            .unwrap()
            .descriptor_values
            .get(descriptor)
            .map(|history| history.values().to_vec())
            .unwrap_or_default()
    }

    pub fn is_notifying(&self, characteristic: &Characteristic) -> bool {
        self.state
            .lock()
            .unwrap()
            .is_notifying
            .get(characteristic)
            .copied()
            .unwrap_or(false)
    }

    fn set_activity(&self, peripheral: &Peripheral, busy: bool) {
        self.state
            .lock()
            .unwrap()
            .activity
            .insert(peripheral.clone(), busy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::central::tests::mock::{battery_stack, BATTERY_LEVEL, BATTERY_SERVICE};

    fn value(byte: u8) -> AttributeValue {
        AttributeValue::now(ValueOrigin::Read, vec![byte])
    }

    #[test]
    fn history_evicts_oldest_first() {
        let mut history = ValueHistory::default();
        for byte in 0..7u8 {
            history.append(value(byte));
        }
        let kept: Vec<u8> = history.values().iter().map(|v| v.data[0]).collect();
        assert_eq!(kept, vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn hex_rendering() {
        let value = AttributeValue::now(ValueOrigin::Notification, vec![0x01, 0xa4]);
        assert_eq!(value.hex(), "0x01A4");
        let empty = AttributeValue::now(ValueOrigin::Read, Vec::new());
        assert_eq!(empty.hex(), "0x");
    }

    #[tokio::test]
    async fn session_walkthrough_updates_projections() {
        let (stack, _, level) = battery_stack();
        let store = Store::new(Arc::new(Central::new(stack)));

        let peripheral = store.scan(&[Uuid::from_u16(BATTERY_SERVICE)]).await.unwrap();
        assert!(store.scan_results().contains_key(&peripheral));

        store.connect(&peripheral).await.unwrap();
        assert!(store.connected().contains(&peripheral));
        assert!(!store.activity(&peripheral));

        let services = store
            .discover_services(&[Uuid::from_u16(BATTERY_SERVICE)], &peripheral)
            .await
            .unwrap();
        assert_eq!(store.services(&peripheral), services);

        let characteristics = store
            .discover_characteristics(&[Uuid::from_u16(BATTERY_LEVEL)], &services[0])
            .await
            .unwrap();
        assert_eq!(store.characteristics(&services[0]), characteristics);
        let characteristic = &characteristics[0];

        level.set_value(vec![0x32]);
        let read = store.read_value(characteristic).await.unwrap();
        assert_eq!(read.origin, ValueOrigin::Read);
        assert_eq!(read.data, vec![0x32]);

        let values = store.characteristic_values(characteristic);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].hex(), "0x32");

        store.disconnect(&peripheral).await;
        assert!(!store.connected().contains(&peripheral));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn notify_feeds_the_value_history() {
        let (stack, _, level) = battery_stack();
        let store = Store::new(Arc::new(Central::new(stack)));

        let peripheral = store.scan(&[Uuid::from_u16(BATTERY_SERVICE)]).await.unwrap();
        store.connect(&peripheral).await.unwrap();
        let services = store
            .discover_services(&[Uuid::from_u16(BATTERY_SERVICE)], &peripheral)
            .await
            .unwrap();
        let characteristics = store
            .discover_characteristics(&[Uuid::from_u16(BATTERY_LEVEL)], &services[0])
            .await
            .unwrap();
        let characteristic = &characteristics[0];

        store.notify(true, characteristic).await.unwrap();
        assert!(store.is_notifying(characteristic));

        level.push_notification(&[0x61]);
        level.push_notification(&[0x60]);
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let values = store.characteristic_values(characteristic);
        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|v| v.origin == ValueOrigin::Notification));
        assert_eq!(values[0].data, vec![0x61]);
        assert_eq!(values[1].data, vec![0x60]);

        store.notify(false, characteristic).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(!store.is_notifying(characteristic));
    }
}
