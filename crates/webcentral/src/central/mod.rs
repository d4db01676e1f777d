//! GATT central session layer.
//!
//! This module owns the session state a GATT client needs on top of the raw
//! platform primitives: identity management for peripherals and attributes,
//! the handle cache, deterministic discovery, and the notification bridge.

pub mod bridge;
pub mod client;
pub mod types;

mod allocator;
mod cache;


pub use bridge::NotificationStream;
pub use client::{Central, DEFAULT_MTU};
pub use types::{
    Advertisement, AttributeId, Characteristic, CharacteristicProperties, Descriptor, Peripheral,
    ScanData, Service,
};
