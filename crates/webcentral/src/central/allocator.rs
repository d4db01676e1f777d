//! Attribute identifier allocation.

use std::collections::HashMap;

use super::types::{AttributeId, Peripheral};

/// Issues stable, monotonically increasing attribute identifiers, one counter
/// per peripheral. Counters are created lazily at zero and advance on every
/// call; on reaching the maximum representable value they wrap to zero.
#[derive(Debug, Default)]
pub(crate) struct AttributeIdAllocator {
    counters: HashMap<Peripheral, u64>,
}

impl AttributeIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next identifier for the peripheral: the pre-increment
    /// counter value.
    pub fn next(&mut self, peripheral: &Peripheral) -> AttributeId {
        let counter = self.counters.entry(peripheral.clone()).or_insert(0);
        let id = AttributeId(*counter);
        *counter = counter.wrapping_add(1);
        id
    }
}
