//! Error types for the webcentral library.

use thiserror::Error;

use crate::central::types::{AttributeId, Peripheral};
use crate::platform::PlatformError;
use crate::uuid::UuidParseError;

/// Errors returned by the central session layer.
///
/// The `Unknown*` variants signal a caller-sequencing bug or a reference that
/// went stale after a cache reset; they are returned, never panicked.
#[derive(Debug, Error)]
pub enum CentralError {
    #[error("unknown peripheral {0}")]
    UnknownPeripheral(Peripheral),

    #[error("unknown service (id {0})")]
    UnknownService(AttributeId),

    #[error("unknown characteristic (id {0})")]
    UnknownCharacteristic(AttributeId),

    #[error("unknown descriptor (id {0})")]
    UnknownDescriptor(AttributeId),

    #[error("peripheral {0} is not connected")]
    NotConnected(Peripheral),

    #[error("operation not permitted by characteristic properties")]
    NotPermitted,

    #[error("notifications already started for this characteristic")]
    AlreadyNotifying,

    #[error("no active notification registration")]
    NoActiveNotification,

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("invalid UUID from platform: {0}")]
    InvalidUuid(#[from] UuidParseError),
}
