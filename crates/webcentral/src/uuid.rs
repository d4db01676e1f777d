//! Bluetooth UUID handling.
//!
//! All UUIDs are normalized to their 128-bit form internally, stored in
//! canonical (big-endian) byte order. SIG-assigned 16-bit and 32-bit values
//! are folded onto the Bluetooth base UUID and can be recovered with
//! [`Uuid::as_u16`] / [`Uuid::as_u32`]. Ordering compares the canonical byte
//! sequence, so sorting `Uuid`s sorts their canonical string forms.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use thiserror::Error;

/// Represents a 128-bit Bluetooth UUID.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uuid {
    bytes: [u8; 16],
}

/// The base UUID used for constructing 128-bit UUIDs from 16-bit and 32-bit
/// values: "00000000-0000-1000-8000-00805f9b34fb" (canonical byte order).
const BASE_UUID_BYTES: [u8; 16] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0x80, 0x5f, 0x9b, 0x34, 0xfb,
];

/// The short 16/32-bit value occupies the first four canonical bytes.
const SHORT_VALUE_LEN: usize = 4;

impl Uuid {
    /// Creates a new 128-bit UUID directly from 16 bytes in canonical
    /// (big-endian) order.
    pub const fn from_bytes_be(bytes: [u8; 16]) -> Self {
        Uuid { bytes }
    }

    /// Creates a 128-bit UUID from a 16-bit SIG-assigned value.
    /// Formula: `value * 2^96 + BASE_UUID`
    pub const fn from_u16(uuid16: u16) -> Self {
        Uuid::from_u32(uuid16 as u32)
    }

    /// Creates a 128-bit UUID from a 32-bit SIG-assigned value.
    /// Formula: `value * 2^96 + BASE_UUID`
    pub const fn from_u32(uuid32: u32) -> Self {
        let mut bytes = BASE_UUID_BYTES;
        bytes[0] = (uuid32 >> 24) as u8;
        bytes[1] = (uuid32 >> 16) as u8;
        bytes[2] = (uuid32 >> 8) as u8;
        bytes[3] = uuid32 as u8;
        Uuid { bytes }
    }

    /// Returns the underlying 16 bytes in canonical (big-endian) order.
    pub const fn as_bytes_be(&self) -> &[u8; 16] {
        &self.bytes
    }

    /// Checks if the UUID is derived from the standard Bluetooth base UUID.
    fn is_sig_assigned(&self) -> bool {
        self.bytes[SHORT_VALUE_LEN..] == BASE_UUID_BYTES[SHORT_VALUE_LEN..]
    }

    /// Tries to represent the UUID as a 16-bit value.
    ///
    /// Returns `Some(u16)` if the UUID is a standard SIG-assigned 16-bit UUID,
    /// otherwise returns `None`.
    pub fn as_u16(&self) -> Option<u16> {
        match self.as_u32() {
            Some(value) if value <= u16::MAX as u32 => Some(value as u16),
            _ => None,
        }
    }

    /// Tries to represent the UUID as a 32-bit value.
    ///
    /// Returns `Some(u32)` if the UUID is a standard SIG-assigned 32-bit UUID,
    /// otherwise returns `None`.
    pub fn as_u32(&self) -> Option<u32> {
        if self.is_sig_assigned() {
            Some(u32::from_be_bytes([
                self.bytes[0],
                self.bytes[1],
                self.bytes[2],
                self.bytes[3],
            ]))
        } else {
            None
        }
    }

    /// Encodes the UUID for the platform binding: SIG-assigned 16-bit UUIDs
    /// travel as a bare number, everything else as the lowercase hyphenated
    /// 128-bit string.
    pub fn to_platform(&self) -> PlatformUuid {
        match self.as_u16() {
            Some(alias) => PlatformUuid::Alias(alias),
            None => PlatformUuid::Literal(self.to_string()),
        }
    }

    /// Decodes a platform-returned UUID value. String literals carrying the
    /// base-UUID suffix normalize back to their 16-bit form implicitly, since
    /// every UUID is stored 128-bit and queried through [`Uuid::as_u16`].
    pub fn from_platform(value: &PlatformUuid) -> Result<Self, UuidParseError> {
        match value {
            PlatformUuid::Alias(alias) => Ok(Uuid::from_u16(*alias)),
            PlatformUuid::Literal(literal) => literal.parse(),
        }
    }
}

impl From<u16> for Uuid {
    fn from(uuid16: u16) -> Self {
        Uuid::from_u16(uuid16)
    }
}

impl From<u32> for Uuid {
    fn from(uuid32: u32) -> Self {
        Uuid::from_u32(uuid32)
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        write!(f, "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]
        )
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Show short form if possible, otherwise full hyphenated form
        if let Some(u16_val) = self.as_u16() {
            write!(f, "Uuid(0x{:04X})", u16_val)
        } else if let Some(u32_val) = self.as_u32() {
            write!(f, "Uuid(0x{:08X})", u32_val)
        } else {
            fmt::Display::fmt(self, f)
        }
    }
}

/// Errors from parsing a textual UUID.
#[derive(Debug, Error)]
pub enum UuidParseError {
    #[error("invalid UUID length")]
    InvalidLength,

    #[error("invalid UUID format")]
    InvalidFormat,

    #[error("invalid hex in UUID: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl From<ParseIntError> for UuidParseError {
    fn from(_: ParseIntError) -> Self {
        UuidParseError::InvalidFormat
    }
}

impl FromStr for Uuid {
    type Err = UuidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s.chars().filter(|c| c.is_ascii_hexdigit()).collect();

        match cleaned.len() {
            4 => {
                // 16-bit short form e.g., "180a"
                let val = u16::from_str_radix(&cleaned, 16)?;
                Ok(Uuid::from_u16(val))
            }
            8 => {
                // 32-bit short form e.g., "0000180a"
                let val = u32::from_str_radix(&cleaned, 16)?;
                Ok(Uuid::from_u32(val))
            }
            32 => {
                // Full 128-bit form, hyphens already stripped
                let mut bytes = [0u8; 16];
                hex::decode_to_slice(&cleaned, &mut bytes)?;
                Ok(Uuid::from_bytes_be(bytes))
            }
            _ => Err(UuidParseError::InvalidLength),
        }
    }
}

/// A UUID as it crosses the platform binding boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlatformUuid {
    /// SIG-assigned 16-bit UUID, passed as a number.
    Alias(u16),
    /// Any other width, passed as a lowercase hyphenated 128-bit string.
    Literal(String),
}

impl fmt::Display for PlatformUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformUuid::Alias(alias) => write!(f, "0x{:04x}", alias),
            PlatformUuid::Literal(literal) => f.write_str(literal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_short_forms() {
        let battery: Uuid = "180f".parse().unwrap();
        assert_eq!(battery.as_u16(), Some(0x180f));
        assert_eq!(battery, Uuid::from_u16(0x180f));

        let long32: Uuid = "0001180f".parse().unwrap();
        assert_eq!(long32.as_u32(), Some(0x0001180f));
        assert_eq!(long32.as_u16(), None);
    }

    #[test]
    fn parse_full_form_folds_onto_base() {
        let parsed: Uuid = "0000180f-0000-1000-8000-00805f9b34fb".parse().unwrap();
        assert_eq!(parsed, Uuid::from_u16(0x180f));
        assert_eq!(parsed.as_u16(), Some(0x180f));
    }

    #[test]
    fn parse_rejects_bad_lengths() {
        assert!(matches!(
            "18".parse::<Uuid>(),
            Err(UuidParseError::InvalidLength)
        ));
        assert!(matches!(
            "xyz".parse::<Uuid>(),
            Err(UuidParseError::InvalidLength)
        ));
    }

    #[test]
    fn display_is_lowercase_hyphenated() {
        assert_eq!(
            Uuid::from_u16(0x180F).to_string(),
            "0000180f-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn platform_encoding_round_trip() {
        let battery = Uuid::from_u16(0x180f);
        assert_eq!(battery.to_platform(), PlatformUuid::Alias(0x180f));
        assert_eq!(Uuid::from_platform(&battery.to_platform()).unwrap(), battery);

        let custom: Uuid = "6e400001-b5a3-f393-e0a9-e50e24dcca9e".parse().unwrap();
        assert_eq!(
            custom.to_platform(),
            PlatformUuid::Literal("6e400001-b5a3-f393-e0a9-e50e24dcca9e".into())
        );
        assert_eq!(Uuid::from_platform(&custom.to_platform()).unwrap(), custom);
    }

    #[test]
    fn platform_literal_with_base_suffix_recovers_short_form() {
        let value = PlatformUuid::Literal("00002a19-0000-1000-8000-00805f9b34fb".into());
        let parsed = Uuid::from_platform(&value).unwrap();
        assert_eq!(parsed.as_u16(), Some(0x2a19));
    }

    #[test]
    fn ordering_matches_canonical_string_form() {
        let mut uuids = vec![
            Uuid::from_u16(0x180f),
            "6e400001-b5a3-f393-e0a9-e50e24dcca9e".parse().unwrap(),
            Uuid::from_u16(0x1800),
        ];
        uuids.sort();

        let mut strings: Vec<String> = uuids.iter().map(|u| u.to_string()).collect();
        let sorted = strings.clone();
        strings.sort();
        assert_eq!(strings, sorted);
        assert_eq!(uuids[0], Uuid::from_u16(0x1800));
        assert_eq!(uuids[1], Uuid::from_u16(0x180f));
    }
}
