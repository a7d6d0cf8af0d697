//! Serial identifiers.
//!
//! A [`Serial`] is a 32-bit value identifying an entity within one registry.
//! Zero is reserved to mean "not yet assigned"; uniqueness among live members
//! is the registry's responsibility, not the serial's.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A 32-bit registry-scoped identifier.
///
/// Serials order and compare by their underlying numeric value. The value
/// zero is the "unassigned" sentinel: an entity that has never been admitted
/// to a registry carries [`Serial::ZERO`] until its first admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Serial(pub u32);

impl Serial {
    /// The "not yet assigned" sentinel.
    pub const ZERO: Serial = Serial(0);

    /// Create a serial from a raw `u32` value.
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw `u32` value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns `true` if this is the unassigned sentinel.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns the successor serial. Wraps silently at `u32::MAX`; skipping
    /// the zero sentinel is the allocator's job, not this method's.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl From<u32> for Serial {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Serial> for u32 {
    fn from(serial: Serial) -> Self {
        serial.0
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_unassigned() {
        assert!(Serial::ZERO.is_zero());
        assert!(!Serial::from_raw(1).is_zero());
    }

    #[test]
    fn test_ordering_is_numeric() {
        assert!(Serial::from_raw(1) < Serial::from_raw(2));
        assert!(Serial::from_raw(0xFFFF_FFFF) > Serial::from_raw(7));
        assert_eq!(Serial::from_raw(42), Serial::from_raw(42));
    }

    #[test]
    fn test_next_wraps_silently() {
        assert_eq!(Serial::from_raw(1).next(), Serial::from_raw(2));
        assert_eq!(Serial::from_raw(u32::MAX).next(), Serial::ZERO);
    }

    #[test]
    fn test_display_is_fixed_width_hex() {
        assert_eq!(Serial::from_raw(0xAB).to_string(), "000000AB");
        assert_eq!(Serial::from_raw(u32::MAX).to_string(), "FFFFFFFF");
    }

    #[test]
    fn test_raw_conversion_roundtrip() {
        let serial: Serial = 99u32.into();
        let raw: u32 = serial.into();
        assert_eq!(raw, 99);
    }
}
