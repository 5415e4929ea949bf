//! Validated index and code types shared by every backend

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arch::cortex_a53::pmu::{EVENT_TYPE_MASK, MAX_SLOTS};

pub type Result<T> = std::result::Result<T, RawError>;

/// Errors raised when a raw value does not fit a PMU register field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RawError {
    #[error("Slot index {index} out of range (at most {max} event counters)")]
    SlotOutOfRange { index: usize, max: usize },

    #[error("Event code {0} does not fit the 10-bit event field")]
    EventCodeOutOfRange(i64),

    #[error("Register field is read-only: {0}")]
    ReadOnlyField(&'static str),
}

/// Index of one event counter slot
///
/// Construction checks against the architectural maximum of 31 slots; the
/// implemented count of a particular core is checked by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotIndex(u8);

impl SlotIndex {
    pub fn new(index: usize) -> Result<Self> {
        if index >= MAX_SLOTS {
            return Err(RawError::SlotOutOfRange {
                index,
                max: MAX_SLOTS,
            });
        }
        Ok(Self(index as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Bit selecting this slot in the enable-bitmask registers
    pub fn bit(self) -> u32 {
        1 << self.0
    }

    /// The slot directly above this one, if the architecture has one
    pub fn next(self) -> Option<SlotIndex> {
        SlotIndex::new(self.index() + 1).ok()
    }

    pub fn is_even(self) -> bool {
        self.0 % 2 == 0
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SlotIndex> for usize {
    fn from(slot: SlotIndex) -> usize {
        slot.index()
    }
}

/// Architecture-defined event number, as held in bits 9:0 of an event type
/// register
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventCode(pub(crate) u16);

impl EventCode {
    /// Largest code reported by the event-identification registers
    pub const MAX_IDENTIFIABLE: u16 = 63;

    pub fn new(code: u16) -> Result<Self> {
        if u32::from(code) > EVENT_TYPE_MASK {
            return Err(RawError::EventCodeOutOfRange(i64::from(code)));
        }
        Ok(Self(code))
    }

    /// Extract the event code from a raw type register value
    pub fn from_type_register(value: u32) -> Self {
        Self((value & EVENT_TYPE_MASK) as u16)
    }

    pub fn value(self) -> u16 {
        self.0
    }

    /// Whether the identification registers can describe this code
    pub fn is_identifiable(self) -> bool {
        self.0 <= Self::MAX_IDENTIFIABLE
    }
}

impl TryFrom<i64> for EventCode {
    type Error = RawError;

    fn try_from(code: i64) -> Result<Self> {
        u16::try_from(code)
            .map_err(|_| RawError::EventCodeOutOfRange(code))
            .and_then(|c| EventCode::new(c).map_err(|_| RawError::EventCodeOutOfRange(code)))
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_index_bounds() {
        assert!(SlotIndex::new(30).is_ok());
        assert_eq!(
            SlotIndex::new(31),
            Err(RawError::SlotOutOfRange { index: 31, max: 31 })
        );
        assert_eq!(SlotIndex::new(30).unwrap().next(), None);
        assert_eq!(SlotIndex::new(4).unwrap().bit(), 0b1_0000);
    }

    #[test]
    fn test_event_code_rejects_negative_and_wide_values() {
        assert_eq!(
            EventCode::try_from(-1),
            Err(RawError::EventCodeOutOfRange(-1))
        );
        assert!(EventCode::try_from(0x400).is_err());
        assert_eq!(EventCode::try_from(0x3FF).unwrap().value(), 0x3FF);
        assert!(!EventCode::new(64).unwrap().is_identifiable());
        assert!(EventCode::new(63).unwrap().is_identifiable());
    }

    #[test]
    fn test_event_code_from_type_register_masks_reserved_bits() {
        let code = EventCode::from_type_register(0x8000_0408);
        assert_eq!(code.value(), 0x008);
    }
}
