//! PMU register layouts for the Cortex-A53 in AArch32 state
//!
//! ## References
//!
//! - ARM DDI 0500J, section 12.8 (AArch32 PMU register descriptions)

use crate::register::RegisterLayout;
use crate::types::{EventCode, RawError};

/// Architectural maximum number of event counters (PMCR.N is 5 bits, and
/// bit 31 of the enable bitmask belongs to the cycle counter)
pub const MAX_SLOTS: usize = 31;

/// Bits of an event type register that hold the event number
pub const EVENT_TYPE_MASK: u32 = (1 << 10) - 1;

/// Bit of the enable bitmask registers that controls the cycle counter
pub const CYCLE_COUNTER_BIT: u32 = 1 << 31;

/// PMUSERENR.EN: allow EL0 access to the PMU
pub const USER_ENABLE_BIT: u32 = 1 << 0;

/// Bit positions within PMCR
pub mod pmcr {
    pub const ENABLE: u32 = 1 << 0;
    pub const EVENT_COUNTER_RESET: u32 = 1 << 1;
    pub const CYCLE_COUNTER_RESET: u32 = 1 << 2;
    /// Increment the cycle counter once every 64 cycles
    pub const CYCLE_COUNT_EVERY_64: u32 = 1 << 3;
    pub const EXPORT_ENABLE: u32 = 1 << 4;
    pub const CYCLE_COUNTER_DISABLE: u32 = 1 << 5;
    /// Cycle counter overflows at 64 bits instead of 32
    pub const CYCLE_COUNTER_64_BITS: u32 = 1 << 6;
    pub const SLOT_COUNT_SHIFT: u32 = 11;
    pub const SLOT_COUNT: u32 = 0b11111 << SLOT_COUNT_SHIFT;

    /// Bits software may write
    pub const WRITABLE: u32 = ENABLE
        | EVENT_COUNTER_RESET
        | CYCLE_COUNTER_RESET
        | CYCLE_COUNT_EVERY_64
        | EXPORT_ENABLE
        | CYCLE_COUNTER_DISABLE
        | CYCLE_COUNTER_64_BITS;

    /// Bits that read back meaningfully; the reset bits always read as zero
    pub const READABLE: u32 = ENABLE
        | CYCLE_COUNT_EVERY_64
        | EXPORT_ENABLE
        | CYCLE_COUNTER_DISABLE
        | CYCLE_COUNTER_64_BITS
        | SLOT_COUNT;
}

/// Mask with one bit set for each of the first `slots` event counters
pub fn slot_mask(slots: usize) -> u32 {
    if slots >= MAX_SLOTS {
        !CYCLE_COUNTER_BIT
    } else {
        (1u32 << slots) - 1
    }
}

/// Performance Monitors Control Register layout
///
/// ## Register Format
///
/// | Bits   | Field                  | Description                        |
/// |--------|------------------------|------------------------------------|
/// | 0      | enable                 | Master enable (E)                  |
/// | 1      | event_counter_reset    | Zero all event counters (P, WO)    |
/// | 2      | cycle_counter_reset    | Zero the cycle counter (C, WO)     |
/// | 3      | cycle_count_every_64   | Clock divider (D)                  |
/// | 4      | export_enable          | Export events (X)                  |
/// | 5      | cycle_counter_disable  | Disable PMCCNTR when prohibited (DP)|
/// | 6      | cycle_counter_64bit    | Long cycle counter (LC)            |
/// | 11-15  | slot_count             | Implemented event counters (N, RO) |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pmcr {
    pub enable: bool,
    pub event_counter_reset: bool,
    pub cycle_counter_reset: bool,
    pub cycle_count_every_64: bool,
    pub export_enable: bool,
    pub cycle_counter_disable: bool,
    pub cycle_counter_64bit: bool,
    /// Read-only; ignored when written
    pub slot_count: u8,
}

impl RegisterLayout for Pmcr {
    fn to_raw(&self) -> u32 {
        (if self.enable { pmcr::ENABLE } else { 0 })
            | (if self.event_counter_reset { pmcr::EVENT_COUNTER_RESET } else { 0 })
            | (if self.cycle_counter_reset { pmcr::CYCLE_COUNTER_RESET } else { 0 })
            | (if self.cycle_count_every_64 { pmcr::CYCLE_COUNT_EVERY_64 } else { 0 })
            | (if self.export_enable { pmcr::EXPORT_ENABLE } else { 0 })
            | (if self.cycle_counter_disable { pmcr::CYCLE_COUNTER_DISABLE } else { 0 })
            | (if self.cycle_counter_64bit { pmcr::CYCLE_COUNTER_64_BITS } else { 0 })
            | ((u32::from(self.slot_count) << pmcr::SLOT_COUNT_SHIFT) & pmcr::SLOT_COUNT)
    }

    fn from_raw(value: u32) -> Self {
        Self {
            enable: (value & pmcr::ENABLE) != 0,
            event_counter_reset: (value & pmcr::EVENT_COUNTER_RESET) != 0,
            cycle_counter_reset: (value & pmcr::CYCLE_COUNTER_RESET) != 0,
            cycle_count_every_64: (value & pmcr::CYCLE_COUNT_EVERY_64) != 0,
            export_enable: (value & pmcr::EXPORT_ENABLE) != 0,
            cycle_counter_disable: (value & pmcr::CYCLE_COUNTER_DISABLE) != 0,
            cycle_counter_64bit: (value & pmcr::CYCLE_COUNTER_64_BITS) != 0,
            slot_count: ((value & pmcr::SLOT_COUNT) >> pmcr::SLOT_COUNT_SHIFT) as u8,
        }
    }
}

impl Pmcr {
    /// Check that a set of control flags only touches writable bits
    pub fn check_writable(flags: u32) -> Result<u32, RawError> {
        if flags & !pmcr::WRITABLE != 0 {
            return Err(RawError::ReadOnlyField("PMCR"));
        }
        Ok(flags)
    }
}

/// Event type register layout (PMEVTYPER<n>)
///
/// Only bits 9:0 select the event. The remaining bits hold filtering
/// controls that this layer does not own, so writes go through
/// [`EventType::merge_into`] to preserve them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventType {
    pub event: EventCode,
}

impl EventType {
    pub fn new(event: EventCode) -> Self {
        Self { event }
    }

    /// Replace the event field of `previous`, keeping every reserved bit
    pub fn merge_into(&self, previous: u32) -> u32 {
        (previous & !EVENT_TYPE_MASK) | self.to_raw()
    }
}

impl RegisterLayout for EventType {
    fn to_raw(&self) -> u32 {
        u32::from(self.event.value()) & EVENT_TYPE_MASK
    }

    fn from_raw(value: u32) -> Self {
        Self {
            event: EventCode::from_type_register(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pmcr_round_trip() {
        let pmcr = Pmcr {
            enable: true,
            cycle_counter_64bit: true,
            slot_count: 6,
            ..Default::default()
        };

        let value = pmcr.to_raw();
        assert_eq!(value, 0x3041);

        let decoded = Pmcr::from_raw(value);
        assert_eq!(decoded, pmcr);
    }

    #[test]
    fn test_pmcr_rejects_read_only_flags() {
        assert!(Pmcr::check_writable(pmcr::ENABLE | pmcr::CYCLE_COUNTER_64_BITS).is_ok());
        assert_eq!(
            Pmcr::check_writable(pmcr::SLOT_COUNT),
            Err(RawError::ReadOnlyField("PMCR"))
        );
    }

    #[test]
    fn test_event_type_preserves_reserved_bits() {
        let ty = EventType::new(EventCode::new(0x11).unwrap());
        let merged = ty.merge_into(0xC800_0008);
        assert_eq!(merged, 0xC800_0011);
        assert_eq!(EventType::from_raw(merged).event.value(), 0x11);
    }

    #[test]
    fn test_slot_mask() {
        assert_eq!(slot_mask(0), 0);
        assert_eq!(slot_mask(6), 0b11_1111);
        assert_eq!(slot_mask(31), 0x7FFF_FFFF);
    }
}
