//! Register access contract consumed by the PMU management layer
//!
//! Every method maps to one system register access on the calling core and
//! takes effect immediately. Nothing here validates slot indices against the
//! implemented counter count; the caller bounds its scans with PMCR.N.

use crate::types::SlotIndex;

/// Which of the two common event identification registers to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventIdBank {
    /// PMCEID0: events 0x00-0x1F
    Low,
    /// PMCEID1: events 0x20-0x3F
    High,
}

/// Raw accessors over the PMU register file of one core
pub trait RegisterBackend {
    /// Read PMCR
    fn read_control(&self) -> u32;

    /// Write PMCR. Setting the P or C bit zeroes the event counters or the
    /// cycle counter; both read back as zero.
    fn write_control(&mut self, value: u32);

    /// Read PMEVTYPER<slot>
    fn read_event_type(&self, slot: SlotIndex) -> u32;

    /// Write PMEVTYPER<slot> in full, reserved bits included
    fn write_event_type(&mut self, slot: SlotIndex, value: u32);

    /// Read PMEVCNTR<slot>
    fn read_event_count(&self, slot: SlotIndex) -> u32;

    fn write_event_count(&mut self, slot: SlotIndex, value: u32);

    /// Read the enable bitmask (PMCNTENSET and PMCNTENCLR read the same)
    fn read_enabled(&self) -> u32;

    /// PMCNTENSET: 1 bits enable, 0 bits are ignored
    fn enable_set(&mut self, mask: u32);

    /// PMCNTENCLR: 1 bits disable, 0 bits are ignored
    fn enable_clear(&mut self, mask: u32);

    /// Read PMUSERENR
    fn read_user_enable(&self) -> u32;

    fn write_user_enable(&mut self, value: u32);

    /// Read PMCEID0 or PMCEID1
    fn read_event_id(&self, bank: EventIdBank) -> u32;

    /// Read the low 32 bits of PMCCNTR
    fn read_cycle_count_32(&self) -> u32;

    /// Read PMCCNTR as a 64-bit value
    fn read_cycle_count_64(&self) -> u64;
}

impl<B: RegisterBackend + ?Sized> RegisterBackend for Box<B> {
    fn read_control(&self) -> u32 {
        (**self).read_control()
    }

    fn write_control(&mut self, value: u32) {
        (**self).write_control(value)
    }

    fn read_event_type(&self, slot: SlotIndex) -> u32 {
        (**self).read_event_type(slot)
    }

    fn write_event_type(&mut self, slot: SlotIndex, value: u32) {
        (**self).write_event_type(slot, value)
    }

    fn read_event_count(&self, slot: SlotIndex) -> u32 {
        (**self).read_event_count(slot)
    }

    fn write_event_count(&mut self, slot: SlotIndex, value: u32) {
        (**self).write_event_count(slot, value)
    }

    fn read_enabled(&self) -> u32 {
        (**self).read_enabled()
    }

    fn enable_set(&mut self, mask: u32) {
        (**self).enable_set(mask)
    }

    fn enable_clear(&mut self, mask: u32) {
        (**self).enable_clear(mask)
    }

    fn read_user_enable(&self) -> u32 {
        (**self).read_user_enable()
    }

    fn write_user_enable(&mut self, value: u32) {
        (**self).write_user_enable(value)
    }

    fn read_event_id(&self, bank: EventIdBank) -> u32 {
        (**self).read_event_id(bank)
    }

    fn read_cycle_count_32(&self) -> u32 {
        (**self).read_cycle_count_32()
    }

    fn read_cycle_count_64(&self) -> u64 {
        (**self).read_cycle_count_64()
    }
}
