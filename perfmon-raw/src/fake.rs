//! In-memory PMU register file
//!
//! Behaves like the hardware as far as the management layer can observe:
//! PMCR.N is read-only, the P and C reset bits self-clear, the enable bitmask
//! ignores bits of unimplemented counters, and counters beyond PMCR.N read as
//! zero and ignore writes. Counting is simulated with [`FakeBackend::count_events`]
//! and [`FakeBackend::tick_cycles`].

use crate::arch::cortex_a53::events::CHAIN;
use crate::arch::cortex_a53::pmu::{
    pmcr, slot_mask, CYCLE_COUNTER_BIT, MAX_SLOTS,
};
use crate::arch::cortex_a53::CORTEX_A53_SLOTS;
use crate::backend::{EventIdBank, RegisterBackend};
use crate::types::{EventCode, SlotIndex};

/// PMUSERENR bits implemented by PMUv3 (EN, SW, CR, ER)
const USER_ENABLE_BITS: u32 = 0xF;

#[derive(Debug, Clone)]
pub struct FakeBackend {
    slots: usize,
    control: u32,
    enabled: u32,
    user_enable: u32,
    event_types: [u32; MAX_SLOTS],
    event_counts: [u32; MAX_SLOTS],
    event_id: [u32; 2],
    cycles: u64,
}

impl FakeBackend {
    /// Register file with `slots` event counters that supports every event
    /// code 0-63
    pub fn new(slots: usize) -> Self {
        Self {
            slots: slots.min(MAX_SLOTS),
            control: 0,
            enabled: 0,
            user_enable: 0,
            event_types: [0; MAX_SLOTS],
            event_counts: [0; MAX_SLOTS],
            event_id: [u32::MAX, u32::MAX],
            cycles: 0,
        }
    }

    /// Replace the identification masks (PMCEID0, PMCEID1)
    pub fn with_event_id(mut self, low: u32, high: u32) -> Self {
        self.event_id = [low, high];
        self
    }

    /// Mark only the listed events as supported
    pub fn with_supported_events(self, events: &[EventCode]) -> Self {
        let (mut low, mut high) = (0u32, 0u32);
        for event in events.iter().filter(|e| e.is_identifiable()) {
            match event.value() {
                v @ 0..=31 => low |= 1 << v,
                v => high |= 1 << (v - 32),
            }
        }
        self.with_event_id(low, high)
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    fn implemented(&self, slot: SlotIndex) -> bool {
        slot.index() < self.slots
    }

    fn valid_enable_bits(&self) -> u32 {
        slot_mask(self.slots) | CYCLE_COUNTER_BIT
    }

    fn counting(&self, bit: u32) -> bool {
        self.control & pmcr::ENABLE != 0 && self.enabled & bit != 0
    }

    /// Simulate `delta` occurrences of the event programmed on `slot`
    ///
    /// Nothing is counted unless the PMU and the slot are both enabled. A
    /// 32-bit overflow is carried into the next slot when that slot is enabled
    /// and programmed with `CHAIN`.
    pub fn count_events(&mut self, slot: SlotIndex, delta: u64) {
        if !self.implemented(slot) || !self.counting(slot.bit()) {
            return;
        }

        let total = u64::from(self.event_counts[slot.index()]) + delta;
        self.event_counts[slot.index()] = total as u32;

        let carry = total >> 32;
        if carry == 0 {
            return;
        }
        if let Some(high) = slot.next().filter(|&s| self.implemented(s)) {
            let chained =
                EventCode::from_type_register(self.event_types[high.index()]) == CHAIN;
            if chained && self.counting(high.bit()) {
                let count = &mut self.event_counts[high.index()];
                *count = count.wrapping_add(carry as u32);
            }
        }
    }

    /// Simulate `cycles` processor clock cycles
    pub fn tick_cycles(&mut self, cycles: u64) {
        if !self.counting(CYCLE_COUNTER_BIT) {
            return;
        }

        let delta = if self.control & pmcr::CYCLE_COUNT_EVERY_64 != 0 {
            cycles / 64
        } else {
            cycles
        };

        self.cycles = if self.control & pmcr::CYCLE_COUNTER_64_BITS != 0 {
            self.cycles.wrapping_add(delta)
        } else {
            self.cycles.wrapping_add(delta) & u64::from(u32::MAX)
        };
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new(CORTEX_A53_SLOTS)
    }
}

impl RegisterBackend for FakeBackend {
    fn read_control(&self) -> u32 {
        self.control | ((self.slots as u32) << pmcr::SLOT_COUNT_SHIFT)
    }

    fn write_control(&mut self, value: u32) {
        if value & pmcr::EVENT_COUNTER_RESET != 0 {
            self.event_counts = [0; MAX_SLOTS];
        }
        if value & pmcr::CYCLE_COUNTER_RESET != 0 {
            self.cycles = 0;
        }
        // only bits that are both writable and read back are kept
        self.control = value & pmcr::WRITABLE & pmcr::READABLE;
    }

    fn read_event_type(&self, slot: SlotIndex) -> u32 {
        if self.implemented(slot) {
            self.event_types[slot.index()]
        } else {
            0
        }
    }

    fn write_event_type(&mut self, slot: SlotIndex, value: u32) {
        if self.implemented(slot) {
            self.event_types[slot.index()] = value;
        }
    }

    fn read_event_count(&self, slot: SlotIndex) -> u32 {
        if self.implemented(slot) {
            self.event_counts[slot.index()]
        } else {
            0
        }
    }

    fn write_event_count(&mut self, slot: SlotIndex, value: u32) {
        if self.implemented(slot) {
            self.event_counts[slot.index()] = value;
        }
    }

    fn read_enabled(&self) -> u32 {
        self.enabled
    }

    fn enable_set(&mut self, mask: u32) {
        self.enabled |= mask & self.valid_enable_bits();
    }

    fn enable_clear(&mut self, mask: u32) {
        self.enabled &= !(mask & self.valid_enable_bits());
    }

    fn read_user_enable(&self) -> u32 {
        self.user_enable
    }

    fn write_user_enable(&mut self, value: u32) {
        self.user_enable = value & USER_ENABLE_BITS;
    }

    fn read_event_id(&self, bank: EventIdBank) -> u32 {
        match bank {
            EventIdBank::Low => self.event_id[0],
            EventIdBank::High => self.event_id[1],
        }
    }

    fn read_cycle_count_32(&self) -> u32 {
        self.cycles as u32
    }

    fn read_cycle_count_64(&self) -> u64 {
        self.cycles
    }
}
