//! CP15 coprocessor access to the PMU registers
//!
//! `mrc`/`mcr` encode the register selector as instruction immediates, so a
//! slot index cannot be passed at runtime. Per-slot accessors dispatch through
//! a `match` with one arm per counter, generated from the table at the bottom
//! of this file.

use core::arch::asm;

use crate::backend::{EventIdBank, RegisterBackend};
use crate::types::SlotIndex;

macro_rules! cp15_read {
    ($crn:literal, $crm:literal, $op2:literal) => {{
        let value: u32;
        unsafe {
            asm!(
                concat!("mrc p15, 0, {value}, c", $crn, ", c", $crm, ", ", $op2),
                value = out(reg) value,
                options(nomem, nostack, preserves_flags),
            );
        }
        value
    }};
}

macro_rules! cp15_write {
    ($crn:literal, $crm:literal, $op2:literal, $value:expr) => {{
        let value: u32 = $value;
        unsafe {
            asm!(
                concat!("mcr p15, 0, {value}, c", $crn, ", c", $crm, ", ", $op2),
                value = in(reg) value,
                options(nostack, preserves_flags),
            );
            asm!("isb", options(nostack, preserves_flags));
        }
    }};
}

/// PMEVCNTR<n> is c14, c(8 + n/8), n%8 and PMEVTYPER<n> is c14, c(12 + n/8), n%8
macro_rules! slot_accessors {
    ($($n:literal => ($cnt_crm:literal, $typ_crm:literal, $op2:literal)),* $(,)?) => {
        fn read_type(slot: SlotIndex) -> u32 {
            match slot.index() {
                $($n => cp15_read!(14, $typ_crm, $op2),)*
                _ => unreachable!("slot index is bounded on construction"),
            }
        }

        fn write_type(slot: SlotIndex, value: u32) {
            match slot.index() {
                $($n => cp15_write!(14, $typ_crm, $op2, value),)*
                _ => unreachable!("slot index is bounded on construction"),
            }
        }

        fn read_count(slot: SlotIndex) -> u32 {
            match slot.index() {
                $($n => cp15_read!(14, $cnt_crm, $op2),)*
                _ => unreachable!("slot index is bounded on construction"),
            }
        }

        fn write_count(slot: SlotIndex, value: u32) {
            match slot.index() {
                $($n => cp15_write!(14, $cnt_crm, $op2, value),)*
                _ => unreachable!("slot index is bounded on construction"),
            }
        }
    };
}

slot_accessors! {
    0 => (8, 12, 0),
    1 => (8, 12, 1),
    2 => (8, 12, 2),
    3 => (8, 12, 3),
    4 => (8, 12, 4),
    5 => (8, 12, 5),
    6 => (8, 12, 6),
    7 => (8, 12, 7),
    8 => (9, 13, 0),
    9 => (9, 13, 1),
    10 => (9, 13, 2),
    11 => (9, 13, 3),
    12 => (9, 13, 4),
    13 => (9, 13, 5),
    14 => (9, 13, 6),
    15 => (9, 13, 7),
    16 => (10, 14, 0),
    17 => (10, 14, 1),
    18 => (10, 14, 2),
    19 => (10, 14, 3),
    20 => (10, 14, 4),
    21 => (10, 14, 5),
    22 => (10, 14, 6),
    23 => (10, 14, 7),
    24 => (11, 15, 0),
    25 => (11, 15, 1),
    26 => (11, 15, 2),
    27 => (11, 15, 3),
    28 => (11, 15, 4),
    29 => (11, 15, 5),
    30 => (11, 15, 6),
}

/// PMU registers of the core the caller runs on
#[derive(Debug)]
pub struct Cp15Backend {
    _private: (),
}

impl Cp15Backend {
    /// # Safety
    ///
    /// The caller must run at PL1, or at PL0 with PMUSERENR.EN set, otherwise
    /// every access traps. The caller must also stay on one core for the
    /// lifetime of the backend, since the registers are banked per core.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterBackend for Cp15Backend {
    fn read_control(&self) -> u32 {
        cp15_read!(9, 12, 0)
    }

    fn write_control(&mut self, value: u32) {
        cp15_write!(9, 12, 0, value)
    }

    fn read_event_type(&self, slot: SlotIndex) -> u32 {
        read_type(slot)
    }

    fn write_event_type(&mut self, slot: SlotIndex, value: u32) {
        write_type(slot, value)
    }

    fn read_event_count(&self, slot: SlotIndex) -> u32 {
        read_count(slot)
    }

    fn write_event_count(&mut self, slot: SlotIndex, value: u32) {
        write_count(slot, value)
    }

    fn read_enabled(&self) -> u32 {
        cp15_read!(9, 12, 1)
    }

    fn enable_set(&mut self, mask: u32) {
        cp15_write!(9, 12, 1, mask)
    }

    fn enable_clear(&mut self, mask: u32) {
        cp15_write!(9, 12, 2, mask)
    }

    fn read_user_enable(&self) -> u32 {
        cp15_read!(9, 14, 0)
    }

    fn write_user_enable(&mut self, value: u32) {
        cp15_write!(9, 14, 0, value)
    }

    fn read_event_id(&self, bank: EventIdBank) -> u32 {
        match bank {
            EventIdBank::Low => cp15_read!(9, 12, 6),
            EventIdBank::High => cp15_read!(9, 12, 7),
        }
    }

    fn read_cycle_count_32(&self) -> u32 {
        cp15_read!(9, 13, 0)
    }

    fn read_cycle_count_64(&self) -> u64 {
        let (low, high): (u32, u32);
        unsafe {
            asm!(
                "mrrc p15, 0, {low}, {high}, c9",
                low = out(reg) low,
                high = out(reg) high,
                options(nomem, nostack, preserves_flags),
            );
        }
        u64::from(low) | (u64::from(high) << 32)
    }
}
